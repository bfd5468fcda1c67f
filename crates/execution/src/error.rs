// In crates/execution/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Execution failed: {reason}")]
    ExecutionFailed { reason: String },

    #[error("API client error: {0}")]
    ApiClientError(#[from] api_client::Error),
}

impl Error {
    /// True for transport failures, where retrying later is the right response.
    pub fn is_network(&self) -> bool {
        match self {
            Error::ApiClientError(e) => e.is_network(),
            Error::ExecutionFailed { .. } => false,
        }
    }

    /// True when the venue understood the request and refused it.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Error::ExecutionFailed { .. } | Error::ApiClientError(api_client::Error::ApiError { .. })
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
