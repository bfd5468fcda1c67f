// In crates/api-client/src/error.rs

use thiserror::Error;

/// Fragments that mark a failure as a transport problem rather than a venue decision.
const NETWORK_INDICATORS: [&str; 10] = [
    "network",
    "connection",
    "connect",
    "ssl",
    "tls",
    "timed out",
    "timeout",
    "dns",
    "reset by peer",
    "broken pipe",
];

#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to build the API client: {0}")]
    ClientBuildError(String),
    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    #[error("Deserialization failed: {0}")]
    DeserializationFailed(#[from] serde_json::Error),
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("API error: code {code}, msg: {msg}")]
    ApiError { code: i64, msg: String },
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl Error {
    /// True when the failure says nothing about the venue's state: the request may
    /// never have arrived, or the answer was lost on the way back.
    pub fn is_network(&self) -> bool {
        match self {
            Error::RequestFailed(e) => {
                e.is_connect() || e.is_timeout() || e.is_request() || chain_mentions_network(e)
            }
            Error::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            Error::ClientBuildError(msg) => mentions_network(msg),
            _ => false,
        }
    }
}

fn chain_mentions_network(error: &(dyn std::error::Error + 'static)) -> bool {
    let mut current = Some(error);
    while let Some(e) = current {
        if mentions_network(&e.to_string()) {
            return true;
        }
        current = e.source();
    }
    false
}

fn mentions_network(text: &str) -> bool {
    let text = text.to_ascii_lowercase();
    NETWORK_INDICATORS.iter().any(|needle| text.contains(needle))
}

pub type Result<T> = std::result::Result<T, Error>;
