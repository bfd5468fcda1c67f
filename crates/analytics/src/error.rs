// In crates/analytics/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to write PnL log: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode PnL row: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to read account state: {0}")]
    Venue(#[from] execution::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
