// In crates/core-types/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid instrument spec for {instrument}: {reason}")]
    InvalidInstrument { instrument: String, reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;
