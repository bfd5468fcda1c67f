// In crates/engine/src/error.rs

use core_types::InstrumentId;
use std::fmt;
use thiserror::Error;

/// The step of the sync cycle a failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    FetchReference,
    FetchLocal,
    SetPositionMode,
    SetLeverage,
    PlaceOrder,
    RecordPnl,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::FetchReference => "fetching reference positions",
            Phase::FetchLocal => "fetching local positions",
            Phase::SetPositionMode => "setting position mode",
            Phase::SetLeverage => "setting leverage",
            Phase::PlaceOrder => "placing order",
            Phase::RecordPnl => "recording PnL snapshot",
        };
        f.write_str(name)
    }
}

/// How the loop should react to a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Transport problem; wait longer before the next cycle.
    Network,
    /// The venue refused the request.
    Rejected,
    Other,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("{phase} failed{}: {source}", for_instrument(.instrument))]
    Venue {
        phase: Phase,
        instrument: Option<InstrumentId>,
        #[source]
        source: execution::Error,
    },

    #[error("PnL log error: {0}")]
    Recorder(#[from] analytics::Error),
}

fn for_instrument(instrument: &Option<InstrumentId>) -> String {
    instrument.as_ref().map(|i| format!(" for {}", i)).unwrap_or_default()
}

impl Error {
    pub fn venue(phase: Phase, source: execution::Error) -> Self {
        Error::Venue { phase, instrument: None, source }
    }

    pub fn kind(&self) -> ErrorKind {
        let source = match self {
            Error::Venue { source, .. } => source,
            Error::Recorder(analytics::Error::Venue(source)) => source,
            Error::Recorder(analytics::Error::Io(_) | analytics::Error::Csv(_)) => return ErrorKind::Other,
        };
        if source.is_network() {
            ErrorKind::Network
        } else if source.is_rejection() {
            ErrorKind::Rejected
        } else {
            ErrorKind::Other
        }
    }

    pub fn phase(&self) -> Phase {
        match self {
            Error::Venue { phase, .. } => *phase,
            Error::Recorder(_) => Phase::RecordPnl,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_by_source() {
        let rejected = Error::venue(
            Phase::FetchLocal,
            execution::Error::ExecutionFailed { reason: "nope".into() },
        );
        assert_eq!(rejected.kind(), ErrorKind::Rejected);

        let network = Error::venue(
            Phase::FetchReference,
            execution::Error::ApiClientError(api_client_http(503)),
        );
        assert_eq!(network.kind(), ErrorKind::Network);
        assert_eq!(network.phase(), Phase::FetchReference);
    }

    #[test]
    fn message_names_phase_and_instrument() {
        let err = Error::Venue {
            phase: Phase::SetLeverage,
            instrument: Some(InstrumentId::new("ETH-USDT-SWAP")),
            source: execution::Error::ExecutionFailed { reason: "leverage too high".into() },
        };
        assert_eq!(
            err.to_string(),
            "setting leverage failed for ETH-USDT-SWAP: Execution failed: leverage too high"
        );
    }

    fn api_client_http(status: u16) -> api_client::Error {
        api_client::Error::HttpStatus { status, body: String::new() }
    }
}
