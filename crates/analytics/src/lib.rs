// In crates/analytics/src/lib.rs

pub mod error;
pub mod recorder;
pub mod types;

pub use error::{Error, Result};
pub use recorder::PnlRecorder;
pub use types::PnlRecord;
