// In crates/core-types/src/lib.rs

pub mod error;
pub mod instrument;
pub mod types;

// Re-export the most important types for easy access from other crates.
pub use error::{Error, Result};
pub use instrument::{InstrumentRegistry, InstrumentSpec};
pub use types::{
    Direction, InstrumentId, LocalPosition, MarginMode, PositionMode, ReferenceHolding,
    ReferencePosition, ScaledTarget, Side, Symbol, TradeIntent,
};
