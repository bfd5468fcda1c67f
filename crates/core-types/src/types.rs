// In crates/core-types/src/types.rs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Suffix appended to a reference-venue coin to obtain the target-venue perpetual swap id.
pub const PERPETUAL_SUFFIX: &str = "-USDT-SWAP";

/// A coin symbol as used by the reference venue (e.g., "BTC").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Symbol(pub String);

impl Symbol {
    /// The target-venue instrument that mirrors this coin.
    pub fn instrument_id(&self) -> InstrumentId {
        InstrumentId(format!("{}{}", self.0, PERPETUAL_SUFFIX))
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A target-venue instrument identifier (e.g., "BTC-USDT-SWAP").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstrumentId(pub String);

impl InstrumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for InstrumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The direction of an open position. Magnitudes are always carried separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// Splits a signed quantity into its direction. Zero has no direction.
    pub fn of(signed: Decimal) -> Option<Direction> {
        if signed > Decimal::ZERO {
            Some(Direction::Long)
        } else if signed < Decimal::ZERO {
            Some(Direction::Short)
        } else {
            None
        }
    }

    /// Re-applies this direction to a non-negative magnitude.
    pub fn signed(&self, magnitude: Decimal) -> Decimal {
        match self {
            Direction::Long => magnitude,
            Direction::Short => -magnitude,
        }
    }
}

/// The side of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarginMode {
    Cross,
}

impl MarginMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarginMode::Cross => "cross",
        }
    }
}

/// Account position mode. The engine requires `Net`: one signed position per instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionMode {
    Net,
}

impl PositionMode {
    /// The account-level setting value.
    pub fn as_str(&self) -> &'static str {
        match self {
            PositionMode::Net => "net_mode",
        }
    }

    /// The per-order `posSide` value.
    pub fn order_position_side(&self) -> &'static str {
        match self {
            PositionMode::Net => "net",
        }
    }
}

/// A raw position as reported by the reference venue, before pricing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceHolding {
    pub symbol: Symbol,
    /// Base-asset quantity; positive for long, negative for short.
    pub signed_quantity: Decimal,
    pub leverage: u32,
}

/// A priced reference-account position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferencePosition {
    pub symbol: Symbol,
    /// Base-asset quantity; positive for long, negative for short.
    pub quantity: Decimal,
    /// `|quantity| * mid price`, in quote currency.
    pub notional: Decimal,
    pub leverage: u32,
}

impl ReferencePosition {
    pub fn magnitude(&self) -> Decimal {
        self.quantity.abs()
    }

    pub fn direction(&self) -> Option<Direction> {
        Direction::of(self.quantity)
    }
}

/// A position held by the local (target-venue) account in net position mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalPosition {
    pub instrument: InstrumentId,
    /// Contract count, never negative.
    pub magnitude: Decimal,
    pub direction: Direction,
    pub unrealized_pnl: Decimal,
}

impl LocalPosition {
    pub fn signed_contracts(&self) -> Decimal {
        self.direction.signed(self.magnitude)
    }
}

/// The contract count the local account should hold for one instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaledTarget {
    pub instrument: InstrumentId,
    /// Signed contract count (positive long, negative short).
    pub contracts: Decimal,
    pub leverage: u32,
}

/// An order the reconciliation pass wants to send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeIntent {
    pub instrument: InstrumentId,
    pub side: Side,
    /// Contract count, a whole multiple of the instrument's lot increment.
    pub contracts: Decimal,
    /// Leverage to apply before ordering; `None` when the instrument is only being closed.
    pub leverage: Option<u32>,
}
