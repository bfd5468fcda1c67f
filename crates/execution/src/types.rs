// In crates/execution/src/types.rs

use core_types::{InstrumentId, MarginMode, PositionMode, Side, TradeIntent};
use rust_decimal::Decimal;

/// A market order as sent to the target venue.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketOrder {
    pub instrument: InstrumentId,
    pub side: Side,
    /// Contract count, already on the instrument's lot grid.
    pub contracts: Decimal,
    pub margin_mode: MarginMode,
    pub position_mode: PositionMode,
}

impl MarketOrder {
    /// The cross-margin, net-mode order for a trade intent.
    pub fn from_intent(intent: &TradeIntent) -> Self {
        Self {
            instrument: intent.instrument.clone(),
            side: intent.side,
            contracts: intent.contracts,
            margin_mode: MarginMode::Cross,
            position_mode: PositionMode::Net,
        }
    }
}

/// The venue's acknowledgement of an accepted order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderAck {
    pub order_id: String,
}

/// Account-level balance summary.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountBalance {
    /// Total account equity in USD.
    pub total_equity: Decimal,
}
