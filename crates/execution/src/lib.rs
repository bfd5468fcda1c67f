// In crates/execution/src/lib.rs

use async_trait::async_trait;
use core_types::{InstrumentId, LocalPosition, MarginMode, PositionMode, ReferenceHolding, Symbol};
use rust_decimal::Decimal;
use std::collections::HashMap;

pub mod error;
pub mod live;
pub mod simulated;
pub mod types;

// Re-export public types
pub use error::{Error, Result};
pub use live::{HyperliquidVenue, OkxVenue};
pub use simulated::PaperVenue;
pub use types::{AccountBalance, MarketOrder, OrderAck};

/// Read-only access to the account being copied.
#[async_trait]
pub trait ReferenceVenue: Send + Sync {
    /// The name of the venue (e.g., "Hyperliquid").
    fn name(&self) -> &'static str;

    /// Current mid price of every listed coin.
    async fn mid_prices(&self) -> Result<HashMap<Symbol, Decimal>>;

    /// Non-zero positions held by `address`.
    async fn positions(&self, address: &str) -> Result<Vec<ReferenceHolding>>;
}

/// The universal interface for the account that mirrors the reference account.
///
/// Implementations report positions in contracts and accept orders in contracts; unit
/// conversion from base-asset quantities happens before an order reaches this trait.
#[async_trait]
pub trait TargetVenue: Send + Sync {
    /// The name of the venue (e.g., "OKX", "Paper").
    fn name(&self) -> &'static str;

    /// Open positions, one per instrument, zero-size entries excluded.
    async fn positions(&self) -> Result<Vec<LocalPosition>>;

    async fn account_balance(&self) -> Result<AccountBalance>;

    async fn set_leverage(&self, instrument: &InstrumentId, leverage: u32, margin_mode: MarginMode) -> Result<()>;

    async fn set_position_mode(&self, mode: PositionMode) -> Result<()>;

    /// Submits a market order. An `Err` means the order was not accepted.
    async fn place_market_order(&self, order: &MarketOrder) -> Result<OrderAck>;
}
