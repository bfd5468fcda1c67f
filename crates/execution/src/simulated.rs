// In crates/execution/src/simulated.rs

use crate::{AccountBalance, Error, MarketOrder, OrderAck, Result, TargetVenue};
use async_trait::async_trait;
use core_types::{
    Direction, InstrumentId, InstrumentRegistry, LocalPosition, MarginMode, PositionMode, Side,
};
use rust_decimal::Decimal;
use std::collections::HashMap;
use tokio::sync::Mutex;

/// An open paper position: signed contracts and the average price they were opened at.
#[derive(Debug, Clone, Default)]
struct PaperPosition {
    contracts: Decimal,
    entry_price: Decimal,
}

#[derive(Debug, Default)]
struct PaperBook {
    /// Realized equity: starting balance plus realized PnL.
    cash: Decimal,
    positions: HashMap<InstrumentId, PaperPosition>,
    marks: HashMap<InstrumentId, Decimal>,
    leverage: HashMap<InstrumentId, u32>,
    position_mode: Option<PositionMode>,
    fills: Vec<MarketOrder>,
    next_order_id: u64,
}

/// An in-memory target venue that fills every market order immediately at the current
/// mark price. PnL is computed in quote currency using the registry's face values.
#[derive(Debug)]
pub struct PaperVenue {
    registry: InstrumentRegistry,
    book: Mutex<PaperBook>,
}

impl PaperVenue {
    pub fn new(registry: InstrumentRegistry, initial_equity: Decimal) -> Self {
        Self {
            registry,
            book: Mutex::new(PaperBook { cash: initial_equity, ..Default::default() }),
        }
    }

    /// Sets the price used for fills and unrealized PnL of `instrument`.
    pub async fn set_mark(&self, instrument: &InstrumentId, price: Decimal) {
        self.book.lock().await.marks.insert(instrument.clone(), price);
    }

    /// Seeds an existing position, e.g. one opened before the engine started.
    pub async fn seed_position(&self, instrument: &InstrumentId, signed_contracts: Decimal, entry_price: Decimal) {
        let mut book = self.book.lock().await;
        if signed_contracts.is_zero() {
            book.positions.remove(instrument);
        } else {
            book.positions.insert(
                instrument.clone(),
                PaperPosition { contracts: signed_contracts, entry_price },
            );
        }
    }

    /// Every order filled so far, oldest first.
    pub async fn fills(&self) -> Vec<MarketOrder> {
        self.book.lock().await.fills.clone()
    }

    pub async fn signed_contracts(&self, instrument: &InstrumentId) -> Decimal {
        self.book
            .lock()
            .await
            .positions
            .get(instrument)
            .map(|p| p.contracts)
            .unwrap_or_default()
    }

    pub async fn leverage(&self, instrument: &InstrumentId) -> Option<u32> {
        self.book.lock().await.leverage.get(instrument).copied()
    }

    pub async fn position_mode(&self) -> Option<PositionMode> {
        self.book.lock().await.position_mode
    }

    fn face_value(&self, instrument: &InstrumentId) -> Decimal {
        self.registry
            .get(instrument)
            .map(|spec| spec.face_value())
            .unwrap_or(Decimal::ONE)
    }

    fn unrealized(&self, instrument: &InstrumentId, position: &PaperPosition, mark: Option<Decimal>) -> Decimal {
        match mark {
            Some(mark) => (mark - position.entry_price) * position.contracts * self.face_value(instrument),
            None => Decimal::ZERO,
        }
    }
}

#[async_trait]
impl TargetVenue for PaperVenue {
    fn name(&self) -> &'static str {
        "Paper"
    }

    async fn positions(&self) -> Result<Vec<LocalPosition>> {
        let book = self.book.lock().await;
        let mut positions: Vec<LocalPosition> = book
            .positions
            .iter()
            .filter_map(|(instrument, position)| {
                let direction = Direction::of(position.contracts)?;
                Some(LocalPosition {
                    instrument: instrument.clone(),
                    magnitude: position.contracts.abs(),
                    direction,
                    unrealized_pnl: self.unrealized(instrument, position, book.marks.get(instrument).copied()),
                })
            })
            .collect();
        positions.sort_by(|a, b| a.instrument.cmp(&b.instrument));
        Ok(positions)
    }

    async fn account_balance(&self) -> Result<AccountBalance> {
        let book = self.book.lock().await;
        let unrealized: Decimal = book
            .positions
            .iter()
            .map(|(instrument, position)| {
                self.unrealized(instrument, position, book.marks.get(instrument).copied())
            })
            .sum();
        Ok(AccountBalance { total_equity: book.cash + unrealized })
    }

    async fn set_leverage(&self, instrument: &InstrumentId, leverage: u32, _margin_mode: MarginMode) -> Result<()> {
        if leverage == 0 {
            return Err(Error::ExecutionFailed { reason: "leverage must be at least 1".into() });
        }
        self.book.lock().await.leverage.insert(instrument.clone(), leverage);
        Ok(())
    }

    async fn set_position_mode(&self, mode: PositionMode) -> Result<()> {
        self.book.lock().await.position_mode = Some(mode);
        Ok(())
    }

    async fn place_market_order(&self, order: &MarketOrder) -> Result<OrderAck> {
        if order.contracts <= Decimal::ZERO {
            return Err(Error::ExecutionFailed {
                reason: format!("order size must be positive, got {}", order.contracts),
            });
        }
        if order.position_mode != PositionMode::Net {
            return Err(Error::ExecutionFailed { reason: "paper venue only supports net mode".into() });
        }

        let face_value = self.face_value(&order.instrument);
        let mut book = self.book.lock().await;
        let price = book.marks.get(&order.instrument).copied().unwrap_or_default();
        let delta = match order.side {
            Side::Buy => order.contracts,
            Side::Sell => -order.contracts,
        };

        let current = book.positions.get(&order.instrument).cloned().unwrap_or_default();
        let after = current.contracts + delta;

        // --- Realize PnL on the part of the order that reduces the open position ---
        let reduces = !current.contracts.is_zero() && current.contracts.is_sign_positive() != delta.is_sign_positive();
        let entry_price = if reduces {
            let closed = current.contracts.abs().min(delta.abs());
            let direction = if current.contracts.is_sign_positive() { Decimal::ONE } else { -Decimal::ONE };
            book.cash += (price - current.entry_price) * closed * direction * face_value;
            if after.is_zero() || after.is_sign_positive() == current.contracts.is_sign_positive() {
                current.entry_price
            } else {
                // The order flipped the position; the remainder opens at the fill price.
                price
            }
        } else {
            // Adding to (or opening) a position averages the entry price.
            (current.entry_price * current.contracts.abs() + price * delta.abs()) / after.abs()
        };

        if after.is_zero() {
            book.positions.remove(&order.instrument);
        } else {
            book.positions.insert(order.instrument.clone(), PaperPosition { contracts: after, entry_price });
        }

        book.next_order_id += 1;
        let order_id = format!("paper-{}", book.next_order_id);
        book.fills.push(order.clone());
        tracing::info!(%order_id, instrument = %order.instrument, side = %order.side, contracts = %order.contracts, %price, "Paper order filled.");

        Ok(OrderAck { order_id })
    }
}
