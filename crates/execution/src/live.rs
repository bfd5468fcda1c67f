// In crates/execution/src/live.rs
use crate::{AccountBalance, MarketOrder, OrderAck, ReferenceVenue, Result, TargetVenue};
use api_client::{HyperliquidClient, OkxClient};
use async_trait::async_trait;
use core_types::{
    Direction, InstrumentId, LocalPosition, MarginMode, PositionMode, ReferenceHolding, Symbol,
};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Leverage assumed when the reference venue omits it.
const DEFAULT_LEVERAGE: u32 = 1;

/// The OKX account that places real orders.
///
/// All requests are signed by the wrapped `OkxClient`; whether they hit the demo or the
/// live environment depends on its `simulated` flag.
#[derive(Debug, Clone)]
pub struct OkxVenue {
    client: OkxClient,
}

impl OkxVenue {
    pub fn new(client: OkxClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TargetVenue for OkxVenue {
    fn name(&self) -> &'static str {
        "OKX"
    }

    async fn positions(&self) -> Result<Vec<LocalPosition>> {
        let raw = self.client.get_positions().await?;

        let mut positions = Vec::with_capacity(raw.len());
        for position in raw {
            let signed = position.signed_contracts()?;
            // In net mode the sign of `pos` is the direction.
            let Some(direction) = Direction::of(signed) else {
                continue;
            };
            positions.push(LocalPosition {
                instrument: InstrumentId::new(position.inst_id.clone()),
                magnitude: signed.abs(),
                direction,
                unrealized_pnl: position.unrealized_pnl()?,
            });
        }
        Ok(positions)
    }

    async fn account_balance(&self) -> Result<AccountBalance> {
        let balance = self.client.get_account_balance().await?;
        Ok(AccountBalance { total_equity: balance.total_equity()? })
    }

    async fn set_leverage(&self, instrument: &InstrumentId, leverage: u32, margin_mode: MarginMode) -> Result<()> {
        self.client.set_leverage(instrument, leverage, margin_mode).await?;
        tracing::debug!(%instrument, leverage, "Leverage set.");
        Ok(())
    }

    async fn set_position_mode(&self, mode: PositionMode) -> Result<()> {
        self.client.set_position_mode(mode).await?;
        Ok(())
    }

    async fn place_market_order(&self, order: &MarketOrder) -> Result<OrderAck> {
        tracing::info!(?order, "Submitting market order...");
        let ack = self
            .client
            .place_market_order(
                &order.instrument,
                order.side,
                order.contracts,
                order.margin_mode,
                order.position_mode,
            )
            .await?;
        Ok(OrderAck { order_id: ack.ord_id })
    }
}

/// The Hyperliquid account whose positions are copied.
#[derive(Debug, Clone)]
pub struct HyperliquidVenue {
    client: HyperliquidClient,
}

impl HyperliquidVenue {
    pub fn new(client: HyperliquidClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ReferenceVenue for HyperliquidVenue {
    fn name(&self) -> &'static str {
        "Hyperliquid"
    }

    async fn mid_prices(&self) -> Result<HashMap<Symbol, Decimal>> {
        let mids = self.client.all_mids().await?;
        Ok(mids.into_iter().map(|(coin, mid)| (Symbol(coin), mid)).collect())
    }

    async fn positions(&self, address: &str) -> Result<Vec<ReferenceHolding>> {
        let state = self.client.clearinghouse_state(address).await?;
        Ok(state
            .asset_positions
            .into_iter()
            .map(|entry| entry.position)
            .filter(|position| !position.szi.is_zero())
            .map(|position| ReferenceHolding {
                symbol: Symbol(position.coin),
                signed_quantity: position.szi,
                leverage: position.leverage.map(|l| l.value).unwrap_or(DEFAULT_LEVERAGE),
            })
            .collect())
    }
}
