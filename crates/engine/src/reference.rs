// In crates/engine/src/reference.rs

use crate::error::{Error, Phase, Result};
use core_types::{ReferenceHolding, ReferencePosition, Symbol};
use execution::ReferenceVenue;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Fetches the reference account's open positions and prices them at the current mids.
pub async fn fetch_reference_positions(
    venue: &dyn ReferenceVenue,
    address: &str,
) -> Result<Vec<ReferencePosition>> {
    let mids = venue
        .mid_prices()
        .await
        .map_err(|e| Error::venue(Phase::FetchReference, e))?;
    let holdings = venue
        .positions(address)
        .await
        .map_err(|e| Error::venue(Phase::FetchReference, e))?;

    tracing::debug!(venue = venue.name(), holdings = holdings.len(), "Fetched reference positions.");
    Ok(price_holdings(holdings, &mids))
}

/// Attaches a notional to each holding. A coin without a mid price gets a zero notional,
/// which keeps it in the snapshot but out of the budget split.
pub fn price_holdings(
    holdings: Vec<ReferenceHolding>,
    mids: &HashMap<Symbol, Decimal>,
) -> Vec<ReferencePosition> {
    holdings
        .into_iter()
        .filter(|h| !h.signed_quantity.is_zero())
        .map(|holding| {
            let notional = match mids.get(&holding.symbol) {
                Some(mid) => holding.signed_quantity.abs() * mid,
                None => {
                    tracing::warn!(symbol = %holding.symbol, "No mid price for reference coin; treating notional as zero.");
                    Decimal::ZERO
                }
            };
            ReferencePosition {
                symbol: holding.symbol,
                quantity: holding.signed_quantity,
                notional,
                leverage: holding.leverage,
            }
        })
        .collect()
}
