// In crates/engine/src/monitor.rs

use execution::TargetVenue;

/// True only when the local account holds no open positions.
///
/// An unreadable account is never treated as flat.
pub async fn is_local_flat(venue: &dyn TargetVenue) -> bool {
    match venue.positions().await {
        Ok(positions) => positions.iter().all(|p| p.magnitude.is_zero()),
        Err(e) => {
            tracing::warn!(venue = venue.name(), error = %e, "Could not read local positions for the stop check.");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use core_types::{InstrumentId, InstrumentRegistry, LocalPosition, MarginMode, PositionMode};
    use execution::{AccountBalance, MarketOrder, OrderAck, PaperVenue};
    use rust_decimal_macros::dec;

    /// An account whose every read fails.
    struct DownVenue;

    #[async_trait]
    impl TargetVenue for DownVenue {
        fn name(&self) -> &'static str {
            "Down"
        }
        async fn positions(&self) -> execution::Result<Vec<LocalPosition>> {
            Err(execution::Error::ExecutionFailed { reason: "gateway timeout".into() })
        }
        async fn account_balance(&self) -> execution::Result<AccountBalance> {
            Err(execution::Error::ExecutionFailed { reason: "gateway timeout".into() })
        }
        async fn set_leverage(&self, _: &InstrumentId, _: u32, _: MarginMode) -> execution::Result<()> {
            Ok(())
        }
        async fn set_position_mode(&self, _: PositionMode) -> execution::Result<()> {
            Ok(())
        }
        async fn place_market_order(&self, _: &MarketOrder) -> execution::Result<OrderAck> {
            unreachable!("the stop check never trades")
        }
    }

    #[tokio::test]
    async fn flat_only_without_positions() {
        let venue = PaperVenue::new(InstrumentRegistry::curated(), dec!(100));
        assert!(is_local_flat(&venue).await);

        venue.seed_position(&InstrumentId::new("SOL-USDT-SWAP"), dec!(-0.3), dec!(150)).await;
        assert!(!is_local_flat(&venue).await);
    }

    #[tokio::test]
    async fn unreadable_account_is_not_flat() {
        assert!(!is_local_flat(&DownVenue).await);
    }
}
