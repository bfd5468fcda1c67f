// In crates/engine/src/snapshot.rs

use core_types::{Direction, ReferencePosition, Symbol};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// The reference account reduced to what triggers a reconciliation: per coin, the position
/// magnitude and its direction. Price moves alone never change a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceSnapshot {
    positions: BTreeMap<Symbol, (Decimal, Direction)>,
}

impl ReferenceSnapshot {
    pub fn from_positions(positions: &[ReferencePosition]) -> Self {
        let positions = positions
            .iter()
            .filter_map(|p| Some((p.symbol.clone(), (p.magnitude(), p.direction()?))))
            .collect();
        Self { positions }
    }

    pub fn is_flat(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn position(coin: &str, qty: Decimal, notional: Decimal) -> ReferencePosition {
        ReferencePosition { symbol: Symbol(coin.into()), quantity: qty, notional, leverage: 10 }
    }

    #[test]
    fn price_changes_do_not_count() {
        let before = ReferenceSnapshot::from_positions(&[position("BTC", dec!(1.0), dec!(60000))]);
        let after = ReferenceSnapshot::from_positions(&[position("BTC", dec!(1.00), dec!(61000))]);
        assert_eq!(before, after);
    }

    #[test]
    fn size_and_direction_changes_count() {
        let base = ReferenceSnapshot::from_positions(&[position("BTC", dec!(1), dec!(60000))]);
        let resized = ReferenceSnapshot::from_positions(&[position("BTC", dec!(1.5), dec!(90000))]);
        let flipped = ReferenceSnapshot::from_positions(&[position("BTC", dec!(-1), dec!(60000))]);
        let added = ReferenceSnapshot::from_positions(&[
            position("BTC", dec!(1), dec!(60000)),
            position("ETH", dec!(2), dec!(6000)),
        ]);

        assert_ne!(base, resized);
        assert_ne!(base, flipped);
        assert_ne!(base, added);
        assert!(ReferenceSnapshot::from_positions(&[]).is_flat());
    }
}
