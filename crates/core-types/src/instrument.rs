// In crates/core-types/src/instrument.rs

use crate::{Error, InstrumentId, Result};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;

/// Trading rules for one target-venue instrument.
///
/// All three quantities are strictly positive; `InstrumentSpec::new` enforces it so the
/// conversions below never divide by zero.
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentSpec {
    instrument: InstrumentId,
    /// Smallest base-asset change worth trading.
    min_base_increment: Decimal,
    /// Base-asset units represented by one contract.
    face_value: Decimal,
    /// Smallest contract-count step the venue accepts.
    lot_increment: Decimal,
}

impl InstrumentSpec {
    pub fn new(
        instrument: InstrumentId,
        min_base_increment: Decimal,
        face_value: Decimal,
        lot_increment: Decimal,
    ) -> Result<Self> {
        for (name, value) in [
            ("min_base_increment", min_base_increment),
            ("face_value", face_value),
            ("lot_increment", lot_increment),
        ] {
            if value <= Decimal::ZERO {
                return Err(Error::InvalidInstrument {
                    instrument: instrument.0.clone(),
                    reason: format!("{} must be positive, got {}", name, value),
                });
            }
        }
        Ok(Self { instrument, min_base_increment, face_value, lot_increment })
    }

    pub fn instrument(&self) -> &InstrumentId {
        &self.instrument
    }

    pub fn min_base_increment(&self) -> Decimal {
        self.min_base_increment
    }

    pub fn face_value(&self) -> Decimal {
        self.face_value
    }

    pub fn lot_increment(&self) -> Decimal {
        self.lot_increment
    }

    /// Converts a base-asset quantity into a (fractional) contract count.
    pub fn contracts_for(&self, base_quantity: Decimal) -> Decimal {
        base_quantity / self.face_value
    }

    /// The minimum base increment expressed in contracts. Diffs below it are noise.
    pub fn threshold_contracts(&self) -> Decimal {
        self.min_base_increment / self.face_value
    }

    /// Truncates a non-negative contract count toward zero onto the lot grid.
    pub fn truncate_to_lot(&self, contracts: Decimal) -> Decimal {
        (contracts.abs() / self.lot_increment).trunc() * self.lot_increment
    }
}

/// Immutable lookup of instrument rules, built once at startup.
#[derive(Debug, Clone, Default)]
pub struct InstrumentRegistry {
    specs: HashMap<InstrumentId, InstrumentSpec>,
}

impl InstrumentRegistry {
    pub fn new(specs: impl IntoIterator<Item = InstrumentSpec>) -> Self {
        let specs = specs
            .into_iter()
            .map(|spec| (spec.instrument.clone(), spec))
            .collect();
        Self { specs }
    }

    /// The built-in table of USDT-margined perpetual swaps.
    pub fn curated() -> Self {
        // (instrument, min base increment, face value, lot increment)
        const TABLE: [(&str, &str, &str, &str); 6] = [
            ("BTC-USDT-SWAP", "0.0001", "0.01", "0.01"),
            ("ETH-USDT-SWAP", "0.001", "0.1", "0.01"),
            ("SOL-USDT-SWAP", "0.1", "1", "0.1"),
            ("BNB-USDT-SWAP", "0.01", "0.01", "1"),
            ("DOGE-USDT-SWAP", "1000", "1000", "1"),
            ("XRP-USDT-SWAP", "100", "100", "1"),
        ];

        let specs = TABLE.iter().filter_map(|&(id, min_increment, face_value, lot)| {
            InstrumentSpec::new(
                InstrumentId::new(id),
                Decimal::from_str(min_increment).ok()?,
                Decimal::from_str(face_value).ok()?,
                Decimal::from_str(lot).ok()?,
            )
            .ok()
        });
        Self::new(specs)
    }

    /// Returns a copy of this registry with `overrides` replacing entries of the same id.
    pub fn with_overrides(mut self, overrides: impl IntoIterator<Item = InstrumentSpec>) -> Self {
        for spec in overrides {
            self.specs.insert(spec.instrument.clone(), spec);
        }
        self
    }

    pub fn get(&self, instrument: &InstrumentId) -> Option<&InstrumentSpec> {
        self.specs.get(instrument)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &InstrumentSpec> {
        self.specs.values()
    }
}
