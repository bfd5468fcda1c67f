// In crates/analytics/src/types.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Column header of the PnL log.
pub const PNL_COLUMNS: [&str; 5] = [
    "Timestamp",
    "TotalEquity_USD",
    "UnrealizedPnL_USD",
    "PositionsCount",
    "Note",
];

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const UNAVAILABLE: &str = "N/A";

/// One snapshot of the local account's profit and loss.
#[derive(Debug, Clone, PartialEq)]
pub struct PnlRecord {
    pub timestamp: DateTime<Utc>,
    pub total_equity: Decimal,
    pub unrealized_pnl: Decimal,
    pub positions_count: usize,
    pub note: String,
}

impl PnlRecord {
    /// The record's fields as written to the log; money columns carry two decimals.
    pub fn to_fields(&self) -> [String; 5] {
        [
            self.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            money(self.total_equity),
            money(self.unrealized_pnl),
            self.positions_count.to_string(),
            self.note.clone(),
        ]
    }

    /// The fields written when the account state could not be read.
    pub fn unavailable_fields(timestamp: DateTime<Utc>, note: &str) -> [String; 5] {
        [
            timestamp.format(TIMESTAMP_FORMAT).to_string(),
            UNAVAILABLE.to_string(),
            UNAVAILABLE.to_string(),
            UNAVAILABLE.to_string(),
            note.to_string(),
        ]
    }
}

fn money(value: Decimal) -> String {
    format!("{:.2}", value.round_dp(2))
}
