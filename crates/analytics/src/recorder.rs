// In crates/analytics/src/recorder.rs

use crate::types::{PNL_COLUMNS, PnlRecord};
use crate::Result;
use chrono::Utc;
use execution::TargetVenue;
use rust_decimal::Decimal;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

/// Appends account equity snapshots to a CSV log. Rows are never rewritten.
pub struct PnlRecorder {
    path: PathBuf,
    venue: Arc<dyn TargetVenue>,
}

impl PnlRecorder {
    /// Opens the log at `path`, writing the header if the file is new or empty.
    pub async fn open(path: impl AsRef<Path>, venue: Arc<dyn TargetVenue>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let needs_header = tokio::fs::metadata(&path)
            .await
            .map(|m| m.len() == 0)
            .unwrap_or(true);

        let recorder = Self { path, venue };
        if needs_header {
            recorder.append(&PNL_COLUMNS).await?;
        }
        tracing::info!(path = %recorder.path.display(), "PnL log ready.");

        Ok(recorder)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Captures equity and unrealized PnL of the local account and appends one row.
    ///
    /// Exactly one row is written per call. If the account cannot be read, the row carries
    /// `N/A` values and the failure in its note, and the venue error is returned.
    pub async fn record_snapshot(&self, note: &str) -> Result<PnlRecord> {
        let timestamp = Utc::now();

        let state = async {
            let balance = self.venue.account_balance().await?;
            let positions = self.venue.positions().await?;
            Ok::<_, execution::Error>((balance, positions))
        }
        .await;

        let (balance, positions) = match state {
            Ok(state) => state,
            Err(e) => {
                tracing::error!(error = %e, note, "Could not read account state for PnL snapshot.");
                let note = format!("{} (error: {})", note, e);
                self.append(&PnlRecord::unavailable_fields(timestamp, &note)).await?;
                return Err(e.into());
            }
        };

        let open: Vec<_> = positions.iter().filter(|p| !p.magnitude.is_zero()).collect();
        let unrealized_pnl: Decimal = open.iter().map(|p| p.unrealized_pnl).sum();

        let record = PnlRecord {
            timestamp,
            total_equity: balance.total_equity,
            unrealized_pnl,
            positions_count: open.len(),
            note: note.to_string(),
        };
        self.append(&record.to_fields()).await?;

        tracing::info!(
            equity = %record.total_equity.round_dp(2),
            unrealized_pnl = %record.unrealized_pnl.round_dp(2),
            positions = record.positions_count,
            note,
            "PnL snapshot recorded."
        );
        Ok(record)
    }

    /// Encodes one CSV record and appends it to the log in a single write.
    async fn append<I, T>(&self, fields: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(Vec::new());
        writer.write_record(fields)?;
        let row = writer.into_inner().map_err(|e| e.into_error())?;

        let mut file = OpenOptions::new().create(true).append(true).open(&self.path).await?;
        file.write_all(&row).await?;
        file.flush().await?;
        Ok(())
    }
}
