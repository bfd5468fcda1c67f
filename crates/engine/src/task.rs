// In crates/engine/src/task.rs

use crate::error::{ErrorKind, Result};
use crate::monitor::is_local_flat;
use crate::reconciler::{ExecutionReport, Reconciler};
use crate::reference::fetch_reference_positions;
use crate::snapshot::ReferenceSnapshot;
use analytics::PnlRecorder;
use app_config::PollingSettings;
use core_types::InstrumentRegistry;
use execution::{ReferenceVenue, TargetVenue};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// How long the loop waits after each kind of cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopTiming {
    pub interval: Duration,
    pub error_backoff: Duration,
    pub network_backoff: Duration,
}

impl From<&PollingSettings> for LoopTiming {
    fn from(settings: &PollingSettings) -> Self {
        Self {
            interval: settings.interval(),
            error_backoff: settings.error_backoff(),
            network_backoff: settings.network_backoff(),
        }
    }
}

/// What a single polling cycle did.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// The local account is flat and the stop condition is enabled.
    Stopped,
    /// The reference account has not changed since the last pass.
    Unchanged,
    Reconciled(ExecutionReport),
}

/// Why the copy loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    LocalFlat,
    Interrupted,
}

/// The long-running copy loop for one reference account.
pub struct SyncTask {
    reference: Arc<dyn ReferenceVenue>,
    target: Arc<dyn TargetVenue>,
    reconciler: Reconciler,
    recorder: PnlRecorder,
    registry: InstrumentRegistry,
    address: String,
    timing: LoopTiming,
    stop_when_flat: bool,
    /// The reference state the local account was last reconciled against.
    last_known: Option<ReferenceSnapshot>,
}

impl SyncTask {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        reference: Arc<dyn ReferenceVenue>,
        target: Arc<dyn TargetVenue>,
        reconciler: Reconciler,
        recorder: PnlRecorder,
        registry: InstrumentRegistry,
        address: String,
        timing: LoopTiming,
        stop_when_flat: bool,
    ) -> Self {
        Self {
            reference,
            target,
            reconciler,
            recorder,
            registry,
            address,
            timing,
            stop_when_flat,
            last_known: None,
        }
    }

    pub fn last_known(&self) -> Option<&ReferenceSnapshot> {
        self.last_known.as_ref()
    }

    /// Takes the first look at the reference account before polling starts.
    ///
    /// Reconciles straight away when either account holds positions. A failure leaves no
    /// snapshot behind, so the first polling cycle reconciles instead.
    pub async fn prime(&mut self) -> Result<Option<ExecutionReport>> {
        let positions = fetch_reference_positions(self.reference.as_ref(), &self.address).await?;
        let snapshot = ReferenceSnapshot::from_positions(&positions);
        tracing::info!(address = %self.address, positions = snapshot.len(), "Initial reference state fetched.");

        if snapshot.is_flat() && is_local_flat(self.target.as_ref()).await {
            self.last_known = Some(snapshot);
            return Ok(None);
        }

        let report = self.reconciler.reconcile(&positions, &self.registry).await?;
        self.record("after initial sync").await;
        self.last_known = Some(snapshot);
        Ok(Some(report))
    }

    /// One polling cycle: stop check, change detection, and reconciliation on change.
    pub async fn run_cycle(&mut self) -> Result<CycleOutcome> {
        if self.stop_when_flat && is_local_flat(self.target.as_ref()).await {
            return Ok(CycleOutcome::Stopped);
        }

        let positions = fetch_reference_positions(self.reference.as_ref(), &self.address).await?;
        let snapshot = ReferenceSnapshot::from_positions(&positions);
        if self.last_known.as_ref() == Some(&snapshot) {
            tracing::debug!("Reference positions unchanged.");
            return Ok(CycleOutcome::Unchanged);
        }

        tracing::info!(positions = snapshot.len(), "Reference positions changed; reconciling.");
        let report = self.reconciler.reconcile(&positions, &self.registry).await?;
        self.record("after sync").await;
        // Kept even when some instruments failed; they are retried on the next change.
        self.last_known = Some(snapshot);
        Ok(CycleOutcome::Reconciled(report))
    }

    /// Polls until the stop condition holds or `shutdown` turns true.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> StopReason {
        tracing::info!(
            interval = ?self.timing.interval,
            stop_when_flat = self.stop_when_flat,
            "Starting copy loop."
        );

        loop {
            if *shutdown.borrow() {
                tracing::info!("Shutdown requested.");
                self.record("manual stop").await;
                return StopReason::Interrupted;
            }

            let delay = match self.run_cycle().await {
                Ok(CycleOutcome::Stopped) => {
                    tracing::info!("Local account is flat; stopping.");
                    self.record("stop: local account flat").await;
                    return StopReason::LocalFlat;
                }
                Ok(_) => self.timing.interval,
                Err(e) => match e.kind() {
                    ErrorKind::Network => {
                        tracing::warn!(error = %e, backoff = ?self.timing.network_backoff, "Network error; backing off.");
                        self.timing.network_backoff
                    }
                    ErrorKind::Rejected | ErrorKind::Other => {
                        tracing::error!(error = %e, phase = ?e.phase(), backoff = ?self.timing.error_backoff, "Copy cycle failed.");
                        self.record(&format!("loop error: {}", e)).await;
                        self.timing.error_backoff
                    }
                },
            };

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                changed = shutdown.changed() => {
                    // A dropped sender can no longer interrupt us; finish the wait.
                    if changed.is_err() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
    }

    /// Writes a PnL row. A failed snapshot is logged and never stops the loop.
    pub async fn record(&self, note: &str) {
        if let Err(e) = self.recorder.record_snapshot(note).await {
            tracing::warn!(error = %e, note, "PnL snapshot incomplete.");
        }
    }
}
