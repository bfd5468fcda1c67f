// In crates/engine/src/lib.rs

pub mod error;
pub mod monitor;
pub mod reconciler;
pub mod reference;
pub mod snapshot;
pub mod task;

pub use error::{Error, ErrorKind, Phase, Result};
pub use reconciler::{
    ExecutionReport, InstrumentOutcome, PlannedAction, PlannedStep, ReconciliationPlan, Reconciler,
};
pub use snapshot::ReferenceSnapshot;
pub use task::{CycleOutcome, LoopTiming, StopReason, SyncTask};

use analytics::PnlRecorder;
use app_config::Settings;
use core_types::{InstrumentRegistry, PositionMode};
use execution::{ReferenceVenue, TargetVenue};
use std::sync::Arc;
use tokio::sync::watch;

/// The copy-trading orchestrator: prepares the local account, then runs the copy loop.
pub struct Engine {
    target: Arc<dyn TargetVenue>,
    task: SyncTask,
}

impl Engine {
    /// Wires the venues into a copy loop and opens the PnL log.
    pub async fn new(
        settings: &Settings,
        registry: InstrumentRegistry,
        reference: Arc<dyn ReferenceVenue>,
        target: Arc<dyn TargetVenue>,
    ) -> Result<Self> {
        let recorder = PnlRecorder::open(&settings.pnl.log_path, target.clone()).await?;
        let reconciler = Reconciler::new(target.clone(), settings.copy.budget_usd);
        let task = SyncTask::new(
            reference,
            target.clone(),
            reconciler,
            recorder,
            registry,
            settings.copy.target_address.clone(),
            LoopTiming::from(&settings.polling),
            settings.copy.stop_when_flat,
        );
        Ok(Self { target, task })
    }

    /// Runs until the local account goes flat or `shutdown` is signalled.
    ///
    /// Only a failure to put the account into net position mode is fatal; everything after
    /// that is handled inside the loop.
    pub async fn run(mut self, shutdown: watch::Receiver<bool>) -> Result<StopReason> {
        tracing::info!(venue = self.target.name(), "Initializing copy engine...");

        self.target
            .set_position_mode(PositionMode::Net)
            .await
            .map_err(|e| Error::venue(Phase::SetPositionMode, e))?;
        tracing::info!("Position mode set to net.");

        self.task.record("startup").await;

        match self.task.prime().await {
            Ok(Some(report)) => {
                tracing::info!(orders = report.orders_placed(), "Initial reconciliation done.")
            }
            Ok(None) => tracing::info!("Both accounts flat at startup."),
            Err(e) => {
                tracing::warn!(error = %e, "Initial reconciliation failed; the first cycle will retry.")
            }
        }

        let reason = self.task.run(shutdown).await;
        tracing::info!(?reason, "Copy engine stopped.");
        Ok(reason)
    }
}

/// Computes the orders a pass would send right now, without sending them.
pub async fn preview(
    settings: &Settings,
    registry: &InstrumentRegistry,
    reference: &dyn ReferenceVenue,
    target: Arc<dyn TargetVenue>,
) -> Result<ReconciliationPlan> {
    let positions = crate::reference::fetch_reference_positions(reference, &settings.copy.target_address).await?;
    Reconciler::new(target, settings.copy.budget_usd)
        .plan(&positions, registry)
        .await
}
