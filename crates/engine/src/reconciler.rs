// In crates/engine/src/reconciler.rs

use crate::error::{Error, Phase, Result};
use core_types::{
    InstrumentId, InstrumentRegistry, LocalPosition, MarginMode, ReferencePosition, ScaledTarget,
    Side, TradeIntent,
};
use execution::{MarketOrder, TargetVenue};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// What a reconciliation pass decided for one instrument, before anything is sent.
#[derive(Debug, Clone, PartialEq)]
pub enum PlannedAction {
    /// No trading rules are known for the instrument; it is left alone.
    MissingSpec,
    /// The difference is below the instrument's minimum increment.
    Synchronized,
    /// The difference is real but smaller than one lot once truncated.
    BelowLot { diff: Decimal },
    Trade(TradeIntent),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedStep {
    pub instrument: InstrumentId,
    /// `None` when the reference account does not hold the instrument (or its rules are unknown).
    pub target: Option<ScaledTarget>,
    /// Signed contracts currently held by the local account.
    pub current: Decimal,
    pub action: PlannedAction,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReconciliationPlan {
    pub scaling_factor: Decimal,
    pub steps: Vec<PlannedStep>,
}

impl ReconciliationPlan {
    pub fn intents(&self) -> impl Iterator<Item = &TradeIntent> {
        self.steps.iter().filter_map(|step| match &step.action {
            PlannedAction::Trade(intent) => Some(intent),
            _ => None,
        })
    }
}

/// The result of executing one instrument's step.
#[derive(Debug, Clone, PartialEq)]
pub enum InstrumentOutcome {
    Synchronized,
    MissingSpec,
    BelowLot,
    Filled { intent: TradeIntent, order_id: String },
    LeverageRejected { intent: TradeIntent, reason: String },
    OrderRejected { intent: TradeIntent, reason: String },
}

impl InstrumentOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            InstrumentOutcome::LeverageRejected { .. } | InstrumentOutcome::OrderRejected { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionReport {
    pub scaling_factor: Decimal,
    pub outcomes: Vec<(InstrumentId, InstrumentOutcome)>,
}

impl ExecutionReport {
    pub fn orders_placed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| matches!(outcome, InstrumentOutcome::Filled { .. }))
            .count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &(InstrumentId, InstrumentOutcome)> {
        self.outcomes.iter().filter(|(_, outcome)| outcome.is_failure())
    }

    pub fn outcome(&self, instrument: &InstrumentId) -> Option<&InstrumentOutcome> {
        self.outcomes
            .iter()
            .find(|(id, _)| id == instrument)
            .map(|(_, outcome)| outcome)
    }
}

/// Budget divided by the total reference notional; zero when there is nothing to copy.
pub fn scaling_factor(reference: &[ReferencePosition], copy_budget: Decimal) -> Decimal {
    let total_notional: Decimal = reference.iter().map(|p| p.notional).sum();
    if total_notional > Decimal::ZERO {
        copy_budget / total_notional
    } else {
        Decimal::ZERO
    }
}

/// Computes the orders that bring the local account in line with the scaled reference.
///
/// Every instrument that is either targeted or currently held gets exactly one step, so
/// positions the reference account has closed are flattened. Steps are ordered by instrument.
pub fn plan(
    reference: &[ReferencePosition],
    local: &[LocalPosition],
    registry: &InstrumentRegistry,
    copy_budget: Decimal,
) -> ReconciliationPlan {
    let factor = scaling_factor(reference, copy_budget);

    let mut targets: BTreeMap<InstrumentId, ScaledTarget> = BTreeMap::new();
    let mut instruments: BTreeSet<InstrumentId> = BTreeSet::new();
    for position in reference {
        let instrument = position.symbol.instrument_id();
        instruments.insert(instrument.clone());
        let Some(spec) = registry.get(&instrument) else {
            continue;
        };

        // The sign of the quantity carries the reference direction; the factor is non-negative.
        let contracts = spec.contracts_for(position.quantity * factor);
        let target = targets.entry(instrument.clone()).or_insert(ScaledTarget {
            instrument,
            contracts: Decimal::ZERO,
            leverage: position.leverage,
        });
        target.contracts += contracts;
        target.leverage = position.leverage;
    }

    let mut current: BTreeMap<InstrumentId, Decimal> = BTreeMap::new();
    for position in local {
        instruments.insert(position.instrument.clone());
        *current.entry(position.instrument.clone()).or_default() += position.signed_contracts();
    }

    let steps = instruments
        .into_iter()
        .map(|instrument| {
            let target = targets.get(&instrument).cloned();
            let held = current.get(&instrument).copied().unwrap_or_default();

            let Some(spec) = registry.get(&instrument) else {
                tracing::warn!(%instrument, "No trading rules for instrument; skipping.");
                return PlannedStep { instrument, target: None, current: held, action: PlannedAction::MissingSpec };
            };

            let wanted = target.as_ref().map(|t| t.contracts).unwrap_or_default();
            let diff = wanted - held;

            let action = if diff.abs() < spec.threshold_contracts() {
                PlannedAction::Synchronized
            } else {
                let size = spec.truncate_to_lot(diff);
                if size < spec.lot_increment() {
                    PlannedAction::BelowLot { diff }
                } else {
                    PlannedAction::Trade(TradeIntent {
                        instrument: instrument.clone(),
                        side: if diff > Decimal::ZERO { Side::Buy } else { Side::Sell },
                        contracts: size,
                        leverage: target.as_ref().map(|t| t.leverage),
                    })
                }
            };

            PlannedStep { instrument, target, current: held, action }
        })
        .collect();

    ReconciliationPlan { scaling_factor: factor, steps }
}

/// Drives the local account towards the scaled reference portfolio.
pub struct Reconciler {
    venue: Arc<dyn TargetVenue>,
    copy_budget: Decimal,
}

impl Reconciler {
    pub fn new(venue: Arc<dyn TargetVenue>, copy_budget: Decimal) -> Self {
        Self { venue, copy_budget }
    }

    /// Plans a pass against the live local account without sending anything.
    pub async fn plan(
        &self,
        reference: &[ReferencePosition],
        registry: &InstrumentRegistry,
    ) -> Result<ReconciliationPlan> {
        let local = self
            .venue
            .positions()
            .await
            .map_err(|e| Error::venue(Phase::FetchLocal, e))?;
        Ok(plan(reference, &local, registry, self.copy_budget))
    }

    /// Runs one reconciliation pass.
    ///
    /// Failing to read the local account aborts the pass. Once orders are being sent, a
    /// failure only affects its own instrument and the pass moves on to the next one.
    pub async fn reconcile(
        &self,
        reference: &[ReferencePosition],
        registry: &InstrumentRegistry,
    ) -> Result<ExecutionReport> {
        let plan = self.plan(reference, registry).await?;
        tracing::info!(
            scaling_factor = %plan.scaling_factor,
            instruments = plan.steps.len(),
            "Reconciling local positions."
        );

        let mut outcomes = Vec::with_capacity(plan.steps.len());
        for step in plan.steps {
            let outcome = match step.action {
                PlannedAction::MissingSpec => InstrumentOutcome::MissingSpec,
                PlannedAction::Synchronized => InstrumentOutcome::Synchronized,
                PlannedAction::BelowLot { diff } => {
                    tracing::debug!(instrument = %step.instrument, %diff, "Difference smaller than one lot.");
                    InstrumentOutcome::BelowLot
                }
                PlannedAction::Trade(intent) => self.execute(intent).await,
            };
            outcomes.push((step.instrument, outcome));
        }

        let report = ExecutionReport { scaling_factor: plan.scaling_factor, outcomes };
        tracing::info!(
            orders = report.orders_placed(),
            failures = report.failures().count(),
            "Reconciliation pass complete."
        );
        Ok(report)
    }

    async fn execute(&self, intent: TradeIntent) -> InstrumentOutcome {
        if let Some(leverage) = intent.leverage {
            if let Err(source) = self
                .venue
                .set_leverage(&intent.instrument, leverage, MarginMode::Cross)
                .await
            {
                let reason = source.to_string();
                let err = Error::Venue {
                    phase: Phase::SetLeverage,
                    instrument: Some(intent.instrument.clone()),
                    source,
                };
                tracing::warn!(error = %err, kind = ?err.kind(), "Skipping instrument for this pass.");
                return InstrumentOutcome::LeverageRejected { intent, reason };
            }
        }

        let order = MarketOrder::from_intent(&intent);
        match self.venue.place_market_order(&order).await {
            Ok(ack) => {
                tracing::info!(
                    instrument = %intent.instrument,
                    side = %intent.side,
                    contracts = %intent.contracts,
                    order_id = %ack.order_id,
                    "Order accepted."
                );
                InstrumentOutcome::Filled { intent, order_id: ack.order_id }
            }
            Err(source) => {
                let reason = source.to_string();
                let err = Error::Venue {
                    phase: Phase::PlaceOrder,
                    instrument: Some(intent.instrument.clone()),
                    source,
                };
                tracing::error!(error = %err, kind = ?err.kind(), "Order not placed.");
                InstrumentOutcome::OrderRejected { intent, reason }
            }
        }
    }
}
