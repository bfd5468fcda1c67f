// In crates/engine/tests/copy_loop.rs

use analytics::PnlRecorder;
use app_config::{AppSettings, CopySettings, HyperliquidSettings, OkxSettings, PnlSettings, PollingSettings, Settings};
use async_trait::async_trait;
use core_types::{
    InstrumentId, InstrumentRegistry, LocalPosition, MarginMode, PositionMode, ReferenceHolding, Symbol,
};
use engine::{CycleOutcome, Engine, ErrorKind, LoopTiming, Phase, Reconciler, StopReason, SyncTask};
use execution::{AccountBalance, MarketOrder, OrderAck, PaperVenue, ReferenceVenue, TargetVenue};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

const ADDRESS: &str = "0x0000000000000000000000000000000000000abc";

/// Replays a fixed sequence of reference states; the last one repeats forever.
///
/// Queued faults are returned by position reads before any state is served. Once they are
/// used up, the next read fires `on_drained` if one is set.
struct ScriptedReference {
    mids: HashMap<Symbol, Decimal>,
    script: Mutex<VecDeque<Vec<ReferenceHolding>>>,
    last: Mutex<Vec<ReferenceHolding>>,
    unreachable: AtomicBool,
    faults: Mutex<VecDeque<execution::Error>>,
    on_drained: Mutex<Option<watch::Sender<bool>>>,
}

impl ScriptedReference {
    fn new(script: Vec<Vec<ReferenceHolding>>) -> Self {
        Self {
            mids: HashMap::from([
                (Symbol("BTC".into()), dec!(60000)),
                (Symbol("ETH".into()), dec!(3000)),
            ]),
            script: Mutex::new(script.into()),
            last: Mutex::new(Vec::new()),
            unreachable: AtomicBool::new(false),
            faults: Mutex::new(VecDeque::new()),
            on_drained: Mutex::new(None),
        }
    }
}

#[async_trait]
impl ReferenceVenue for ScriptedReference {
    fn name(&self) -> &'static str {
        "Scripted"
    }

    async fn mid_prices(&self) -> execution::Result<HashMap<Symbol, Decimal>> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(api_client::Error::HttpStatus { status: 503, body: "unavailable".into() }.into());
        }
        Ok(self.mids.clone())
    }

    async fn positions(&self, address: &str) -> execution::Result<Vec<ReferenceHolding>> {
        assert_eq!(address, ADDRESS);
        if let Some(fault) = self.faults.lock().unwrap().pop_front() {
            return Err(fault);
        }
        if let Some(tx) = self.on_drained.lock().unwrap().take() {
            tx.send(true).ok();
        }
        let mut last = self.last.lock().unwrap();
        if let Some(next) = self.script.lock().unwrap().pop_front() {
            *last = next;
        }
        Ok(last.clone())
    }
}

/// A paper account whose position reads and mode switch can be made to fail.
struct FlakyTarget {
    inner: PaperVenue,
    fail_positions: AtomicBool,
    fail_mode: AtomicBool,
}

impl FlakyTarget {
    fn new() -> Self {
        Self {
            inner: PaperVenue::new(InstrumentRegistry::curated(), dec!(1000)),
            fail_positions: AtomicBool::new(false),
            fail_mode: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl TargetVenue for FlakyTarget {
    fn name(&self) -> &'static str {
        "Flaky"
    }
    async fn positions(&self) -> execution::Result<Vec<LocalPosition>> {
        if self.fail_positions.load(Ordering::SeqCst) {
            return Err(execution::Error::ExecutionFailed { reason: "positions unavailable".into() });
        }
        self.inner.positions().await
    }
    async fn account_balance(&self) -> execution::Result<AccountBalance> {
        self.inner.account_balance().await
    }
    async fn set_leverage(&self, instrument: &InstrumentId, leverage: u32, mode: MarginMode) -> execution::Result<()> {
        self.inner.set_leverage(instrument, leverage, mode).await
    }
    async fn set_position_mode(&self, mode: PositionMode) -> execution::Result<()> {
        if self.fail_mode.load(Ordering::SeqCst) {
            return Err(execution::Error::ExecutionFailed { reason: "account has open orders".into() });
        }
        self.inner.set_position_mode(mode).await
    }
    async fn place_market_order(&self, order: &MarketOrder) -> execution::Result<OrderAck> {
        self.inner.place_market_order(order).await
    }
}

fn holding(coin: &str, qty: Decimal, leverage: u32) -> ReferenceHolding {
    ReferenceHolding { symbol: Symbol(coin.into()), signed_quantity: qty, leverage }
}

fn btc() -> InstrumentId {
    InstrumentId::new("BTC-USDT-SWAP")
}

fn temp_log() -> PathBuf {
    std::env::temp_dir().join(format!("copy-loop-{}.csv", uuid::Uuid::new_v4()))
}

fn notes(path: &Path) -> Vec<String> {
    csv::Reader::from_path(path)
        .unwrap()
        .records()
        .map(|row| row.unwrap()[4].to_string())
        .collect()
}

fn fast_timing() -> LoopTiming {
    LoopTiming {
        interval: Duration::from_millis(5),
        error_backoff: Duration::from_millis(5),
        network_backoff: Duration::from_millis(5),
    }
}

async fn sync_task(
    reference: Arc<ScriptedReference>,
    target: Arc<dyn TargetVenue>,
    log: &Path,
    stop_when_flat: bool,
) -> SyncTask {
    let recorder = PnlRecorder::open(log, target.clone()).await.unwrap();
    SyncTask::new(
        reference,
        target.clone(),
        Reconciler::new(target, dec!(6000)),
        recorder,
        InstrumentRegistry::curated(),
        ADDRESS.to_string(),
        fast_timing(),
        stop_when_flat,
    )
}

fn settings(log: &Path, budget: Decimal) -> Settings {
    Settings {
        app: AppSettings::default(),
        okx: OkxSettings {
            api_key: "key".into(),
            secret_key: "secret".into(),
            passphrase: "pass".into(),
            rest_base_url: "http://127.0.0.1:1".into(),
            simulated: true,
        },
        hyperliquid: HyperliquidSettings::default(),
        copy: CopySettings { target_address: ADDRESS.into(), budget_usd: budget, stop_when_flat: true },
        polling: PollingSettings { interval_secs: 1, error_backoff_secs: 1, network_backoff_secs: 1 },
        pnl: PnlSettings { log_path: log.to_string_lossy().into_owned() },
        instruments: Vec::new(),
    }
}

#[tokio::test]
async fn follows_reference_open_and_close_then_stops() {
    let log = temp_log();
    let venue = Arc::new(PaperVenue::new(InstrumentRegistry::curated(), dec!(1000)));
    venue.set_mark(&btc(), dec!(60000)).await;
    let reference = Arc::new(ScriptedReference::new(vec![
        vec![holding("BTC", dec!(1.0), 10)],
        vec![holding("BTC", dec!(1.0), 10)],
        vec![],
    ]));

    let mut task = sync_task(reference, venue.clone(), &log, true).await;
    let initial = task.prime().await.unwrap().expect("reference was not flat");
    assert_eq!(initial.orders_placed(), 1);
    assert_eq!(venue.signed_contracts(&btc()).await, dec!(10));

    let (_tx, rx) = watch::channel(false);
    let reason = task.run(rx).await;

    assert_eq!(reason, StopReason::LocalFlat);
    let fills = venue.fills().await;
    assert_eq!(fills.len(), 2);
    assert_eq!(fills[1].contracts, dec!(10));
    assert_eq!(notes(&log), ["after initial sync", "after sync", "stop: local account flat"]);
    std::fs::remove_file(&log).ok();
}

#[tokio::test]
async fn unchanged_reference_is_left_alone() {
    let log = temp_log();
    let venue = Arc::new(PaperVenue::new(InstrumentRegistry::curated(), dec!(1000)));
    let reference = Arc::new(ScriptedReference::new(vec![vec![holding("BTC", dec!(0.5), 3)]]));

    let mut task = sync_task(reference, venue.clone(), &log, false).await;
    assert!(matches!(task.run_cycle().await.unwrap(), CycleOutcome::Reconciled(_)));
    // Someone trades the local account by hand; without a reference change nothing happens.
    venue.seed_position(&btc(), dec!(7), dec!(60000)).await;
    assert_eq!(task.run_cycle().await.unwrap(), CycleOutcome::Unchanged);
    assert_eq!(venue.fills().await.len(), 1);
    std::fs::remove_file(&log).ok();
}

#[tokio::test]
async fn failures_keep_the_previous_snapshot() {
    let log = temp_log();
    let target = Arc::new(FlakyTarget::new());
    let reference = Arc::new(ScriptedReference::new(vec![vec![holding("ETH", dec!(-2), 5)]]));

    let mut task = sync_task(reference.clone(), target.clone(), &log, false).await;

    reference.unreachable.store(true, Ordering::SeqCst);
    let err = task.run_cycle().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Network);
    assert_eq!(err.phase(), Phase::FetchReference);
    assert!(task.last_known().is_none());

    reference.unreachable.store(false, Ordering::SeqCst);
    target.fail_positions.store(true, Ordering::SeqCst);
    let err = task.run_cycle().await.unwrap_err();
    assert_eq!(err.phase(), Phase::FetchLocal);
    assert!(task.last_known().is_none());

    target.fail_positions.store(false, Ordering::SeqCst);
    let CycleOutcome::Reconciled(report) = task.run_cycle().await.unwrap() else {
        panic!("expected a reconciliation once both venues answer");
    };
    assert_eq!(report.orders_placed(), 1);
    assert_eq!(target.inner.signed_contracts(&InstrumentId::new("ETH-USDT-SWAP")).await, dec!(-20));
    assert!(task.last_known().is_some());
    std::fs::remove_file(&log).ok();
}

#[tokio::test]
async fn loop_errors_are_logged_but_network_errors_are_not() {
    let log = temp_log();
    let venue = Arc::new(PaperVenue::new(InstrumentRegistry::curated(), dec!(1000)));
    let reference = Arc::new(ScriptedReference::new(vec![]));

    let mut task = sync_task(reference.clone(), venue.clone(), &log, false).await;
    assert!(task.prime().await.unwrap().is_none());

    let (tx, rx) = watch::channel(false);
    reference.faults.lock().unwrap().extend([
        execution::Error::from(api_client::Error::ApiError { code: 51008, msg: "Order failed, insufficient margin".into() }),
        execution::Error::from(api_client::Error::HttpStatus { status: 503, body: "unavailable".into() }),
    ]);
    *reference.on_drained.lock().unwrap() = Some(tx);

    let reason = task.run(rx).await;

    assert_eq!(reason, StopReason::Interrupted);
    assert_eq!(
        notes(&log),
        [
            "loop error: fetching reference positions failed: API client error: API error: code 51008, msg: Order failed, insufficient margin",
            "manual stop",
        ]
    );
    assert!(reference.faults.lock().unwrap().is_empty());
    std::fs::remove_file(&log).ok();
}

#[tokio::test]
async fn unreadable_local_account_never_counts_as_flat() {
    let log = temp_log();
    let target = Arc::new(FlakyTarget::new());
    target.fail_positions.store(true, Ordering::SeqCst);
    let reference = Arc::new(ScriptedReference::new(vec![]));

    let mut task = sync_task(reference, target.clone(), &log, true).await;
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(true).ok();
    });
    let reason = task.run(rx).await;

    assert_eq!(reason, StopReason::Interrupted);
    let notes = notes(&log);
    assert!(notes.iter().all(|n| !n.starts_with("stop: local account flat")));
    assert!(notes[0].starts_with("loop error: fetching local positions failed"));
    assert!(notes.last().unwrap().starts_with("manual stop"));
    assert!(target.inner.fills().await.is_empty());
    std::fs::remove_file(&log).ok();
}

#[tokio::test]
async fn engine_prepares_account_and_honours_shutdown() {
    let log = temp_log();
    let target = Arc::new(FlakyTarget::new());
    let reference = Arc::new(ScriptedReference::new(vec![vec![holding("ETH", dec!(-2), 5)]]));

    let engine = Engine::new(&settings(&log, dec!(600)), InstrumentRegistry::curated(), reference, target.clone())
        .await
        .unwrap();
    let (_tx, rx) = watch::channel(true);
    let reason = engine.run(rx).await.unwrap();

    assert_eq!(reason, StopReason::Interrupted);
    assert_eq!(target.inner.position_mode().await, Some(PositionMode::Net));
    assert_eq!(target.inner.signed_contracts(&InstrumentId::new("ETH-USDT-SWAP")).await, dec!(-2));
    assert_eq!(target.inner.leverage(&InstrumentId::new("ETH-USDT-SWAP")).await, Some(5));
    assert_eq!(notes(&log), ["startup", "after initial sync", "manual stop"]);
    std::fs::remove_file(&log).ok();
}

#[tokio::test]
async fn engine_refuses_to_start_without_net_mode() {
    let log = temp_log();
    let target = Arc::new(FlakyTarget::new());
    target.fail_mode.store(true, Ordering::SeqCst);
    let reference = Arc::new(ScriptedReference::new(vec![vec![holding("BTC", dec!(1), 10)]]));

    let engine = Engine::new(&settings(&log, dec!(6000)), InstrumentRegistry::curated(), reference, target.clone())
        .await
        .unwrap();
    let (_tx, rx) = watch::channel(false);
    let err = engine.run(rx).await.unwrap_err();

    assert_eq!(err.phase(), Phase::SetPositionMode);
    assert!(target.inner.fills().await.is_empty());
    std::fs::remove_file(&log).ok();
}
