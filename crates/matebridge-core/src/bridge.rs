// ── Bridge lifecycle ──
//
// Wires the tree, registry, fleet, reconciler, dispatcher, and health
// monitor together and owns the background tasks: the refresh timer, the
// health timer, and the user-write processor.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use matebridge_api::TeslaMateClient;

use crate::api::VehicleApi;
use crate::catalog::Catalog;
use crate::config::BridgeConfig;
use crate::connection::ConnectionFlag;
use crate::dispatch::{Dispatcher, WakeOutcome};
use crate::error::CoreError;
use crate::fleet::{Fleet, Vehicle};
use crate::health::HealthMonitor;
use crate::path::{self, ControlTarget};
use crate::reconcile::{ReconcileSummary, Reconciler};
use crate::registry::ObjectRegistry;
use crate::tree::{ObjectSpec, StateTree, UserWrite};
use crate::value::StateValue;

// ── Bridge ───────────────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<BridgeInner>`. [`start()`](Self::start)
/// primes the tree and spawns the background tasks;
/// [`shutdown()`](Self::shutdown) tears them down.
pub struct Bridge<A = TeslaMateClient> {
    inner: Arc<BridgeInner<A>>,
}

impl<A> Clone for Bridge<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct BridgeInner<A> {
    config: BridgeConfig,
    api: Arc<A>,
    tree: Arc<StateTree>,
    registry: Arc<ObjectRegistry>,
    fleet: Arc<Fleet>,
    catalog: Arc<Catalog>,
    flag: ConnectionFlag,
    reconciler: Arc<Reconciler<A>>,
    dispatcher: Arc<Dispatcher<A>>,
    health: HealthMonitor<A>,
    cancel: CancellationToken,
    stopped: AtomicBool,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Bridge<TeslaMateClient> {
    /// Build a bridge talking to the configured TeslaMate API.
    pub fn connect(config: BridgeConfig) -> Result<Self, CoreError> {
        let client =
            TeslaMateClient::new(config.url.as_str(), &config.access_token, &config.transport())?;
        Ok(Self::new(config, client))
    }
}

impl<A: VehicleApi> Bridge<A> {
    /// Create a bridge. Does NOT talk to the API; call
    /// [`start()`](Self::start) or use [`oneshot()`](Self::oneshot).
    pub fn new(config: BridgeConfig, api: A) -> Self {
        let api = Arc::new(api);
        let tree = Arc::new(StateTree::new());
        let registry = Arc::new(ObjectRegistry::new(Arc::clone(&tree)));
        let fleet = Arc::new(Fleet::new());
        let catalog = Arc::new(config.catalog.clone());
        let flag = ConnectionFlag::new(Arc::clone(&tree));

        let reconciler = Arc::new(Reconciler::new(
            Arc::clone(&api),
            Arc::clone(&tree),
            Arc::clone(&registry),
            Arc::clone(&fleet),
            Arc::clone(&catalog),
            flag.clone(),
        ));
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&api),
            Arc::clone(&tree),
            Arc::clone(&fleet),
            Arc::clone(&catalog),
            Arc::clone(&reconciler),
            flag.clone(),
            config.wake,
        ));
        let health = HealthMonitor::new(Arc::clone(&api), flag.clone());

        Self {
            inner: Arc::new(BridgeInner {
                config,
                api,
                tree,
                registry,
                fleet,
                catalog,
                flag,
                reconciler,
                dispatcher,
                health,
                cancel: CancellationToken::new(),
                stopped: AtomicBool::new(false),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn config(&self) -> &BridgeConfig {
        &self.inner.config
    }

    pub fn api(&self) -> &Arc<A> {
        &self.inner.api
    }

    pub fn tree(&self) -> &Arc<StateTree> {
        &self.inner.tree
    }

    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }

    pub fn connection(&self) -> &ConnectionFlag {
        &self.inner.flag
    }

    pub fn vehicles(&self) -> Vec<Vehicle> {
        self.inner.fleet.snapshot()
    }

    pub fn vehicle(&self, vin: &str) -> Option<Vehicle> {
        self.inner.fleet.get(vin)
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Declare `info.connection`, check health, and run one pass.
    ///
    /// Neither failure is fatal: the flag reflects health and the next
    /// timer tick retries the pass.
    pub async fn prime(&self) -> Option<ReconcileSummary> {
        self.declare_connection();
        self.inner.health.check_health().await;
        match self.inner.reconciler.reconcile().await {
            Ok(summary) => Some(summary),
            Err(e) => {
                warn!(error = %e, "initial reconciliation failed");
                None
            }
        }
    }

    /// Prime the tree and spawn the refresh timer, the health timer, and
    /// the user-write processor.
    pub async fn start(&self) {
        if self.inner.stopped.load(Ordering::Acquire) {
            warn!("start called on a bridge that was shut down");
            return;
        }

        self.prime().await;

        let mut handles = self.inner.task_handles.lock().await;
        if !handles.is_empty() {
            debug!("background tasks already running");
            return;
        }

        if let Some(rx) = self.inner.tree.take_user_writes().await {
            let bridge = self.clone();
            let cancel = self.inner.cancel.clone();
            handles.push(tokio::spawn(write_processor_task(bridge, rx, cancel)));
        }

        let refresh = self.inner.config.effective_refresh_interval();
        let bridge = self.clone();
        let cancel = self.inner.cancel.clone();
        handles.push(tokio::spawn(refresh_task(bridge, refresh, cancel)));

        let health = self.inner.config.health_interval;
        let bridge = self.clone();
        let cancel = self.inner.cancel.clone();
        handles.push(tokio::spawn(health_task(bridge, health, cancel)));

        info!(
            refresh_secs = refresh.as_secs(),
            health_secs = health.as_secs(),
            force_wake = self.inner.config.wake.force_wake,
            "bridge started"
        );
    }

    /// Cancel and join every background task, then clear the connection
    /// flag. Only the first call does anything.
    pub async fn shutdown(&self) {
        if self.inner.stopped.swap(true, Ordering::AcqRel) {
            return;
        }
        self.inner.cancel.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }

        self.inner.flag.clear();
        info!("bridge stopped");
    }

    /// One-shot: prime, run the closure, shut down. No timers are spawned.
    ///
    /// Unlike [`start()`](Self::start), a failed initial pass is returned
    /// instead of being left to the next timer tick.
    pub async fn oneshot<F, Fut, T>(config: BridgeConfig, api: A, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(Bridge<A>) -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        let bridge = Self::new(config, api);
        bridge.declare_connection();
        bridge.inner.health.check_health().await;

        let result = match bridge.inner.reconciler.reconcile().await {
            Ok(_) => f(bridge.clone()).await,
            Err(e) => Err(e),
        };
        bridge.shutdown().await;
        result
    }

    fn declare_connection(&self) {
        if let Err(e) = self
            .inner
            .registry
            .ensure(path::CONNECTION, ObjectSpec::connection())
        {
            warn!(error = %e, "cannot declare connection node");
        }
    }

    // ── Operations ───────────────────────────────────────────────────

    pub async fn reconcile(&self) -> Result<ReconcileSummary, CoreError> {
        self.inner.reconciler.reconcile().await
    }

    pub async fn check_health(&self) -> bool {
        self.inner.health.check_health().await
    }

    /// Send a catalog command directly, bypassing the tree.
    pub async fn dispatch_command(&self, vin: &str, name: &str) -> Result<WakeOutcome, CoreError> {
        self.inner.dispatcher.dispatch_command(vin, name).await
    }

    /// Send a setting directly and echo it into the tree as acknowledged.
    pub async fn dispatch_setting(
        &self,
        vin: &str,
        name: &str,
        value: &StateValue,
    ) -> Result<WakeOutcome, CoreError> {
        let result = self.inner.dispatcher.dispatch_setting(vin, name, value).await;
        self.acknowledge(&path::setting(vin, name), value.clone());
        result
    }

    /// Press a command node as a user would. Handled by the write processor.
    pub fn write_command(&self, vin: &str, name: &str) -> Result<(), CoreError> {
        self.inner
            .tree
            .write_user(&path::command(vin, name), StateValue::Bool(true))
    }

    /// Change a setting node as a user would. Handled by the write processor.
    pub fn write_setting(&self, vin: &str, name: &str, value: StateValue) -> Result<(), CoreError> {
        self.inner.tree.write_user(&path::setting(vin, name), value)
    }

    async fn handle_user_write(&self, write: UserWrite) {
        info!(path = %write.path, value = %write.value, "state changed by user");
        match path::parse_control(&write.path) {
            Some(ControlTarget::Command { vin, command }) => {
                // The dispatcher has already logged and cleared the flag
                if let Err(e) = self.inner.dispatcher.dispatch_command(&vin, &command).await {
                    debug!(
                        vin = %vin,
                        command = %command,
                        error = %e,
                        "user command not delivered"
                    );
                }
            }
            Some(ControlTarget::Setting { vin, setting }) => {
                if let Err(e) = self
                    .inner
                    .dispatcher
                    .dispatch_setting(&vin, &setting, &write.value)
                    .await
                {
                    debug!(
                        vin = %vin,
                        setting = %setting,
                        error = %e,
                        "user setting not delivered"
                    );
                }
                self.acknowledge(&write.path, write.value);
            }
            None => debug!(path = %write.path, "write outside commands/settings ignored"),
        }
    }

    fn acknowledge(&self, target: &str, value: StateValue) {
        if let Err(e) = self.inner.tree.write_ack(target, value) {
            warn!(path = target, error = %e, "cannot acknowledge setting");
        }
    }
}

// ── Background tasks ─────────────────────────────────────────────────

async fn refresh_task<A: VehicleApi>(bridge: Bridge<A>, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                if let Err(e) = bridge.inner.reconciler.reconcile().await {
                    warn!(error = %e, "periodic refresh failed");
                }
            }
        }
    }
}

async fn health_task<A: VehicleApi>(bridge: Bridge<A>, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    interval.tick().await;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                bridge.inner.health.check_health().await;
            }
        }
    }
}

/// Turn user writes into dispatches. Each write runs in its own task so
/// a wake-up on one vehicle never delays another; same-VIN dispatches
/// queue on the dispatcher's per-VIN lock. In-flight dispatches are
/// aborted on shutdown.
async fn write_processor_task<A: VehicleApi>(
    bridge: Bridge<A>,
    mut rx: mpsc::UnboundedReceiver<UserWrite>,
    cancel: CancellationToken,
) {
    let mut in_flight = JoinSet::new();

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            write = rx.recv() => {
                let Some(write) = write else { break };
                let bridge = bridge.clone();
                in_flight.spawn(async move { bridge.handle_user_write(write).await });
            }
            Some(_) = in_flight.join_next(), if !in_flight.is_empty() => {}
        }
    }

    in_flight.shutdown().await;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::dispatch::WakePolicy;
    use crate::testing::{Call, FakeApi};
    use secrecy::SecretString;
    use serde_json::json;

    fn config() -> BridgeConfig {
        BridgeConfig::new(
            "http://teslamate.local:4000".parse().unwrap(),
            SecretString::from("t".to_owned()),
        )
    }

    fn fleet_api() -> FakeApi {
        FakeApi::new()
            .with_car(1, "VIN1")
            .with_status(1, json!({ "state": "online", "battery_level": 64 }))
    }

    async fn eventually(what: &str, cond: impl Fn() -> bool) {
        for _ in 0..200 {
            if cond() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("timed out waiting for {what}");
    }

    #[tokio::test(start_paused = true)]
    async fn start_primes_tree_and_connection() {
        let bridge = Bridge::new(config(), fleet_api());
        bridge.start().await;

        assert!(bridge.connection().is_connected());
        assert_eq!(
            bridge.tree().value(path::CONNECTION),
            Some(StateValue::Bool(true))
        );
        assert_eq!(
            bridge.tree().value("cars.VIN1.status.battery_level"),
            Some(StateValue::from(64_i64))
        );
        assert_eq!(bridge.vehicles().len(), 1);

        bridge.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn setting_write_round_trips_through_dispatcher() {
        let bridge = Bridge::new(config(), fleet_api());
        bridge.start().await;

        bridge
            .write_setting("VIN1", "charge_limit", StateValue::from(80_i64))
            .unwrap();
        assert!(!bridge.tree().read("cars.VIN1.settings.charge_limit").unwrap().ack);

        let tree = Arc::clone(bridge.tree());
        eventually("setting acknowledgement", || {
            tree.read("cars.VIN1.settings.charge_limit")
                .is_some_and(|e| e.ack)
        })
        .await;

        assert_eq!(
            bridge.api().commands(),
            vec![("set_charge_limit".to_owned(), Some(json!({ "percent": 80 })))]
        );
        assert_eq!(
            bridge.tree().value("cars.VIN1.settings.charge_limit"),
            Some(StateValue::from(80_i64))
        );

        bridge.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn setting_is_acknowledged_even_when_dispatch_fails() {
        let bridge = Bridge::new(config(), fleet_api());
        bridge.start().await;
        bridge.api().fail_commands(Some(500));

        bridge
            .write_setting("VIN1", "charging_amps", StateValue::from(16_i64))
            .unwrap();

        let tree = Arc::clone(bridge.tree());
        eventually("setting acknowledgement", || {
            tree.read("cars.VIN1.settings.charging_amps")
                .is_some_and(|e| e.ack)
        })
        .await;
        assert!(!bridge.connection().is_connected());

        bridge.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn command_write_is_dispatched() {
        let bridge = Bridge::new(config(), fleet_api());
        bridge.start().await;

        bridge.write_command("VIN1", "flash_lights").unwrap();

        let api = Arc::clone(bridge.api());
        eventually("command dispatch", || !api.commands().is_empty()).await;
        assert_eq!(api.commands(), vec![("flash_lights".to_owned(), None)]);

        bridge.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn writes_to_unknown_vehicles_are_rejected() {
        let bridge = Bridge::new(config(), fleet_api());
        bridge.start().await;

        assert!(matches!(
            bridge.write_command("NOPE", "flash_lights"),
            Err(CoreError::Tree { .. })
        ));

        bridge.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_timer_reconciles_periodically() {
        let mut cfg = config();
        cfg.refresh_interval = Duration::from_secs(10);
        let bridge = Bridge::new(cfg, fleet_api());
        bridge.start().await;

        let statuses = || bridge.api().count(|c| matches!(c, Call::Status(_)));
        assert_eq!(statuses(), 1);

        tokio::time::sleep(Duration::from_millis(10_500)).await;
        assert_eq!(statuses(), 2);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(statuses(), 3);

        bridge.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn slow_pass_does_not_queue_a_burst_of_refreshes() {
        let mut cfg = config();
        cfg.refresh_interval = Duration::from_secs(10);
        let bridge = Bridge::new(cfg, fleet_api());
        bridge.start().await;

        let listings = || bridge.api().count(|c| matches!(c, Call::ListCars));
        assert_eq!(listings(), 1);

        // The pass that starts at t=10 stalls on the car list until t=55
        bridge.api().set_delay(Some(Duration::from_secs(45)));
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(listings(), 2);
        bridge.api().set_delay(None);

        // One catch-up pass at t=55, then back on the period
        tokio::time::sleep(Duration::from_secs(38)).await;
        assert_eq!(listings(), 3);

        tokio::time::sleep(Duration::from_secs(8)).await;
        assert_eq!(listings(), 4);

        bridge.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn failed_user_command_leaves_the_processor_running() {
        let bridge = Bridge::new(config(), fleet_api());
        bridge.start().await;
        bridge.api().fail_commands(Some(500));

        bridge.write_command("VIN1", "flash_lights").unwrap();
        let api = Arc::clone(bridge.api());
        eventually("failed dispatch", || api.commands().len() == 1).await;
        assert!(!bridge.connection().is_connected());

        api.fail_commands(None);
        bridge.write_command("VIN1", "door_lock").unwrap();
        eventually("second dispatch", || api.commands().len() == 2).await;
        assert_eq!(api.commands()[1].0, "door_lock");

        bridge.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn health_timer_restores_connection() {
        let bridge = Bridge::new(config(), fleet_api());
        bridge.api().set_ping(false);
        bridge.start().await;
        assert!(!bridge.connection().is_connected());

        bridge.api().set_ping(true);
        tokio::time::sleep(Duration::from_secs(61)).await;
        assert!(bridge.connection().is_connected());

        bridge.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_timers_and_clears_flag_once() {
        let bridge = Bridge::new(config(), fleet_api());
        bridge.start().await;
        assert!(bridge.connection().is_connected());

        bridge.shutdown().await;
        assert!(!bridge.connection().is_connected());
        assert_eq!(
            bridge.tree().value(path::CONNECTION),
            Some(StateValue::Bool(false))
        );

        let calls = bridge.api().calls().len();
        let revision = *bridge.tree().subscribe_revision().borrow();
        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(bridge.api().calls().len(), calls);

        bridge.shutdown().await;
        assert_eq!(*bridge.tree().subscribe_revision().borrow(), revision);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_aborts_pending_wake_up() {
        let mut cfg = config();
        cfg.wake = WakePolicy::forced();
        let api = FakeApi::new()
            .with_car(1, "VIN1")
            .with_status(1, json!({ "state": "asleep" }));
        let bridge = Bridge::new(cfg, api);
        bridge.start().await;

        bridge.write_command("VIN1", "charge_start").unwrap();
        let api = Arc::clone(bridge.api());
        eventually("wake-up", || {
            api.commands().iter().any(|(c, _)| c == "wake_up")
        })
        .await;

        bridge.shutdown().await;
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(!api.commands().iter().any(|(c, _)| c == "charge_start"));
    }

    #[tokio::test]
    async fn oneshot_runs_closure_without_timers() {
        let result = Bridge::oneshot(config(), fleet_api(), |bridge| async move {
            assert!(bridge.connection().is_connected());
            bridge.dispatch_command("VIN1", "charge_stop").await?;
            Ok(bridge.vehicles())
        })
        .await
        .unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].vin, "VIN1");
    }

    #[tokio::test]
    async fn oneshot_surfaces_a_failed_initial_pass() {
        let api = fleet_api();
        api.fail_list_cars(true);

        let ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran);
        let result = Bridge::oneshot(config(), api, |_bridge| async move {
            flag.store(true, Ordering::SeqCst);
            Ok(())
        })
        .await;

        assert!(matches!(result, Err(CoreError::Api { status: Some(500), .. })));
        assert!(!ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn dispatch_setting_echoes_value() {
        let result = Bridge::oneshot(config(), fleet_api(), |bridge| async move {
            bridge
                .dispatch_setting("VIN1", "charge_limit", &StateValue::from(90_i64))
                .await?;
            Ok(bridge.tree().read("cars.VIN1.settings.charge_limit"))
        })
        .await
        .unwrap()
        .unwrap();

        assert!(result.ack);
        assert_eq!(result.value, StateValue::from(90_i64));
    }
}
