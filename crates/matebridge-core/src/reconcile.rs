// ── Status reconciler ──
//
// One pass: list cars, mirror their identity into `info.*`, bootstrap the
// per-vehicle command and setting nodes, then fetch every status payload
// concurrently and mirror the flattened fields into `status.*`.

use std::sync::Arc;

use futures_util::future::join_all;
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use matebridge_api::Car;

use crate::api::VehicleApi;
use crate::catalog::Catalog;
use crate::connection::ConnectionFlag;
use crate::error::CoreError;
use crate::fleet::{Fleet, VehicleState};
use crate::flatten::flatten;
use crate::path;
use crate::registry::ObjectRegistry;
use crate::tree::{ObjectSpec, StateTree};
use crate::value::StateValue;

/// Outcome of one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    /// VINs whose status was mirrored.
    pub refreshed: Vec<String>,
    /// VINs whose status fetch failed.
    pub failed: Vec<String>,
    /// Listed cars without a VIN.
    pub skipped: usize,
    /// Values written during the pass.
    pub writes: usize,
}

pub struct Reconciler<A> {
    api: Arc<A>,
    tree: Arc<StateTree>,
    registry: Arc<ObjectRegistry>,
    fleet: Arc<Fleet>,
    catalog: Arc<Catalog>,
    flag: ConnectionFlag,
    pass: Mutex<()>,
}

impl<A: VehicleApi> Reconciler<A> {
    pub fn new(
        api: Arc<A>,
        tree: Arc<StateTree>,
        registry: Arc<ObjectRegistry>,
        fleet: Arc<Fleet>,
        catalog: Arc<Catalog>,
        flag: ConnectionFlag,
    ) -> Self {
        Self {
            api,
            tree,
            registry,
            fleet,
            catalog,
            flag,
            pass: Mutex::new(()),
        }
    }

    /// Run one pass. Concurrent callers queue behind each other.
    ///
    /// Only a failed car list fails the pass; per-vehicle status failures
    /// are logged and reported in the summary.
    pub async fn reconcile(&self) -> Result<ReconcileSummary, CoreError> {
        let _pass = self.pass.lock().await;

        let cars = match self.api.list_cars().await {
            Ok(cars) => cars,
            Err(e) => {
                warn!(error = %e, "failed to list cars");
                self.flag.clear();
                return Err(e.into());
            }
        };

        let mut summary = ReconcileSummary::default();
        let mut known: Vec<(String, Car)> = Vec::with_capacity(cars.len());
        for car in cars {
            match car.vin() {
                Some(vin) => known.push((vin.to_owned(), car)),
                None => {
                    warn!(car_id = %car.car_id, "car without VIN skipped");
                    summary.skipped += 1;
                }
            }
        }

        for (vin, car) in &known {
            summary.writes += self.mirror_info(vin, car);
        }

        let fetches = known.iter().map(|(vin, car)| async move {
            (vin, self.api.car_status(&car.car_id).await)
        });

        for (vin, result) in join_all(fetches).await {
            match result {
                Ok(status) => {
                    summary.writes += self.mirror_status(vin, &status);
                    summary.refreshed.push(vin.clone());
                }
                Err(e) => {
                    warn!(vin = %vin, error = %e, "status fetch failed");
                    self.flag.clear();
                    summary.failed.push(vin.clone());
                }
            }
        }

        debug!(
            refreshed = summary.refreshed.len(),
            failed = summary.failed.len(),
            writes = summary.writes,
            "reconciliation pass complete"
        );
        Ok(summary)
    }

    // ── Mirroring ────────────────────────────────────────────────────

    fn mirror_info(&self, vin: &str, car: &Car) -> usize {
        if self.fleet.observe(vin, &car.car_id, car.name.as_deref()) {
            info!(vin, car_id = %car.car_id, "discovered vehicle");
            self.bootstrap(vin);
        }

        let mut writes = 0;
        let car_id = car_id_value(car);
        if self.mirror(&path::car_id(vin), "car_id", car_id) {
            writes += 1;
        }

        for field in flatten(&car.car_details) {
            let target = path::info(vin, &field.path);
            if self.mirror(&target, &field.name, field.value) {
                writes += 1;
            }
        }
        writes
    }

    fn mirror_status(&self, vin: &str, status: &Map<String, Value>) -> usize {
        let mut writes = 0;
        let mut state = None;

        for field in flatten(status) {
            if field.path == "state" {
                state = Some(VehicleState::parse(&field.value.to_string()));
            }
            let target = path::status(vin, &field.path);
            if self.mirror(&target, &field.name, field.value) {
                writes += 1;
            }
        }

        self.fleet.record_status(vin, state);
        writes
    }

    /// Declare (once) and write one read-only mirror node.
    fn mirror(&self, target: &str, name: &str, value: StateValue) -> bool {
        let spec = ObjectSpec::mirror(name, value.value_type());
        if let Err(e) = self.registry.ensure(target, spec) {
            warn!(path = target, error = %e, "skipping undeclarable field");
            return false;
        }
        match self.tree.write_ack(target, value) {
            Ok(()) => true,
            Err(e) => {
                warn!(path = target, error = %e, "mirror write failed");
                false
            }
        }
    }

    /// Declare the vehicle's `commands.*` and `settings.*` nodes.
    fn bootstrap(&self, vin: &str) {
        for def in self.catalog.commands() {
            let target = path::command(vin, &def.name);
            if let Err(e) = self.registry.ensure(&target, ObjectSpec::command(def)) {
                warn!(path = %target, error = %e, "cannot declare command node");
            }
        }
        for def in self.catalog.settings() {
            let target = path::setting(vin, &def.name);
            if let Err(e) = self.registry.ensure(&target, ObjectSpec::setting(def)) {
                warn!(path = %target, error = %e, "cannot declare setting node");
            }
        }
    }
}

/// `car_id` is numeric upstream; keep it numeric when it parses.
fn car_id_value(car: &Car) -> StateValue {
    car.car_id
        .as_str()
        .parse::<u64>()
        .map_or_else(|_| StateValue::from(car.car_id.as_str()), |n| StateValue::Number(n.into()))
}
