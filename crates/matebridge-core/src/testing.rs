#![allow(clippy::unwrap_used)]
// In-memory `VehicleApi` for core tests.
//
// Status answers are scripted per car: each fetch consumes the front of
// the script until one entry is left, which then repeats.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{Map, Value, json};

use matebridge_api::{Car, CarId, Error as ApiError, PingResponse};

use crate::api::VehicleApi;
use crate::catalog::Catalog;
use crate::connection::ConnectionFlag;
use crate::dispatch::{Dispatcher, WakePolicy};
use crate::fleet::Fleet;
use crate::path;
use crate::reconcile::Reconciler;
use crate::registry::ObjectRegistry;
use crate::tree::{ObjectSpec, StateTree};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Ping,
    ListCars,
    Status(String),
    Command {
        car_id: String,
        command: String,
        body: Option<Value>,
    },
    Resume(String),
}

type Answer = Result<Value, u16>;

#[derive(Default)]
struct FakeState {
    cars: Vec<Car>,
    statuses: HashMap<String, VecDeque<Answer>>,
    ping_ok: bool,
    list_fails: bool,
    command_status: Option<u16>,
    delay: Option<Duration>,
    calls: Vec<Call>,
}

pub(crate) struct FakeApi {
    state: Mutex<FakeState>,
}

impl FakeApi {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                ping_ok: true,
                ..FakeState::default()
            }),
        }
    }

    // ── Builders ─────────────────────────────────────────────────────

    pub(crate) fn with_car(self, car_id: u64, vin: &str) -> Self {
        let car: Car = serde_json::from_value(json!({
            "car_id": car_id,
            "name": format!("car {car_id}"),
            "car_details": { "vin": vin, "model": "3" }
        }))
        .unwrap();
        self.state.lock().unwrap().cars.push(car);
        self
    }

    pub(crate) fn with_status(self, car_id: u64, status: Value) -> Self {
        self.script(car_id, vec![Ok(status)]);
        self
    }

    pub(crate) fn with_status_error(self, car_id: u64, http_status: u16) -> Self {
        self.script(car_id, vec![Err(http_status)]);
        self
    }

    /// States answered in order; the last one repeats.
    pub(crate) fn with_state_script(self, car_id: u64, states: &[&str]) -> Self {
        self.script(
            car_id,
            states.iter().map(|s| Ok(json!({ "state": s }))).collect(),
        );
        self
    }

    // ── Runtime knobs ────────────────────────────────────────────────

    pub(crate) fn set_status(&self, car_id: u64, status: Value) {
        self.script(car_id, vec![Ok(status)]);
    }

    pub(crate) fn set_ping(&self, ok: bool) {
        self.state.lock().unwrap().ping_ok = ok;
    }

    pub(crate) fn fail_list_cars(&self, fail: bool) {
        self.state.lock().unwrap().list_fails = fail;
    }

    pub(crate) fn fail_commands(&self, http_status: Option<u16>) {
        self.state.lock().unwrap().command_status = http_status;
    }

    /// Stall every car list and status fetch after recording it.
    pub(crate) fn set_delay(&self, delay: Option<Duration>) {
        self.state.lock().unwrap().delay = delay;
    }

    fn script(&self, car_id: u64, answers: Vec<Answer>) {
        self.state
            .lock()
            .unwrap()
            .statuses
            .insert(car_id.to_string(), answers.into());
    }

    // ── Inspection ───────────────────────────────────────────────────

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub(crate) fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.state.lock().unwrap().calls.iter().filter(|c| pred(c)).count()
    }

    pub(crate) fn commands(&self) -> Vec<(String, Option<Value>)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Command { command, body, .. } => Some((command, body)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.state.lock().unwrap().calls.push(call);
    }

    async fn lag(&self) {
        let delay = self.state.lock().unwrap().delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

fn api_error(status: u16) -> ApiError {
    ApiError::Api {
        status,
        message: "scripted failure".into(),
    }
}

impl VehicleApi for FakeApi {
    async fn ping(&self) -> Result<PingResponse, ApiError> {
        self.record(Call::Ping);
        if self.state.lock().unwrap().ping_ok {
            Ok(serde_json::from_value(json!({ "message": "pong" })).unwrap())
        } else {
            Err(api_error(503))
        }
    }

    async fn list_cars(&self) -> Result<Vec<Car>, ApiError> {
        self.record(Call::ListCars);
        self.lag().await;
        let state = self.state.lock().unwrap();
        if state.list_fails {
            return Err(api_error(500));
        }
        Ok(state.cars.clone())
    }

    async fn car_status(&self, car_id: &CarId) -> Result<Map<String, Value>, ApiError> {
        self.record(Call::Status(car_id.to_string()));
        self.lag().await;
        let mut state = self.state.lock().unwrap();
        let answer = match state.statuses.get_mut(car_id.as_str()) {
            Some(script) if script.len() > 1 => script.pop_front().unwrap(),
            Some(script) => script.front().cloned().unwrap(),
            None => Ok(json!({})),
        };
        match answer {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Ok(Map::new()),
            Err(status) => Err(api_error(status)),
        }
    }

    async fn send_command(
        &self,
        car_id: &CarId,
        command: &str,
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        self.record(Call::Command {
            car_id: car_id.to_string(),
            command: command.to_owned(),
            body: body.cloned(),
        });
        match self.state.lock().unwrap().command_status {
            Some(status) => Err(api_error(status)),
            None => Ok(json!({ "response": { "result": true } })),
        }
    }

    async fn resume_logging(&self, car_id: &CarId) -> Result<Value, ApiError> {
        self.record(Call::Resume(car_id.to_string()));
        Ok(Value::Null)
    }
}

// ── Component harness ────────────────────────────────────────────────

pub(crate) struct Harness {
    pub api: Arc<FakeApi>,
    pub tree: Arc<StateTree>,
    pub registry: Arc<ObjectRegistry>,
    pub fleet: Arc<Fleet>,
    pub catalog: Arc<Catalog>,
    pub flag: ConnectionFlag,
    pub reconciler: Arc<Reconciler<FakeApi>>,
}

impl Harness {
    pub(crate) fn dispatcher(&self, policy: WakePolicy) -> Dispatcher<FakeApi> {
        Dispatcher::new(
            Arc::clone(&self.api),
            Arc::clone(&self.tree),
            Arc::clone(&self.fleet),
            Arc::clone(&self.catalog),
            Arc::clone(&self.reconciler),
            self.flag.clone(),
            policy,
        )
    }
}

pub(crate) fn harness(api: FakeApi) -> Harness {
    let api = Arc::new(api);
    let tree = Arc::new(StateTree::new());
    let registry = Arc::new(ObjectRegistry::new(Arc::clone(&tree)));
    registry
        .ensure(path::CONNECTION, ObjectSpec::connection())
        .unwrap();
    let fleet = Arc::new(Fleet::new());
    let catalog = Arc::new(Catalog::builtin());
    let flag = ConnectionFlag::new(Arc::clone(&tree));
    let reconciler = Arc::new(Reconciler::new(
        Arc::clone(&api),
        Arc::clone(&tree),
        Arc::clone(&registry),
        Arc::clone(&fleet),
        Arc::clone(&catalog),
        flag.clone(),
    ));
    Harness {
        api,
        tree,
        registry,
        fleet,
        catalog,
        flag,
        reconciler,
    }
}
