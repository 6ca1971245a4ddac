// ── Command dispatcher ──
//
// Routes command and setting writes to `POST /v1/cars/{id}/command/{cmd}`.
// Dispatches for the same VIN run one at a time. With force-wake enabled a
// vehicle whose last known state is not `online` is woken first:
//
//   Idle ─▶ Waking (wake_up) ─▶ Polling (resume logging, then
//   sleep/reconcile/re-read up to the ceiling) ─▶ Ready | TimedOut
//
// The original command is sent in both terminal states.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use matebridge_api::CarId;

use crate::api::VehicleApi;
use crate::catalog::Catalog;
use crate::connection::ConnectionFlag;
use crate::error::CoreError;
use crate::fleet::{Fleet, VehicleState};
use crate::path;
use crate::reconcile::Reconciler;
use crate::tree::StateTree;
use crate::value::StateValue;

/// Command that wakes a vehicle. Never triggers the wake loop itself.
pub const WAKE_UP: &str = "wake_up";

/// Wake-up behaviour for commands sent to non-online vehicles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WakePolicy {
    /// Wake the vehicle before sending commands (`force_command_execution`).
    pub force_wake: bool,
    /// Delay between state polls.
    pub poll_interval: Duration,
    /// Ceiling on the whole polling phase.
    pub max_wait: Duration,
}

impl Default for WakePolicy {
    fn default() -> Self {
        Self {
            force_wake: false,
            poll_interval: Duration::from_millis(2000),
            max_wait: Duration::from_millis(40_000),
        }
    }
}

impl WakePolicy {
    pub fn forced() -> Self {
        Self {
            force_wake: true,
            ..Self::default()
        }
    }

    /// Upper bound on polling iterations.
    pub fn max_polls(&self) -> u32 {
        let interval = self.poll_interval.as_millis().max(1);
        u32::try_from(self.max_wait.as_millis() / interval).unwrap_or(u32::MAX)
    }
}

/// How the wake-up phase ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeOutcome {
    /// The wake loop was not entered.
    NotNeeded,
    /// The vehicle reported `online` after `polls` polls.
    Ready { polls: u32 },
    /// The ceiling was reached; the command was sent anyway.
    TimedOut { polls: u32 },
}

/// A command bound for one vehicle, already in wire form.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandRequest {
    pub vin: String,
    /// Wire command name.
    pub command: String,
    pub payload: Option<Map<String, Value>>,
}

impl CommandRequest {
    pub fn new(vin: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            vin: vin.into(),
            command: command.into(),
            payload: None,
        }
    }

    #[must_use]
    pub fn with_payload(mut self, payload: Map<String, Value>) -> Self {
        self.payload = Some(payload);
        self
    }
}

pub struct Dispatcher<A> {
    api: Arc<A>,
    tree: Arc<StateTree>,
    fleet: Arc<Fleet>,
    catalog: Arc<Catalog>,
    reconciler: Arc<Reconciler<A>>,
    flag: ConnectionFlag,
    policy: WakePolicy,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl<A: VehicleApi> Dispatcher<A> {
    pub fn new(
        api: Arc<A>,
        tree: Arc<StateTree>,
        fleet: Arc<Fleet>,
        catalog: Arc<Catalog>,
        reconciler: Arc<Reconciler<A>>,
        flag: ConnectionFlag,
        policy: WakePolicy,
    ) -> Self {
        Self {
            api,
            tree,
            fleet,
            catalog,
            reconciler,
            flag,
            policy,
            locks: DashMap::new(),
        }
    }

    pub fn policy(&self) -> WakePolicy {
        self.policy
    }

    // ── Routing ──────────────────────────────────────────────────────

    /// Build the request for a catalog command.
    pub fn command_request(&self, vin: &str, name: &str) -> Result<CommandRequest, CoreError> {
        let def = self.catalog.command(name)?;
        Ok(CommandRequest::new(vin, def.wire_name()))
    }

    /// Build the `set_<setting>` request carrying `value`.
    pub fn setting_request(
        &self,
        vin: &str,
        name: &str,
        value: &StateValue,
    ) -> Result<CommandRequest, CoreError> {
        let def = self.catalog.setting(name)?;
        debug!(vin, setting = name, param = %def.wire_param, "routing setting");
        Ok(CommandRequest::new(vin, def.command_name()).with_payload(def.payload(value)))
    }

    pub async fn dispatch_command(&self, vin: &str, name: &str) -> Result<WakeOutcome, CoreError> {
        match self.command_request(vin, name) {
            Ok(request) => self.dispatch(request).await,
            Err(e) => Err(self.rejected(vin, name, e)),
        }
    }

    pub async fn dispatch_setting(
        &self,
        vin: &str,
        name: &str,
        value: &StateValue,
    ) -> Result<WakeOutcome, CoreError> {
        match self.setting_request(vin, name, value) {
            Ok(request) => self.dispatch(request).await,
            Err(e) => Err(self.rejected(vin, name, e)),
        }
    }

    fn rejected(&self, vin: &str, name: &str, e: CoreError) -> CoreError {
        error!(vin, name, error = %e, "cannot route write");
        self.flag.clear();
        e
    }

    // ── Dispatch ─────────────────────────────────────────────────────

    /// Send one request, waking the vehicle first when the policy says so.
    pub async fn dispatch(&self, request: CommandRequest) -> Result<WakeOutcome, CoreError> {
        let lock = self.vehicle_lock(&request.vin);
        let _guard = lock.lock().await;

        let result = self.dispatch_locked(&request).await;
        match &result {
            Ok(outcome) => info!(
                vin = %request.vin,
                command = %request.command,
                ?outcome,
                "command sent"
            ),
            Err(e) => {
                error!(vin = %request.vin, command = %request.command, error = %e, "command failed");
                self.flag.clear();
            }
        }
        result
    }

    fn vehicle_lock(&self, vin: &str) -> Arc<Mutex<()>> {
        Arc::clone(self.locks.entry(vin.to_owned()).or_default().value())
    }

    async fn dispatch_locked(&self, request: &CommandRequest) -> Result<WakeOutcome, CoreError> {
        let car_id = self.resolve_car_id(&request.vin)?;

        let outcome = if self.should_wake(request) {
            self.wake(&request.vin, &car_id).await
        } else {
            WakeOutcome::NotNeeded
        };

        self.send(&request.vin, &car_id, &request.command, request.payload.as_ref())
            .await?;
        Ok(outcome)
    }

    fn should_wake(&self, request: &CommandRequest) -> bool {
        request.command != WAKE_UP
            && self.policy.force_wake
            && self
                .fleet
                .get(&request.vin)
                .is_some_and(|vehicle| vehicle.needs_wake())
    }

    fn resolve_car_id(&self, vin: &str) -> Result<CarId, CoreError> {
        self.tree
            .value(&path::car_id(vin))
            .map(|v| CarId::new(v.to_string()))
            .ok_or_else(|| CoreError::UnresolvedVehicle {
                vin: vin.to_owned(),
            })
    }

    async fn send(
        &self,
        vin: &str,
        car_id: &CarId,
        command: &str,
        payload: Option<&Map<String, Value>>,
    ) -> Result<(), CoreError> {
        debug!(vin, car_id = %car_id, command, "sending command");
        let body = payload.map(|p| Value::Object(p.clone()));
        let response = self.api.send_command(car_id, command, body.as_ref()).await?;
        debug!(vin, command, response = %response, "command answered");
        Ok(())
    }

    // ── Wake-up loop ─────────────────────────────────────────────────

    /// Runs with the VIN lock held; the nested `wake_up` goes straight to
    /// `send` and never re-enters `dispatch`.
    async fn wake(&self, vin: &str, car_id: &CarId) -> WakeOutcome {
        info!(vin, "vehicle is not online, waking it up");
        if let Err(e) = self.send(vin, car_id, WAKE_UP, None).await {
            warn!(vin, error = %e, "wake_up failed");
            self.flag.clear();
        }

        let started = Instant::now();
        let max_polls = self.policy.max_polls();
        let mut polls = 0;

        while polls < max_polls && started.elapsed() < self.policy.max_wait {
            if polls == 0 {
                debug!(vin, "resuming TeslaMate logging");
                if let Err(e) = self.api.resume_logging(car_id).await {
                    warn!(vin, error = %e, "resume logging failed");
                    self.flag.clear();
                }
            }

            tokio::time::sleep(self.policy.poll_interval).await;
            polls += 1;

            if let Err(e) = self.reconciler.reconcile().await {
                debug!(vin, error = %e, "refresh during wake-up failed");
            }

            match self.fleet.state(vin) {
                Some(VehicleState::Online) => {
                    info!(vin, polls, "vehicle woke up");
                    return WakeOutcome::Ready { polls };
                }
                state => debug!(vin, polls, ?state, "vehicle not awake yet"),
            }
        }

        warn!(
            vin,
            polls,
            waited_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "vehicle did not wake up in time, sending command anyway"
        );
        WakeOutcome::TimedOut { polls }
    }
}
