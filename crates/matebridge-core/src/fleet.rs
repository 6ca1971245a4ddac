// ── Vehicle records ──
//
// One record per VIN, created on first sight and never removed. The
// reconciler is the only writer; the dispatcher reads `last_known_state`.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use strum::{Display, EnumString};

use matebridge_api::CarId;

/// Power/connectivity state reported by TeslaMate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum VehicleState {
    Online,
    Asleep,
    Suspended,
    Offline,
    Unknown,
}

impl VehicleState {
    /// Lenient parse: anything unrecognised is `Unknown`.
    pub fn parse(raw: &str) -> Self {
        Self::from_str(raw.trim()).unwrap_or(Self::Unknown)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Vehicle {
    pub vin: String,
    pub car_id: Option<CarId>,
    pub name: Option<String>,
    /// `None` until a status payload carried a `state` field.
    pub last_known_state: Option<VehicleState>,
    /// Last successful status fetch.
    pub last_seen: Option<DateTime<Utc>>,
}

impl Vehicle {
    fn new(vin: &str) -> Self {
        Self {
            vin: vin.to_owned(),
            car_id: None,
            name: None,
            last_known_state: None,
            last_seen: None,
        }
    }

    /// True when a state has been observed and it is not `online`.
    pub fn needs_wake(&self) -> bool {
        self.last_known_state
            .is_some_and(|s| s != VehicleState::Online)
    }
}

#[derive(Default)]
pub struct Fleet {
    vehicles: DashMap<String, Vehicle>,
}

impl Fleet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, vin: &str) -> Option<Vehicle> {
        self.vehicles.get(vin).map(|r| r.value().clone())
    }

    pub fn state(&self, vin: &str) -> Option<VehicleState> {
        self.vehicles.get(vin).and_then(|r| r.last_known_state)
    }

    /// All vehicles, sorted by VIN.
    pub fn snapshot(&self) -> Vec<Vehicle> {
        let mut all: Vec<_> = self.vehicles.iter().map(|r| r.value().clone()).collect();
        all.sort_by(|a, b| a.vin.cmp(&b.vin));
        all
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    // ── Reconciler-only mutation ─────────────────────────────────────

    /// Record a vehicle from the car list. Returns `true` on first sight.
    pub(crate) fn observe(&self, vin: &str, car_id: &CarId, name: Option<&str>) -> bool {
        let mut first = false;
        let mut entry = self.vehicles.entry(vin.to_owned()).or_insert_with(|| {
            first = true;
            Vehicle::new(vin)
        });
        entry.car_id = Some(car_id.clone());
        entry.name = name.map(str::to_owned);
        first
    }

    pub(crate) fn record_status(&self, vin: &str, state: Option<VehicleState>) {
        if let Some(mut vehicle) = self.vehicles.get_mut(vin) {
            if state.is_some() {
                vehicle.last_known_state = state;
            }
            vehicle.last_seen = Some(Utc::now());
        }
    }
}
