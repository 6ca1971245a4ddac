// matebridge-core: Status reconciliation and command dispatch between the
// TeslaMate API and the local state tree.

pub mod api;
pub mod bridge;
pub mod catalog;
pub mod config;
pub mod connection;
pub mod dispatch;
pub mod error;
pub mod fleet;
pub mod flatten;
pub mod health;
pub mod path;
pub mod reconcile;
pub mod registry;
pub mod tree;
pub mod value;

#[cfg(test)]
pub(crate) mod testing;

// ── Primary re-exports ──────────────────────────────────────────────
pub use api::VehicleApi;
pub use bridge::Bridge;
pub use catalog::{Catalog, CommandDefinition, SettingDefinition};
pub use config::{BridgeConfig, TlsVerification};
pub use connection::ConnectionFlag;
pub use dispatch::{CommandRequest, Dispatcher, WakeOutcome, WakePolicy};
pub use error::CoreError;
pub use fleet::{Fleet, Vehicle, VehicleState};
pub use flatten::StatusField;
pub use health::HealthMonitor;
pub use reconcile::{ReconcileSummary, Reconciler};
pub use registry::ObjectRegistry;
pub use tree::{ObjectSpec, StateEntry, StateTree, UserWrite};
pub use value::{StateValue, ValueType};

pub use matebridge_api::{CarId, TeslaMateClient};
