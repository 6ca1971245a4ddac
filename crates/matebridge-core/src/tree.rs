// ── In-process state tree ──
//
// Hierarchical key/value store addressed by dot-separated paths.
// Every node is declared (schema) before it may hold a value. Writes made
// by the bridge are acknowledged; writes from outside are not, and are
// forwarded on the user-write channel for the dispatcher.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::{Mutex, mpsc, watch};
use tracing::trace;

use crate::catalog::{CommandDefinition, SettingDefinition};
use crate::error::CoreError;
use crate::path;
use crate::value::{StateValue, ValueType};

/// Schema of one declared node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectSpec {
    pub name: String,
    pub value_type: ValueType,
    pub role: String,
    pub read: bool,
    pub write: bool,
}

impl ObjectSpec {
    /// Read-only mirror of an upstream field.
    pub fn mirror(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
            role: "state".into(),
            read: true,
            write: false,
        }
    }

    pub fn command(def: &CommandDefinition) -> Self {
        Self {
            name: def.name.clone(),
            value_type: def.value_type(),
            role: def.role().to_owned(),
            read: true,
            write: true,
        }
    }

    pub fn setting(def: &SettingDefinition) -> Self {
        Self {
            name: def.name.clone(),
            value_type: def.value_type,
            role: "value".into(),
            read: true,
            write: true,
        }
    }

    pub fn connection() -> Self {
        Self {
            name: "Connected to TeslaMate API".into(),
            value_type: ValueType::Boolean,
            role: "indicator.connected".into(),
            read: true,
            write: false,
        }
    }
}

/// Stored value of one node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateEntry {
    pub value: StateValue,
    /// `true` when written by the bridge, `false` for pending user writes.
    pub ack: bool,
    pub updated_at: DateTime<Utc>,
}

/// An unacknowledged write made from outside the bridge.
#[derive(Debug, Clone, PartialEq)]
pub struct UserWrite {
    pub path: String,
    pub value: StateValue,
}

/// The state tree.
pub struct StateTree {
    objects: DashMap<String, ObjectSpec>,
    states: DashMap<String, StateEntry>,
    declarations: AtomicU64,
    user_tx: mpsc::UnboundedSender<UserWrite>,
    user_rx: Mutex<Option<mpsc::UnboundedReceiver<UserWrite>>>,
    revision: watch::Sender<u64>,
}

impl Default for StateTree {
    fn default() -> Self {
        Self::new()
    }
}

impl StateTree {
    pub fn new() -> Self {
        let (user_tx, user_rx) = mpsc::unbounded_channel();
        let (revision, _) = watch::channel(0);
        Self {
            objects: DashMap::new(),
            states: DashMap::new(),
            declarations: AtomicU64::new(0),
            user_tx,
            user_rx: Mutex::new(Some(user_rx)),
            revision,
        }
    }

    // ── Schema ───────────────────────────────────────────────────────

    /// Declare (or redeclare) a node. Idempotent upsert of the schema.
    pub fn declare(&self, path: &str, spec: ObjectSpec) -> Result<(), CoreError> {
        path::validate(path).map_err(|reason| CoreError::Declaration {
            path: path.to_owned(),
            reason,
        })?;
        self.declarations.fetch_add(1, Ordering::Relaxed);
        trace!(path, value_type = %spec.value_type, "declare");
        self.objects.insert(path.to_owned(), spec);
        Ok(())
    }

    pub fn object(&self, path: &str) -> Option<ObjectSpec> {
        self.objects.get(path).map(|r| r.value().clone())
    }

    /// Total number of `declare` calls so far.
    pub fn declaration_count(&self) -> u64 {
        self.declarations.load(Ordering::Relaxed)
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    // ── Writes ───────────────────────────────────────────────────────

    /// Authoritative write from the bridge.
    pub fn write_ack(&self, path: &str, value: StateValue) -> Result<(), CoreError> {
        if !self.objects.contains_key(path) {
            return Err(undeclared(path));
        }
        self.store(path, value, true);
        Ok(())
    }

    /// Write from outside the bridge. Only writable nodes accept it; the
    /// write is queued for the dispatcher.
    pub fn write_user(&self, path: &str, value: StateValue) -> Result<(), CoreError> {
        let writable = self
            .objects
            .get(path)
            .map(|spec| spec.write)
            .ok_or_else(|| undeclared(path))?;
        if !writable {
            return Err(CoreError::Tree {
                path: path.to_owned(),
                reason: "node is read-only".into(),
            });
        }

        self.store(path, value.clone(), false);
        let _ = self.user_tx.send(UserWrite {
            path: path.to_owned(),
            value,
        });
        Ok(())
    }

    fn store(&self, path: &str, value: StateValue, ack: bool) {
        self.states.insert(
            path.to_owned(),
            StateEntry {
                value,
                ack,
                updated_at: Utc::now(),
            },
        );
        self.revision.send_modify(|rev| *rev += 1);
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub fn read(&self, path: &str) -> Option<StateEntry> {
        self.states.get(path).map(|r| r.value().clone())
    }

    pub fn value(&self, path: &str) -> Option<StateValue> {
        self.states.get(path).map(|r| r.value().value.clone())
    }

    /// All stored entries at or below `prefix`, sorted by path.
    pub fn snapshot(&self, prefix: &str) -> Vec<(String, StateEntry)> {
        let mut entries: Vec<_> = self
            .states
            .iter()
            .filter(|r| under(r.key(), prefix))
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    // ── Channels ─────────────────────────────────────────────────────

    /// Take the user-write receiver. Only the first caller gets it.
    pub async fn take_user_writes(&self) -> Option<mpsc::UnboundedReceiver<UserWrite>> {
        self.user_rx.lock().await.take()
    }

    /// Counter bumped on every stored write.
    pub fn subscribe_revision(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }
}

fn undeclared(path: &str) -> CoreError {
    CoreError::Tree {
        path: path.to_owned(),
        reason: "node is not declared".into(),
    }
}

fn under(path: &str, prefix: &str) -> bool {
    prefix.is_empty()
        || path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('.'))
}
