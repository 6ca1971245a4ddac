// ── Object registry ──
//
// Remembers which tree paths have already been declared so each one is
// declared exactly once per process. Never pruned.

use std::sync::Arc;

use dashmap::DashSet;

use crate::error::CoreError;
use crate::tree::{ObjectSpec, StateTree};

pub struct ObjectRegistry {
    tree: Arc<StateTree>,
    declared: DashSet<String>,
}

impl ObjectRegistry {
    pub fn new(tree: Arc<StateTree>) -> Self {
        Self {
            tree,
            declared: DashSet::new(),
        }
    }

    pub fn has(&self, path: &str) -> bool {
        self.declared.contains(path)
    }

    /// Declare on the tree without recording it.
    pub fn declare(&self, path: &str, spec: ObjectSpec) -> Result<(), CoreError> {
        self.tree.declare(path, spec)
    }

    pub fn mark_declared(&self, path: &str) {
        self.declared.insert(path.to_owned());
    }

    /// Declare and record `path` unless already recorded.
    ///
    /// Returns `true` when a declaration was made. A failed declaration is
    /// not recorded, so the next call retries it.
    pub fn ensure(&self, path: &str, spec: ObjectSpec) -> Result<bool, CoreError> {
        if self.has(path) {
            return Ok(false);
        }
        self.declare(path, spec)?;
        self.mark_declared(path);
        Ok(true)
    }

    pub fn len(&self) -> usize {
        self.declared.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declared.is_empty()
    }
}
