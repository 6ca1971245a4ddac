// ── Connection flag ──
//
// Process-wide "API reachable" indicator, mirrored to `info.connection`.
// Any component may clear it; only the health monitor may restore it.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info};

use crate::path;
use crate::tree::StateTree;

#[derive(Clone)]
pub struct ConnectionFlag {
    state: Arc<watch::Sender<bool>>,
    tree: Arc<StateTree>,
}

impl ConnectionFlag {
    pub fn new(tree: Arc<StateTree>) -> Self {
        let (state, _) = watch::channel(false);
        Self {
            state: Arc::new(state),
            tree,
        }
    }

    pub fn is_connected(&self) -> bool {
        *self.state.borrow()
    }

    /// Mark the API unreachable.
    pub fn clear(&self) {
        if self.state.send_replace(false) {
            info!("connection to TeslaMate lost");
        }
        self.mirror(false);
    }

    /// Mark the API reachable. Health monitor only.
    pub(crate) fn restore(&self) {
        if !self.state.send_replace(true) {
            info!("connected to TeslaMate");
        }
        self.mirror(true);
    }

    fn mirror(&self, connected: bool) {
        if let Err(e) = self.tree.write_ack(path::CONNECTION, connected.into()) {
            debug!(error = %e, "connection flag not mirrored");
        }
    }
}
