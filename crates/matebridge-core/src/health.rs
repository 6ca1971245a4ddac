// ── Connection health monitor ──
//
// Pings TeslaMate and owns the transition of the connection flag back to
// healthy.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::api::VehicleApi;
use crate::connection::ConnectionFlag;

pub struct HealthMonitor<A> {
    api: Arc<A>,
    flag: ConnectionFlag,
}

impl<A: VehicleApi> HealthMonitor<A> {
    pub fn new(api: Arc<A>, flag: ConnectionFlag) -> Self {
        Self { api, flag }
    }

    /// `GET /ping`; the flag is set iff the answer is `pong`.
    pub async fn check_health(&self) -> bool {
        debug!("testing connection");
        match self.api.ping().await {
            Ok(resp) if resp.is_pong() => {
                self.flag.restore();
                true
            }
            Ok(resp) => {
                warn!(message = ?resp.message, "unexpected ping answer");
                self.flag.clear();
                false
            }
            Err(e) => {
                warn!(error = %e, "health check failed");
                self.flag.clear();
                false
            }
        }
    }
}
