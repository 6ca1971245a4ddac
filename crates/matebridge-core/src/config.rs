// ── Runtime bridge configuration ──
//
// These types describe *how* to reach TeslaMate and how the bridge paces
// itself. They carry the access token but never touch disk; the CLI
// builds a `BridgeConfig` and hands it in.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use crate::catalog::Catalog;
use crate::dispatch::WakePolicy;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (self-signed reverse proxies). Default.
    #[default]
    DangerAcceptInvalid,
}

/// Configuration for one bridge instance.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// TeslaMate API base URL (e.g. `https://teslamate.local:4000/api`).
    pub url: Url,
    /// Bearer token sent with every request.
    pub access_token: SecretString,
    /// Extra static headers, already split into `(name, value)`.
    pub headers: Vec<(String, String)>,
    pub tls: TlsVerification,
    /// Per-request timeout. Also the floor for `refresh_interval`.
    pub timeout: Duration,
    /// Reconciliation period.
    pub refresh_interval: Duration,
    /// Health check period.
    pub health_interval: Duration,
    pub wake: WakePolicy,
    pub catalog: Catalog,
}

impl BridgeConfig {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);
    pub const DEFAULT_REFRESH: Duration = Duration::from_secs(30);
    pub const DEFAULT_HEALTH: Duration = Duration::from_secs(60);

    /// Config with default pacing and the built-in catalog.
    pub fn new(url: Url, access_token: SecretString) -> Self {
        Self {
            url,
            access_token,
            headers: Vec::new(),
            tls: TlsVerification::default(),
            timeout: Self::DEFAULT_TIMEOUT,
            refresh_interval: Self::DEFAULT_REFRESH,
            health_interval: Self::DEFAULT_HEALTH,
            wake: WakePolicy::default(),
            catalog: Catalog::builtin(),
        }
    }

    /// Refresh period actually used: never shorter than the request timeout.
    pub fn effective_refresh_interval(&self) -> Duration {
        self.refresh_interval.max(self.timeout)
    }

    /// Transport settings for the HTTP client.
    pub fn transport(&self) -> matebridge_api::TransportConfig {
        let tls = match &self.tls {
            TlsVerification::SystemDefaults => matebridge_api::TlsMode::System,
            TlsVerification::CustomCa(path) => matebridge_api::TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => matebridge_api::TlsMode::DangerAcceptInvalid,
        };
        matebridge_api::TransportConfig {
            tls,
            timeout: self.timeout,
            headers: self.headers.clone(),
        }
    }
}
