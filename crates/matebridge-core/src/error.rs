// ── Core error types ──
//
// Errors surfaced by the bridge. Consumers never see reqwest errors or
// raw HTTP status handling; the `From<matebridge_api::Error>` impl folds
// transport failures into `Network` and server answers into `Api`.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Remote API ───────────────────────────────────────────────────
    #[error("Cannot reach TeslaMate API: {reason}")]
    Network { reason: String },

    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if the server answered).
        status: Option<u16>,
    },

    // ── Routing ──────────────────────────────────────────────────────
    #[error("No car_id known for vehicle {vin}")]
    UnresolvedVehicle { vin: String },

    #[error("Unknown command: {name}")]
    UnknownCommand { name: String },

    #[error("Unknown setting: {name}")]
    UnknownSetting { name: String },

    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: String, reason: String },

    // ── State tree ───────────────────────────────────────────────────
    #[error("Cannot declare {path}: {reason}")]
    Declaration { path: String, reason: String },

    #[error("Write to {path} rejected: {reason}")]
    Tree { path: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// Returns `true` for failures that never reached the API server.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network { .. })
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<matebridge_api::Error> for CoreError {
    fn from(err: matebridge_api::Error) -> Self {
        use matebridge_api::Error as ApiError;

        match err {
            ApiError::Transport(ref e) if err.is_network() => Self::Network {
                reason: e.to_string(),
            },
            ApiError::Transport(ref e) => Self::Api {
                message: e.to_string(),
                status: e.status().map(|s| s.as_u16()),
            },
            ApiError::Timeout { timeout_ms } => Self::Network {
                reason: format!("request timed out after {timeout_ms}ms"),
            },
            ApiError::Tls(reason) => Self::Network {
                reason: format!("TLS error: {reason}"),
            },
            ApiError::InvalidUrl(e) => Self::Config {
                message: format!("Invalid URL: {e}"),
            },
            ApiError::InvalidHeader { name, reason } => Self::Config {
                message: format!("Invalid header '{name}': {reason}"),
            },
            ApiError::Api { status, message } => Self::Api {
                message,
                status: Some(status),
            },
            ApiError::Deserialization { message, body: _ } => Self::Api {
                message: format!("malformed response: {message}"),
                status: None,
            },
        }
    }
}
