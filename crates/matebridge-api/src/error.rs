use thiserror::Error;

/// Top-level error type for the `matebridge-api` crate.
///
/// Covers every failure mode of the TeslaMate API surface: transport,
/// non-success responses, and malformed bodies. `matebridge-core` maps
/// these into its own network/API error kinds.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    /// A configured request header could not be encoded.
    #[error("Invalid header '{name}': {reason}")]
    InvalidHeader { name: String, reason: String },

    // ── API ─────────────────────────────────────────────────────────
    /// Non-2xx response from the API server.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if the failure happened before a response arrived.
    pub fn is_network(&self) -> bool {
        match self {
            Self::Transport(e) => e.status().is_none(),
            Self::Timeout { .. } | Self::Tls(_) => true,
            _ => false,
        }
    }
}
