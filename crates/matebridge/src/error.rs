//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors
//! with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use matebridge_config::ConfigError;
use matebridge_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the TeslaMate API: {reason}")]
    #[diagnostic(
        code(matebridge::connection_failed),
        help(
            "Check that TeslaMate's API is running and that server_url points at it.\n\
             Try: matebridge ping --insecure"
        )
    )]
    ConnectionFailed { reason: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed")]
    #[diagnostic(
        code(matebridge::auth_failed),
        help(
            "Verify the access token configured for TeslaMate's API.\n\
             Run: matebridge config set-token --profile {profile}"
        )
    )]
    AuthFailed { profile: String },

    #[error("No access token configured for profile '{profile}'")]
    #[diagnostic(
        code(matebridge::no_credentials),
        help(
            "Configure one with: matebridge config set-token\n\
             Or set the MATEBRIDGE_ACCESS_TOKEN environment variable."
        )
    )]
    NoCredentials { profile: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(matebridge::not_found),
        help("Run: matebridge {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    // ── API ──────────────────────────────────────────────────────────
    #[error("API error ({status}): {message}")]
    #[diagnostic(code(matebridge::api_error))]
    ApiError { status: String, message: String },

    #[error("State tree rejected {path}: {reason}")]
    #[diagnostic(code(matebridge::state))]
    State { path: String, reason: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(matebridge::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(matebridge::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: matebridge config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("Configuration file not found")]
    #[diagnostic(
        code(matebridge::no_config),
        help(
            "Create one with: matebridge config init\n\
             Or pass --server-url. Expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error("Configuration error: {message}")]
    #[diagnostic(code(matebridge::config))]
    Config { message: String },

    #[error("Keyring error: {reason}")]
    #[diagnostic(
        code(matebridge::keyring),
        help("Store the token in the profile or MATEBRIDGE_ACCESS_TOKEN instead.")
    )]
    Keyring { reason: String },

    // ── IO ───────────────────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } | Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } | Self::NoConfig { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    pub(crate) fn profile_not_found(name: String, available: &[String]) -> Self {
        Self::ProfileNotFound {
            name,
            available: if available.is_empty() {
                "(none)".into()
            } else {
                available.join(", ")
            },
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Network { reason } => CliError::ConnectionFailed { reason },

            CoreError::Api {
                status: Some(401 | 403),
                ..
            } => CliError::AuthFailed {
                profile: "current".into(),
            },

            CoreError::Api { message, status } => CliError::ApiError {
                status: status.map_or_else(|| "-".into(), |s| s.to_string()),
                message,
            },

            CoreError::UnresolvedVehicle { vin } => CliError::NotFound {
                resource_type: "vehicle".into(),
                identifier: vin,
                list_command: "status".into(),
            },

            CoreError::UnknownCommand { name } => CliError::NotFound {
                resource_type: "command".into(),
                identifier: name,
                list_command: "catalog commands".into(),
            },

            CoreError::UnknownSetting { name } => CliError::NotFound {
                resource_type: "setting".into(),
                identifier: name,
                list_command: "catalog settings".into(),
            },

            CoreError::InvalidValue { name, reason } => CliError::Validation {
                field: name,
                reason,
            },

            CoreError::Declaration { path, reason } | CoreError::Tree { path, reason } => {
                CliError::State { path, reason }
            }

            CoreError::Config { message } => CliError::Config { message },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::UnknownProfile { name, available } => {
                CliError::profile_not_found(name, &available)
            }
            ConfigError::Keyring(e) => CliError::Keyring {
                reason: e.to_string(),
            },
            ConfigError::Io(e) => CliError::Io(e),
            other @ (ConfigError::Serialization(_) | ConfigError::Figment(_)) => {
                CliError::Config {
                    message: other.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_map_to_exit_codes() {
        let unauthorized: CliError = CoreError::Api {
            message: "nope".into(),
            status: Some(401),
        }
        .into();
        assert_eq!(unauthorized.exit_code(), exit_code::AUTH);

        let offline: CliError = CoreError::Network {
            reason: "refused".into(),
        }
        .into();
        assert_eq!(offline.exit_code(), exit_code::CONNECTION);

        let unknown: CliError = CoreError::UnresolvedVehicle { vin: "X".into() }.into();
        assert_eq!(unknown.exit_code(), exit_code::NOT_FOUND);

        let server: CliError = CoreError::Api {
            message: "boom".into(),
            status: Some(500),
        }
        .into();
        assert_eq!(server.exit_code(), exit_code::GENERAL);
        assert!(server.to_string().contains("500"));
    }

    #[test]
    fn unknown_profile_lists_alternatives() {
        let err: CliError = ConfigError::UnknownProfile {
            name: "x".into(),
            available: vec![],
        }
        .into();
        match err {
            CliError::ProfileNotFound { available, .. } => assert_eq!(available, "(none)"),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
