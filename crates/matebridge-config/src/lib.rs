// matebridge-config: Profile configuration, loading, and credential resolution.
//
// TOML profiles, access-token resolution (env + keyring + plaintext), and
// translation to `matebridge_core::BridgeConfig`. The binary layers its
// flag overrides on top of this.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use matebridge_api::TransportConfig;
use matebridge_core::{
    BridgeConfig, Catalog, CommandDefinition, SettingDefinition, TlsVerification,
};

/// Keyring service name; entries are keyed `<profile>/access-token`.
pub const KEYRING_SERVICE: &str = "matebridge";

/// Environment variable consulted after the profile's `access_token_env`.
pub const ACCESS_TOKEN_ENV: &str = "MATEBRIDGE_ACCESS_TOKEN";

const ENV_PREFIX: &str = "MATEBRIDGE_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no access token configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{name}' not found")]
    UnknownProfile { name: String, available: Vec<String> },

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when none is selected on the command line.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named TeslaMate connections.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Explicit selection, else `default_profile`, else `"default"`.
    pub fn active_profile_name(&self, selected: Option<&str>) -> String {
        selected
            .map(str::to_owned)
            .or_else(|| self.default_profile.clone())
            .unwrap_or_else(|| "default".into())
    }

    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::UnknownProfile {
                name: name.to_owned(),
                available: self.profiles.keys().cloned().collect(),
            })
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// TeslaMate usually sits behind a self-signed reverse proxy.
    #[serde(default = "default_insecure")]
    pub insecure: bool,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            insecure: default_insecure(),
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_insecure() -> bool {
    true
}
fn default_timeout() -> u64 {
    3
}

/// A named TeslaMate connection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Profile {
    /// TeslaMate API base URL (e.g. "https://teslamate.local:4000/api").
    pub server_url: String,

    /// Bearer token (plaintext; prefer keyring or env var).
    pub access_token: Option<String>,

    /// Environment variable name containing the bearer token.
    pub access_token_env: Option<String>,

    /// Extra static headers as `key=value` strings.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<String>,

    /// Reconciliation period in seconds.
    pub refresh_interval: Option<u64>,

    /// Request timeout in seconds; overrides `defaults.timeout`.
    pub request_timeout: Option<u64>,

    /// Health check period in seconds.
    pub health_interval: Option<u64>,

    /// Wake sleeping vehicles before sending commands.
    pub force_command_execution: Option<bool>,

    /// Override `defaults.insecure`.
    pub insecure: Option<bool>,

    /// Path to a custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Extra or replacement command nodes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<CommandDefinition>,

    /// Extra or replacement setting nodes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub settings: Vec<SettingDefinition>,
}

impl Profile {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            ..Self::default()
        }
    }

    /// A CA certificate wins over `insecure`.
    pub fn tls(&self, defaults: &Defaults) -> TlsVerification {
        if let Some(ref ca) = self.ca_cert {
            TlsVerification::CustomCa(ca.clone())
        } else if self.insecure.unwrap_or(defaults.insecure) {
            TlsVerification::DangerAcceptInvalid
        } else {
            TlsVerification::SystemDefaults
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "matebridge", "matebridge").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("matebridge");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Defaults, then `path` (if present), then `MATEBRIDGE_*` variables
/// (`__` separates nesting, e.g. `MATEBRIDGE_DEFAULTS__TIMEOUT`).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist or is broken.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

fn keyring_user(profile_name: &str) -> String {
    format!("{profile_name}/access-token")
}

/// Resolve the bearer token from the credential chain (no CLI flag step).
///
/// Order: the variable named by `access_token_env`, `MATEBRIDGE_ACCESS_TOKEN`,
/// the system keyring, then the plaintext `access_token`.
pub fn resolve_access_token(
    profile: &Profile,
    profile_name: &str,
) -> Result<SecretString, ConfigError> {
    resolve_access_token_with(
        profile,
        profile_name,
        |name| std::env::var(name).ok(),
        |user| {
            keyring::Entry::new(KEYRING_SERVICE, user)
                .and_then(|entry| entry.get_password())
                .ok()
        },
    )
}

fn resolve_access_token_with(
    profile: &Profile,
    profile_name: &str,
    env: impl Fn(&str) -> Option<String>,
    keyring: impl Fn(&str) -> Option<String>,
) -> Result<SecretString, ConfigError> {
    // 1. Profile's access_token_env → env var lookup
    if let Some(token) = profile.access_token_env.as_deref().and_then(&env) {
        return Ok(SecretString::from(token));
    }

    // 2. Global env var
    if let Some(token) = env(ACCESS_TOKEN_ENV) {
        return Ok(SecretString::from(token));
    }

    // 3. System keyring
    if let Some(token) = keyring(&keyring_user(profile_name)) {
        return Ok(SecretString::from(token));
    }

    // 4. Plaintext in config
    if let Some(ref token) = profile.access_token {
        return Ok(SecretString::from(token.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Store a bearer token in the system keyring for `profile_name`.
pub fn store_access_token(profile_name: &str, token: &str) -> Result<(), ConfigError> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, &keyring_user(profile_name))?;
    entry.set_password(token)?;
    Ok(())
}

// ── Translation to BridgeConfig ─────────────────────────────────────

/// Build a `BridgeConfig` from a profile, resolving the token through the
/// credential chain.
pub fn profile_to_bridge_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<BridgeConfig, ConfigError> {
    let token = resolve_access_token(profile, profile_name)?;
    bridge_config(profile, defaults, token)
}

/// Build a `BridgeConfig` from a profile and an already-resolved token.
pub fn bridge_config(
    profile: &Profile,
    defaults: &Defaults,
    access_token: SecretString,
) -> Result<BridgeConfig, ConfigError> {
    let url: Url = profile
        .server_url
        .parse()
        .map_err(|_| ConfigError::Validation {
            field: "server_url".into(),
            reason: format!("invalid URL: {}", profile.server_url),
        })?;

    let headers =
        TransportConfig::parse_headers(&profile.headers).map_err(|e| ConfigError::Validation {
            field: "headers".into(),
            reason: e.to_string(),
        })?;

    let mut config = BridgeConfig::new(url, access_token);
    config.headers = headers;
    config.tls = profile.tls(defaults);
    config.timeout = seconds(
        "request_timeout",
        profile.request_timeout.unwrap_or(defaults.timeout),
    )?;
    if let Some(secs) = profile.refresh_interval {
        config.refresh_interval = seconds("refresh_interval", secs)?;
    }
    if let Some(secs) = profile.health_interval {
        config.health_interval = seconds("health_interval", secs)?;
    }
    config.wake.force_wake = profile.force_command_execution.unwrap_or(false);
    config.catalog =
        Catalog::builtin().extended(profile.commands.clone(), profile.settings.clone());

    Ok(config)
}

fn seconds(field: &str, secs: u64) -> Result<Duration, ConfigError> {
    if secs == 0 {
        return Err(ConfigError::Validation {
            field: field.into(),
            reason: "must be at least 1 second".into(),
        });
    }
    Ok(Duration::from_secs(secs))
}
