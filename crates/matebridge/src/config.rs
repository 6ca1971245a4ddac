//! CLI configuration: thin wrapper around `matebridge_config`.
//!
//! Re-exports the shared types and adds resolution that respects
//! `GlobalOpts` flag overrides (--server-url, --access-token, etc.).

use secrecy::SecretString;

use matebridge_core::BridgeConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use matebridge_config::{
    Config, Profile, config_path, load_config_or_default, save_config, store_access_token,
};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    config.active_profile_name(global.profile.as_deref())
}

/// Build a `BridgeConfig` from the config file, profile, and CLI overrides.
///
/// Without a matching profile, `--server-url` alone is enough.
pub fn build_bridge_config(global: &GlobalOpts) -> Result<BridgeConfig, CliError> {
    let cfg = load_config_or_default();
    let profile_name = active_profile_name(global, &cfg);

    let mut profile = match cfg.profiles.get(&profile_name) {
        Some(profile) => profile.clone(),
        None => {
            if global.profile.is_some() && global.server_url.is_none() {
                let available: Vec<String> = cfg.profiles.keys().cloned().collect();
                return Err(CliError::profile_not_found(profile_name, &available));
            }
            let url = global.server_url.clone().ok_or_else(|| CliError::NoConfig {
                path: config_path().display().to_string(),
            })?;
            Profile::new(url)
        }
    };

    apply_overrides(&mut profile, global);

    // CLI flag takes priority over the credential chain
    let config = match global.access_token {
        Some(ref token) => matebridge_config::bridge_config(
            &profile,
            &cfg.defaults,
            SecretString::from(token.clone()),
        )?,
        None => matebridge_config::profile_to_bridge_config(&profile, &profile_name, &cfg.defaults)?,
    };
    Ok(config)
}

fn apply_overrides(profile: &mut Profile, global: &GlobalOpts) {
    if let Some(ref url) = global.server_url {
        profile.server_url.clone_from(url);
    }
    if global.insecure {
        profile.insecure = Some(true);
        profile.ca_cert = None;
    }
    if let Some(secs) = global.timeout {
        profile.request_timeout = Some(secs);
    }
}
