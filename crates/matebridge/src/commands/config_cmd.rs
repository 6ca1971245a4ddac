//! Config subcommand handlers.

use std::io::BufRead;

use dialoguer::{Confirm, Input, Select};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config, Profile};
use crate::error::CliError;
use crate::output;

const MASK: &str = "********";

// ── Helpers ─────────────────────────────────────────────────────────

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn parse_field<T: std::str::FromStr>(field: &str, value: &str, hint: &str) -> Result<T, CliError> {
    value.parse().map_err(|_| CliError::Validation {
        field: field.into(),
        reason: hint.into(),
    })
}

/// Apply one `config set` assignment to a profile.
fn set_profile_key(profile: &mut Profile, key: &str, value: String) -> Result<(), CliError> {
    match key {
        "server_url" | "server-url" | "url" => profile.server_url = value,
        "access_token" | "access-token" => profile.access_token = Some(value),
        "access_token_env" | "access-token-env" => profile.access_token_env = Some(value),
        "headers" => {
            profile.headers = value
                .split(',')
                .map(str::trim)
                .filter(|h| !h.is_empty())
                .map(str::to_owned)
                .collect();
        }
        "refresh_interval" | "refresh-interval" => {
            profile.refresh_interval =
                Some(parse_field(key, &value, "must be a number (seconds)")?);
        }
        "request_timeout" | "request-timeout" | "timeout" => {
            profile.request_timeout =
                Some(parse_field(key, &value, "must be a number (seconds)")?);
        }
        "health_interval" | "health-interval" => {
            profile.health_interval =
                Some(parse_field(key, &value, "must be a number (seconds)")?);
        }
        "force_command_execution" | "force-command-execution" => {
            profile.force_command_execution =
                Some(parse_field(key, &value, "must be 'true' or 'false'")?);
        }
        "insecure" => {
            profile.insecure = Some(parse_field(key, &value, "must be 'true' or 'false'")?);
        }
        "ca_cert" | "ca-cert" => profile.ca_cert = Some(value.into()),
        other => {
            return Err(CliError::Validation {
                field: other.into(),
                reason: format!(
                    "unknown config key '{other}'. Valid keys: server_url, access_token, \
                     access_token_env, headers, refresh_interval, request_timeout, \
                     health_interval, force_command_execution, insecure, ca_cert"
                ),
            });
        }
    }
    Ok(())
}

/// Copy of the config safe to print.
fn redacted(cfg: &Config) -> Config {
    let mut cfg = cfg.clone();
    for profile in cfg.profiles.values_mut() {
        if profile.access_token.is_some() {
            profile.access_token = Some(MASK.into());
        }
    }
    cfg
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init => init(),

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = redacted(&config::load_config_or_default());
            let out = output::render_single(
                &global.output,
                &cfg,
                |c| toml::to_string_pretty(c).unwrap_or_else(|_| format!("{c:#?}")),
                |c| c.profiles.keys().cloned().collect::<Vec<_>>().join("\n"),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }

        // ── Set <key> <value> ───────────────────────────────────────
        ConfigCommand::Set { key, value } => {
            let mut cfg = config::load_config_or_default();
            let profile_name = config::active_profile_name(global, &cfg);

            let profile = cfg.profiles.entry(profile_name.clone()).or_default();
            set_profile_key(profile, &key, value)?;

            config::save_config(&cfg)?;
            eprintln!("✓ Set {key} on profile '{profile_name}'");
            Ok(())
        }

        // ── Profiles ────────────────────────────────────────────────
        ConfigCommand::Profiles => {
            let cfg = config::load_config_or_default();
            let default = cfg.default_profile.as_deref().unwrap_or("default");
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Run: matebridge config init");
            } else {
                for name in cfg.profiles.keys() {
                    let marker = if name == default { " *" } else { "" };
                    println!("{name}{marker}");
                }
            }
            Ok(())
        }

        // ── Use <name> ─────────────────────────────────────────────
        ConfigCommand::Use { name } => {
            let mut cfg = config::load_config_or_default();

            if !cfg.profiles.contains_key(&name) {
                let available: Vec<_> = cfg.profiles.keys().cloned().collect();
                return Err(CliError::profile_not_found(name, &available));
            }

            cfg.default_profile = Some(name.clone());
            config::save_config(&cfg)?;
            eprintln!("✓ Default profile set to '{name}'");
            Ok(())
        }

        // ── SetToken ────────────────────────────────────────────────
        ConfigCommand::SetToken { stdin } => {
            let cfg = config::load_config_or_default();
            let profile_name = config::active_profile_name(global, &cfg);
            cfg.profile(&profile_name)?;

            let token = if stdin {
                let mut line = String::new();
                std::io::stdin().lock().read_line(&mut line)?;
                line.trim().to_owned()
            } else {
                rpassword::prompt_password("Access token: ").map_err(prompt_err)?
            };

            if token.is_empty() {
                return Err(CliError::Validation {
                    field: "access_token".into(),
                    reason: "value cannot be empty".into(),
                });
            }

            config::store_access_token(&profile_name, &token)?;
            eprintln!("✓ Access token stored in system keyring for profile '{profile_name}'");
            Ok(())
        }
    }
}

// ── Init: interactive wizard ────────────────────────────────────────

fn init() -> Result<(), CliError> {
    let config_path = config::config_path();
    eprintln!("matebridge configuration wizard");
    eprintln!("   Config path: {}\n", config_path.display());

    // 1. Profile name
    let profile_name: String = Input::new()
        .with_prompt("Profile name")
        .default("default".into())
        .interact_text()
        .map_err(prompt_err)?;

    // 2. Server URL
    let server_url: String = Input::new()
        .with_prompt("TeslaMate API URL")
        .default("http://teslamate.local:4000".into())
        .interact_text()
        .map_err(prompt_err)?;

    // 3. Token
    let token = rpassword::prompt_password("Access token: ").map_err(prompt_err)?;
    if token.is_empty() {
        return Err(CliError::Validation {
            field: "access_token".into(),
            reason: "access token cannot be empty".into(),
        });
    }

    let store_choices = &[
        "Store in system keyring (recommended)",
        "Save to config file (plaintext)",
    ];
    let store_selection = Select::new()
        .with_prompt("Where to store the access token?")
        .items(store_choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    let access_token = if store_selection == 0 {
        config::store_access_token(&profile_name, &token)?;
        eprintln!("   ✓ Access token stored in system keyring");
        None
    } else {
        Some(token)
    };

    // 4. Wake behaviour
    let force = Confirm::new()
        .with_prompt("Wake sleeping vehicles before sending commands?")
        .default(false)
        .interact()
        .map_err(prompt_err)?;

    // 5. Merge into the existing config and write
    let mut cfg = config::load_config_or_default();
    let mut profile = Profile::new(server_url);
    profile.access_token = access_token;
    profile.force_command_execution = Some(force);
    cfg.profiles.insert(profile_name.clone(), profile);
    cfg.default_profile = Some(profile_name.clone());
    config::save_config(&cfg)?;

    eprintln!("\n✓ Configuration written to {}", config_path.display());
    eprintln!("  Active profile: {profile_name}");
    eprintln!("\n  Test it: matebridge ping");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn set_known_keys() {
        let mut profile = Profile::default();
        set_profile_key(&mut profile, "server_url", "http://tm:4000".into()).unwrap();
        set_profile_key(&mut profile, "refresh-interval", "45".into()).unwrap();
        set_profile_key(&mut profile, "force_command_execution", "true".into()).unwrap();
        set_profile_key(&mut profile, "headers", "A=1, B=2".into()).unwrap();

        assert_eq!(profile.server_url, "http://tm:4000");
        assert_eq!(profile.refresh_interval, Some(45));
        assert_eq!(profile.force_command_execution, Some(true));
        assert_eq!(profile.headers, vec!["A=1".to_owned(), "B=2".to_owned()]);
    }

    #[test]
    fn set_rejects_bad_input() {
        let mut profile = Profile::default();
        assert!(set_profile_key(&mut profile, "insecure", "maybe".into()).is_err());
        assert!(set_profile_key(&mut profile, "colour", "red".into()).is_err());
        assert_eq!(profile, Profile::default());
    }

    #[test]
    fn show_masks_plaintext_tokens() {
        let mut cfg = Config::default();
        let mut profile = Profile::new("http://tm");
        profile.access_token = Some("secret".into());
        cfg.profiles.insert("default".into(), profile);

        let shown = redacted(&cfg);
        assert_eq!(
            shown.profiles["default"].access_token.as_deref(),
            Some(MASK)
        );
    }
}
