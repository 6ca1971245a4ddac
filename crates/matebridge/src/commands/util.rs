//! Shared helpers for command handlers.

use matebridge_core::{BridgeConfig, CoreError, TeslaMateClient, WakeOutcome};

use crate::error::CliError;

/// Build the HTTP client described by `config`.
pub fn client(config: &BridgeConfig) -> Result<TeslaMateClient, CliError> {
    TeslaMateClient::new(config.url.as_str(), &config.access_token, &config.transport())
        .map_err(|e| CoreError::from(e).into())
}

/// Human summary of how the wake-up phase went.
pub fn describe_wake(outcome: WakeOutcome) -> String {
    match outcome {
        WakeOutcome::NotNeeded => String::new(),
        WakeOutcome::Ready { polls } => format!(" (woke after {polls} polls)"),
        WakeOutcome::TimedOut { polls } => {
            format!(" (still not online after {polls} polls, sent anyway)")
        }
    }
}
