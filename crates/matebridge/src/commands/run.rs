//! `run`: the long-lived bridge daemon.

use std::time::Duration;

use tracing::info;

use matebridge_core::{Bridge, BridgeConfig};

use crate::cli::RunArgs;
use crate::error::CliError;

pub async fn handle(mut config: BridgeConfig, args: &RunArgs) -> Result<(), CliError> {
    apply_run_overrides(&mut config, args)?;

    let bridge = Bridge::connect(config)?;
    bridge.start().await;
    info!(
        vehicles = bridge.vehicles().len(),
        connected = bridge.connection().is_connected(),
        "bridge running, waiting for shutdown signal"
    );

    wait_for_shutdown().await?;
    info!("shutdown signal received");
    bridge.shutdown().await;
    Ok(())
}

fn apply_run_overrides(config: &mut BridgeConfig, args: &RunArgs) -> Result<(), CliError> {
    if args.force_wake {
        config.wake.force_wake = true;
    }
    if let Some(secs) = args.refresh_interval {
        config.refresh_interval = interval("refresh-interval", secs)?;
    }
    if let Some(secs) = args.health_interval {
        config.health_interval = interval("health-interval", secs)?;
    }
    Ok(())
}

fn interval(field: &str, secs: u64) -> Result<Duration, CliError> {
    if secs == 0 {
        return Err(CliError::Validation {
            field: field.into(),
            reason: "must be at least 1 second".into(),
        });
    }
    Ok(Duration::from_secs(secs))
}

#[cfg(unix)]
async fn wait_for_shutdown() -> Result<(), CliError> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result?,
        _ = terminate.recv() => {}
    }
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<(), CliError> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
