//! `status` and `ping` handlers.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tabled::Tabled;

use matebridge_core::{Bridge, BridgeConfig, CoreError, StateValue, Vehicle};

use crate::cli::{GlobalOpts, StatusArgs};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct VehicleRow {
    #[tabled(rename = "VIN")]
    vin: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Car ID")]
    car_id: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Last Seen")]
    last_seen: String,
}

fn vehicle_row(v: &Vehicle, color: bool) -> VehicleRow {
    let state = v
        .last_known_state
        .map_or_else(|| "-".to_owned(), |s| s.to_string());
    VehicleRow {
        vin: v.vin.clone(),
        name: v.name.clone().unwrap_or_default(),
        car_id: v.car_id.as_ref().map(ToString::to_string).unwrap_or_default(),
        state: output::paint_state(&state, color),
        last_seen: v.last_seen.map(format_time).unwrap_or_default(),
    }
}

/// One mirrored state value, as rendered by `status --tree`.
#[derive(Serialize)]
struct StateLine {
    path: String,
    value: StateValue,
    ack: bool,
    updated_at: DateTime<Utc>,
}

#[derive(Tabled)]
struct StateRow {
    #[tabled(rename = "Path")]
    path: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Ack")]
    ack: String,
}

fn state_row(s: &StateLine) -> StateRow {
    StateRow {
        path: s.path.clone(),
        value: s.value.to_string(),
        ack: if s.ack { "yes".into() } else { "no".into() },
    }
}

fn format_time(t: DateTime<Utc>) -> String {
    t.format("%Y-%m-%d %H:%M:%S").to_string()
}

// ── Handlers ────────────────────────────────────────────────────────

pub async fn handle(
    config: BridgeConfig,
    args: StatusArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let api = util::client(&config)?;
    let color = output::should_color(&global.color);
    let format = global.output.clone();

    let rendered = Bridge::oneshot(config, api, |bridge| async move {
        if let Some(ref vin) = args.vin {
            if bridge.vehicle(vin).is_none() {
                return Err(CoreError::UnresolvedVehicle { vin: vin.clone() });
            }
        }

        if args.tree {
            let prefix = args
                .vin
                .as_deref()
                .map_or_else(|| "cars".to_owned(), |vin| format!("cars.{vin}"));
            let lines: Vec<StateLine> = bridge
                .tree()
                .snapshot(&prefix)
                .into_iter()
                .map(|(path, entry)| StateLine {
                    path,
                    value: entry.value,
                    ack: entry.ack,
                    updated_at: entry.updated_at,
                })
                .collect();
            return Ok(output::render_list(
                &format,
                &lines,
                state_row,
                |s| format!("{}={}", s.path, s.value),
            ));
        }

        let vehicles: Vec<Vehicle> = bridge
            .vehicles()
            .into_iter()
            .filter(|v| args.vin.as_deref().is_none_or(|vin| v.vin == vin))
            .collect();
        Ok(output::render_list(
            &format,
            &vehicles,
            |v| vehicle_row(v, color),
            |v| v.vin.clone(),
        ))
    })
    .await?;

    output::print_output(&rendered, global.quiet);
    Ok(())
}

pub async fn ping(config: BridgeConfig, global: &GlobalOpts) -> Result<(), CliError> {
    let url = config.url.to_string();
    let client = util::client(&config)?;
    let response = client.ping().await.map_err(CoreError::from)?;

    if !response.is_pong() {
        return Err(CliError::ConnectionFailed {
            reason: format!(
                "{url} answered {:?} instead of \"pong\"",
                response.message.unwrap_or_default()
            ),
        });
    }

    let color = output::should_color(&global.color);
    output::print_output(
        &format!("{url}: {}", output::paint_connected(true, color)),
        global.quiet,
    );
    Ok(())
}
