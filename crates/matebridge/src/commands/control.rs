//! `command` and `set` handlers: one-shot dispatch through the bridge.

use matebridge_core::{Bridge, BridgeConfig, StateValue};

use crate::cli::{CommandArgs, GlobalOpts, SetArgs};
use crate::error::CliError;
use crate::output;

use super::util;

pub async fn command(
    mut config: BridgeConfig,
    args: CommandArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    if args.force_wake {
        config.wake.force_wake = true;
    }
    // Fail on unknown names before any network traffic
    config.catalog.command(&args.name)?;

    let api = util::client(&config)?;
    let CommandArgs { vin, name, .. } = args;
    let label = format!("{name} sent to {vin}");
    let wake = Bridge::oneshot(config, api, |bridge| async move {
        bridge.dispatch_command(&vin, &name).await
    })
    .await?;

    output::print_output(
        &format!("{label}{}", util::describe_wake(wake)),
        global.quiet,
    );
    Ok(())
}

pub async fn set(
    mut config: BridgeConfig,
    args: SetArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    if args.force_wake {
        config.wake.force_wake = true;
    }
    let setting = config.catalog.setting(&args.name)?;
    let value = StateValue::parse(&args.value, setting.value_type, &setting.name)?;

    let api = util::client(&config)?;
    let SetArgs { vin, name, .. } = args;
    let label = format!("{name} on {vin} = {value}");
    let wake = Bridge::oneshot(config, api, |bridge| async move {
        bridge.dispatch_setting(&vin, &name, &value).await
    })
    .await?;

    output::print_output(
        &format!("{label}{}", util::describe_wake(wake)),
        global.quiet,
    );
    Ok(())
}
