//! Command dispatch: bridges CLI args -> core Bridge -> output formatting.

pub mod catalog;
pub mod config_cmd;
pub mod control;
pub mod run;
pub mod status;
pub mod util;

use matebridge_core::BridgeConfig;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch an API-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    config: BridgeConfig,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Run(args) => run::handle(config, &args).await,
        Command::Status(args) => status::handle(config, args, global).await,
        Command::Ping => status::ping(config, global).await,
        Command::Command(args) => control::command(config, args, global).await,
        Command::Set(args) => control::set(config, args, global).await,
        // Config, Catalog and Completions are handled before dispatch
        Command::Config(_) | Command::Catalog(_) | Command::Completions(_) => {
            Err(CliError::Validation {
                field: "command".into(),
                reason: "does not talk to the API".into(),
            })
        }
    }
}
