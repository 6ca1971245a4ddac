//! `catalog` handlers: the command and setting nodes each vehicle gets.

use tabled::Tabled;

use matebridge_core::{Catalog, CommandDefinition, SettingDefinition};

use crate::cli::{CatalogArgs, CatalogCommand, GlobalOpts};
use crate::config;
use crate::output;

#[derive(Tabled)]
struct CommandRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Wire Name")]
    wire_name: String,
    #[tabled(rename = "Role")]
    role: String,
    #[tabled(rename = "Type")]
    value_type: String,
}

fn command_row(c: &CommandDefinition) -> CommandRow {
    CommandRow {
        name: c.name.clone(),
        wire_name: c.wire_name().to_owned(),
        role: c.role().to_owned(),
        value_type: c.value_type().to_string(),
    }
}

#[derive(Tabled)]
struct SettingRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Command")]
    command: String,
    #[tabled(rename = "Parameter")]
    param: String,
    #[tabled(rename = "Type")]
    value_type: String,
}

fn setting_row(s: &SettingDefinition) -> SettingRow {
    SettingRow {
        name: s.name.clone(),
        command: s.command_name(),
        param: s.wire_param.clone(),
        value_type: s.value_type.to_string(),
    }
}

/// Built-in table plus the active profile's additions, if any.
fn active_catalog(global: &GlobalOpts) -> Catalog {
    let cfg = config::load_config_or_default();
    let name = config::active_profile_name(global, &cfg);
    match cfg.profiles.get(&name) {
        Some(profile) => {
            Catalog::builtin().extended(profile.commands.clone(), profile.settings.clone())
        }
        None => Catalog::builtin(),
    }
}

pub fn handle(args: &CatalogArgs, global: &GlobalOpts) {
    let catalog = active_catalog(global);
    let out = match args.command {
        CatalogCommand::Commands => {
            output::render_list(&global.output, catalog.commands(), command_row, |c| {
                c.name.clone()
            })
        }
        CatalogCommand::Settings => {
            output::render_list(&global.output, catalog.settings(), setting_row, |s| {
                s.name.clone()
            })
        }
    };
    output::print_output(&out, global.quiet);
}
