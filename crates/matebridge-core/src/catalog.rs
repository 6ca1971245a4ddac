// ── Command and setting catalog ──
//
// Static table of the logical commands and settings each vehicle exposes
// under `commands.*` and `settings.*`. Settings are routed as
// `set_<name>` with a single-parameter body.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CoreError;
use crate::value::{StateValue, ValueType};

/// Prefix that turns a setting name into its command.
const SETTING_PREFIX: &str = "set_";

/// A button-style command node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandDefinition {
    pub name: String,
    /// Name used on the wire; defaults to `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wire_name: Option<String>,
    /// Tree role; defaults to `button`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Node type; defaults to boolean.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<ValueType>,
}

impl CommandDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            wire_name: None,
            role: None,
            value_type: None,
        }
    }

    pub fn wire_name(&self) -> &str {
        self.wire_name.as_deref().unwrap_or(&self.name)
    }

    pub fn role(&self) -> &str {
        self.role.as_deref().unwrap_or("button")
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type.unwrap_or(ValueType::Boolean)
    }
}

/// A value-carrying setting node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingDefinition {
    pub name: String,
    /// Body key carrying the value.
    pub wire_param: String,
    pub value_type: ValueType,
}

impl SettingDefinition {
    pub fn new(name: impl Into<String>, wire_param: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            wire_param: wire_param.into(),
            value_type,
        }
    }

    /// Wire command for this setting (`set_<name>`).
    pub fn command_name(&self) -> String {
        format!("{SETTING_PREFIX}{}", self.name)
    }

    /// Request body for a value: `{ <wire_param>: <value> }`.
    pub fn payload(&self, value: &StateValue) -> Map<String, Value> {
        let mut body = Map::new();
        body.insert(self.wire_param.clone(), value.to_json());
        body
    }
}

/// Commands and settings exposed per vehicle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    commands: Vec<CommandDefinition>,
    settings: Vec<SettingDefinition>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Catalog {
    /// The built-in table.
    pub fn builtin() -> Self {
        let commands = [
            "wake_up",
            "flash_lights",
            "charge_port_door_open",
            "charge_port_door_close",
            "charge_start",
            "charge_stop",
            "door_lock",
            "door_unlock",
            "auto_conditioning_start",
            "auto_conditioning_stop",
        ]
        .into_iter()
        .map(CommandDefinition::new)
        .collect();

        let settings = vec![
            SettingDefinition::new("charge_limit", "percent", ValueType::Number),
            SettingDefinition::new("charging_amps", "charging_amps", ValueType::Number),
        ];

        Self { commands, settings }
    }

    /// Add or replace entries by name.
    #[must_use]
    pub fn extended(
        mut self,
        commands: impl IntoIterator<Item = CommandDefinition>,
        settings: impl IntoIterator<Item = SettingDefinition>,
    ) -> Self {
        for def in commands {
            match self.commands.iter_mut().find(|c| c.name == def.name) {
                Some(existing) => *existing = def,
                None => self.commands.push(def),
            }
        }
        for def in settings {
            match self.settings.iter_mut().find(|s| s.name == def.name) {
                Some(existing) => *existing = def,
                None => self.settings.push(def),
            }
        }
        self
    }

    pub fn commands(&self) -> &[CommandDefinition] {
        &self.commands
    }

    pub fn settings(&self) -> &[SettingDefinition] {
        &self.settings
    }

    pub fn command(&self, name: &str) -> Result<&CommandDefinition, CoreError> {
        self.commands
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| CoreError::UnknownCommand {
                name: name.to_owned(),
            })
    }

    pub fn setting(&self, name: &str) -> Result<&SettingDefinition, CoreError> {
        self.settings
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| CoreError::UnknownSetting {
                name: name.to_owned(),
            })
    }
}
