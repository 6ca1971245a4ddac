// ── State values ──
//
// Tagged union of the scalar shapes the tree stores. Mirrors of arrays and
// deep objects are carried as their JSON text.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use strum::{Display, EnumString};

use crate::error::CoreError;

/// Declared type of a tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ValueType {
    Boolean,
    Number,
    String,
}

/// A scalar value stored in the state tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StateValue {
    Bool(bool),
    Number(Number),
    Text(String),
}

impl StateValue {
    /// Convert a JSON payload value.
    ///
    /// `null` has no scalar form and yields `None`. Arrays and objects are
    /// stringified.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::Number(n) => Some(Self::Number(n.clone())),
            Value::String(s) => Some(Self::Text(s.clone())),
            Value::Array(_) | Value::Object(_) => Some(Self::Text(value.to_string())),
        }
    }

    /// Parse user input according to the node's declared type.
    pub fn parse(raw: &str, value_type: ValueType, name: &str) -> Result<Self, CoreError> {
        let invalid = |reason: &str| CoreError::InvalidValue {
            name: name.to_owned(),
            reason: format!("'{raw}' {reason}"),
        };

        match value_type {
            ValueType::Boolean => match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "on" | "yes" => Ok(Self::Bool(true)),
                "false" | "0" | "off" | "no" => Ok(Self::Bool(false)),
                _ => Err(invalid("is not a boolean")),
            },
            ValueType::Number => serde_json::from_str::<Number>(raw.trim())
                .map(Self::Number)
                .map_err(|_| invalid("is not a number")),
            ValueType::String => Ok(Self::Text(raw.to_owned())),
        }
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Bool(_) => ValueType::Boolean,
            Self::Number(_) => ValueType::Number,
            Self::Text(_) => ValueType::String,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Bool(b) => Value::Bool(*b),
            Self::Number(n) => Value::Number(n.clone()),
            Self::Text(s) => Value::String(s.clone()),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for StateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<bool> for StateValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for StateValue {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

impl From<&str> for StateValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}
