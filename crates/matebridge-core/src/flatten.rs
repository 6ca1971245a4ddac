// ── Status payload flattening ──
//
// Scalar top-level keys map to `<key>`; one level of nested object keys
// maps to `<parent>.<child>`. Anything deeper, and every array, is kept
// as JSON text. Nulls carry no value and are skipped.

use serde_json::{Map, Value};

use crate::path;
use crate::value::{StateValue, ValueType};

/// One leaf discovered in a payload.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusField {
    /// Dot-joined path relative to the mirror root (`state`, `climate_details.inside_temp`).
    pub path: String,
    /// Last segment of `path`.
    pub name: String,
    pub value: StateValue,
}

impl StatusField {
    pub fn value_type(&self) -> ValueType {
        self.value.value_type()
    }
}

/// Flatten a payload into mirrored leaves, sorted by path.
pub fn flatten(payload: &Map<String, Value>) -> Vec<StatusField> {
    let mut fields = Vec::new();

    for (key, value) in payload {
        let key = path::segment(key);
        match value {
            Value::Object(children) => {
                for (child, child_value) in children {
                    let child = path::segment(child);
                    if let Some(value) = StateValue::from_json(child_value) {
                        fields.push(StatusField {
                            path: format!("{key}.{child}"),
                            name: child,
                            value,
                        });
                    }
                }
            }
            other => {
                if let Some(value) = StateValue::from_json(other) {
                    fields.push(StatusField {
                        path: key.clone(),
                        name: key,
                        value,
                    });
                }
            }
        }
    }

    fields.sort_by(|a, b| a.path.cmp(&b.path));
    fields
}
