// TeslaMate API response shapes
//
// Only the envelope and the identity fields are typed. Everything the
// bridge mirrors into the state tree stays as loosely-typed JSON because
// the field set varies across TeslaMate API versions.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Server-assigned car identifier.
///
/// TeslaMate returns a number, but some proxies re-encode it as a string,
/// so both forms are accepted and kept as text for URL construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct CarId(String);

impl CarId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for CarId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl<'de> Deserialize<'de> for CarId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(serde_json::Number),
            Text(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Self(n.to_string()),
            Raw::Text(s) => Self(s),
        })
    }
}

/// `GET /ping` body.
#[derive(Debug, Clone, Deserialize)]
pub struct PingResponse {
    #[serde(default)]
    pub message: Option<String>,
}

impl PingResponse {
    /// The server answered with the expected `"pong"` sentinel.
    pub fn is_pong(&self) -> bool {
        self.message.as_deref() == Some("pong")
    }
}

/// Standard `{ "data": { ... } }` wrapper.
#[derive(Debug, Deserialize)]
pub(crate) struct DataEnvelope<T> {
    pub data: T,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CarsData {
    #[serde(default)]
    pub cars: Vec<Car>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusData {
    #[serde(default)]
    pub status: Map<String, Value>,
}

/// One entry of `GET /v1/cars`.
#[derive(Debug, Clone, Deserialize)]
pub struct Car {
    pub car_id: CarId,
    #[serde(default)]
    pub name: Option<String>,
    /// Static vehicle details (`vin`, `model`, `trim_badging`, ...).
    #[serde(default)]
    pub car_details: Map<String, Value>,
}

impl Car {
    /// The vehicle's VIN, if the API included one.
    pub fn vin(&self) -> Option<&str> {
        self.car_details
            .get("vin")
            .and_then(Value::as_str)
            .filter(|v| !v.is_empty())
    }
}
