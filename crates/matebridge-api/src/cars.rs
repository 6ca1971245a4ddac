// TeslaMate API endpoints
//
// Liveness, car listing, status, commands, and logging control.

use serde_json::{Map, Value};
use tracing::debug;

use crate::client::TeslaMateClient;
use crate::error::Error;
use crate::models::{Car, CarId, CarsData, DataEnvelope, PingResponse, StatusData};

impl TeslaMateClient {
    /// Liveness check.
    ///
    /// `GET /ping`
    pub async fn ping(&self) -> Result<PingResponse, Error> {
        self.get("ping").await
    }

    /// List every car known to TeslaMate.
    ///
    /// `GET /v1/cars`
    pub async fn list_cars(&self) -> Result<Vec<Car>, Error> {
        let envelope: DataEnvelope<CarsData> = self.get("v1/cars").await?;
        debug!(count = envelope.data.cars.len(), "listed cars");
        Ok(envelope.data.cars)
    }

    /// Current status of one car.
    ///
    /// `GET /v1/cars/{car_id}/status`
    ///
    /// Returns the loosely-typed `status` object; callers flatten it.
    pub async fn car_status(&self, car_id: &CarId) -> Result<Map<String, Value>, Error> {
        let envelope: DataEnvelope<StatusData> =
            self.get(&format!("v1/cars/{car_id}/status")).await?;
        Ok(envelope.data.status)
    }

    /// Send a command, optionally with a JSON body.
    ///
    /// `POST /v1/cars/{car_id}/command/{command}`
    pub async fn send_command(
        &self,
        car_id: &CarId,
        command: &str,
        body: Option<&Value>,
    ) -> Result<Value, Error> {
        self.post(&format!("v1/cars/{car_id}/command/{command}"), body)
            .await
    }

    /// Ask TeslaMate to resume logging for a (sleeping) car.
    ///
    /// `PUT /v1/cars/{car_id}/logging/resume`
    pub async fn resume_logging(&self, car_id: &CarId) -> Result<Value, Error> {
        self.put(&format!("v1/cars/{car_id}/logging/resume")).await
    }
}
