// ── Remote API seam ──
//
// The reconciler, dispatcher, and health monitor talk to TeslaMate only
// through this trait. `TeslaMateClient` is the production implementation.

use std::future::Future;

use serde_json::{Map, Value};

use matebridge_api::{Car, CarId, Error as ApiError, PingResponse, TeslaMateClient};

pub trait VehicleApi: Send + Sync + 'static {
    /// `GET /ping`
    fn ping(&self) -> impl Future<Output = Result<PingResponse, ApiError>> + Send;

    /// `GET /v1/cars`
    fn list_cars(&self) -> impl Future<Output = Result<Vec<Car>, ApiError>> + Send;

    /// `GET /v1/cars/{car_id}/status`
    fn car_status(
        &self,
        car_id: &CarId,
    ) -> impl Future<Output = Result<Map<String, Value>, ApiError>> + Send;

    /// `POST /v1/cars/{car_id}/command/{command}`
    fn send_command(
        &self,
        car_id: &CarId,
        command: &str,
        body: Option<&Value>,
    ) -> impl Future<Output = Result<Value, ApiError>> + Send;

    /// `PUT /v1/cars/{car_id}/logging/resume`
    fn resume_logging(
        &self,
        car_id: &CarId,
    ) -> impl Future<Output = Result<Value, ApiError>> + Send;
}

impl VehicleApi for TeslaMateClient {
    async fn ping(&self) -> Result<PingResponse, ApiError> {
        TeslaMateClient::ping(self).await
    }

    async fn list_cars(&self) -> Result<Vec<Car>, ApiError> {
        TeslaMateClient::list_cars(self).await
    }

    async fn car_status(&self, car_id: &CarId) -> Result<Map<String, Value>, ApiError> {
        TeslaMateClient::car_status(self, car_id).await
    }

    async fn send_command(
        &self,
        car_id: &CarId,
        command: &str,
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        TeslaMateClient::send_command(self, car_id, command, body).await
    }

    async fn resume_logging(&self, car_id: &CarId) -> Result<Value, ApiError> {
        TeslaMateClient::resume_logging(self, car_id).await
    }
}
