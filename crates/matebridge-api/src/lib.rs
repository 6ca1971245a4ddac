// matebridge-api: Async Rust client for the TeslaMate API

pub mod cars;
pub mod client;
pub mod error;
pub mod models;
pub mod transport;

pub use client::TeslaMateClient;
pub use error::Error;
pub use models::{Car, CarId, PingResponse};
pub use transport::{TlsMode, TransportConfig};
