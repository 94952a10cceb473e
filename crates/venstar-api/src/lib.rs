// venstar-api: Async Rust client for the Venstar ColorTouch local HTTP API

mod auth;
pub mod client;
pub mod error;
pub mod models;
pub mod transport;

pub use client::ColorTouchClient;
pub use error::Error;
pub use models::{ControlRequest, InfoData, Sensor, SensorReadings};
