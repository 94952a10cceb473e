// opensprinkler-api: Async Rust client for the OpenSprinkler HTTP API.
//
// The device's authentication scheme changed across firmware generations
// (plaintext password up to 2.1.2, MD5-hashed from 2.1.3), so the client
// is exposed as a capability trait with one implementation per
// generation, selected at construction time.

pub mod api;
pub mod error;
pub mod models;

pub use api::{FirmwareVersion, SprinklerApi, connect};
pub use error::Error;
pub use models::{ControllerVariables, StationStatus};
