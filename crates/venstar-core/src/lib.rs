// venstar-core: Device poller/synchronizer between venstar-api and a host.

pub mod config;
pub mod error;
pub mod model;
pub mod thermostat;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::DeviceConfig;
pub use error::CoreError;
pub use model::{
    Channel, ChannelUpdate, ChannelValue, DeviceSnapshot, SystemMode, SystemState,
    TemperatureUnit,
};
pub use thermostat::{ConnectionStatus, OfflineReason, Thermostat};
