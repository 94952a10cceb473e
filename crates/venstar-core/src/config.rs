// ── Runtime connection configuration ──
//
// Describes *how* to reach one thermostat. Carries credential data and
// connection tuning, but never touches disk -- the host constructs a
// `DeviceConfig` and hands it in. Replaced wholesale on reconfiguration;
// an active session is never mutated in place.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::error::CoreError;

/// Polling faster than this hammers the embedded web server.
const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(10);

/// Configuration for connecting to a single thermostat.
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    /// Device base URL (e.g. `http://192.168.1.50`).
    pub base_url: Url,
    /// Digest auth username.
    pub username: String,
    /// Digest auth password.
    pub password: SecretString,
    /// How often to run a poll cycle.
    pub refresh_interval: Duration,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl DeviceConfig {
    /// Create a config with the default cadence (60 s refresh, 30 s timeout).
    pub fn new(base_url: Url, username: impl Into<String>, password: SecretString) -> Self {
        Self {
            base_url,
            username: username.into(),
            password,
            refresh_interval: Duration::from_secs(60),
            timeout: Duration::from_secs(30),
        }
    }

    /// Validate the config before a session is established.
    ///
    /// Mirrors the device's own requirements: credentials must be present
    /// and the refresh interval must be at least 10 seconds.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.username.is_empty() {
            return Err(config_error("username must not be empty"));
        }
        if self.password.expose_secret().is_empty() {
            return Err(config_error("password must not be empty"));
        }
        if self.refresh_interval < MIN_REFRESH_INTERVAL {
            return Err(config_error(&format!(
                "refresh interval {}s is below the 10s minimum",
                self.refresh_interval.as_secs()
            )));
        }
        Ok(())
    }
}

fn config_error(message: &str) -> CoreError {
    CoreError::Config {
        message: message.to_owned(),
    }
}
