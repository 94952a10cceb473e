// ── Core error types ──
//
// User-facing errors from venstar-core. Only two kinds reach the host's
// status surface: authentication failures (fix the credentials) and
// communication failures (transient, retried on the next tick). The
// `From<venstar_api::Error>` impl folds every transport-layer failure,
// including malformed JSON, into one of the two.

use thiserror::Error;

use crate::model::UnknownCode;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The device rejected the configured credentials (HTTP 401/403).
    /// A configuration problem -- retrying without user action is pointless.
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    /// Transport failure, unexpected status, or malformed payload.
    /// Transient; the next scheduled poll retries.
    #[error("Communication failed: {message}")]
    CommunicationFailed { message: String },

    /// No active session -- `connect()` has not been called (or failed).
    #[error("Thermostat disconnected")]
    Disconnected,

    /// A command arrived before the first successful poll, so the full
    /// desired state cannot be composed.
    #[error("Device state not yet synchronized")]
    NotSynchronized,

    /// Invalid configuration (empty credentials, refresh interval too short).
    #[error("Configuration error: {message}")]
    Config { message: String },
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<venstar_api::Error> for CoreError {
    fn from(err: venstar_api::Error) -> Self {
        if err.is_auth() {
            CoreError::AuthenticationFailed {
                message: err.to_string(),
            }
        } else {
            CoreError::CommunicationFailed {
                message: err.to_string(),
            }
        }
    }
}

impl From<UnknownCode> for CoreError {
    fn from(err: UnknownCode) -> Self {
        CoreError::CommunicationFailed {
            message: err.to_string(),
        }
    }
}
