use thiserror::Error;

/// Top-level error type for the `venstar-api` crate.
///
/// Covers every failure mode of the local thermostat API: digest
/// authentication, transport, unexpected status codes, and malformed
/// payloads. `venstar-core` maps these into its two user-facing kinds.
#[derive(Debug, Error)]
pub enum Error {
    /// The thermostat rejected our credentials (401/403 after the digest
    /// handshake, or a challenge we cannot answer).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup or client construction error.
    #[error("TLS error: {0}")]
    Tls(String),

    /// The thermostat answered with a non-success status code.
    #[error("Unexpected HTTP status {status} from thermostat")]
    UnexpectedStatus { status: u16 },

    /// A `/control` request was acknowledged but refused by the device.
    #[error("Control request rejected: {reason}")]
    ControlRejected { reason: String },

    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this failure means the configured credentials are
    /// wrong and retrying without user intervention is pointless.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Authentication { .. })
            || matches!(self, Self::UnexpectedStatus { status: 401 | 403 })
    }
}
