use thiserror::Error;

/// Top-level error type for the `opensprinkler-api` crate.
#[derive(Debug, Error)]
pub enum Error {
    /// The device rejected the password (result code 2).
    #[error("Device password rejected")]
    Authentication,

    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Client construction error.
    #[error("Client setup error: {0}")]
    Setup(String),

    /// The device answered with a non-success HTTP status.
    #[error("Unexpected HTTP status {status} from device")]
    UnexpectedStatus { status: u16 },

    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// The device refused the command (any result code other than success
    /// or unauthorized).
    #[error("Command rejected by device: {} (code {code})", describe(*.code))]
    Rejected { code: u8 },
}

/// Human-readable names for the documented result codes.
fn describe(code: u8) -> &'static str {
    match code {
        3 => "mismatch",
        16 => "data missing",
        17 => "out of range",
        18 => "data format error",
        32 => "page not found",
        48 => "not permitted",
        _ => "unknown error",
    }
}
