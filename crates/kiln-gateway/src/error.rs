//! Error types for the Kiln gateway.

use kiln_abstraction::PlatformError;
use thiserror::Error;

/// Response body returned for any non-POST request to the gateway routes.
pub const UNSUPPORTED_METHOD_BODY: &str = "Unsupported HTTP method";

/// Gateway error type.
///
/// Request handlers surface every variant the same way: status 400 with
/// the error's display string as the body.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// A required query parameter was absent
    #[error("missing required query parameter: {0}")]
    MissingQueryParam(&'static str),

    /// A required hyperparameter was absent
    #[error("missing hyperparameter: {0}")]
    MissingHyperparameter(&'static str),

    /// The request payload could not be decoded
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// Platform client errors
    #[error(transparent)]
    Platform(#[from] PlatformError),

    /// JSON (de)serialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;
