//! Configuration module for the Kiln gateway.

use std::net::SocketAddr;

use crate::error::{GatewayError, Result};
use serde::Deserialize;

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// The address to bind the HTTP server to.
    #[serde(default = "default_address")]
    pub address: SocketAddr,
}

fn default_address() -> SocketAddr {
    // This is a compile-time constant, so expect is safe
    "127.0.0.1:8080".parse().expect("valid default address")
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { address: default_address() }
    }
}

/// Endpoints and credentials of the managed ML platform.
#[derive(Debug, Clone, Deserialize)]
pub struct PlatformConfig {
    /// Base URL of the inference API.
    #[serde(default = "default_inference_url")]
    pub inference_url: String,
    /// Base URL of the training API.
    #[serde(default = "default_training_url")]
    pub training_url: String,
    /// Base URL of the object-storage service.
    #[serde(default = "default_storage_url")]
    pub storage_url: String,
    /// Optional bearer token for all platform calls.
    #[serde(default)]
    pub api_key: Option<String>,
}

fn default_inference_url() -> String {
    "http://localhost:9400".to_string()
}

fn default_training_url() -> String {
    "http://localhost:9401".to_string()
}

fn default_storage_url() -> String {
    "http://localhost:9500".to_string()
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            inference_url: default_inference_url(),
            training_url: default_training_url(),
            storage_url: default_storage_url(),
            api_key: None,
        }
    }
}

/// Where asynchronous-inference inputs are staged.
#[derive(Debug, Clone, Deserialize)]
pub struct AsyncInferenceSettings {
    /// Bucket the gateway writes request payloads to.
    #[serde(default = "default_bucket")]
    pub bucket: String,
    /// Key prefix for staged payloads. Written objects are never deleted
    /// by the gateway; cleanup belongs to the platform.
    #[serde(default = "default_input_prefix")]
    pub input_prefix: String,
}

fn default_bucket() -> String {
    "kiln-inference".to_string()
}

fn default_input_prefix() -> String {
    "asyncinvoke/in/".to_string()
}

impl Default for AsyncInferenceSettings {
    fn default() -> Self {
        Self { bucket: default_bucket(), input_prefix: default_input_prefix() }
    }
}

/// Root configuration for the Kiln gateway.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Platform endpoints and credentials.
    #[serde(default)]
    pub platform: PlatformConfig,
    /// Async-inference staging settings.
    #[serde(default)]
    pub async_inference: AsyncInferenceSettings,
}

impl Config {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration.
    ///
    /// Reads the TOML file named by `KILN_CONFIG` when the variable is
    /// set; otherwise returns defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load() -> Result<Self> {
        match std::env::var("KILN_CONFIG") {
            Ok(path) => {
                let contents = std::fs::read_to_string(&path)?;
                Self::from_toml_str(&contents)
            }
            Err(_) => Ok(Self::default()),
        }
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| GatewayError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.address, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(config.async_inference.bucket, "kiln-inference");
        assert_eq!(config.async_inference.input_prefix, "asyncinvoke/in/");
        assert_eq!(config.platform.api_key, None);
    }

    #[test]
    fn test_partial_toml_overrides() {
        let config = Config::from_toml_str(
            r#"
            [server]
            address = "0.0.0.0:9000"

            [async_inference]
            bucket = "models-prod"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.address, "0.0.0.0:9000".parse().unwrap());
        assert_eq!(config.async_inference.bucket, "models-prod");
        // Untouched sections keep their defaults
        assert_eq!(config.async_inference.input_prefix, "asyncinvoke/in/");
        assert_eq!(config.platform.inference_url, "http://localhost:9400");
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        let err = Config::from_toml_str("server = nonsense").unwrap_err();
        assert!(matches!(err, GatewayError::Config(_)));
    }
}
