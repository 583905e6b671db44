//! HTTP client for the platform's object storage.
//!
//! Speaks the storage service's REST surface: `PUT {base}/{bucket}/{key}`.
//! Only writes are implemented; kiln never lists, reads, or deletes.

use async_trait::async_trait;
use kiln_abstraction::{ObjectStore, PlatformError};
use reqwest::Client;
use std::path::Path;
use tracing::{debug, error};

/// HTTP implementation of [`ObjectStore`].
#[derive(Debug, Clone)]
pub struct HttpObjectStore {
    /// Base URL of the storage service.
    base_url: String,
    /// Optional bearer token for authentication.
    api_key: Option<String>,
    /// HTTP client for making requests.
    client: Client,
}

impl HttpObjectStore {
    /// Creates a client without authentication.
    #[must_use]
    pub fn new(base_url: String) -> Self {
        Self { base_url, api_key: None, client: Client::new() }
    }

    /// Creates a client that authenticates with a bearer token.
    #[must_use]
    pub fn with_api_key(base_url: String, api_key: String) -> Self {
        Self { base_url, api_key: Some(api_key), client: Client::new() }
    }

    async fn put(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<(), PlatformError> {
        let url = format!("{}/{}/{}", self.base_url, bucket, key);
        debug!(bucket = %bucket, key = %key, body_len = body.len(), "Writing object");

        let mut builder = self.client.put(&url).body(body);
        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key);
        }

        let response = builder.send().await.map_err(|e| {
            error!(error = %e, bucket = %bucket, key = %key, "Object write failed");
            PlatformError::RequestError(format!("Network error: {}", e))
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            error!(status = %status, bucket = %bucket, key = %key, "Object write rejected");
            return Err(PlatformError::ApiError { status: status.as_u16(), message });
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
    ) -> Result<(), PlatformError> {
        self.put(bucket, key, body).await
    }

    async fn upload_file(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
    ) -> Result<(), PlatformError> {
        let body = tokio::fs::read(path).await.map_err(|e| {
            error!(error = %e, path = %path.display(), "Failed to read local file for upload");
            PlatformError::RequestError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        self.put(bucket, key, body).await
    }
}
