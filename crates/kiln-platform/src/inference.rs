//! HTTP client for the platform's inference API.
//!
//! Implements `InferenceApi` against the platform's REST surface:
//! endpoint descriptions, synchronous invocations, and asynchronous
//! invocation submission.
//!
//! The synchronous invocation policy is fixed and deliberately spartan:
//! a 120-second read timeout and **zero retries**. No retry middleware is
//! installed anywhere in this client; a slow endpoint blocks the caller
//! until the platform answers or the timeout fires.

use async_trait::async_trait;
use kiln_abstraction::{
    AsyncInvokeReceipt, EndpointDescription, InferenceApi, PlatformError,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

/// Read timeout for synchronous endpoint invocations.
const INVOKE_READ_TIMEOUT: Duration = Duration::from_secs(120);

/// HTTP implementation of [`InferenceApi`].
#[derive(Debug, Clone)]
pub struct HttpInferenceClient {
    /// Base URL of the platform's inference API.
    base_url: String,
    /// Optional bearer token for authentication.
    api_key: Option<String>,
    /// HTTP client for making requests.
    client: Client,
}

impl HttpInferenceClient {
    /// Creates a client without authentication.
    ///
    /// # Errors
    /// Returns a `PlatformError` if the underlying HTTP client cannot be built.
    pub fn new(base_url: String) -> Result<Self, PlatformError> {
        Ok(Self { base_url, api_key: None, client: build_client()? })
    }

    /// Creates a client that authenticates with a bearer token.
    ///
    /// # Errors
    /// Returns a `PlatformError` if the underlying HTTP client cannot be built.
    pub fn with_api_key(base_url: String, api_key: String) -> Result<Self, PlatformError> {
        Ok(Self { base_url, api_key: Some(api_key), client: build_client()? })
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }
}

fn build_client() -> Result<Client, PlatformError> {
    Client::builder()
        .timeout(INVOKE_READ_TIMEOUT)
        .build()
        .map_err(|e| PlatformError::RequestError(format!("failed to build HTTP client: {}", e)))
}

/// Converts a non-success platform reply into a typed error.
async fn api_error(response: reqwest::Response) -> PlatformError {
    let status = response.status().as_u16();
    let message = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
    PlatformError::ApiError { status, message }
}

#[async_trait]
impl InferenceApi for HttpInferenceClient {
    async fn describe_endpoint(
        &self,
        endpoint_name: &str,
    ) -> Result<EndpointDescription, PlatformError> {
        let url = format!("{}/endpoints/{}", self.base_url, endpoint_name);
        debug!(endpoint_name = %endpoint_name, "Describing endpoint");

        let response = self
            .request(self.client.get(&url))
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, endpoint_name = %endpoint_name, "Failed to describe endpoint");
                PlatformError::RequestError(format!("Network error: {}", e))
            })?;

        if !response.status().is_success() {
            let err = api_error(response).await;
            error!(error = %err, endpoint_name = %endpoint_name, "Endpoint description rejected");
            return Err(err);
        }

        response.json::<EndpointDescription>().await.map_err(|e| {
            error!(error = %e, "Failed to parse endpoint description");
            PlatformError::SerializationError(format!("Failed to parse response: {}", e))
        })
    }

    async fn invoke_endpoint(
        &self,
        endpoint_name: &str,
        content_type: Option<&str>,
        body: Vec<u8>,
    ) -> Result<Vec<u8>, PlatformError> {
        let url = format!("{}/endpoints/{}/invocations", self.base_url, endpoint_name);
        debug!(
            endpoint_name = %endpoint_name,
            content_type = ?content_type,
            body_len = body.len(),
            "Invoking endpoint synchronously"
        );

        let mut builder = self.request(self.client.post(&url)).body(body);
        if let Some(ct) = content_type {
            builder = builder.header(reqwest::header::CONTENT_TYPE, ct);
        }

        let response = builder.send().await.map_err(|e| {
            error!(error = %e, endpoint_name = %endpoint_name, "Synchronous invocation failed");
            PlatformError::RequestError(format!("Network error: {}", e))
        })?;

        if !response.status().is_success() {
            let err = api_error(response).await;
            error!(error = %err, endpoint_name = %endpoint_name, "Synchronous invocation rejected");
            return Err(err);
        }

        let bytes = response.bytes().await.map_err(|e| {
            error!(error = %e, "Failed to read invocation response body");
            PlatformError::RequestError(format!("Failed to read response body: {}", e))
        })?;
        Ok(bytes.to_vec())
    }

    async fn invoke_endpoint_async(
        &self,
        endpoint_name: &str,
        content_type: &str,
        input_location: &str,
    ) -> Result<AsyncInvokeReceipt, PlatformError> {
        let url = format!("{}/endpoints/{}/async-invocations", self.base_url, endpoint_name);
        debug!(
            endpoint_name = %endpoint_name,
            input_location = %input_location,
            "Submitting asynchronous invocation"
        );

        let request_body = AsyncInvokeRequest {
            input_location: input_location.to_string(),
            content_type: content_type.to_string(),
        };

        let response = self
            .request(self.client.post(&url))
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, endpoint_name = %endpoint_name, "Asynchronous submission failed");
                PlatformError::RequestError(format!("Network error: {}", e))
            })?;

        if !response.status().is_success() {
            let err = api_error(response).await;
            error!(error = %err, endpoint_name = %endpoint_name, "Asynchronous submission rejected");
            return Err(err);
        }

        response.json::<AsyncInvokeReceipt>().await.map_err(|e| {
            error!(error = %e, "Failed to parse async invocation receipt");
            PlatformError::SerializationError(format!("Failed to parse response: {}", e))
        })
    }
}

// Wire structures for the async-invocation submission.

#[derive(Debug, Serialize, Deserialize)]
struct AsyncInvokeRequest {
    input_location: String,
    content_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_describe_endpoint_sync_mode() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/endpoints/sd-endpoint")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"endpoint_name": "sd-endpoint", "endpoint_status": "InService"}"#)
            .create_async()
            .await;

        let client = HttpInferenceClient::new(server.url()).unwrap();
        let desc = client.describe_endpoint("sd-endpoint").await.unwrap();

        assert_eq!(desc.endpoint_name, "sd-endpoint");
        assert!(!desc.is_async());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_describe_endpoint_async_mode() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/endpoints/sd-async")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "endpoint_name": "sd-async",
                    "async_inference_config": {"output_prefix": "s3://bucket/out/"}
                }"#,
            )
            .create_async()
            .await;

        let client = HttpInferenceClient::new(server.url()).unwrap();
        let desc = client.describe_endpoint("sd-async").await.unwrap();

        assert!(desc.is_async());
    }

    #[tokio::test]
    async fn test_describe_endpoint_unknown_is_api_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/endpoints/nope")
            .with_status(404)
            .with_body("no such endpoint")
            .create_async()
            .await;

        let client = HttpInferenceClient::new(server.url()).unwrap();
        let err = client.describe_endpoint("nope").await.unwrap_err();

        assert_eq!(
            err,
            PlatformError::ApiError { status: 404, message: "no such endpoint".to_string() }
        );
    }

    #[tokio::test]
    async fn test_invoke_endpoint_forwards_content_type_and_returns_raw_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/endpoints/sd-endpoint/invocations")
            .match_header("content-type", "application/json")
            .with_status(200)
            .with_body(&[0x89u8, 0x50, 0x4e, 0x47][..])
            .create_async()
            .await;

        let client = HttpInferenceClient::new(server.url()).unwrap();
        let body = client
            .invoke_endpoint("sd-endpoint", Some("application/json"), b"{\"prompt\": \"cat\"}".to_vec())
            .await
            .unwrap();

        assert_eq!(body, vec![0x89, 0x50, 0x4e, 0x47]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_invoke_endpoint_omits_absent_content_type() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/endpoints/sd-endpoint/invocations")
            .match_header("content-type", mockito::Matcher::Missing)
            .with_status(200)
            .with_body("ok")
            .create_async()
            .await;

        let client = HttpInferenceClient::new(server.url()).unwrap();
        client.invoke_endpoint("sd-endpoint", None, b"raw".to_vec()).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_invoke_endpoint_async_returns_receipt() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/endpoints/sd-async/async-invocations")
            .match_body(mockito::Matcher::PartialJsonString(
                r#"{"input_location": "s3://bucket/asyncinvoke/in/abc.json"}"#.to_string(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"output_location": "s3://bucket/out/abc.json", "inference_id": "i-1"}"#)
            .create_async()
            .await;

        let client = HttpInferenceClient::new(server.url()).unwrap();
        let receipt = client
            .invoke_endpoint_async(
                "sd-async",
                "application/json",
                "s3://bucket/asyncinvoke/in/abc.json",
            )
            .await
            .unwrap();

        assert_eq!(receipt.output_location, "s3://bucket/out/abc.json");
        assert_eq!(receipt.inference_id, Some("i-1".to_string()));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_bearer_token_is_sent_when_configured() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/endpoints/ep")
            .match_header("authorization", "Bearer secret")
            .with_status(200)
            .with_body(r#"{"endpoint_name": "ep"}"#)
            .create_async()
            .await;

        let client = HttpInferenceClient::with_api_key(server.url(), "secret".to_string()).unwrap();
        client.describe_endpoint("ep").await.unwrap();

        mock.assert_async().await;
    }
}
