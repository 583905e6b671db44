//! Platform abstraction layer for Kiln.
//!
//! This crate defines the traits and types for talking to the managed ML
//! platform: endpoint inference, training-job creation, and object storage.
//! Concrete HTTP clients live in `kiln-platform`; the gateway and the
//! staging tool only ever see these traits.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Represents an error returned by a platform client.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlatformError {
    /// An error occurred during the API request (e.g., network issues, invalid request).
    #[error("Request Error: {0}")]
    RequestError(String),

    /// The platform rejected the call (e.g., unknown endpoint, duplicate job name).
    #[error("Platform Error ({status}): {message}")]
    ApiError {
        /// HTTP status code returned by the platform.
        status: u16,
        /// Error body returned by the platform.
        message: String,
    },

    /// An error occurred during serialization or deserialization.
    #[error("Serialization Error: {0}")]
    SerializationError(String),

    /// The client is missing configuration required for the call.
    #[error("Not Configured: {0}")]
    NotConfigured(String),
}

/// Description of a deployed inference endpoint, as reported by the platform.
///
/// Kiln never stores these; the endpoint is externally owned and the
/// description is fetched per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointDescription {
    /// The endpoint name the description was fetched for.
    pub endpoint_name: String,

    /// Platform-reported status (e.g., "InService").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_status: Option<String>,

    /// Present iff the endpoint is configured for asynchronous inference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub async_inference_config: Option<AsyncInferenceConfig>,
}

impl EndpointDescription {
    /// Whether the endpoint dispatches asynchronously.
    ///
    /// The platform signals this solely through the presence of the
    /// async-inference configuration attribute.
    #[must_use]
    pub fn is_async(&self) -> bool {
        self.async_inference_config.is_some()
    }
}

/// Asynchronous-inference configuration echoed back by the platform.
///
/// Kiln only tests for presence; the fields are carried through for
/// callers that want to inspect them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsyncInferenceConfig {
    /// Storage prefix where the platform writes async results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_prefix: Option<String>,

    /// Platform-side concurrency cap for the endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concurrent_invocations: Option<u32>,
}

/// Receipt for an accepted asynchronous invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsyncInvokeReceipt {
    /// Location reference where the result will land.
    pub output_location: String,

    /// Platform-assigned invocation id, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inference_id: Option<String>,
}

/// Stopping condition for a training job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoppingCondition {
    /// Maximum wall-clock runtime the platform allows the job, in seconds.
    pub max_runtime_seconds: u64,
}

/// A training-job creation request, ready for submission.
///
/// Hyperparameter values must already be string-encoded (the platform only
/// accepts string-to-string maps); the platform-shaped sections
/// (`algorithm_specification`, data configs, `resource_config`, `tags`)
/// are forwarded verbatim as JSON — kiln does not interpret them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTrainingJobRequest {
    pub training_job_name: String,
    pub hyperparameters: BTreeMap<String, String>,
    pub algorithm_specification: serde_json::Value,
    pub role_arn: String,
    pub input_data_config: serde_json::Value,
    pub output_data_config: serde_json::Value,
    pub resource_config: serde_json::Value,
    pub stopping_condition: StoppingCondition,
    pub enable_network_isolation: bool,
    pub enable_inter_container_traffic_encryption: bool,
    pub enable_managed_spot_training: bool,
    pub tags: serde_json::Value,
}

/// The platform's reply to a training-job creation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingJobCreated {
    /// Platform identifier of the created job.
    pub training_job_arn: String,
}

/// A trait for invoking deployed inference endpoints.
///
/// All clients must be `Send + Sync` to allow sharing behind an `Arc`
/// across request handlers.
#[async_trait]
pub trait InferenceApi: Send + Sync {
    /// Fetches the endpoint's current description from the platform.
    ///
    /// # Errors
    /// Returns a `PlatformError` if the endpoint is unknown or the call fails.
    async fn describe_endpoint(
        &self,
        endpoint_name: &str,
    ) -> Result<EndpointDescription, PlatformError>;

    /// Invokes the endpoint synchronously and returns the complete response body.
    ///
    /// `content_type` is forwarded to the platform only when present.
    ///
    /// # Errors
    /// Returns a `PlatformError` if the invocation is rejected or transport fails.
    async fn invoke_endpoint(
        &self,
        endpoint_name: &str,
        content_type: Option<&str>,
        body: Vec<u8>,
    ) -> Result<Vec<u8>, PlatformError>;

    /// Submits an asynchronous invocation pointing at a staged input object.
    ///
    /// # Errors
    /// Returns a `PlatformError` if the submission is rejected.
    async fn invoke_endpoint_async(
        &self,
        endpoint_name: &str,
        content_type: &str,
        input_location: &str,
    ) -> Result<AsyncInvokeReceipt, PlatformError>;
}

/// A trait for creating training jobs on the platform.
#[async_trait]
pub trait TrainingApi: Send + Sync {
    /// Submits a training-job creation request.
    ///
    /// # Errors
    /// Returns a `PlatformError` if the platform rejects the job (e.g., a
    /// duplicate job name) or transport fails.
    async fn create_training_job(
        &self,
        request: &CreateTrainingJobRequest,
    ) -> Result<TrainingJobCreated, PlatformError>;
}

/// A trait for writing objects to the platform's object storage.
///
/// This is deliberately narrow: kiln only ever writes. Listing, reading,
/// and deletion are out of scope.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Writes `body` to `bucket` under `key`, overwriting any existing object.
    ///
    /// # Errors
    /// Returns a `PlatformError` if the write is rejected or transport fails.
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
    ) -> Result<(), PlatformError>;

    /// Uploads the local file at `path` to `bucket` under `key`.
    ///
    /// # Errors
    /// Returns a `PlatformError` if the file cannot be read or the write fails.
    async fn upload_file(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
    ) -> Result<(), PlatformError>;
}
