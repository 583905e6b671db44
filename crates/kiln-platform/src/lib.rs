//! Platform client implementations for Kiln.
//!
//! This crate provides concrete implementations of the `kiln-abstraction`
//! traits.
//!
//! # Clients
//!
//! - **HttpInferenceClient**: endpoint description + sync/async invocation
//! - **HttpTrainingClient**: training-job creation
//! - **HttpObjectStore**: object-storage writes
//! - **Static/Recording/Memory mocks**: testing and local development

pub mod inference;
pub mod storage;
pub mod training;

use async_trait::async_trait;
use kiln_abstraction::{
    AsyncInvokeReceipt, CreateTrainingJobRequest, EndpointDescription, InferenceApi, ObjectStore,
    PlatformError, TrainingApi, TrainingJobCreated,
};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;

pub use inference::HttpInferenceClient;
pub use storage::HttpObjectStore;
pub use training::HttpTrainingClient;

/// A recorded synchronous invocation made against [`StaticInferenceApi`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedSyncInvoke {
    pub endpoint_name: String,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

/// A recorded asynchronous submission made against [`StaticInferenceApi`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedAsyncInvoke {
    pub endpoint_name: String,
    pub content_type: String,
    pub input_location: String,
}

/// An in-memory implementation of [`InferenceApi`] with canned replies.
///
/// Serves a fixed endpoint description and invocation results while
/// recording every call, for tests and local development.
#[derive(Debug)]
pub struct StaticInferenceApi {
    description: EndpointDescription,
    sync_response: Vec<u8>,
    receipt: AsyncInvokeReceipt,
    failure: Option<PlatformError>,
    sync_calls: Mutex<Vec<RecordedSyncInvoke>>,
    async_calls: Mutex<Vec<RecordedAsyncInvoke>>,
}

impl StaticInferenceApi {
    /// Creates an API describing a synchronous endpoint that answers with `response`.
    #[must_use]
    pub fn synchronous(endpoint_name: &str, response: Vec<u8>) -> Self {
        Self {
            description: EndpointDescription {
                endpoint_name: endpoint_name.to_string(),
                endpoint_status: Some("InService".to_string()),
                async_inference_config: None,
            },
            sync_response: response,
            receipt: AsyncInvokeReceipt { output_location: String::new(), inference_id: None },
            failure: None,
            sync_calls: Mutex::new(Vec::new()),
            async_calls: Mutex::new(Vec::new()),
        }
    }

    /// Creates an API describing an asynchronous endpoint whose receipts
    /// point at `output_location`.
    #[must_use]
    pub fn asynchronous(endpoint_name: &str, output_location: &str) -> Self {
        Self {
            description: EndpointDescription {
                endpoint_name: endpoint_name.to_string(),
                endpoint_status: Some("InService".to_string()),
                async_inference_config: Some(kiln_abstraction::AsyncInferenceConfig::default()),
            },
            sync_response: Vec::new(),
            receipt: AsyncInvokeReceipt {
                output_location: output_location.to_string(),
                inference_id: None,
            },
            failure: None,
            sync_calls: Mutex::new(Vec::new()),
            async_calls: Mutex::new(Vec::new()),
        }
    }

    /// Creates an API that fails every call with `error`.
    #[must_use]
    pub fn failing(error: PlatformError) -> Self {
        let mut api = Self::synchronous("", Vec::new());
        api.failure = Some(error);
        api
    }

    /// Synchronous invocations recorded so far.
    pub fn sync_invocations(&self) -> Vec<RecordedSyncInvoke> {
        self.sync_calls.lock().expect("lock poisoned").clone()
    }

    /// Asynchronous submissions recorded so far.
    pub fn async_invocations(&self) -> Vec<RecordedAsyncInvoke> {
        self.async_calls.lock().expect("lock poisoned").clone()
    }

    fn check_failure(&self) -> Result<(), PlatformError> {
        match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl InferenceApi for StaticInferenceApi {
    async fn describe_endpoint(
        &self,
        endpoint_name: &str,
    ) -> Result<EndpointDescription, PlatformError> {
        debug!(endpoint_name = %endpoint_name, "StaticInferenceApi describing endpoint");
        self.check_failure()?;
        Ok(EndpointDescription {
            endpoint_name: endpoint_name.to_string(),
            ..self.description.clone()
        })
    }

    async fn invoke_endpoint(
        &self,
        endpoint_name: &str,
        content_type: Option<&str>,
        body: Vec<u8>,
    ) -> Result<Vec<u8>, PlatformError> {
        self.check_failure()?;
        self.sync_calls.lock().expect("lock poisoned").push(RecordedSyncInvoke {
            endpoint_name: endpoint_name.to_string(),
            content_type: content_type.map(str::to_string),
            body,
        });
        Ok(self.sync_response.clone())
    }

    async fn invoke_endpoint_async(
        &self,
        endpoint_name: &str,
        content_type: &str,
        input_location: &str,
    ) -> Result<AsyncInvokeReceipt, PlatformError> {
        self.check_failure()?;
        self.async_calls.lock().expect("lock poisoned").push(RecordedAsyncInvoke {
            endpoint_name: endpoint_name.to_string(),
            content_type: content_type.to_string(),
            input_location: input_location.to_string(),
        });
        Ok(self.receipt.clone())
    }
}

/// An in-memory implementation of [`TrainingApi`] that records submissions.
#[derive(Debug)]
pub struct RecordingTrainingApi {
    training_job_arn: String,
    rejection: Option<PlatformError>,
    submitted: Mutex<Vec<CreateTrainingJobRequest>>,
}

impl RecordingTrainingApi {
    /// Creates an API that accepts every job, replying with `training_job_arn`.
    #[must_use]
    pub fn new(training_job_arn: &str) -> Self {
        Self {
            training_job_arn: training_job_arn.to_string(),
            rejection: None,
            submitted: Mutex::new(Vec::new()),
        }
    }

    /// Creates an API that rejects every job with `error`.
    #[must_use]
    pub fn rejecting(error: PlatformError) -> Self {
        Self {
            training_job_arn: String::new(),
            rejection: Some(error),
            submitted: Mutex::new(Vec::new()),
        }
    }

    /// Requests submitted so far.
    pub fn submissions(&self) -> Vec<CreateTrainingJobRequest> {
        self.submitted.lock().expect("lock poisoned").clone()
    }
}

#[async_trait]
impl TrainingApi for RecordingTrainingApi {
    async fn create_training_job(
        &self,
        request: &CreateTrainingJobRequest,
    ) -> Result<TrainingJobCreated, PlatformError> {
        debug!(
            training_job_name = %request.training_job_name,
            "RecordingTrainingApi received training job"
        );
        if let Some(err) = &self.rejection {
            return Err(err.clone());
        }
        self.submitted.lock().expect("lock poisoned").push(request.clone());
        Ok(TrainingJobCreated { training_job_arn: self.training_job_arn.clone() })
    }
}

/// An in-memory implementation of [`ObjectStore`] for tests and local runs.
///
/// Keys can be marked as failing to exercise error paths.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: Mutex<BTreeMap<(String, String), Vec<u8>>>,
    fail_keys: Mutex<BTreeSet<String>>,
}

impl MemoryObjectStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `key` so that writes to it fail with an injected storage error.
    pub fn fail_on_key(&self, key: &str) {
        self.fail_keys.lock().expect("lock poisoned").insert(key.to_string());
    }

    /// Returns the stored object, if any.
    pub fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .expect("lock poisoned")
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    /// All `(bucket, key)` pairs written so far, in sorted order.
    pub fn keys(&self) -> Vec<(String, String)> {
        self.objects.lock().expect("lock poisoned").keys().cloned().collect()
    }

    /// Number of objects written so far.
    pub fn object_count(&self) -> usize {
        self.objects.lock().expect("lock poisoned").len()
    }

    fn write(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<(), PlatformError> {
        if self.fail_keys.lock().expect("lock poisoned").contains(key) {
            return Err(PlatformError::ApiError {
                status: 500,
                message: format!("injected failure for key {key}"),
            });
        }
        self.objects
            .lock()
            .expect("lock poisoned")
            .insert((bucket.to_string(), key.to_string()), body);
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
    ) -> Result<(), PlatformError> {
        self.write(bucket, key, body)
    }

    async fn upload_file(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
    ) -> Result<(), PlatformError> {
        let body = tokio::fs::read(path).await.map_err(|e| {
            PlatformError::RequestError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        self.write(bucket, key, body)
    }
}
