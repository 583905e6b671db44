//! HTTP client for the platform's training API.

use async_trait::async_trait;
use kiln_abstraction::{CreateTrainingJobRequest, PlatformError, TrainingApi, TrainingJobCreated};
use reqwest::Client;
use tracing::{debug, error};

/// HTTP implementation of [`TrainingApi`].
#[derive(Debug, Clone)]
pub struct HttpTrainingClient {
    /// Base URL of the platform's training API.
    base_url: String,
    /// Optional bearer token for authentication.
    api_key: Option<String>,
    /// HTTP client for making requests.
    client: Client,
}

impl HttpTrainingClient {
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
}

#[async_trait]
impl TrainingApi for HttpTrainingClient {
    async fn create_training_job(
        &self,
        request: &CreateTrainingJobRequest,
    ) -> Result<TrainingJobCreated, PlatformError> {
        let url = format!("{}/training-jobs", self.base_url);
        debug!(
            training_job_name = %request.training_job_name,
            hyperparameter_count = request.hyperparameters.len(),
            "Creating training job"
        );

        let mut builder = self.client.post(&url).json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| {
            error!(
                error = %e,
                training_job_name = %request.training_job_name,
                "Failed to submit training job"
            );
            PlatformError::RequestError(format!("Network error: {}", e))
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            error!(
                status = %status,
                error = %message,
                training_job_name = %request.training_job_name,
                "Training job rejected by platform"
            );
            return Err(PlatformError::ApiError { status: status.as_u16(), message });
        }

        response.json::<TrainingJobCreated>().await.map_err(|e| {
            error!(error = %e, "Failed to parse training job creation response");
            PlatformError::SerializationError(format!("Failed to parse response: {}", e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn sample_request() -> CreateTrainingJobRequest {
        CreateTrainingJobRequest {
            training_job_name: "sd-train-1".to_string(),
            hyperparameters: BTreeMap::from([("epochs".to_string(), "\"3\"".to_string())]),
            algorithm_specification: serde_json::json!({
                "training_image": "platform/sd-training:latest",
                "training_input_mode": "File",
            }),
            role_arn: "arn:platform:role/training".to_string(),
            input_data_config: serde_json::json!([{"channel_name": "models"}]),
            output_data_config: serde_json::json!({"output_location": "s3://bucket/out"}),
            resource_config: serde_json::json!({"instance_type": "gpu.xlarge", "instance_count": 1}),
            stopping_condition: kiln_abstraction::StoppingCondition { max_runtime_seconds: 86400 },
            enable_network_isolation: false,
            enable_inter_container_traffic_encryption: false,
            enable_managed_spot_training: false,
            tags: serde_json::json!([]),
        }
    }

    #[tokio::test]
    async fn test_create_training_job_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/training-jobs")
            .match_body(mockito::Matcher::PartialJsonString(
                r#"{"training_job_name": "sd-train-1", "stopping_condition": {"max_runtime_seconds": 86400}}"#
                    .to_string(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"training_job_arn": "arn:platform:training-job/sd-train-1"}"#)
            .create_async()
            .await;

        let client = HttpTrainingClient::new(server.url());
        let created = client.create_training_job(&sample_request()).await.unwrap();

        assert_eq!(created.training_job_arn, "arn:platform:training-job/sd-train-1");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_training_job_duplicate_name_is_api_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/training-jobs")
            .with_status(409)
            .with_body("training job sd-train-1 already exists")
            .create_async()
            .await;

        let client = HttpTrainingClient::new(server.url());
        let err = client.create_training_job(&sample_request()).await.unwrap_err();

        match err {
            PlatformError::ApiError { status, message } => {
                assert_eq!(status, 409);
                assert!(message.contains("already exists"));
            }
            other => panic!("expected ApiError, got {other:?}"),
        }
    }
}
