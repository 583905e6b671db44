//! Training job submitter.
//!
//! Accepts a JSON training-job description, re-encodes hyperparameters to
//! the platform's string-to-string form, pins the fixed submission
//! parameters, and forwards the job to the training API.

use axum::extract::State;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use kiln_abstraction::{CreateTrainingJobRequest, StoppingCondition, TrainingJobCreated};
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::{debug, error, info};

use crate::error::{GatewayError, UNSUPPORTED_METHOD_BODY};
use crate::server::AppState;

/// Hyperparameter whose value is a structured blob of trainer arguments.
const TRAIN_ARGS_KEY: &str = "train-args";

/// Maximum training-job runtime. Not configurable through the API.
const MAX_RUNTIME_SECONDS: u64 = 86400;

/// Inbound training-job description.
///
/// The platform-shaped sections are deserialized as raw JSON and
/// forwarded untouched; kiln only interprets the hyperparameters.
#[derive(Debug, Deserialize)]
pub struct TrainingJobSubmission {
    pub training_job_name: String,
    pub hyperparameters: serde_json::Map<String, serde_json::Value>,
    pub algorithm_specification: serde_json::Value,
    pub role_arn: String,
    pub input_data_config: serde_json::Value,
    pub output_data_config: serde_json::Value,
    pub resource_config: serde_json::Value,
    pub tags: serde_json::Value,
}

/// String-encodes every hyperparameter value for submission.
///
/// The `train-args` value is serialized to a JSON string first, then the
/// whole map is uniformly JSON-encoded — so `train-args` (and any value
/// that was already a string) comes out double-encoded. The platform
/// accepts this shape; it is not corrected here.
///
/// # Errors
/// Fails when `train-args` is absent from the map.
pub fn encode_hyperparameters(
    mut hyperparameters: serde_json::Map<String, serde_json::Value>,
) -> Result<BTreeMap<String, String>, GatewayError> {
    let train_args = hyperparameters
        .get(TRAIN_ARGS_KEY)
        .ok_or(GatewayError::MissingHyperparameter(TRAIN_ARGS_KEY))?;
    let serialized = serde_json::to_string(train_args)?;
    hyperparameters.insert(TRAIN_ARGS_KEY.to_string(), serde_json::Value::String(serialized));

    hyperparameters
        .into_iter()
        .map(|(key, value)| Ok((key, serde_json::to_string(&value)?)))
        .collect()
}

/// Builds the platform request from a submission, pinning the fixed
/// parameters (runtime cap, isolation and spot flags).
pub fn build_request(
    submission: TrainingJobSubmission,
) -> Result<CreateTrainingJobRequest, GatewayError> {
    let hyperparameters = encode_hyperparameters(submission.hyperparameters)?;

    Ok(CreateTrainingJobRequest {
        training_job_name: submission.training_job_name,
        hyperparameters,
        algorithm_specification: submission.algorithm_specification,
        role_arn: submission.role_arn,
        input_data_config: submission.input_data_config,
        output_data_config: submission.output_data_config,
        resource_config: submission.resource_config,
        stopping_condition: StoppingCondition { max_runtime_seconds: MAX_RUNTIME_SECONDS },
        enable_network_isolation: false,
        enable_inter_container_traffic_encryption: false,
        enable_managed_spot_training: false,
        tags: submission.tags,
    })
}

/// Parses the body, builds the platform request, and submits it.
pub async fn submit(state: &AppState, body: &[u8]) -> Result<TrainingJobCreated, GatewayError> {
    let submission: TrainingJobSubmission = serde_json::from_slice(body)?;
    debug!(training_job_name = %submission.training_job_name, "Training job submission received");

    let request = build_request(submission)?;
    let created = state.training.create_training_job(&request).await?;
    info!(
        training_job_name = %request.training_job_name,
        training_job_arn = %created.training_job_arn,
        "Training job created"
    );
    Ok(created)
}

/// `POST /training-jobs`
///
/// Registered for every method; the handler owns the method gate so that
/// non-POST requests get the fixed 400 body instead of a 405.
pub async fn handle_training_jobs(
    State(state): State<AppState>,
    method: Method,
    body: axum::body::Bytes,
) -> Response {
    if method != Method::POST {
        return (StatusCode::BAD_REQUEST, UNSUPPORTED_METHOD_BODY).into_response();
    }

    match submit(&state, &body).await {
        Ok(created) => match serde_json::to_string(&created) {
            Ok(json) => (StatusCode::OK, json).into_response(),
            Err(e) => {
                error!(error = %e, "Failed to serialize training job response");
                (StatusCode::BAD_REQUEST, e.to_string()).into_response()
            }
        },
        Err(e) => {
            error!(error = %e, "Training job submission failed");
            (StatusCode::BAD_REQUEST, e.to_string()).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AsyncInferenceSettings;
    use kiln_abstraction::PlatformError;
    use kiln_platform::{MemoryObjectStore, RecordingTrainingApi, StaticInferenceApi};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn submission_json() -> serde_json::Value {
        serde_json::json!({
            "training_job_name": "sd-train-1",
            "hyperparameters": {
                "a": 1,
                "train-args": {"x": 2}
            },
            "algorithm_specification": {
                "training_image": "platform/sd-training:latest",
                "training_input_mode": "File"
            },
            "role_arn": "arn:platform:role/training",
            "input_data_config": [{"channel_name": "models"}],
            "output_data_config": {"output_location": "s3://bucket/out"},
            "resource_config": {"instance_type": "gpu.xlarge", "instance_count": 1},
            "tags": [{"key": "team", "value": "ml"}]
        })
    }

    fn state_with(training: Arc<RecordingTrainingApi>) -> AppState {
        AppState {
            inference: Arc::new(StaticInferenceApi::synchronous("unused", Vec::new())),
            training,
            storage: Arc::new(MemoryObjectStore::new()),
            async_inference: Arc::new(AsyncInferenceSettings::default()),
        }
    }

    #[test]
    fn test_encode_hyperparameters_double_encodes_train_args() {
        let map = serde_json::json!({"a": 1, "train-args": {"x": 2}});
        let serde_json::Value::Object(map) = map else { unreachable!() };

        let encoded = encode_hyperparameters(map).unwrap();

        let expected = BTreeMap::from([
            ("a".to_string(), "1".to_string()),
            ("train-args".to_string(), "\"{\\\"x\\\":2}\"".to_string()),
        ]);
        assert_eq!(encoded, expected);
    }

    #[test]
    fn test_encode_hyperparameters_string_values_get_quoted() {
        let map = serde_json::json!({"mode": "fast", "train-args": {}});
        let serde_json::Value::Object(map) = map else { unreachable!() };

        let encoded = encode_hyperparameters(map).unwrap();

        // Already-string values are encoded again; accepted, not corrected
        assert_eq!(encoded["mode"], "\"fast\"");
        assert_eq!(encoded["train-args"], "\"{}\"");
    }

    #[test]
    fn test_encode_hyperparameters_requires_train_args() {
        let map = serde_json::json!({"a": 1});
        let serde_json::Value::Object(map) = map else { unreachable!() };

        let err = encode_hyperparameters(map).unwrap_err();
        assert!(err.to_string().contains("train-args"));
    }

    #[tokio::test]
    async fn test_submit_pins_fixed_parameters() {
        let training = Arc::new(RecordingTrainingApi::new("arn:platform:training-job/sd-train-1"));
        let state = state_with(training.clone());
        let body = serde_json::to_vec(&submission_json()).unwrap();

        let created = submit(&state, &body).await.unwrap();
        assert_eq!(created.training_job_arn, "arn:platform:training-job/sd-train-1");

        let submitted = training.submissions();
        assert_eq!(submitted.len(), 1);
        let request = &submitted[0];
        assert_eq!(request.stopping_condition.max_runtime_seconds, 86400);
        assert!(!request.enable_network_isolation);
        assert!(!request.enable_inter_container_traffic_encryption);
        assert!(!request.enable_managed_spot_training);
        assert_eq!(request.hyperparameters["a"], "1");
    }

    #[tokio::test]
    async fn test_submit_missing_field_names_the_field() {
        let state = state_with(Arc::new(RecordingTrainingApi::new("arn:unused")));
        let mut body = submission_json();
        body.as_object_mut().unwrap().remove("role_arn");

        let err = submit(&state, &serde_json::to_vec(&body).unwrap()).await.unwrap_err();
        assert!(err.to_string().contains("role_arn"));
    }

    #[tokio::test]
    async fn test_submit_platform_rejection_surfaces() {
        let training = Arc::new(RecordingTrainingApi::rejecting(PlatformError::ApiError {
            status: 409,
            message: "training job sd-train-1 already exists".to_string(),
        }));
        let state = state_with(training);
        let body = serde_json::to_vec(&submission_json()).unwrap();

        let err = submit(&state, &body).await.unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }
}
