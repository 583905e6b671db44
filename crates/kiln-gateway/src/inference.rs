//! Inference dispatcher.
//!
//! Routes an inbound payload to a deployed endpoint after querying the
//! endpoint's configured mode:
//!
//! - **Synchronous** endpoints get the decoded payload directly and the
//!   platform's complete response body comes back inline.
//! - **Asynchronous** endpoints get the original payload staged into
//!   object storage under a unique key; the response body is the
//!   platform-reported output location.
//!
//! Any failure along the way is logged and surfaced as status 400 with
//! the error's display string.

use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use std::collections::HashMap;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::error::{GatewayError, UNSUPPORTED_METHOD_BODY};
use crate::server::AppState;

/// Content type that marks a payload as JSON text rather than base64.
const JSON_CONTENT_TYPE: &str = "application/json";

/// Result of a dispatched invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Complete response body from a synchronous endpoint.
    Inline(Vec<u8>),
    /// Output location reported for an asynchronous submission.
    OutputLocation(String),
}

/// Decodes the inbound payload according to its content type.
///
/// Only an exact `application/json` content type passes the payload
/// through as-is. Anything else, including an absent header, takes the
/// base64 branch — observed behavior the callers rely on, kept as-is.
fn decode_payload(content_type: Option<&str>, payload: &[u8]) -> Result<Vec<u8>, GatewayError> {
    if content_type == Some(JSON_CONTENT_TYPE) {
        return Ok(payload.to_vec());
    }

    let text = std::str::from_utf8(payload)
        .map_err(|e| GatewayError::InvalidPayload(format!("payload is not valid UTF-8: {}", e)))?;
    BASE64
        .decode(text.trim())
        .map_err(|e| GatewayError::InvalidPayload(format!("invalid base64 payload: {}", e)))
}

/// Dispatches one invocation to `endpoint_name`.
///
/// The asynchronous path stages the **original** payload (not the decoded
/// bytes) and never deletes the staged object.
pub async fn dispatch(
    state: &AppState,
    endpoint_name: &str,
    content_type: Option<&str>,
    payload: &[u8],
) -> Result<DispatchOutcome, GatewayError> {
    let body = decode_payload(content_type, payload)?;

    let description = state.inference.describe_endpoint(endpoint_name).await?;

    if !description.is_async() {
        debug!(endpoint_name = %endpoint_name, "Dispatching synchronous invocation");
        let response = state
            .inference
            .invoke_endpoint(endpoint_name, content_type, body)
            .await?;
        return Ok(DispatchOutcome::Inline(response));
    }

    let settings = &state.async_inference;
    let key = format!("{}{}.json", settings.input_prefix, Uuid::new_v4());
    state.storage.put_object(&settings.bucket, &key, payload.to_vec()).await?;

    let input_location = format!("s3://{}/{}", settings.bucket, key);
    info!(
        endpoint_name = %endpoint_name,
        input_location = %input_location,
        "Staged payload for asynchronous invocation"
    );

    let receipt = state
        .inference
        .invoke_endpoint_async(endpoint_name, JSON_CONTENT_TYPE, &input_location)
        .await?;
    Ok(DispatchOutcome::OutputLocation(receipt.output_location))
}

/// `POST /invocations?endpoint_name=...`
///
/// Registered for every method; the handler owns the method gate so that
/// non-POST requests get the fixed 400 body instead of a 405.
pub async fn handle_invocations(
    State(state): State<AppState>,
    method: Method,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Response {
    if method != Method::POST {
        return (StatusCode::BAD_REQUEST, UNSUPPORTED_METHOD_BODY).into_response();
    }

    debug!(?params, header_count = headers.len(), "Inference request received");

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    let result = match params.get("endpoint_name") {
        Some(endpoint_name) => {
            dispatch(&state, endpoint_name, content_type.as_deref(), &body).await
        }
        None => Err(GatewayError::MissingQueryParam("endpoint_name")),
    };

    match result {
        Ok(DispatchOutcome::Inline(bytes)) => (StatusCode::OK, bytes).into_response(),
        Ok(DispatchOutcome::OutputLocation(location)) => {
            (StatusCode::OK, location).into_response()
        }
        Err(e) => {
            error!(error = %e, "Inference dispatch failed");
            (StatusCode::BAD_REQUEST, e.to_string()).into_response()
        }
    }
}
