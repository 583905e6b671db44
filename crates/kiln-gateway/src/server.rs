//! Server module for the Kiln gateway.
//!
//! Builds the platform clients from configuration, wires them into the
//! router state, and serves the two gateway routes.

use axum::routing::any;
use axum::Router;
use kiln_abstraction::{InferenceApi, ObjectStore, TrainingApi};
use kiln_platform::{HttpInferenceClient, HttpObjectStore, HttpTrainingClient};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::{AsyncInferenceSettings, Config};
use crate::error::Result;
use crate::{inference, training};

/// Shared handler state: platform client handles injected at startup.
///
/// Every invocation is stateless; the handles are the only thing shared
/// between requests, and they are read-only.
#[derive(Clone)]
pub struct AppState {
    pub inference: Arc<dyn InferenceApi>,
    pub training: Arc<dyn TrainingApi>,
    pub storage: Arc<dyn ObjectStore>,
    pub async_inference: Arc<AsyncInferenceSettings>,
}

impl AppState {
    /// Builds HTTP-backed state from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a platform client cannot be constructed.
    pub fn from_config(config: &Config) -> Result<Self> {
        let platform = &config.platform;

        let inference_client = match &platform.api_key {
            Some(key) => HttpInferenceClient::with_api_key(
                platform.inference_url.clone(),
                key.clone(),
            )?,
            None => HttpInferenceClient::new(platform.inference_url.clone())?,
        };
        let training_client = match &platform.api_key {
            Some(key) => {
                HttpTrainingClient::with_api_key(platform.training_url.clone(), key.clone())
            }
            None => HttpTrainingClient::new(platform.training_url.clone()),
        };
        let storage_client = match &platform.api_key {
            Some(key) => HttpObjectStore::with_api_key(platform.storage_url.clone(), key.clone()),
            None => HttpObjectStore::new(platform.storage_url.clone()),
        };

        Ok(Self {
            inference: Arc::new(inference_client),
            training: Arc::new(training_client),
            storage: Arc::new(storage_client),
            async_inference: Arc::new(config.async_inference.clone()),
        })
    }
}

/// Builds the gateway router.
///
/// Routes are registered for every HTTP method; the handlers gate on POST
/// themselves and answer non-POST requests with the fixed 400 body.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/invocations", any(inference::handle_invocations))
        .route("/training-jobs", any(training::handle_training_jobs))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the Kiln gateway HTTP server.
///
/// # Errors
///
/// Returns an error if a client cannot be built or the server fails to
/// bind to the configured address.
pub async fn run(config: &Config) -> Result<()> {
    let state = AppState::from_config(config)?;
    let app = router(state);

    let addr = config.server.address;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        %addr,
        inference_url = %config.platform.inference_url,
        bucket = %config.async_inference.bucket,
        "Kiln gateway started"
    );
    axum::serve(listener, app).await?;

    Ok(())
}
