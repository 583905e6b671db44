//! Kiln Gateway
//!
//! HTTP front door for the managed ML platform:
//! - `/invocations` dispatches a payload to a deployed endpoint,
//!   synchronously or asynchronously depending on how the endpoint is
//!   configured
//! - `/training-jobs` creates platform training jobs from a JSON
//!   description
//!
//! Platform clients are constructed once at startup and injected into the
//! handlers; see `server::AppState`.

pub mod config;
pub mod error;
pub mod inference;
pub mod server;
pub mod training;

pub use config::Config;
pub use error::{GatewayError, Result};
