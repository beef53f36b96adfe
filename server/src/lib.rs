//! HTTP API for the Keyward licensing server.
//!
//! Routes:
//! - `POST /auth`: check credentials, open a session, offer updates
//! - `POST /trial`: admit an unregistered trial client
//! - `POST /heartbeat`: keep a session alive
//! - `POST /stripe-webhook`: verify and enqueue subscription events
//! - `POST /crash-report`: store a capped crash report
//!
//! Every collaborator is built once in `main` and handed to
//! [`build_router`] through [`AppState`].

mod config;
mod crash;
mod error;
mod routes;

pub use config::{ConfigError, ServerConfig};
pub use crash::{
    cap_crash_report, CrashReport, CrashSink, FsCrashSink, MAX_CRASH_BYTES, MAX_CRASH_LINES,
    MAX_OS_LEN,
};
pub use error::ApiError;
pub use routes::{
    AuthBody, AuthResponse, CrashReportBody, HeartbeatBody, HeartbeatResponse, TrialBody,
};

use axum::{routing::post, Router};
use keyward_auth::{AuthGate, HeartbeatTracker};
use keyward_billing::{QueueHandle, Reconciler};
use std::sync::Arc;

/// Shared handles for request handlers.
#[derive(Clone)]
pub struct AppState {
    pub gate: Arc<AuthGate>,
    pub heartbeats: Arc<HeartbeatTracker>,
    pub reconciler: Arc<Reconciler>,
    pub queue: QueueHandle,
    pub crash_sink: Arc<dyn CrashSink>,
}

/// Build the HTTP API router with the given state.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/auth", post(routes::auth))
        .route("/trial", post(routes::trial))
        .route("/heartbeat", post(routes::heartbeat))
        .route("/stripe-webhook", post(routes::stripe_webhook))
        .route("/crash-report", post(routes::crash_report))
        .with_state(state)
}
