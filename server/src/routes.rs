//! Request handlers.

use crate::crash::{cap_crash_report, CrashReport, MAX_OS_LEN};
use crate::error::ApiError;
use crate::AppState;
use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use keyward_auth::{AuthOutcome, AuthRequest, UpdateInfo};
use keyward_types::{AuthResult, Platform, SessionId, Version};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

const EMAIL_HEADER: &str = "x-email";
const LICENSE_KEY_HEADER: &str = "x-license-key";
const SIGNATURE_HEADER: &str = "stripe-signature";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthBody {
    pub email: String,
    pub license_key: String,
    pub os: Platform,
    pub current_version: Version,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    pub result: AuthResult,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub session_id: Option<SessionId>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub locked_version: Option<Version>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub update: Option<UpdateInfo>,
}

impl From<AuthOutcome> for AuthResponse {
    fn from(outcome: AuthOutcome) -> Self {
        Self {
            result: outcome.result,
            success: outcome.result.is_success(),
            session_id: outcome.session_id,
            locked_version: outcome.locked_version,
            update: outcome.update,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialBody {
    pub os: Platform,
    pub current_version: Version,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatBody {
    pub session_id: SessionId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartbeatResponse {
    pub ok: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrashReportBody {
    pub content: String,
    pub os: String,
    pub version: Version,
}

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

pub(crate) async fn auth(
    State(state): State<AppState>,
    body: Result<Json<AuthBody>, JsonRejection>,
) -> Result<Json<AuthResponse>, ApiError> {
    let body = json_body(body)?;
    let request = AuthRequest {
        email: body.email,
        license_key: body.license_key,
        os: body.os,
        version: body.current_version,
    };

    let outcome = state.gate.authenticate(&request)?;
    Ok(Json(AuthResponse::from(outcome)))
}

pub(crate) async fn trial(
    State(state): State<AppState>,
    body: Result<Json<TrialBody>, JsonRejection>,
) -> Result<Json<AuthResponse>, ApiError> {
    let body = json_body(body)?;
    let outcome = state.gate.trial(body.os, body.current_version)?;
    Ok(Json(AuthResponse::from(outcome)))
}

pub(crate) async fn heartbeat(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<HeartbeatBody>, JsonRejection>,
) -> Result<Json<HeartbeatResponse>, ApiError> {
    let body = json_body(body)?;
    let (Some(email), Some(key)) = (
        header(&headers, EMAIL_HEADER),
        header(&headers, LICENSE_KEY_HEADER),
    ) else {
        return Err(ApiError::InvalidSession);
    };

    let user = state
        .gate
        .verify_credentials(email, key)?
        .ok_or(ApiError::InvalidSession)?;
    state.heartbeats.heartbeat(body.session_id, user.id)?;
    Ok(Json(HeartbeatResponse { ok: true }))
}

/// Verifies and enqueues. Reconciliation happens on the queue worker, so
/// the provider gets its answer without waiting on the customer lookup.
pub(crate) async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let signature = header(&headers, SIGNATURE_HEADER).ok_or(ApiError::InvalidSignature)?;

    let event = match state.reconciler.receive(&body, signature) {
        Ok(Some(event)) => event,
        Ok(None) => return Ok(StatusCode::OK),
        Err(e) => {
            warn!("rejected webhook delivery: {e}");
            return Err(e.into());
        }
    };

    let event_id = event.event_id.clone();
    state.queue.try_enqueue(event).map_err(|e| {
        warn!(event_id = %event_id, "cannot enqueue webhook event: {e}");
        ApiError::from(e)
    })?;
    debug!(event_id = %event_id, "webhook event queued");
    Ok(StatusCode::OK)
}

pub(crate) async fn crash_report(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<CrashReportBody>, JsonRejection>,
) -> Result<Json<bool>, ApiError> {
    let body = json_body(body)?;
    if body.os.len() > MAX_OS_LEN {
        return Err(ApiError::BadRequest("invalid os".to_string()));
    }
    let os: Platform = body
        .os
        .parse()
        .map_err(|_| ApiError::BadRequest("invalid os".to_string()))?;

    // Credentials are optional here; a bad pair just leaves the report anonymous.
    let email = match (
        header(&headers, EMAIL_HEADER),
        header(&headers, LICENSE_KEY_HEADER),
    ) {
        (Some(email), Some(key)) => match state.gate.verify_credentials(email, key) {
            Ok(user) => user.map(|u| u.email),
            Err(e) => {
                warn!("crash report credential check failed: {e}");
                None
            }
        },
        _ => None,
    };

    let content = cap_crash_report(&body.content);
    if content.len() < body.content.len() {
        info!(
            received = body.content.len(),
            kept = content.len(),
            "crash report truncated"
        );
    }

    let report = CrashReport {
        content: content.to_string(),
        os,
        version: body.version,
        email,
    };
    state
        .crash_sink
        .store(&report)
        .await
        .map_err(|e| ApiError::Internal(format!("storing crash report: {e}")))?;
    Ok(Json(true))
}
