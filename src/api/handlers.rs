use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use super::ApiState;
use crate::error::ScanError;

/// Body of a clean run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutResponse {
    pub success: bool,
    pub triggered: u64,
    pub checked: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

pub(crate) struct ApiErrorResponse {
    status: StatusCode,
    body: Json<ErrorBody>,
}

impl ApiErrorResponse {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            body: Json(ErrorBody {
                error: message.into(),
            }),
        }
    }

    fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthorized")
    }

    fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        (self.status, self.body).into_response()
    }
}

impl From<ScanError> for ApiErrorResponse {
    fn from(e: ScanError) -> Self {
        match e {
            ScanError::AlreadyRunning => Self::conflict("payout scan already in progress"),
            ScanError::PotCount(_) => Self::internal(e.to_string()),
        }
    }
}

pub fn create_api_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/api/cron/payout", get(trigger_payout))
        .route("/health", get(health_check))
        .with_state(state)
}

async fn health_check(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "scan_in_progress": state.orchestrator.is_running(),
        "cache": state.orchestrator.cache_statistics(),
    }))
}

fn is_authorized(state: &ApiState, headers: &HeaderMap) -> bool {
    let Some(secret) = state.cron_secret.as_deref() else {
        return true;
    };
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .is_some_and(|token| secrets_match(token.as_bytes(), secret.as_bytes()))
}

/// Compares every byte regardless of where the first mismatch is. Only the length leaks.
fn secrets_match(presented: &[u8], expected: &[u8]) -> bool {
    presented.len() == expected.len()
        && presented
            .iter()
            .zip(expected)
            .fold(0u8, |diff, (a, b)| diff | (a ^ b))
            == 0
}

#[instrument(skip_all)]
async fn trigger_payout(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
) -> Result<Json<PayoutResponse>, ApiErrorResponse> {
    if !is_authorized(&state, &headers) {
        warn!("Rejected payout trigger with missing or wrong credentials");
        return Err(ApiErrorResponse::unauthorized());
    }

    let result = state.orchestrator.run_now().await.map_err(|e| {
        match &e {
            ScanError::AlreadyRunning => warn!("Payout trigger overlapped a running scan"),
            ScanError::PotCount(_) => error!(error = %e, "Payout scan could not start"),
        }
        ApiErrorResponse::from(e)
    })?;

    if !result.success {
        let message = result
            .error_message
            .unwrap_or_else(|| "payout dispatch failed".to_string());
        return Err(ApiErrorResponse::internal(message));
    }

    info!(
        checked = result.checked_count,
        triggered = result.triggered_count,
        "Payout trigger served"
    );
    Ok(Json(PayoutResponse {
        success: true,
        triggered: result.triggered_count,
        checked: result.checked_count,
    }))
}
