//! Health check handler

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};

use super::super::state::AppState;
use super::super::types::{ApiResponse, HealthData, error_codes};

const VERSION: &str = "1.0.0";

/// Health check endpoint
///
/// The ledger decides the verdict. The broker is reported but never fails
/// the check, since transfers commit without it.
///
/// - Healthy: 200 OK + {code: 0, data}
/// - Unhealthy: 503 Service Unavailable + {code: 5001, data}
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<ApiResponse<HealthData>>) {
    let db_up = match state.ledger.health_check().await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(error = %e, "Health check: database down");
            false
        }
    };

    let broker = if !state.publisher.is_enabled() {
        "disabled"
    } else if state.publisher.health_check().await {
        "up"
    } else {
        "down"
    };

    let data = HealthData {
        status: if db_up { "healthy" } else { "unhealthy" },
        database: if db_up { "up" } else { "down" },
        broker,
        version: VERSION,
    };

    if db_up {
        (StatusCode::OK, Json(ApiResponse::success(data)))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiResponse {
                code: error_codes::SERVICE_UNAVAILABLE,
                msg: "unavailable".to_string(),
                data: Some(data),
            }),
        )
    }
}
