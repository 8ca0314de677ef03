use crate::{ApiResponse, AppState};
use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::{json, Value};
use std::time::Instant;

/// Readiness: the service is up and the database answers
pub async fn health_check(
    State(state): State<AppState>,
) -> (StatusCode, Json<ApiResponse<Value>>) {
    let start = Instant::now();
    let db_result = crate::db::check_connection(&state.db).await;
    let latency_ms = start.elapsed().as_millis() as u64;

    let (status, database) = match db_result {
        Ok(()) => (StatusCode::OK, json!({ "status": "up", "latency_ms": latency_ms })),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            json!({ "status": "down", "error": e.to_string() }),
        ),
    };

    (
        status,
        Json(ApiResponse::success(json!({
            "status": if status == StatusCode::OK { "ready" } else { "not_ready" },
            "version": env!("CARGO_PKG_VERSION"),
            "environment": state.config.environment,
            "checks": { "database": database },
        }))),
    )
}
