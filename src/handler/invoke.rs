use super::{HEADER_FUNCTION_ARN, HEADER_REQUEST_ID};
use crate::{
    app::AppState, context::InvocationContext, event::Event, runtime::ErrorReport, version,
};
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/invoke", post(invoke_handler))
        .route("/health", get(health_handler))
}

/// Runs one event through the dispatcher, the way the SIP media application
/// would through the Lambda runtime.
pub async fn invoke_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(event): Json<Event>,
) -> Response {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string())
    };
    let request_id = header(HEADER_REQUEST_ID).unwrap_or_else(|| Uuid::new_v4().to_string());
    let ctx = InvocationContext::new(
        request_id.clone(),
        header(HEADER_FUNCTION_ARN).unwrap_or_default(),
    );

    let start_time = Instant::now();
    match state.dispatcher.dispatch(&event, &ctx) {
        Ok(response) => {
            info!(
                request_id = %request_id,
                elapsed = start_time.elapsed().as_millis() as u64,
                "invocation completed"
            );
            Json(response).into_response()
        }
        Err(e) => {
            warn!(request_id = %request_id, error_type = e.kind(), "invocation failed: {}", e);
            (
                StatusCode::BAD_REQUEST,
                Json(ErrorReport {
                    error_type: e.kind().to_string(),
                    error_message: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

pub async fn health_handler() -> Response {
    Json(serde_json::json!({
        "status": "ok",
        "version": version::get_short_version(),
    }))
    .into_response()
}
