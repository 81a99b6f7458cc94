use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tracing::warn;

use crate::email::EmailDispatcher;
use crate::transport::{MAX_BODY_BYTES, SEND_EMAIL_PATH};

/// Long-running server framing: only POST is routed, the CORS layer answers
/// preflight, and a successful send answers `{ success, data }`.
pub fn router(dispatcher: EmailDispatcher) -> Router {
    Router::new()
        .route(SEND_EMAIL_PATH, post(send_email))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .with_state(dispatcher)
}

async fn send_email(State(dispatcher): State<EmailDispatcher>, body: Bytes) -> Response {
    match dispatcher.dispatch(&body).await {
        Ok(data) => (StatusCode::OK, Json(json!({ "success": true, "data": data }))).into_response(),
        Err(err) => {
            warn!(status = %err.status(), error = %err, "send-email rejected");
            err.into_response()
        }
    }
}
