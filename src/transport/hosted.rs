use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{HeaderValue, Method, StatusCode, header},
    middleware::map_response,
    response::{IntoResponse, Response},
    routing::any,
};
use tracing::warn;

use crate::email::EmailDispatcher;
use crate::error::json_error;
use crate::transport::{MAX_BODY_BYTES, SEND_EMAIL_PATH};

const ALLOWED_METHODS: &str = "GET,OPTIONS,PATCH,DELETE,POST,PUT";
const ALLOWED_HEADERS: &str = "X-CSRF-Token, X-Requested-With, Accept, Accept-Version, Content-Length, Content-MD5, Content-Type, Date, X-Api-Version";

/// Serverless framing: a single handler sees every method and sets its own
/// CORS headers. A successful send answers with the provider payload as is.
///
/// The header layer wraps the body limit so extractor rejections such as 413
/// carry CORS headers too.
pub fn router(dispatcher: EmailDispatcher) -> Router {
    Router::new()
        .route(SEND_EMAIL_PATH, any(send_email))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(map_response(apply_cors_headers))
        .with_state(dispatcher)
}

async fn send_email(
    State(dispatcher): State<EmailDispatcher>,
    method: Method,
    body: Bytes,
) -> Response {
    if method == Method::OPTIONS {
        StatusCode::OK.into_response()
    } else if method != Method::POST {
        json_error(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed")
    } else {
        match dispatcher.dispatch(&body).await {
            Ok(payload) => (StatusCode::OK, Json(payload)).into_response(),
            Err(err) => {
                warn!(status = %err.status(), error = %err, "send-email rejected");
                err.into_response()
            }
        }
    }
}

async fn apply_cors_headers(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
        HeaderValue::from_static("true"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOWED_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOWED_HEADERS),
    );
    response
}
