use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CardError {
    /// A credential or identifier is missing. Raised before any network I/O.
    #[error("{0}")]
    Configuration(String),

    /// A request is missing a required field or carries malformed content.
    #[error("{0}")]
    Validation(String),

    /// An upstream service answered with a failure.
    #[error("{0}")]
    Provider(String),

    /// The card could not be recorded in the table store.
    #[error("{0}")]
    Persistence(String),

    /// The table store could not be reached at all.
    #[error("Database connection error: {0}")]
    StoreUnreachable(String),

    #[error("image error: {0}")]
    Image(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CardError>;

impl CardError {
    pub fn status(&self) -> StatusCode {
        match self {
            CardError::Validation(_) | CardError::Image(_) => StatusCode::BAD_REQUEST,
            CardError::Configuration(_)
            | CardError::Provider(_)
            | CardError::Persistence(_)
            | CardError::StoreUnreachable(_)
            | CardError::Http(_)
            | CardError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub fn json_error(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

impl IntoResponse for CardError {
    fn into_response(self) -> Response {
        json_error(self.status(), &self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_side_errors_map_to_bad_request() {
        assert_eq!(
            CardError::Validation("Missing required fields".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            CardError::Image("unsupported".into()).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn service_errors_map_to_server_error() {
        for err in [
            CardError::Configuration("Missing RESEND_API_KEY".into()),
            CardError::Provider("domain not verified".into()),
            CardError::Persistence("insert failed".into()),
        ] {
            assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    #[test]
    fn display_carries_the_bare_message() {
        let err = CardError::Provider("domain not verified".into());
        assert_eq!(err.to_string(), "domain not verified");
    }
}
