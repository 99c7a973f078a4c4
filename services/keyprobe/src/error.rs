//! HTTP error responses

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// A key-pool lookup failure rendered as a JSON body.
///
/// Unknown providers and empty tiers are both "nothing here" to a caller, so
/// both map to 404.
#[derive(Debug)]
pub struct ApiError(pub key_pool::Error);

impl From<key_pool::Error> for ApiError {
    fn from(err: key_pool::Error) -> Self {
        Self(err)
    }
}

impl ApiError {
    fn kind(&self) -> &'static str {
        match self.0 {
            key_pool::Error::UnknownProvider(_) => "unknown_provider",
            key_pool::Error::NotFound { .. } => "not_found",
            key_pool::Error::Store(_) => "store_error",
        }
    }

    fn status(&self) -> StatusCode {
        match self.0 {
            key_pool::Error::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": {
                "type": self.kind(),
                "message": self.0.to_string(),
            }
        });
        (self.status(), Json(body)).into_response()
    }
}
