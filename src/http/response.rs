//! Response envelope and error mapping. Every body carries a `success`
//! boolean; failures add `error` and optionally `details`.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;

use crate::error::StoreError;

/// `Cache-Control` for the cacheable catalog reads.
pub const CATALOG_CACHE_CONTROL: &str = "public, s-maxage=60, stale-while-revalidate=120";

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for StoreError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            StoreError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone(), None),
            StoreError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string(), None),
            StoreError::Conflict(msg) => (StatusCode::BAD_REQUEST, msg.clone(), None),
            StoreError::Transient(e) => {
                tracing::error!(error = %e, "database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "database error".to_string(),
                    Some(e.to_string()),
                )
            }
            StoreError::Fatal(msg) => {
                tracing::error!(error = %msg, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string(), None)
            }
        };
        let body = ErrorBody { success: false, error, details };
        (status, Json(body)).into_response()
    }
}

/// 200 with the catalog cache policy attached.
pub fn cached_json<T: Serialize>(body: T) -> Response {
    ([(header::CACHE_CONTROL, CATALOG_CACHE_CONTROL)], Json(body)).into_response()
}
