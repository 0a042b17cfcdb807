// ABOUTME: The {code, message, data} response envelope and the API error type.
// ABOUTME: Maps storage and extractor failures onto envelope or {"detail"} responses with the right status.

use axum::Json;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use blogd_store::StoreError;
use serde::Serialize;
use thiserror::Error;

/// Successful response body: `{"code": 0, "message": "success", "data": ...}`.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub code: i32,
    pub message: String,
    pub data: T,
}

impl<T: Serialize> Envelope<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: 0,
            message: "success".to_string(),
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// Failures a handler can report.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Unsupported(String),

    #[error("{0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<Envelope<T>, ApiError>;

impl ApiError {
    pub fn not_found(what: impl std::fmt::Display) -> Self {
        ApiError::NotFound(format!("{} not found", what))
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            StoreError::InvalidInput(msg) => ApiError::InvalidInput(msg),
            StoreError::Unsupported { .. } => ApiError::Unsupported(err.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidInput(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::InvalidInput(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::InvalidInput(rejection.body_text())
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        ApiError::InvalidInput(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::InvalidInput(err.body_text())
    }
}

fn detail(status: StatusCode, message: String) -> Response {
    (status, Json(serde_json::json!({ "detail": message }))).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            // Missing records keep HTTP 200 and report through the envelope code.
            ApiError::NotFound(message) => Json(Envelope {
                code: 404,
                message,
                data: serde_json::Value::Null,
            })
            .into_response(),
            ApiError::Unauthorized(message) => detail(StatusCode::UNAUTHORIZED, message),
            ApiError::InvalidInput(message) => detail(StatusCode::BAD_REQUEST, message),
            ApiError::Unsupported(message) => detail(StatusCode::NOT_IMPLEMENTED, message),
            ApiError::Internal(message) => {
                tracing::error!("request failed: {}", message);
                detail(StatusCode::INTERNAL_SERVER_ERROR, message)
            }
        }
    }
}

/// Reject blank required string fields.
pub fn require(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::InvalidInput(format!("{} is required", field)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use blogd_core::Collection;

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn success_envelope_shape() {
        let resp = Envelope::success(serde_json::json!({ "id": 1 })).into_response();
        assert_eq!(resp.status(), StatusCode::OK);

        let json = body_json(resp).await;
        assert_eq!(json["code"], 0);
        assert_eq!(json["message"], "success");
        assert_eq!(json["data"]["id"], 1);
    }

    #[tokio::test]
    async fn not_found_is_http_200_with_code_404() {
        let err: ApiError = StoreError::NotFound {
            collection: Collection::Posts,
            id: 3,
        }
        .into();
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::OK);

        let json = body_json(resp).await;
        assert_eq!(json["code"], 404);
        assert_eq!(json["message"], "post 3 not found");
        assert!(json["data"].is_null());
    }

    #[tokio::test]
    async fn store_errors_map_to_statuses() {
        let cases = [
            (
                ApiError::from(StoreError::InvalidInput("bad".to_string())),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::from(StoreError::Unsupported {
                    operation: "update",
                    collection: Collection::Replies,
                }),
                StatusCode::NOT_IMPLEMENTED,
            ),
            (
                ApiError::from(StoreError::Poisoned(Collection::Posts)),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ApiError::Unauthorized("no".to_string()),
                StatusCode::UNAUTHORIZED,
            ),
        ];

        for (err, status) in cases {
            let resp = err.into_response();
            assert_eq!(resp.status(), status);
            let json = body_json(resp).await;
            assert!(json["detail"].is_string());
        }
    }

    #[test]
    fn require_rejects_blank_strings() {
        assert!(require("title", "T").is_ok());
        assert!(matches!(require("title", ""), Err(ApiError::InvalidInput(_))));
        assert!(matches!(require("title", "   "), Err(ApiError::InvalidInput(_))));
    }
}
