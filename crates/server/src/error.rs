//! API error type that maps [`LetterboxError`] variants to HTTP status codes.

use axum::{
    Json,
    extract::{FromRequest, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use letterbox_types::LetterboxError;
use serde_json::json;

/// Wrapper around [`LetterboxError`] that implements [`IntoResponse`].
#[derive(Debug)]
pub struct ApiError(pub LetterboxError);

impl ApiError {
    /// Returns `(status, error_type, error_code)` for the wrapped error.
    fn classify(&self) -> (StatusCode, &'static str, &'static str) {
        match &self.0 {
            LetterboxError::InvalidCredential(_) => (
                StatusCode::UNAUTHORIZED,
                "authentication_error",
                "invalid_credential",
            ),
            LetterboxError::ExpiredCredential => (
                StatusCode::UNAUTHORIZED,
                "authentication_error",
                "credential_expired",
            ),
            LetterboxError::ReauthRequired(_) => (
                StatusCode::UNAUTHORIZED,
                "authentication_error",
                "reauth_required",
            ),
            LetterboxError::Forbidden(_) => {
                (StatusCode::FORBIDDEN, "permission_error", "forbidden")
            }
            LetterboxError::InsufficientScope(_) => (
                StatusCode::FORBIDDEN,
                "permission_error",
                "insufficient_scope",
            ),
            LetterboxError::NotFound(_) => {
                (StatusCode::NOT_FOUND, "invalid_request_error", "not_found")
            }
            LetterboxError::Validation(_) => (
                StatusCode::BAD_REQUEST,
                "invalid_request_error",
                "validation_error",
            ),
            LetterboxError::NotConnected => (
                StatusCode::BAD_REQUEST,
                "invalid_request_error",
                "drive_not_connected",
            ),
            LetterboxError::StorageUnavailable(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "server_error",
                "storage_unavailable",
            ),
            LetterboxError::ExportFailed(_) => {
                (StatusCode::BAD_GATEWAY, "server_error", "export_failed")
            }
            LetterboxError::Upstream { .. } | LetterboxError::Http(_) => {
                (StatusCode::BAD_GATEWAY, "server_error", "upstream_error")
            }
            LetterboxError::CodeExchangeFailed(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "server_error",
                "code_exchange_failed",
            ),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "server_error",
                "internal_error",
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, error_code) = self.classify();
        if status.is_server_error() {
            tracing::error!(error = %self.0, code = error_code, "request failed");
        }
        let msg = self.0.to_string();
        (
            status,
            Json(json!({
                "error": {
                    "message": msg,
                    "type": error_type,
                    "code": error_code,
                }
            })),
        )
            .into_response()
    }
}

impl From<LetterboxError> for ApiError {
    fn from(e: LetterboxError) -> Self {
        Self(e)
    }
}

/// A malformed or missing JSON body is a validation failure.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(LetterboxError::Validation(rejection.body_text()))
    }
}

/// JSON request body whose rejections use the API error envelope.
#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt as _;

    async fn extract_error_body(err: ApiError) -> (StatusCode, serde_json::Value) {
        let resp = err.into_response();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        (status, body)
    }

    #[tokio::test]
    async fn test_invalid_credential() {
        let (status, body) =
            extract_error_body(ApiError(LetterboxError::InvalidCredential("bad".into()))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["type"], "authentication_error");
        assert_eq!(body["error"]["code"], "invalid_credential");
    }

    #[tokio::test]
    async fn test_expired_credential() {
        let (status, body) = extract_error_body(ApiError(LetterboxError::ExpiredCredential)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "credential_expired");
    }

    #[tokio::test]
    async fn test_reauth_required() {
        let (status, body) =
            extract_error_body(ApiError(LetterboxError::ReauthRequired("x".into()))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "reauth_required");
    }

    #[tokio::test]
    async fn test_forbidden_and_not_found_are_distinct() {
        let (forbidden, _) =
            extract_error_body(ApiError(LetterboxError::Forbidden("d1".into()))).await;
        let (missing, _) =
            extract_error_body(ApiError(LetterboxError::NotFound("d1".into()))).await;
        assert_eq!(forbidden, StatusCode::FORBIDDEN);
        assert_eq!(missing, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_insufficient_scope() {
        let (status, body) =
            extract_error_body(ApiError(LetterboxError::InsufficientScope("drive".into()))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["type"], "permission_error");
        assert_eq!(body["error"]["code"], "insufficient_scope");
    }

    #[tokio::test]
    async fn test_not_connected_is_bad_request() {
        let (status, body) = extract_error_body(ApiError(LetterboxError::NotConnected)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "drive_not_connected");
    }

    #[tokio::test]
    async fn test_validation_error() {
        let (status, body) =
            extract_error_body(ApiError(LetterboxError::Validation("title".into()))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["type"], "invalid_request_error");
        assert!(body["error"]["message"].as_str().unwrap().contains("title"));
    }

    #[tokio::test]
    async fn test_storage_unavailable() {
        let (status, body) =
            extract_error_body(ApiError(LetterboxError::StorageUnavailable("db".into()))).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"]["code"], "storage_unavailable");
    }

    #[tokio::test]
    async fn test_upstream_errors_are_bad_gateway() {
        let (status, _) = extract_error_body(ApiError(LetterboxError::Upstream {
            status: 500,
            body: "server error".into(),
        }))
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        let (status, body) =
            extract_error_body(ApiError(LetterboxError::ExportFailed("quota".into()))).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"]["code"], "export_failed");
    }

    #[tokio::test]
    async fn test_code_exchange_failure_is_internal() {
        let (status, body) =
            extract_error_body(ApiError(LetterboxError::CodeExchangeFailed("bad".into()))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["code"], "code_exchange_failed");
    }

    #[tokio::test]
    async fn test_internal_error() {
        let (status, body) =
            extract_error_body(ApiError(LetterboxError::Config("bad config".into()))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["type"], "server_error");
        assert_eq!(body["error"]["code"], "internal_error");
    }
}
