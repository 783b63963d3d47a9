//! Error types and HTTP error response handling.
//!
//! This module defines the application error and how it is converted
//! into HTTP responses with appropriate status codes and JSON bodies.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::{partner::bank::PartnerError, shared::IdError, storage::StorageError};

/// Application-wide error type.
///
/// # Error Categories
///
/// - **Database Errors**: Any sqlx::Error; `RowNotFound` is treated as a 404
/// - **Authentication Errors**: Invalid or missing API keys
/// - **Resource Errors**: Requested entity not found or deleted
/// - **Business Logic Errors**: Conflicting state, insufficient balance
/// - **Validation Errors**: Malformed IDs, bodies, or field values
/// - **Collaborator Errors**: Partner bank or document storage failures
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid API key")]
    InvalidApiKey,

    /// The named entity does not exist or has been soft deleted.
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Insufficient balance")]
    InsufficientBalance,

    #[error("Invalid request")]
    InvalidRequest(String),

    /// The request is valid but clashes with the entity's current state.
    #[error("Conflict")]
    Conflict(String),

    #[error("Partner bank error: {0}")]
    Partner(#[from] PartnerError),

    #[error("Document storage error: {0}")]
    Storage(#[from] StorageError),
}

impl AppError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }
}

impl From<IdError> for AppError {
    fn from(err: IdError) -> Self {
        Self::InvalidRequest(err.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

/// Convert AppError into an HTTP response.
///
/// All errors return JSON in this format:
/// ```json
/// {
///   "error": {
///     "code": "error_type",
///     "message": "Human-readable error message"
///   }
/// }
/// ```
///
/// Server-side failures are logged here and their details hidden from the client.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::InvalidApiKey => (
                StatusCode::UNAUTHORIZED,
                "invalid_api_key",
                self.to_string(),
            ),
            AppError::NotFound(_) | AppError::Database(sqlx::Error::RowNotFound) => {
                (StatusCode::NOT_FOUND, "not_found", self.not_found_message())
            }
            AppError::InsufficientBalance => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "insufficient_balance",
                self.to_string(),
            ),
            AppError::InvalidRequest(ref msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", msg.clone())
            }
            AppError::Conflict(ref msg) => (StatusCode::CONFLICT, "conflict", msg.clone()),
            AppError::Partner(ref err) => {
                tracing::error!(error = %err, "Partner bank call failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "partner_error",
                    "The partner bank request failed".to_string(),
                )
            }
            AppError::Database(ref err) => {
                tracing::error!(error = %err, "Database operation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
            AppError::Storage(ref err) => {
                tracing::error!(error = %err, "Document storage call failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

impl AppError {
    fn not_found_message(&self) -> String {
        match self {
            AppError::NotFound(_) => self.to_string(),
            _ => "Resource not found".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use rstest::rstest;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[rstest]
    #[case(AppError::NotFound("Business"), StatusCode::NOT_FOUND, "not_found")]
    #[case(AppError::Database(sqlx::Error::RowNotFound), StatusCode::NOT_FOUND, "not_found")]
    #[case(AppError::invalid("bad"), StatusCode::BAD_REQUEST, "invalid_request")]
    #[case(AppError::InvalidApiKey, StatusCode::UNAUTHORIZED, "invalid_api_key")]
    #[case(AppError::Conflict("paid".into()), StatusCode::CONFLICT, "conflict")]
    #[case(AppError::InsufficientBalance, StatusCode::UNPROCESSABLE_ENTITY, "insufficient_balance")]
    #[case(AppError::Database(sqlx::Error::PoolTimedOut), StatusCode::INTERNAL_SERVER_ERROR, "internal_error")]
    #[tokio::test]
    async fn maps_variants_to_status(
        #[case] error: AppError,
        #[case] status: StatusCode,
        #[case] code: &str,
    ) {
        let response = error.into_response();
        assert_eq!(response.status(), status);
        assert_eq!(body_json(response).await["error"]["code"], code);
    }

    #[tokio::test]
    async fn internal_errors_hide_details() {
        let response = AppError::Database(sqlx::Error::PoolTimedOut).into_response();
        let body = body_json(response).await;
        assert_eq!(body["error"]["message"], "An internal error occurred");
    }

    #[tokio::test]
    async fn not_found_names_the_entity() {
        let body = body_json(AppError::NotFound("Invoice").into_response()).await;
        assert_eq!(body["error"]["message"], "Invoice not found");
    }

    #[test]
    fn id_errors_become_bad_requests() {
        let err: AppError = "con-00000000-0000-0000-0000-000000000000"
            .parse::<crate::shared::BusinessId>()
            .unwrap_err()
            .into();
        assert!(matches!(err, AppError::InvalidRequest(_)));
    }
}
