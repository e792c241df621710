//! API error types for action controllers
//!
//! Every error raised by a hook, a criteria builder step or a model store ends
//! up as an [`ApiError`], which renders as a JSON body with the mapped status:
//!
//! ```json
//! { "message": "Sorting not allowed on given attributes",
//!   "errors": ["username", "invalid"],
//!   "code": "BAD_REQUEST",
//!   "status": 400 }
//! ```
//!
//! # Example
//!
//! ```rust
//! use acton_rest::handlers::{ApiError, ApiErrorKind};
//!
//! let error = ApiError::bad_request("Sorting not allowed on given attributes")
//!     .with_errors(vec!["username".into()]);
//! assert!(matches!(error.kind, ApiErrorKind::BadRequest));
//! assert_eq!(error.errors, vec!["username"]);
//! ```

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::model::{StoreError, StoreErrorKind, StoreOperation};

/// Action being performed when the API error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiOperation {
    /// Listing records
    List,
    /// Reading one record
    Read,
    /// Creating a record
    Create,
    /// Updating a record
    Update,
    /// Deleting a record
    Delete,
}

impl fmt::Display for ApiOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::List => write!(f, "list"),
            Self::Read => write!(f, "read"),
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// Category of API error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiErrorKind {
    /// Invalid request parameters or body
    BadRequest,
    /// Access denied
    Forbidden,
    /// Record was not found
    NotFound,
    /// Internal server error
    InternalError,
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadRequest => write!(f, "bad_request"),
            Self::Forbidden => write!(f, "forbidden"),
            Self::NotFound => write!(f, "not_found"),
            Self::InternalError => write!(f, "internal_error"),
        }
    }
}

impl ApiErrorKind {
    /// Get the HTTP status code for this error kind
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code string for this error kind
    #[must_use]
    pub fn error_code(&self) -> String {
        format!("{}", self).to_uppercase()
    }

    /// Default message for errors raised without one
    #[must_use]
    pub const fn default_message(&self) -> &'static str {
        match self {
            Self::BadRequest => "Bad Request",
            Self::Forbidden => "Forbidden",
            Self::NotFound => "Not Found",
            Self::InternalError => "Internal Server Error",
        }
    }
}

/// Structured API error
///
/// Carries a message, an optional list of sub-errors (for example every
/// rejected sort field) and an optional underlying cause that is logged but
/// never sent to the client.
#[derive(Debug, Clone)]
pub struct ApiError {
    /// The action being performed when the error occurred
    pub operation: ApiOperation,
    /// The category of error
    pub kind: ApiErrorKind,
    /// Human-readable error message
    pub message: String,
    /// Detail entries reported alongside the message
    pub errors: Vec<String>,
    /// Underlying cause
    pub source: Option<Arc<dyn StdError + Send + Sync>>,
}

impl ApiError {
    /// Create a new API error
    pub fn new(operation: ApiOperation, kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
            errors: Vec::new(),
            source: None,
        }
    }

    /// Create a bad request error
    ///
    /// # Example
    ///
    /// ```rust
    /// use acton_rest::handlers::ApiError;
    ///
    /// let error = ApiError::bad_request("Malformed JSON body");
    /// assert_eq!(error.status().as_u16(), 400);
    /// ```
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ApiOperation::List, ApiErrorKind::BadRequest, message)
    }

    /// Create a forbidden error
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ApiOperation::Read, ApiErrorKind::Forbidden, message)
    }

    /// Create a not found error with the default message
    pub fn not_found() -> Self {
        Self::new(
            ApiOperation::Read,
            ApiErrorKind::NotFound,
            ApiErrorKind::NotFound.default_message(),
        )
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ApiOperation::Read, ApiErrorKind::InternalError, message)
    }

    /// Attach detail entries
    #[must_use]
    pub fn with_errors(mut self, errors: Vec<String>) -> Self {
        self.errors = errors;
        self
    }

    /// Attach the underlying cause
    #[must_use]
    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    /// Set the operation that caused the error
    #[must_use]
    pub fn with_operation(mut self, operation: ApiOperation) -> Self {
        self.operation = operation;
        self
    }

    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        self.kind.status_code()
    }

    /// Render the client-facing body without logging
    pub(crate) fn body(&self) -> ApiErrorResponse {
        ApiErrorResponse {
            message: self.message.clone(),
            errors: self.errors.clone(),
            code: self.kind.error_code(),
            status: self.status().as_u16(),
        }
    }

    pub(crate) fn log(&self) {
        let cause = self.source.as_ref().map(|s| s.to_string());
        if self.kind == ApiErrorKind::InternalError {
            tracing::error!(
                operation = %self.operation,
                kind = %self.kind,
                errors = ?self.errors,
                cause = ?cause,
                "API error: {}", self.message
            );
        } else {
            tracing::warn!(
                operation = %self.operation,
                kind = %self.kind,
                errors = ?self.errors,
                cause = ?cause,
                "API error: {}", self.message
            );
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "API {} error during {}: {}",
            self.kind, self.operation, self.message
        )?;
        if !self.errors.is_empty() {
            write!(f, " [{}]", self.errors.join(", "))?;
        }
        Ok(())
    }
}

impl StdError for ApiError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|s| s.as_ref() as &(dyn StdError + 'static))
    }
}

/// Response body for API errors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// Error message
    pub message: String,
    /// Detail entries
    pub errors: Vec<String>,
    /// Upper-case error code, e.g. `NOT_FOUND`
    pub code: String,
    /// HTTP status code
    pub status: u16,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.log();
        (self.status(), Json(self.body())).into_response()
    }
}

fn store_operation_to_api_operation(op: StoreOperation) -> ApiOperation {
    match op {
        StoreOperation::FindAll | StoreOperation::Count => ApiOperation::List,
        StoreOperation::FindOne | StoreOperation::Reload => ApiOperation::Read,
        StoreOperation::Create => ApiOperation::Create,
        StoreOperation::Update => ApiOperation::Update,
        StoreOperation::Destroy => ApiOperation::Delete,
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        let operation = store_operation_to_api_operation(err.operation);

        let kind = match err.kind {
            StoreErrorKind::NotFound => ApiErrorKind::NotFound,
            StoreErrorKind::ConstraintViolation | StoreErrorKind::ValidationFailed => {
                ApiErrorKind::BadRequest
            }
            StoreErrorKind::ConnectionFailed
            | StoreErrorKind::Timeout
            | StoreErrorKind::DatabaseError
            | StoreErrorKind::Other => ApiErrorKind::InternalError,
        };

        // Internal details stay in the cause
        let message = match kind {
            ApiErrorKind::InternalError => "An internal error occurred".to_string(),
            ApiErrorKind::NotFound => kind.default_message().to_string(),
            _ => err.message.clone(),
        };

        Self {
            operation,
            kind,
            message,
            errors: Vec::new(),
            source: Some(Arc::new(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiErrorKind::BadRequest.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiErrorKind::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ApiErrorKind::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiErrorKind::InternalError.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(ApiErrorKind::NotFound.error_code(), "NOT_FOUND");
        assert_eq!(ApiErrorKind::BadRequest.error_code(), "BAD_REQUEST");
    }

    #[test]
    fn test_body_carries_sub_errors() {
        let error = ApiError::bad_request("Sorting not allowed on given attributes")
            .with_errors(vec!["username".into(), "invalid".into()]);
        let body = error.body();
        assert_eq!(body.status, 400);
        assert_eq!(body.errors, vec!["username", "invalid"]);
        assert_eq!(body.code, "BAD_REQUEST");
    }

    #[test]
    fn test_display() {
        let error = ApiError::not_found().with_operation(ApiOperation::Update);
        assert_eq!(error.to_string(), "API not_found error during update: Not Found");
    }

    #[test]
    fn test_from_store_validation_error() {
        let store = StoreError::validation_failed(StoreOperation::Create, "username is required");
        let api: ApiError = store.into();
        assert_eq!(api.kind, ApiErrorKind::BadRequest);
        assert_eq!(api.operation, ApiOperation::Create);
        assert_eq!(api.message, "username is required");
        assert!(api.source.is_some());
    }

    #[test]
    fn test_from_store_error_hides_internal_details() {
        let store = StoreError::database_error(StoreOperation::FindAll, "connection string leaked");
        let api: ApiError = store.into();
        assert_eq!(api.kind, ApiErrorKind::InternalError);
        assert!(!api.message.contains("leaked"));
        assert!(StdError::source(&api)
            .map(|s| s.to_string().contains("leaked"))
            .unwrap_or(false));
    }

    #[test]
    fn test_from_store_not_found() {
        let api: ApiError = StoreError::not_found("users", "3").into();
        assert_eq!(api.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_into_response() {
        let response = ApiError::forbidden("nope").into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: ApiErrorResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.message, "nope");
        assert!(body.errors.is_empty());
    }
}
