//! Crate-level error type for setup and serving
//!
//! Request-time failures are [`ApiError`]s rendered by the action controllers.
//! [`Error`] covers everything around them: loading configuration, registering
//! hooks, binding the listener, and store errors raised outside a request.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::handlers::{ActionKind, ApiError, ApiErrorResponse};
use crate::model::StoreError;

/// Result type alias using the crate error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the crate
///
/// Large error variants are boxed to reduce stack size
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(Box<figment::Error>),

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(Box<axum::http::Error>),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error raised by an action
    #[error("{0}")]
    Api(ApiError),

    /// Error raised by a model store
    #[error("{0}")]
    Store(StoreError),

    /// A hook was registered on an action the resource does not serve
    #[error("Action '{action}' is not enabled on resource '{resource}'")]
    ActionDisabled {
        /// Model name of the resource
        resource: String,
        /// The disabled action
        action: ActionKind,
    },

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::Api(e) => e.into_response(),
            Error::Store(e) => ApiError::from(e).into_response(),
            Error::Http(e) => {
                let status = StatusCode::BAD_REQUEST;
                let body = ApiErrorResponse {
                    message: e.to_string(),
                    errors: Vec::new(),
                    code: "HTTP_ERROR".to_string(),
                    status: status.as_u16(),
                };
                (status, Json(body)).into_response()
            }
            other => {
                tracing::error!("Internal error: {}", other);
                let status = StatusCode::INTERNAL_SERVER_ERROR;
                let body = ApiErrorResponse {
                    message: "Internal server error".to_string(),
                    errors: Vec::new(),
                    code: "INTERNAL_ERROR".to_string(),
                    status: status.as_u16(),
                };
                (status, Json(body)).into_response()
            }
        }
    }
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Error::Config(Box::new(err))
    }
}

impl From<axum::http::Error> for Error {
    fn from(err: axum::http::Error) -> Self {
        Error::Http(Box::new(err))
    }
}

impl From<ApiError> for Error {
    fn from(err: ApiError) -> Self {
        Error::Api(err)
    }
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        Error::Store(err)
    }
}
