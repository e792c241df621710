//! Response type produced by action controllers

use axum::{
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;

use super::ApiError;

/// A finished response: status, headers and an optional JSON body
#[derive(Debug, Clone)]
pub struct Reply {
    /// Status code
    pub status: StatusCode,
    /// Headers
    pub headers: HeaderMap,
    /// JSON body; `None` sends an empty body
    pub body: Option<Value>,
}

impl Reply {
    /// A JSON reply without extra headers
    pub fn json(status: StatusCode, body: Value) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Some(body),
        }
    }

    /// A reply with no body
    pub fn empty(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// The reply for a failed action; logs the error
    pub fn from_error(error: &ApiError) -> Self {
        error.log();
        let body = serde_json::to_value(error.body()).unwrap_or(Value::Null);
        Self::json(error.status(), body)
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        let mut response = match self.body {
            Some(body) => (self.status, Json(body)).into_response(),
            None => self.status.into_response(),
        };
        response.headers_mut().extend(self.headers);
        response
    }
}
