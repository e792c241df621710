//! Per-request state threaded through every phase of an action

use std::collections::BTreeMap;
use std::fmt;

use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use serde_json::{Map, Value};

use crate::criteria::ContentRange;
use crate::model::{Criteria, Include, QueryOptions, Record, Transaction};

/// The parts of an HTTP request an action reads
#[derive(Debug, Clone)]
pub struct RequestParts {
    /// HTTP method
    pub method: Method,
    /// Path parameters keyed by placeholder name
    pub params: BTreeMap<String, String>,
    /// Query string parameters; the last occurrence of a key wins
    pub query: BTreeMap<String, String>,
    /// Parsed JSON body, `{}` when the request had none
    pub body: Value,
    /// Request headers
    pub headers: HeaderMap,
}

impl RequestParts {
    /// A bodiless request
    pub fn new(method: Method) -> Self {
        Self {
            method,
            params: BTreeMap::new(),
            query: BTreeMap::new(),
            body: Value::Object(Map::new()),
            headers: HeaderMap::new(),
        }
    }

    /// Add a path parameter
    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Add a query parameter
    #[must_use]
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    /// Set the JSON body
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    /// The body as an object, or an empty map when it is any other JSON value
    pub fn body_object(&self) -> Map<String, Value> {
        match &self.body {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        }
    }
}

/// Status, headers and body accumulated for the response
#[derive(Debug, Clone)]
pub struct ResponseParts {
    /// Status code, 200 unless an action or hook changes it
    pub status: StatusCode,
    /// Headers to send
    pub headers: HeaderMap,
    /// Body produced by the send phase
    pub body: Option<Value>,
}

impl Default for ResponseParts {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: None,
        }
    }
}

impl ResponseParts {
    /// Set a header, ignoring values that are not valid header text
    pub fn set_header(&mut self, name: HeaderName, value: &str) {
        match HeaderValue::from_str(value) {
            Ok(value) => {
                self.headers.insert(name, value);
            }
            Err(e) => tracing::warn!(header = %name, error = %e, "Dropping invalid header value"),
        }
    }
}

/// Where an action invocation is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ActionState {
    /// Created, no phase started
    #[default]
    Pending,
    /// Running the fetch phase
    Fetching,
    /// Fetch finished
    Fetched,
    /// Fetch found nothing
    NotFound,
    /// Running the write phase
    Writing,
    /// Running the send phase
    Sending,
    /// Response emitted by the send phase
    Sent,
    /// A hook produced the response early
    Completed,
    /// An error aborted the chain
    Failed,
}

impl fmt::Display for ActionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Fetching => write!(f, "fetching"),
            Self::Fetched => write!(f, "fetched"),
            Self::NotFound => write!(f, "not_found"),
            Self::Writing => write!(f, "writing"),
            Self::Sending => write!(f, "sending"),
            Self::Sent => write!(f, "sent"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Mutable state owned by one request
///
/// Hooks may pre-seed any of the optional inputs (`count`, `offset`, `page`,
/// `criteria`, `options`, `include`, `attributes`, `shallow`, `add_to_all`,
/// `add_to_children`, `transaction`) before the core step of a phase reads them.
#[derive(Debug)]
pub struct Context {
    /// The incoming request
    pub request: RequestParts,
    /// Pending create/update payload; values set here win over the request body
    pub attributes: Record,
    /// Where-clause fragments merged into the query
    pub criteria: Criteria,
    /// Base query options; builders start from a copy of these
    pub options: QueryOptions,
    /// Extra includes appended after the resource defaults
    pub include: Vec<Include>,
    /// Suppress nested data unless named in the `children` query parameter
    pub shallow: bool,
    /// Page size override
    pub count: Option<i64>,
    /// Offset override
    pub offset: Option<i64>,
    /// Page number override
    pub page: Option<i64>,
    /// Single fetched or produced record
    pub instance: Option<Record>,
    /// Records fetched by a list
    pub instances: Vec<Record>,
    /// Record removed by a delete
    pub deleted_instance: Option<Record>,
    /// Store transaction shared by the writes of this request
    pub transaction: Option<Transaction>,
    /// Values injected into every nested object of a create payload
    pub add_to_all: Record,
    /// Values injected into first-level child objects of a create payload
    pub add_to_children: Record,
    /// Range reported by a list
    pub content_range: Option<ContentRange>,
    /// Response being assembled
    pub response: ResponseParts,
    /// Lifecycle position
    pub state: ActionState,
}

impl Context {
    /// Fresh context for a request
    pub fn new(request: RequestParts) -> Self {
        Self {
            request,
            attributes: Record::new(),
            criteria: Criteria::new(),
            options: QueryOptions::default(),
            include: Vec::new(),
            shallow: false,
            count: None,
            offset: None,
            page: None,
            instance: None,
            instances: Vec::new(),
            deleted_instance: None,
            transaction: None,
            add_to_all: Record::new(),
            add_to_children: Record::new(),
            content_range: None,
            response: ResponseParts::default(),
            state: ActionState::Pending,
        }
    }

    /// A query parameter
    pub fn query(&self, name: &str) -> Option<&str> {
        self.request.query.get(name).map(String::as_str)
    }

    /// A path parameter
    pub fn param(&self, name: &str) -> Option<&str> {
        self.request.params.get(name).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_builder() {
        let request = RequestParts::new(Method::GET)
            .with_param("id", "1")
            .with_query("sort", "-name")
            .with_body(json!({"name": "x"}));
        let ctx = Context::new(request);
        assert_eq!(ctx.param("id"), Some("1"));
        assert_eq!(ctx.query("sort"), Some("-name"));
        assert_eq!(ctx.request.body_object().len(), 1);
        assert_eq!(ctx.state, ActionState::Pending);
    }

    #[test]
    fn test_non_object_body_reads_as_empty() {
        let request = RequestParts::new(Method::POST).with_body(json!([1, 2]));
        assert!(request.body_object().is_empty());
    }

    #[test]
    fn test_invalid_header_value_is_dropped() {
        let mut response = ResponseParts::default();
        response.set_header(axum::http::header::LOCATION, "/users/1");
        response.set_header(axum::http::header::CONTENT_RANGE, "bad\nvalue");
        assert!(response.headers.contains_key(axum::http::header::LOCATION));
        assert!(!response.headers.contains_key(axum::http::header::CONTENT_RANGE));
    }
}
