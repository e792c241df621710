//! Mounting controllers on an axum [`Router`]

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    body::to_bytes,
    extract::{FromRequestParts, Path, Query, Request},
    http::Method,
    response::{IntoResponse, Response},
    routing::{MethodFilter, MethodRouter},
    Router,
};
use serde_json::{Map, Value};

use crate::handlers::{ApiError, Controller, Reply};
use crate::pipeline::RequestParts;

/// One controller ready to be mounted
#[derive(Debug, Clone)]
pub(crate) struct Route {
    pub(crate) method: Method,
    pub(crate) controller: Arc<Controller>,
}

impl Route {
    pub(crate) fn new(controller: Controller) -> Self {
        Self {
            method: controller.method(),
            controller: Arc::new(controller),
        }
    }
}

/// Group routes by path and mount them
///
/// The first route registered for a path and method wins; later duplicates
/// are dropped with a warning.
pub(crate) fn build(routes: Vec<Route>) -> Router {
    let mut by_path: BTreeMap<String, Vec<Route>> = BTreeMap::new();
    for route in routes {
        let path = route.controller.endpoint().route_path();
        let mounted = by_path.entry(path.clone()).or_default();
        if mounted.iter().any(|r| r.method == route.method) {
            tracing::warn!(
                method = %route.method,
                path = %route.controller.endpoint(),
                resource = route.controller.scope().settings.name(),
                "Route already registered, skipping"
            );
            continue;
        }
        mounted.push(route);
    }

    let mut router = Router::new();
    for (path, routes) in by_path {
        let mut method_router: MethodRouter = MethodRouter::new();
        for route in routes {
            let Ok(filter) = MethodFilter::try_from(route.method.clone()) else {
                tracing::warn!(method = %route.method, path = %path, "Unsupported method, skipping");
                continue;
            };
            tracing::info!(
                method = %route.method,
                path = %route.controller.endpoint(),
                resource = route.controller.scope().settings.name(),
                action = %route.controller.kind(),
                "Registered route"
            );
            let controller = route.controller;
            method_router = method_router.on(filter, move |request: Request| {
                let controller = controller.clone();
                async move { dispatch(controller, request).await }
            });
        }
        router = router.route(&path, method_router);
    }
    router
}

fn reject(controller: &Controller, error: ApiError) -> Response {
    Reply::from_error(&error.with_operation(controller.kind().operation())).into_response()
}

/// Translate an HTTP request into [`RequestParts`] and run the controller
async fn dispatch(controller: Arc<Controller>, request: Request) -> Response {
    let (mut parts, body) = request.into_parts();
    let endpoint = controller.endpoint();

    let captures = if endpoint.has_placeholders() {
        match Path::<Vec<(String, String)>>::from_request_parts(&mut parts, &()).await {
            Ok(Path(captures)) => captures,
            Err(rejection) => {
                return reject(&controller, ApiError::bad_request(rejection.body_text()));
            }
        }
    } else {
        Vec::new()
    };
    let Some(params) = endpoint.bind(&captures) else {
        return reject(&controller, ApiError::not_found());
    };

    let query = match Query::<BTreeMap<String, String>>::try_from_uri(&parts.uri) {
        Ok(Query(query)) => query,
        Err(rejection) => {
            return reject(&controller, ApiError::bad_request(rejection.body_text()));
        }
    };

    let bytes = match to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            return reject(
                &controller,
                ApiError::bad_request("Failed to read request body").with_source(e),
            );
        }
    };
    let body = if bytes.iter().all(u8::is_ascii_whitespace) {
        Value::Object(Map::new())
    } else {
        match serde_json::from_slice(&bytes) {
            Ok(body) => body,
            Err(e) => {
                return reject(&controller, ApiError::bad_request("Invalid JSON body").with_source(e));
            }
        }
    };

    let request = RequestParts {
        method: parts.method,
        params,
        query,
        body,
        headers: parts.headers,
    };
    controller.handle(request).await.into_response()
}
