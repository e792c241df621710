//! # acton-rest
//!
//! Declarative REST resources on top of axum. Point a [`Resource`] at a
//! [`Model`](model::Model) and it serves list, read, create, update and delete
//! endpoints, with filtering, free-text search, sorting, pagination and
//! association loading driven by the query string.
//!
//! ## Features
//!
//! - **Generated endpoints**: `GET /users`, `GET /users/:id`, `POST /users`,
//!   `PUT /users/:id`, `DELETE /users/:id`
//! - **Hookable phases**: every action runs `fetch`, `write` and `send`, each
//!   with before and after hooks that can continue, skip or complete a request
//! - **Criteria builder**: `?q=`, `?sort=-id,name`, `?count=&offset=`,
//!   `?page=`, field equality and `?tasks.name=` dot-path filters
//! - **Associations**: includes, shallow mode with `?children=`, and nested
//!   sub-resources such as `/users/:user_id/tasks`
//! - **Configuration**: figment layering of files and `ACTON_REST_*` variables
//! - **Observability**: JSON structured logging with tracing
//! - **Graceful shutdown**: proper signal handling (SIGTERM, SIGINT)
//!
//! ## Example
//!
//! ```rust,no_run
//! use acton_rest::prelude::*;
//! use acton_rest::memory::{MemoryDb, ModelDef};
//! use acton_rest::model::FieldType;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::load()?;
//!     init_tracing(&config)?;
//!
//!     let db = MemoryDb::new();
//!     db.define(
//!         ModelDef::new("users")
//!             .field("id", FieldType::Integer)
//!             .field("username", FieldType::String),
//!     );
//!
//!     let mut users = Resource::new(
//!         db.model("users"),
//!         ResourceOptions::from_defaults(&config.resources),
//!     );
//!     users.before(ActionKind::List, PhaseName::Fetch, sync_hook(|ctx| {
//!         ctx.count = Some(20);
//!         Flow::proceed()
//!     }))?;
//!
//!     let app = Api::new().resource(users).into_router();
//!     Server::new(config).serve(app).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod criteria;
pub mod endpoint;
pub mod error;
pub mod handlers;
pub mod model;
pub mod observability;
pub mod pipeline;
pub mod resource;
pub mod server;

#[cfg(feature = "memory")]
pub mod memory;

pub use config::Config;
pub use endpoint::Endpoint;
pub use error::{Error, Result};
pub use resource::{Api, Resource, ResourceOptions};
pub use server::Server;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{Config, ResourceDefaults, ServiceConfig};
    pub use crate::endpoint::Endpoint;
    pub use crate::error::{Error, Result};
    pub use crate::handlers::{ActionKind, ApiError, Reply};
    pub use crate::model::{
        Association, AssociationKind, Criteria, Field, FieldType, Include, IncludeNode, Model,
        Operator, Projection, QueryOptions, Record, StoreError,
    };
    pub use crate::observability::init_tracing;
    pub use crate::pipeline::{
        hook, sync_hook, Context, Flow, Hook, HookPosition, HookResult, PhaseName,
    };
    pub use crate::resource::{
        Api, Resource, ResourceOptions, SearchSpec, SortSpec, UpdateMethod,
    };
    pub use crate::server::Server;

    pub use axum::{routing::get, Router};
}
