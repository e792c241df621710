//! Action controllers
//!
//! An [`Action`] supplies the core step of each phase; a [`Controller`] pairs
//! an action with its resource scope and the three hookable phases, and runs
//! the fetch, write and send chain for one request.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::Method;
use tracing::Instrument;

use super::{ApiError, ApiErrorKind, ApiOperation, Reply};
use crate::endpoint::Endpoint;
use crate::model::Record;
use crate::pipeline::{ActionState, Context, Flow, HookResult, Phase, PhaseCore, PhaseName, RequestParts};
use crate::resource::ResourceSettings;

/// The five generated actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ActionKind {
    /// `GET` on the collection endpoint
    List,
    /// `GET` on the member endpoint
    Read,
    /// `POST` on the collection endpoint
    Create,
    /// `PUT` or `PATCH` on the member endpoint
    Update,
    /// `DELETE` on the member endpoint
    Delete,
}

/// Whether an action is served on the collection or the member endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Plurality {
    /// Collection endpoint
    Plural,
    /// Member endpoint
    Singular,
}

impl ActionKind {
    /// Every action, in registration order
    pub const ALL: [ActionKind; 5] = [
        Self::List,
        Self::Read,
        Self::Create,
        Self::Update,
        Self::Delete,
    ];

    /// Endpoint the action is served on
    pub const fn plurality(&self) -> Plurality {
        match self {
            Self::List | Self::Create => Plurality::Plural,
            Self::Read | Self::Update | Self::Delete => Plurality::Singular,
        }
    }

    /// HTTP method, given the resource's update method
    pub fn method(&self, update: &Method) -> Method {
        match self {
            Self::List | Self::Read => Method::GET,
            Self::Create => Method::POST,
            Self::Update => update.clone(),
            Self::Delete => Method::DELETE,
        }
    }

    /// Operation reported on errors
    pub const fn operation(&self) -> ApiOperation {
        match self {
            Self::List => ApiOperation::List,
            Self::Read => ApiOperation::Read,
            Self::Create => ApiOperation::Create,
            Self::Update => ApiOperation::Update,
            Self::Delete => ApiOperation::Delete,
        }
    }
}

impl fmt::Display for ActionKind {
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

/// What a controller knows about the resource it serves
#[derive(Debug, Clone)]
pub struct ActionScope {
    /// Resolved resource configuration
    pub settings: Arc<ResourceSettings>,
    /// Endpoint the controller is mounted on
    pub endpoint: Endpoint,
    /// Foreign key columns hidden when `remove_foreign_keys` is set
    pub include_attributes: Vec<String>,
}

impl ActionScope {
    /// Strip `remove_foreign_keys` columns from a record
    pub fn strip_include_attributes(&self, record: &mut Record) {
        if self.settings.association_options.remove_foreign_keys {
            record.strip(&self.include_attributes);
        }
    }
}

/// Core steps of one action
///
/// Every step defaults to doing nothing, except `send`, which emits
/// `ctx.instance` as the JSON body.
#[async_trait]
pub trait Action: Send + Sync {
    /// Which action this is
    fn kind(&self) -> ActionKind;

    /// Load the records the action works on
    async fn fetch(&self, _scope: &ActionScope, _ctx: &mut Context) -> HookResult {
        Flow::proceed()
    }

    /// Persist changes
    async fn write(&self, _scope: &ActionScope, _ctx: &mut Context) -> HookResult {
        Flow::proceed()
    }

    /// Build the response body
    async fn send(&self, _scope: &ActionScope, ctx: &mut Context) -> HookResult {
        let body = ctx
            .instance
            .clone()
            .map(Record::into_value)
            .unwrap_or(serde_json::Value::Null);
        ctx.response.body = Some(body);
        Flow::proceed()
    }
}

/// An action bound to a resource, with its hookable phases
pub struct Controller {
    action: Arc<dyn Action>,
    scope: ActionScope,
    fetch: Phase,
    write: Phase,
    send: Phase,
}

impl Controller {
    /// Bind an action to a resource scope
    pub fn new(action: Arc<dyn Action>, scope: ActionScope) -> Self {
        Self {
            action,
            scope,
            fetch: Phase::new(PhaseName::Fetch),
            write: Phase::new(PhaseName::Write),
            send: Phase::new(PhaseName::Send),
        }
    }

    /// Which action this controller runs
    pub fn kind(&self) -> ActionKind {
        self.action.kind()
    }

    /// Resource scope
    pub fn scope(&self) -> &ActionScope {
        &self.scope
    }

    /// Mutable resource scope, for setup
    pub fn scope_mut(&mut self) -> &mut ActionScope {
        &mut self.scope
    }

    /// Endpoint the controller is mounted on
    pub fn endpoint(&self) -> &Endpoint {
        &self.scope.endpoint
    }

    /// HTTP method the controller answers
    pub fn method(&self) -> Method {
        self.kind()
            .method(&self.scope.settings.update_method.method())
    }

    /// A phase, to inspect its hooks
    pub fn phase(&self, name: PhaseName) -> &Phase {
        match name {
            PhaseName::Fetch => &self.fetch,
            PhaseName::Write => &self.write,
            PhaseName::Send => &self.send,
        }
    }

    /// A phase, to register hooks
    pub fn phase_mut(&mut self, name: PhaseName) -> &mut Phase {
        match name {
            PhaseName::Fetch => &mut self.fetch,
            PhaseName::Write => &mut self.write,
            PhaseName::Send => &mut self.send,
        }
    }

    /// Run the action for a request, turning any error into an error reply
    pub async fn handle(&self, request: RequestParts) -> Reply {
        let span = tracing::debug_span!(
            "action",
            resource = %self.scope.settings.name(),
            action = %self.kind(),
            endpoint = %self.scope.endpoint,
        );
        async move {
            let mut ctx = Context::new(request);
            match self.run(&mut ctx).await {
                Ok(reply) => {
                    tracing::debug!(status = %reply.status, state = %ctx.state, "Action finished");
                    reply
                }
                Err(err) => Reply::from_error(&err.with_operation(self.kind().operation())),
            }
        }
        .instrument(span)
        .await
    }

    /// Run every phase against an existing context
    pub async fn run(&self, ctx: &mut Context) -> Result<Reply, ApiError> {
        for name in PhaseName::ALL {
            ctx.state = match name {
                PhaseName::Fetch => ActionState::Fetching,
                PhaseName::Write => ActionState::Writing,
                PhaseName::Send => ActionState::Sending,
            };

            let outcome = match self.phase(name).run(self, ctx).await {
                Ok(outcome) => outcome,
                Err(err) => {
                    ctx.state = if name == PhaseName::Fetch && err.kind == ApiErrorKind::NotFound {
                        ActionState::NotFound
                    } else {
                        ActionState::Failed
                    };
                    return Err(err);
                }
            };

            if let Some(reply) = outcome {
                ctx.state = ActionState::Completed;
                return Ok(reply);
            }
            if name == PhaseName::Fetch {
                ctx.state = ActionState::Fetched;
            }
        }

        ctx.state = ActionState::Sent;
        Ok(Reply {
            status: ctx.response.status,
            headers: std::mem::take(&mut ctx.response.headers),
            body: ctx.response.body.take(),
        })
    }
}

#[async_trait]
impl PhaseCore for Controller {
    async fn run_core(&self, phase: PhaseName, ctx: &mut Context) -> HookResult {
        match phase {
            PhaseName::Fetch => self.action.fetch(&self.scope, ctx).await,
            PhaseName::Write => self.action.write(&self.scope, ctx).await,
            PhaseName::Send => self.action.send(&self.scope, ctx).await,
        }
    }
}

impl fmt::Debug for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("action", &self.kind())
            .field("endpoint", &self.scope.endpoint.as_str())
            .field("fetch", &self.fetch)
            .field("write", &self.write)
            .field("send", &self.send)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_methods() {
        assert_eq!(ActionKind::List.method(&Method::PUT), Method::GET);
        assert_eq!(ActionKind::Create.method(&Method::PUT), Method::POST);
        assert_eq!(ActionKind::Update.method(&Method::PATCH), Method::PATCH);
        assert_eq!(ActionKind::Delete.method(&Method::PUT), Method::DELETE);
    }

    #[test]
    fn test_plurality() {
        assert_eq!(ActionKind::List.plurality(), Plurality::Plural);
        assert_eq!(ActionKind::Create.plurality(), Plurality::Plural);
        assert_eq!(ActionKind::Read.plurality(), Plurality::Singular);
        assert_eq!(ActionKind::Delete.plurality(), Plurality::Singular);
    }

    #[test]
    fn test_display() {
        let names: Vec<String> = ActionKind::ALL.iter().map(ToString::to_string).collect();
        assert_eq!(names, vec!["list", "read", "create", "update", "delete"]);
    }
}
