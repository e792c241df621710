//! Read action: one record addressed by path parameters

use async_trait::async_trait;

use super::{Action, ActionKind, ActionScope, ApiError};
use crate::criteria::build_read_options;
use crate::pipeline::{Context, Flow, HookResult};

/// `GET` on the member endpoint
#[derive(Debug, Default, Clone, Copy)]
pub struct ReadAction;

/// Load the single record addressed by the request into `ctx.instance`
///
/// Shared by read, update and delete.
pub(crate) async fn fetch_instance(scope: &ActionScope, ctx: &mut Context) -> HookResult {
    let options = build_read_options(scope, ctx);
    let found = scope.settings.model.find_one(&options).await?;
    let Some(instance) = found else {
        tracing::debug!(resource = scope.settings.name(), params = ?ctx.request.params, "No matching record");
        return Err(ApiError::not_found());
    };
    ctx.instance = Some(instance);
    Flow::proceed()
}

#[async_trait]
impl Action for ReadAction {
    fn kind(&self) -> ActionKind {
        ActionKind::Read
    }

    async fn fetch(&self, scope: &ActionScope, ctx: &mut Context) -> HookResult {
        fetch_instance(scope, ctx).await
    }
}
