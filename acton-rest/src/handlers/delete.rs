//! Delete action

use async_trait::async_trait;
use serde_json::json;

use super::read::fetch_instance;
use super::{Action, ActionKind, ActionScope, ApiError};
use crate::pipeline::{Context, Flow, HookResult};

/// `DELETE` on the member endpoint
///
/// After-hooks of the write phase find the removed record in
/// `ctx.deleted_instance`. The response is `200 {}`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeleteAction;

#[async_trait]
impl Action for DeleteAction {
    fn kind(&self) -> ActionKind {
        ActionKind::Delete
    }

    async fn fetch(&self, scope: &ActionScope, ctx: &mut Context) -> HookResult {
        fetch_instance(scope, ctx).await
    }

    async fn write(&self, scope: &ActionScope, ctx: &mut Context) -> HookResult {
        let Some(instance) = ctx.instance.clone() else {
            return Err(ApiError::not_found());
        };
        scope
            .settings
            .model
            .destroy(&instance, ctx.transaction.as_ref())
            .await?;
        tracing::debug!(resource = scope.settings.name(), "Deleted record");
        ctx.deleted_instance = Some(instance);
        Flow::proceed()
    }

    async fn send(&self, _scope: &ActionScope, ctx: &mut Context) -> HookResult {
        ctx.response.body = Some(json!({}));
        Flow::proceed()
    }
}
