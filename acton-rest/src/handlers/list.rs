//! List action: criteria, collection query, `Content-Range`

use async_trait::async_trait;
use axum::http::header::CONTENT_RANGE;
use serde_json::Value;

use super::{Action, ActionKind, ActionScope};
use crate::criteria::{build_list_options, ContentRange};
use crate::model::{QueryOptions, Record};
use crate::pipeline::{Context, Flow, HookResult};

/// `GET` on the collection endpoint
#[derive(Debug, Default, Clone, Copy)]
pub struct ListAction;

#[async_trait]
impl Action for ListAction {
    fn kind(&self) -> ActionKind {
        ActionKind::List
    }

    async fn fetch(&self, scope: &ActionScope, ctx: &mut Context) -> HookResult {
        let options = build_list_options(scope, ctx)?;
        let model = &scope.settings.model;

        // Grouped rows cannot be counted from the same result set.
        let (mut rows, total) = if options.group.is_empty() {
            model.find_and_count(&options).await?
        } else {
            let count_options = QueryOptions {
                criteria: options.criteria.clone(),
                scope: options.scope.clone(),
                transaction: options.transaction.clone(),
                ..QueryOptions::default()
            };
            let rows = model.find_all(&options).await?;
            let total = model.count(&count_options).await?;
            (rows, total)
        };

        for row in &mut rows {
            scope.strip_include_attributes(row);
        }

        let range = ContentRange::new(options.offset.unwrap_or(0), rows.len(), total);
        tracing::debug!(
            resource = scope.settings.name(),
            returned = rows.len(),
            total,
            "Fetched list"
        );
        if scope.settings.pagination {
            ctx.response.set_header(CONTENT_RANGE, &range.to_string());
        }
        ctx.content_range = Some(range);
        ctx.instances = rows;
        Flow::proceed()
    }

    async fn send(&self, _scope: &ActionScope, ctx: &mut Context) -> HookResult {
        let rows = ctx.instances.iter().cloned().map(Record::into_value).collect();
        ctx.response.body = Some(Value::Array(rows));
        Flow::proceed()
    }
}
