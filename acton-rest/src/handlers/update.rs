//! Update action: read's fetch, then merge, resolve foreign keys and save

use async_trait::async_trait;
use serde_json::Value;

use super::create::reload_options;
use super::read::fetch_instance;
use super::{Action, ActionKind, ActionScope, ApiError};
use crate::criteria::coerce_path_value;
use crate::model::{AssociationKind, Record};
use crate::pipeline::{Context, Flow, HookResult};

/// `PUT` or `PATCH` on the member endpoint
#[derive(Debug, Default, Clone, Copy)]
pub struct UpdateAction;

#[async_trait]
impl Action for UpdateAction {
    fn kind(&self) -> ActionKind {
        ActionKind::Update
    }

    async fn fetch(&self, scope: &ActionScope, ctx: &mut Context) -> HookResult {
        fetch_instance(scope, ctx).await
    }

    async fn write(&self, scope: &ActionScope, ctx: &mut Context) -> HookResult {
        let settings = &scope.settings;
        let model = &settings.model;
        let Some(instance) = ctx.instance.clone() else {
            return Err(ApiError::not_found());
        };

        let body = ctx.request.body_object();
        ctx.attributes.merge_defaults(&body);

        for attribute in scope.endpoint.attributes() {
            if let Some(raw) = ctx.request.params.get(attribute) {
                let field_type = model.field(attribute).map(|f| f.field_type);
                ctx.attributes
                    .insert(attribute.clone(), coerce_path_value(raw, field_type));
            }
        }

        if !settings.include.is_empty() {
            for association in &settings.associations_info {
                let key = match ctx.attributes.get(&association.alias) {
                    Some(Value::Object(target)) => target.get(&association.target_key).cloned(),
                    Some(Value::Null) => Some(Value::Null),
                    _ => None,
                };
                if let Some(key) = key {
                    ctx.attributes.insert(association.foreign_key.clone(), key);
                }
            }
        }

        let changes: Record = ctx
            .attributes
            .iter()
            .filter(|(k, _)| model.has_field(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect::<serde_json::Map<_, _>>()
            .into();

        let foreign_keys: Vec<&str> = settings
            .associations_info
            .iter()
            .filter(|a| a.kind == AssociationKind::BelongsTo)
            .map(|a| a.foreign_key.as_str())
            .collect();
        let reload_after = settings.reload_instances
            && changes
                .iter()
                .any(|(k, v)| foreign_keys.contains(&k.as_str()) && instance.get(k) != Some(v));

        let mut saved = model
            .update(&instance, changes, ctx.transaction.as_ref())
            .await?;
        if reload_after {
            saved = model.reload(&saved, &reload_options(settings, ctx)).await?;
        }

        saved.strip(&settings.exclude_attributes);
        if settings.association_options.remove_foreign_keys {
            for association in &settings.associations_info {
                saved.remove(&association.foreign_key);
            }
        }

        tracing::debug!(resource = settings.name(), reloaded = reload_after, "Updated record");
        ctx.instance = Some(saved);
        Flow::proceed()
    }
}
