//! Create action: merge payload, resolve associations, insert, `201 Location`

use async_trait::async_trait;
use axum::http::{header::LOCATION, StatusCode};
use serde_json::Value;

use super::{Action, ActionKind, ActionScope};
use crate::model::{AssociationKind, Projection, QueryOptions, Record, WriteOptions};
use crate::pipeline::{Context, Flow, HookResult};
use crate::resource::ResourceSettings;

/// `POST` on the collection endpoint
#[derive(Debug, Default, Clone, Copy)]
pub struct CreateAction;

/// Overwrite `extra` keys on every object nested anywhere inside `value`
fn inject_all(value: &mut Value, extra: &Record) {
    match value {
        Value::Object(map) => {
            for (key, v) in extra.iter() {
                map.insert(key.clone(), v.clone());
            }
            for (key, nested) in map.iter_mut() {
                if !extra.contains_key(key) && (nested.is_object() || nested.is_array()) {
                    inject_all(nested, extra);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                inject_all(item, extra);
            }
        }
        _ => {}
    }
}

/// Overwrite `extra` keys on a child object, or on each object of a child array
fn inject_children(value: &mut Value, extra: &Record) {
    let apply = |map: &mut serde_json::Map<String, Value>| {
        for (key, v) in extra.iter() {
            map.insert(key.clone(), v.clone());
        }
    };
    match value {
        Value::Object(map) => apply(map),
        Value::Array(items) => {
            for item in items.iter_mut() {
                if let Value::Object(map) = item {
                    apply(map);
                }
            }
        }
        _ => {}
    }
}

/// Inject context values into the association payloads of `attributes`
pub(crate) fn inject_association_values(
    settings: &ResourceSettings,
    attributes: &mut Record,
    add_to_all: &Record,
    add_to_children: &Record,
) {
    if add_to_all.is_empty() && add_to_children.is_empty() {
        return;
    }
    for association in &settings.associations_info {
        let Some(payload) = attributes.get_mut(&association.alias) else {
            continue;
        };
        if !add_to_all.is_empty() {
            inject_all(payload, add_to_all);
        }
        if !add_to_children.is_empty() {
            inject_children(payload, add_to_children);
        }
    }
}

/// Replace belongs-to payloads carrying a primary key with a foreign key assignment
fn resolve_parent_keys(settings: &ResourceSettings, attributes: &mut Record) {
    for association in &settings.associations_info {
        if association.kind != AssociationKind::BelongsTo {
            continue;
        }
        let key = match attributes.get(&association.alias) {
            Some(Value::Object(parent)) => parent.get(&association.target_key).cloned(),
            _ => None,
        };
        if let Some(key) = key {
            attributes.insert(association.foreign_key.clone(), key);
            attributes.remove(&association.alias);
        }
    }
}

/// Options for re-reading a written record
pub(crate) fn reload_options(settings: &ResourceSettings, ctx: &Context) -> QueryOptions {
    QueryOptions {
        include: if ctx.shallow {
            Vec::new()
        } else {
            settings.include.clone()
        },
        attributes: (!settings.exclude_attributes.is_empty())
            .then(|| Projection::Exclude(settings.exclude_attributes.clone())),
        transaction: ctx.transaction.clone(),
        ..QueryOptions::default()
    }
}

#[async_trait]
impl Action for CreateAction {
    fn kind(&self) -> ActionKind {
        ActionKind::Create
    }

    async fn write(&self, scope: &ActionScope, ctx: &mut Context) -> HookResult {
        let settings = &scope.settings;

        let body = ctx.request.body_object();
        ctx.attributes.merge_defaults(&body);

        if !settings.include.is_empty() {
            let (add_to_all, add_to_children) = (ctx.add_to_all.clone(), ctx.add_to_children.clone());
            inject_association_values(settings, &mut ctx.attributes, &add_to_all, &add_to_children);
            resolve_parent_keys(settings, &mut ctx.attributes);
        }

        let write_options = WriteOptions {
            include: if ctx.shallow {
                Vec::new()
            } else {
                settings.include.clone()
            },
            transaction: ctx.transaction.clone(),
        };
        let mut instance = settings
            .model
            .create(ctx.attributes.clone(), &write_options)
            .await?;

        let location = settings.endpoints.singular.substitute(&instance);
        ctx.response.set_header(LOCATION, &location);

        if settings.reload_instances {
            instance = settings
                .model
                .reload(&instance, &reload_options(settings, ctx))
                .await?;
        }
        instance.strip(&settings.exclude_attributes);

        tracing::debug!(resource = settings.name(), location = %location, "Created record");
        ctx.response.status = StatusCode::CREATED;
        ctx.instance = Some(instance);
        Flow::proceed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn extra() -> Record {
        Record::new().with("app_version", "1.1.2")
    }

    #[test]
    fn test_inject_children_overrides_and_stays_shallow() {
        let mut notes = json!([
            {"note": "a"},
            {"note": "b", "app_version": "0.2.4", "tags": [{"name": "t"}]}
        ]);
        inject_children(&mut notes, &extra());
        assert_eq!(notes[0]["app_version"], json!("1.1.2"));
        assert_eq!(notes[1]["app_version"], json!("1.1.2"));
        assert!(notes[1]["tags"][0].get("app_version").is_none());
    }

    #[test]
    fn test_inject_all_reaches_nested_objects() {
        let mut payload = json!({"note": "b", "tags": [{"name": "t"}]});
        inject_all(&mut payload, &extra());
        assert_eq!(payload["app_version"], json!("1.1.2"));
        assert_eq!(payload["tags"][0]["app_version"], json!("1.1.2"));
    }
}
