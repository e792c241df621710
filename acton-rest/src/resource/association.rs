//! Sub-resources derived from model associations
//!
//! | kind | endpoints | actions | relationship filter |
//! |---|---|---|---|
//! | has-many | `{plural}/:fk/{name}`, `{plural}/:fk/{name}/:pk` | list, read | `fk` equality |
//! | belongs-to, has-one | `{singular}/{name}` | read | key taken from the parent row |
//! | belongs-to-many | `{singular}/{name}`, `{plural}/:other_key/{name}/:pk` | list, read | include of the paired association |
//!
//! A belongs-to-many association is only exposed when the target declares the
//! reverse association.

use std::sync::Arc;

use serde_json::Value;

use super::{Resource, ResourceOptions, ResourceSettings};
use crate::criteria::coerce_path_value;
use crate::handlers::{ActionKind, ApiError};
use crate::model::{
    Association, AssociationKind, Criteria, Include, IncludeNode, Model, QueryOptions,
};
use crate::pipeline::{hook, sync_hook, Flow, PhaseName};

/// Name a sub-resource is registered under
///
/// The alias when set, otherwise the target's singular name for single-record
/// associations and its plural name for collections.
pub fn sub_resource_name(association: &Association) -> String {
    if !association.alias.is_empty() {
        return association.alias.clone();
    }
    if association.kind.is_single() {
        association.target.singular_name()
    } else {
        association.target.plural_name()
    }
}

/// Build the sub-resource for one association of `parent`
///
/// Returns `None` for a belongs-to-many association without a reverse side.
pub(crate) fn expand(
    parent: &ResourceSettings,
    options: &ResourceOptions,
    association: &Association,
) -> Option<Resource> {
    let name = sub_resource_name(association);
    match association.kind {
        AssociationKind::HasMany => Some(has_many(parent, options, association, &name)),
        AssociationKind::BelongsTo | AssociationKind::HasOne => {
            Some(single(parent, options, association, &name))
        }
        AssociationKind::BelongsToMany => belongs_to_many(parent, options, association, &name),
    }
}

/// Options shared by every sub-resource of `options`
fn sub_options(
    options: &ResourceOptions,
    name: &str,
    endpoints: (String, String),
    actions: &[ActionKind],
) -> ResourceOptions {
    let mut sub = ResourceOptions::new()
        .with_endpoints(endpoints.0, endpoints.1)
        .with_actions(actions.iter().copied())
        .with_exclude_attributes(options.association_options.excluded_for(name).iter().cloned())
        .with_pagination(options.pagination)
        .with_default_count(options.default_count)
        .with_update_method(options.update_method)
        .with_reload_instances(options.reload_instances);
    sub.association_options = options.association_options.clone();
    sub
}

fn join(base: &str, rest: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), rest)
}

fn has_many(
    parent: &ResourceSettings,
    options: &ResourceOptions,
    association: &Association,
    name: &str,
) -> Resource {
    let segment = name.to_lowercase();
    let fk = association.foreign_key.clone();
    let plural = join(parent.endpoints.plural.as_str(), &format!(":{fk}/{segment}"));
    let singular = format!("{plural}/:{}", association.target.primary_key());

    let mut resource = Resource::new(
        association.target.clone(),
        sub_options(options, name, (plural, singular), &[ActionKind::Read, ActionKind::List]),
    );
    resource.set_include_attributes(&[fk.clone()]);

    let target = association.target.clone();
    if let Some(list) = resource.controller_mut(ActionKind::List) {
        list.phase_mut(PhaseName::Fetch).before(sync_hook(move |ctx| {
            if let Some(raw) = ctx.param(&fk) {
                let field_type = target.field(&fk).map(|f| f.field_type);
                let value = coerce_path_value(raw, field_type);
                ctx.criteria.set(fk.clone(), value);
            }
            Flow::proceed()
        }));
    }
    resource
}

fn single(
    parent: &ResourceSettings,
    options: &ResourceOptions,
    association: &Association,
    name: &str,
) -> Resource {
    let endpoint = join(parent.endpoints.singular.as_str(), &name.to_lowercase());
    let mut resource = Resource::new(
        association.target.clone(),
        sub_options(options, name, (endpoint.clone(), endpoint), &[ActionKind::Read]),
    );
    resource.set_include_attributes(&[association.foreign_key.clone()]);

    let owner_model = parent.model.clone();
    let owner_attributes: Arc<[String]> = parent.endpoints.singular.attributes().into();
    let association = Arc::new(association.clone());

    if let Some(read) = resource.controller_mut(ActionKind::Read) {
        let link = association.clone();
        read.phase_mut(PhaseName::Fetch).before(hook(move |ctx| {
            let owner_model = owner_model.clone();
            let owner_attributes = owner_attributes.clone();
            let link = link.clone();
            Box::pin(async move {
                // The path identifies the parent row, not the target
                let mut criteria = Criteria::new();
                for attribute in owner_attributes.iter() {
                    if let Some(raw) = ctx.request.params.remove(attribute) {
                        let field_type = owner_model.field(attribute).map(|f| f.field_type);
                        criteria.set(attribute.clone(), coerce_path_value(&raw, field_type));
                    }
                }
                let query = QueryOptions {
                    criteria,
                    transaction: ctx.transaction.clone(),
                    ..QueryOptions::default()
                };
                let Some(owner) = owner_model.find_one(&query).await? else {
                    return Err(ApiError::not_found());
                };

                let (column, key) = if link.kind == AssociationKind::BelongsTo {
                    (&link.target_key, owner.get(&link.foreign_key))
                } else {
                    (&link.foreign_key, owner.get(&link.source_key))
                };
                let key = key.cloned().unwrap_or(Value::Null);
                if key.is_null() {
                    return Err(ApiError::not_found());
                }
                ctx.criteria.set(column.clone(), key);
                Flow::proceed()
            })
        }));

        if options.association_options.remove_foreign_keys {
            let fk = association.foreign_key.clone();
            read.phase_mut(PhaseName::Send).before(sync_hook(move |ctx| {
                if let Some(instance) = ctx.instance.as_mut() {
                    instance.remove(&fk);
                }
                Flow::proceed()
            }));
        }
    }
    resource
}

fn belongs_to_many(
    parent: &ResourceSettings,
    options: &ResourceOptions,
    association: &Association,
    name: &str,
) -> Option<Resource> {
    let Some(paired) = association.find_paired() else {
        tracing::debug!(
            resource = parent.name(),
            association = %association.alias,
            "No reverse association, skipping sub-resource"
        );
        return None;
    };
    let Some(paired_key) = paired.other_key.clone() else {
        tracing::debug!(
            resource = parent.name(),
            association = %association.alias,
            "Reverse association has no junction key, skipping sub-resource"
        );
        return None;
    };

    let segment = name.to_lowercase();
    let plural = join(parent.endpoints.singular.as_str(), &segment);
    let singular = join(
        parent.endpoints.plural.as_str(),
        &format!(":{paired_key}/{segment}/:{}", association.target.primary_key()),
    );
    let mut resource = Resource::new(
        association.target.clone(),
        sub_options(options, name, (plural, singular), &[ActionKind::Read, ActionKind::List]),
    );

    let paired = Arc::new(paired);
    let source_key = association.source_key.clone();
    let owner_attributes: Vec<String> = parent.endpoints.singular.attributes().to_vec();

    if let Some(read) = resource.controller_mut(ActionKind::Read) {
        let link = paired.clone();
        let column = source_key.clone();
        read.phase_mut(PhaseName::Fetch).before(sync_hook(move |ctx| {
            if let Some(raw) = ctx.request.params.remove(&paired_key) {
                ctx.include.push(paired_include(&link, &column, &raw));
            }
            Flow::proceed()
        }));

        let alias = paired.alias.clone();
        read.phase_mut(PhaseName::Send).before(sync_hook(move |ctx| {
            if let Some(instance) = ctx.instance.as_mut() {
                instance.remove(&alias);
            }
            Flow::proceed()
        }));
    }

    if let Some(list) = resource.controller_mut(ActionKind::List) {
        let link = paired.clone();
        list.phase_mut(PhaseName::Fetch).before(sync_hook(move |ctx| {
            let raw = ctx
                .param(&source_key)
                .or_else(|| owner_attributes.last().and_then(|a| ctx.param(a)))
                .map(str::to_string);
            if let Some(raw) = raw {
                ctx.include.push(paired_include(&link, &source_key, &raw));
            }
            Flow::proceed()
        }));

        let link = paired.clone();
        list.phase_mut(PhaseName::Send).before(sync_hook(move |ctx| {
            let Some(through) = link.through.as_deref() else {
                return Flow::proceed();
            };
            for instance in &mut ctx.instances {
                if let Some(Value::Array(items)) = instance.get_mut(&link.alias) {
                    for item in items.iter_mut() {
                        if let Value::Object(map) = item {
                            map.remove(through);
                        }
                    }
                }
            }
            Flow::proceed()
        }));
    }

    Some(resource)
}

/// Pinned include of the reverse association restricted to one parent row
fn paired_include(paired: &Association, column: &str, raw: &str) -> Include {
    let owner: &Arc<dyn Model> = &paired.target;
    let field_type = owner.field(column).map(|f| f.field_type);
    let criteria = Criteria::new().with(column, coerce_path_value(raw, field_type));
    Include::Node(
        IncludeNode::new(paired.alias.clone(), owner.clone())
            .with_criteria(criteria)
            .pinned(),
    )
}
