//! Include list handling: per-request copies, shallow pruning and dot-path filters

use std::collections::BTreeMap;

use crate::model::{Include, IncludeNode, Model};

use super::filter::safeish_parse;

/// Per-request include list: the resource defaults followed by context extras
///
/// Cloning copies every filter tree while model handles stay shared, so the
/// result can be modified without touching the resource's stored defaults.
pub fn request_includes(defaults: &[Include], extra: &[Include]) -> Vec<Include> {
    defaults.iter().chain(extra.iter()).cloned().collect()
}

/// Keep only the includes requested through the pipe-separated `children` value
///
/// With no `children` every include is dropped. Pinned includes (relationship
/// filters of nested endpoints) are always kept.
pub fn prune_shallow(include: Vec<Include>, children: Option<&str>) -> Vec<Include> {
    let requested: Vec<&str> = children
        .filter(|c| !c.is_empty())
        .map(|c| c.split('|').collect())
        .unwrap_or_default();
    include
        .into_iter()
        .filter(|i| i.is_pinned() || requested.contains(&i.alias()))
        .collect()
}

/// Attach `alias.field=value` query filters to the matching includes
///
/// Paths that do not resolve to an include and a field of its model are
/// ignored and logged. Plain alias includes on the path are replaced by full
/// descriptors so they can carry a filter.
pub fn apply_nested_filters(
    model: &dyn Model,
    include: &mut [Include],
    query: &BTreeMap<String, String>,
) {
    for (key, raw) in query.iter().filter(|(k, _)| k.contains('.')) {
        let path: Vec<&str> = key.split('.').collect();
        if !attach(model, include, &path, raw) {
            tracing::warn!(
                model = model.name(),
                key = %key,
                "Ignoring filter that does not resolve to an included field"
            );
        }
    }
}

fn attach(model: &dyn Model, include: &mut [Include], path: &[&str], raw: &str) -> bool {
    let Some((alias, rest)) = path.split_first() else {
        return false;
    };
    if rest.is_empty() {
        return false;
    }
    let Some(position) = include.iter().position(|i| i.alias() == *alias) else {
        return false;
    };

    if let Include::Alias(_) = include[position] {
        let Some(association) = model.association(alias) else {
            return false;
        };
        include[position] = Include::Node(IncludeNode::new(*alias, association.target));
    }
    let Include::Node(node) = &mut include[position] else {
        return false;
    };

    if let [field] = rest {
        let Some(meta) = node.model.field(field) else {
            return false;
        };
        node.criteria
            .set(*field, safeish_parse(raw, Some(meta.field_type)));
        return true;
    }

    let nested_model = node.model.clone();
    attach(nested_model.as_ref(), &mut node.include, rest, raw)
}
