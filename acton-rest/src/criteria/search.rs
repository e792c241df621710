//! Free-text search predicates

use std::collections::BTreeMap;

use serde_json::Value;

use crate::model::{Condition, Criteria, Model, Operator};
use crate::resource::{SearchOverride, SearchSpec};

/// Operand for one search predicate
fn search_term(spec: &SearchSpec, raw: &str) -> String {
    match (spec.override_mode, spec.operator) {
        (Some(SearchOverride::StartsWith), _) => format!("{raw}%"),
        (None, Operator::Like) => format!("%{raw}%"),
        (None, _) => raw.to_string(),
    }
}

/// Build the OR-group for one search spec, or `None` when its parameter is absent
pub fn search_condition(
    spec: &SearchSpec,
    model: &dyn Model,
    query: &BTreeMap<String, String>,
) -> Option<Condition> {
    let raw = query.get(&spec.param)?;
    let operator = spec.effective_operator();
    let attributes = spec
        .attributes
        .clone()
        .unwrap_or_else(|| model.fields().into_iter().map(|f| f.name).collect());

    let mut predicates = Vec::with_capacity(attributes.len());
    for attribute in attributes {
        // Dotted attributes reference included models and are passed through
        if operator.is_pattern() && !attribute.contains('.') {
            match model.field(&attribute) {
                Some(field) if field.field_type.is_text() => {}
                Some(_) => continue,
                None => {
                    tracing::warn!(
                        model = model.name(),
                        attribute = %attribute,
                        param = %spec.param,
                        "Skipping unknown search attribute"
                    );
                    continue;
                }
            }
        }
        predicates.push(Condition::compare(
            attribute,
            operator,
            Value::String(search_term(spec, raw)),
        ));
    }

    Some(Condition::Or(predicates))
}

/// AND one OR-group per present search parameter onto `criteria`
pub fn apply_search(
    specs: &[SearchSpec],
    model: &dyn Model,
    query: &BTreeMap<String, String>,
    criteria: &mut Criteria,
) {
    for spec in specs {
        if let Some(condition) = search_condition(spec, model, query) {
            criteria.push(condition);
        }
    }
}
