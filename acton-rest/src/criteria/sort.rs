//! Sort list parsing and allow-list validation

use std::collections::BTreeMap;

use crate::handlers::ApiError;
use crate::model::{Model, OrderDirection, OrderTarget, OrderTerm};
use crate::resource::SortSpec;

/// Message of the error returned for disallowed sort fields
pub const SORT_REJECTED: &str = "Sorting not allowed on given attributes";

/// Parse the sort parameter (or the configured default) into order terms
///
/// `-name` sorts descending. Names containing a `.` become literal references
/// into included models. Every requested name is checked against the
/// allow-list, and a single error names all rejected fields in request order.
/// Returns an empty list when neither the parameter nor a default is present.
///
/// An empty `sort=` falls back to the default, and empty segments such as the
/// middle of `id,,name` are skipped rather than rejected.
pub fn parse_sort(
    spec: &SortSpec,
    model: &dyn Model,
    query: &BTreeMap<String, String>,
) -> Result<Vec<OrderTerm>, ApiError> {
    let requested = query
        .get(&spec.param)
        .filter(|s| !s.is_empty())
        .or(spec.default.as_ref());
    let Some(requested) = requested else {
        return Ok(Vec::new());
    };

    let allowed = spec
        .attributes
        .clone()
        .unwrap_or_else(|| model.fields().into_iter().map(|f| f.name).collect());

    let mut order = Vec::new();
    let mut rejected = Vec::new();
    for column in requested.split(',').filter(|c| !c.is_empty()) {
        let (name, direction) = match column.strip_prefix('-') {
            Some(name) => (name, OrderDirection::Desc),
            None => (column, OrderDirection::Asc),
        };

        if !allowed.iter().any(|a| a == name) {
            rejected.push(name.to_string());
        }

        let target = if name.contains('.') {
            OrderTarget::Literal(name.to_string())
        } else {
            OrderTarget::Column(name.to_string())
        };
        order.push(OrderTerm { target, direction });
    }

    if !rejected.is_empty() {
        return Err(ApiError::bad_request(SORT_REJECTED).with_errors(rejected));
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryDb, ModelDef};
    use crate::model::FieldType;

    fn users() -> std::sync::Arc<dyn Model> {
        let db = MemoryDb::new();
        db.define(
            ModelDef::new("users")
                .field("id", FieldType::Integer)
                .field("username", FieldType::String)
                .field("email", FieldType::String),
        );
        db.model("users")
    }

    fn query(sort: &str) -> BTreeMap<String, String> {
        BTreeMap::from([("sort".to_string(), sort.to_string())])
    }

    #[test]
    fn test_directions() {
        let model = users();
        let order = parse_sort(&SortSpec::new(), model.as_ref(), &query("username,-id")).unwrap();
        assert_eq!(
            order,
            vec![
                OrderTerm {
                    target: OrderTarget::Column("username".into()),
                    direction: OrderDirection::Asc
                },
                OrderTerm {
                    target: OrderTarget::Column("id".into()),
                    direction: OrderDirection::Desc
                },
            ]
        );
    }

    #[test]
    fn test_rejects_every_disallowed_field_in_order() {
        let model = users();
        let spec = SortSpec::new().with_attributes(["email"]);
        let err = parse_sort(&spec, model.as_ref(), &query("username,-invalid")).unwrap_err();
        assert_eq!(err.status().as_u16(), 400);
        assert_eq!(err.message, SORT_REJECTED);
        assert_eq!(err.errors, vec!["username", "invalid"]);
    }

    #[test]
    fn test_default_sort_applies_without_param() {
        let model = users();
        let spec = SortSpec::new().with_default("-email");
        let order = parse_sort(&spec, model.as_ref(), &BTreeMap::new()).unwrap();
        assert_eq!(order.len(), 1);
        assert_eq!(order[0].direction, OrderDirection::Desc);
    }

    #[test]
    fn test_no_param_no_default() {
        let model = users();
        assert!(parse_sort(&SortSpec::new(), model.as_ref(), &BTreeMap::new())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_empty_segments_are_skipped() {
        let model = users();
        let order = parse_sort(&SortSpec::new(), model.as_ref(), &query("id,,username,")).unwrap();
        assert_eq!(order.len(), 2);

        let spec = SortSpec::new().with_default("-id");
        let order = parse_sort(&spec, model.as_ref(), &query("")).unwrap();
        assert_eq!(order[0].direction, OrderDirection::Desc);
    }

    #[test]
    fn test_dotted_names_become_literals() {
        let model = users();
        let spec = SortSpec::new().with_attributes(["tasks.name"]);
        let order = parse_sort(&spec, model.as_ref(), &query("-tasks.name")).unwrap();
        assert_eq!(order[0].target, OrderTarget::Literal("tasks.name".into()));
    }
}
