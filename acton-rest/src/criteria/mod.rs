//! Criteria builder
//!
//! Turns one request's query string, path parameters and context overrides
//! into [`QueryOptions`] for the model store. Builders only read the resource
//! settings and the context; every option object they return is a fresh copy,
//! so building twice from the same inputs yields equal results.
//!
//! List queries go through these steps, in order:
//!
//! 1. projection (context override, else the resource's attributes)
//! 2. paging window (`count`, `offset`, `page`)
//! 3. include list copy, then shallow pruning via `children`
//! 4. free-text search
//! 5. sort parsing and allow-list validation
//! 6. implicit equality filters for field-named parameters
//! 7. dot-path filters onto includes
//! 8. distinct counting when includes are present

mod filter;
mod include;
mod pagination;
mod range;
mod search;
mod sort;

pub use filter::{apply_implicit_filters, coerce_path_value, safeish_parse};
pub use include::{apply_nested_filters, prune_shallow, request_includes};
pub use pagination::{resolve_window, Window, WindowInput};
pub use range::ContentRange;
pub use search::{apply_search, search_condition};
pub use sort::{parse_sort, SORT_REJECTED};

use crate::handlers::{ActionScope, ApiError};
use crate::model::{Projection, QueryOptions};
use crate::pipeline::Context;

/// Query parameter listing the includes kept in shallow mode
pub const CHILDREN_PARAM: &str = "children";

/// Query parameter selecting a named model scope
pub const SCOPE_PARAM: &str = "scope";

fn default_projection(scope: &ActionScope, options: &QueryOptions) -> Projection {
    options
        .attributes
        .clone()
        .unwrap_or_else(|| Projection::Only(scope.settings.attributes.clone()))
}

/// Build the options for a list query
pub fn build_list_options(scope: &ActionScope, ctx: &Context) -> Result<QueryOptions, ApiError> {
    let settings = &scope.settings;
    let model = settings.model.as_ref();
    let query = &ctx.request.query;

    let mut options = ctx.options.clone();
    let mut criteria = ctx.criteria.clone();

    options.attributes = Some(default_projection(scope, &options));

    let window = resolve_window(
        WindowInput {
            count: ctx.count,
            offset: ctx.offset,
            page: ctx.page,
            query_count: ctx.query("count"),
            query_offset: ctx.query("offset"),
            query_page: ctx.query("page"),
        },
        settings.default_count,
        settings.pagination,
    );
    options.offset = Some(window.offset);
    options.limit = window.limit;

    let include = request_includes(&settings.include, &ctx.include);
    if !include.is_empty() {
        options.include = include;
    }
    if ctx.shallow {
        options.include = prune_shallow(std::mem::take(&mut options.include), ctx.query(CHILDREN_PARAM));
    }

    apply_search(&settings.search, model, query, &mut criteria);

    let order = parse_sort(&settings.sort, model, query)?;
    if !order.is_empty() {
        options.order = order;
    }

    apply_implicit_filters(model, query, &mut criteria);
    apply_nested_filters(model, &mut options.include, query);

    options.criteria = criteria;
    if let Some(scope_name) = ctx.query(SCOPE_PARAM) {
        options.scope = Some(scope_name.to_string());
    }
    if !options.include.is_empty() {
        options.distinct = true;
    }
    if options.transaction.is_none() {
        options.transaction = ctx.transaction.clone();
    }

    tracing::debug!(
        resource = settings.name(),
        offset = window.offset,
        limit = ?window.limit,
        includes = options.include.len(),
        conditions = options.criteria.conditions().len(),
        "Built list options"
    );
    Ok(options)
}

/// Build the options for a single-record query
///
/// Path parameters bound by the endpoint become equality criteria unless the
/// context criteria already constrain that field.
pub fn build_read_options(scope: &ActionScope, ctx: &Context) -> QueryOptions {
    let settings = &scope.settings;
    let model = settings.model.as_ref();

    let mut options = ctx.options.clone();
    let mut criteria = ctx.criteria.clone();

    options.attributes = Some(default_projection(scope, &options));

    for attribute in scope.endpoint.attributes() {
        if criteria.contains_field(attribute) {
            continue;
        }
        if let Some(raw) = ctx.param(attribute) {
            let field_type = model.field(attribute).map(|f| f.field_type);
            criteria.set(attribute.clone(), coerce_path_value(raw, field_type));
        }
    }
    options.criteria = criteria;

    let include = request_includes(&settings.include, &ctx.include);
    if !include.is_empty() {
        options.include = include;
    }
    if ctx.shallow {
        options.include = prune_shallow(std::mem::take(&mut options.include), ctx.query(CHILDREN_PARAM));
    }

    if settings.association_options.remove_foreign_keys {
        options.attributes = options
            .attributes
            .map(|p| p.without(&scope.include_attributes));
    }

    if let Some(scope_name) = ctx.query(SCOPE_PARAM) {
        options.scope = Some(scope_name.to_string());
    }
    if options.transaction.is_none() {
        options.transaction = ctx.transaction.clone();
    }

    tracing::debug!(
        resource = settings.name(),
        includes = options.include.len(),
        conditions = options.criteria.conditions().len(),
        "Built read options"
    );
    options
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::Endpoint;
    use crate::memory::{MemoryDb, ModelDef};
    use crate::model::{Condition, FieldType, Include, IncludeNode, Operator};
    use crate::pipeline::RequestParts;
    use crate::resource::{Resource, ResourceOptions, SortSpec};
    use axum::http::Method;
    use serde_json::json;

    fn db() -> MemoryDb {
        let db = MemoryDb::new();
        db.define(
            ModelDef::new("users")
                .field("id", FieldType::Integer)
                .field("username", FieldType::String)
                .field("email", FieldType::String)
                .has_many("tasks", "tasks", "user_id"),
        );
        db.define(
            ModelDef::new("tasks")
                .field("id", FieldType::Integer)
                .field("name", FieldType::String)
                .field("user_id", FieldType::Integer),
        );
        db
    }

    fn list_scope(options: ResourceOptions) -> ActionScope {
        let db = db();
        let resource = Resource::new(db.model("users"), options);
        resource.scope_for(crate::handlers::ActionKind::List)
    }

    fn list_ctx(pairs: &[(&str, &str)]) -> Context {
        let mut request = RequestParts::new(Method::GET);
        for (k, v) in pairs {
            request = request.with_query(*k, *v);
        }
        Context::new(request)
    }

    #[test]
    fn test_list_defaults() {
        let scope = list_scope(ResourceOptions::new());
        let options = build_list_options(&scope, &list_ctx(&[])).unwrap();
        assert_eq!(options.offset, Some(0));
        assert_eq!(options.limit, Some(100));
        assert!(options.criteria.is_empty());
        assert!(!options.distinct);
        assert_eq!(
            options.attributes,
            Some(Projection::Only(vec!["id".into(), "username".into(), "email".into()]))
        );
    }

    #[test]
    fn test_list_combines_steps() {
        let scope = list_scope(
            ResourceOptions::new().with_sort(SortSpec::new().with_attributes(["username"])),
        );
        let ctx = list_ctx(&[("q", "ar"), ("sort", "-username"), ("id", "3"), ("count", "5")]);
        let options = build_list_options(&scope, &ctx).unwrap();

        assert_eq!(options.limit, Some(5));
        assert_eq!(options.order.len(), 1);
        assert_eq!(options.criteria.conditions().len(), 2);
        assert!(matches!(options.criteria.conditions()[0], Condition::Or(_)));
        assert_eq!(options.criteria.get("id"), Some(&json!(3)));
    }

    #[test]
    fn test_list_sort_rejection_propagates() {
        let scope = list_scope(
            ResourceOptions::new().with_sort(SortSpec::new().with_attributes(["email"])),
        );
        let err = build_list_options(&scope, &list_ctx(&[("sort", "username,-invalid")])).unwrap_err();
        assert_eq!(err.errors, vec!["username", "invalid"]);
    }

    #[test]
    fn test_list_with_includes_is_distinct() {
        let scope = list_scope(ResourceOptions::new().with_associations(true));
        let options = build_list_options(&scope, &list_ctx(&[])).unwrap();
        assert_eq!(options.include.len(), 1);
        assert!(options.distinct);
    }

    #[test]
    fn test_list_shallow_prunes_includes() {
        let scope = list_scope(ResourceOptions::new().with_associations(true));
        let mut ctx = list_ctx(&[]);
        ctx.shallow = true;
        let options = build_list_options(&scope, &ctx).unwrap();
        assert!(options.include.is_empty());
        assert!(!options.distinct);

        let mut ctx = list_ctx(&[("children", "tasks")]);
        ctx.shallow = true;
        let options = build_list_options(&scope, &ctx).unwrap();
        assert_eq!(options.include.len(), 1);
    }

    #[test]
    fn test_list_is_idempotent_and_leaves_resource_includes_alone() {
        let scope = list_scope(ResourceOptions::new().with_associations(true));
        let before = scope.settings.include.clone();
        let ctx = list_ctx(&[("tasks.name", "eat"), ("sort", "username")]);

        let first = build_list_options(&scope, &ctx).unwrap();
        let second = build_list_options(&scope, &ctx).unwrap();

        assert_eq!(first, second);
        assert_eq!(scope.settings.include, before);
        match &first.include[0] {
            Include::Node(node) => assert_eq!(node.criteria.get("name"), Some(&json!("eat"))),
            Include::Alias(_) => panic!("expected node"),
        }
        match &scope.settings.include[0] {
            Include::Node(node) => assert!(node.criteria.is_empty()),
            Include::Alias(_) => {}
        }
    }

    #[test]
    fn test_list_context_overrides() {
        let scope = list_scope(ResourceOptions::new());
        let mut ctx = list_ctx(&[("count", "50")]);
        ctx.count = Some(2);
        ctx.page = Some(3);
        ctx.criteria.push(Condition::compare("id", Operator::Gt, 1));
        let options = build_list_options(&scope, &ctx).unwrap();
        assert_eq!(options.limit, Some(2));
        assert_eq!(options.offset, Some(6));
        assert!(options.criteria.contains_field("id"));
    }

    #[test]
    fn test_list_scope_param() {
        let scope = list_scope(ResourceOptions::new());
        let options = build_list_options(&scope, &list_ctx(&[("scope", "active")])).unwrap();
        assert_eq!(options.scope.as_deref(), Some("active"));
    }

    #[test]
    fn test_read_binds_path_params() {
        let db = db();
        let resource = Resource::new(db.model("tasks"), ResourceOptions::new());
        let mut scope = resource.scope_for(crate::handlers::ActionKind::Read);
        scope.endpoint = Endpoint::parse("/users/:user_id/tasks/:id");

        let request = RequestParts::new(Method::GET)
            .with_param("user_id", "1")
            .with_param("id", "2");
        let options = build_read_options(&scope, &Context::new(request));
        assert_eq!(options.criteria.get("user_id"), Some(&json!(1)));
        assert_eq!(options.criteria.get("id"), Some(&json!(2)));
    }

    #[test]
    fn test_read_criteria_already_set_wins_over_param() {
        let db = db();
        let resource = Resource::new(db.model("users"), ResourceOptions::new());
        let scope = resource.scope_for(crate::handlers::ActionKind::Read);

        let mut ctx = Context::new(RequestParts::new(Method::GET).with_param("id", "2"));
        ctx.criteria.set("id", 9);
        let options = build_read_options(&scope, &ctx);
        assert_eq!(options.criteria.conditions().len(), 1);
        assert_eq!(options.criteria.get("id"), Some(&json!(9)));
    }

    #[test]
    fn test_read_remove_foreign_keys_prunes_projection() {
        let db = db();
        let resource = Resource::new(
            db.model("tasks"),
            ResourceOptions::new().with_remove_foreign_keys(true),
        );
        let mut scope = resource.scope_for(crate::handlers::ActionKind::Read);
        scope.include_attributes = vec!["user_id".into()];

        let ctx = Context::new(RequestParts::new(Method::GET).with_param("id", "1"));
        let options = build_read_options(&scope, &ctx);
        assert_eq!(
            options.attributes,
            Some(Projection::Only(vec!["id".into(), "name".into()]))
        );
    }

    #[test]
    fn test_read_pinned_include_survives_shallow() {
        let db = db();
        let resource = Resource::new(db.model("users"), ResourceOptions::new().with_associations(true));
        let scope = resource.scope_for(crate::handlers::ActionKind::Read);
        let mut ctx = Context::new(RequestParts::new(Method::GET).with_param("id", "1"));
        ctx.shallow = true;
        ctx.include.push(Include::Node(
            IncludeNode::new("owner", db.model("users")).pinned(),
        ));
        let options = build_read_options(&scope, &ctx);
        assert_eq!(options.include.len(), 1);
        assert_eq!(options.include[0].alias(), "owner");
    }
}
