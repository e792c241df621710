//! REST resources
//!
//! A [`Resource`] binds one [`Model`] to a plural and a singular endpoint and
//! serves the enabled actions on them. Each action is a [`Controller`] with
//! hookable `fetch`, `write` and `send` phases. With associations enabled,
//! every association also becomes a nested sub-resource.
//!
//! Hooks are registered during setup. [`Resource::into_router`] consumes the
//! resource, so hook lists are fixed once requests are served.
//!
//! # Example
//!
//! ```rust
//! use acton_rest::memory::{MemoryDb, ModelDef};
//! use acton_rest::model::FieldType;
//! use acton_rest::pipeline::{sync_hook, Flow, PhaseName};
//! use acton_rest::resource::{Resource, ResourceOptions};
//! use acton_rest::handlers::ActionKind;
//!
//! let db = MemoryDb::new();
//! db.define(
//!     ModelDef::new("users")
//!         .field("id", FieldType::Integer)
//!         .field("username", FieldType::String),
//! );
//!
//! let mut users = Resource::new(db.model("users"), ResourceOptions::new());
//! users
//!     .before(ActionKind::List, PhaseName::Fetch, sync_hook(|ctx| {
//!         ctx.count = Some(10);
//!         Flow::proceed()
//!     }))
//!     .unwrap();
//!
//! let router: axum::Router = users.into_router();
//! # let _ = router;
//! ```

mod association;
mod options;
mod router;

pub use association::sub_resource_name;
pub use options::{
    AssociationOptions, Endpoints, ResourceOptions, ResourceSettings, SearchOverride, SearchSpec,
    SortSpec, UpdateMethod, DEFAULT_COUNT,
};

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use axum::Router;

use crate::endpoint::Endpoint;
use crate::error::{Error, Result};
use crate::handlers::{action_for, ActionKind, ActionScope, Controller};
use crate::model::{Association, Include, IncludeNode, Model, Projection};
use crate::pipeline::{Hook, HookPosition, PhaseName};
use router::Route;

/// A model exposed through generated endpoints
pub struct Resource {
    settings: Arc<ResourceSettings>,
    controllers: BTreeMap<ActionKind, Controller>,
    sub_resources: BTreeMap<String, Resource>,
}

impl Resource {
    /// Resolve `options` against `model` and build one controller per enabled action
    pub fn new(model: Arc<dyn Model>, options: ResourceOptions) -> Self {
        let (plural, singular) = options.endpoints.clone().unwrap_or_else(|| {
            let plural = format!("/{}", model.plural_name());
            let singular = format!("{plural}/:{}", model.primary_key());
            (plural, singular)
        });
        let endpoints = Endpoints {
            plural: Endpoint::parse(plural),
            singular: Endpoint::parse(singular),
        };

        let attributes = model
            .fields()
            .into_iter()
            .map(|f| f.name)
            .filter(|name| !options.exclude_attributes.contains(name))
            .collect();

        let associations = model.associations();
        let include = resolve_includes(&options, &associations);
        let associations_info = associations
            .iter()
            .filter(|a| include.iter().any(|i| i.alias() == a.alias))
            .cloned()
            .collect();

        let settings = Arc::new(ResourceSettings {
            model,
            endpoints,
            attributes,
            exclude_attributes: options.exclude_attributes.clone(),
            include,
            associations_info,
            pagination: options.pagination,
            default_count: options.default_count,
            search: options.search.clone(),
            sort: options.sort.clone(),
            association_options: options.association_options.clone(),
            update_method: options.update_method,
            reload_instances: options.reload_instances,
        });

        let mut controllers = BTreeMap::new();
        for &kind in &options.actions {
            let scope = ActionScope {
                settings: settings.clone(),
                endpoint: settings.endpoints.for_action(kind).clone(),
                include_attributes: Vec::new(),
            };
            controllers
                .entry(kind)
                .or_insert_with(|| Controller::new(action_for(kind), scope));
        }

        let mut resource = Self {
            settings,
            controllers,
            sub_resources: BTreeMap::new(),
        };

        if options.associations {
            for association in &associations {
                if let Some(sub) = association::expand(&resource.settings, &options, association) {
                    resource
                        .sub_resources
                        .insert(sub_resource_name(association), sub);
                }
            }
        }

        tracing::debug!(
            resource = resource.settings.name(),
            plural = %resource.settings.endpoints.plural,
            singular = %resource.settings.endpoints.singular,
            actions = resource.controllers.len(),
            sub_resources = resource.sub_resources.len(),
            "Built resource"
        );
        resource
    }

    /// Resolved configuration
    pub fn settings(&self) -> &ResourceSettings {
        &self.settings
    }

    /// Endpoint templates
    pub fn endpoints(&self) -> &Endpoints {
        &self.settings.endpoints
    }

    /// Enabled actions, in registration order
    pub fn actions(&self) -> Vec<ActionKind> {
        self.controllers.keys().copied().collect()
    }

    /// The scope a controller of `kind` runs with
    ///
    /// Disabled actions get the scope they would have had.
    pub fn scope_for(&self, kind: ActionKind) -> ActionScope {
        self.controllers
            .get(&kind)
            .map(|c| c.scope().clone())
            .unwrap_or_else(|| ActionScope {
                settings: self.settings.clone(),
                endpoint: self.settings.endpoints.for_action(kind).clone(),
                include_attributes: Vec::new(),
            })
    }

    /// Controller of an enabled action
    pub fn controller(&self, kind: ActionKind) -> Option<&Controller> {
        self.controllers.get(&kind)
    }

    /// Controller of an enabled action, to register hooks
    pub fn controller_mut(&mut self, kind: ActionKind) -> Option<&mut Controller> {
        self.controllers.get_mut(&kind)
    }

    /// Append a hook to one phase of one action
    ///
    /// Fails when the action is not enabled on this resource.
    pub fn add_hook(
        &mut self,
        action: ActionKind,
        phase: PhaseName,
        position: HookPosition,
        hook: impl Hook + 'static,
    ) -> Result<&mut Self> {
        let controller = self
            .controllers
            .get_mut(&action)
            .ok_or_else(|| Error::ActionDisabled {
                resource: self.settings.name().to_string(),
                action,
            })?;
        controller.phase_mut(phase).add(position, Arc::new(hook));
        tracing::trace!(
            resource = self.settings.name(),
            action = %action,
            phase = %phase,
            position = %position,
            "Added hook"
        );
        Ok(self)
    }

    /// Append a hook that runs before the core step of a phase
    pub fn before(
        &mut self,
        action: ActionKind,
        phase: PhaseName,
        hook: impl Hook + 'static,
    ) -> Result<&mut Self> {
        self.add_hook(action, phase, HookPosition::Before, hook)
    }

    /// Append a hook that runs after the core step of a phase
    pub fn after(
        &mut self,
        action: ActionKind,
        phase: PhaseName,
        hook: impl Hook + 'static,
    ) -> Result<&mut Self> {
        self.add_hook(action, phase, HookPosition::After, hook)
    }

    /// A nested resource by name
    pub fn sub_resource(&self, name: &str) -> Option<&Resource> {
        self.sub_resources.get(name)
    }

    /// A nested resource by name, to register hooks
    pub fn sub_resource_mut(&mut self, name: &str) -> Option<&mut Resource> {
        self.sub_resources.get_mut(name)
    }

    /// Names of the nested resources
    pub fn sub_resource_names(&self) -> impl Iterator<Item = &str> {
        self.sub_resources.keys().map(String::as_str)
    }

    /// Set the foreign key columns every controller hides under `remove_foreign_keys`
    pub(crate) fn set_include_attributes(&mut self, attributes: &[String]) {
        for controller in self.controllers.values_mut() {
            controller.scope_mut().include_attributes = attributes.to_vec();
        }
    }

    /// Move every endpoint template under `base`, sub-resources included
    ///
    /// Hooks stay registered; only the templates the controllers route on and
    /// build `Location` headers from change.
    pub(crate) fn mount_under(&mut self, base: &str) {
        let mut settings = ResourceSettings::clone(&self.settings);
        settings.endpoints = Endpoints {
            plural: settings.endpoints.plural.prefixed(base),
            singular: settings.endpoints.singular.prefixed(base),
        };
        self.settings = Arc::new(settings);

        for controller in self.controllers.values_mut() {
            let scope = controller.scope_mut();
            scope.endpoint = scope.endpoint.prefixed(base);
            scope.settings = self.settings.clone();
        }
        for sub in self.sub_resources.values_mut() {
            sub.mount_under(base);
        }
    }

    fn into_routes(self, routes: &mut Vec<Route>) {
        routes.extend(self.controllers.into_values().map(Route::new));
        for (_, sub) in self.sub_resources {
            sub.into_routes(routes);
        }
    }

    /// Mount every controller, sub-resources included
    pub fn into_router(self) -> Router {
        let mut routes = Vec::new();
        self.into_routes(&mut routes);
        router::build(routes)
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("model", &self.settings.name())
            .field("plural", &self.settings.endpoints.plural.as_str())
            .field("singular", &self.settings.endpoints.singular.as_str())
            .field("actions", &self.actions())
            .field("sub_resources", &self.sub_resources.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Default includes: the configured list, then every association when enabled
///
/// Includes of known associations become full descriptors so per-alias
/// excluded columns travel with them.
fn resolve_includes(options: &ResourceOptions, associations: &[Association]) -> Vec<Include> {
    let mut include: Vec<Include> = options
        .include
        .iter()
        .map(|i| describe_include(i, options, associations))
        .collect();

    if options.associations {
        for association in associations {
            if include.iter().any(|i| i.alias() == association.alias) {
                continue;
            }
            let alias = Include::Alias(association.alias.clone());
            include.push(describe_include(&alias, options, associations));
        }
    }
    include
}

fn describe_include(include: &Include, options: &ResourceOptions, associations: &[Association]) -> Include {
    let excluded = options.association_options.excluded_for(include.alias());
    match include {
        Include::Alias(alias) => {
            let Some(association) = associations.iter().find(|a| &a.alias == alias) else {
                tracing::warn!(alias = %alias, "Include does not name an association");
                return include.clone();
            };
            let mut node = IncludeNode::new(alias.clone(), association.target.clone());
            if !excluded.is_empty() {
                node = node.with_attributes(Projection::Exclude(excluded.to_vec()));
            }
            Include::Node(node)
        }
        Include::Node(node) if node.attributes.is_none() && !excluded.is_empty() => Include::Node(
            node.clone()
                .with_attributes(Projection::Exclude(excluded.to_vec())),
        ),
        Include::Node(_) => include.clone(),
    }
}

/// A set of resources served from one router
///
/// ```rust
/// use acton_rest::memory::{MemoryDb, ModelDef};
/// use acton_rest::model::FieldType;
/// use acton_rest::resource::{Api, Resource, ResourceOptions};
///
/// let db = MemoryDb::new();
/// db.define(ModelDef::new("users").field("id", FieldType::Integer));
/// db.define(ModelDef::new("tasks").field("id", FieldType::Integer));
///
/// let router = Api::new()
///     .with_base_path("api")
///     .resource(Resource::new(db.model("users"), ResourceOptions::new()))
///     .resource(Resource::new(db.model("tasks"), ResourceOptions::new()))
///     .into_router();
/// # let _ = router;
/// ```
#[derive(Debug, Default)]
pub struct Api {
    resources: Vec<Resource>,
    base_path: Option<String>,
}

impl Api {
    /// An empty API
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount every route under a base path, e.g. `/api`
    ///
    /// The base becomes part of each endpoint template, so generated
    /// `Location` headers include it.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        let normalized = if !path.starts_with('/') {
            format!("/{}", path.trim_end_matches('/'))
        } else {
            path.trim_end_matches('/').to_string()
        };
        self.base_path = Some(normalized);
        self
    }

    /// Add a resource
    #[must_use]
    pub fn resource(mut self, resource: Resource) -> Self {
        self.resources.push(resource);
        self
    }

    /// Add a resource in place
    pub fn add(&mut self, resource: Resource) -> &mut Self {
        self.resources.push(resource);
        self
    }

    /// Resources added so far
    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    /// Mount every resource; the first resource to claim a path and method keeps it
    pub fn into_router(self) -> Router {
        let mut routes = Vec::new();
        for mut resource in self.resources {
            if let Some(base) = &self.base_path {
                resource.mount_under(base);
            }
            resource.into_routes(&mut routes);
        }
        router::build(routes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryDb, ModelDef};
    use crate::model::FieldType;
    use crate::pipeline::sync_hook;
    use crate::pipeline::Flow;

    fn db() -> MemoryDb {
        let db = MemoryDb::new();
        db.define(
            ModelDef::new("users")
                .field("id", FieldType::Integer)
                .field("username", FieldType::String)
                .field("password", FieldType::String)
                .field("app_id", FieldType::Integer)
                .has_many("tasks", "tasks", "user_id")
                .belongs_to("app", "apps", "app_id")
                .belongs_to_many("groups", "groups", "memberships", "user_id", "group_id"),
        );
        db.define(
            ModelDef::new("tasks")
                .field("id", FieldType::Integer)
                .field("name", FieldType::String)
                .field("user_id", FieldType::Integer),
        );
        db.define(
            ModelDef::new("apps")
                .field("id", FieldType::Integer)
                .field("name", FieldType::String),
        );
        db.define(
            ModelDef::new("groups")
                .field("id", FieldType::Integer)
                .field("name", FieldType::String),
        );
        db
    }

    #[test]
    fn test_default_endpoints_and_attributes() {
        let db = db();
        let resource = Resource::new(
            db.model("users"),
            ResourceOptions::new().with_exclude_attributes(["password"]),
        );
        assert_eq!(resource.endpoints().plural.as_str(), "/users");
        assert_eq!(resource.endpoints().singular.as_str(), "/users/:id");
        assert_eq!(resource.settings().attributes, vec!["id", "username", "app_id"]);
        assert!(resource.settings().include.is_empty());
        assert_eq!(resource.actions(), ActionKind::ALL.to_vec());
    }

    #[test]
    fn test_associations_become_includes_and_sub_resources() {
        let db = db();
        let resource = Resource::new(
            db.model("users"),
            ResourceOptions::new()
                .with_associations(true)
                .with_association_exclude("tasks", ["user_id"]),
        );

        let aliases: Vec<&str> = resource.settings().include.iter().map(Include::alias).collect();
        assert_eq!(aliases, vec!["tasks", "app", "groups"]);
        assert_eq!(resource.settings().associations_info.len(), 3);
        match &resource.settings().include[0] {
            Include::Node(node) => assert_eq!(
                node.attributes,
                Some(Projection::Exclude(vec!["user_id".into()]))
            ),
            Include::Alias(_) => panic!("expected a descriptor"),
        }

        let names: Vec<&str> = resource.sub_resource_names().collect();
        assert_eq!(names, vec!["app", "tasks"]);

        let tasks = resource.sub_resource("tasks").unwrap();
        assert_eq!(tasks.endpoints().plural.as_str(), "/users/:user_id/tasks");
        assert_eq!(tasks.endpoints().singular.as_str(), "/users/:user_id/tasks/:id");
        assert_eq!(tasks.actions(), vec![ActionKind::List, ActionKind::Read]);
        assert_eq!(tasks.settings().exclude_attributes, vec!["user_id"]);
        assert_eq!(
            tasks.scope_for(ActionKind::List).include_attributes,
            vec!["user_id"]
        );

        let app = resource.sub_resource("app").unwrap();
        assert_eq!(app.endpoints().singular.as_str(), "/users/:id/app");
        assert_eq!(app.actions(), vec![ActionKind::Read]);
    }

    #[test]
    fn test_paired_many_to_many_is_expanded() {
        let db = db();
        db.define(
            ModelDef::new("groups")
                .field("id", FieldType::Integer)
                .field("name", FieldType::String)
                .belongs_to_many("users", "users", "memberships", "group_id", "user_id"),
        );
        let resource = Resource::new(db.model("users"), ResourceOptions::new().with_associations(true));
        let groups = resource.sub_resource("groups").unwrap();
        assert_eq!(groups.endpoints().plural.as_str(), "/users/:id/groups");
        assert_eq!(groups.endpoints().singular.as_str(), "/users/:user_id/groups/:id");
    }

    #[test]
    fn test_hook_on_disabled_action_fails() {
        let db = db();
        let mut resource = Resource::new(
            db.model("tasks"),
            ResourceOptions::new().with_actions([ActionKind::List, ActionKind::Read]),
        );
        let err = resource
            .before(ActionKind::Delete, PhaseName::Write, sync_hook(|_| Flow::proceed()))
            .unwrap_err();
        assert!(matches!(err, Error::ActionDisabled { action: ActionKind::Delete, .. }));

        resource
            .before(ActionKind::List, PhaseName::Fetch, sync_hook(|_| Flow::proceed()))
            .unwrap()
            .after(ActionKind::List, PhaseName::Send, sync_hook(|_| Flow::proceed()))
            .unwrap();
        let list = resource.controller(ActionKind::List).unwrap();
        assert_eq!(list.phase(PhaseName::Fetch).hook_count(HookPosition::Before), 1);
        assert_eq!(list.phase(PhaseName::Send).hook_count(HookPosition::After), 1);
    }

    #[test]
    fn test_scope_for_disabled_action() {
        let db = db();
        let resource = Resource::new(
            db.model("tasks"),
            ResourceOptions::new().with_actions([ActionKind::List]),
        );
        assert!(resource.controller(ActionKind::Read).is_none());
        assert_eq!(
            resource.scope_for(ActionKind::Read).endpoint.as_str(),
            "/tasks/:id"
        );
    }

    #[test]
    fn test_mount_under_prefixes_every_template() {
        let db = db();
        let mut resource = Resource::new(db.model("users"), ResourceOptions::new().with_associations(true));
        resource
            .after(ActionKind::Create, PhaseName::Write, sync_hook(|_| Flow::proceed()))
            .unwrap();
        resource.mount_under("/api");

        assert_eq!(resource.endpoints().plural.as_str(), "/api/users");
        assert_eq!(resource.endpoints().singular.as_str(), "/api/users/:id");
        let create = resource.controller(ActionKind::Create).unwrap();
        assert_eq!(create.endpoint().as_str(), "/api/users");
        assert_eq!(create.scope().settings.endpoints.singular.as_str(), "/api/users/:id");
        assert_eq!(create.phase(PhaseName::Write).hook_count(HookPosition::After), 1);

        let tasks = resource.sub_resource("tasks").unwrap();
        assert_eq!(tasks.endpoints().singular.as_str(), "/api/users/:user_id/tasks/:id");
        assert_eq!(
            tasks.controller(ActionKind::Read).unwrap().endpoint().as_str(),
            "/api/users/:user_id/tasks/:id"
        );
    }

    #[test]
    fn test_update_method_from_options() {
        let db = db();
        let resource = Resource::new(
            db.model("tasks"),
            ResourceOptions::new().with_update_method(UpdateMethod::Patch),
        );
        let update = resource.controller(ActionKind::Update).unwrap();
        assert_eq!(update.method(), axum::http::Method::PATCH);
    }
}
