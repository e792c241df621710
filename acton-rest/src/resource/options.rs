//! Resource configuration
//!
//! [`ResourceOptions`] is the builder users fill in; [`ResourceSettings`] is
//! the resolved, immutable form shared by every controller of a resource.
//!
//! # Example
//!
//! ```rust
//! use acton_rest::model::Operator;
//! use acton_rest::resource::{ResourceOptions, SearchSpec, SortSpec};
//!
//! let options = ResourceOptions::new()
//!     .with_endpoints("/users", "/users/:id")
//!     .with_search(SearchSpec::new("q").with_attributes(["username", "email"]))
//!     .with_search(SearchSpec::new("prefix").starts_with())
//!     .with_sort(SortSpec::new().with_default("-id"))
//!     .with_exclude_attributes(["password"]);
//! assert_eq!(options.search.len(), 2);
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use axum::http::Method;

use crate::config::ResourceDefaults;
use crate::endpoint::Endpoint;
use crate::handlers::{ActionKind, Plurality};
use crate::model::{Association, Include, Model, Operator};

/// Default page size when nothing else is configured
pub const DEFAULT_COUNT: i64 = 100;

/// Search mode that replaces the configured operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchOverride {
    /// Match values beginning with the search term (`term%` with `LIKE`)
    StartsWith,
}

/// One free-text search parameter
#[derive(Debug, Clone, PartialEq)]
pub struct SearchSpec {
    /// Query parameter carrying the search term
    pub param: String,
    /// Predicate operator; `Like` wraps the term as `%term%`
    pub operator: Operator,
    /// Optional mode overriding `operator`
    pub override_mode: Option<SearchOverride>,
    /// Attributes to search; `None` searches every model field
    pub attributes: Option<Vec<String>>,
}

impl SearchSpec {
    /// A contains-search on `param`
    pub fn new(param: impl Into<String>) -> Self {
        Self {
            param: param.into(),
            operator: Operator::Like,
            override_mode: None,
            attributes: None,
        }
    }

    /// Use a different predicate operator
    #[must_use]
    pub fn with_operator(mut self, operator: Operator) -> Self {
        self.operator = operator;
        self
    }

    /// Match the beginning of values instead
    #[must_use]
    pub fn starts_with(mut self) -> Self {
        self.override_mode = Some(SearchOverride::StartsWith);
        self
    }

    /// Restrict the searched attributes
    #[must_use]
    pub fn with_attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes = Some(attributes.into_iter().map(Into::into).collect());
        self
    }

    /// Operator actually applied once the override is taken into account
    pub fn effective_operator(&self) -> Operator {
        match self.override_mode {
            Some(SearchOverride::StartsWith) => Operator::Like,
            None => self.operator,
        }
    }
}

impl Default for SearchSpec {
    fn default() -> Self {
        Self::new("q")
    }
}

/// Sort parameter configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    /// Query parameter carrying the comma-separated sort list
    pub param: String,
    /// Sort list applied when the parameter is absent
    pub default: Option<String>,
    /// Sortable attributes; `None` allows every model field
    pub attributes: Option<Vec<String>>,
}

impl SortSpec {
    /// Sorting on `sort`, every field allowed
    pub fn new() -> Self {
        Self {
            param: "sort".to_string(),
            default: None,
            attributes: None,
        }
    }

    /// Read the sort list from another parameter
    #[must_use]
    pub fn with_param(mut self, param: impl Into<String>) -> Self {
        self.param = param.into();
        self
    }

    /// Sort list used when the request has none
    #[must_use]
    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Restrict sortable attributes
    #[must_use]
    pub fn with_attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes = Some(attributes.into_iter().map(Into::into).collect());
        self
    }
}

impl Default for SortSpec {
    fn default() -> Self {
        Self::new()
    }
}

/// HTTP method used by the update action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UpdateMethod {
    /// `PUT`
    #[default]
    Put,
    /// `PATCH`
    Patch,
}

impl UpdateMethod {
    /// The HTTP method
    pub fn method(&self) -> Method {
        match self {
            Self::Put => Method::PUT,
            Self::Patch => Method::PATCH,
        }
    }
}

impl fmt::Display for UpdateMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Put => write!(f, "put"),
            Self::Patch => write!(f, "patch"),
        }
    }
}

impl FromStr for UpdateMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "put" => Ok(Self::Put),
            "patch" => Ok(Self::Patch),
            other => Err(format!("unsupported update method '{other}'")),
        }
    }
}

/// Options applied to associations and their sub-resources
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssociationOptions {
    /// Strip foreign key columns from responses
    pub remove_foreign_keys: bool,
    /// Columns hidden per association alias
    pub exclude_attributes: BTreeMap<String, Vec<String>>,
}

impl AssociationOptions {
    /// Columns hidden for `alias`
    pub fn excluded_for(&self, alias: &str) -> &[String] {
        self.exclude_attributes
            .get(alias)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// User-facing resource configuration
#[derive(Debug, Clone)]
pub struct ResourceOptions {
    /// Plural and singular endpoint templates; derived from the model when `None`
    pub endpoints: Option<(String, String)>,
    /// Enabled actions
    pub actions: Vec<ActionKind>,
    /// Columns hidden from every response of this resource
    pub exclude_attributes: Vec<String>,
    /// Associations loaded by default
    pub include: Vec<Include>,
    /// Include every association and expose each as a sub-resource
    pub associations: bool,
    /// Apply a limit and report `Content-Range` on list
    pub pagination: bool,
    /// Page size when the request does not give one
    pub default_count: i64,
    /// Free-text search parameters
    pub search: Vec<SearchSpec>,
    /// Sort parameter
    pub sort: SortSpec,
    /// Association handling
    pub association_options: AssociationOptions,
    /// Method of the update route
    pub update_method: UpdateMethod,
    /// Re-read records after writes so includes are populated
    pub reload_instances: bool,
    default_search: bool,
}

impl Default for ResourceOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceOptions {
    /// Every action enabled, a `q` search and a `sort` parameter
    pub fn new() -> Self {
        Self {
            endpoints: None,
            actions: ActionKind::ALL.to_vec(),
            exclude_attributes: Vec::new(),
            include: Vec::new(),
            associations: false,
            pagination: true,
            default_count: DEFAULT_COUNT,
            search: vec![SearchSpec::default()],
            sort: SortSpec::default(),
            association_options: AssociationOptions::default(),
            update_method: UpdateMethod::Put,
            reload_instances: true,
            default_search: true,
        }
    }

    /// Options seeded from loaded configuration
    pub fn from_defaults(defaults: &ResourceDefaults) -> Self {
        Self {
            pagination: defaults.pagination,
            default_count: defaults.default_count,
            search: vec![SearchSpec::new(defaults.search_param.clone())],
            sort: SortSpec::new().with_param(defaults.sort_param.clone()),
            update_method: defaults.update_method.parse().unwrap_or_default(),
            reload_instances: defaults.reload_instances,
            ..Self::new()
        }
    }

    /// Set the plural and singular endpoint templates
    #[must_use]
    pub fn with_endpoints(mut self, plural: impl Into<String>, singular: impl Into<String>) -> Self {
        self.endpoints = Some((plural.into(), singular.into()));
        self
    }

    /// Enable only the given actions
    #[must_use]
    pub fn with_actions(mut self, actions: impl IntoIterator<Item = ActionKind>) -> Self {
        self.actions = actions.into_iter().collect();
        self
    }

    /// Hide columns from every response
    #[must_use]
    pub fn with_exclude_attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_attributes = attributes.into_iter().map(Into::into).collect();
        self
    }

    /// Hide columns of one association, in includes and in its sub-resource
    #[must_use]
    pub fn with_association_exclude<I, S>(mut self, alias: impl Into<String>, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.association_options
            .exclude_attributes
            .insert(alias.into(), attributes.into_iter().map(Into::into).collect());
        self
    }

    /// Load an association by default
    #[must_use]
    pub fn with_include(mut self, include: Include) -> Self {
        self.include.push(include);
        self
    }

    /// Include every association and expose each as a sub-resource
    #[must_use]
    pub fn with_associations(mut self, enabled: bool) -> Self {
        self.associations = enabled;
        self
    }

    /// Toggle pagination
    #[must_use]
    pub fn with_pagination(mut self, enabled: bool) -> Self {
        self.pagination = enabled;
        self
    }

    /// Page size when the request does not give one
    #[must_use]
    pub fn with_default_count(mut self, count: i64) -> Self {
        self.default_count = count;
        self
    }

    /// Add a search parameter; the first call replaces the default `q` search
    #[must_use]
    pub fn with_search(mut self, spec: SearchSpec) -> Self {
        if self.default_search {
            self.search.clear();
            self.default_search = false;
        }
        self.search.push(spec);
        self
    }

    /// Configure sorting
    #[must_use]
    pub fn with_sort(mut self, sort: SortSpec) -> Self {
        self.sort = sort;
        self
    }

    /// Strip foreign key columns from responses
    #[must_use]
    pub fn with_remove_foreign_keys(mut self, enabled: bool) -> Self {
        self.association_options.remove_foreign_keys = enabled;
        self
    }

    /// Method of the update route
    #[must_use]
    pub fn with_update_method(mut self, method: UpdateMethod) -> Self {
        self.update_method = method;
        self
    }

    /// Re-read records after writes
    #[must_use]
    pub fn with_reload_instances(mut self, enabled: bool) -> Self {
        self.reload_instances = enabled;
        self
    }
}

/// Plural and singular endpoints of a resource
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoints {
    /// Collection endpoint, e.g. `/users`
    pub plural: Endpoint,
    /// Member endpoint, e.g. `/users/:id`
    pub singular: Endpoint,
}

impl Endpoints {
    /// Endpoint an action is served on
    pub fn for_action(&self, kind: ActionKind) -> &Endpoint {
        match kind.plurality() {
            Plurality::Plural => &self.plural,
            Plurality::Singular => &self.singular,
        }
    }
}

/// Resolved configuration shared by every controller of a resource
#[derive(Debug, Clone)]
pub struct ResourceSettings {
    /// Model served by the resource
    pub model: Arc<dyn Model>,
    /// Endpoint templates
    pub endpoints: Endpoints,
    /// Columns returned by default
    pub attributes: Vec<String>,
    /// Columns stripped from write responses
    pub exclude_attributes: Vec<String>,
    /// Associations loaded by default
    pub include: Vec<Include>,
    /// Metadata of the associations in `include`
    pub associations_info: Vec<Association>,
    /// Apply a limit and report `Content-Range` on list
    pub pagination: bool,
    /// Page size when the request does not give one
    pub default_count: i64,
    /// Free-text search parameters
    pub search: Vec<SearchSpec>,
    /// Sort parameter
    pub sort: SortSpec,
    /// Association handling
    pub association_options: AssociationOptions,
    /// Method of the update route
    pub update_method: UpdateMethod,
    /// Re-read records after writes
    pub reload_instances: bool,
}

impl ResourceSettings {
    /// Model name, used in logs
    pub fn name(&self) -> &str {
        self.model.name()
    }

    /// Names of every model field
    pub fn field_names(&self) -> Vec<String> {
        self.model.fields().into_iter().map(|f| f.name).collect()
    }
}
