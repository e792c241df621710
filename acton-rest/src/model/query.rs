//! Query option types understood by a model store
//!
//! These are store-agnostic: the criteria builder produces them from request
//! parameters and a [`Model`](super::Model) implementation executes them.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use super::Model;

/// Comparison operator of a where-clause predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// Equal (an array value matches any element, `null` matches null)
    Eq,
    /// Not equal
    Ne,
    /// Greater than
    Gt,
    /// Greater than or equal
    Gte,
    /// Less than
    Lt,
    /// Less than or equal
    Lte,
    /// SQL `LIKE` pattern
    Like,
    /// SQL `NOT LIKE` pattern
    NotLike,
    /// Case-insensitive `LIKE`
    ILike,
    /// Case-insensitive `NOT LIKE`
    NotILike,
    /// Member of an array value
    In,
    /// Not a member of an array value
    NotIn,
    /// `IS` comparison, used for `null` and booleans
    Is,
    /// Text contains the operand
    Substring,
    /// Text starts with the operand
    StartsWith,
    /// Text ends with the operand
    EndsWith,
}

impl Operator {
    /// Whether the operator matches text patterns
    pub const fn is_pattern(&self) -> bool {
        matches!(self, Self::Like | Self::NotLike | Self::ILike | Self::NotILike)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::Like => "like",
            Self::NotLike => "not_like",
            Self::ILike => "ilike",
            Self::NotILike => "not_ilike",
            Self::In => "in",
            Self::NotIn => "not_in",
            Self::Is => "is",
            Self::Substring => "substring",
            Self::StartsWith => "starts_with",
            Self::EndsWith => "ends_with",
        };
        f.write_str(symbol)
    }
}

/// A node of a where-clause tree
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `field <op> value`
    Compare {
        /// Column, or a dotted path into an included model
        field: String,
        /// Comparison operator
        op: Operator,
        /// Operand
        value: Value,
    },
    /// Every child must hold
    And(Vec<Condition>),
    /// At least one child must hold
    Or(Vec<Condition>),
}

impl Condition {
    /// `field = value`
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, Operator::Eq, value)
    }

    /// `field <op> value`
    pub fn compare(field: impl Into<String>, op: Operator, value: impl Into<Value>) -> Self {
        Self::Compare {
            field: field.into(),
            op,
            value: value.into(),
        }
    }
}

/// A conjunction of conditions
///
/// Top-level equality conditions behave like a keyed map: [`Criteria::set`]
/// replaces an existing equality on the same field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Criteria {
    conditions: Vec<Condition>,
}

impl Criteria {
    /// Empty criteria, matching every row
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether there are no conditions
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// The top-level conditions
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// AND another condition onto the criteria
    pub fn push(&mut self, condition: Condition) {
        self.conditions.push(condition);
    }

    /// Set `field = value`, replacing any previous top-level equality on `field`
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        let field = field.into();
        let value = value.into();
        for condition in &mut self.conditions {
            if let Condition::Compare {
                field: existing,
                op: Operator::Eq,
                value: current,
            } = condition
            {
                if *existing == field {
                    *current = value;
                    return;
                }
            }
        }
        self.conditions.push(Condition::eq(field, value));
    }

    /// Builder form of [`set`](Self::set)
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    /// The value of a top-level equality on `field`
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.conditions.iter().find_map(|condition| match condition {
            Condition::Compare {
                field: f,
                op: Operator::Eq,
                value,
            } if f == field => Some(value),
            _ => None,
        })
    }

    /// Whether a top-level comparison targets `field`
    pub fn contains_field(&self, field: &str) -> bool {
        self.fields().any(|f| f == field)
    }

    /// Names of fields targeted by top-level comparisons
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.conditions.iter().filter_map(|condition| match condition {
            Condition::Compare { field, .. } => Some(field.as_str()),
            _ => None,
        })
    }

    /// Collapse into a single condition tree
    pub fn into_condition(self) -> Condition {
        Condition::And(self.conditions)
    }
}

/// What an order term sorts by
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderTarget {
    /// A column of the queried model
    Column(String),
    /// An opaque reference passed through to the store, e.g. `user.name`
    Literal(String),
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderDirection {
    /// Ascending
    Asc,
    /// Descending
    Desc,
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asc => write!(f, "ASC"),
            Self::Desc => write!(f, "DESC"),
        }
    }
}

/// One `ORDER BY` entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderTerm {
    /// Column or literal to sort by
    pub target: OrderTarget,
    /// Direction
    pub direction: OrderDirection,
}

/// Which columns a query returns
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    /// Only the listed columns
    Only(Vec<String>),
    /// Every column except the listed ones
    Exclude(Vec<String>),
}

impl Projection {
    /// Whether `field` survives the projection
    pub fn allows(&self, field: &str) -> bool {
        match self {
            Self::Only(fields) => fields.iter().any(|f| f == field),
            Self::Exclude(fields) => !fields.iter().any(|f| f == field),
        }
    }

    /// Drop `fields` from the projection
    pub fn without(&self, fields: &[String]) -> Self {
        match self {
            Self::Only(kept) => Self::Only(
                kept.iter()
                    .filter(|f| !fields.contains(f))
                    .cloned()
                    .collect(),
            ),
            Self::Exclude(excluded) => {
                let mut excluded = excluded.clone();
                for field in fields {
                    if !excluded.contains(field) {
                        excluded.push(field.clone());
                    }
                }
                Self::Exclude(excluded)
            }
        }
    }
}

/// An association to load alongside the queried rows
#[derive(Debug, Clone, PartialEq)]
pub enum Include {
    /// Load the association with this alias using its defaults
    Alias(String),
    /// Fully described include
    Node(IncludeNode),
}

impl Include {
    /// Alias the include is exposed under
    pub fn alias(&self) -> &str {
        match self {
            Self::Alias(alias) => alias,
            Self::Node(node) => &node.alias,
        }
    }

    /// Whether the include survives shallow pruning regardless of `children`
    pub fn is_pinned(&self) -> bool {
        matches!(self, Self::Node(node) if node.pinned)
    }
}

/// Include descriptor
///
/// The model handle is shared by reference; the filter tree, projection and
/// nested includes are owned and deep-copied on clone.
#[derive(Debug, Clone)]
pub struct IncludeNode {
    /// Association alias
    pub alias: String,
    /// Target model
    pub model: Arc<dyn Model>,
    /// Conditions on the included rows; non-empty criteria filter the parent
    /// rows down to those with at least one matching child
    pub criteria: Criteria,
    /// Columns returned for included rows
    pub attributes: Option<Projection>,
    /// Nested includes
    pub include: Vec<Include>,
    /// Kept when shallow mode prunes includes
    pub pinned: bool,
}

impl IncludeNode {
    /// Describe an include of `model` under `alias`
    pub fn new(alias: impl Into<String>, model: Arc<dyn Model>) -> Self {
        Self {
            alias: alias.into(),
            model,
            criteria: Criteria::new(),
            attributes: None,
            include: Vec::new(),
            pinned: false,
        }
    }

    /// Filter the included rows
    #[must_use]
    pub fn with_criteria(mut self, criteria: Criteria) -> Self {
        self.criteria = criteria;
        self
    }

    /// Restrict the included columns
    #[must_use]
    pub fn with_attributes(mut self, attributes: Projection) -> Self {
        self.attributes = Some(attributes);
        self
    }

    /// Add nested includes
    #[must_use]
    pub fn with_include(mut self, include: Vec<Include>) -> Self {
        self.include = include;
        self
    }

    /// Keep this include when shallow mode prunes children
    #[must_use]
    pub fn pinned(mut self) -> Self {
        self.pinned = true;
        self
    }
}

impl PartialEq for IncludeNode {
    fn eq(&self, other: &Self) -> bool {
        self.alias == other.alias
            && self.model.name() == other.model.name()
            && self.criteria == other.criteria
            && self.attributes == other.attributes
            && self.include == other.include
            && self.pinned == other.pinned
    }
}

/// Opaque store transaction threaded through a request
#[derive(Clone)]
pub struct Transaction(Arc<dyn Any + Send + Sync>);

impl Transaction {
    /// Wrap a store-specific transaction handle
    pub fn new<T: Any + Send + Sync>(handle: T) -> Self {
        Self(Arc::new(handle))
    }

    /// Borrow the handle as its concrete type
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Transaction(..)")
    }
}

impl PartialEq for Transaction {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Options for a read query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOptions {
    /// Columns to return; `None` returns every column
    pub attributes: Option<Projection>,
    /// Where clause
    pub criteria: Criteria,
    /// Ordering
    pub order: Vec<OrderTerm>,
    /// Rows to skip
    pub offset: Option<u64>,
    /// Maximum rows to return
    pub limit: Option<u64>,
    /// Associations to load
    pub include: Vec<Include>,
    /// Count distinct primary keys instead of joined rows
    pub distinct: bool,
    /// Group-by columns
    pub group: Vec<String>,
    /// Named scope to apply
    pub scope: Option<String>,
    /// Transaction to run in
    pub transaction: Option<Transaction>,
}

/// Options for a create
#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    /// Associations whose nested payloads are created alongside the record
    pub include: Vec<Include>,
    /// Transaction to run in
    pub transaction: Option<Transaction>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_criteria_set_replaces_equality() {
        let mut criteria = Criteria::new();
        criteria.set("id", 1);
        criteria.set("name", "a");
        criteria.set("id", 2);
        assert_eq!(criteria.conditions().len(), 2);
        assert_eq!(criteria.get("id"), Some(&json!(2)));
    }

    #[test]
    fn test_criteria_set_keeps_non_equality_conditions() {
        let mut criteria = Criteria::new();
        criteria.push(Condition::compare("id", Operator::Gt, 3));
        criteria.set("id", 5);
        assert_eq!(criteria.conditions().len(), 2);
        assert!(criteria.contains_field("id"));
    }

    #[test]
    fn test_criteria_fields_skip_groups() {
        let mut criteria = Criteria::new().with("user_id", 1);
        criteria.push(Condition::Or(vec![Condition::eq("name", "x")]));
        assert_eq!(criteria.fields().collect::<Vec<_>>(), vec!["user_id"]);
    }

    #[test]
    fn test_projection_without() {
        let only = Projection::Only(vec!["id".into(), "user_id".into(), "name".into()]);
        assert_eq!(
            only.without(&["user_id".to_string()]),
            Projection::Only(vec!["id".into(), "name".into()])
        );

        let exclude = Projection::Exclude(vec!["secret".into()]);
        let widened = exclude.without(&["user_id".to_string()]);
        assert!(!widened.allows("secret"));
        assert!(!widened.allows("user_id"));
        assert!(widened.allows("id"));
    }

    #[test]
    fn test_pattern_operators() {
        assert!(Operator::Like.is_pattern());
        assert!(Operator::NotILike.is_pattern());
        assert!(!Operator::Eq.is_pattern());
        assert!(!Operator::In.is_pattern());
        assert!(!Operator::Substring.is_pattern());
        assert_eq!(Operator::StartsWith.to_string(), "starts_with");
    }

    #[test]
    fn test_transaction_identity() {
        let tx = Transaction::new(42_u32);
        let same = tx.clone();
        assert_eq!(tx, same);
        assert_ne!(tx, Transaction::new(42_u32));
        assert_eq!(tx.downcast_ref::<u32>(), Some(&42));
    }
}
