//! In-memory model store
//!
//! [`MemoryDb`] keeps every table in process memory and implements the full
//! [`Model`] contract: where-tree evaluation including `LIKE` patterns,
//! ordering, paging, includes for all four association kinds (filtered
//! includes drop parents without matches), nested creation, named scopes and
//! grouped counts. It backs the test suite and is handy for prototyping an
//! API before a real store exists.
//!
//! # Example
//!
//! ```rust
//! use acton_rest::memory::{MemoryDb, ModelDef};
//! use acton_rest::model::FieldType;
//! use serde_json::json;
//!
//! let db = MemoryDb::new();
//! db.define(
//!     ModelDef::new("users")
//!         .field("id", FieldType::Integer)
//!         .field("username", FieldType::String),
//! );
//! let row = db.insert("users", json!({"username": "arthur"})).unwrap();
//! assert_eq!(row["id"], json!(1));
//! ```

mod def;
mod eval;
mod model;
mod store;

pub use def::{AssociationDef, ModelDef};

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::Value;

use crate::model::{Model, Record, StoreError, StoreOperation, StoreResult};
use model::MemoryModel;
use store::State;

/// Shared handle to a set of in-memory tables
///
/// Clones share the same tables.
#[derive(Clone, Default)]
pub struct MemoryDb {
    state: Arc<RwLock<State>>,
}

impl MemoryDb {
    /// An empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a table definition and return its model handle
    pub fn define(&self, def: ModelDef) -> Arc<dyn Model> {
        let name = def.name.clone();
        {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            state.tables.entry(name.clone()).or_default();
            state.defs.insert(name.clone(), Arc::new(def));
        }
        tracing::debug!(model = %name, "Defined in-memory model");
        self.model(&name)
    }

    /// Model handle for a table
    ///
    /// Handles are cheap and may be taken before the table is defined;
    /// queries against an undefined table fail with a store error.
    pub fn model(&self, name: &str) -> Arc<dyn Model> {
        Arc::new(MemoryModel {
            db: self.clone(),
            name: name.to_string(),
        })
    }

    /// Insert a row without nested associations, for seeding
    pub fn insert(&self, name: &str, row: Value) -> StoreResult<Record> {
        let Some(values) = Record::from_json(row) else {
            return Err(StoreError::validation_failed(
                StoreOperation::Create,
                "Row must be a JSON object",
            )
            .with_model(name));
        };
        let mut state = self.write(StoreOperation::Create)?;
        state.insert(name, values, &[])
    }

    /// Every stored row of a table, in insertion order
    pub fn rows(&self, name: &str) -> Vec<Record> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state
            .tables
            .get(name)
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    fn def(&self, name: &str) -> Option<Arc<ModelDef>> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.defs.get(name).cloned()
    }

    fn read(&self, operation: StoreOperation) -> StoreResult<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| StoreError::database_error(operation, "Lock poisoned"))
    }

    fn write(&self, operation: StoreOperation) -> StoreResult<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| StoreError::database_error(operation, "Lock poisoned"))
    }
}

impl std::fmt::Debug for MemoryDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        let mut tables: Vec<&String> = state.defs.keys().collect();
        tables.sort();
        f.debug_struct("MemoryDb").field("tables", &tables).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        Condition, Criteria, FieldType, Include, IncludeNode, Operator, OrderDirection,
        OrderTarget, OrderTerm, Projection, QueryOptions, StoreErrorKind, WriteOptions,
    };
    use serde_json::json;

    fn seeded() -> MemoryDb {
        let db = MemoryDb::new();
        db.define(
            ModelDef::new("users")
                .field("id", FieldType::Integer)
                .field("username", FieldType::String)
                .field("active", FieldType::Boolean)
                .has_many("tasks", "tasks", "user_id")
                .belongs_to_many("groups", "groups", "memberships", "user_id", "group_id")
                .scope("active", Criteria::new().with("active", true)),
        );
        db.define(
            ModelDef::new("tasks")
                .field("id", FieldType::Integer)
                .field("name", FieldType::String)
                .field("user_id", FieldType::Integer)
                .belongs_to("owner", "users", "user_id"),
        );
        db.define(
            ModelDef::new("groups")
                .field("id", FieldType::Integer)
                .field("title", FieldType::String)
                .belongs_to_many("members", "users", "memberships", "group_id", "user_id"),
        );
        db.define(
            ModelDef::new("memberships")
                .field("id", FieldType::Integer)
                .field("user_id", FieldType::Integer)
                .field("group_id", FieldType::Integer),
        );

        for (name, active) in [("arthur", true), ("james", false), ("henry", true)] {
            db.insert("users", json!({"username": name, "active": active}))
                .unwrap();
        }
        for (name, user) in [("eat", 1), ("sleep", 1), ("run", 1), ("read", 2)] {
            db.insert("tasks", json!({"name": name, "user_id": user}))
                .unwrap();
        }
        db.insert("groups", json!({"title": "admins"})).unwrap();
        db.insert("memberships", json!({"user_id": 1, "group_id": 1}))
            .unwrap();
        db
    }

    #[tokio::test]
    async fn test_auto_increment_and_missing_fields() {
        let db = seeded();
        let rows = db.rows("users");
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2]["id"], json!(3));

        let row = db.insert("tasks", json!({"name": "x"})).unwrap();
        assert_eq!(row["user_id"], Value::Null);
    }

    #[tokio::test]
    async fn test_duplicate_primary_key() {
        let db = seeded();
        let err = db.insert("users", json!({"id": 1, "username": "dup"})).unwrap_err();
        assert_eq!(err.kind, StoreErrorKind::ConstraintViolation);
    }

    #[tokio::test]
    async fn test_distinct_count_with_includes() {
        let db = seeded();
        let users = db.model("users");
        let mut options = QueryOptions {
            criteria: Criteria::new().with("id", 1),
            include: vec![Include::Alias("tasks".into())],
            ..QueryOptions::default()
        };
        let (rows, joined) = users.find_and_count(&options).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["tasks"].as_array().unwrap().len(), 3);
        assert_eq!(joined, 3);

        options.distinct = true;
        let (_, total) = users.find_and_count(&options).await.unwrap();
        assert_eq!(total, 1);
    }

    #[tokio::test]
    async fn test_filtered_include_drops_parents() {
        let db = seeded();
        let users = db.model("users");
        let tasks = IncludeNode::new("tasks", db.model("tasks"))
            .with_criteria(Criteria::new().with("name", "read"));
        let options = QueryOptions {
            include: vec![Include::Node(tasks)],
            distinct: true,
            ..QueryOptions::default()
        };
        let (rows, total) = users.find_and_count(&options).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(rows[0]["username"], json!("james"));
    }

    #[tokio::test]
    async fn test_belongs_to_and_many_to_many_includes() {
        let db = seeded();
        let task = db
            .model("tasks")
            .find_one(&QueryOptions {
                criteria: Criteria::new().with("id", 1),
                include: vec![Include::Alias("owner".into())],
                ..QueryOptions::default()
            })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(task["owner"]["username"], json!("arthur"));

        let orphan = db.insert("tasks", json!({"name": "lost"})).unwrap();
        let orphan = db
            .model("tasks")
            .reload(&orphan, &QueryOptions {
                include: vec![Include::Alias("owner".into())],
                ..QueryOptions::default()
            })
            .await
            .unwrap();
        assert_eq!(orphan["owner"], Value::Null);

        let user = db
            .model("users")
            .find_one(&QueryOptions {
                criteria: Criteria::new().with("id", 1),
                include: vec![Include::Alias("groups".into())],
                ..QueryOptions::default()
            })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user["groups"][0]["title"], json!("admins"));
        assert_eq!(user["groups"][0]["memberships"]["group_id"], json!(1));
    }

    #[tokio::test]
    async fn test_scope_order_paging_and_projection() {
        let db = seeded();
        let users = db.model("users");
        let options = QueryOptions {
            scope: Some("active".into()),
            order: vec![OrderTerm {
                target: OrderTarget::Column("username".into()),
                direction: OrderDirection::Desc,
            }],
            offset: Some(1),
            limit: Some(1),
            attributes: Some(Projection::Only(vec!["username".into()])),
            ..QueryOptions::default()
        };
        let (rows, total) = users.find_and_count(&options).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(rows, vec![Record::new().with("username", "arthur")]);

        let unknown = QueryOptions {
            scope: Some("missing".into()),
            ..QueryOptions::default()
        };
        let err = users.find_all(&unknown).await.unwrap_err();
        assert_eq!(err.kind, StoreErrorKind::ValidationFailed);
    }

    #[tokio::test]
    async fn test_search_patterns_and_grouping() {
        let db = seeded();
        let tasks = db.model("tasks");
        let mut criteria = Criteria::new();
        criteria.push(Condition::compare("name", Operator::Like, "%ea%"));
        let rows = tasks
            .find_all(&QueryOptions {
                criteria,
                ..QueryOptions::default()
            })
            .await
            .unwrap();
        let names: Vec<_> = rows.iter().map(|r| r["name"].clone()).collect();
        assert_eq!(names, vec![json!("eat"), json!("read")]);

        let grouped = tasks
            .find_all(&QueryOptions {
                group: vec!["user_id".into()],
                ..QueryOptions::default()
            })
            .await
            .unwrap();
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0]["count"], json!(3));
        assert_eq!(tasks.count(&QueryOptions::default()).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_nested_create() {
        let db = seeded();
        let users = db.model("users");
        let values = Record::from_json(json!({
            "username": "lancelot",
            "tasks": [{"name": "joust"}, {"name": "quest"}],
            "groups": [{"title": "knights"}]
        }))
        .unwrap();
        let options = WriteOptions {
            include: vec![Include::Alias("tasks".into()), Include::Alias("groups".into())],
            transaction: None,
        };
        let created = users.create(values, &options).await.unwrap();
        assert_eq!(created["id"], json!(4));
        assert_eq!(created["tasks"][1]["user_id"], json!(4));
        assert_eq!(db.rows("memberships").len(), 2);
        assert_eq!(db.rows("groups")[1]["title"], json!("knights"));
    }

    #[tokio::test]
    async fn test_update_and_destroy() {
        let db = seeded();
        let users = db.model("users");
        let arthur = db.rows("users")[0].clone().with("tasks", json!([]));
        let updated = users
            .update(&arthur, Record::new().with("username", "king").with("bogus", 1), None)
            .await
            .unwrap();
        assert_eq!(updated["username"], json!("king"));
        assert_eq!(updated["tasks"], json!([]));
        assert!(updated.get("bogus").is_none());
        assert_eq!(db.rows("users")[0]["username"], json!("king"));

        users.destroy(&arthur, None).await.unwrap();
        assert_eq!(db.rows("users").len(), 2);
        let err = users.destroy(&arthur, None).await.unwrap_err();
        assert_eq!(err.kind, StoreErrorKind::NotFound);
    }
}
