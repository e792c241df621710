//! The model store contract
//!
//! A [`Model`] describes one table: its fields, its associations, and the
//! query and write operations the generated endpoints call. Resources hold
//! models as `Arc<dyn Model>`, so the trait uses `async_trait` rather than
//! return-position `impl Future`.
//!
//! # Example
//!
//! ```rust,ignore
//! use acton_rest::model::{Model, QueryOptions, StoreResult, Record};
//!
//! #[async_trait::async_trait]
//! impl Model for UserTable {
//!     fn name(&self) -> &str { "users" }
//!
//!     async fn find_one(&self, options: &QueryOptions) -> StoreResult<Option<Record>> {
//!         // translate options into SQL and run it
//!         todo!()
//!     }
//!     // ... other required methods
//! }
//! ```

use std::fmt;

use async_trait::async_trait;

use super::error::StoreResult;
use super::query::{QueryOptions, Transaction, WriteOptions};
use super::record::Record;
use super::types::{Association, Field};

/// A table exposed through generated endpoints
#[async_trait]
pub trait Model: Send + Sync + 'static {
    /// Table name, e.g. `users`
    fn name(&self) -> &str;

    /// Singular display name, e.g. `user`
    fn singular_name(&self) -> String;

    /// Plural display name, e.g. `users`
    fn plural_name(&self) -> String;

    /// Column metadata, in declaration order
    fn fields(&self) -> Vec<Field>;

    /// Look up one column
    fn field(&self, name: &str) -> Option<Field> {
        self.fields().into_iter().find(|f| f.name == name)
    }

    /// Whether the model has a column named `name`
    fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// Name of the primary key column
    fn primary_key(&self) -> String {
        self.fields()
            .into_iter()
            .find(|f| f.primary_key)
            .map_or_else(|| "id".to_string(), |f| f.name)
    }

    /// Relationships declared on this model
    fn associations(&self) -> Vec<Association>;

    /// Look up a relationship by alias
    fn association(&self, alias: &str) -> Option<Association> {
        self.associations().into_iter().find(|a| a.alias == alias)
    }

    /// Matching rows for the page described by `options`, plus the total match count
    ///
    /// The count ignores `offset`/`limit` and counts distinct primary keys when
    /// `options.distinct` is set.
    async fn find_and_count(&self, options: &QueryOptions) -> StoreResult<(Vec<Record>, u64)>;

    /// Matching rows
    async fn find_all(&self, options: &QueryOptions) -> StoreResult<Vec<Record>>;

    /// Number of rows matching `options.criteria` within `options.scope`
    async fn count(&self, options: &QueryOptions) -> StoreResult<u64>;

    /// The first matching row
    async fn find_one(&self, options: &QueryOptions) -> StoreResult<Option<Record>>;

    /// Insert a row, creating nested rows for every included association present in `values`
    async fn create(&self, values: Record, options: &WriteOptions) -> StoreResult<Record>;

    /// Apply `changes` to `instance` and save
    async fn update(
        &self,
        instance: &Record,
        changes: Record,
        transaction: Option<&Transaction>,
    ) -> StoreResult<Record>;

    /// Delete `instance`
    async fn destroy(&self, instance: &Record, transaction: Option<&Transaction>)
        -> StoreResult<()>;

    /// Re-read `instance` with the given includes and projection
    async fn reload(&self, instance: &Record, options: &QueryOptions) -> StoreResult<Record>;
}

impl fmt::Debug for dyn Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Model({})", self.name())
    }
}
