//! Model store abstraction
//!
//! Generated endpoints never talk to a database directly. They build
//! [`QueryOptions`] and hand them to a [`Model`], which owns schema metadata,
//! association metadata and query execution.
//!
//! # Features
//!
//! - **Records**: [`Record`], a JSON object row
//! - **Metadata**: [`Field`], [`FieldType`], [`Association`]
//! - **Queries**: [`QueryOptions`], [`Criteria`], [`Condition`], [`Include`]
//! - **Errors**: [`StoreError`] with operation and kind context

mod error;
mod query;
mod record;
mod traits;
mod types;

pub use error::{StoreError, StoreErrorKind, StoreOperation, StoreResult};
pub use query::{
    Condition, Criteria, Include, IncludeNode, Operator, OrderDirection, OrderTarget, OrderTerm,
    Projection, QueryOptions, Transaction, WriteOptions,
};
pub use record::Record;
pub use traits::Model;
pub use types::{Association, AssociationKind, Field, FieldType};
