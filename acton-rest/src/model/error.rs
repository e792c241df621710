//! Store error types
//!
//! Errors raised by a [`Model`](super::Model) implementation. The handler layer
//! converts these into [`ApiError`](crate::handlers::ApiError) values, hiding
//! internal details from clients while keeping the original error as the cause.
//!
//! # Example
//!
//! ```rust
//! use acton_rest::model::{StoreError, StoreErrorKind};
//!
//! let error = StoreError::not_found("users", "42");
//! assert!(matches!(error.kind, StoreErrorKind::NotFound));
//! assert_eq!(error.record_id.as_deref(), Some("42"));
//! ```

use std::fmt;

/// Operation being performed when the store error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    /// Querying several records
    FindAll,
    /// Querying a single record
    FindOne,
    /// Counting matching records
    Count,
    /// Inserting a record (and nested records)
    Create,
    /// Saving changes to a record
    Update,
    /// Removing a record
    Destroy,
    /// Re-reading a record after a write
    Reload,
}

impl fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FindAll => write!(f, "find_all"),
            Self::FindOne => write!(f, "find_one"),
            Self::Count => write!(f, "count"),
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Destroy => write!(f, "destroy"),
            Self::Reload => write!(f, "reload"),
        }
    }
}

/// Category of store error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreErrorKind {
    /// Record was not found
    NotFound,
    /// Unique, foreign key or check constraint violated
    ConstraintViolation,
    /// Model-level validation rejected the values
    ValidationFailed,
    /// Could not reach the backing database
    ConnectionFailed,
    /// Operation timed out
    Timeout,
    /// Underlying database error
    DatabaseError,
    /// Other unclassified error
    Other,
}

impl fmt::Display for StoreErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::ConstraintViolation => write!(f, "constraint_violation"),
            Self::ValidationFailed => write!(f, "validation_failed"),
            Self::ConnectionFailed => write!(f, "connection_failed"),
            Self::Timeout => write!(f, "timeout"),
            Self::DatabaseError => write!(f, "database_error"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Structured store error with operation context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreError {
    /// The operation being performed when the error occurred
    pub operation: StoreOperation,
    /// The category of error
    pub kind: StoreErrorKind,
    /// Human-readable error message
    pub message: String,
    /// The model involved (e.g., "users")
    pub model: Option<String>,
    /// The primary key of the record involved
    pub record_id: Option<String>,
}

impl StoreError {
    /// Create a new store error
    pub fn new(operation: StoreOperation, kind: StoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
            model: None,
            record_id: None,
        }
    }

    /// Create a "not found" error for a specific record
    pub fn not_found(model: impl Into<String>, record_id: impl Into<String>) -> Self {
        Self {
            operation: StoreOperation::FindOne,
            kind: StoreErrorKind::NotFound,
            message: "Record not found".to_string(),
            model: Some(model.into()),
            record_id: Some(record_id.into()),
        }
    }

    /// Create a constraint violation error
    pub fn constraint_violation(operation: StoreOperation, message: impl Into<String>) -> Self {
        Self::new(operation, StoreErrorKind::ConstraintViolation, message)
    }

    /// Create a validation error
    pub fn validation_failed(operation: StoreOperation, message: impl Into<String>) -> Self {
        Self::new(operation, StoreErrorKind::ValidationFailed, message)
    }

    /// Create a database error
    pub fn database_error(operation: StoreOperation, message: impl Into<String>) -> Self {
        Self::new(operation, StoreErrorKind::DatabaseError, message)
    }

    /// Attach the model name
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the operation that caused the error
    #[must_use]
    pub fn with_operation(mut self, operation: StoreOperation) -> Self {
        self.operation = operation;
        self
    }

    /// Whether the error reflects bad input rather than a server fault
    pub fn is_client_error(&self) -> bool {
        matches!(
            self.kind,
            StoreErrorKind::NotFound
                | StoreErrorKind::ConstraintViolation
                | StoreErrorKind::ValidationFailed
        )
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Store {} error during {}: {}",
            self.kind, self.operation, self.message
        )?;
        match (&self.model, &self.record_id) {
            (Some(model), Some(id)) => write!(f, " [{}: {}]", model, id)?,
            (Some(model), None) => write!(f, " [{}]", model)?,
            _ => {}
        }
        Ok(())
    }
}

impl std::error::Error for StoreError {}

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_record() {
        let error = StoreError::not_found("users", "7");
        let display = error.to_string();
        assert!(display.contains("not_found"));
        assert!(display.contains("find_one"));
        assert!(display.contains("[users: 7]"));
    }

    #[test]
    fn test_display_with_model_only() {
        let error = StoreError::database_error(StoreOperation::Create, "disk full")
            .with_model("tasks");
        assert!(error.to_string().ends_with("[tasks]"));
    }

    #[test]
    fn test_client_error_classification() {
        assert!(StoreError::not_found("users", "1").is_client_error());
        assert!(StoreError::validation_failed(StoreOperation::Create, "bad").is_client_error());
        assert!(!StoreError::database_error(StoreOperation::Count, "boom").is_client_error());
    }

    #[test]
    fn test_with_operation() {
        let error = StoreError::not_found("users", "1").with_operation(StoreOperation::Reload);
        assert_eq!(error.operation, StoreOperation::Reload);
    }
}
