//! Field and association metadata

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use super::Model;

/// Storage type of a model field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// Variable length string
    String,
    /// Fixed length string
    Char,
    /// Unbounded text
    Text,
    /// 32-bit integer
    Integer,
    /// 64-bit integer
    BigInt,
    /// Floating point or decimal number
    Float,
    /// Boolean flag
    Boolean,
    /// Date or timestamp, stored as a string
    Date,
    /// Arbitrary JSON document
    Json,
}

impl FieldType {
    /// Whether the field holds text and can be matched with pattern operators
    pub const fn is_text(&self) -> bool {
        matches!(self, Self::String | Self::Char | Self::Text)
    }

    /// Whether the field holds a number
    pub const fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer | Self::BigInt | Self::Float)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::Char => write!(f, "char"),
            Self::Text => write!(f, "text"),
            Self::Integer => write!(f, "integer"),
            Self::BigInt => write!(f, "bigint"),
            Self::Float => write!(f, "float"),
            Self::Boolean => write!(f, "boolean"),
            Self::Date => write!(f, "date"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// A column of a model
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Column name
    pub name: String,
    /// Storage type
    pub field_type: FieldType,
    /// Whether this is the primary key
    pub primary_key: bool,
    /// Value used when a create omits the field
    pub default_value: Option<Value>,
}

impl Field {
    /// Create a plain field
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            primary_key: false,
            default_value: None,
        }
    }

    /// Mark the field as the primary key
    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Set the value used when a create omits the field
    #[must_use]
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }
}

/// Kind of relationship between two models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssociationKind {
    /// The source row holds a foreign key pointing at the target
    BelongsTo,
    /// The target row holds a foreign key pointing at the source (at most one)
    HasOne,
    /// The target rows hold a foreign key pointing at the source
    HasMany,
    /// Source and target are linked through a junction model
    BelongsToMany,
}

impl AssociationKind {
    /// Whether the association resolves to a single record
    pub const fn is_single(&self) -> bool {
        matches!(self, Self::BelongsTo | Self::HasOne)
    }
}

impl fmt::Display for AssociationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BelongsTo => write!(f, "belongs_to"),
            Self::HasOne => write!(f, "has_one"),
            Self::HasMany => write!(f, "has_many"),
            Self::BelongsToMany => write!(f, "belongs_to_many"),
        }
    }
}

/// Relationship metadata as reported by a model store
///
/// Key semantics depend on [`kind`](Self::kind):
///
/// | kind | `foreign_key` lives on | `other_key` |
/// |---|---|---|
/// | `BelongsTo` | source | unused |
/// | `HasOne` / `HasMany` | target | unused |
/// | `BelongsToMany` | junction, points at source | junction, points at target |
#[derive(Clone)]
pub struct Association {
    /// Relationship kind
    pub kind: AssociationKind,
    /// Name the association is exposed under
    pub alias: String,
    /// Name of the model declaring the association
    pub source: String,
    /// Primary key of the source model
    pub source_key: String,
    /// Target model
    pub target: Arc<dyn Model>,
    /// Primary key of the target model
    pub target_key: String,
    /// Foreign key column
    pub foreign_key: String,
    /// Junction column pointing at the target (many-to-many only)
    pub other_key: Option<String>,
    /// Junction model name (many-to-many only)
    pub through: Option<String>,
    /// Alias of the reverse association on the target model (many-to-many only)
    pub paired: Option<String>,
}

impl Association {
    /// The reverse association declared on the target model, if any
    ///
    /// A many-to-many association is paired with the target's association that
    /// runs through the same junction model back to this source.
    pub fn find_paired(&self) -> Option<Association> {
        let candidates = self.target.associations();
        if let Some(alias) = &self.paired {
            return candidates.into_iter().find(|a| &a.alias == alias);
        }
        candidates.into_iter().find(|a| {
            a.kind == AssociationKind::BelongsToMany
                && a.target.name() == self.source
                && a.through.is_some()
                && a.through == self.through
                && a.paired.as_deref().map_or(true, |p| p == self.alias)
        })
    }
}

impl fmt::Debug for Association {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Association")
            .field("kind", &self.kind)
            .field("alias", &self.alias)
            .field("source", &self.source)
            .field("target", &self.target.name())
            .field("foreign_key", &self.foreign_key)
            .field("other_key", &self.other_key)
            .field("through", &self.through)
            .finish()
    }
}
