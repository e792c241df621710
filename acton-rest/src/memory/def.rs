//! Table definitions for the in-memory store

use std::collections::BTreeMap;

use crate::model::{AssociationKind, Criteria, Field, FieldType};

/// Relationship declared on a [`ModelDef`], resolved against the store when queried
#[derive(Debug, Clone, PartialEq)]
pub struct AssociationDef {
    /// Relationship kind
    pub kind: AssociationKind,
    /// Alias the association is exposed under
    pub alias: String,
    /// Target table name
    pub target: String,
    /// Foreign key column
    pub foreign_key: String,
    /// Junction column pointing at the target (many-to-many only)
    pub other_key: Option<String>,
    /// Junction table (many-to-many only)
    pub through: Option<String>,
    /// Alias of the reverse many-to-many association on the target
    pub paired: Option<String>,
}

impl AssociationDef {
    fn new(
        kind: AssociationKind,
        alias: impl Into<String>,
        target: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            alias: alias.into(),
            target: target.into(),
            foreign_key: foreign_key.into(),
            other_key: None,
            through: None,
            paired: None,
        }
    }

    /// This table holds `foreign_key` pointing at `target`
    pub fn belongs_to(
        alias: impl Into<String>,
        target: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self::new(AssociationKind::BelongsTo, alias, target, foreign_key)
    }

    /// At most one `target` row holds `foreign_key` pointing here
    pub fn has_one(
        alias: impl Into<String>,
        target: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self::new(AssociationKind::HasOne, alias, target, foreign_key)
    }

    /// `target` rows hold `foreign_key` pointing here
    pub fn has_many(
        alias: impl Into<String>,
        target: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self::new(AssociationKind::HasMany, alias, target, foreign_key)
    }

    /// Rows of `through` link this table (`foreign_key`) to `target` (`other_key`)
    pub fn belongs_to_many(
        alias: impl Into<String>,
        target: impl Into<String>,
        through: impl Into<String>,
        foreign_key: impl Into<String>,
        other_key: impl Into<String>,
    ) -> Self {
        let mut def = Self::new(AssociationKind::BelongsToMany, alias, target, foreign_key);
        def.through = Some(through.into());
        def.other_key = Some(other_key.into());
        def
    }

    /// Name the reverse association explicitly
    #[must_use]
    pub fn paired(mut self, alias: impl Into<String>) -> Self {
        self.paired = Some(alias.into());
        self
    }
}

/// Schema of one in-memory table
///
/// ```rust
/// use acton_rest::memory::ModelDef;
/// use acton_rest::model::FieldType;
///
/// let users = ModelDef::new("users")
///     .field("id", FieldType::Integer)
///     .field("username", FieldType::String)
///     .has_many("tasks", "tasks", "user_id");
/// assert_eq!(users.primary_key(), "id");
/// ```
#[derive(Debug, Clone, Default)]
pub struct ModelDef {
    pub(crate) name: String,
    pub(crate) singular: Option<String>,
    pub(crate) plural: Option<String>,
    pub(crate) fields: Vec<Field>,
    pub(crate) associations: Vec<AssociationDef>,
    pub(crate) scopes: BTreeMap<String, Criteria>,
}

impl ModelDef {
    /// An empty table definition
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Add a column; a column named `id` becomes the primary key unless one is set
    #[must_use]
    pub fn field(self, name: impl Into<String>, field_type: FieldType) -> Self {
        let name = name.into();
        let mut field = Field::new(name.clone(), field_type);
        if name == "id" && !self.fields.iter().any(|f| f.primary_key) {
            field = field.primary_key();
        }
        self.with_field(field)
    }

    /// Add a fully described column
    #[must_use]
    pub fn with_field(mut self, field: Field) -> Self {
        if field.primary_key {
            for existing in &mut self.fields {
                existing.primary_key = false;
            }
        }
        self.fields.push(field);
        self
    }

    /// Override the singular display name
    #[must_use]
    pub fn singular(mut self, name: impl Into<String>) -> Self {
        self.singular = Some(name.into());
        self
    }

    /// Override the plural display name
    #[must_use]
    pub fn plural(mut self, name: impl Into<String>) -> Self {
        self.plural = Some(name.into());
        self
    }

    /// Declare a relationship
    #[must_use]
    pub fn association(mut self, association: AssociationDef) -> Self {
        self.associations.push(association);
        self
    }

    /// Shorthand for [`AssociationDef::belongs_to`]
    #[must_use]
    pub fn belongs_to(self, alias: &str, target: &str, foreign_key: &str) -> Self {
        self.association(AssociationDef::belongs_to(alias, target, foreign_key))
    }

    /// Shorthand for [`AssociationDef::has_one`]
    #[must_use]
    pub fn has_one(self, alias: &str, target: &str, foreign_key: &str) -> Self {
        self.association(AssociationDef::has_one(alias, target, foreign_key))
    }

    /// Shorthand for [`AssociationDef::has_many`]
    #[must_use]
    pub fn has_many(self, alias: &str, target: &str, foreign_key: &str) -> Self {
        self.association(AssociationDef::has_many(alias, target, foreign_key))
    }

    /// Shorthand for [`AssociationDef::belongs_to_many`]
    #[must_use]
    pub fn belongs_to_many(
        self,
        alias: &str,
        target: &str,
        through: &str,
        foreign_key: &str,
        other_key: &str,
    ) -> Self {
        self.association(AssociationDef::belongs_to_many(
            alias,
            target,
            through,
            foreign_key,
            other_key,
        ))
    }

    /// Register a named scope, selectable with `?scope=name`
    #[must_use]
    pub fn scope(mut self, name: impl Into<String>, criteria: Criteria) -> Self {
        self.scopes.insert(name.into(), criteria);
        self
    }

    /// Table name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Primary key column, `id` when none is marked
    pub fn primary_key(&self) -> String {
        self.fields
            .iter()
            .find(|f| f.primary_key)
            .map_or_else(|| "id".to_string(), |f| f.name.clone())
    }

    /// Singular display name
    pub fn singular_name(&self) -> String {
        if let Some(name) = &self.singular {
            return name.clone();
        }
        let name = &self.name;
        if let Some(stem) = name.strip_suffix("ies") {
            format!("{stem}y")
        } else if name.ends_with("ses") || name.ends_with("xes") {
            name[..name.len() - 2].to_string()
        } else if let Some(stem) = name.strip_suffix('s') {
            stem.to_string()
        } else {
            name.clone()
        }
    }

    /// Plural display name
    pub fn plural_name(&self) -> String {
        self.plural.clone().unwrap_or_else(|| self.name.clone())
    }

    pub(crate) fn association_def(&self, alias: &str) -> Option<&AssociationDef> {
        self.associations.iter().find(|a| a.alias == alias)
    }

    pub(crate) fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_becomes_primary_key() {
        let def = ModelDef::new("users")
            .field("id", FieldType::Integer)
            .field("name", FieldType::String);
        assert_eq!(def.primary_key(), "id");
        assert!(def.fields[0].primary_key);
    }

    #[test]
    fn test_explicit_primary_key_wins() {
        let def = ModelDef::new("apps")
            .field("id", FieldType::Integer)
            .with_field(Field::new("slug", FieldType::String).primary_key());
        assert_eq!(def.primary_key(), "slug");
    }

    #[test]
    fn test_display_names() {
        assert_eq!(ModelDef::new("users").singular_name(), "user");
        assert_eq!(ModelDef::new("categories").singular_name(), "category");
        assert_eq!(ModelDef::new("boxes").singular_name(), "box");
        assert_eq!(ModelDef::new("person").plural("people").plural_name(), "people");
    }
}
