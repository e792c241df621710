//! Query execution and writes over the in-memory tables

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};

use super::def::{AssociationDef, ModelDef};
use super::eval::{loose_eq, matches, sort_rows};
use crate::model::{
    AssociationKind, Criteria, Include, Projection, QueryOptions, Record, StoreError,
    StoreOperation, StoreResult,
};

/// Rows of one table plus its auto-increment counter
#[derive(Debug, Default)]
pub(crate) struct Table {
    pub(crate) rows: Vec<Record>,
    pub(crate) next_id: i64,
}

/// Everything the store holds, behind one lock
#[derive(Debug, Default)]
pub(crate) struct State {
    pub(crate) defs: HashMap<String, Arc<ModelDef>>,
    pub(crate) tables: HashMap<String, Table>,
}

fn satisfies(row: &Record, criteria: &Criteria) -> bool {
    criteria.conditions().iter().all(|c| matches(row, c))
}

/// Drop own columns the projection does not allow; included data stays
fn project(def: &ModelDef, row: &mut Record, projection: Option<&Projection>) {
    if let Some(projection) = projection {
        row.retain(|key, _| !def.has_field(key) || projection.allows(key));
    }
}

/// Whether an include filters its parent rows
fn is_required(include: &Include) -> bool {
    match include {
        Include::Alias(_) => false,
        Include::Node(node) => !node.criteria.is_empty() || node.include.iter().any(is_required),
    }
}

/// One output row per distinct combination of the group columns, with a `count`
fn group_rows(rows: Vec<Record>, group: &[String]) -> Vec<Record> {
    let mut grouped: Vec<(Vec<Value>, Record)> = Vec::new();
    for row in rows {
        let key: Vec<Value> = group
            .iter()
            .map(|column| row.get(column).cloned().unwrap_or(Value::Null))
            .collect();
        match grouped.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, record)) => {
                let count = record.get("count").and_then(Value::as_u64).unwrap_or(0);
                record.insert("count".into(), (count + 1).into());
            }
            None => {
                let mut record = Record::new();
                for (column, value) in group.iter().zip(key.iter()) {
                    record.insert(column.clone(), value.clone());
                }
                record.insert("count".into(), 1.into());
                grouped.push((key, record));
            }
        }
    }
    grouped.into_iter().map(|(_, record)| record).collect()
}

impl State {
    pub(crate) fn def(&self, name: &str, operation: StoreOperation) -> StoreResult<Arc<ModelDef>> {
        self.defs.get(name).cloned().ok_or_else(|| {
            StoreError::database_error(operation, format!("Unknown model '{name}'")).with_model(name)
        })
    }

    fn rows(&self, name: &str) -> &[Record] {
        self.tables.get(name).map_or(&[][..], |t| t.rows.as_slice())
    }

    /// Matching rows after offset/limit, plus the total match count
    pub(crate) fn select(
        &self,
        name: &str,
        options: &QueryOptions,
        operation: StoreOperation,
    ) -> StoreResult<(Vec<Record>, u64)> {
        let def = self.def(name, operation)?;
        let scope = match &options.scope {
            Some(scope) => Some(def.scopes.get(scope).ok_or_else(|| {
                StoreError::validation_failed(operation, format!("Unknown scope '{scope}'"))
                    .with_model(name)
            })?),
            None => None,
        };

        let mut matched = Vec::new();
        let mut total = 0_u64;
        for row in self.rows(name) {
            let mut row = row.clone();
            let Some(fanout) = self.expand(&def, &mut row, &options.include, operation)? else {
                continue;
            };
            if !satisfies(&row, &options.criteria) || !scope.map_or(true, |s| satisfies(&row, s)) {
                continue;
            }
            // Without distinct, each joined child row counts separately.
            total += if options.distinct { 1 } else { fanout };
            matched.push(row);
        }

        if !options.group.is_empty() {
            matched = group_rows(matched, &options.group);
        }
        sort_rows(&mut matched, &options.order);

        let offset = usize::try_from(options.offset.unwrap_or(0)).unwrap_or(usize::MAX);
        let limit = options
            .limit
            .and_then(|l| usize::try_from(l).ok())
            .unwrap_or(usize::MAX);
        let rows = matched
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|mut row| {
                project(&def, &mut row, options.attributes.as_ref());
                row
            })
            .collect();
        Ok((rows, total))
    }

    /// Attach included associations to `row`
    ///
    /// Returns `None` when a filtered include leaves the row without matches,
    /// otherwise the number of joined rows it stands for.
    fn expand(
        &self,
        def: &ModelDef,
        row: &mut Record,
        include: &[Include],
        operation: StoreOperation,
    ) -> StoreResult<Option<u64>> {
        let mut fanout = 1_u64;
        for item in include {
            let alias = item.alias();
            let association = def.association_def(alias).ok_or_else(|| {
                StoreError::validation_failed(
                    operation,
                    format!("'{alias}' is not associated to '{}'", def.name),
                )
            })?;
            let target = self.def(&association.target, operation)?;
            let (criteria, nested, projection) = match item {
                Include::Alias(_) => (None, &[][..], None),
                Include::Node(node) => (
                    Some(&node.criteria),
                    node.include.as_slice(),
                    node.attributes.as_ref(),
                ),
            };

            let mut kept = Vec::new();
            let mut joined = 0_u64;
            for mut child in self.related(def, &target, association, row) {
                let Some(child_fanout) = self.expand(&target, &mut child, nested, operation)? else {
                    continue;
                };
                if criteria.is_some_and(|c| !satisfies(&child, c)) {
                    continue;
                }
                project(&target, &mut child, projection);
                joined += child_fanout;
                kept.push(child.into_value());
            }

            if kept.is_empty() && is_required(item) {
                return Ok(None);
            }
            let value = if association.kind.is_single() {
                kept.into_iter().next().unwrap_or(Value::Null)
            } else {
                fanout *= joined.max(1);
                Value::Array(kept)
            };
            row.insert(alias.to_string(), value);
        }
        Ok(Some(fanout))
    }

    /// Target rows linked to `row`; many-to-many targets carry their junction row
    fn related(
        &self,
        def: &ModelDef,
        target: &ModelDef,
        association: &AssociationDef,
        row: &Record,
    ) -> Vec<Record> {
        let source_key = def.primary_key();
        let target_key = target.primary_key();
        let fk = &association.foreign_key;
        let linked = |value: Option<&Value>, key: &Value| value.is_some_and(|v| !v.is_null() && loose_eq(v, key));

        match association.kind {
            AssociationKind::BelongsTo => {
                let Some(key) = row.get(fk).filter(|v| !v.is_null()) else {
                    return Vec::new();
                };
                self.rows(&target.name)
                    .iter()
                    .filter(|t| linked(t.get(&target_key), key))
                    .take(1)
                    .cloned()
                    .collect()
            }
            AssociationKind::HasOne | AssociationKind::HasMany => {
                let Some(key) = row.get(&source_key).filter(|v| !v.is_null()) else {
                    return Vec::new();
                };
                let children = self
                    .rows(&target.name)
                    .iter()
                    .filter(|t| linked(t.get(fk), key))
                    .cloned();
                if association.kind == AssociationKind::HasOne {
                    children.take(1).collect()
                } else {
                    children.collect()
                }
            }
            AssociationKind::BelongsToMany => {
                let (Some(through), Some(other_key)) = (&association.through, &association.other_key)
                else {
                    return Vec::new();
                };
                let Some(key) = row.get(&source_key).filter(|v| !v.is_null()) else {
                    return Vec::new();
                };
                let mut linked_rows = Vec::new();
                for junction in self.rows(through).iter().filter(|j| linked(j.get(fk), key)) {
                    let Some(other) = junction.get(other_key) else {
                        continue;
                    };
                    for found in self
                        .rows(&target.name)
                        .iter()
                        .filter(|t| linked(t.get(&target_key), other))
                    {
                        let mut found = found.clone();
                        found.insert(through.clone(), junction.clone().into_value());
                        linked_rows.push(found);
                    }
                }
                linked_rows
            }
        }
    }

    /// Insert one row of `def`; missing columns take their default or `null`
    fn insert_row(&mut self, def: &ModelDef, values: &Record) -> StoreResult<Record> {
        let pk = def.primary_key();
        let table = self.tables.entry(def.name.clone()).or_default();

        let mut row = Record::new();
        for field in &def.fields {
            let value = values
                .get(&field.name)
                .filter(|v| !(field.primary_key && v.is_null()))
                .cloned()
                .or_else(|| field.default_value.clone())
                .unwrap_or(Value::Null);
            row.insert(field.name.clone(), value);
        }

        match row.get(&pk).cloned() {
            None | Some(Value::Null) => {
                table.next_id += 1;
                row.insert(pk, table.next_id.into());
            }
            Some(key) => {
                if table
                    .rows
                    .iter()
                    .any(|r| r.get(&pk).is_some_and(|existing| loose_eq(existing, &key)))
                {
                    return Err(StoreError::constraint_violation(
                        StoreOperation::Create,
                        format!("Duplicate value {key} for primary key '{pk}'"),
                    )
                    .with_model(def.name.clone()));
                }
                if let Some(n) = key.as_i64() {
                    table.next_id = table.next_id.max(n);
                }
            }
        }

        table.rows.push(row.clone());
        Ok(row)
    }

    /// Insert a row, creating nested rows for included associations present in `values`
    pub(crate) fn insert(
        &mut self,
        name: &str,
        mut values: Record,
        include: &[Include],
    ) -> StoreResult<Record> {
        let def = self.def(name, StoreOperation::Create)?;

        let mut nested = Vec::new();
        for item in include {
            let Some(payload) = values.remove(item.alias()) else {
                continue;
            };
            let Some(association) = def.association_def(item.alias()) else {
                continue;
            };
            let inner = match item {
                Include::Alias(_) => Vec::new(),
                Include::Node(node) => node.include.clone(),
            };
            nested.push((association.clone(), payload, inner));
        }

        let mut parents = Vec::new();
        for (association, payload, inner) in &nested {
            if association.kind != AssociationKind::BelongsTo {
                continue;
            }
            let Value::Object(map) = payload else {
                continue;
            };
            let parent = self.insert(&association.target, Record::from(map.clone()), inner)?;
            let target_key = self.def(&association.target, StoreOperation::Create)?.primary_key();
            values.insert(
                association.foreign_key.clone(),
                parent.get(&target_key).cloned().unwrap_or(Value::Null),
            );
            parents.push((association.alias.clone(), parent));
        }

        let mut row = self.insert_row(&def, &values)?;
        let key = row.get(&def.primary_key()).cloned().unwrap_or(Value::Null);

        for (association, payload, inner) in nested {
            if association.kind == AssociationKind::BelongsTo {
                continue;
            }
            let items: Vec<Map<String, Value>> = match payload {
                Value::Object(map) => vec![map],
                Value::Array(items) => items
                    .into_iter()
                    .filter_map(|item| match item {
                        Value::Object(map) => Some(map),
                        _ => None,
                    })
                    .collect(),
                _ => Vec::new(),
            };

            let mut created = Vec::new();
            for item in items {
                let mut child = Record::from(item);
                if association.kind == AssociationKind::BelongsToMany {
                    let target = self.insert(&association.target, child, &inner)?;
                    if let (Some(through), Some(other_key)) = (&association.through, &association.other_key) {
                        let target_key = self.def(&association.target, StoreOperation::Create)?.primary_key();
                        let junction = Record::new()
                            .with(association.foreign_key.clone(), key.clone())
                            .with(other_key.clone(), target.get(&target_key).cloned().unwrap_or(Value::Null));
                        self.insert(through, junction, &[])?;
                    }
                    created.push(target.into_value());
                } else {
                    child.insert(association.foreign_key.clone(), key.clone());
                    created.push(self.insert(&association.target, child, &inner)?.into_value());
                }
            }

            let value = if association.kind.is_single() {
                created.into_iter().next().unwrap_or(Value::Null)
            } else {
                Value::Array(created)
            };
            row.insert(association.alias, value);
        }

        for (alias, parent) in parents {
            row.insert(alias, parent.into_value());
        }
        Ok(row)
    }

    fn position(&self, def: &ModelDef, instance: &Record, operation: StoreOperation) -> StoreResult<usize> {
        let pk = def.primary_key();
        let Some(key) = instance.get(&pk) else {
            return Err(StoreError::validation_failed(
                operation,
                format!("Record has no value for primary key '{pk}'"),
            )
            .with_model(def.name.clone()));
        };
        self.rows(&def.name)
            .iter()
            .position(|r| r.get(&pk).is_some_and(|v| loose_eq(v, key)))
            .ok_or_else(|| {
                StoreError::not_found(def.name.clone(), instance.display_value(&pk))
                    .with_operation(operation)
            })
    }

    /// Apply `changes` to the stored row; included data on `instance` is kept
    pub(crate) fn update(&mut self, name: &str, instance: &Record, changes: &Record) -> StoreResult<Record> {
        let def = self.def(name, StoreOperation::Update)?;
        let index = self.position(&def, instance, StoreOperation::Update)?;
        let Some(stored) = self.tables.get_mut(name).and_then(|t| t.rows.get_mut(index)) else {
            return Err(StoreError::not_found(name, instance.display_value(&def.primary_key())));
        };
        for (key, value) in changes.iter() {
            if def.has_field(key) {
                stored.insert(key.clone(), value.clone());
            }
        }

        let mut updated = instance.clone();
        for (key, value) in stored.iter() {
            updated.insert(key.clone(), value.clone());
        }
        Ok(updated)
    }

    /// Remove the stored row of `instance`
    pub(crate) fn destroy(&mut self, name: &str, instance: &Record) -> StoreResult<()> {
        let def = self.def(name, StoreOperation::Destroy)?;
        let index = self.position(&def, instance, StoreOperation::Destroy)?;
        if let Some(table) = self.tables.get_mut(name) {
            table.rows.remove(index);
        }
        Ok(())
    }

    /// Re-read `instance` with fresh includes
    pub(crate) fn reload(&self, name: &str, instance: &Record, options: &QueryOptions) -> StoreResult<Record> {
        let def = self.def(name, StoreOperation::Reload)?;
        let pk = def.primary_key();
        let key = instance.get(&pk).cloned().unwrap_or(Value::Null);
        let options = QueryOptions {
            criteria: Criteria::new().with(pk.clone(), key),
            limit: Some(1),
            ..options.clone()
        };
        let (rows, _) = self.select(name, &options, StoreOperation::Reload)?;
        rows.into_iter().next().ok_or_else(|| {
            StoreError::not_found(name, instance.display_value(&pk)).with_operation(StoreOperation::Reload)
        })
    }
}
