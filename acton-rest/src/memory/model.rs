//! [`Model`] implementation backed by [`MemoryDb`]

use std::sync::Arc;

use async_trait::async_trait;

use super::def::ModelDef;
use super::MemoryDb;
use crate::model::{
    Association, Field, Model, QueryOptions, Record, StoreOperation, StoreResult, Transaction,
    WriteOptions,
};

/// Handle to one table of a [`MemoryDb`]
///
/// Transactions are accepted and ignored; every write applies immediately.
pub(crate) struct MemoryModel {
    pub(crate) db: MemoryDb,
    pub(crate) name: String,
}

impl MemoryModel {
    fn def(&self) -> Option<Arc<ModelDef>> {
        self.db.def(&self.name)
    }
}

#[async_trait]
impl Model for MemoryModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn singular_name(&self) -> String {
        self.def()
            .map_or_else(|| self.name.clone(), |d| d.singular_name())
    }

    fn plural_name(&self) -> String {
        self.def().map_or_else(|| self.name.clone(), |d| d.plural_name())
    }

    fn fields(&self) -> Vec<Field> {
        self.def().map(|d| d.fields.clone()).unwrap_or_default()
    }

    fn primary_key(&self) -> String {
        self.def()
            .map_or_else(|| "id".to_string(), |d| d.primary_key())
    }

    fn associations(&self) -> Vec<Association> {
        let Some(def) = self.def() else {
            return Vec::new();
        };
        let source_key = def.primary_key();
        def.associations
            .iter()
            .map(|a| {
                let target = self.db.model(&a.target);
                let target_key = target.primary_key();
                Association {
                    kind: a.kind,
                    alias: a.alias.clone(),
                    source: def.name.clone(),
                    source_key: source_key.clone(),
                    target,
                    target_key,
                    foreign_key: a.foreign_key.clone(),
                    other_key: a.other_key.clone(),
                    through: a.through.clone(),
                    paired: a.paired.clone(),
                }
            })
            .collect()
    }

    async fn find_and_count(&self, options: &QueryOptions) -> StoreResult<(Vec<Record>, u64)> {
        let state = self.db.read(StoreOperation::FindAll)?;
        state.select(&self.name, options, StoreOperation::FindAll)
    }

    async fn find_all(&self, options: &QueryOptions) -> StoreResult<Vec<Record>> {
        let state = self.db.read(StoreOperation::FindAll)?;
        let (rows, _) = state.select(&self.name, options, StoreOperation::FindAll)?;
        Ok(rows)
    }

    async fn count(&self, options: &QueryOptions) -> StoreResult<u64> {
        let options = QueryOptions {
            criteria: options.criteria.clone(),
            scope: options.scope.clone(),
            limit: Some(0),
            ..QueryOptions::default()
        };
        let state = self.db.read(StoreOperation::Count)?;
        let (_, total) = state.select(&self.name, &options, StoreOperation::Count)?;
        Ok(total)
    }

    async fn find_one(&self, options: &QueryOptions) -> StoreResult<Option<Record>> {
        let options = QueryOptions {
            limit: Some(1),
            ..options.clone()
        };
        let state = self.db.read(StoreOperation::FindOne)?;
        let (rows, _) = state.select(&self.name, &options, StoreOperation::FindOne)?;
        Ok(rows.into_iter().next())
    }

    async fn create(&self, values: Record, options: &WriteOptions) -> StoreResult<Record> {
        let mut state = self.db.write(StoreOperation::Create)?;
        let created = state.insert(&self.name, values, &options.include)?;
        tracing::trace!(model = %self.name, "Inserted row");
        Ok(created)
    }

    async fn update(
        &self,
        instance: &Record,
        changes: Record,
        _transaction: Option<&Transaction>,
    ) -> StoreResult<Record> {
        let mut state = self.db.write(StoreOperation::Update)?;
        state.update(&self.name, instance, &changes)
    }

    async fn destroy(&self, instance: &Record, _transaction: Option<&Transaction>) -> StoreResult<()> {
        let mut state = self.db.write(StoreOperation::Destroy)?;
        state.destroy(&self.name, instance)
    }

    async fn reload(&self, instance: &Record, options: &QueryOptions) -> StoreResult<Record> {
        let state = self.db.read(StoreOperation::Reload)?;
        state.reload(&self.name, instance, options)
    }
}
