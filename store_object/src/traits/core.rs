//! Trait definitions
//!
//! This module defines the operations every model store offers.

use crate::errors::StoreError;
use crate::query_builder::{GroupBy, QueryBuilder, SelectField, UpdateSet};
use crate::traits::table_metadata::TableMetadata;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt::Debug;

/// Unique key type of a store's model
pub type UniqueOf<S> = <<S as StoreObject>::Model as TableMetadata>::Unique;

/// Create input type of a store's model
pub type CreateOf<S> = <<S as StoreObject>::Model as TableMetadata>::Create;

/// Trait that defines common database operations for all entities
#[async_trait]
pub trait StoreObject: Clone + Send + Sync + Debug {
    /// The model type that this object represents
    type Model: TableMetadata;

    /// Find the row matching a unique key
    async fn find_unique(&self, key: UniqueOf<Self>) -> Result<Option<Self::Model>, StoreError>;

    /// Find the row matching a unique key, failing with `NotFound`
    async fn find_unique_or_fail(&self, key: UniqueOf<Self>) -> Result<Self::Model, StoreError>;

    /// First record matching query conditions and ordering
    async fn find_first(&self, query: QueryBuilder) -> Result<Option<Self::Model>, StoreError>;

    /// Find records matching query conditions
    async fn find_many(&self, query: QueryBuilder) -> Result<Vec<Self::Model>, StoreError>;

    /// Count records matching query conditions
    async fn count(&self, query: QueryBuilder) -> Result<i64, StoreError>;

    /// Insert one record and return it as stored
    async fn create(&self, data: CreateOf<Self>) -> Result<Self::Model, StoreError>;

    /// Insert many records, returning how many were inserted
    async fn create_many(
        &self,
        data: Vec<CreateOf<Self>>,
        skip_duplicates: bool,
    ) -> Result<u64, StoreError>;

    /// Update one record by unique key
    async fn update(&self, key: UniqueOf<Self>, set: UpdateSet) -> Result<Self::Model, StoreError>;

    /// Update records matching query conditions
    async fn update_many(&self, query: QueryBuilder, set: UpdateSet) -> Result<u64, StoreError>;

    /// Update the record when it exists, create it otherwise
    async fn upsert(
        &self,
        key: UniqueOf<Self>,
        create: CreateOf<Self>,
        update: UpdateSet,
    ) -> Result<Self::Model, StoreError>;

    /// Delete one record by unique key and return it
    async fn delete(&self, key: UniqueOf<Self>) -> Result<Self::Model, StoreError>;

    /// Delete records matching query conditions
    async fn delete_many(&self, query: QueryBuilder) -> Result<u64, StoreError>;

    /// Project matching records onto the given fields
    async fn select(
        &self,
        query: QueryBuilder,
        fields: Vec<SelectField>,
    ) -> Result<Vec<Value>, StoreError>;

    /// Aggregate functions over matching records
    async fn aggregate(
        &self,
        query: QueryBuilder,
        fields: Vec<SelectField>,
    ) -> Result<Value, StoreError>;

    /// Grouped aggregates over matching records
    async fn group_by(&self, query: QueryBuilder, group: GroupBy) -> Result<Vec<Value>, StoreError>;
}
