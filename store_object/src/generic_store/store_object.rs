//! Generic store implementations
//!
//! Every operation borrows one pooled connection. Operations issuing
//! more than one statement run inside their own transaction.

use super::core::GenericStore;
use super::operations;
use crate::errors::StoreError;
use crate::query_builder::{GroupBy, QueryBuilder, SelectField, UpdateSet};
use crate::traits::{CreateOf, StoreObject, TableMetadata, UniqueOf};
use async_trait::async_trait;
use serde_json::Value;

#[async_trait]
impl<T> StoreObject for GenericStore<T>
where
    T: TableMetadata,
{
    type Model = T;

    async fn find_unique(&self, key: UniqueOf<Self>) -> Result<Option<T>, StoreError> {
        let mut conn = self.connection().await?;
        operations::find_unique::<T>(&mut conn, &key).await
    }

    async fn find_unique_or_fail(&self, key: UniqueOf<Self>) -> Result<T, StoreError> {
        let mut conn = self.connection().await?;
        operations::find_unique_or_fail::<T>(&mut conn, &key).await
    }

    async fn find_first(&self, query: QueryBuilder) -> Result<Option<T>, StoreError> {
        let mut conn = self.connection().await?;
        operations::find_first::<T>(&mut conn, &query).await
    }

    async fn find_many(&self, query: QueryBuilder) -> Result<Vec<T>, StoreError> {
        let mut conn = self.connection().await?;
        operations::find_many::<T>(&mut conn, &query).await
    }

    async fn count(&self, query: QueryBuilder) -> Result<i64, StoreError> {
        let mut conn = self.connection().await?;
        operations::count::<T>(&mut conn, &query).await
    }

    async fn create(&self, data: CreateOf<Self>) -> Result<T, StoreError> {
        let mut conn = self.connection().await?;
        operations::create::<T>(&mut conn, &data).await
    }

    async fn create_many(
        &self,
        data: Vec<CreateOf<Self>>,
        skip_duplicates: bool,
    ) -> Result<u64, StoreError> {
        if data.is_empty() {
            return Ok(0);
        }

        let mut tx = self
            .db_pool
            .begin()
            .await
            .map_err(|e| StoreError::transaction("begin", e))?;
        let inserted = operations::create_many::<T>(&mut tx, &data, skip_duplicates).await?;
        tx.commit()
            .await
            .map_err(|e| StoreError::transaction("commit", e))?;

        tracing::debug!(table = T::table_name(), inserted, "create_many committed");
        Ok(inserted)
    }

    async fn update(&self, key: UniqueOf<Self>, set: UpdateSet) -> Result<T, StoreError> {
        let mut conn = self.connection().await?;
        operations::update::<T>(&mut conn, &key, &set).await
    }

    async fn update_many(&self, query: QueryBuilder, set: UpdateSet) -> Result<u64, StoreError> {
        let mut conn = self.connection().await?;
        operations::update_many::<T>(&mut conn, &query, &set).await
    }

    async fn upsert(
        &self,
        key: UniqueOf<Self>,
        create: CreateOf<Self>,
        update: UpdateSet,
    ) -> Result<T, StoreError> {
        let mut tx = self
            .db_pool
            .begin()
            .await
            .map_err(|e| StoreError::transaction("begin", e))?;
        let record = operations::upsert::<T>(&mut tx, &key, &create, &update).await?;
        tx.commit()
            .await
            .map_err(|e| StoreError::transaction("commit", e))?;
        Ok(record)
    }

    async fn delete(&self, key: UniqueOf<Self>) -> Result<T, StoreError> {
        let mut conn = self.connection().await?;
        operations::delete::<T>(&mut conn, &key).await
    }

    async fn delete_many(&self, query: QueryBuilder) -> Result<u64, StoreError> {
        let mut conn = self.connection().await?;
        operations::delete_many::<T>(&mut conn, &query).await
    }

    async fn select(
        &self,
        query: QueryBuilder,
        fields: Vec<SelectField>,
    ) -> Result<Vec<Value>, StoreError> {
        let mut conn = self.connection().await?;
        operations::select::<T>(&mut conn, &query, &fields).await
    }

    async fn aggregate(
        &self,
        query: QueryBuilder,
        fields: Vec<SelectField>,
    ) -> Result<Value, StoreError> {
        let mut conn = self.connection().await?;
        operations::aggregate::<T>(&mut conn, &query, &fields).await
    }

    async fn group_by(&self, query: QueryBuilder, group: GroupBy) -> Result<Vec<Value>, StoreError> {
        let mut conn = self.connection().await?;
        operations::group_by::<T>(&mut conn, &query, &group).await
    }
}
