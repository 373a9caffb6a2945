//! Transaction support for GenericStore
//!
//! A [`StoreTransaction`] owns one database transaction. Stores borrowed
//! from it with [`StoreTransaction::store`] run every operation on that
//! transaction, so several models can be written atomically.

use super::operations;
use crate::errors::StoreError;
use crate::query_builder::{GroupBy, QueryBuilder, SelectField, UpdateSet};
use crate::traits::TableMetadata;
use crate::DbPool;
use serde_json::Value;
use sqlx::{PgConnection, Postgres, Transaction};
use std::marker::PhantomData;

/// A transactional context for store operations
///
/// Dropping it without calling [`commit`](Self::commit) rolls back.
///
/// # Example
/// ```ignore
/// let mut tx = StoreTransaction::begin(&pool).await?;
///
/// let author = tx.store::<User>().create(user_input).await?;
/// tx.store::<Post>().create(post_input_for(author.id)).await?;
///
/// tx.commit().await?;
/// ```
pub struct StoreTransaction {
    tx: Transaction<'static, Postgres>,
}

impl std::fmt::Debug for StoreTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreTransaction").finish_non_exhaustive()
    }
}

impl StoreTransaction {
    /// Begin a new database transaction
    pub async fn begin(pool: &DbPool) -> Result<Self, StoreError> {
        let tx = pool
            .begin()
            .await
            .map_err(|e| StoreError::transaction("begin", e))?;
        tracing::debug!("transaction started");
        Ok(Self { tx })
    }

    /// Store for `T` bound to this transaction
    pub fn store<T: TableMetadata>(&mut self) -> TxStore<'_, T> {
        TxStore {
            conn: &mut self.tx,
            _phantom: PhantomData,
        }
    }

    /// Connection of this transaction, for queries outside the stores
    pub fn connection(&mut self) -> &mut PgConnection {
        &mut self.tx
    }

    /// Get a mutable reference to the underlying transaction
    pub fn as_mut(&mut self) -> &mut Transaction<'static, Postgres> {
        &mut self.tx
    }

    /// Commit the transaction
    pub async fn commit(self) -> Result<(), StoreError> {
        self.tx
            .commit()
            .await
            .map_err(|e| StoreError::transaction("commit", e))?;
        tracing::debug!("transaction committed");
        Ok(())
    }

    /// Rollback the transaction
    pub async fn rollback(self) -> Result<(), StoreError> {
        self.tx
            .rollback()
            .await
            .map_err(|e| StoreError::transaction("rollback", e))?;
        tracing::warn!("transaction rolled back");
        Ok(())
    }
}

/// Store operations running inside a [`StoreTransaction`]
pub struct TxStore<'t, T: TableMetadata> {
    conn: &'t mut PgConnection,
    _phantom: PhantomData<T>,
}

impl<T: TableMetadata> TxStore<'_, T> {
    pub async fn find_unique(&mut self, key: T::Unique) -> Result<Option<T>, StoreError> {
        operations::find_unique::<T>(self.conn, &key).await
    }

    pub async fn find_unique_or_fail(&mut self, key: T::Unique) -> Result<T, StoreError> {
        operations::find_unique_or_fail::<T>(self.conn, &key).await
    }

    pub async fn find_first(&mut self, query: QueryBuilder) -> Result<Option<T>, StoreError> {
        operations::find_first::<T>(self.conn, &query).await
    }

    pub async fn find_many(&mut self, query: QueryBuilder) -> Result<Vec<T>, StoreError> {
        operations::find_many::<T>(self.conn, &query).await
    }

    pub async fn count(&mut self, query: QueryBuilder) -> Result<i64, StoreError> {
        operations::count::<T>(self.conn, &query).await
    }

    pub async fn create(&mut self, data: T::Create) -> Result<T, StoreError> {
        operations::create::<T>(self.conn, &data).await
    }

    pub async fn create_many(
        &mut self,
        data: Vec<T::Create>,
        skip_duplicates: bool,
    ) -> Result<u64, StoreError> {
        operations::create_many::<T>(self.conn, &data, skip_duplicates).await
    }

    pub async fn update(&mut self, key: T::Unique, set: UpdateSet) -> Result<T, StoreError> {
        operations::update::<T>(self.conn, &key, &set).await
    }

    pub async fn update_many(
        &mut self,
        query: QueryBuilder,
        set: UpdateSet,
    ) -> Result<u64, StoreError> {
        operations::update_many::<T>(self.conn, &query, &set).await
    }

    pub async fn upsert(
        &mut self,
        key: T::Unique,
        create: T::Create,
        update: UpdateSet,
    ) -> Result<T, StoreError> {
        operations::upsert::<T>(self.conn, &key, &create, &update).await
    }

    pub async fn delete(&mut self, key: T::Unique) -> Result<T, StoreError> {
        operations::delete::<T>(self.conn, &key).await
    }

    pub async fn delete_many(&mut self, query: QueryBuilder) -> Result<u64, StoreError> {
        operations::delete_many::<T>(self.conn, &query).await
    }

    pub async fn select(
        &mut self,
        query: QueryBuilder,
        fields: Vec<SelectField>,
    ) -> Result<Vec<Value>, StoreError> {
        operations::select::<T>(self.conn, &query, &fields).await
    }

    pub async fn aggregate(
        &mut self,
        query: QueryBuilder,
        fields: Vec<SelectField>,
    ) -> Result<Value, StoreError> {
        operations::aggregate::<T>(self.conn, &query, &fields).await
    }

    pub async fn group_by(
        &mut self,
        query: QueryBuilder,
        group: GroupBy,
    ) -> Result<Vec<Value>, StoreError> {
        operations::group_by::<T>(self.conn, &query, &group).await
    }
}
