use crate::errors::StoreError;
use crate::traits::TableMetadata;
use crate::DbPool;
use sqlx::pool::PoolConnection;
use sqlx::Postgres;

/// Generic database store that provides default implementations for all database operations
#[derive(Clone)]
pub struct GenericStore<T: TableMetadata> {
    pub(crate) db_pool: DbPool,
    pub(crate) _phantom: std::marker::PhantomData<T>,
}

impl<T: TableMetadata> std::fmt::Debug for GenericStore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenericStore")
            .field("table", &T::table_name())
            .field("pool_size", &self.db_pool.size())
            .finish()
    }
}

impl<T: TableMetadata> GenericStore<T> {
    pub fn new(db_pool: DbPool) -> Self {
        Self {
            db_pool,
            _phantom: std::marker::PhantomData,
        }
    }

    /// Get a reference to the underlying pool
    pub fn pool(&self) -> &DbPool {
        &self.db_pool
    }

    pub(crate) async fn connection(&self) -> Result<PoolConnection<Postgres>, StoreError> {
        self.db_pool
            .acquire()
            .await
            .map_err(|e| StoreError::database_operation(T::table_name(), "acquire", e))
    }
}
