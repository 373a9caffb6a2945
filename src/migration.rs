//! Database migration functionality
//!
//! The blog schema is applied idempotently: tables and indexes use
//! `IF NOT EXISTS`, triggers are dropped and recreated. With `recreate`
//! every table is dropped first.

use crate::core::BlogClient;
use crate::errors::BlogClientError;
use crate::schema::{self, Schema};
use sqlx::PgConnection;
use store_object::TableMetadata;

async fn execute(conn: &mut PgConnection, statement: String) -> Result<(), BlogClientError> {
    crate::debug_log!(%statement, "executing migration statement");
    sqlx::query(&statement)
        .execute(conn)
        .await
        .map_err(|source| BlogClientError::Migration { statement, source })?;
    Ok(())
}

impl BlogClient {
    /// Create every table of the blog schema inside one transaction.
    /// If recreate is true, drops existing tables first
    pub async fn migrate(&self, recreate: bool) -> Result<(), BlogClientError> {
        let schema = Schema::blog();
        let mut tx = self.pool().begin().await?;

        if recreate {
            for statement in schema.drop_sql() {
                tracing::info!(%statement, "dropping table");
                execute(&mut tx, statement).await?;
            }
        }

        for statement in schema.create_sql() {
            execute(&mut tx, statement).await?;
        }

        tx.commit().await?;
        tracing::info!(tables = schema.tables().len(), recreate, "schema migrated");
        Ok(())
    }

    /// Automatically create table and indexes for a single model.
    /// Tables it references must already exist.
    pub async fn auto_migrate<T: TableMetadata>(&self, recreate: bool) -> Result<(), BlogClientError> {
        let table_name = T::table_name();
        let mut conn = self.pool().acquire().await?;

        // Drop table if recreate is requested
        if recreate {
            tracing::info!(table = table_name, "dropping table");
            execute(&mut conn, T::drop_table_sql()).await?;
        }

        tracing::info!(table = table_name, "creating table");
        execute(&mut conn, T::create_table_sql()).await?;

        for index_sql in T::create_indexes_sql() {
            execute(&mut conn, index_sql).await?;
        }

        if T::tracks_updated_at() {
            execute(&mut conn, schema::touch_function_sql()).await?;
            for trigger_sql in schema::touch_trigger_sql(table_name) {
                execute(&mut conn, trigger_sql).await?;
            }
        }

        Ok(())
    }
}
