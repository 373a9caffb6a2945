//! Trait definitions
//!
//! This module defines the metadata a model exposes to the generic store.

use crate::query_builder::QueryFilter;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::FromRow;
use std::fmt::Debug;

/// Metadata about database table structure and operations
///
/// Implemented by hand for every model:
///
/// ```ignore
/// impl TableMetadata for Tag {
///     type Create = TagCreate;
///     type Unique = TagUnique;
///
///     fn table_name() -> &'static str { "tags" }
///     fn columns() -> &'static [&'static str] { &["id", "name"] }
///     fn unique_fields() -> &'static [&'static str] { &["name"] }
///     fn extract_id(&self) -> i32 { self.id }
///     fn create_table_sql() -> String { /* ... */ }
/// }
/// ```
pub trait TableMetadata:
    Clone
    + Send
    + Sync
    + Debug
    + Serialize
    + DeserializeOwned
    + for<'r> FromRow<'r, PgRow>
    + Unpin
    + 'static
{
    /// Insert payload for this table
    type Create: CreateInput;

    /// Unique lookup key for this table
    type Unique: UniqueKey;

    /// The table name in the database
    fn table_name() -> &'static str;

    /// Get the primary key field name
    fn primary_key_field() -> &'static str {
        "id"
    }

    /// All columns, in table order
    fn columns() -> &'static [&'static str];

    /// Columns carrying a UNIQUE constraint, primary key excluded
    fn unique_fields() -> &'static [&'static str] {
        &[]
    }

    /// Columns of type `timestamptz`; values bound against them are cast
    fn timestamp_columns() -> &'static [&'static str] {
        &[]
    }

    /// Whether updates must refresh an `updated_at` column
    fn tracks_updated_at() -> bool {
        Self::columns().contains(&"updated_at")
    }

    /// Extract ID from model instance
    fn extract_id(&self) -> i32;

    /// Generate CREATE TABLE SQL statement
    fn create_table_sql() -> String;

    /// Generate DROP TABLE SQL statement
    fn drop_table_sql() -> String {
        format!("DROP TABLE IF EXISTS {} CASCADE", Self::table_name())
    }

    /// Generate CREATE INDEX SQL statements
    fn create_indexes_sql() -> Vec<String> {
        vec![]
    }

    /// SQL for SELECT base operation
    fn select_base_sql() -> String {
        format!("SELECT * FROM {}", Self::table_name())
    }

    /// SQL for COUNT base operation
    fn count_base_sql() -> String {
        format!("SELECT COUNT(*) FROM {}", Self::table_name())
    }
}

/// Values of a single INSERT
pub trait CreateInput: Clone + Send + Sync + Debug + 'static {
    /// Column/value pairs to insert; omitted columns take their defaults
    fn values(&self) -> Vec<(&'static str, Value)>;
}

/// A key identifying at most one row
pub trait UniqueKey: Clone + Send + Sync + Debug + 'static {
    /// Column the key is matched against
    fn field(&self) -> &'static str;

    /// Value the column must equal
    fn value(&self) -> Value;

    fn to_filter(&self) -> QueryFilter {
        QueryFilter::eq(self.field(), self.value())
    }

    /// Human readable form used in not-found errors
    fn describe(&self) -> String {
        format!("{} = {}", self.field(), self.value())
    }
}
