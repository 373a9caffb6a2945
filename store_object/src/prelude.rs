//! Convenience re-exports for common store-object usage

// Core traits
pub use crate::traits::{
    CreateInput, JoinTable, Relation, RelationKind, StoreObject, TableMetadata, UniqueKey,
};

// Error types
pub use crate::errors::StoreError;

// Core store functionality
pub use crate::generic_store::relations;
pub use crate::generic_store::{GenericStore, StoreTransaction, TxStore};

// Validation
pub use crate::validation::{ValidatedFieldName, ValidatedTableName, ValidationError};

// Query building
pub use crate::query_builder::{
    GroupBy, Having, QueryBuilder, QueryFilter, SelectField, SortOrder, UpdateSet,
};

// Common external dependencies that are frequently used
pub use async_trait::async_trait;
pub use serde::{Deserialize, Serialize};
pub use sqlx::{FromRow, PgPool, Row};
