//! Store Object - generic data access layer over PostgreSQL
//!
//! This crate provides the foundational types and traits for database operations,
//! including generic stores, query builders, relation loading and validation utilities.

pub mod errors;
pub mod generic_store;
pub mod prelude;
pub mod query_builder;
pub mod traits;
pub mod validation;

pub use errors::StoreError;
pub use generic_store::{GenericStore, StoreTransaction, TxStore};
pub use query_builder::{
    GroupBy, Having, QueryBuilder, QueryFilter, QueryOperator, SelectField, SortOrder, UpdateSet,
};
pub use traits::{
    CreateInput, CreateOf, JoinTable, Relation, RelationKind, StoreObject, TableMetadata, UniqueKey,
    UniqueOf,
};
pub use validation::{ValidatedFieldName, ValidatedTableName, ValidationError};

use sqlx::PgPool;

pub type DbPool = PgPool;
