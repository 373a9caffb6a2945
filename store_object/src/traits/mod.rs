//! Traits for database operations
//!
//! Model metadata, insert and unique-key inputs, relation descriptions
//! and the store operation trait.

pub mod core;
pub mod relation;
pub mod table_metadata;

pub use core::{CreateOf, StoreObject, UniqueOf};
pub use relation::{JoinTable, Relation, RelationKind};
pub use table_metadata::{CreateInput, TableMetadata, UniqueKey};
