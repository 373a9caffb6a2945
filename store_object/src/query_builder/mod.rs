//! Query builder utilities
//!
//! Filters, projections, grouping and update sets, plus the generator
//! that turns them into parameterised SQL.

pub mod aggregation;
pub mod builder;
pub mod filter;
pub mod grouping;
pub mod ordering;
pub mod pagination;
pub mod sql_generation;
pub mod update;

#[cfg(test)]
mod tests;

pub use aggregation::{AggregateFunction, SelectField};
pub use builder::QueryBuilder;
pub use filter::{
    escape_like, LogicalOperator, QueryCondition, QueryFilter, QueryOperator, RelationMode,
};
pub use grouping::{GroupBy, Having};
pub use ordering::SortOrder;
pub use pagination::Pagination;
pub use sql_generation::{typed_placeholder, SqlGenerator};
pub use update::{UpdateOperation, UpdateSet};
