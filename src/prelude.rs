//! Convenience re-exports for common blogstore usage
//!
//! # Example
//!
//! ```rust
//! use blogstore::prelude::*;
//!
//! let query = QueryBuilder::new()
//!     .filter(QueryFilter::eq("published", json!(true)))
//!     .order_by("created_at", SortOrder::Desc)
//!     .take(10);
//! assert!(query.validate("posts").is_ok());
//! ```

// Core blogstore components
pub use crate::core::BlogClient;
pub use crate::errors::BlogClientError;
pub use crate::models::*;
pub use crate::raw_sql;
pub use crate::schema::Schema;

// Re-export centralized config
pub use config::{AppConfig, DatabaseConfig, LogFormat, LoggingConfig};

// Re-export commonly used store-object types for convenience
pub use store_object::prelude::*;

// Common external dependencies
pub use anyhow;
pub use serde_json::{json, Value};
pub use sqlx;
pub use tokio;
