//! # blogstore
//!
//! A walkthrough of ORM-style data access on PostgreSQL over a small blog
//! schema: users, their profiles, their posts and the tags on those posts.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use blogstore::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!     let client = BlogClient::connect(&config.database).await?;
//!     client.migrate(false).await?;
//!
//!     let alice = client
//!         .user()
//!         .create(UserCreate::new("alice@example.com").with_name("Alice"))
//!         .await?;
//!
//!     let found = client
//!         .user()
//!         .find_unique(UserUnique::Email("alice@example.com".to_string()))
//!         .await?;
//!     assert_eq!(found.map(|u| u.id), Some(alice.id));
//!
//!     client.disconnect().await;
//!     Ok(())
//! }
//! ```

/// Conditional debug logging macros
/// These macros only compile in code when the `debug-logging` feature is enabled
#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {};
}

pub mod core;
pub mod errors;
pub mod logging;
pub mod migration;
pub mod models;
pub mod prelude;
pub mod raw_sql;
pub mod schema;

// Re-export the main public types for convenience
pub use core::BlogClient;
pub use errors::BlogClientError;
pub use schema::Schema;

// Re-export centralized config
pub use config::{AppConfig, DatabaseConfig, LogFormat, LoggingConfig};

pub use store_object;

// Re-export external dependencies used in public API
pub use async_trait;
pub use sqlx;
