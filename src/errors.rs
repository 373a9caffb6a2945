//! Error types for the blogstore crate
//!
//! This module contains all error types that can be returned by client operations.

use config::ConfigError;
use store_object::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BlogClientError {
    #[error("Database connection error: {0}")]
    DatabaseConnection(#[from] sqlx::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Migration statement failed: {statement}: {source}")]
    Migration {
        statement: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Logging setup failed: {0}")]
    Logging(String),
}

impl BlogClientError {
    /// The store error behind this one, if any
    pub fn as_store_error(&self) -> Option<&StoreError> {
        match self {
            BlogClientError::Store(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.as_store_error().is_some_and(StoreError::is_not_found)
    }

    pub fn is_unique_violation(&self) -> bool {
        self.as_store_error()
            .is_some_and(StoreError::is_unique_violation)
    }

    pub fn is_foreign_key_violation(&self) -> bool {
        self.as_store_error()
            .is_some_and(StoreError::is_foreign_key_violation)
    }
}
