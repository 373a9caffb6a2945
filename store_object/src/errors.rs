use thiserror::Error;

/// SQLSTATE raised by PostgreSQL for a unique constraint violation
const UNIQUE_VIOLATION: &str = "23505";
/// SQLSTATE raised by PostgreSQL for a foreign key violation
const FOREIGN_KEY_VIOLATION: &str = "23503";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error on {table} during {operation}: {source}")]
    DatabaseOperation {
        table: String,
        operation: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Query failed on {table}: {source} (query: {query})")]
    QueryExecution {
        table: String,
        query: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Record not found in {table}: {key}")]
    NotFound { table: String, key: String },

    #[error("Unique constraint {constraint} violated on {table}")]
    UniqueViolation { table: String, constraint: String },

    #[error("Foreign key constraint {constraint} violated on {table}")]
    ForeignKeyViolation { table: String, constraint: String },

    #[error("Validation error on {table}.{field}: {message}")]
    Validation {
        table: String,
        field: String,
        message: String,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    #[error("Transaction {action} failed: {source}")]
    Transaction {
        action: &'static str,
        #[source]
        source: sqlx::Error,
    },
}

impl StoreError {
    /// Wrap a sqlx error raised while running `operation` against `table`.
    ///
    /// Constraint violations are classified so callers can match on them
    /// instead of inspecting SQLSTATE codes.
    pub fn database_operation(table: &str, operation: &str, source: sqlx::Error) -> Self {
        if let Some(classified) = Self::classify(table, &source) {
            return classified;
        }
        StoreError::DatabaseOperation {
            table: table.to_string(),
            operation: operation.to_string(),
            source,
        }
    }

    /// Wrap a sqlx error together with the SQL text that produced it
    pub fn query_execution(table: &str, query: &str, source: sqlx::Error) -> Self {
        if let Some(classified) = Self::classify(table, &source) {
            return classified;
        }
        StoreError::QueryExecution {
            table: table.to_string(),
            query: query.to_string(),
            source,
        }
    }

    pub fn validation(table: &str, field: &str, message: impl Into<String>) -> Self {
        StoreError::Validation {
            table: table.to_string(),
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn not_found(table: &str, key: impl Into<String>) -> Self {
        StoreError::NotFound {
            table: table.to_string(),
            key: key.into(),
        }
    }

    pub fn transaction(action: &'static str, source: sqlx::Error) -> Self {
        StoreError::Transaction { action, source }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    pub fn is_unique_violation(&self) -> bool {
        matches!(self, StoreError::UniqueViolation { .. })
    }

    pub fn is_foreign_key_violation(&self) -> bool {
        matches!(self, StoreError::ForeignKeyViolation { .. })
    }

    fn classify(table: &str, source: &sqlx::Error) -> Option<Self> {
        let db_error = source.as_database_error()?;
        let constraint = db_error.constraint().unwrap_or("unknown").to_string();
        match db_error.code().as_deref() {
            Some(UNIQUE_VIOLATION) => Some(StoreError::UniqueViolation {
                table: table.to_string(),
                constraint,
            }),
            Some(FOREIGN_KEY_VIOLATION) => Some(StoreError::ForeignKeyViolation {
                table: table.to_string(),
                constraint,
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_database_errors_are_not_classified() {
        let err = StoreError::database_operation("users", "create", sqlx::Error::RowNotFound);
        assert!(matches!(err, StoreError::DatabaseOperation { .. }));
        assert!(!err.is_unique_violation());
        assert!(err.to_string().contains("users"));
        assert!(err.to_string().contains("create"));
    }

    #[test]
    fn test_query_execution_keeps_sql() {
        let err = StoreError::query_execution("posts", "SELECT 1", sqlx::Error::PoolTimedOut);
        match err {
            StoreError::QueryExecution { table, query, .. } => {
                assert_eq!(table, "posts");
                assert_eq!(query, "SELECT 1");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_not_found_helpers() {
        let err = StoreError::not_found("users", "email = nobody@example.com");
        assert!(err.is_not_found());
        assert_eq!(
            err.to_string(),
            "Record not found in users: email = nobody@example.com"
        );
    }
}
