//! Identifier validation
//!
//! Table and column names are interpolated into generated SQL, so every
//! name that reaches the query builder goes through these checks first.

use std::fmt;

/// Validation errors for database identifiers
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Name contains invalid characters (only alphanumeric and underscore allowed)
    InvalidCharacters(String),
    /// Name is too long (PostgreSQL limit is 63 characters)
    TooLong {
        name: String,
        length: usize,
        max_length: usize,
    },
    /// Name is empty
    Empty,
    /// Name starts with invalid character (must start with letter or underscore)
    InvalidStartCharacter(String),
    /// Name is a reserved SQL keyword
    ReservedKeyword(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidCharacters(name) => {
                write!(f, "Invalid characters in name '{}': only alphanumeric characters and underscores are allowed", name)
            }
            ValidationError::TooLong {
                name,
                length,
                max_length,
            } => {
                write!(
                    f,
                    "Name '{}' is too long: {} characters (max {})",
                    name, length, max_length
                )
            }
            ValidationError::Empty => {
                write!(f, "Name cannot be empty")
            }
            ValidationError::InvalidStartCharacter(name) => {
                write!(f, "Name '{}' must start with a letter or underscore", name)
            }
            ValidationError::ReservedKeyword(name) => {
                write!(f, "Name '{}' is a reserved SQL keyword", name)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// A validated table name that is safe to use in SQL queries
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ValidatedTableName(String);

impl ValidatedTableName {
    /// PostgreSQL identifier length limit
    const MAX_LENGTH: usize = 63;

    pub fn new(name: &str) -> Result<Self, ValidationError> {
        Self::validate_identifier(name)?;
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate_identifier(name: &str) -> Result<(), ValidationError> {
        if name.is_empty() {
            return Err(ValidationError::Empty);
        }

        if name.len() > Self::MAX_LENGTH {
            return Err(ValidationError::TooLong {
                name: name.to_string(),
                length: name.len(),
                max_length: Self::MAX_LENGTH,
            });
        }

        let first_char = name.chars().next().ok_or(ValidationError::Empty)?;
        if !first_char.is_ascii_alphabetic() && first_char != '_' {
            return Err(ValidationError::InvalidStartCharacter(name.to_string()));
        }

        if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(ValidationError::InvalidCharacters(name.to_string()));
        }

        if Self::is_reserved_keyword(name) {
            return Err(ValidationError::ReservedKeyword(name.to_string()));
        }

        Ok(())
    }

    fn is_reserved_keyword(name: &str) -> bool {
        const RESERVED_KEYWORDS: &[&str] = &[
            "SELECT", "INSERT", "UPDATE", "DELETE", "FROM", "WHERE", "JOIN", "INNER", "LEFT",
            "RIGHT", "FULL", "OUTER", "ON", "AS", "AND", "OR", "NOT", "NULL", "TRUE", "FALSE",
            "CASE", "WHEN", "THEN", "ELSE", "END", "EXISTS", "IN", "LIKE", "ILIKE", "BETWEEN",
            "ORDER", "BY", "GROUP", "HAVING", "LIMIT", "OFFSET", "UNION", "ALL", "ANY",
            "DISTINCT", "CREATE", "DROP", "ALTER", "TABLE", "INDEX", "PRIMARY", "FOREIGN",
            "REFERENCES", "UNIQUE", "CHECK", "DEFAULT", "CONSTRAINT", "COLUMN", "RETURNING",
            "CONFLICT", "GRANT", "REVOKE", "TRUNCATE", "CASCADE", "USER",
        ];

        RESERVED_KEYWORDS.contains(&name.to_ascii_uppercase().as_str())
    }
}

impl fmt::Display for ValidatedTableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated column reference, either `column` or `table.column`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ValidatedFieldName(String);

impl ValidatedFieldName {
    pub fn new(name: &str) -> Result<Self, ValidationError> {
        match name.split_once('.') {
            Some((table, column)) => {
                ValidatedTableName::validate_identifier(table)?;
                ValidatedTableName::validate_identifier(column)?;
            }
            None => ValidatedTableName::validate_identifier(name)?,
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ValidatedFieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
