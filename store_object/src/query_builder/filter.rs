//! WHERE clause building blocks
//!
//! Filters are plain data. Values are never rendered into SQL text; the
//! generator turns each one into a numbered `$n` placeholder.

use crate::traits::relation::Relation;
use serde_json::Value;

/// Query condition operators
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOperator {
    Eq,        // =
    Ne,        // !=
    Gt,        // >
    Gte,       // >=
    Lt,        // <
    Lte,       // <=
    Like,      // LIKE
    ILike,     // ILIKE (case insensitive)
    In,        // IN
    NotIn,     // NOT IN
    IsNull,    // IS NULL
    IsNotNull, // IS NOT NULL
}

impl QueryOperator {
    /// SQL token for binary comparison operators
    pub fn comparison_sql(&self) -> Option<&'static str> {
        match self {
            QueryOperator::Eq => Some("="),
            QueryOperator::Ne => Some("!="),
            QueryOperator::Gt => Some(">"),
            QueryOperator::Gte => Some(">="),
            QueryOperator::Lt => Some("<"),
            QueryOperator::Lte => Some("<="),
            QueryOperator::Like => Some("LIKE"),
            QueryOperator::ILike => Some("ILIKE"),
            _ => None,
        }
    }
}

/// Single condition in WHERE clause
#[derive(Debug, Clone, PartialEq)]
pub struct QueryCondition {
    pub field: String,
    pub operator: QueryOperator,
    pub value: Option<Value>, // None for IS NULL/IS NOT NULL
}

/// Logical operators for combining conditions
#[derive(Debug, Clone, PartialEq)]
pub enum LogicalOperator {
    And,
    Or,
}

/// How a relation filter quantifies over the related rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationMode {
    /// At least one related row matches
    Some,
    /// No related row matches
    None,
    /// Every related row matches (vacuously true when there are none)
    Every,
}

/// Query filter that can be nested
#[derive(Debug, Clone, PartialEq)]
pub enum QueryFilter {
    Condition(QueryCondition),
    Group {
        operator: LogicalOperator,
        filters: Vec<QueryFilter>,
    },
    Not(Box<QueryFilter>),
    Relation {
        relation: Relation,
        mode: RelationMode,
        filters: Vec<QueryFilter>,
    },
}

impl QueryFilter {
    pub fn condition(field: &str, operator: QueryOperator, value: Option<Value>) -> Self {
        Self::Condition(QueryCondition {
            field: field.to_string(),
            operator,
            value,
        })
    }

    pub fn and(filters: Vec<QueryFilter>) -> Self {
        Self::Group {
            operator: LogicalOperator::And,
            filters,
        }
    }

    pub fn or(filters: Vec<QueryFilter>) -> Self {
        Self::Group {
            operator: LogicalOperator::Or,
            filters,
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(filter: QueryFilter) -> Self {
        Self::Not(Box::new(filter))
    }

    pub fn eq(field: &str, value: Value) -> Self {
        Self::condition(field, QueryOperator::Eq, Some(value))
    }

    pub fn ne(field: &str, value: Value) -> Self {
        Self::condition(field, QueryOperator::Ne, Some(value))
    }

    pub fn gt(field: &str, value: Value) -> Self {
        Self::condition(field, QueryOperator::Gt, Some(value))
    }

    pub fn gte(field: &str, value: Value) -> Self {
        Self::condition(field, QueryOperator::Gte, Some(value))
    }

    pub fn lt(field: &str, value: Value) -> Self {
        Self::condition(field, QueryOperator::Lt, Some(value))
    }

    pub fn lte(field: &str, value: Value) -> Self {
        Self::condition(field, QueryOperator::Lte, Some(value))
    }

    /// LIKE with a caller supplied pattern
    pub fn like(field: &str, pattern: &str) -> Self {
        Self::condition(
            field,
            QueryOperator::Like,
            Some(Value::String(pattern.to_string())),
        )
    }

    /// ILIKE with a caller supplied pattern
    pub fn ilike(field: &str, pattern: &str) -> Self {
        Self::condition(
            field,
            QueryOperator::ILike,
            Some(Value::String(pattern.to_string())),
        )
    }

    /// Substring match; `%` and `_` in `needle` match literally
    pub fn contains(field: &str, needle: &str) -> Self {
        Self::like(field, &format!("%{}%", escape_like(needle)))
    }

    /// Case-insensitive substring match
    pub fn contains_insensitive(field: &str, needle: &str) -> Self {
        Self::ilike(field, &format!("%{}%", escape_like(needle)))
    }

    pub fn starts_with(field: &str, prefix: &str) -> Self {
        Self::like(field, &format!("{}%", escape_like(prefix)))
    }

    pub fn ends_with(field: &str, suffix: &str) -> Self {
        Self::like(field, &format!("%{}", escape_like(suffix)))
    }

    pub fn in_values(field: &str, values: Vec<Value>) -> Self {
        Self::condition(field, QueryOperator::In, Some(Value::Array(values)))
    }

    pub fn not_in_values(field: &str, values: Vec<Value>) -> Self {
        Self::condition(field, QueryOperator::NotIn, Some(Value::Array(values)))
    }

    pub fn is_null(field: &str) -> Self {
        Self::condition(field, QueryOperator::IsNull, None)
    }

    pub fn is_not_null(field: &str) -> Self {
        Self::condition(field, QueryOperator::IsNotNull, None)
    }

    /// Rows with at least one related row matching `filters`
    pub fn some(relation: Relation, filters: Vec<QueryFilter>) -> Self {
        Self::Relation {
            relation,
            mode: RelationMode::Some,
            filters,
        }
    }

    /// Rows with no related row matching `filters`
    pub fn none(relation: Relation, filters: Vec<QueryFilter>) -> Self {
        Self::Relation {
            relation,
            mode: RelationMode::None,
            filters,
        }
    }

    /// Rows whose related rows all match `filters`
    pub fn every(relation: Relation, filters: Vec<QueryFilter>) -> Self {
        Self::Relation {
            relation,
            mode: RelationMode::Every,
            filters,
        }
    }

    /// Every column name referenced by this filter, nested ones included
    pub fn field_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_field_names(&mut names);
        names
    }

    fn collect_field_names<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            QueryFilter::Condition(condition) => names.push(condition.field.as_str()),
            QueryFilter::Group { filters, .. } | QueryFilter::Relation { filters, .. } => {
                for filter in filters {
                    filter.collect_field_names(names);
                }
            }
            QueryFilter::Not(inner) => inner.collect_field_names(names),
        }
    }
}

/// Escape LIKE wildcards so user input matches literally
pub fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
