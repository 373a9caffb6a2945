/// Represents SQL aggregate functions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AggregateFunction {
    /// COUNT(*) or COUNT(field)
    Count,
    /// SUM(field)
    Sum,
    /// AVG(field)
    Avg,
    /// MIN(field)
    Min,
    /// MAX(field)
    Max,
    /// COUNT(DISTINCT field)
    CountDistinct,
}

impl AggregateFunction {
    pub fn to_sql(&self) -> &'static str {
        match self {
            AggregateFunction::Count => "COUNT",
            AggregateFunction::Sum => "SUM",
            AggregateFunction::Avg => "AVG",
            AggregateFunction::Min => "MIN",
            AggregateFunction::Max => "MAX",
            AggregateFunction::CountDistinct => "COUNT",
        }
    }

    pub fn is_distinct(&self) -> bool {
        matches!(self, AggregateFunction::CountDistinct)
    }

    /// Prefix used for the result key when no alias is given
    fn key_prefix(&self) -> &'static str {
        match self {
            AggregateFunction::Count => "_count",
            AggregateFunction::Sum => "_sum",
            AggregateFunction::Avg => "_avg",
            AggregateFunction::Min => "_min",
            AggregateFunction::Max => "_max",
            AggregateFunction::CountDistinct => "_count_distinct",
        }
    }
}

/// A column or aggregate in a projection
#[derive(Debug, Clone, PartialEq)]
pub enum SelectField {
    /// Select specific field: SELECT field_name
    Field(String),
    /// Select field under another key
    FieldWithAlias { field: String, alias: String },
    /// Select aggregate function: SELECT COUNT(field)
    Aggregate {
        function: AggregateFunction,
        field: Option<String>, // None for COUNT(*)
        alias: Option<String>,
    },
}

impl SelectField {
    pub fn field(field: impl Into<String>) -> Self {
        SelectField::Field(field.into())
    }

    pub fn field_as(field: impl Into<String>, alias: impl Into<String>) -> Self {
        SelectField::FieldWithAlias {
            field: field.into(),
            alias: alias.into(),
        }
    }

    pub fn count_all() -> Self {
        SelectField::Aggregate {
            function: AggregateFunction::Count,
            field: None,
            alias: None,
        }
    }

    pub fn count(field: impl Into<String>) -> Self {
        Self::aggregate(AggregateFunction::Count, field)
    }

    pub fn count_distinct(field: impl Into<String>) -> Self {
        Self::aggregate(AggregateFunction::CountDistinct, field)
    }

    pub fn sum(field: impl Into<String>) -> Self {
        Self::aggregate(AggregateFunction::Sum, field)
    }

    pub fn avg(field: impl Into<String>) -> Self {
        Self::aggregate(AggregateFunction::Avg, field)
    }

    pub fn min(field: impl Into<String>) -> Self {
        Self::aggregate(AggregateFunction::Min, field)
    }

    pub fn max(field: impl Into<String>) -> Self {
        Self::aggregate(AggregateFunction::Max, field)
    }

    fn aggregate(function: AggregateFunction, field: impl Into<String>) -> Self {
        SelectField::Aggregate {
            function,
            field: Some(field.into()),
            alias: None,
        }
    }

    /// Add an alias to this select field
    pub fn with_alias(self, alias: impl Into<String>) -> Self {
        match self {
            SelectField::Field(field) => SelectField::FieldWithAlias {
                field,
                alias: alias.into(),
            },
            SelectField::FieldWithAlias { field, .. } => SelectField::FieldWithAlias {
                field,
                alias: alias.into(),
            },
            SelectField::Aggregate {
                function, field, ..
            } => SelectField::Aggregate {
                function,
                field,
                alias: Some(alias.into()),
            },
        }
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(self, SelectField::Aggregate { .. })
    }

    /// Whether the value has the type of the column it reads (plain
    /// fields, MIN and MAX)
    pub fn preserves_type(&self) -> bool {
        match self {
            SelectField::Field(_) | SelectField::FieldWithAlias { .. } => true,
            SelectField::Aggregate { function, .. } => {
                matches!(function, AggregateFunction::Min | AggregateFunction::Max)
            }
        }
    }

    /// The column this field reads, if any
    pub fn column(&self) -> Option<&str> {
        match self {
            SelectField::Field(field) | SelectField::FieldWithAlias { field, .. } => Some(field),
            SelectField::Aggregate { field, .. } => field.as_deref(),
        }
    }

    /// SQL expression, e.g. `email` or `COUNT(DISTINCT author_id)`
    pub fn expression(&self) -> String {
        match self {
            SelectField::Field(field) | SelectField::FieldWithAlias { field, .. } => field.clone(),
            SelectField::Aggregate {
                function, field, ..
            } => {
                let argument = match (function.is_distinct(), field) {
                    (true, Some(f)) => format!("DISTINCT {}", f),
                    (false, Some(f)) => f.clone(),
                    (_, None) => "*".to_string(),
                };
                format!("{}({})", function.to_sql(), argument)
            }
        }
    }

    /// Key under which the value appears in the result object
    pub fn result_key(&self) -> String {
        match self {
            SelectField::Field(field) => unqualified(field).to_string(),
            SelectField::FieldWithAlias { alias, .. } => alias.clone(),
            SelectField::Aggregate {
                alias: Some(alias), ..
            } => alias.clone(),
            SelectField::Aggregate {
                function,
                field: Some(field),
                alias: None,
            } => format!("{}_{}", function.key_prefix(), unqualified(field)),
            SelectField::Aggregate {
                function,
                field: None,
                alias: None,
            } => function.key_prefix().to_string(),
        }
    }
}

fn unqualified(field: &str) -> &str {
    field.rsplit('.').next().unwrap_or(field)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_function_to_sql() {
        assert_eq!(AggregateFunction::Count.to_sql(), "COUNT");
        assert_eq!(AggregateFunction::Sum.to_sql(), "SUM");
        assert_eq!(AggregateFunction::Avg.to_sql(), "AVG");
        assert_eq!(AggregateFunction::Min.to_sql(), "MIN");
        assert_eq!(AggregateFunction::Max.to_sql(), "MAX");
        assert_eq!(AggregateFunction::CountDistinct.to_sql(), "COUNT");
    }

    #[test]
    fn test_expressions() {
        assert_eq!(SelectField::count_all().expression(), "COUNT(*)");
        assert_eq!(
            SelectField::count_distinct("author_id").expression(),
            "COUNT(DISTINCT author_id)"
        );
        assert_eq!(SelectField::max("created_at").expression(), "MAX(created_at)");
        assert_eq!(SelectField::field("email").expression(), "email");
    }

    #[test]
    fn test_result_keys() {
        assert_eq!(SelectField::count_all().result_key(), "_count");
        assert_eq!(SelectField::min("created_at").result_key(), "_min_created_at");
        assert_eq!(SelectField::field("posts.title").result_key(), "title");
        assert_eq!(
            SelectField::count("id").with_alias("post_count").result_key(),
            "post_count"
        );
        assert_eq!(
            SelectField::field("email").with_alias("contact").result_key(),
            "contact"
        );
    }

    #[test]
    fn test_column_and_kind() {
        assert_eq!(SelectField::count_all().column(), None);
        assert_eq!(SelectField::avg("id").column(), Some("id"));
        assert!(SelectField::sum("id").is_aggregate());
        assert!(!SelectField::field("id").is_aggregate());
        assert!(SelectField::max("created_at").preserves_type());
        assert!(!SelectField::count("created_at").preserves_type());
    }
}
