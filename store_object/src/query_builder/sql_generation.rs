//! SQL text generation
//!
//! Every value ends up in the returned parameter list and is referenced
//! from the SQL as `$n`. Callers that prepend their own parameters (an
//! UPDATE's SET list, for instance) start numbering at an offset.
//!
//! Values are bound by their JSON shape, so strings always travel as
//! `text`. A placeholder compared with or written to a timestamp column
//! is cast on the SQL side (`$n::timestamptz`); the `*_typed` builders
//! take the list of such columns.

use crate::query_builder::aggregation::SelectField;
use crate::query_builder::filter::{
    LogicalOperator, QueryCondition, QueryFilter, QueryOperator, RelationMode,
};
use crate::query_builder::grouping::{GroupBy, Having};
use crate::query_builder::ordering::SortOrder;
use crate::query_builder::pagination::Pagination;
use crate::query_builder::update::UpdateSet;
use serde_json::Value;

/// Placeholder `$param`, cast to `timestamptz` when `column` is one of
/// `timestamp_columns`. Qualified names are matched by their last part.
pub fn typed_placeholder(param: usize, column: &str, timestamp_columns: &[&str]) -> String {
    let column = column.rsplit('.').next().unwrap_or(column);
    if timestamp_columns.contains(&column) {
        format!("${}::timestamptz", param)
    } else {
        format!("${}", param)
    }
}

/// Parameters collected while rendering one clause
struct Params<'a> {
    values: Vec<Value>,
    next: usize,
    timestamp_columns: &'a [&'a str],
}

impl<'a> Params<'a> {
    fn new(first_param: usize, timestamp_columns: &'a [&'a str]) -> Self {
        Self {
            values: Vec::new(),
            next: first_param,
            timestamp_columns,
        }
    }

    fn push(&mut self, column: &str, value: &Value) -> String {
        self.values.push(value.clone());
        let placeholder = typed_placeholder(self.next, column, self.timestamp_columns);
        self.next += 1;
        placeholder
    }

    fn push_all(&mut self, column: &str, values: &[Value]) -> Vec<String> {
        values.iter().map(|value| self.push(column, value)).collect()
    }
}

pub struct SqlGenerator;

impl SqlGenerator {
    /// Build WHERE clause from conditions, numbering parameters from `$1`
    pub fn build_where_clause(conditions: &[QueryFilter]) -> (String, Vec<Value>) {
        Self::build_where_clause_from(conditions, 1)
    }

    /// Build WHERE clause from conditions, numbering parameters from
    /// `$first_param`
    pub fn build_where_clause_from(
        conditions: &[QueryFilter],
        first_param: usize,
    ) -> (String, Vec<Value>) {
        Self::build_where_clause_typed(conditions, first_param, &[])
    }

    /// WHERE clause whose placeholders for `timestamp_columns` are cast.
    /// Conditions inside a relation filter use the relation target's
    /// timestamp columns instead.
    pub fn build_where_clause_typed(
        conditions: &[QueryFilter],
        first_param: usize,
        timestamp_columns: &[&str],
    ) -> (String, Vec<Value>) {
        if conditions.is_empty() {
            return (String::new(), Vec::new());
        }

        let mut params = Params::new(first_param, timestamp_columns);

        let conditions_sql = conditions
            .iter()
            .map(|condition| Self::build_filter_sql(condition, &mut params))
            .collect::<Vec<_>>()
            .join(" AND ");

        (format!("WHERE {}", conditions_sql), params.values)
    }

    fn build_filter_sql(filter: &QueryFilter, params: &mut Params<'_>) -> String {
        match filter {
            QueryFilter::Condition(condition) => Self::build_single_condition_sql(condition, params),
            QueryFilter::Group { operator, filters } => {
                if filters.is_empty() {
                    // Neutral element of the group's operator
                    return match operator {
                        LogicalOperator::And => "TRUE".to_string(),
                        LogicalOperator::Or => "FALSE".to_string(),
                    };
                }

                let operator_str = match operator {
                    LogicalOperator::And => " AND ",
                    LogicalOperator::Or => " OR ",
                };

                let group_conditions = filters
                    .iter()
                    .map(|f| Self::build_filter_sql(f, params))
                    .collect::<Vec<_>>()
                    .join(operator_str);

                format!("({})", group_conditions)
            }
            QueryFilter::Not(inner) => {
                format!("NOT ({})", Self::build_filter_sql(inner, params))
            }
            QueryFilter::Relation {
                relation,
                mode,
                filters,
            } => {
                let inner = if filters.is_empty() {
                    None
                } else {
                    let outer = std::mem::replace(
                        &mut params.timestamp_columns,
                        relation.target_timestamp_columns,
                    );
                    let inner = filters
                        .iter()
                        .map(|f| Self::build_filter_sql(f, params))
                        .collect::<Vec<_>>()
                        .join(" AND ");
                    params.timestamp_columns = outer;
                    Some(inner)
                };

                match (mode, inner) {
                    (RelationMode::Some, inner) => format!(
                        "EXISTS ({})",
                        relation.exists_subquery(inner.map(|c| format!("({})", c)).as_deref())
                    ),
                    (RelationMode::None, inner) => format!(
                        "NOT EXISTS ({})",
                        relation.exists_subquery(inner.map(|c| format!("({})", c)).as_deref())
                    ),
                    // Every row of an empty condition matches
                    (RelationMode::Every, None) => "TRUE".to_string(),
                    (RelationMode::Every, Some(inner)) => format!(
                        "NOT EXISTS ({})",
                        relation.exists_subquery(Some(&format!("NOT ({})", inner)))
                    ),
                }
            }
        }
    }

    fn build_single_condition_sql(condition: &QueryCondition, params: &mut Params<'_>) -> String {
        let field = &condition.field;

        match (&condition.operator, &condition.value) {
            (QueryOperator::Eq, None | Some(Value::Null)) | (QueryOperator::IsNull, _) => {
                format!("{} IS NULL", field)
            }
            (QueryOperator::Ne, None | Some(Value::Null)) | (QueryOperator::IsNotNull, _) => {
                format!("{} IS NOT NULL", field)
            }
            (QueryOperator::In, Some(Value::Array(array_values))) => {
                if array_values.is_empty() {
                    return "1=0".to_string();
                }
                let placeholders = params.push_all(field, array_values);
                format!("{} IN ({})", field, placeholders.join(", "))
            }
            (QueryOperator::In, _) => "1=0".to_string(),
            (QueryOperator::NotIn, Some(Value::Array(array_values))) => {
                if array_values.is_empty() {
                    return "1=1".to_string();
                }
                let placeholders = params.push_all(field, array_values);
                format!("{} NOT IN ({})", field, placeholders.join(", "))
            }
            (QueryOperator::NotIn, _) => "1=1".to_string(),
            (operator, Some(value)) => match operator.comparison_sql() {
                Some(sql_operator) => {
                    let param = params.push(field, value);
                    format!("{} {} {}", field, sql_operator, param)
                }
                None => "1=0".to_string(),
            },
            // Comparison without a value matches nothing
            (_, None) => "1=0".to_string(),
        }
    }

    /// Build ORDER BY clause
    pub fn build_order_clause(order_by: &[(String, SortOrder)]) -> String {
        if order_by.is_empty() {
            return String::new();
        }

        let order_items: Vec<String> = order_by
            .iter()
            .map(|(field, order)| format!("{} {}", field, order.to_sql()))
            .collect();

        format!("ORDER BY {}", order_items.join(", "))
    }

    /// Build LIMIT/OFFSET clause
    pub fn build_limit_clause(pagination: &Pagination) -> String {
        pagination.to_sql()
    }

    /// Projection returning each row as one JSON object keyed by
    /// [`SelectField::result_key`]
    pub fn build_json_projection(fields: &[SelectField]) -> String {
        let pairs: Vec<String> = fields
            .iter()
            .map(|field| format!("'{}', {}", field.result_key(), field.expression()))
            .collect();

        format!("jsonb_build_object({}) AS record", pairs.join(", "))
    }

    /// SET list of an UPDATE, numbering parameters from `$first_param`
    pub fn build_set_clause(update: &UpdateSet, first_param: usize) -> (String, Vec<Value>) {
        Self::build_set_clause_typed(update, first_param, &[])
    }

    /// SET list whose placeholders for `timestamp_columns` are cast
    pub fn build_set_clause_typed(
        update: &UpdateSet,
        first_param: usize,
        timestamp_columns: &[&str],
    ) -> (String, Vec<Value>) {
        Self::build_set_clause_on(update, first_param, timestamp_columns, None)
    }

    /// SET list of an `ON CONFLICT DO UPDATE`, where current values are
    /// read through `table` so they cannot be confused with `EXCLUDED`
    pub fn build_conflict_set_clause(
        update: &UpdateSet,
        first_param: usize,
        timestamp_columns: &[&str],
        table: &str,
    ) -> (String, Vec<Value>) {
        Self::build_set_clause_on(update, first_param, timestamp_columns, Some(table))
    }

    fn build_set_clause_on(
        update: &UpdateSet,
        first_param: usize,
        timestamp_columns: &[&str],
        table: Option<&str>,
    ) -> (String, Vec<Value>) {
        let mut params = Params::new(first_param, timestamp_columns);

        let assignments: Vec<String> = update
            .operations
            .iter()
            .map(|(field, operation)| {
                let placeholder = params.push(field, operation.value());
                let current = match table {
                    Some(table) => format!("{}.{}", table, field),
                    None => field.clone(),
                };
                operation.assignment_sql(field, &current, &placeholder)
            })
            .collect();

        (assignments.join(", "), params.values)
    }

    /// Build GROUP BY clause
    pub fn build_group_by_clause(group_by: &GroupBy) -> String {
        if group_by.fields.is_empty() {
            return String::new();
        }
        format!("GROUP BY {}", group_by.fields.join(", "))
    }

    /// Build HAVING clause, numbering parameters from `$first_param`
    pub fn build_having_clause(having: &[Having], first_param: usize) -> (String, Vec<Value>) {
        Self::build_having_clause_typed(having, first_param, &[])
    }

    /// HAVING clause where MIN/MAX over a timestamp column compare
    /// against a cast placeholder
    pub fn build_having_clause_typed(
        having: &[Having],
        first_param: usize,
        timestamp_columns: &[&str],
    ) -> (String, Vec<Value>) {
        if having.is_empty() {
            return (String::new(), Vec::new());
        }

        let mut params = Params::new(first_param, timestamp_columns);

        let conditions: Vec<String> = having
            .iter()
            .map(|condition| {
                let expression = condition.aggregate.expression();
                match condition.operator.comparison_sql() {
                    Some(sql_operator) => {
                        let column = if condition.aggregate.preserves_type() {
                            condition.aggregate.column().unwrap_or_default()
                        } else {
                            ""
                        };
                        let param = params.push(column, &condition.value);
                        format!("{} {} {}", expression, sql_operator, param)
                    }
                    None => match condition.operator {
                        QueryOperator::IsNull => format!("{} IS NULL", expression),
                        QueryOperator::IsNotNull => format!("{} IS NOT NULL", expression),
                        _ => "1=0".to_string(),
                    },
                }
            })
            .collect();

        (format!("HAVING {}", conditions.join(" AND ")), params.values)
    }

    /// ORDER BY for a grouped query: plain fields first, then aggregates
    pub fn build_group_order_clause(
        order_by: &[(String, SortOrder)],
        group_by: &GroupBy,
    ) -> String {
        let combined: Vec<(String, SortOrder)> = order_by
            .iter()
            .cloned()
            .chain(
                group_by
                    .aggregate_order
                    .iter()
                    .map(|(aggregate, order)| (aggregate.expression(), *order)),
            )
            .collect();

        Self::build_order_clause(&combined)
    }
}
