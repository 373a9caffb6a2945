use super::aggregation::SelectField;
use super::filter::QueryOperator;
use super::ordering::SortOrder;
use serde_json::Value;

/// A HAVING predicate comparing an aggregate against a bound value
#[derive(Debug, Clone, PartialEq)]
pub struct Having {
    pub aggregate: SelectField,
    pub operator: QueryOperator,
    pub value: Value,
}

impl Having {
    pub fn new(aggregate: SelectField, operator: QueryOperator, value: Value) -> Self {
        Self {
            aggregate,
            operator,
            value,
        }
    }

    pub fn gt(aggregate: SelectField, value: Value) -> Self {
        Self::new(aggregate, QueryOperator::Gt, value)
    }

    pub fn gte(aggregate: SelectField, value: Value) -> Self {
        Self::new(aggregate, QueryOperator::Gte, value)
    }

    pub fn lt(aggregate: SelectField, value: Value) -> Self {
        Self::new(aggregate, QueryOperator::Lt, value)
    }

    pub fn eq(aggregate: SelectField, value: Value) -> Self {
        Self::new(aggregate, QueryOperator::Eq, value)
    }
}

/// Represents a GROUP BY clause with its aggregates and HAVING conditions
#[derive(Debug, Clone, PartialEq)]
pub struct GroupBy {
    /// Fields to group by
    pub fields: Vec<String>,
    /// Aggregates computed per group
    pub aggregates: Vec<SelectField>,
    /// Conditions filtering grouped results
    pub having: Vec<Having>,
    /// Ordering by aggregate value
    pub aggregate_order: Vec<(SelectField, SortOrder)>,
}

impl GroupBy {
    pub fn new(fields: Vec<String>) -> Self {
        Self {
            fields,
            aggregates: Vec::new(),
            having: Vec::new(),
            aggregate_order: Vec::new(),
        }
    }

    pub fn single(field: impl Into<String>) -> Self {
        Self::new(vec![field.into()])
    }

    pub fn aggregate(mut self, field: SelectField) -> Self {
        self.aggregates.push(field);
        self
    }

    pub fn having(mut self, condition: Having) -> Self {
        self.having.push(condition);
        self
    }

    pub fn order_by_aggregate(mut self, aggregate: SelectField, order: SortOrder) -> Self {
        self.aggregate_order.push((aggregate, order));
        self
    }

    pub fn has_having(&self) -> bool {
        !self.having.is_empty()
    }

    /// Projection of one result row: grouped fields followed by aggregates
    pub fn projection(&self) -> Vec<SelectField> {
        self.fields
            .iter()
            .map(SelectField::field)
            .chain(self.aggregates.iter().cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_group_by_new() {
        let group_by = GroupBy::new(vec!["author_id".to_string(), "published".to_string()]);

        assert_eq!(group_by.fields, vec!["author_id", "published"]);
        assert!(group_by.aggregates.is_empty());
        assert!(!group_by.has_having());
    }

    #[test]
    fn test_group_by_having_chain() {
        let group_by = GroupBy::single("author_id")
            .aggregate(SelectField::count_all())
            .having(Having::gt(SelectField::count_all(), json!(1)))
            .having(Having::lt(SelectField::max("id"), json!(100)));

        assert!(group_by.has_having());
        assert_eq!(group_by.having.len(), 2);
        assert_eq!(group_by.having[0].operator, QueryOperator::Gt);
    }

    #[test]
    fn test_projection_lists_fields_before_aggregates() {
        let group_by = GroupBy::single("author_id").aggregate(SelectField::count_all());
        let keys: Vec<String> = group_by
            .projection()
            .iter()
            .map(SelectField::result_key)
            .collect();
        assert_eq!(keys, vec!["author_id", "_count"]);
    }
}
