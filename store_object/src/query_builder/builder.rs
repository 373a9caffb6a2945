//! Query builder utilities
//!
//! This module provides SQL query construction utilities.

use crate::errors::StoreError;
use crate::query_builder::filter::QueryFilter;
use crate::query_builder::ordering::SortOrder;
use crate::query_builder::pagination::Pagination;
use crate::query_builder::sql_generation::SqlGenerator;
use crate::validation::ValidatedFieldName;
use serde_json::Value;

/// Query builder for constructing filtered, ordered and paginated reads
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    pub(crate) conditions: Vec<QueryFilter>,
    pub(crate) order_by: Vec<(String, SortOrder)>,
    pub(crate) pagination: Pagination,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self {
            conditions: Vec::new(),
            order_by: Vec::new(),
            pagination: Pagination::new(),
        }
    }

    /// Add a filter condition
    pub fn filter(mut self, filter: QueryFilter) -> Self {
        self.conditions.push(filter);
        self
    }

    /// Add multiple filters (combined with AND)
    pub fn filters(mut self, filters: Vec<QueryFilter>) -> Self {
        self.conditions.extend(filters);
        self
    }

    /// Add ordering
    pub fn order_by(mut self, field: &str, order: SortOrder) -> Self {
        self.order_by.push((field.to_string(), order));
        self
    }

    /// Return at most `take` rows
    pub fn take(mut self, take: i64) -> Self {
        self.pagination.limit = Some(take);
        self
    }

    /// Skip the first `skip` rows
    pub fn skip(mut self, skip: i64) -> Self {
        self.pagination.offset = Some(skip);
        self
    }

    /// Add limit
    pub fn limit(self, limit: i64) -> Self {
        self.take(limit)
    }

    /// Add offset
    pub fn offset(self, offset: i64) -> Self {
        self.skip(offset)
    }

    /// One-based page of `per_page` rows
    pub fn page(mut self, page: i64, per_page: i64) -> Self {
        self.pagination = Pagination::page(page, per_page);
        self
    }

    pub fn conditions(&self) -> &[QueryFilter] {
        &self.conditions
    }

    pub fn pagination(&self) -> &Pagination {
        &self.pagination
    }

    /// Same filters and ordering, without LIMIT/OFFSET
    pub fn without_pagination(&self) -> Self {
        Self {
            conditions: self.conditions.clone(),
            order_by: self.order_by.clone(),
            pagination: Pagination::new(),
        }
    }

    /// Reject field names that are not plain identifiers and negative
    /// pagination before any SQL is built
    pub fn validate(&self, table: &str) -> Result<(), StoreError> {
        let filter_fields = self.conditions.iter().flat_map(|f| f.field_names());
        let order_fields = self.order_by.iter().map(|(field, _)| field.as_str());

        for field in filter_fields.chain(order_fields) {
            ValidatedFieldName::new(field)
                .map_err(|e| StoreError::validation(table, field, e.to_string()))?;
        }

        if !self.pagination.is_valid() {
            let field = match self.pagination.limit {
                Some(limit) if limit < 0 => "take",
                _ => "skip",
            };
            return Err(StoreError::validation(
                table,
                field,
                "pagination values must not be negative",
            ));
        }

        Ok(())
    }

    /// Build WHERE clause
    pub fn build_where_clause(&self) -> (String, Vec<Value>) {
        SqlGenerator::build_where_clause(&self.conditions)
    }

    /// Build WHERE clause with placeholders starting at `$first_param`
    pub fn build_where_clause_from(&self, first_param: usize) -> (String, Vec<Value>) {
        SqlGenerator::build_where_clause_from(&self.conditions, first_param)
    }

    /// WHERE clause with placeholders starting at `$first_param`, casting
    /// values compared with `timestamp_columns`
    pub fn build_where_clause_typed(
        &self,
        first_param: usize,
        timestamp_columns: &[&str],
    ) -> (String, Vec<Value>) {
        SqlGenerator::build_where_clause_typed(&self.conditions, first_param, timestamp_columns)
    }

    /// Build ORDER BY clause
    pub fn build_order_clause(&self) -> String {
        SqlGenerator::build_order_clause(&self.order_by)
    }

    /// Build LIMIT/OFFSET clause
    pub fn build_limit_clause(&self) -> String {
        SqlGenerator::build_limit_clause(&self.pagination)
    }

    /// Build complete query parts (WHERE, ORDER BY, LIMIT, Values)
    pub fn build(&self) -> (String, String, String, Vec<Value>) {
        let (where_clause, values) = self.build_where_clause();
        let order_clause = self.build_order_clause();
        let limit_clause = self.build_limit_clause();

        (where_clause, order_clause, limit_clause, values)
    }

    /// [`build`](Self::build) with timestamp-typed placeholders
    pub fn build_typed(&self, timestamp_columns: &[&str]) -> (String, String, String, Vec<Value>) {
        let (where_clause, values) = self.build_where_clause_typed(1, timestamp_columns);
        (where_clause, self.build_order_clause(), self.build_limit_clause(), values)
    }
}
