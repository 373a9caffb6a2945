//! Store operations over a single connection
//!
//! Each function issues its SQL on the connection it is handed, so the
//! same code serves pooled stores and transaction-scoped ones.

use super::binding::{bind_json_param, bind_json_params};
use crate::errors::StoreError;
use crate::query_builder::{
    typed_placeholder, GroupBy, QueryBuilder, SelectField, SqlGenerator, UpdateSet,
};
use crate::traits::{CreateInput, TableMetadata, UniqueKey};
use crate::validation::ValidatedFieldName;
use serde_json::Value;
use sqlx::PgConnection;
use std::collections::BTreeSet;
use tracing::debug;

/// Upper bound of bind parameters in one Postgres statement
pub const MAX_BIND_PARAMS: usize = 65_535;

/// Join the non-empty parts with single spaces
fn compose(parts: &[&str]) -> String {
    parts
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
}

fn ensure_column<T: TableMetadata>(field: &str) -> Result<(), StoreError> {
    if T::columns().iter().any(|column| *column == field) {
        Ok(())
    } else {
        Err(StoreError::validation(
            T::table_name(),
            field,
            format!("unknown column for {}", T::table_name()),
        ))
    }
}

fn ensure_unique_key<T: TableMetadata>(key: &T::Unique) -> Result<(), StoreError> {
    let field = key.field();
    if field == T::primary_key_field() || T::unique_fields().contains(&field) {
        Ok(())
    } else {
        Err(StoreError::validation(
            T::table_name(),
            field,
            "not a unique field",
        ))
    }
}

fn ensure_projection<T: TableMetadata>(fields: &[SelectField]) -> Result<(), StoreError> {
    for field in fields {
        if let Some(column) = field.column() {
            ValidatedFieldName::new(column)
                .map_err(|e| StoreError::validation(T::table_name(), column, e.to_string()))?;
        }
        let key = field.result_key();
        ValidatedFieldName::new(&key)
            .map_err(|e| StoreError::validation(T::table_name(), &key, e.to_string()))?;
    }
    Ok(())
}

fn ensure_update_set<T: TableMetadata>(set: &UpdateSet) -> Result<(), StoreError> {
    for field in set.fields() {
        ensure_column::<T>(field)?;
        if field == T::primary_key_field() {
            return Err(StoreError::validation(
                T::table_name(),
                field,
                "primary key cannot be updated",
            ));
        }
    }
    Ok(())
}

/// SET list including the `updated_at` refresh when the table tracks it
fn set_clause<T: TableMetadata>(set: &UpdateSet) -> (String, Vec<Value>) {
    let (clause, values) = SqlGenerator::build_set_clause_typed(set, 1, T::timestamp_columns());
    (with_touch::<T>(clause, set), values)
}

fn with_touch<T: TableMetadata>(mut clause: String, set: &UpdateSet) -> String {
    if T::tracks_updated_at() && !set.fields().any(|f| f == "updated_at") {
        clause.push_str(", updated_at = NOW()");
    }
    clause
}

/// Column list and placeholders of a single-row INSERT
fn insert_columns<T: TableMetadata>(values: &[(&'static str, Value)]) -> (String, String) {
    let columns: Vec<&str> = values.iter().map(|(column, _)| *column).collect();
    let placeholders: Vec<String> = columns
        .iter()
        .enumerate()
        .map(|(i, column)| typed_placeholder(i + 1, column, T::timestamp_columns()))
        .collect();
    (columns.join(", "), placeholders.join(", "))
}

pub async fn find_many<T: TableMetadata>(
    conn: &mut PgConnection,
    query: &QueryBuilder,
) -> Result<Vec<T>, StoreError> {
    query.validate(T::table_name())?;

    let (where_clause, order_clause, limit_clause, params) =
        query.build_typed(T::timestamp_columns());
    let base_sql = T::select_base_sql();
    let sql = compose(&[
        base_sql.as_str(),
        where_clause.as_str(),
        order_clause.as_str(),
        limit_clause.as_str(),
    ]);
    debug!(table = T::table_name(), %sql, params = params.len(), "find_many");

    let sqlx_query = bind_json_params!(sqlx::query_as::<_, T>(&sql), params);
    sqlx_query
        .fetch_all(conn)
        .await
        .map_err(|e| StoreError::query_execution(T::table_name(), &sql, e))
}

pub async fn find_first<T: TableMetadata>(
    conn: &mut PgConnection,
    query: &QueryBuilder,
) -> Result<Option<T>, StoreError> {
    let mut results = find_many::<T>(conn, &query.clone().take(1)).await?;
    Ok(results.pop())
}

pub async fn find_unique<T: TableMetadata>(
    conn: &mut PgConnection,
    key: &T::Unique,
) -> Result<Option<T>, StoreError> {
    ensure_unique_key::<T>(key)?;
    find_first::<T>(conn, &QueryBuilder::new().filter(key.to_filter())).await
}

pub async fn find_unique_or_fail<T: TableMetadata>(
    conn: &mut PgConnection,
    key: &T::Unique,
) -> Result<T, StoreError> {
    find_unique::<T>(conn, key)
        .await?
        .ok_or_else(|| StoreError::not_found(T::table_name(), key.describe()))
}

/// Number of rows matching the filters; pagination is ignored
pub async fn count<T: TableMetadata>(
    conn: &mut PgConnection,
    query: &QueryBuilder,
) -> Result<i64, StoreError> {
    query.validate(T::table_name())?;

    let (where_clause, params) = query.build_where_clause_typed(1, T::timestamp_columns());
    let base_sql = T::count_base_sql();
    let sql = compose(&[base_sql.as_str(), where_clause.as_str()]);
    debug!(table = T::table_name(), %sql, "count");

    let sqlx_query = bind_json_params!(sqlx::query_scalar::<_, i64>(&sql), params);
    sqlx_query
        .fetch_one(conn)
        .await
        .map_err(|e| StoreError::query_execution(T::table_name(), &sql, e))
}

pub async fn create<T: TableMetadata>(
    conn: &mut PgConnection,
    input: &T::Create,
) -> Result<T, StoreError> {
    let values = input.values();
    for (column, _) in &values {
        ensure_column::<T>(column)?;
    }

    let sql = if values.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES RETURNING *", T::table_name())
    } else {
        let (columns, placeholders) = insert_columns::<T>(&values);
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING *",
            T::table_name(),
            columns,
            placeholders
        )
    };
    debug!(table = T::table_name(), %sql, "create");

    let params = values.into_iter().map(|(_, value)| value);
    let sqlx_query = bind_json_params!(sqlx::query_as::<_, T>(&sql), params);
    sqlx_query
        .fetch_one(conn)
        .await
        .map_err(|e| StoreError::query_execution(T::table_name(), &sql, e))
}

/// Multi-row insert returning the number of inserted rows.
///
/// Inputs may set different columns; a column an input leaves out is
/// written as `DEFAULT`. Rows are split into statements that stay under
/// the bind parameter limit, so callers wanting all-or-nothing should run
/// this inside a transaction.
pub async fn create_many<T: TableMetadata>(
    conn: &mut PgConnection,
    inputs: &[T::Create],
    skip_duplicates: bool,
) -> Result<u64, StoreError> {
    if inputs.is_empty() {
        return Ok(0);
    }

    let rows: Vec<Vec<(&'static str, Value)>> = inputs.iter().map(CreateInput::values).collect();
    let mentioned: BTreeSet<&str> = rows.iter().flatten().map(|(column, _)| *column).collect();
    for column in &mentioned {
        ensure_column::<T>(column)?;
    }
    // Table order keeps the generated column list stable
    let columns: Vec<&'static str> = T::columns()
        .iter()
        .copied()
        .filter(|column| mentioned.contains(column))
        .collect();

    let conflict = if skip_duplicates {
        " ON CONFLICT DO NOTHING"
    } else {
        ""
    };

    if columns.is_empty() {
        let sql = format!("INSERT INTO {} DEFAULT VALUES{}", T::table_name(), conflict);
        let mut inserted = 0;
        for _ in &rows {
            inserted += sqlx::query(&sql)
                .execute(&mut *conn)
                .await
                .map_err(|e| StoreError::query_execution(T::table_name(), &sql, e))?
                .rows_affected();
        }
        return Ok(inserted);
    }

    let rows_per_statement = (MAX_BIND_PARAMS / columns.len()).max(1);
    let mut inserted = 0;

    for chunk in rows.chunks(rows_per_statement) {
        let mut params = Vec::new();
        let tuples: Vec<String> = chunk
            .iter()
            .map(|row| {
                let cells: Vec<String> = columns
                    .iter()
                    .map(|column| match row.iter().find(|(c, _)| c == column) {
                        Some((_, value)) => {
                            params.push(value.clone());
                            typed_placeholder(params.len(), column, T::timestamp_columns())
                        }
                        None => "DEFAULT".to_string(),
                    })
                    .collect();
                format!("({})", cells.join(", "))
            })
            .collect();

        let sql = format!(
            "INSERT INTO {} ({}) VALUES {}{}",
            T::table_name(),
            columns.join(", "),
            tuples.join(", "),
            conflict
        );
        debug!(
            table = T::table_name(),
            rows = chunk.len(),
            params = params.len(),
            "create_many"
        );

        let sqlx_query = bind_json_params!(sqlx::query(&sql), params);
        inserted += sqlx_query
            .execute(&mut *conn)
            .await
            .map_err(|e| StoreError::query_execution(T::table_name(), &sql, e))?
            .rows_affected();
    }

    Ok(inserted)
}

/// Update the row identified by `key`. An empty set leaves the row
/// untouched and returns it as stored.
pub async fn update<T: TableMetadata>(
    conn: &mut PgConnection,
    key: &T::Unique,
    set: &UpdateSet,
) -> Result<T, StoreError> {
    ensure_unique_key::<T>(key)?;
    if set.is_empty() {
        return find_unique_or_fail::<T>(conn, key).await;
    }
    ensure_update_set::<T>(set)?;

    let (set_sql, mut params) = set_clause::<T>(set);
    let (where_clause, where_params) =
        SqlGenerator::build_where_clause_typed(
            &[key.to_filter()],
            params.len() + 1,
            T::timestamp_columns(),
        );
    params.extend(where_params);

    let sql = format!(
        "UPDATE {} SET {} {} RETURNING *",
        T::table_name(),
        set_sql,
        where_clause
    );
    debug!(table = T::table_name(), %sql, "update");

    let sqlx_query = bind_json_params!(sqlx::query_as::<_, T>(&sql), params);
    sqlx_query
        .fetch_optional(conn)
        .await
        .map_err(|e| StoreError::query_execution(T::table_name(), &sql, e))?
        .ok_or_else(|| StoreError::not_found(T::table_name(), key.describe()))
}

/// Update all rows matching the filters, returning how many changed.
/// Pagination is ignored; an empty set changes nothing and returns the
/// number of matching rows.
pub async fn update_many<T: TableMetadata>(
    conn: &mut PgConnection,
    query: &QueryBuilder,
    set: &UpdateSet,
) -> Result<u64, StoreError> {
    if set.is_empty() {
        let matching = count::<T>(conn, query).await?;
        return Ok(matching.max(0) as u64);
    }
    query.validate(T::table_name())?;
    ensure_update_set::<T>(set)?;

    let (set_sql, mut params) = set_clause::<T>(set);
    let (where_clause, where_params) =
        query.build_where_clause_typed(params.len() + 1, T::timestamp_columns());
    params.extend(where_params);

    let head = format!("UPDATE {} SET {}", T::table_name(), set_sql);
    let sql = compose(&[head.as_str(), where_clause.as_str()]);
    debug!(table = T::table_name(), %sql, "update_many");

    let sqlx_query = bind_json_params!(sqlx::query(&sql), params);
    Ok(sqlx_query
        .execute(conn)
        .await
        .map_err(|e| StoreError::query_execution(T::table_name(), &sql, e))?
        .rows_affected())
}

/// Update the row identified by `key` when it exists, insert `create`
/// otherwise.
///
/// When `create` writes the key column with the key's value this is one
/// `INSERT .. ON CONFLICT` statement, so concurrent upserts of the same
/// key never fail with a unique violation. Otherwise the row is looked up
/// first and only a transaction makes the pair atomic.
pub async fn upsert<T: TableMetadata>(
    conn: &mut PgConnection,
    key: &T::Unique,
    create_input: &T::Create,
    set: &UpdateSet,
) -> Result<T, StoreError> {
    ensure_unique_key::<T>(key)?;

    let values = create_input.values();
    let key_value = key.value();
    let inserts_key = values
        .iter()
        .any(|(column, value)| *column == key.field() && *value == key_value);
    if !inserts_key {
        return match find_unique::<T>(conn, key).await? {
            Some(_) => update::<T>(conn, key, set).await,
            None => create::<T>(conn, create_input).await,
        };
    }

    for (column, _) in &values {
        ensure_column::<T>(column)?;
    }
    ensure_update_set::<T>(set)?;

    let (columns, placeholders) = insert_columns::<T>(&values);
    let mut params: Vec<Value> = values.into_iter().map(|(_, value)| value).collect();

    // An empty set leaves an existing row untouched, `updated_at` included
    let action = if set.is_empty() {
        "DO NOTHING".to_string()
    } else {
        let (set_sql, set_params) = SqlGenerator::build_conflict_set_clause(
            set,
            params.len() + 1,
            T::timestamp_columns(),
            T::table_name(),
        );
        params.extend(set_params);
        format!("DO UPDATE SET {}", with_touch::<T>(set_sql, set))
    };

    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT ({}) {} RETURNING *",
        T::table_name(),
        columns,
        placeholders,
        key.field(),
        action
    );
    debug!(table = T::table_name(), %sql, "upsert");

    let sqlx_query = bind_json_params!(sqlx::query_as::<_, T>(&sql), params);
    let written = sqlx_query
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| StoreError::query_execution(T::table_name(), &sql, e))?;

    match written {
        Some(record) => Ok(record),
        None => find_unique_or_fail::<T>(conn, key).await,
    }
}

pub async fn delete<T: TableMetadata>(
    conn: &mut PgConnection,
    key: &T::Unique,
) -> Result<T, StoreError> {
    ensure_unique_key::<T>(key)?;

    let (where_clause, params) =
        SqlGenerator::build_where_clause_typed(&[key.to_filter()], 1, T::timestamp_columns());
    let sql = format!("DELETE FROM {} {} RETURNING *", T::table_name(), where_clause);
    debug!(table = T::table_name(), %sql, "delete");

    let sqlx_query = bind_json_params!(sqlx::query_as::<_, T>(&sql), params);
    sqlx_query
        .fetch_optional(conn)
        .await
        .map_err(|e| StoreError::query_execution(T::table_name(), &sql, e))?
        .ok_or_else(|| StoreError::not_found(T::table_name(), key.describe()))
}

/// Delete all rows matching the filters; pagination is ignored
pub async fn delete_many<T: TableMetadata>(
    conn: &mut PgConnection,
    query: &QueryBuilder,
) -> Result<u64, StoreError> {
    query.validate(T::table_name())?;

    let (where_clause, params) = query.build_where_clause_typed(1, T::timestamp_columns());
    let delete_sql = format!("DELETE FROM {}", T::table_name());
    let sql = compose(&[delete_sql.as_str(), where_clause.as_str()]);
    debug!(table = T::table_name(), %sql, "delete_many");

    let sqlx_query = bind_json_params!(sqlx::query(&sql), params);
    Ok(sqlx_query
        .execute(conn)
        .await
        .map_err(|e| StoreError::query_execution(T::table_name(), &sql, e))?
        .rows_affected())
}

/// Rows projected onto `fields`, one JSON object per row. An empty field
/// list selects every column.
pub async fn select<T: TableMetadata>(
    conn: &mut PgConnection,
    query: &QueryBuilder,
    fields: &[SelectField],
) -> Result<Vec<Value>, StoreError> {
    query.validate(T::table_name())?;
    let fields: Vec<SelectField> = if fields.is_empty() {
        T::columns().iter().map(|c| SelectField::field(*c)).collect()
    } else {
        fields.to_vec()
    };
    ensure_projection::<T>(&fields)?;
    if let Some(aggregate) = fields.iter().find(|f| f.is_aggregate()) {
        return Err(StoreError::validation(
            T::table_name(),
            &aggregate.result_key(),
            "aggregates belong in aggregate or group_by",
        ));
    }

    let (where_clause, order_clause, limit_clause, params) =
        query.build_typed(T::timestamp_columns());
    let projection = SqlGenerator::build_json_projection(&fields);
    let head = format!("SELECT {} FROM {}", projection, T::table_name());
    let sql = compose(&[
        head.as_str(),
        where_clause.as_str(),
        order_clause.as_str(),
        limit_clause.as_str(),
    ]);
    debug!(table = T::table_name(), %sql, "select");

    let sqlx_query = bind_json_params!(sqlx::query_scalar::<_, Value>(&sql), params);
    sqlx_query
        .fetch_all(conn)
        .await
        .map_err(|e| StoreError::query_execution(T::table_name(), &sql, e))
}

/// Aggregates over the matching rows as one JSON object. With pagination
/// the aggregates cover only the selected window.
pub async fn aggregate<T: TableMetadata>(
    conn: &mut PgConnection,
    query: &QueryBuilder,
    fields: &[SelectField],
) -> Result<Value, StoreError> {
    query.validate(T::table_name())?;
    if fields.is_empty() {
        return Err(StoreError::validation(
            T::table_name(),
            "aggregate",
            "at least one aggregate is required",
        ));
    }
    ensure_projection::<T>(fields)?;
    if let Some(plain) = fields.iter().find(|f| !f.is_aggregate()) {
        return Err(StoreError::validation(
            T::table_name(),
            &plain.result_key(),
            "plain columns need group_by",
        ));
    }

    let (where_clause, order_clause, limit_clause, params) =
        query.build_typed(T::timestamp_columns());
    let projection = SqlGenerator::build_json_projection(fields);
    let source = if limit_clause.is_empty() {
        compose(&[T::table_name(), where_clause.as_str()])
    } else {
        // Aliased back to the table name so qualified fields still resolve
        format!(
            "({}) AS {}",
            compose(&[
                T::select_base_sql().as_str(),
                where_clause.as_str(),
                order_clause.as_str(),
                limit_clause.as_str(),
            ]),
            T::table_name()
        )
    };
    let sql = format!("SELECT {} FROM {}", projection, source);
    debug!(table = T::table_name(), %sql, "aggregate");

    let sqlx_query = bind_json_params!(sqlx::query_scalar::<_, Value>(&sql), params);
    sqlx_query
        .fetch_one(conn)
        .await
        .map_err(|e| StoreError::query_execution(T::table_name(), &sql, e))
}

/// Grouped aggregates, one JSON object per group
pub async fn group_by<T: TableMetadata>(
    conn: &mut PgConnection,
    query: &QueryBuilder,
    group: &GroupBy,
) -> Result<Vec<Value>, StoreError> {
    query.validate(T::table_name())?;
    if group.fields.is_empty() {
        return Err(StoreError::validation(
            T::table_name(),
            "group_by",
            "at least one field to group by is required",
        ));
    }
    for field in &group.fields {
        ensure_column::<T>(field)?;
    }
    let projection_fields = group.projection();
    ensure_projection::<T>(&projection_fields)?;
    let having_fields: Vec<SelectField> = group
        .having
        .iter()
        .map(|h| h.aggregate.clone())
        .chain(group.aggregate_order.iter().map(|(a, _)| a.clone()))
        .collect();
    ensure_projection::<T>(&having_fields)?;

    let (where_clause, mut params) = query.build_where_clause_typed(1, T::timestamp_columns());
    let (having_clause, having_params) =
        SqlGenerator::build_having_clause_typed(
            &group.having,
            params.len() + 1,
            T::timestamp_columns(),
        );
    params.extend(having_params);

    let projection = SqlGenerator::build_json_projection(&projection_fields);
    let group_clause = SqlGenerator::build_group_by_clause(group);
    let order_clause = SqlGenerator::build_group_order_clause(&query.order_by, group);
    let limit_clause = query.build_limit_clause();
    let head = format!("SELECT {} FROM {}", projection, T::table_name());
    let sql = compose(&[
        head.as_str(),
        where_clause.as_str(),
        group_clause.as_str(),
        having_clause.as_str(),
        order_clause.as_str(),
        limit_clause.as_str(),
    ]);
    debug!(table = T::table_name(), %sql, "group_by");

    let sqlx_query = bind_json_params!(sqlx::query_scalar::<_, Value>(&sql), params);
    sqlx_query
        .fetch_all(conn)
        .await
        .map_err(|e| StoreError::query_execution(T::table_name(), &sql, e))
}

#[cfg(test)]
mod tests {
    use super::compose;

    #[test]
    fn test_compose_skips_empty_parts() {
        assert_eq!(
            compose(&["SELECT * FROM users", "", "ORDER BY id ASC", ""]),
            "SELECT * FROM users ORDER BY id ASC"
        );
        assert_eq!(compose(&[]), "");
    }
}
