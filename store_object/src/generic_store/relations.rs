//! Batched relation loading and join table maintenance
//!
//! Related rows are fetched with one `= ANY($1)` query per relation and
//! grouped by the key they belong to, so including a relation costs one
//! round trip no matter how many parent rows there are.

use crate::errors::StoreError;
use crate::traits::{JoinTable, Relation, TableMetadata};
use sqlx::postgres::PgRow;
use sqlx::{PgExecutor, Row};
use std::collections::HashMap;

/// Key column injected into every row of a relation load
const PARENT_KEY: &str = "__parent_key";

fn distinct_keys(keys: &[i32]) -> Vec<i32> {
    let mut keys = keys.to_vec();
    keys.sort_unstable();
    keys.dedup();
    keys
}

/// Related rows grouped by the key they were matched on.
///
/// For direct relations `keys` are values of the target's
/// `target_key` column; for join-table relations they are source row
/// keys. Keys without related rows are absent from the map.
pub async fn load_related<'e, C, E>(
    executor: E,
    relation: &Relation,
    keys: &[i32],
) -> Result<HashMap<i32, Vec<C>>, StoreError>
where
    C: TableMetadata,
    E: PgExecutor<'e>,
{
    let keys = distinct_keys(keys);
    if keys.is_empty() {
        return Ok(HashMap::new());
    }

    let sql = relation.load_sql(C::primary_key_field());
    tracing::debug!(
        relation = relation.name,
        table = C::table_name(),
        keys = keys.len(),
        %sql,
        "load_related"
    );

    let rows = sqlx::query(&sql)
        .bind(keys)
        .fetch_all(executor)
        .await
        .map_err(|e| StoreError::query_execution(C::table_name(), &sql, e))?;

    let mut grouped: HashMap<i32, Vec<C>> = HashMap::new();
    for row in rows {
        let (key, record) = decode_related::<C>(&row)
            .map_err(|e| StoreError::query_execution(C::table_name(), &sql, e))?;
        grouped.entry(key).or_default().push(record);
    }
    Ok(grouped)
}

fn decode_related<C: TableMetadata>(row: &PgRow) -> Result<(i32, C), sqlx::Error> {
    let key: i32 = row.try_get(PARENT_KEY)?;
    let record = C::from_row(row)?;
    Ok((key, record))
}

/// Children of each parent, keyed by parent id (`User.posts`)
pub async fn load_one_to_many<'e, C, E>(
    executor: E,
    relation: &Relation,
    parent_ids: &[i32],
) -> Result<HashMap<i32, Vec<C>>, StoreError>
where
    C: TableMetadata,
    E: PgExecutor<'e>,
{
    load_related(executor, relation, parent_ids).await
}

/// The single child of each parent, keyed by parent id (`User.profile`)
pub async fn load_one_to_one<'e, C, E>(
    executor: E,
    relation: &Relation,
    parent_ids: &[i32],
) -> Result<HashMap<i32, C>, StoreError>
where
    C: TableMetadata,
    E: PgExecutor<'e>,
{
    Ok(first_of_each(load_related(executor, relation, parent_ids).await?))
}

/// Referenced rows keyed by their id (`Post.author`). Callers look the
/// result up with each child's foreign key value.
pub async fn load_many_to_one<'e, C, E>(
    executor: E,
    relation: &Relation,
    foreign_keys: &[i32],
) -> Result<HashMap<i32, C>, StoreError>
where
    C: TableMetadata,
    E: PgExecutor<'e>,
{
    Ok(first_of_each(load_related(executor, relation, foreign_keys).await?))
}

/// Rows reachable through a join table, keyed by source id (`Post.tags`)
pub async fn load_many_to_many<'e, C, E>(
    executor: E,
    relation: &Relation,
    source_ids: &[i32],
) -> Result<HashMap<i32, Vec<C>>, StoreError>
where
    C: TableMetadata,
    E: PgExecutor<'e>,
{
    if relation.through.is_none() {
        return Err(StoreError::InvalidConfiguration {
            message: format!("relation {} has no join table", relation.name),
        });
    }
    load_related(executor, relation, source_ids).await
}

fn first_of_each<C>(grouped: HashMap<i32, Vec<C>>) -> HashMap<i32, C> {
    grouped
        .into_iter()
        .filter_map(|(key, records)| records.into_iter().next().map(|record| (key, record)))
        .collect()
}

/// Link `source_id` to every id in `target_ids`; existing links are kept.
/// Returns the number of new links.
pub async fn connect<'e, E>(
    executor: E,
    join: &JoinTable,
    source_id: i32,
    target_ids: &[i32],
) -> Result<u64, StoreError>
where
    E: PgExecutor<'e>,
{
    let target_ids = distinct_keys(target_ids);
    if target_ids.is_empty() {
        return Ok(0);
    }

    let sql = format!(
        "INSERT INTO {table} ({source}, {target}) SELECT $1, UNNEST($2::int4[]) ON CONFLICT DO NOTHING",
        table = join.table,
        source = join.source_column,
        target = join.target_column,
    );
    tracing::debug!(table = join.table, source_id, links = target_ids.len(), "connect");

    Ok(sqlx::query(&sql)
        .bind(source_id)
        .bind(target_ids)
        .execute(executor)
        .await
        .map_err(|e| StoreError::query_execution(join.table, &sql, e))?
        .rows_affected())
}

/// Remove the links between `source_id` and `target_ids`.
/// Returns the number of removed links.
pub async fn disconnect<'e, E>(
    executor: E,
    join: &JoinTable,
    source_id: i32,
    target_ids: &[i32],
) -> Result<u64, StoreError>
where
    E: PgExecutor<'e>,
{
    let target_ids = distinct_keys(target_ids);
    if target_ids.is_empty() {
        return Ok(0);
    }

    let sql = format!(
        "DELETE FROM {table} WHERE {source} = $1 AND {target} = ANY($2)",
        table = join.table,
        source = join.source_column,
        target = join.target_column,
    );
    tracing::debug!(table = join.table, source_id, links = target_ids.len(), "disconnect");

    Ok(sqlx::query(&sql)
        .bind(source_id)
        .bind(target_ids)
        .execute(executor)
        .await
        .map_err(|e| StoreError::query_execution(join.table, &sql, e))?
        .rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distinct_keys_sorts_and_dedups() {
        assert_eq!(distinct_keys(&[3, 1, 3, 2, 1]), vec![1, 2, 3]);
        assert!(distinct_keys(&[]).is_empty());
    }

    #[test]
    fn test_first_of_each_keeps_one_record_per_key() {
        let mut grouped = HashMap::new();
        grouped.insert(1, vec!["a", "b"]);
        grouped.insert(2, vec![]);
        grouped.insert(3, vec!["c"]);

        let firsts = first_of_each(grouped);
        assert_eq!(firsts.len(), 2);
        assert_eq!(firsts[&1], "a");
        assert_eq!(firsts[&3], "c");
    }
}
