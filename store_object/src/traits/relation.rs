//! Relation metadata
//!
//! A relation links rows of a source table to rows of a target table,
//! either directly through a foreign key or through a join table. The
//! same description drives relation filters (EXISTS sub-queries) and
//! batched relation loading.

/// Cardinality of a relation, seen from its source table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    OneToOne,
    OneToMany,
    ManyToOne,
    ManyToMany,
}

/// Join table of a many-to-many relation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinTable {
    pub table: &'static str,
    /// Column holding the source row's key
    pub source_column: &'static str,
    /// Column holding the target row's key
    pub target_column: &'static str,
}

impl JoinTable {
    /// The same join table walked in the opposite direction
    pub const fn reversed(&self) -> Self {
        Self {
            table: self.table,
            source_column: self.target_column,
            target_column: self.source_column,
        }
    }
}

/// A named, directed relation between two tables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relation {
    pub name: &'static str,
    pub kind: RelationKind,
    pub source_table: &'static str,
    /// Column on the source table the relation is keyed by
    pub source_key: &'static str,
    pub target_table: &'static str,
    /// Column on the target table matched against the source key
    pub target_key: &'static str,
    pub through: Option<JoinTable>,
    /// Target columns holding timestamps, cast in relation filters
    pub target_timestamp_columns: &'static [&'static str],
}

impl Relation {
    /// Relation resolved by comparing `target.target_key = source.source_key`
    pub const fn direct(
        name: &'static str,
        kind: RelationKind,
        source: (&'static str, &'static str),
        target: (&'static str, &'static str),
    ) -> Self {
        Self {
            name,
            kind,
            source_table: source.0,
            source_key: source.1,
            target_table: target.0,
            target_key: target.1,
            through: None,
            target_timestamp_columns: &[],
        }
    }

    /// Many-to-many relation resolved through `through`
    pub const fn many_to_many(
        name: &'static str,
        source: (&'static str, &'static str),
        target: (&'static str, &'static str),
        through: JoinTable,
    ) -> Self {
        Self {
            name,
            kind: RelationKind::ManyToMany,
            source_table: source.0,
            source_key: source.1,
            target_table: target.0,
            target_key: target.1,
            through: Some(through),
            target_timestamp_columns: &[],
        }
    }

    /// Same relation, declaring which target columns are timestamps
    pub const fn with_target_timestamps(mut self, columns: &'static [&'static str]) -> Self {
        self.target_timestamp_columns = columns;
        self
    }

    /// Whether a source row can have more than one related row
    pub fn is_to_many(&self) -> bool {
        matches!(self.kind, RelationKind::OneToMany | RelationKind::ManyToMany)
    }

    /// Correlated sub-query selecting the related rows of the current
    /// source row, optionally restricted by `condition`
    pub(crate) fn exists_subquery(&self, condition: Option<&str>) -> String {
        let mut sql = match &self.through {
            Some(join) => format!(
                "SELECT 1 FROM {target} INNER JOIN {join} ON {join}.{join_target} = {target}.{target_key} \
                 WHERE {join}.{join_source} = {source}.{source_key}",
                target = self.target_table,
                target_key = self.target_key,
                join = join.table,
                join_target = join.target_column,
                join_source = join.source_column,
                source = self.source_table,
                source_key = self.source_key,
            ),
            None => format!(
                "SELECT 1 FROM {target} WHERE {target}.{target_key} = {source}.{source_key}",
                target = self.target_table,
                target_key = self.target_key,
                source = self.source_table,
                source_key = self.source_key,
            ),
        };

        if let Some(condition) = condition {
            sql.push_str(" AND ");
            sql.push_str(condition);
        }
        sql
    }

    /// Batched load of target rows for a set of source key values bound as
    /// `$1`. Each row carries the source key it belongs to as `__parent_key`.
    pub(crate) fn load_sql(&self, target_primary_key: &str) -> String {
        match &self.through {
            Some(join) => format!(
                "SELECT j.{join_source} AS __parent_key, t.* FROM {target} t \
                 INNER JOIN {join} j ON j.{join_target} = t.{target_key} \
                 WHERE j.{join_source} = ANY($1) ORDER BY t.{pk}",
                join_source = join.source_column,
                join_target = join.target_column,
                join = join.table,
                target = self.target_table,
                target_key = self.target_key,
                pk = target_primary_key,
            ),
            None => format!(
                "SELECT t.{target_key} AS __parent_key, t.* FROM {target} t \
                 WHERE t.{target_key} = ANY($1) ORDER BY t.{pk}",
                target_key = self.target_key,
                target = self.target_table,
                pk = target_primary_key,
            ),
        }
    }
}
