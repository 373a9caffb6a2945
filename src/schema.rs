//! Blog schema definition
//!
//! The schema is the list of tables in dependency order plus the named
//! relations between the models. Migrations render it into DDL.

use crate::models::{Post, PostTag, Profile, Tag, User};
use store_object::{Relation, TableMetadata};

/// Name of the trigger function keeping `updated_at` current
const TOUCH_FUNCTION: &str = "blogstore_touch_updated_at";

/// DDL of one table
#[derive(Debug, Clone, Copy)]
pub struct TableDef {
    pub name: &'static str,
    pub create_table_sql: fn() -> String,
    pub create_indexes_sql: fn() -> Vec<String>,
    pub drop_table_sql: fn() -> String,
    pub tracks_updated_at: bool,
}

impl TableDef {
    /// Table definition of a model
    pub fn of<T: TableMetadata>() -> Self {
        Self {
            name: T::table_name(),
            create_table_sql: T::create_table_sql,
            create_indexes_sql: T::create_indexes_sql,
            drop_table_sql: T::drop_table_sql,
            tracks_updated_at: T::tracks_updated_at(),
        }
    }

    /// CREATE TABLE, its indexes and, when the table has `updated_at`, its
    /// touch trigger
    pub fn create_sql(&self) -> Vec<String> {
        let mut statements = vec![(self.create_table_sql)()];
        statements.extend((self.create_indexes_sql)());
        if self.tracks_updated_at {
            statements.extend(touch_trigger_sql(self.name));
        }
        statements
    }
}

/// A relation together with the model it is declared on
#[derive(Debug, Clone, Copy)]
pub struct NamedRelation {
    pub model: &'static str,
    pub relation: Relation,
}

#[derive(Debug, Clone)]
pub struct Schema {
    tables: Vec<TableDef>,
    relations: Vec<NamedRelation>,
}

impl Schema {
    /// users, profiles, posts, tags and the post_tags link table
    pub fn blog() -> Self {
        let tables = vec![
            TableDef::of::<User>(),
            TableDef::of::<Profile>(),
            TableDef::of::<Post>(),
            TableDef::of::<Tag>(),
            TableDef {
                name: PostTag::table_name(),
                create_table_sql: PostTag::create_table_sql,
                create_indexes_sql: PostTag::create_indexes_sql,
                drop_table_sql: PostTag::drop_table_sql,
                tracks_updated_at: false,
            },
        ];

        let relations = [
            ("User", User::PROFILE),
            ("User", User::POSTS),
            ("Profile", Profile::USER),
            ("Post", Post::AUTHOR),
            ("Post", Post::TAGS),
            ("Tag", Tag::POSTS),
        ]
        .into_iter()
        .map(|(model, relation)| NamedRelation { model, relation })
        .collect();

        Self { tables, relations }
    }

    /// Tables in dependency order; referenced tables come first
    pub fn tables(&self) -> &[TableDef] {
        &self.tables
    }

    pub fn relations(&self) -> &[NamedRelation] {
        &self.relations
    }

    /// Look a relation up by model and relation name, e.g. `("Post", "tags")`
    pub fn relation(&self, model: &str, name: &str) -> Option<&Relation> {
        self.relations
            .iter()
            .find(|r| r.model == model && r.relation.name == name)
            .map(|r| &r.relation)
    }

    /// Statements creating every table, index and trigger
    pub fn create_sql(&self) -> Vec<String> {
        let mut statements = vec![touch_function_sql()];
        for table in &self.tables {
            statements.extend(table.create_sql());
        }
        statements
    }

    /// Statements dropping every table, referencing tables first
    pub fn drop_sql(&self) -> Vec<String> {
        self.tables
            .iter()
            .rev()
            .map(|table| (table.drop_table_sql)())
            .collect()
    }
}

pub(crate) fn touch_function_sql() -> String {
    format!(
        "CREATE OR REPLACE FUNCTION {TOUCH_FUNCTION}()
        RETURNS TRIGGER AS $$
        BEGIN
            NEW.updated_at = NOW();
            RETURN NEW;
        END;
        $$ LANGUAGE plpgsql"
    )
}

pub(crate) fn touch_trigger_sql(table: &str) -> Vec<String> {
    vec![
        format!("DROP TRIGGER IF EXISTS touch_{table}_updated_at ON {table}"),
        format!(
            "CREATE TRIGGER touch_{table}_updated_at \
             BEFORE UPDATE ON {table} \
             FOR EACH ROW EXECUTE FUNCTION {TOUCH_FUNCTION}()"
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use store_object::RelationKind;

    fn position(statements: &[String], needle: &str) -> usize {
        statements
            .iter()
            .position(|s| s.contains(needle))
            .unwrap_or_else(|| panic!("no statement contains {needle}"))
    }

    #[test]
    fn test_referenced_tables_are_created_first() {
        let sql = Schema::blog().create_sql();
        let users = position(&sql, "CREATE TABLE IF NOT EXISTS users");
        let profiles = position(&sql, "CREATE TABLE IF NOT EXISTS profiles");
        let posts = position(&sql, "CREATE TABLE IF NOT EXISTS posts");
        let tags = position(&sql, "CREATE TABLE IF NOT EXISTS tags");
        let post_tags = position(&sql, "CREATE TABLE IF NOT EXISTS post_tags");

        assert!(users < profiles);
        assert!(users < posts);
        assert!(posts < post_tags);
        assert!(tags < post_tags);
        assert!(sql[0].contains("CREATE OR REPLACE FUNCTION"));
    }

    #[test]
    fn test_unique_constraints_are_declared() {
        let sql = Schema::blog().create_sql().join("\n");
        assert!(sql.contains("email TEXT NOT NULL UNIQUE"));
        assert!(sql.contains("name TEXT NOT NULL UNIQUE"));
        assert!(sql.contains("user_id INTEGER NOT NULL UNIQUE"));
        assert!(sql.contains("PRIMARY KEY (post_id, tag_id)"));
    }

    #[test]
    fn test_touch_triggers_only_on_timestamped_tables() {
        let sql = Schema::blog().create_sql();
        let triggers: Vec<&String> = sql
            .iter()
            .filter(|s| s.starts_with("CREATE TRIGGER"))
            .collect();
        assert_eq!(triggers.len(), 2);
        assert!(triggers[0].contains("ON users"));
        assert!(triggers[1].contains("ON posts"));
    }

    #[test]
    fn test_drop_in_reverse_order() {
        let sql = Schema::blog().drop_sql();
        assert_eq!(sql.first().map(String::as_str), Some("DROP TABLE IF EXISTS post_tags CASCADE"));
        assert_eq!(sql.last().map(String::as_str), Some("DROP TABLE IF EXISTS users CASCADE"));
    }

    #[test]
    fn test_relation_lookup() {
        let schema = Schema::blog();
        let tags = schema.relation("Post", "tags").expect("Post.tags");
        assert_eq!(tags.kind, RelationKind::ManyToMany);
        assert_eq!(schema.relation("User", "profile").map(|r| r.kind), Some(RelationKind::OneToOne));
        assert!(schema.relation("Tag", "author").is_none());
        assert_eq!(schema.relations().len(), 6);
    }
}
