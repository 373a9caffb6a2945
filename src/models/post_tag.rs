//! Link table between posts and tags
//!
//! `post_tags` has no model store of its own. Rows are written through
//! [`relations::connect`](store_object::generic_store::relations::connect)
//! and removed through `relations::disconnect`. A post or tag that is
//! still linked cannot be deleted.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use store_object::JoinTable;

/// `post_tags` walked from posts to tags
pub const POST_TAGS: JoinTable = JoinTable {
    table: "post_tags",
    source_column: "post_id",
    target_column: "tag_id",
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, FromRow)]
pub struct PostTag {
    pub post_id: i32,
    pub tag_id: i32,
}

impl PostTag {
    pub fn table_name() -> &'static str {
        POST_TAGS.table
    }

    pub fn create_table_sql() -> String {
        "CREATE TABLE IF NOT EXISTS post_tags (
            post_id INTEGER NOT NULL REFERENCES posts(id),
            tag_id INTEGER NOT NULL REFERENCES tags(id),
            PRIMARY KEY (post_id, tag_id)
        )"
        .to_string()
    }

    pub fn create_indexes_sql() -> Vec<String> {
        vec!["CREATE INDEX IF NOT EXISTS idx_post_tags_tag_id ON post_tags (tag_id)".to_string()]
    }

    pub fn drop_table_sql() -> String {
        format!("DROP TABLE IF EXISTS {} CASCADE", Self::table_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_composite_primary_key() {
        let sql = PostTag::create_table_sql();
        assert!(sql.contains("PRIMARY KEY (post_id, tag_id)"));
        assert!(sql.contains("REFERENCES tags(id)"));
        assert!(!sql.contains("ON DELETE"));
        assert_eq!(PostTag::drop_table_sql(), "DROP TABLE IF EXISTS post_tags CASCADE");
    }
}
