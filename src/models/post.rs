use super::{ids_of, post_tag, Include, Tag, User, TIMESTAMP_COLUMNS};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::{FromRow, PgConnection};
use store_object::generic_store::relations;
use store_object::{
    CreateInput, Relation, RelationKind, StoreError, TableMetadata, UniqueKey, UpdateSet,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Post {
    pub id: i32,
    pub title: String,
    pub content: Option<String>,
    pub published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub author_id: i32,
}

impl Post {
    pub const AUTHOR: Relation = Relation::direct(
        "author",
        RelationKind::ManyToOne,
        ("posts", "author_id"),
        ("users", "id"),
    )
    .with_target_timestamps(TIMESTAMP_COLUMNS);

    pub const TAGS: Relation = Relation::many_to_many(
        "tags",
        ("posts", "id"),
        ("tags", "id"),
        post_tag::POST_TAGS,
    );
}

impl TableMetadata for Post {
    type Create = PostCreate;
    type Unique = PostUnique;

    fn table_name() -> &'static str {
        "posts"
    }

    fn timestamp_columns() -> &'static [&'static str] {
        TIMESTAMP_COLUMNS
    }

    fn columns() -> &'static [&'static str] {
        &[
            "id",
            "title",
            "content",
            "published",
            "created_at",
            "updated_at",
            "author_id",
        ]
    }

    fn extract_id(&self) -> i32 {
        self.id
    }

    fn create_table_sql() -> String {
        "CREATE TABLE IF NOT EXISTS posts (
            id SERIAL PRIMARY KEY,
            title TEXT NOT NULL,
            content TEXT,
            published BOOLEAN NOT NULL DEFAULT FALSE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            author_id INTEGER NOT NULL REFERENCES users(id)
        )"
        .to_string()
    }

    fn create_indexes_sql() -> Vec<String> {
        vec![
            "CREATE INDEX IF NOT EXISTS idx_posts_author_id ON posts (author_id)".to_string(),
            "CREATE INDEX IF NOT EXISTS idx_posts_published ON posts (published)".to_string(),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostCreate {
    pub title: String,
    pub content: Option<String>,
    /// Defaults to unpublished
    pub published: Option<bool>,
    pub author_id: i32,
}

impl PostCreate {
    pub fn new(title: impl Into<String>, author_id: i32) -> Self {
        Self {
            title: title.into(),
            author_id,
            ..Self::default()
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn published(mut self, published: bool) -> Self {
        self.published = Some(published);
        self
    }
}

impl CreateInput for PostCreate {
    fn values(&self) -> Vec<(&'static str, Value)> {
        let mut values = vec![
            ("title", json!(self.title)),
            ("author_id", json!(self.author_id)),
        ];
        if let Some(content) = &self.content {
            values.push(("content", json!(content)));
        }
        if let Some(published) = self.published {
            values.push(("published", json!(published)));
        }
        values
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostUpdate {
    pub title: Option<String>,
    pub content: Option<Option<String>>,
    pub published: Option<bool>,
    pub author_id: Option<i32>,
}

impl From<PostUpdate> for UpdateSet {
    fn from(update: PostUpdate) -> Self {
        UpdateSet::new()
            .set_opt("title", update.title.map(Value::from))
            .set_opt("content", update.content.map(|content| json!(content)))
            .set_opt("published", update.published.map(Value::from))
            .set_opt("author_id", update.author_id.map(Value::from))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostUnique {
    Id(i32),
}

impl UniqueKey for PostUnique {
    fn field(&self) -> &'static str {
        "id"
    }

    fn value(&self) -> Value {
        match self {
            PostUnique::Id(id) => json!(id),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PostInclude {
    pub author: bool,
    pub tags: bool,
}

impl PostInclude {
    pub fn all() -> Self {
        Self {
            author: true,
            tags: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostWithRelations {
    #[serde(flatten)]
    pub post: Post,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<User>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<Tag>>,
}

#[async_trait]
impl Include for PostInclude {
    type Model = Post;
    type Output = PostWithRelations;

    async fn load(
        &self,
        conn: &mut PgConnection,
        records: Vec<Post>,
    ) -> Result<Vec<PostWithRelations>, StoreError> {
        let authors = if self.author {
            let author_ids: Vec<i32> = records.iter().map(|p| p.author_id).collect();
            Some(relations::load_many_to_one::<User, _>(&mut *conn, &Post::AUTHOR, &author_ids).await?)
        } else {
            None
        };
        let mut tags = if self.tags {
            let ids = ids_of(&records);
            Some(relations::load_many_to_many::<Tag, _>(&mut *conn, &Post::TAGS, &ids).await?)
        } else {
            None
        };

        Ok(records
            .into_iter()
            .map(|post| PostWithRelations {
                author: authors.as_ref().and_then(|a| a.get(&post.author_id).cloned()),
                tags: tags
                    .as_mut()
                    .map(|by_post| by_post.remove(&post.id).unwrap_or_default()),
                post,
            })
            .collect())
    }
}
