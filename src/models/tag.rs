use super::{ids_of, post_tag, Include, Post};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::{FromRow, PgConnection};
use store_object::generic_store::relations;
use store_object::{CreateInput, Relation, StoreError, TableMetadata, UniqueKey, UpdateSet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Tag {
    pub id: i32,
    pub name: String,
}

impl Tag {
    pub const POSTS: Relation = Relation::many_to_many(
        "posts",
        ("tags", "id"),
        ("posts", "id"),
        post_tag::POST_TAGS.reversed(),
    )
    .with_target_timestamps(super::TIMESTAMP_COLUMNS);
}

impl TableMetadata for Tag {
    type Create = TagCreate;
    type Unique = TagUnique;

    fn table_name() -> &'static str {
        "tags"
    }

    fn columns() -> &'static [&'static str] {
        &["id", "name"]
    }

    fn unique_fields() -> &'static [&'static str] {
        &["name"]
    }

    fn extract_id(&self) -> i32 {
        self.id
    }

    fn create_table_sql() -> String {
        "CREATE TABLE IF NOT EXISTS tags (
            id SERIAL PRIMARY KEY,
            name TEXT NOT NULL UNIQUE
        )"
        .to_string()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagCreate {
    pub name: String,
}

impl TagCreate {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl CreateInput for TagCreate {
    fn values(&self) -> Vec<(&'static str, Value)> {
        vec![("name", json!(self.name))]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagUpdate {
    pub name: Option<String>,
}

impl From<TagUpdate> for UpdateSet {
    fn from(update: TagUpdate) -> Self {
        UpdateSet::new().set_opt("name", update.name.map(Value::from))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagUnique {
    Id(i32),
    Name(String),
}

impl UniqueKey for TagUnique {
    fn field(&self) -> &'static str {
        match self {
            TagUnique::Id(_) => "id",
            TagUnique::Name(_) => "name",
        }
    }

    fn value(&self) -> Value {
        match self {
            TagUnique::Id(id) => json!(id),
            TagUnique::Name(name) => json!(name),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TagInclude {
    pub posts: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagWithRelations {
    #[serde(flatten)]
    pub tag: Tag,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub posts: Option<Vec<Post>>,
}

#[async_trait]
impl Include for TagInclude {
    type Model = Tag;
    type Output = TagWithRelations;

    async fn load(
        &self,
        conn: &mut PgConnection,
        records: Vec<Tag>,
    ) -> Result<Vec<TagWithRelations>, StoreError> {
        let mut posts = if self.posts {
            let ids = ids_of(&records);
            Some(relations::load_many_to_many::<Post, _>(&mut *conn, &Tag::POSTS, &ids).await?)
        } else {
            None
        };

        Ok(records
            .into_iter()
            .map(|tag| TagWithRelations {
                posts: posts
                    .as_mut()
                    .map(|by_tag| by_tag.remove(&tag.id).unwrap_or_default()),
                tag,
            })
            .collect())
    }
}
