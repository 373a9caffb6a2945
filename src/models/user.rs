use super::{ids_of, Include, Post, Profile, TIMESTAMP_COLUMNS};
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
pub struct User {
    pub id: i32,
    pub email: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Posts written by the user
    pub const POSTS: Relation = Relation::direct(
        "posts",
        RelationKind::OneToMany,
        ("users", "id"),
        ("posts", "author_id"),
    )
    .with_target_timestamps(TIMESTAMP_COLUMNS);

    /// The user's profile, if one exists
    pub const PROFILE: Relation = Relation::direct(
        "profile",
        RelationKind::OneToOne,
        ("users", "id"),
        ("profiles", "user_id"),
    );
}

impl TableMetadata for User {
    type Create = UserCreate;
    type Unique = UserUnique;

    fn table_name() -> &'static str {
        "users"
    }

    fn timestamp_columns() -> &'static [&'static str] {
        TIMESTAMP_COLUMNS
    }

    fn columns() -> &'static [&'static str] {
        &["id", "email", "name", "created_at", "updated_at"]
    }

    fn unique_fields() -> &'static [&'static str] {
        &["email"]
    }

    fn extract_id(&self) -> i32 {
        self.id
    }

    fn create_table_sql() -> String {
        "CREATE TABLE IF NOT EXISTS users (
            id SERIAL PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            name TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )"
        .to_string()
    }
}

/// Insert payload for [`User`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserCreate {
    pub email: String,
    pub name: Option<String>,
}

impl UserCreate {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

impl CreateInput for UserCreate {
    fn values(&self) -> Vec<(&'static str, Value)> {
        let mut values = vec![("email", json!(self.email))];
        if let Some(name) = &self.name {
            values.push(("name", json!(name)));
        }
        values
    }
}

/// Changes to a [`User`]; `None` leaves a column untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserUpdate {
    pub email: Option<String>,
    /// `Some(None)` clears the name
    pub name: Option<Option<String>>,
}

impl From<UserUpdate> for UpdateSet {
    fn from(update: UserUpdate) -> Self {
        UpdateSet::new()
            .set_opt("email", update.email.map(Value::from))
            .set_opt("name", update.name.map(|name| json!(name)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserUnique {
    Id(i32),
    Email(String),
}

impl UniqueKey for UserUnique {
    fn field(&self) -> &'static str {
        match self {
            UserUnique::Id(_) => "id",
            UserUnique::Email(_) => "email",
        }
    }

    fn value(&self) -> Value {
        match self {
            UserUnique::Id(id) => json!(id),
            UserUnique::Email(email) => json!(email),
        }
    }
}

/// Nested post created together with its author
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostCreateNested {
    pub title: String,
    pub content: Option<String>,
    pub published: Option<bool>,
}

impl PostCreateNested {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
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

/// Nested profile created together with its user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileCreateNested {
    pub bio: Option<String>,
    pub avatar: Option<String>,
}

impl ProfileCreateNested {
    pub fn with_bio(bio: impl Into<String>) -> Self {
        Self {
            bio: Some(bio.into()),
            avatar: None,
        }
    }
}

/// Which relations of a [`User`] to load
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserInclude {
    pub posts: bool,
    pub profile: bool,
}

impl UserInclude {
    pub fn all() -> Self {
        Self {
            posts: true,
            profile: true,
        }
    }
}

/// A user with the relations selected by a [`UserInclude`]; relations that
/// were not requested stay `None`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserWithRelations {
    #[serde(flatten)]
    pub user: User,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub posts: Option<Vec<Post>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<Profile>,
}

impl UserWithRelations {
    /// Wrap a user without loading anything
    pub fn bare(user: User) -> Self {
        Self {
            user,
            posts: None,
            profile: None,
        }
    }
}

#[async_trait]
impl Include for UserInclude {
    type Model = User;
    type Output = UserWithRelations;

    async fn load(
        &self,
        conn: &mut PgConnection,
        records: Vec<User>,
    ) -> Result<Vec<UserWithRelations>, StoreError> {
        let ids = ids_of(&records);

        let mut posts = if self.posts {
            Some(relations::load_one_to_many::<Post, _>(&mut *conn, &User::POSTS, &ids).await?)
        } else {
            None
        };
        let mut profiles = if self.profile {
            Some(relations::load_one_to_one::<Profile, _>(&mut *conn, &User::PROFILE, &ids).await?)
        } else {
            None
        };

        Ok(records
            .into_iter()
            .map(|user| UserWithRelations {
                posts: posts
                    .as_mut()
                    .map(|by_user| by_user.remove(&user.id).unwrap_or_default()),
                profile: profiles.as_mut().and_then(|by_user| by_user.remove(&user.id)),
                user,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_values_skip_missing_name() {
        let values = UserCreate::new("alice@example.com").values();
        assert_eq!(values, vec![("email", json!("alice@example.com"))]);

        let named = UserCreate::new("bob@example.com").with_name("Bob").values();
        assert_eq!(named.len(), 2);
        assert_eq!(named[1], ("name", json!("Bob")));
    }

    #[test]
    fn test_update_into_update_set() {
        let set: UpdateSet = UserUpdate {
            email: None,
            name: Some(None),
        }
        .into();
        assert_eq!(set.fields().collect::<Vec<_>>(), vec!["name"]);
        assert_eq!(set.operations["name"].value(), &Value::Null);

        assert!(UpdateSet::from(UserUpdate::default()).is_empty());
    }

    #[test]
    fn test_unique_keys() {
        let key = UserUnique::Email("alice@example.com".to_string());
        assert_eq!(key.field(), "email");
        assert_eq!(key.describe(), "email = \"alice@example.com\"");
        assert_eq!(UserUnique::Id(3).value(), json!(3));
    }

    #[test]
    fn test_table_metadata() {
        assert_eq!(User::table_name(), "users");
        assert!(User::tracks_updated_at());
        assert!(User::create_table_sql().contains("email TEXT NOT NULL UNIQUE"));
        assert_eq!(User::POSTS.target_table, "posts");
        assert_eq!(User::PROFILE.kind, RelationKind::OneToOne);
    }
}
