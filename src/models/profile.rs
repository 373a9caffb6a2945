use super::{Include, User};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::{FromRow, PgConnection};
use store_object::generic_store::relations;
use store_object::{
    CreateInput, Relation, RelationKind, StoreError, TableMetadata, UniqueKey, UpdateSet,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Profile {
    pub id: i32,
    pub bio: Option<String>,
    pub avatar: Option<String>,
    pub user_id: i32,
}

impl Profile {
    /// Owner of the profile
    pub const USER: Relation = Relation::direct(
        "user",
        RelationKind::ManyToOne,
        ("profiles", "user_id"),
        ("users", "id"),
    )
    .with_target_timestamps(super::TIMESTAMP_COLUMNS);
}

impl TableMetadata for Profile {
    type Create = ProfileCreate;
    type Unique = ProfileUnique;

    fn table_name() -> &'static str {
        "profiles"
    }

    fn columns() -> &'static [&'static str] {
        &["id", "bio", "avatar", "user_id"]
    }

    fn unique_fields() -> &'static [&'static str] {
        &["user_id"]
    }

    fn extract_id(&self) -> i32 {
        self.id
    }

    fn create_table_sql() -> String {
        "CREATE TABLE IF NOT EXISTS profiles (
            id SERIAL PRIMARY KEY,
            bio TEXT,
            avatar TEXT,
            user_id INTEGER NOT NULL UNIQUE REFERENCES users(id)
        )"
        .to_string()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileCreate {
    pub bio: Option<String>,
    pub avatar: Option<String>,
    pub user_id: i32,
}

impl ProfileCreate {
    pub fn for_user(user_id: i32) -> Self {
        Self {
            user_id,
            ..Self::default()
        }
    }

    pub fn with_bio(mut self, bio: impl Into<String>) -> Self {
        self.bio = Some(bio.into());
        self
    }

    pub fn with_avatar(mut self, avatar: impl Into<String>) -> Self {
        self.avatar = Some(avatar.into());
        self
    }
}

impl CreateInput for ProfileCreate {
    fn values(&self) -> Vec<(&'static str, Value)> {
        let mut values = vec![("user_id", json!(self.user_id))];
        if let Some(bio) = &self.bio {
            values.push(("bio", json!(bio)));
        }
        if let Some(avatar) = &self.avatar {
            values.push(("avatar", json!(avatar)));
        }
        values
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileUpdate {
    pub bio: Option<Option<String>>,
    pub avatar: Option<Option<String>>,
}

impl From<ProfileUpdate> for UpdateSet {
    fn from(update: ProfileUpdate) -> Self {
        UpdateSet::new()
            .set_opt("bio", update.bio.map(|bio| json!(bio)))
            .set_opt("avatar", update.avatar.map(|avatar| json!(avatar)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileUnique {
    Id(i32),
    UserId(i32),
}

impl UniqueKey for ProfileUnique {
    fn field(&self) -> &'static str {
        match self {
            ProfileUnique::Id(_) => "id",
            ProfileUnique::UserId(_) => "user_id",
        }
    }

    fn value(&self) -> Value {
        match self {
            ProfileUnique::Id(id) | ProfileUnique::UserId(id) => json!(id),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProfileInclude {
    pub user: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileWithRelations {
    #[serde(flatten)]
    pub profile: Profile,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

#[async_trait]
impl Include for ProfileInclude {
    type Model = Profile;
    type Output = ProfileWithRelations;

    async fn load(
        &self,
        conn: &mut PgConnection,
        records: Vec<Profile>,
    ) -> Result<Vec<ProfileWithRelations>, StoreError> {
        let users = if self.user {
            let user_ids: Vec<i32> = records.iter().map(|p| p.user_id).collect();
            Some(relations::load_many_to_one::<User, _>(&mut *conn, &Profile::USER, &user_ids).await?)
        } else {
            None
        };

        Ok(records
            .into_iter()
            .map(|profile| ProfileWithRelations {
                user: users.as_ref().and_then(|u| u.get(&profile.user_id).cloned()),
                profile,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_values() {
        let values = ProfileCreate::for_user(7).with_bio("Rustacean").values();
        assert_eq!(
            values,
            vec![("user_id", json!(7)), ("bio", json!("Rustacean"))]
        );
    }

    #[test]
    fn test_user_id_is_unique() {
        assert_eq!(ProfileUnique::UserId(7).field(), "user_id");
        assert!(Profile::unique_fields().contains(&"user_id"));
        assert!(Profile::create_table_sql().contains("user_id INTEGER NOT NULL UNIQUE REFERENCES users(id)"));
        assert!(!Profile::tracks_updated_at());
    }
}
