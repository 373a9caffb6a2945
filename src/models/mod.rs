//! Blog models
//!
//! Each model is a plain row struct with hand-written table metadata, a
//! create input, an update input, a unique-key enum and an include
//! description that loads its relations in batches.

pub mod post;
pub mod post_tag;
pub mod profile;
pub mod tag;
pub mod user;

pub use post::{Post, PostCreate, PostInclude, PostUnique, PostUpdate, PostWithRelations};
pub use post_tag::PostTag;
pub use profile::{
    Profile, ProfileCreate, ProfileInclude, ProfileUnique, ProfileUpdate, ProfileWithRelations,
};
pub use tag::{Tag, TagCreate, TagInclude, TagUnique, TagUpdate, TagWithRelations};
pub use user::{
    PostCreateNested, ProfileCreateNested, User, UserCreate, UserInclude, UserUnique, UserUpdate,
    UserWithRelations,
};

use async_trait::async_trait;
use sqlx::PgConnection;
use store_object::{StoreError, TableMetadata};

/// Timestamp columns shared by `users` and `posts`
pub(crate) const TIMESTAMP_COLUMNS: &[&str] = &["created_at", "updated_at"];

/// Relations to load alongside a set of records
#[async_trait]
pub trait Include: Clone + Send + Sync {
    type Model: TableMetadata;
    type Output: Send;

    /// Attach the selected relations to `records`, keeping their order
    async fn load(
        &self,
        conn: &mut PgConnection,
        records: Vec<Self::Model>,
    ) -> Result<Vec<Self::Output>, StoreError>;
}

/// Ids of `records`, in order
pub(crate) fn ids_of<T: TableMetadata>(records: &[T]) -> Vec<i32> {
    records.iter().map(TableMetadata::extract_id).collect()
}
