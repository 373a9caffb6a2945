//! Core blogstore functionality
//!
//! This module contains [`BlogClient`], the single handle the walkthrough
//! scripts hold. It owns the connection pool and hands out per-model store
//! delegates, transactions and the nested create helpers.

use sqlx::PgPool;
use std::time::Duration;
use store_object::generic_store::{operations, relations};
use store_object::{GenericStore, QueryBuilder, StoreTransaction, TableMetadata, UpdateSet};

use crate::errors::BlogClientError;
use crate::models::post_tag::POST_TAGS;
use crate::models::{
    Include, Post, PostCreate, PostCreateNested, PostInclude, PostWithRelations, Profile,
    ProfileCreate, ProfileCreateNested, Tag, TagCreate, TagUnique, User, UserCreate,
    UserWithRelations,
};
use config::DatabaseConfig;

/// Database client for the blog schema
#[derive(Debug, Clone)]
pub struct BlogClient {
    pool: PgPool,
}

impl BlogClient {
    /// Connect to the database described by `config`
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, BlogClientError> {
        let connection_string = config.connection_string();

        let mut pool_options = sqlx::postgres::PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_seconds))
            .idle_timeout(Duration::from_secs(config.idle_timeout_seconds));

        // Set max lifetime if specified
        if config.max_lifetime_seconds > 0 {
            pool_options =
                pool_options.max_lifetime(Duration::from_secs(config.max_lifetime_seconds));
        }

        let pool = pool_options.connect(&connection_string).await?;
        tracing::info!(
            max_connections = config.max_connections,
            "connected to database"
        );

        Ok(Self { pool })
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get database pool reference
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn user(&self) -> GenericStore<User> {
        GenericStore::new(self.pool.clone())
    }

    pub fn profile(&self) -> GenericStore<Profile> {
        GenericStore::new(self.pool.clone())
    }

    pub fn post(&self) -> GenericStore<Post> {
        GenericStore::new(self.pool.clone())
    }

    pub fn tag(&self) -> GenericStore<Tag> {
        GenericStore::new(self.pool.clone())
    }

    /// Check database connection health
    pub async fn health_check(&self) -> Result<(), BlogClientError> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }

    /// Close every pooled connection. Pending acquires fail afterwards.
    pub async fn disconnect(self) {
        self.pool.close().await;
        tracing::info!("disconnected from database");
    }

    /// Begin a transaction; use [`StoreTransaction::store`] for model access
    pub async fn transaction(&self) -> Result<StoreTransaction, BlogClientError> {
        Ok(StoreTransaction::begin(&self.pool).await?)
    }

    /// `find_many` with the relations selected by `include` attached
    pub async fn find_many_with<I: Include>(
        &self,
        query: QueryBuilder,
        include: I,
    ) -> Result<Vec<I::Output>, BlogClientError> {
        let mut conn = self.pool.acquire().await?;
        let records = operations::find_many::<I::Model>(&mut conn, &query).await?;
        Ok(include.load(&mut conn, records).await?)
    }

    /// `find_unique` with the relations selected by `include` attached
    pub async fn find_unique_with<I: Include>(
        &self,
        key: <I::Model as TableMetadata>::Unique,
        include: I,
    ) -> Result<Option<I::Output>, BlogClientError> {
        let mut conn = self.pool.acquire().await?;
        let Some(record) = operations::find_unique::<I::Model>(&mut conn, &key).await? else {
            return Ok(None);
        };
        Ok(include.load(&mut conn, vec![record]).await?.into_iter().next())
    }

    /// Insert a user together with its posts and profile. Either all rows
    /// are written or none.
    pub async fn create_user_with(
        &self,
        user: UserCreate,
        posts: Vec<PostCreateNested>,
        profile: Option<ProfileCreateNested>,
    ) -> Result<UserWithRelations, BlogClientError> {
        let mut tx = self.transaction().await?;

        let created = tx.store::<User>().create(user).await?;

        let mut created_posts = Vec::with_capacity(posts.len());
        for nested in posts {
            let input = PostCreate {
                title: nested.title,
                content: nested.content,
                published: nested.published,
                author_id: created.id,
            };
            created_posts.push(tx.store::<Post>().create(input).await?);
        }

        let created_profile = match profile {
            Some(nested) => {
                let input = ProfileCreate {
                    bio: nested.bio,
                    avatar: nested.avatar,
                    user_id: created.id,
                };
                Some(tx.store::<Profile>().create(input).await?)
            }
            None => None,
        };

        tx.commit().await?;
        tracing::info!(
            user_id = created.id,
            posts = created_posts.len(),
            profile = created_profile.is_some(),
            "created user with nested records"
        );

        Ok(UserWithRelations {
            user: created,
            posts: Some(created_posts),
            profile: created_profile,
        })
    }

    /// Insert a post and link it to the named tags, creating tags that do
    /// not exist yet
    pub async fn create_post_with_tags(
        &self,
        post: PostCreate,
        tag_names: &[&str],
    ) -> Result<PostWithRelations, BlogClientError> {
        let mut tx = self.transaction().await?;

        let created = tx.store::<Post>().create(post).await?;

        let mut tag_ids = Vec::with_capacity(tag_names.len());
        for name in tag_names {
            let tag = tx
                .store::<Tag>()
                .upsert(
                    TagUnique::Name((*name).to_string()),
                    TagCreate::new(*name),
                    UpdateSet::new(),
                )
                .await?;
            tag_ids.push(tag.id);
        }
        relations::connect(tx.connection(), &POST_TAGS, created.id, &tag_ids).await?;

        let include = PostInclude {
            author: false,
            tags: true,
        };
        let loaded = include.load(tx.connection(), vec![created]).await?;
        tx.commit().await?;

        loaded.into_iter().next().ok_or_else(|| {
            BlogClientError::Store(store_object::StoreError::not_found(
                Post::table_name(),
                "created post",
            ))
        })
    }

    /// Link a post to existing tags; returns the number of new links
    pub async fn connect_tags(&self, post_id: i32, tag_ids: &[i32]) -> Result<u64, BlogClientError> {
        Ok(relations::connect(&self.pool, &POST_TAGS, post_id, tag_ids).await?)
    }

    /// Unlink a post from tags; returns the number of removed links
    pub async fn disconnect_tags(
        &self,
        post_id: i32,
        tag_ids: &[i32],
    ) -> Result<u64, BlogClientError> {
        Ok(relations::disconnect(&self.pool, &POST_TAGS, post_id, tag_ids).await?)
    }
}
