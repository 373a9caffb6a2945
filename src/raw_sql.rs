//! Hand-written SQL for the blog schema
//!
//! These queries do what the store calls in the demos do, but the SQL,
//! the parameter positions and the row mapping are written out by hand.
//! They return the same model types so results can be compared directly.

use crate::errors::BlogClientError;
use crate::models::{Tag, User};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};

/// A published post joined with its author's columns
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct PostWithAuthorRow {
    pub id: i32,
    pub title: String,
    pub content: Option<String>,
    pub created_at: DateTime<Utc>,
    pub author_id: i32,
    pub author_email: String,
    pub author_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct AuthorPostCount {
    pub author_id: i32,
    pub email: String,
    pub post_count: i64,
}

pub async fn user_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, BlogClientError> {
    let user = sqlx::query_as::<_, User>(
        "SELECT id, email, name, created_at, updated_at FROM users WHERE email = $1",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

/// Published posts, newest first, each with its author
pub async fn published_posts_with_authors(
    pool: &PgPool,
    limit: i64,
) -> Result<Vec<PostWithAuthorRow>, BlogClientError> {
    let rows = sqlx::query_as::<_, PostWithAuthorRow>(
        "SELECT p.id, p.title, p.content, p.created_at, p.author_id, \
                u.email AS author_email, u.name AS author_name \
         FROM posts p \
         INNER JOIN users u ON u.id = p.author_id \
         WHERE p.published = TRUE \
         ORDER BY p.created_at DESC, p.id DESC \
         LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Number of posts per user, including users without posts
pub async fn post_counts_by_author(pool: &PgPool) -> Result<Vec<AuthorPostCount>, BlogClientError> {
    let rows = sqlx::query_as::<_, AuthorPostCount>(
        "SELECT u.id AS author_id, u.email, COUNT(p.id) AS post_count \
         FROM users u \
         LEFT JOIN posts p ON p.author_id = u.id \
         GROUP BY u.id, u.email \
         ORDER BY post_count DESC, u.id",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn tags_of_post(pool: &PgPool, post_id: i32) -> Result<Vec<Tag>, BlogClientError> {
    let tags = sqlx::query_as::<_, Tag>(
        "SELECT t.id, t.name FROM tags t \
         INNER JOIN post_tags pt ON pt.tag_id = t.id \
         WHERE pt.post_id = $1 \
         ORDER BY t.id",
    )
    .bind(post_id)
    .fetch_all(pool)
    .await?;
    Ok(tags)
}

/// Insert a user. A duplicate email surfaces as a plain database error;
/// classifying it is left to the caller.
pub async fn create_user(
    pool: &PgPool,
    email: &str,
    name: Option<&str>,
) -> Result<User, BlogClientError> {
    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (email, name) VALUES ($1, $2) \
         RETURNING id, email, name, created_at, updated_at",
    )
    .bind(email)
    .bind(name)
    .fetch_one(pool)
    .await?;
    Ok(user)
}
