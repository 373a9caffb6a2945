//! Top-level walkthrough script
//!
//! Connects once, runs a short sequence of independent store calls and
//! disconnects. The connection is always closed before an error is
//! returned, so a failed call still exits non-zero after cleanup.

use anyhow::Result;
use blogstore::prelude::*;
use chrono::Utc;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;
    blogstore::logging::init(&config.logging)?;

    let client = BlogClient::connect(&config.database).await?;
    let result = run(&client).await;
    client.disconnect().await;
    result
}

async fn run(client: &BlogClient) -> Result<()> {
    client.migrate(false).await?;

    // Unique lookup; a missing email is `None`, not an error
    let alice = client
        .user()
        .find_unique(UserUnique::Email("alice@example.com".to_string()))
        .await?;
    tracing::info!(found = alice.is_some(), "find_unique by email");

    // First match in a given order
    let newest_author = client
        .user()
        .find_first(
            QueryBuilder::new()
                .filter(QueryFilter::some(User::POSTS, vec![]))
                .order_by("created_at", SortOrder::Desc),
        )
        .await?;
    tracing::info!(user = ?newest_author.map(|u| u.email), "find_first author");

    // Filtered, ordered and paginated scan
    let page = client
        .post()
        .find_many(
            QueryBuilder::new()
                .filter(QueryFilter::eq("published", json!(true)))
                .filter(QueryFilter::contains_insensitive("title", "rust"))
                .order_by("created_at", SortOrder::Desc)
                .skip(0)
                .take(10),
        )
        .await?;
    tracing::info!(posts = page.len(), "find_many published posts");

    let published = client
        .post()
        .count(QueryBuilder::new().filter(QueryFilter::eq("published", json!(true))))
        .await?;
    tracing::info!(published, "count published posts");

    let stamp = Utc::now().timestamp_millis();

    let writer = client
        .user()
        .create(UserCreate::new(format!("writer-{stamp}@example.com")).with_name("Writer"))
        .await?;
    tracing::info!(id = writer.id, email = %writer.email, "created user");

    let nested = client
        .create_user_with(
            UserCreate::new(format!("nested-{stamp}@example.com")).with_name("Nested"),
            vec![
                PostCreateNested::new("Hello from a nested create").published(true),
                PostCreateNested::new("A draft").with_content("Not ready yet"),
            ],
            Some(ProfileCreateNested::with_bio("Writes about databases")),
        )
        .await?;
    tracing::info!(
        id = nested.user.id,
        posts = nested.posts.as_ref().map_or(0, Vec::len),
        "created user with posts and profile"
    );

    let inserted = client
        .user()
        .create_many(
            vec![
                UserCreate::new("bob@example.com").with_name("Bob"),
                UserCreate::new("carol@example.com").with_name("Carol"),
                UserCreate::new("dave@example.com"),
            ],
            true,
        )
        .await?;
    tracing::info!(inserted, "create_many users, duplicates skipped");

    Ok(())
}
