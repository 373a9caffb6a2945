//! Transactions: a sequence of writes committed together, and an
//! interactive transaction rolled back when a check fails

use anyhow::{bail, Result};
use blogstore::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;
    blogstore::logging::init(&config.logging)?;

    let client = BlogClient::connect(&config.database).await?;
    let result = run(&client).await;
    client.disconnect().await;
    result
}

/// Move every post of `from` to `to`, refusing to leave `to` with more
/// than `limit` posts
async fn transfer_posts(client: &BlogClient, from: i32, to: i32, limit: i64) -> Result<u64> {
    let mut tx = client.transaction().await?;

    let moved = tx
        .store::<Post>()
        .update_many(
            QueryBuilder::new().filter(QueryFilter::eq("author_id", json!(from))),
            UpdateSet::new().set("author_id", json!(to)),
        )
        .await?;

    let owned = tx
        .store::<Post>()
        .count(QueryBuilder::new().filter(QueryFilter::eq("author_id", json!(to))))
        .await?;

    if owned > limit {
        tx.rollback().await?;
        bail!("user {to} would own {owned} posts, limit is {limit}");
    }

    tx.commit().await?;
    Ok(moved)
}

async fn run(client: &BlogClient) -> Result<()> {
    client.migrate(true).await?;

    println!("=== sequential transaction ===");
    let mut tx = client.transaction().await?;
    let alice = tx
        .store::<User>()
        .create(UserCreate::new("alice@example.com").with_name("Alice"))
        .await?;
    let bob = tx
        .store::<User>()
        .create(UserCreate::new("bob@example.com").with_name("Bob"))
        .await?;
    let written = tx
        .store::<Post>()
        .create_many(
            vec![
                PostCreate::new("Alice one", alice.id),
                PostCreate::new("Alice two", alice.id),
                PostCreate::new("Bob one", bob.id).published(true),
            ],
            false,
        )
        .await?;
    tx.commit().await?;
    println!("committed 2 users and {written} posts");

    println!("\n=== interactive transaction ===");
    match transfer_posts(client, alice.id, bob.id, 2).await {
        Ok(moved) => println!("moved {moved} posts"),
        Err(e) => println!("transfer rolled back: {e}"),
    }
    let bob_posts = client
        .post()
        .count(QueryBuilder::new().filter(QueryFilter::eq("author_id", json!(bob.id))))
        .await?;
    println!("bob still owns {bob_posts} post(s)");

    let moved = transfer_posts(client, alice.id, bob.id, 10).await?;
    println!("with a higher limit {moved} posts moved");

    println!("\n=== dropped transaction ===");
    {
        let mut tx = client.transaction().await?;
        tx.store::<Tag>().create(TagCreate::new("never-committed")).await?;
    }
    let tag = client
        .tag()
        .find_unique(TagUnique::Name("never-committed".to_string()))
        .await?;
    println!("tag after drop without commit: {tag:?}");

    Ok(())
}
