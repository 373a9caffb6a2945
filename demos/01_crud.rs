//! Create, read, update and delete through the model stores
//!
//! Run with `cargo run --example 01_crud` against the database named in
//! `blogstore.toml` or `DATABASE_URL`.

use anyhow::Result;
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

async fn run(client: &BlogClient) -> Result<()> {
    client.migrate(true).await?;
    let users = client.user();

    println!("=== create ===");
    let alice = users
        .create(UserCreate::new("alice@example.com").with_name("Alice"))
        .await?;
    println!("created: {}", serde_json::to_string_pretty(&alice)?);

    match users.create(UserCreate::new("alice@example.com")).await {
        Err(e) if e.is_unique_violation() => println!("second alice rejected: {e}"),
        Err(e) => return Err(e.into()),
        Ok(user) => println!("unexpected duplicate: {}", user.id),
    }

    println!("\n=== read ===");
    let by_email = users
        .find_unique(UserUnique::Email("alice@example.com".to_string()))
        .await?;
    println!("by email: {:?}", by_email.map(|u| u.id));

    let missing = users
        .find_unique(UserUnique::Email("nobody@example.com".to_string()))
        .await?;
    println!("missing email: {missing:?}");

    if let Err(e) = users.find_unique_or_fail(UserUnique::Id(-1)).await {
        println!("find_unique_or_fail: {e}");
    }

    println!("\n=== update ===");
    let renamed = users
        .update(
            UserUnique::Id(alice.id),
            UserUpdate {
                name: Some(Some("Alice Liddell".to_string())),
                ..UserUpdate::default()
            }
            .into(),
        )
        .await?;
    println!(
        "renamed to {:?}, updated_at moved: {}",
        renamed.name,
        renamed.updated_at > alice.updated_at
    );

    let cleared = users
        .update(
            UserUnique::Id(alice.id),
            UserUpdate {
                name: Some(None),
                ..UserUpdate::default()
            }
            .into(),
        )
        .await?;
    println!("name cleared: {:?}", cleared.name);

    println!("\n=== upsert ===");
    let bob = users
        .upsert(
            UserUnique::Email("bob@example.com".to_string()),
            UserCreate::new("bob@example.com").with_name("Bob"),
            UpdateSet::new().set("name", json!("Robert")),
        )
        .await?;
    println!("first upsert inserted: {:?}", bob.name);

    let bob = users
        .upsert(
            UserUnique::Email("bob@example.com".to_string()),
            UserCreate::new("bob@example.com").with_name("Bob"),
            UpdateSet::new().set("name", json!("Robert")),
        )
        .await?;
    println!("second upsert updated: {:?}", bob.name);

    println!("\n=== update_many / delete ===");
    let touched = users
        .update_many(
            QueryBuilder::new().filter(QueryFilter::is_null("name")),
            UpdateSet::new().set("name", json!("Anonymous")),
        )
        .await?;
    println!("named {touched} anonymous users");

    let deleted = users.delete(UserUnique::Id(bob.id)).await?;
    println!("deleted {}", deleted.email);

    let remaining = users
        .delete_many(QueryBuilder::new().filter(QueryFilter::ends_with("email", "@example.com")))
        .await?;
    println!("deleted {remaining} more");

    Ok(())
}
