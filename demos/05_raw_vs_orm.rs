//! The same reads and writes done with hand-written SQL and with the
//! model stores, side by side

use anyhow::{ensure, Result};
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
    let pool = client.pool();

    println!("=== create a user ===");
    let raw_user = raw_sql::create_user(pool, "raw@example.com", Some("Raw")).await?;
    let orm_user = client
        .user()
        .create(UserCreate::new("orm@example.com").with_name("Orm"))
        .await?;
    println!("raw: {} / store: {}", raw_user.id, orm_user.id);

    client
        .create_post_with_tags(
            PostCreate::new("Joins by hand", raw_user.id).published(true),
            &["sql"],
        )
        .await?;
    client
        .create_post_with_tags(
            PostCreate::new("Joins by the store", orm_user.id).published(true),
            &["sql", "orm"],
        )
        .await?;

    println!("\n=== user by email ===");
    let raw = raw_sql::user_by_email(pool, "orm@example.com").await?;
    let orm = client
        .user()
        .find_unique(UserUnique::Email("orm@example.com".to_string()))
        .await?;
    ensure!(raw == orm, "lookups disagree: {raw:?} vs {orm:?}");
    println!("both found user {:?}", orm.map(|u| u.id));

    println!("\n=== published posts with authors ===");
    let raw_rows = raw_sql::published_posts_with_authors(pool, 10).await?;
    let orm_rows = client
        .find_many_with(
            QueryBuilder::new()
                .filter(QueryFilter::eq("published", json!(true)))
                .order_by("created_at", SortOrder::Desc)
                .order_by("id", SortOrder::Desc)
                .take(10),
            PostInclude {
                author: true,
                tags: false,
            },
        )
        .await?;
    for (raw, orm) in raw_rows.iter().zip(&orm_rows) {
        println!(
            "raw: {} by {} | store: {} by {:?}",
            raw.title,
            raw.author_email,
            orm.post.title,
            orm.author.as_ref().map(|a| a.email.as_str())
        );
    }

    println!("\n=== post counts per author ===");
    let raw_counts = raw_sql::post_counts_by_author(pool).await?;
    let orm_counts = client
        .post()
        .group_by(
            QueryBuilder::new(),
            GroupBy::single("author_id").aggregate(SelectField::count_all()),
        )
        .await?;
    println!("raw: {raw_counts:?}");
    println!("store: {orm_counts:?}");

    println!("\n=== tags of a post ===");
    let post = client
        .post()
        .find_first(QueryBuilder::new().filter(QueryFilter::eq("author_id", json!(orm_user.id))))
        .await?;
    if let Some(post) = post {
        let raw_tags = raw_sql::tags_of_post(pool, post.id).await?;
        let orm_tags = client
            .find_unique_with(PostUnique::Id(post.id), PostInclude { author: false, tags: true })
            .await?
            .and_then(|p| p.tags)
            .unwrap_or_default();
        ensure!(raw_tags == orm_tags, "tag lists disagree");
        println!("{} tags, identical", orm_tags.len());
    }

    Ok(())
}
