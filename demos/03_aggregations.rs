//! Counting, aggregates, projections and grouping

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

async fn seed(client: &BlogClient) -> Result<()> {
    let authors = [
        ("alice@example.com", 3, 2),
        ("bob@example.com", 1, 1),
        ("carol@example.com", 4, 0),
    ];
    for (email, drafts, published) in authors {
        let posts = (0..drafts)
            .map(|i| PostCreateNested::new(format!("{email} draft {i}")))
            .chain((0..published).map(|i| {
                PostCreateNested::new(format!("{email} post {i}")).published(true)
            }))
            .collect();
        client
            .create_user_with(UserCreate::new(email), posts, None)
            .await?;
    }
    Ok(())
}

async fn run(client: &BlogClient) -> Result<()> {
    client.migrate(true).await?;
    seed(client).await?;
    let posts = client.post();

    println!("=== count ===");
    let total = posts.count(QueryBuilder::new()).await?;
    let drafts = posts
        .count(QueryBuilder::new().filter(QueryFilter::eq("published", json!(false))))
        .await?;
    println!("{total} posts, {drafts} drafts");

    println!("\n=== aggregate ===");
    let stats = posts
        .aggregate(
            QueryBuilder::new(),
            vec![
                SelectField::count_all(),
                SelectField::count_distinct("author_id").with_alias("authors"),
                SelectField::min("created_at"),
                SelectField::max("created_at"),
                SelectField::avg("author_id"),
            ],
        )
        .await?;
    println!("{}", serde_json::to_string_pretty(&stats)?);

    println!("\n=== select ===");
    let titles = posts
        .select(
            QueryBuilder::new()
                .filter(QueryFilter::eq("published", json!(true)))
                .order_by("title", SortOrder::Asc)
                .page(1, 2),
            vec![SelectField::field("id"), SelectField::field_as("title", "headline")],
        )
        .await?;
    println!("first page of published titles: {titles:?}");

    println!("\n=== group by ===");
    let per_author = posts
        .group_by(
            QueryBuilder::new(),
            GroupBy::single("author_id")
                .aggregate(SelectField::count_all())
                .having(Having::gt(SelectField::count_all(), json!(2)))
                .order_by_aggregate(SelectField::count_all(), SortOrder::Desc),
        )
        .await?;
    for row in &per_author {
        println!("author {} wrote {} posts", row["author_id"], row["_count"]);
    }

    let by_state = posts
        .group_by(
            QueryBuilder::new(),
            GroupBy::single("published").aggregate(SelectField::count("id").with_alias("posts")),
        )
        .await?;
    println!("by published flag: {by_state:?}");

    Ok(())
}
