//! Relations: nested creates, includes, relation filters and tag links

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

    println!("=== nested create ===");
    let alice = client
        .create_user_with(
            UserCreate::new("alice@example.com").with_name("Alice"),
            vec![
                PostCreateNested::new("Ownership in practice").published(true),
                PostCreateNested::new("Lifetimes, part two"),
            ],
            Some(ProfileCreateNested::with_bio("Systems programmer")),
        )
        .await?;
    println!("{}", serde_json::to_string_pretty(&alice)?);

    let bob = client
        .create_user_with(UserCreate::new("bob@example.com").with_name("Bob"), vec![], None)
        .await?;

    let tagged = client
        .create_post_with_tags(
            PostCreate::new("Async Rust on Postgres", bob.user.id)
                .with_content("sqlx, tokio and a pool")
                .published(true),
            &["rust", "postgres", "async"],
        )
        .await?;
    let tag_names: Vec<&str> = tagged
        .tags
        .iter()
        .flatten()
        .map(|t| t.name.as_str())
        .collect();
    println!("post {} tagged {:?}", tagged.post.id, tag_names);

    // Existing tags are reused rather than duplicated
    let second = client
        .create_post_with_tags(PostCreate::new("More Rust", alice.user.id), &["rust"])
        .await?;
    println!("tags in total: {}", client.tag().count(QueryBuilder::new()).await?);

    println!("\n=== includes ===");
    let users = client
        .find_many_with(
            QueryBuilder::new().order_by("id", SortOrder::Asc),
            UserInclude::all(),
        )
        .await?;
    for user in &users {
        println!(
            "{} has {} posts, profile: {}",
            user.user.email,
            user.posts.as_ref().map_or(0, Vec::len),
            user.profile.is_some()
        );
    }

    let post = client
        .find_unique_with(PostUnique::Id(tagged.post.id), PostInclude::all())
        .await?;
    if let Some(post) = post {
        println!(
            "{} by {:?}",
            post.post.title,
            post.author.map(|a| a.email)
        );
    }

    let rust = client
        .find_unique_with(TagUnique::Name("rust".to_string()), TagInclude { posts: true })
        .await?;
    if let Some(rust) = rust {
        println!("posts tagged rust: {}", rust.posts.map_or(0, |p| p.len()));
    }

    println!("\n=== relation filters ===");
    let with_published = client
        .user()
        .find_many(QueryBuilder::new().filter(QueryFilter::some(
            User::POSTS,
            vec![QueryFilter::eq("published", json!(true))],
        )))
        .await?;
    println!("users with a published post: {}", with_published.len());

    let without_posts = client
        .user()
        .count(QueryBuilder::new().filter(QueryFilter::none(User::POSTS, vec![])))
        .await?;
    println!("users without posts: {without_posts}");

    let all_published = client
        .user()
        .count(QueryBuilder::new().filter(QueryFilter::every(
            User::POSTS,
            vec![QueryFilter::eq("published", json!(true))],
        )))
        .await?;
    println!("users whose posts are all published: {all_published}");

    let rust_posts = client
        .post()
        .find_many(QueryBuilder::new().filter(QueryFilter::some(
            Post::TAGS,
            vec![QueryFilter::eq("name", json!("rust"))],
        )))
        .await?;
    println!("posts tagged rust: {}", rust_posts.len());

    println!("\n=== connect / disconnect ===");
    let async_tag = client
        .tag()
        .find_unique_or_fail(TagUnique::Name("async".to_string()))
        .await?;
    let linked = client.connect_tags(second.post.id, &[async_tag.id]).await?;
    let unlinked = client.disconnect_tags(tagged.post.id, &[async_tag.id]).await?;
    println!("linked {linked}, unlinked {unlinked}");

    Ok(())
}
