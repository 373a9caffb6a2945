//! Integration tests against a live PostgreSQL
//!
//! Every test runs in its own schema so tests can run in parallel. They
//! are skipped when `DATABASE_URL` is not set.

use blogstore::prelude::*;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};

async fn setup_client(name: &str) -> Option<BlogClient> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping {name}");
        return None;
    };
    let schema = format!("blogstore_test_{name}");

    let admin = PgPool::connect(&database_url)
        .await
        .expect("Failed to connect to database");
    admin
        .execute(format!("DROP SCHEMA IF EXISTS {schema} CASCADE").as_str())
        .await
        .expect("Failed to drop test schema");
    admin
        .execute(format!("CREATE SCHEMA {schema}").as_str())
        .await
        .expect("Failed to create test schema");
    admin.close().await;

    let search_path = format!("SET search_path TO {schema}");
    let pool = PgPoolOptions::new()
        .max_connections(4)
        .after_connect(move |conn, _meta| {
            let search_path = search_path.clone();
            Box::pin(async move {
                conn.execute(search_path.as_str()).await?;
                Ok(())
            })
        })
        .connect(&database_url)
        .await
        .expect("Failed to connect to database");

    let client = BlogClient::from_pool(pool);
    client.migrate(true).await.expect("Failed to migrate");
    Some(client)
}

async fn teardown(client: BlogClient, name: &str) {
    let _ = client
        .pool()
        .execute(format!("DROP SCHEMA IF EXISTS blogstore_test_{name} CASCADE").as_str())
        .await;
    client.disconnect().await;
}

#[tokio::test]
async fn test_find_unique_missing_email_is_none() {
    let Some(client) = setup_client("missing_email").await else {
        return;
    };

    let found = client
        .user()
        .find_unique(UserUnique::Email("nobody@example.com".to_string()))
        .await
        .unwrap();
    assert!(found.is_none());

    let err = client
        .user()
        .find_unique_or_fail(UserUnique::Email("nobody@example.com".to_string()))
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    teardown(client, "missing_email").await;
}

#[tokio::test]
async fn test_duplicate_email_is_unique_violation() {
    let Some(client) = setup_client("duplicate_email").await else {
        return;
    };

    client
        .user()
        .create(UserCreate::new("alice@example.com"))
        .await
        .unwrap();
    let err = client
        .user()
        .create(UserCreate::new("alice@example.com").with_name("Other Alice"))
        .await
        .unwrap_err();
    assert!(err.is_unique_violation(), "unexpected error: {err}");

    let skipped = client
        .user()
        .create_many(
            vec![
                UserCreate::new("alice@example.com"),
                UserCreate::new("bob@example.com"),
            ],
            true,
        )
        .await
        .unwrap();
    assert_eq!(skipped, 1);

    teardown(client, "duplicate_email").await;
}

#[tokio::test]
async fn test_missing_author_is_foreign_key_violation() {
    let Some(client) = setup_client("missing_author").await else {
        return;
    };

    let err = client
        .post()
        .create(PostCreate::new("Orphan", 9999))
        .await
        .unwrap_err();
    assert!(err.is_foreign_key_violation(), "unexpected error: {err}");

    teardown(client, "missing_author").await;
}

#[tokio::test]
async fn test_create_defaults_and_update() {
    let Some(client) = setup_client("create_update").await else {
        return;
    };

    let user = client
        .user()
        .create(UserCreate::new("alice@example.com"))
        .await
        .unwrap();
    assert_eq!(user.name, None);

    let post = client
        .post()
        .create(PostCreate::new("Draft", user.id))
        .await
        .unwrap();
    assert!(!post.published);
    assert_eq!(post.author_id, user.id);

    let renamed = client
        .user()
        .update(
            UserUnique::Id(user.id),
            UserUpdate {
                name: Some(Some("Alice".to_string())),
                ..UserUpdate::default()
            }
            .into(),
        )
        .await
        .unwrap();
    assert_eq!(renamed.name.as_deref(), Some("Alice"));
    assert!(renamed.updated_at >= user.updated_at);

    let unchanged = client
        .user()
        .update(UserUnique::Id(user.id), UpdateSet::new())
        .await
        .unwrap();
    assert_eq!(unchanged, renamed);

    let err = client
        .user()
        .update(UserUnique::Id(user.id + 100), UserUpdate::default().into())
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    teardown(client, "create_update").await;
}

#[tokio::test]
async fn test_upsert_inserts_then_updates() {
    let Some(client) = setup_client("upsert").await else {
        return;
    };

    let key = UserUnique::Email("bob@example.com".to_string());
    let create = UserCreate::new("bob@example.com").with_name("Bob");
    let set = UpdateSet::new().set("name", json!("Robert"));

    let first = client
        .user()
        .upsert(key.clone(), create.clone(), set.clone())
        .await
        .unwrap();
    assert_eq!(first.name.as_deref(), Some("Bob"));

    let second = client.user().upsert(key, create, set).await.unwrap();
    assert_eq!(second.id, first.id);
    assert_eq!(second.name.as_deref(), Some("Robert"));

    teardown(client, "upsert").await;
}

#[tokio::test]
async fn test_upsert_with_empty_set_keeps_row() {
    let Some(client) = setup_client("upsert_keep").await else {
        return;
    };

    let key = UserUnique::Email("carol@example.com".to_string());
    let create = UserCreate::new("carol@example.com").with_name("Carol");

    let first = client
        .user()
        .upsert(key.clone(), create.clone(), UpdateSet::new())
        .await
        .unwrap();
    let second = client
        .user()
        .upsert(key, create.with_name("Ignored"), UpdateSet::new())
        .await
        .unwrap();
    assert_eq!(second, first);

    teardown(client, "upsert_keep").await;
}

#[tokio::test]
async fn test_concurrent_tag_creation_shares_one_tag() {
    let Some(client) = setup_client("concurrent_tags").await else {
        return;
    };

    let author = client
        .user()
        .create(UserCreate::new("alice@example.com"))
        .await
        .unwrap();

    let (left, right) = tokio::join!(
        client.create_post_with_tags(PostCreate::new("Left", author.id), &["fresh"]),
        client.create_post_with_tags(PostCreate::new("Right", author.id), &["fresh"]),
    );
    let left = left.unwrap();
    let right = right.unwrap();

    let tag_of = |post: &PostWithRelations| post.tags.as_ref().map(|t| t[0].id);
    assert_eq!(tag_of(&left), tag_of(&right));
    assert_eq!(client.tag().count(QueryBuilder::new()).await.unwrap(), 1);

    teardown(client, "concurrent_tags").await;
}

#[tokio::test]
async fn test_timestamp_like_text_stays_text() {
    let Some(client) = setup_client("timestamp_text").await else {
        return;
    };
    let stamp = "2024-01-01T00:00:00Z";

    // One transaction keeps every statement on the same connection
    let mut tx = client.transaction().await.unwrap();
    let user = tx
        .store::<User>()
        .create(UserCreate::new(stamp).with_name(stamp))
        .await
        .unwrap();
    assert_eq!(user.email, stamp);
    assert_eq!(user.name.as_deref(), Some(stamp));

    let found = tx
        .store::<User>()
        .find_unique(UserUnique::Email(stamp.to_string()))
        .await
        .unwrap();
    assert_eq!(found.map(|u| u.id), Some(user.id));

    let dated = tx
        .store::<Post>()
        .create(PostCreate::new(stamp, user.id).with_content(stamp))
        .await
        .unwrap();
    assert_eq!(dated.title, stamp);
    assert_eq!(dated.content.as_deref(), Some(stamp));

    let plain = tx
        .store::<Post>()
        .create(PostCreate::new("plain title", user.id))
        .await
        .unwrap();
    assert_eq!(plain.title, "plain title");

    let renamed = tx
        .store::<Post>()
        .update(
            PostUnique::Id(plain.id),
            UpdateSet::new().set("title", json!("2025-06-30T12:00:00+02:00")),
        )
        .await
        .unwrap();
    assert_eq!(renamed.title, "2025-06-30T12:00:00+02:00");
    tx.commit().await.unwrap();

    let tagged = client
        .create_post_with_tags(PostCreate::new("Tagged", user.id), &[stamp])
        .await
        .unwrap();
    assert_eq!(tagged.tags.map(|t| t[0].name.clone()).as_deref(), Some(stamp));
    let tag = client
        .tag()
        .find_unique(TagUnique::Name(stamp.to_string()))
        .await
        .unwrap();
    assert!(tag.is_some());

    // Timestamp columns still compare against RFC 3339 strings
    let cutoff = json!(user.created_at - chrono::Duration::hours(1));
    let recent = client
        .post()
        .count(QueryBuilder::new().filter(QueryFilter::gte("created_at", cutoff.clone())))
        .await
        .unwrap();
    assert_eq!(recent, 3);

    let authors = client
        .user()
        .count(QueryBuilder::new().filter(QueryFilter::some(
            User::POSTS,
            vec![QueryFilter::gt("created_at", cutoff)],
        )))
        .await
        .unwrap();
    assert_eq!(authors, 1);

    teardown(client, "timestamp_text").await;
}

#[tokio::test]
async fn test_nested_create_and_include() {
    let Some(client) = setup_client("nested_create").await else {
        return;
    };

    let created = client
        .create_user_with(
            UserCreate::new("alice@example.com").with_name("Alice"),
            vec![
                PostCreateNested::new("First").published(true),
                PostCreateNested::new("Second"),
            ],
            Some(ProfileCreateNested::with_bio("Hello")),
        )
        .await
        .unwrap();
    assert_eq!(created.posts.as_ref().map(Vec::len), Some(2));
    let profile = created.profile.clone().unwrap();
    assert_eq!(profile.user_id, created.user.id);

    let loaded = client
        .find_unique_with(UserUnique::Id(created.user.id), UserInclude::all())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loaded, created);

    let bare = client
        .find_unique_with(UserUnique::Id(created.user.id), UserInclude::default())
        .await
        .unwrap()
        .unwrap();
    assert!(bare.posts.is_none());
    assert!(bare.profile.is_none());

    let profiles = client
        .find_many_with(QueryBuilder::new(), ProfileInclude { user: true })
        .await
        .unwrap();
    assert_eq!(profiles.len(), 1);
    assert_eq!(profiles[0].user.as_ref().map(|u| u.id), Some(created.user.id));

    teardown(client, "nested_create").await;
}

#[tokio::test]
async fn test_nested_create_rolls_back_on_failure() {
    let Some(client) = setup_client("nested_rollback").await else {
        return;
    };

    // The user insert succeeds, the post insert fails: Postgres text
    // cannot hold a NUL byte
    let result = client
        .create_user_with(
            UserCreate::new("fresh@example.com"),
            vec![PostCreateNested::new("bad\0title")],
            None,
        )
        .await;
    assert!(result.is_err());

    let user = client
        .user()
        .find_unique(UserUnique::Email("fresh@example.com".to_string()))
        .await
        .unwrap();
    assert!(user.is_none());
    assert_eq!(client.post().count(QueryBuilder::new()).await.unwrap(), 0);

    teardown(client, "nested_rollback").await;
}

#[tokio::test]
async fn test_post_tags_are_reused_and_included() {
    let Some(client) = setup_client("post_tags").await else {
        return;
    };

    let author = client
        .user()
        .create(UserCreate::new("alice@example.com"))
        .await
        .unwrap();

    let first = client
        .create_post_with_tags(PostCreate::new("One", author.id), &["rust", "sql"])
        .await
        .unwrap();
    let second = client
        .create_post_with_tags(PostCreate::new("Two", author.id), &["rust"])
        .await
        .unwrap();
    assert_eq!(first.tags.as_ref().map(Vec::len), Some(2));
    assert_eq!(
        second.tags.as_ref().map(|t| t[0].id),
        first
            .tags
            .as_ref()
            .and_then(|t| t.iter().find(|tag| tag.name == "rust"))
            .map(|tag| tag.id)
    );
    assert_eq!(client.tag().count(QueryBuilder::new()).await.unwrap(), 2);

    let posts = client
        .find_many_with(
            QueryBuilder::new().order_by("id", SortOrder::Asc),
            PostInclude::all(),
        )
        .await
        .unwrap();
    assert_eq!(posts.len(), 2);
    assert_eq!(posts[0].author.as_ref().map(|a| a.id), Some(author.id));
    assert_eq!(posts[1].tags.as_ref().map(Vec::len), Some(1));

    let rust = client
        .find_unique_with(TagUnique::Name("rust".to_string()), TagInclude { posts: true })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(rust.posts.map(|p| p.len()), Some(2));

    let sql_tag = client
        .tag()
        .find_unique_or_fail(TagUnique::Name("sql".to_string()))
        .await
        .unwrap();
    assert_eq!(client.connect_tags(second.post.id, &[sql_tag.id]).await.unwrap(), 1);
    assert_eq!(client.connect_tags(second.post.id, &[sql_tag.id]).await.unwrap(), 0);
    assert_eq!(client.disconnect_tags(first.post.id, &[sql_tag.id]).await.unwrap(), 1);

    let raw = raw_sql::tags_of_post(client.pool(), second.post.id).await.unwrap();
    assert_eq!(raw.len(), 2);

    teardown(client, "post_tags").await;
}

#[tokio::test]
async fn test_filtered_pagination() {
    let Some(client) = setup_client("pagination").await else {
        return;
    };

    let inputs = ["a", "b", "c", "d", "e"]
        .iter()
        .map(|n| UserCreate::new(format!("{n}@example.com")))
        .chain(std::iter::once(UserCreate::new("z@other.org")))
        .collect();
    assert_eq!(client.user().create_many(inputs, false).await.unwrap(), 6);

    let query = QueryBuilder::new()
        .filter(QueryFilter::ends_with("email", "@example.com"))
        .order_by("email", SortOrder::Asc);

    let page = client
        .user()
        .find_many(query.clone().skip(1).take(2))
        .await
        .unwrap();
    let emails: Vec<&str> = page.iter().map(|u| u.email.as_str()).collect();
    assert_eq!(emails, vec!["b@example.com", "c@example.com"]);

    let last_page = client.user().find_many(query.clone().page(3, 2)).await.unwrap();
    assert_eq!(last_page.len(), 1);

    assert_eq!(client.user().count(query.clone().take(1)).await.unwrap(), 5);

    let first = client.user().find_first(query).await.unwrap().unwrap();
    assert_eq!(first.email, "a@example.com");

    let err = client
        .user()
        .find_many(QueryBuilder::new().order_by("email; DROP TABLE users", SortOrder::Asc))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Validation { .. }));

    teardown(client, "pagination").await;
}

#[tokio::test]
async fn test_relation_filters() {
    let Some(client) = setup_client("relation_filters").await else {
        return;
    };

    let writer = client
        .create_user_with(
            UserCreate::new("writer@example.com"),
            vec![PostCreateNested::new("Live").published(true)],
            None,
        )
        .await
        .unwrap();
    client
        .create_user_with(
            UserCreate::new("drafter@example.com"),
            vec![
                PostCreateNested::new("Live").published(true),
                PostCreateNested::new("Draft"),
            ],
            None,
        )
        .await
        .unwrap();
    client
        .user()
        .create(UserCreate::new("reader@example.com"))
        .await
        .unwrap();

    let published = json!(true);
    let some = client
        .user()
        .count(QueryBuilder::new().filter(QueryFilter::some(
            User::POSTS,
            vec![QueryFilter::eq("published", published.clone())],
        )))
        .await
        .unwrap();
    assert_eq!(some, 2);

    let none = client
        .user()
        .find_many(QueryBuilder::new().filter(QueryFilter::none(User::POSTS, vec![])))
        .await
        .unwrap();
    assert_eq!(none.len(), 1);
    assert_eq!(none[0].email, "reader@example.com");

    // Users without posts satisfy `every` vacuously
    let every = client
        .user()
        .find_many(
            QueryBuilder::new()
                .filter(QueryFilter::every(
                    User::POSTS,
                    vec![QueryFilter::eq("published", published)],
                ))
                .order_by("id", SortOrder::Asc),
        )
        .await
        .unwrap();
    let ids: Vec<i32> = every.iter().map(|u| u.id).collect();
    assert_eq!(ids.len(), 2);
    assert_eq!(ids[0], writer.user.id);

    teardown(client, "relation_filters").await;
}

#[tokio::test]
async fn test_aggregates_and_group_by() {
    let Some(client) = setup_client("aggregates").await else {
        return;
    };

    let alice = client
        .create_user_with(
            UserCreate::new("alice@example.com"),
            vec![
                PostCreateNested::new("a1"),
                PostCreateNested::new("a2"),
                PostCreateNested::new("a3").published(true),
            ],
            None,
        )
        .await
        .unwrap();
    let bob = client
        .create_user_with(
            UserCreate::new("bob@example.com"),
            vec![PostCreateNested::new("b1").published(true)],
            None,
        )
        .await
        .unwrap();

    let stats = client
        .post()
        .aggregate(
            QueryBuilder::new(),
            vec![
                SelectField::count_all(),
                SelectField::count_distinct("author_id").with_alias("authors"),
                SelectField::max("author_id"),
            ],
        )
        .await
        .unwrap();
    assert_eq!(stats["_count"], json!(4));
    assert_eq!(stats["authors"], json!(2));
    assert_eq!(stats["_max_author_id"], json!(bob.user.id));

    let groups = client
        .post()
        .group_by(
            QueryBuilder::new(),
            GroupBy::single("author_id")
                .aggregate(SelectField::count_all())
                .having(Having::gt(SelectField::count_all(), json!(1))),
        )
        .await
        .unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0]["author_id"], json!(alice.user.id));
    assert_eq!(groups[0]["_count"], json!(3));

    let titles = client
        .post()
        .select(
            QueryBuilder::new()
                .filter(QueryFilter::eq("published", json!(true)))
                .order_by("title", SortOrder::Asc),
            vec![SelectField::field_as("title", "headline")],
        )
        .await
        .unwrap();
    assert_eq!(titles, vec![json!({"headline": "a3"}), json!({"headline": "b1"})]);

    let err = client
        .post()
        .aggregate(QueryBuilder::new(), vec![SelectField::field("title")])
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Validation { .. }));

    teardown(client, "aggregates").await;
}

#[tokio::test]
async fn test_transaction_commit_and_rollback() {
    let Some(client) = setup_client("transactions").await else {
        return;
    };

    let mut tx = client.transaction().await.unwrap();
    let alice = tx
        .store::<User>()
        .create(UserCreate::new("alice@example.com"))
        .await
        .unwrap();
    tx.store::<Post>()
        .create(PostCreate::new("Inside", alice.id))
        .await
        .unwrap();
    tx.commit().await.unwrap();
    assert_eq!(client.post().count(QueryBuilder::new()).await.unwrap(), 1);

    let mut tx = client.transaction().await.unwrap();
    tx.store::<User>()
        .create(UserCreate::new("ghost@example.com"))
        .await
        .unwrap();
    let seen_inside = tx
        .store::<User>()
        .count(QueryBuilder::new())
        .await
        .unwrap();
    assert_eq!(seen_inside, 2);
    tx.rollback().await.unwrap();

    let ghost = client
        .user()
        .find_unique(UserUnique::Email("ghost@example.com".to_string()))
        .await
        .unwrap();
    assert!(ghost.is_none());

    {
        let mut tx = client.transaction().await.unwrap();
        tx.store::<Tag>().create(TagCreate::new("dropped")).await.unwrap();
    }
    let dropped = client
        .tag()
        .find_unique(TagUnique::Name("dropped".to_string()))
        .await
        .unwrap();
    assert!(dropped.is_none());

    teardown(client, "transactions").await;
}

#[tokio::test]
async fn test_delete_owner_with_posts_fails() {
    let Some(client) = setup_client("delete_owner").await else {
        return;
    };

    let owner = client
        .create_user_with(
            UserCreate::new("owner@example.com"),
            vec![PostCreateNested::new("Keeps me alive")],
            None,
        )
        .await
        .unwrap();

    let err = client
        .user()
        .delete(UserUnique::Id(owner.user.id))
        .await
        .unwrap_err();
    assert!(err.is_foreign_key_violation());

    let removed = client
        .post()
        .delete_many(QueryBuilder::new().filter(QueryFilter::eq("author_id", json!(owner.user.id))))
        .await
        .unwrap();
    assert_eq!(removed, 1);

    let deleted = client.user().delete(UserUnique::Id(owner.user.id)).await.unwrap();
    assert_eq!(deleted.email, "owner@example.com");

    teardown(client, "delete_owner").await;
}

#[tokio::test]
async fn test_delete_tagged_post_or_tag_fails_until_unlinked() {
    let Some(client) = setup_client("delete_tagged").await else {
        return;
    };

    let author = client
        .user()
        .create(UserCreate::new("alice@example.com"))
        .await
        .unwrap();
    let tagged = client
        .create_post_with_tags(PostCreate::new("Tagged", author.id), &["rust"])
        .await
        .unwrap();
    let rust_id = tagged.tags.as_ref().map(|t| t[0].id).unwrap();

    let err = client
        .post()
        .delete(PostUnique::Id(tagged.post.id))
        .await
        .unwrap_err();
    assert!(err.is_foreign_key_violation(), "unexpected error: {err}");

    let err = client.tag().delete(TagUnique::Id(rust_id)).await.unwrap_err();
    assert!(err.is_foreign_key_violation(), "unexpected error: {err}");

    let links = raw_sql::tags_of_post(client.pool(), tagged.post.id).await.unwrap();
    assert_eq!(links.len(), 1);

    assert_eq!(
        client.disconnect_tags(tagged.post.id, &[rust_id]).await.unwrap(),
        1
    );
    client
        .post()
        .delete(PostUnique::Id(tagged.post.id))
        .await
        .unwrap();
    client.tag().delete(TagUnique::Id(rust_id)).await.unwrap();
    assert_eq!(client.tag().count(QueryBuilder::new()).await.unwrap(), 0);

    teardown(client, "delete_tagged").await;
}

#[tokio::test]
async fn test_raw_sql_matches_store() {
    let Some(client) = setup_client("raw_vs_store").await else {
        return;
    };

    let raw_user = raw_sql::create_user(client.pool(), "raw@example.com", None)
        .await
        .unwrap();
    let stored = client
        .user()
        .find_unique(UserUnique::Email("raw@example.com".to_string()))
        .await
        .unwrap();
    assert_eq!(stored.as_ref(), Some(&raw_user));

    client
        .post()
        .create(PostCreate::new("Visible", raw_user.id).published(true))
        .await
        .unwrap();
    client
        .post()
        .create(PostCreate::new("Hidden", raw_user.id))
        .await
        .unwrap();

    let rows = raw_sql::published_posts_with_authors(client.pool(), 10)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].author_email, "raw@example.com");

    let counts = raw_sql::post_counts_by_author(client.pool()).await.unwrap();
    assert_eq!(counts[0].post_count, 2);

    teardown(client, "raw_vs_store").await;
}
