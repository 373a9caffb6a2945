//! SQL generation tests for the query builder

#[cfg(test)]
mod tests {
    use crate::query_builder::{
        GroupBy, Having, QueryBuilder, QueryFilter, SelectField, SortOrder, SqlGenerator,
        UpdateSet,
    };
    use crate::traits::relation::{JoinTable, Relation, RelationKind};
    use serde_json::json;

    const USER_POSTS: Relation = Relation::direct(
        "posts",
        RelationKind::OneToMany,
        ("users", "id"),
        ("posts", "author_id"),
    );

    const POST_TAGS: Relation = Relation::many_to_many(
        "tags",
        ("posts", "id"),
        ("tags", "id"),
        JoinTable {
            table: "post_tags",
            source_column: "post_id",
            target_column: "tag_id",
        },
    );

    // ========================================
    // WHERE clause
    // ========================================

    #[test]
    fn test_empty_builder_renders_nothing() {
        let (where_clause, order_clause, limit_clause, values) = QueryBuilder::new().build();
        assert!(where_clause.is_empty());
        assert!(order_clause.is_empty());
        assert!(limit_clause.is_empty());
        assert!(values.is_empty());
    }

    #[test]
    fn test_placeholders_follow_binding_order() {
        let query = QueryBuilder::new()
            .filter(QueryFilter::eq("published", json!(true)))
            .filter(QueryFilter::gte("id", json!(10)))
            .filter(QueryFilter::contains("title", "rust"));

        let (where_clause, values) = query.build_where_clause();
        assert_eq!(
            where_clause,
            "WHERE published = $1 AND id >= $2 AND title LIKE $3"
        );
        assert_eq!(values, vec![json!(true), json!(10), json!("%rust%")]);
    }

    #[test]
    fn test_numbering_from_offset() {
        let query = QueryBuilder::new()
            .filter(QueryFilter::eq("author_id", json!(1)))
            .filter(QueryFilter::in_values("id", vec![json!(4), json!(5)]));

        let (where_clause, values) = query.build_where_clause_from(3);
        assert_eq!(where_clause, "WHERE author_id = $3 AND id IN ($4, $5)");
        assert_eq!(values.len(), 3);
    }

    #[test]
    fn test_many_parameters_keep_distinct_numbers() {
        let ids = (1..=12).map(|i| json!(i)).collect();
        let query = QueryBuilder::new()
            .filter(QueryFilter::in_values("id", ids))
            .filter(QueryFilter::eq("published", json!(false)));

        let (where_clause, values) = query.build_where_clause();
        assert!(where_clause.contains("$1, $2"));
        assert!(where_clause.contains("$10, $11, $12)"));
        assert!(where_clause.ends_with("published = $13"));
        assert_eq!(values.len(), 13);
    }

    #[test]
    fn test_nested_groups_are_parenthesised() {
        let query = QueryBuilder::new().filter(QueryFilter::or(vec![
            QueryFilter::starts_with("email", "alice"),
            QueryFilter::and(vec![
                QueryFilter::is_not_null("name"),
                QueryFilter::ne("name", json!("Bob")),
            ]),
        ]));

        let (where_clause, values) = query.build_where_clause();
        assert_eq!(
            where_clause,
            "WHERE (email LIKE $1 OR (name IS NOT NULL AND name != $2))"
        );
        assert_eq!(values, vec![json!("alice%"), json!("Bob")]);
    }

    #[test]
    fn test_not_wraps_inner_filter() {
        let query = QueryBuilder::new().filter(QueryFilter::not(QueryFilter::eq(
            "published",
            json!(true),
        )));
        let (where_clause, _) = query.build_where_clause();
        assert_eq!(where_clause, "WHERE NOT (published = $1)");
    }

    #[test]
    fn test_empty_groups_and_lists() {
        let query = QueryBuilder::new()
            .filter(QueryFilter::and(vec![]))
            .filter(QueryFilter::or(vec![]))
            .filter(QueryFilter::in_values("id", vec![]))
            .filter(QueryFilter::not_in_values("id", vec![]));

        let (where_clause, values) = query.build_where_clause();
        assert_eq!(where_clause, "WHERE TRUE AND FALSE AND 1=0 AND 1=1");
        assert!(values.is_empty());
    }

    #[test]
    fn test_null_comparisons_render_is_null() {
        let query = QueryBuilder::new()
            .filter(QueryFilter::eq("name", json!(null)))
            .filter(QueryFilter::ne("content", json!(null)));

        let (where_clause, values) = query.build_where_clause();
        assert_eq!(where_clause, "WHERE name IS NULL AND content IS NOT NULL");
        assert!(values.is_empty());
    }

    #[test]
    fn test_values_are_never_interpolated() {
        let query = QueryBuilder::new().filter(QueryFilter::eq(
            "email",
            json!("'; DROP TABLE users; --"),
        ));
        let (where_clause, values) = query.build_where_clause();
        assert!(!where_clause.contains("DROP"));
        assert_eq!(values, vec![json!("'; DROP TABLE users; --")]);
    }

    #[test]
    fn test_like_helpers_escape_wildcards() {
        let (_, values) = QueryBuilder::new()
            .filter(QueryFilter::contains("title", "100%_done"))
            .filter(QueryFilter::ends_with("email", "@example.com"))
            .build_where_clause();
        assert_eq!(values[0], json!("%100\\%\\_done%"));
        assert_eq!(values[1], json!("%@example.com"));
    }

    // ========================================
    // Relation filters
    // ========================================

    #[test]
    fn test_some_relation_filter() {
        let query = QueryBuilder::new().filter(QueryFilter::some(
            USER_POSTS,
            vec![QueryFilter::eq("published", json!(true))],
        ));

        let (where_clause, values) = query.build_where_clause();
        assert_eq!(
            where_clause,
            "WHERE EXISTS (SELECT 1 FROM posts WHERE posts.author_id = users.id AND (published = $1))"
        );
        assert_eq!(values, vec![json!(true)]);
    }

    #[test]
    fn test_none_relation_filter_without_conditions() {
        let query = QueryBuilder::new().filter(QueryFilter::none(USER_POSTS, vec![]));
        let (where_clause, _) = query.build_where_clause();
        assert_eq!(
            where_clause,
            "WHERE NOT EXISTS (SELECT 1 FROM posts WHERE posts.author_id = users.id)"
        );
    }

    #[test]
    fn test_every_relation_filter_negates_inner_condition() {
        let query = QueryBuilder::new().filter(QueryFilter::every(
            USER_POSTS,
            vec![QueryFilter::eq("published", json!(true))],
        ));
        let (where_clause, _) = query.build_where_clause();
        assert_eq!(
            where_clause,
            "WHERE NOT EXISTS (SELECT 1 FROM posts WHERE posts.author_id = users.id AND NOT (published = $1))"
        );

        let vacuous = QueryBuilder::new().filter(QueryFilter::every(USER_POSTS, vec![]));
        assert_eq!(vacuous.build_where_clause().0, "WHERE TRUE");
    }

    #[test]
    fn test_many_to_many_relation_filter() {
        let query = QueryBuilder::new()
            .filter(QueryFilter::eq("published", json!(true)))
            .filter(QueryFilter::some(
                POST_TAGS,
                vec![QueryFilter::eq("name", json!("rust"))],
            ));

        let (where_clause, values) = query.build_where_clause();
        assert!(where_clause.starts_with("WHERE published = $1 AND EXISTS (SELECT 1 FROM tags"));
        assert!(where_clause.contains("INNER JOIN post_tags ON post_tags.tag_id = tags.id"));
        assert!(where_clause.ends_with("post_tags.post_id = posts.id AND (name = $2))"));
        assert_eq!(values.len(), 2);
    }

    // ========================================
    // ORDER BY / LIMIT / OFFSET
    // ========================================

    #[test]
    fn test_order_and_pagination() {
        let query = QueryBuilder::new()
            .order_by("created_at", SortOrder::Desc)
            .order_by("id", SortOrder::Asc)
            .take(10)
            .skip(20);

        assert_eq!(query.build_order_clause(), "ORDER BY created_at DESC, id ASC");
        assert_eq!(query.build_limit_clause(), "LIMIT 10 OFFSET 20");
    }

    #[test]
    fn test_page_translates_to_offset() {
        let query = QueryBuilder::new().page(3, 5);
        assert_eq!(query.build_limit_clause(), "LIMIT 5 OFFSET 10");

        let first = QueryBuilder::new().page(0, 5);
        assert_eq!(first.build_limit_clause(), "LIMIT 5 OFFSET 0");
    }

    #[test]
    fn test_without_pagination_keeps_filters() {
        let query = QueryBuilder::new()
            .filter(QueryFilter::eq("published", json!(true)))
            .take(1);
        let unpaged = query.without_pagination();
        assert_eq!(unpaged.conditions().len(), 1);
        assert!(unpaged.build_limit_clause().is_empty());
    }

    // ========================================
    // Validation
    // ========================================

    #[test]
    fn test_validate_accepts_qualified_fields() {
        let query = QueryBuilder::new()
            .filter(QueryFilter::eq("posts.published", json!(true)))
            .order_by("created_at", SortOrder::Desc);
        assert!(query.validate("posts").is_ok());
    }

    #[test]
    fn test_validate_rejects_injection_in_field_names() {
        let query = QueryBuilder::new().filter(QueryFilter::eq("id; DROP TABLE users", json!(1)));
        let err = query.validate("users").unwrap_err();
        assert!(matches!(err, crate::StoreError::Validation { .. }));

        let ordered = QueryBuilder::new().order_by("id DESC, (SELECT 1)", SortOrder::Asc);
        assert!(ordered.validate("users").is_err());
    }

    #[test]
    fn test_validate_checks_relation_filter_fields() {
        let query = QueryBuilder::new().filter(QueryFilter::some(
            USER_POSTS,
            vec![QueryFilter::eq("1=1 OR title", json!("x"))],
        ));
        assert!(query.validate("users").is_err());
    }

    #[test]
    fn test_validate_rejects_negative_pagination() {
        match QueryBuilder::new().take(-1).validate("users") {
            Err(crate::StoreError::Validation { field, .. }) => assert_eq!(field, "take"),
            other => panic!("unexpected result: {other:?}"),
        }
        match QueryBuilder::new().skip(-5).validate("users") {
            Err(crate::StoreError::Validation { field, .. }) => assert_eq!(field, "skip"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    // ========================================
    // Projections, updates, grouping
    // ========================================

    #[test]
    fn test_json_projection() {
        let projection = SqlGenerator::build_json_projection(&[
            SelectField::field("email"),
            SelectField::count_all(),
            SelectField::avg("id").with_alias("mean_id"),
        ]);
        assert_eq!(
            projection,
            "jsonb_build_object('email', email, '_count', COUNT(*), 'mean_id', AVG(id)) AS record"
        );
    }

    #[test]
    fn test_set_clause_precedes_where_parameters() {
        let update = UpdateSet::new()
            .set("title", json!("New title"))
            .increment("views", json!(1));
        let (set_clause, set_values) = SqlGenerator::build_set_clause(&update, 1);
        assert_eq!(set_clause, "title = $1, views = views + $2");
        assert_eq!(set_values, vec![json!("New title"), json!(1)]);

        let query = QueryBuilder::new().filter(QueryFilter::eq("id", json!(7)));
        let (where_clause, _) = query.build_where_clause_from(set_values.len() + 1);
        assert_eq!(where_clause, "WHERE id = $3");
    }

    #[test]
    fn test_group_by_with_having() {
        let group = GroupBy::single("author_id")
            .aggregate(SelectField::count_all())
            .having(Having::gt(SelectField::count_all(), json!(1)))
            .order_by_aggregate(SelectField::count_all(), SortOrder::Desc);

        assert_eq!(SqlGenerator::build_group_by_clause(&group), "GROUP BY author_id");

        let (having, values) = SqlGenerator::build_having_clause(&group.having, 2);
        assert_eq!(having, "HAVING COUNT(*) > $2");
        assert_eq!(values, vec![json!(1)]);

        assert_eq!(
            SqlGenerator::build_group_order_clause(&[], &group),
            "ORDER BY COUNT(*) DESC"
        );
    }

    // ========================================
    // Timestamp placeholders
    // ========================================

    const TIMESTAMPS: &[&str] = &["created_at", "updated_at"];

    #[test]
    fn test_timestamp_like_text_is_not_cast() {
        let query = QueryBuilder::new()
            .filter(QueryFilter::eq("title", json!("2024-01-01T00:00:00Z")))
            .filter(QueryFilter::gte("created_at", json!("2024-01-01T00:00:00Z")));

        let (where_clause, values) = query.build_where_clause_typed(1, TIMESTAMPS);
        assert_eq!(
            where_clause,
            "WHERE title = $1 AND created_at >= $2::timestamptz"
        );
        assert_eq!(values.len(), 2);

        let (untyped, _) = query.build_where_clause();
        assert_eq!(untyped, "WHERE title = $1 AND created_at >= $2");
    }

    #[test]
    fn test_relation_filter_uses_target_timestamps() {
        let recent_posts = USER_POSTS.with_target_timestamps(TIMESTAMPS);
        let query = QueryBuilder::new()
            .filter(QueryFilter::eq("email", json!("2024-01-01T00:00:00Z")))
            .filter(QueryFilter::some(
                recent_posts,
                vec![QueryFilter::gt("created_at", json!("2024-01-01T00:00:00Z"))],
            ));

        // Inner conditions use the relation target's columns, not the outer list
        let (where_clause, _) = query.build_where_clause_typed(1, &[]);
        assert!(where_clause.starts_with("WHERE email = $1 AND EXISTS"));
        assert!(where_clause.contains("(created_at > $2::timestamptz)"));
    }

    #[test]
    fn test_set_and_having_cast_timestamp_columns() {
        let update = UpdateSet::new()
            .set("title", json!("2024-01-01T00:00:00Z"))
            .set("updated_at", json!("2024-01-01T00:00:00Z"));
        let (set_clause, _) = SqlGenerator::build_set_clause_typed(&update, 1, TIMESTAMPS);
        assert_eq!(set_clause, "title = $1, updated_at = $2::timestamptz");

        let having = vec![
            Having::gt(SelectField::max("created_at"), json!("2024-01-01T00:00:00Z")),
            Having::gt(SelectField::count("created_at"), json!(2)),
        ];
        let (having_clause, _) = SqlGenerator::build_having_clause_typed(&having, 1, TIMESTAMPS);
        assert_eq!(
            having_clause,
            "HAVING MAX(created_at) > $1::timestamptz AND COUNT(created_at) > $2"
        );
    }
}
