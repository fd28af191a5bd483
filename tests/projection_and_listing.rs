//! Response shaping: projection, pagination, sorting, and list filtering.

mod common;

use common::{context, create_group, create_user, provider, user_payload};
use scim_provision::{ListQuery, ScimError};
use serde_json::json;

#[tokio::test]
async fn projection_always_keeps_core_attributes() {
    let provider = provider();
    let ctx = context("acme");
    create_user(&provider, &ctx, "jdoe").await;

    let listed = provider
        .list_resources(
            "User",
            &ListQuery::new().with_attributes(vec!["userName".to_string()]),
            &ctx,
        )
        .await
        .unwrap();

    let item = &listed.resources[0];
    assert!(item.get("id").is_some());
    assert!(item.get("schemas").is_some());
    assert!(item.get("meta").is_some());
    assert!(item.get("userName").is_some());
    assert!(item.get("displayName").is_none());
}

#[tokio::test]
async fn excluded_attributes_win_over_included() {
    let provider = provider();
    let ctx = context("acme");
    create_user(&provider, &ctx, "jdoe").await;

    let listed = provider
        .list_resources(
            "User",
            &ListQuery::new()
                .with_attributes(vec!["userName".to_string(), "displayName".to_string()])
                .with_excluded_attributes(vec!["displayName".to_string()]),
            &ctx,
        )
        .await
        .unwrap();

    let item = &listed.resources[0];
    assert!(item.get("userName").is_some());
    assert!(item.get("displayName").is_none());
}

#[tokio::test]
async fn pagination_boundary_returns_exact_window() {
    let provider = provider();
    let ctx = context("acme");
    for i in 1..=15 {
        create_user(&provider, &ctx, &format!("user{:02}", i)).await;
    }

    let listed = provider
        .list_resources(
            "User",
            &ListQuery::new()
                .with_start_index(6)
                .with_count(5)
                .with_sort_by("userName"),
            &ctx,
        )
        .await
        .unwrap();

    assert_eq!(listed.total_results, 15);
    assert_eq!(listed.start_index, 6);
    assert_eq!(listed.items_per_page, 5);
    assert_eq!(listed.resources.len(), 5);
    assert_eq!(listed.resources[0]["userName"], "user06");
    assert_eq!(listed.resources[4]["userName"], "user10");
}

#[tokio::test]
async fn count_absent_returns_all_remaining() {
    let provider = provider();
    let ctx = context("acme");
    for i in 1..=4 {
        create_user(&provider, &ctx, &format!("user{}", i)).await;
    }
    let listed = provider
        .list_resources("User", &ListQuery::new().with_start_index(3), &ctx)
        .await
        .unwrap();
    assert_eq!(listed.total_results, 4);
    assert_eq!(listed.resources.len(), 2);
}

#[tokio::test]
async fn single_group_get_omits_members() {
    let provider = provider();
    let ctx = context("acme");
    let group = create_group(&provider, &ctx, "Engineering", &["u1", "u2"]).await;
    let id = group["id"].as_str().unwrap();

    let fetched = provider.get_resource("Group", id, &ctx).await.unwrap();
    assert!(fetched.get("members").is_none());
    assert_eq!(fetched["displayName"], "Engineering");

    // Lists still carry members.
    let listed = provider
        .list_resources("Group", &ListQuery::new(), &ctx)
        .await
        .unwrap();
    assert!(listed.resources[0].get("members").is_some());
}

#[tokio::test]
async fn member_refs_point_at_users() {
    let provider = provider();
    let ctx = context("acme");
    let group = create_group(&provider, &ctx, "Engineering", &["u1"]).await;
    assert_eq!(group["members"][0]["$ref"], "../Users/u1");
}

#[tokio::test]
async fn empty_collections_never_serialize() {
    let provider = provider();
    let ctx = context("acme");
    let mut payload = user_payload("jdoe");
    payload["emails"] = json!([]);
    let user = provider.create_resource("User", payload, &ctx).await.unwrap();
    let id = user["id"].as_str().unwrap();

    let fetched = provider.get_resource("User", id, &ctx).await.unwrap();
    assert!(fetched.get("emails").is_none());
}

#[tokio::test]
async fn user_name_filter_matches_case_insensitively() {
    let provider = provider();
    let ctx = context("acme");
    create_user(&provider, &ctx, "JDoe").await;
    create_user(&provider, &ctx, "other").await;

    let listed = provider
        .list_resources(
            "User",
            &ListQuery::new().with_filter(r#"userName eq "jdoe""#),
            &ctx,
        )
        .await
        .unwrap();
    assert_eq!(listed.total_results, 1);
    assert_eq!(listed.resources[0]["userName"], "JDoe");
}

#[tokio::test]
async fn member_type_list_filter_is_rejected() {
    let provider = provider();
    let ctx = context("acme");
    let err = provider
        .list_resources(
            "Group",
            &ListQuery::new().with_filter(r#"members[type eq "User"]"#),
            &ctx,
        )
        .await
        .unwrap_err();
    match err {
        ScimError::UnsupportedFilterAttribute { detail, .. } => {
            assert!(detail.contains("RFC 7643"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn member_type_filter_with_trailing_comparison_is_rejected() {
    let provider = provider();
    let ctx = context("acme");
    create_group(&provider, &ctx, "Engineering", &["u1"]).await;

    // The full sub-attribute comparison form must fail the list, not
    // degrade into an unfiltered result.
    let err = provider
        .list_resources(
            "Group",
            &ListQuery::new().with_filter(r#"members[type eq "x"].value eq "y""#),
            &ctx,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ScimError::UnsupportedFilterAttribute { .. }));
    assert_eq!(err.http_status(), 400);
}

#[tokio::test]
async fn unknown_sort_order_is_rejected() {
    let provider = provider();
    let ctx = context("acme");
    let err = provider
        .list_resources(
            "User",
            &ListQuery::new().with_sort_by("userName").with_sort_order("sideways"),
            &ctx,
        )
        .await
        .unwrap_err();
    assert_eq!(err.http_status(), 400);
}
