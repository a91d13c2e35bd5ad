mod common;

use serde_json::json;

use common::{ScriptedSender, calls, client, page, user};
use slk::identity::{IdentityCache, NameResolver};
use slk::services::search::rewrite_from_mentions;

fn cache() -> IdentityCache {
    IdentityCache::from_users(vec![
        user("U0JANE0001", "jane", "Jane Doe", "Jane Q. Doe"),
        user("U0BOB00001", "bob", "", "Robert Smith"),
    ])
}

#[test]
fn test_resolve_user_prefers_display_name() {
    let cache = cache();
    assert_eq!(cache.resolve_user("U0JANE0001"), "Jane Doe");
    // empty display name falls back to the login name
    assert_eq!(cache.resolve_user("U0BOB00001"), "bob");
}

#[test]
fn test_unknown_user_warns_once_per_id() {
    let cache = cache();

    assert_eq!(cache.resolve_user("U0GHOST001"), "U0GHOST001");
    assert_eq!(cache.resolve_user("U0GHOST001"), "U0GHOST001");
    assert_eq!(cache.resolve_user("U0GHOST001"), "U0GHOST001");
    assert_eq!(cache.resolve_user("U0GHOST002"), "U0GHOST002");

    assert_eq!(cache.warnings_emitted(), 2);
}

#[test]
fn test_unbuilt_cache_returns_raw_ids_silently() {
    let cache = IdentityCache::new();

    assert_eq!(cache.resolve_user("U0JANE0001"), "U0JANE0001");
    assert_eq!(cache.warnings_emitted(), 0);
    assert_eq!(cache.resolve_display_name_to_username("Jane Doe"), "Jane Doe");
}

#[test]
fn test_display_name_maps_to_login_name() {
    let cache = cache();
    assert_eq!(cache.resolve_display_name_to_username("jane doe"), "jane");
    assert_eq!(cache.resolve_display_name_to_username("Robert Smith"), "bob");
    assert_eq!(cache.resolve_display_name_to_username("Nobody"), "Nobody");
}

#[test]
fn test_rewrite_from_mentions() {
    let cache = cache();
    let query = rewrite_from_mentions("from:@Robert deploy from:@jane", &cache);
    // `Robert` alone matches nobody and is kept as typed
    assert_eq!(query, "from:@Robert deploy from:@jane");

    let by_real_name = IdentityCache::from_users(vec![user("U0BOB00001", "bob", "Bobby", "Bob")]);
    assert_eq!(
        rewrite_from_mentions("in:#ops from:@Bobby", &by_real_name),
        "in:#ops from:@bob"
    );
}

#[test]
fn test_closures_are_resolvers() {
    let upper = |id: &str| id.to_uppercase();
    let resolver: &dyn NameResolver = &upper;
    assert_eq!(resolver.resolve_user("u1"), "U1");
}

#[tokio::test]
async fn test_user_cache_is_built_once() {
    let users = json!([
        {"id": "U0JANE0001", "name": "jane", "profile": {"display_name": "Jane Doe"}},
    ]);
    let sender = ScriptedSender::new().ok(page("members", users, ""));
    let mut client = client(sender);

    client.ensure_user_cache().await.unwrap();
    client.ensure_user_cache().await.unwrap();
    let found = client.find_user_by_name("JANE DOE").await.unwrap();

    assert_eq!(found.id, "U0JANE0001");
    assert_eq!(client.resolve_user("U0JANE0001"), "Jane Doe");
    assert_eq!(calls(&client).len(), 1);
}

#[tokio::test]
async fn test_failed_build_leaves_cache_unbuilt() {
    let sender = ScriptedSender::new().ok(json!({"ok": false, "error": "missing_scope"}));
    let mut client = client(sender);

    assert!(client.ensure_user_cache().await.is_err());
    assert!(!client.identity().is_built());
    assert_eq!(client.resolve_user("U0JANE0001"), "U0JANE0001");
}

#[test]
fn test_empty_listing_never_warns() {
    let cache = IdentityCache::from_users(Vec::new());

    assert!(cache.is_built());
    assert_eq!(cache.resolve_user("U0GHOST001"), "U0GHOST001");
    assert_eq!(cache.resolve_display_name_to_username("Jane Doe"), "Jane Doe");
    assert_eq!(cache.warnings_emitted(), 0);
}
