mod common;

use serde_json::json;

use common::{ScriptedSender, calls, client, page};
use slk::api::PageRequest;

fn channels(ids: &[&str]) -> serde_json::Value {
    json!(
        ids.iter()
            .map(|id| json!({"id": id, "name": id.to_lowercase()}))
            .collect::<Vec<_>>()
    )
}

#[tokio::test]
async fn test_limit_truncates_to_exact_count() {
    let sender = ScriptedSender::new()
        .ok(page("channels", channels(&["C1", "C2", "C3"]), "page2"))
        .ok(page("channels", channels(&["C4", "C5", "C6"]), "page3"));
    let client = client(sender);

    let result = client.list_channels("public_channel", Some(5)).await.unwrap();

    let ids: Vec<&str> = result.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["C1", "C2", "C3", "C4", "C5"]);
    assert_eq!(calls(&client).len(), 2);
}

#[tokio::test]
async fn test_cursor_is_omitted_first_then_forwarded() {
    let sender = ScriptedSender::new()
        .ok(page("members", json!(["U1", "U2"]), "dXNlcjpVMg=="))
        .ok(page("members", json!(["U3"]), ""));
    let client = client(sender);

    let members = client.get_members("C0123ABCD").await.unwrap();

    assert_eq!(members, vec!["U1", "U2", "U3"]);
    let calls = calls(&client);
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].0, "conversations.members");
    assert!(!calls[0].1.contains("cursor="));
    assert!(calls[0].1.contains("limit=1000"));
    assert!(calls[1].1.contains("cursor=dXNlcjpVMg%3D%3D"));
}

#[tokio::test]
async fn test_page_size_is_capped_by_limit() {
    let sender = ScriptedSender::new().ok(page("messages", json!([]), ""));
    let client = client(sender);

    client
        .get_history("C0123ABCD", Some(25), None, None)
        .await
        .unwrap();

    let calls = calls(&client);
    assert!(calls[0].1.contains("limit=25"));
}

#[tokio::test]
async fn test_missing_items_key_is_an_empty_page() {
    let sender = ScriptedSender::new().ok(json!({"ok": true}));
    let client = client(sender);

    let users = client.list_users().await.unwrap();

    assert!(users.is_empty());
}

#[tokio::test]
async fn test_zero_limit_means_all_pages() {
    let sender = ScriptedSender::new()
        .ok(page("channels", channels(&["C1"]), "next"))
        .ok(page("channels", channels(&["C2"]), ""));
    let client = client(sender);

    let result = client.list_channels("im", Some(0)).await.unwrap();

    assert_eq!(result.len(), 2);
    assert!(calls(&client)[0].1.contains("limit=200"));
}

#[test]
fn test_page_request_size() {
    let request = PageRequest::new("conversations.history", "messages", 100);
    assert_eq!(request.page_size(), 100);
    assert_eq!(request.clone().limit(Some(30)).page_size(), 30);
    assert_eq!(request.clone().limit(Some(500)).page_size(), 100);
    assert_eq!(request.limit(Some(0)).page_size(), 100);
}
