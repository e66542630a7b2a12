//! Registry accessor and reconciliation against a fake Admin API.

mod common;

use serde_json::json;

use common::{closed_addr, registry_client, FakeRegistry, ACCESS_TOKEN};
use hooksync::registry::{WebhookFormat, WebhookId};
use hooksync::{
    load_existing, reconcile, reconcile_topics, RegistryError, RetryPolicy, WebhookPlan,
    WebhookRegistry,
};

const HOOK: &str = "https://host/webhooks/shopify/webhooks";

#[tokio::test]
async fn test_list_sends_page_limit_and_token() {
    let fake = FakeRegistry::with_existing(vec![json!({
        "id": 7,
        "topic": "orders/create",
        "address": HOOK,
        "format": "json",
        "fields": [],
    })]);
    let addr = fake.start().await;
    let client = registry_client(addr, RetryPolicy::none());

    let listed = client.list_subscriptions().await.unwrap();

    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, Some(WebhookId::Number(7)));
    assert_eq!(listed[0].topic, "orders/create");

    let data = fake.data.lock().unwrap();
    assert_eq!(data.list_limits, vec![Some("250".to_string())]);
    assert_eq!(data.tokens, vec![ACCESS_TOKEN.to_string()]);
}

#[tokio::test]
async fn test_two_topics_on_empty_registry() {
    let fake = FakeRegistry::default();
    let addr = fake.start().await;
    let client = registry_client(addr, RetryPolicy::none());

    let existing = client.list_subscriptions().await.unwrap();
    assert!(existing.is_empty());

    let report =
        reconcile_topics(&client, &["orders/create", "products/update"], HOOK, &existing).await;

    assert_eq!(fake.create_calls(), vec!["orders/create", "products/update"]);
    assert_eq!(report.outcomes.len(), 2);
    for outcome in &report.outcomes {
        assert!(outcome.created);
        let created = outcome.subscription.as_ref().unwrap();
        assert_eq!(created.address, HOOK);
        assert!(created.id.is_some());
    }
}

#[tokio::test]
async fn test_second_run_creates_nothing() {
    let fake = FakeRegistry::default();
    let addr = fake.start().await;
    let client = registry_client(addr, RetryPolicy::none());
    let plan = WebhookPlan::default_routes("https://host");

    let first = reconcile(&client, &plan, &client.list_subscriptions().await.unwrap()).await;
    assert_eq!(first.created_count(), plan.len());

    let second = reconcile(&client, &plan, &client.list_subscriptions().await.unwrap()).await;
    assert_eq!(second.created_count(), 0);
    assert_eq!(second.existing_count(), plan.len());
    assert_eq!(fake.create_calls().len(), plan.len());
}

#[tokio::test]
async fn test_rejected_topic_does_not_block_others() {
    let fake = FakeRegistry::default();
    fake.data.lock().unwrap().reject_topics = vec!["t2".to_string()];
    let addr = fake.start().await;
    let client = registry_client(addr, RetryPolicy::none());

    let report = reconcile_topics(&client, &["t1", "t2", "t3"], HOOK, &[]).await;

    assert_eq!(fake.create_calls(), vec!["t1", "t2", "t3"]);
    assert!(report.outcomes[0].created);
    assert!(report.outcomes[2].created);

    let failed = &report.outcomes[1];
    assert!(!failed.created);
    assert!(failed.subscription.is_none());
    match failed.error.as_ref().unwrap() {
        RegistryError::Rejected { status, body } => {
            assert_eq!(*status, 422);
            assert!(body.contains("Invalid topic"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_trailing_slash_address_creates_new_entry() {
    let fake = FakeRegistry::with_existing(vec![json!({
        "id": 1,
        "topic": "orders/create",
        "address": "https://x.test/hook",
        "format": "json",
    })]);
    let addr = fake.start().await;
    let client = registry_client(addr, RetryPolicy::none());

    let existing = client.list_subscriptions().await.unwrap();
    let report =
        reconcile_topics(&client, &["orders/create"], "https://x.test/hook/", &existing).await;

    assert_eq!(report.created_count(), 1);
    assert_eq!(fake.create_calls(), vec!["orders/create"]);
}

#[tokio::test]
async fn test_list_rejection_keeps_status_and_body() {
    let fake = FakeRegistry::default();
    fake.data.lock().unwrap().list_override =
        Some((401, r#"{"errors":"[API] Invalid API key or access token"}"#.to_string()));
    let addr = fake.start().await;
    let client = registry_client(addr, RetryPolicy::none());

    let err = client.list_subscriptions().await.unwrap_err();

    assert_eq!(err.status(), Some(401));
    assert!(err.body().unwrap().contains("Invalid API key"));
    assert!(matches!(err, RegistryError::Rejected { .. }));
}

#[tokio::test]
async fn test_list_malformed_body() {
    let fake = FakeRegistry::default();
    fake.data.lock().unwrap().list_override =
        Some((200, "<html>maintenance</html>".to_string()));
    let addr = fake.start().await;
    let client = registry_client(addr, RetryPolicy::none());

    match client.list_subscriptions().await {
        Err(RegistryError::Malformed { status, body, .. }) => {
            assert_eq!(status, 200);
            assert_eq!(body, "<html>maintenance</html>");
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn test_odd_entries_do_not_hide_existing_subscriptions() {
    let fake = FakeRegistry::with_existing(vec![
        json!({
            "id": "gid://shopify/WebhookSubscription/7",
            "topic": "orders/create",
            "address": HOOK,
            "format": "json",
        }),
        json!({
            "id": 8,
            "topic": "products/update",
            "address": HOOK,
            "format": "graphql",
        }),
        json!({ "id": 9, "topic": ["not", "a", "string"] }),
    ]);
    let addr = fake.start().await;
    let client = registry_client(addr, RetryPolicy::none());

    let existing = load_existing(&client).await.unwrap();
    assert_eq!(existing.len(), 2);
    assert_eq!(
        existing[0].id,
        Some(WebhookId::Text("gid://shopify/WebhookSubscription/7".to_string()))
    );
    assert_eq!(existing[1].format, WebhookFormat::Other);

    let report = reconcile_topics(
        &client,
        &["orders/create", "products/update", "app/uninstalled"],
        HOOK,
        &existing,
    )
    .await;

    assert_eq!(fake.create_calls(), vec!["app/uninstalled"]);
    assert_eq!(report.existing_count(), 2);
    assert_eq!(report.created_count(), 1);
}

#[tokio::test]
async fn test_load_existing_treats_unparseable_ok_as_empty() {
    let fake = FakeRegistry::default();
    fake.data.lock().unwrap().list_override =
        Some((200, "<html>maintenance</html>".to_string()));
    let addr = fake.start().await;
    let client = registry_client(addr, RetryPolicy::none());

    assert_eq!(load_existing(&client).await, Ok(Vec::new()));
}

#[tokio::test]
async fn test_transport_error_is_distinct() {
    let addr = closed_addr().await;
    let client = registry_client(addr, RetryPolicy::none());

    let list = client.list_subscriptions().await.unwrap_err();
    assert!(matches!(list, RegistryError::Transport { .. }));
    assert_eq!(list.status(), None);

    let create = client
        .create_subscription("orders/create", HOOK)
        .await
        .unwrap_err();
    assert!(matches!(create, RegistryError::Transport { .. }));
}

#[tokio::test]
async fn test_list_retries_only_when_configured() {
    let fake = FakeRegistry::default();
    fake.data.lock().unwrap().list_failures = 1;
    let addr = fake.start().await;

    let no_retry = registry_client(addr, RetryPolicy::none());
    let err = no_retry.list_subscriptions().await.unwrap_err();
    assert_eq!(err.status(), Some(503));
    assert_eq!(fake.data.lock().unwrap().list_calls, 1);

    fake.data.lock().unwrap().list_failures = 1;
    let retrying = registry_client(
        addr,
        RetryPolicy {
            max_retries: 2,
            delay_ms: (1, 5),
        },
    );
    assert!(retrying.list_subscriptions().await.unwrap().is_empty());
    assert_eq!(fake.data.lock().unwrap().list_calls, 3);
}

#[tokio::test]
async fn test_create_sends_json_format() {
    let fake = FakeRegistry::default();
    let addr = fake.start().await;
    let client = registry_client(addr, RetryPolicy::none());

    let created = client
        .create_subscription("inventory_levels/update", "https://host/api/inventory")
        .await
        .unwrap();

    assert_eq!(created.topic, "inventory_levels/update");
    assert_eq!(created.address, "https://host/api/inventory");
    assert_eq!(created.format, hooksync::registry::WebhookFormat::Json);
    assert_eq!(created.api_version.as_deref(), Some("2024-10"));
}
