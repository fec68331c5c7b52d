use super::*;

fn push_endpoint(endpoint: &str) -> PushSubscription {
    PushSubscription {
        endpoint: endpoint.into(),
        expiration_time: None,
        keys: Some(PushKeys { p256dh: "p256dh-key".into(), auth: "auth-secret".into() }),
    }
}

#[test]
fn follows_is_case_insensitive() {
    let sub = Subscription::new("Acme", push_endpoint("https://push.example/a"));
    assert!(sub.follows("acme"));
    assert!(sub.follows("ACME"));
    assert!(!sub.follows("Initech"));
}

#[test]
fn follow_skips_equivalent_spelling() {
    let mut sub = Subscription::new("Acme", push_endpoint("https://push.example/a"));
    assert!(!sub.follow("aCmE"));
    assert!(sub.follow("Initech"));
    assert_eq!(sub.company_names, vec!["Acme".to_string(), "Initech".to_string()]);
}

#[test]
fn push_subscription_parses_browser_json() {
    let json = r#"{"endpoint":"https://push.example/xyz","expirationTime":null,"keys":{"p256dh":"k","auth":"a"}}"#;
    let parsed: PushSubscription = serde_json::from_str(json).unwrap();
    assert_eq!(parsed.endpoint, "https://push.example/xyz");
    assert_eq!(parsed.expiration_time, None);
    assert_eq!(parsed.keys.unwrap().auth, "a");
}

#[tokio::test]
async fn add_then_get_and_get_all() {
    let store = InMemorySubscriptionStore::new();
    let sub = Subscription::new("Acme", push_endpoint("https://push.example/a"));
    let id = sub.subscription_id;

    store.add(sub.clone()).await.unwrap();

    assert_eq!(store.get(id).await.unwrap(), Some(sub));
    assert_eq!(store.get_all().await.unwrap().len(), 1);
    assert!(store.get(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn update_replaces_existing() {
    let store = InMemorySubscriptionStore::new();
    let mut sub = Subscription::new("Acme", push_endpoint("https://push.example/a"));
    store.add(sub.clone()).await.unwrap();

    sub.follow("Initech");
    store.update(sub.clone()).await.unwrap();

    let stored = store.get(sub.subscription_id).await.unwrap().unwrap();
    assert!(stored.follows("initech"));
}

#[tokio::test]
async fn update_missing_is_not_found() {
    let store = InMemorySubscriptionStore::new();
    let sub = Subscription::new("Acme", push_endpoint("https://push.example/a"));
    let id = sub.subscription_id;

    let err = store.update(sub).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound(missing) if missing == id));
}

#[tokio::test]
async fn remove_reports_whether_present() {
    let store = InMemorySubscriptionStore::new();
    let sub = Subscription::new("Acme", push_endpoint("https://push.example/a"));
    let id = sub.subscription_id;
    store.add(sub).await.unwrap();

    assert!(store.remove(id).await.unwrap());
    assert!(!store.remove(id).await.unwrap());
    assert!(store.get_all().await.unwrap().is_empty());
}
