use super::*;
use crate::state::test_helpers;

fn push_endpoint(endpoint: &str) -> PushSubscription {
    PushSubscription { endpoint: endpoint.into(), expiration_time: None, keys: None }
}

fn subscribe_body(company_name: &str, subscription_id: Option<Uuid>) -> SubscribeBody {
    SubscribeBody {
        subscription: push_endpoint("https://push.example/browser"),
        company_name: company_name.into(),
        subscription_id,
    }
}

#[test]
fn store_error_to_status_maps_variants() {
    assert_eq!(store_error_to_status(StoreError::NotFound(Uuid::nil())), StatusCode::NOT_FOUND);
    assert_eq!(
        store_error_to_status(StoreError::Backend("down".into())),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

#[test]
fn subscribe_body_accepts_client_json() {
    let json = r#"{"subscription":{"endpoint":"https://push.example/x","expirationTime":null,"keys":{"p256dh":"k","auth":"a"}},"companyName":"Acme"}"#;
    let parsed: SubscribeBody = serde_json::from_str(json).unwrap();
    assert_eq!(parsed.company_name, "Acme");
    assert!(parsed.subscription_id.is_none());
}

#[tokio::test]
async fn subscribe_creates_subscription() {
    let state = test_helpers::test_app_state();
    let Json(response) = subscribe(State(state.clone()), Json(subscribe_body("Acme", None)))
        .await
        .unwrap();

    assert!(response.data.success);
    let stored = state
        .subscriptions
        .get(response.data.subscription_id)
        .await
        .unwrap()
        .expect("subscription stored");
    assert!(stored.follows("acme"));

    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["data"]["success"], true);
    assert!(json["data"]["subscriptionId"].is_string());
}

#[tokio::test]
async fn subscribe_with_known_id_adds_company() {
    let state = test_helpers::test_app_state();
    let Json(first) = subscribe(State(state.clone()), Json(subscribe_body("Acme", None)))
        .await
        .unwrap();
    let id = first.data.subscription_id;

    let Json(second) = subscribe(State(state.clone()), Json(subscribe_body("Initech", Some(id))))
        .await
        .unwrap();

    assert_eq!(second.data.subscription_id, id);
    let all = state.subscriptions.get_all().await.unwrap();
    assert_eq!(all.len(), 1);
    assert!(all[0].follows("Acme"));
    assert!(all[0].follows("Initech"));
}

#[tokio::test]
async fn subscribe_with_unknown_id_creates_new() {
    let state = test_helpers::test_app_state();
    let stale = Uuid::new_v4();
    let Json(response) = subscribe(State(state), Json(subscribe_body("Acme", Some(stale))))
        .await
        .unwrap();
    assert_ne!(response.data.subscription_id, stale);
}

#[tokio::test]
async fn subscribe_without_company_is_bad_request() {
    let state = test_helpers::test_app_state();
    let err = subscribe(State(state), Json(subscribe_body(" ", None)))
        .await
        .unwrap_err();
    assert_eq!(err, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unsubscribe_removes_then_reports_not_found() {
    let state = test_helpers::test_app_state();
    let Json(created) = subscribe(State(state.clone()), Json(subscribe_body("Acme", None)))
        .await
        .unwrap();
    let id = created.data.subscription_id;

    let Json(removed) = unsubscribe(State(state.clone()), Json(UnsubscribeBody { subscription_id: id }))
        .await
        .unwrap();
    assert_eq!(removed.data.subscription_id, id);
    assert!(state.subscriptions.get(id).await.unwrap().is_none());

    let err = unsubscribe(State(state), Json(UnsubscribeBody { subscription_id: id }))
        .await
        .unwrap_err();
    assert_eq!(err, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn public_key_is_served() {
    let state = test_helpers::test_app_state();
    let Json(response) = public_key(State(state)).await;
    assert_eq!(response.public_key, crate::config::DEFAULT_SW_PUBLIC_KEY);
}
