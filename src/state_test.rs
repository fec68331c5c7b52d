use super::*;
use crate::services::notification::test_helpers::UnreachableSender;

#[test]
fn features_without_notifications() {
    let state = test_helpers::test_app_state();
    assert_eq!(state.enabled_features(), vec!["base"]);
}

#[test]
fn features_with_notifications() {
    let state = test_helpers::test_app_state_with_sender(Arc::new(UnreachableSender));
    assert_eq!(state.enabled_features(), vec!["base", "notifications"]);
}

#[test]
fn private_key_without_sender_keeps_notifications_off() {
    let mut config = test_helpers::test_config();
    config.notifications.private_key = Some("key".into());
    let state = AppState::new(
        &config,
        Arc::new(crate::services::subscription::InMemorySubscriptionStore::new()),
        None,
        Arc::new(crate::metrics::LogMetrics),
    );
    assert!(!state.queue.notifier().is_enabled());
}

#[test]
fn clones_share_the_queue() {
    let state = test_helpers::test_app_state();
    let clone = state.clone();
    let ticket = state
        .queue
        .enqueue_at("Alice", "Acme", None, std::time::Instant::now())
        .unwrap();
    assert!(clone.queue.find_match(ticket.queue_id).is_ok());
}
