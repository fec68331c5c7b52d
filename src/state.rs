//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It holds the queue service, which owns the matching tables, and the
//! subscription store shared with the notification trigger. No tables live
//! in globals; every handler reaches them through this value.

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::metrics::MetricsSink;
use crate::services::notification::NotificationTrigger;
use crate::services::push::PushSender;
use crate::services::queue::QueueService;
use crate::services::subscription::SubscriptionStore;

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped or Clone.
#[derive(Clone)]
pub struct AppState {
    pub queue: QueueService,
    pub subscriptions: Arc<dyn SubscriptionStore>,
    /// Key browsers need to create a push subscription.
    pub push_public_key: Arc<str>,
    /// Static asset root.
    pub public_dir: Arc<PathBuf>,
}

impl AppState {
    /// Wire the services together from configuration. Notifications are
    /// only switched on when the config enables them and a sender exists.
    #[must_use]
    pub fn new(
        config: &AppConfig,
        subscriptions: Arc<dyn SubscriptionStore>,
        sender: Option<Arc<dyn PushSender>>,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        let enabled = config.notifications.enabled() && sender.is_some();
        let sender: Arc<dyn PushSender> = match sender {
            Some(sender) => sender,
            None => Arc::new(NoopSender),
        };
        let notifier = NotificationTrigger::new(
            enabled,
            config.notifications.cooldown,
            Arc::clone(&subscriptions),
            sender,
            Arc::clone(&metrics),
        );
        let queue = QueueService::new(config.matching.clone(), metrics, Arc::new(notifier));
        Self {
            queue,
            subscriptions,
            push_public_key: Arc::from(config.notifications.public_key.as_str()),
            public_dir: Arc::new(config.public_dir.clone()),
        }
    }

    /// Feature names the browser client may switch on.
    #[must_use]
    pub fn enabled_features(&self) -> Vec<&'static str> {
        let mut features = vec!["base"];
        if self.queue.notifier().is_enabled() {
            features.push("notifications");
        }
        features
    }
}

/// Stand-in sender for a trigger that is switched off.
struct NoopSender;

#[async_trait::async_trait]
impl PushSender for NoopSender {
    async fn send(
        &self,
        _subscription: &crate::services::subscription::PushSubscription,
        _payload: &crate::services::push::NotificationPayload,
    ) -> Result<(), crate::services::push::PushError> {
        Ok(())
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
pub mod test_helpers {
    use super::*;
    use crate::config::{MatchConfig, NotificationConfig};
    use crate::metrics::LogMetrics;
    use crate::services::subscription::InMemorySubscriptionStore;

    #[must_use]
    pub fn test_config() -> AppConfig {
        AppConfig {
            port: 0,
            public_dir: PathBuf::from("public"),
            matching: MatchConfig::default(),
            notifications: NotificationConfig::default(),
        }
    }

    /// `AppState` with notifications off and an empty in-memory store.
    #[must_use]
    pub fn test_app_state() -> AppState {
        AppState::new(&test_config(), Arc::new(InMemorySubscriptionStore::new()), None, Arc::new(LogMetrics))
    }

    /// `AppState` with notifications on, delivering through `sender`.
    #[must_use]
    pub fn test_app_state_with_sender(sender: Arc<dyn PushSender>) -> AppState {
        let mut config = test_config();
        config.notifications.private_key = Some("test-private-key".into());
        AppState::new(&config, Arc::new(InMemorySubscriptionStore::new()), Some(sender), Arc::new(LogMetrics))
    }
}

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
