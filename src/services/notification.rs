//! Notification trigger — tells subscribers someone is waiting at their company.
//!
//! DESIGN
//! ======
//! Every queue entry asks the trigger whether to notify. A per-company
//! cooldown limits bursts: the slot is claimed under the lock before any
//! I/O, so concurrent arrivals for the same company produce one batch.
//! Subscriptions are then read from the store and one delivery task is
//! spawned per recipient.
//!
//! ERROR HANDLING
//! ==============
//! Store failures count as "no subscribers". Delivery failures are logged
//! and counted per recipient and never reach the caller. Endpoints the push
//! service reports as gone are dropped from the store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::metrics::{self, MetricsSink};
use crate::services::push::{NotificationPayload, PushError, PushSender};
use crate::services::queue::company_key;
use crate::services::subscription::SubscriptionStore;

/// What a single trigger attempt decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// Notifications are switched off.
    Disabled,
    /// The company was notified too recently.
    Held,
    /// A batch was started; `recipients` deliveries were spawned.
    Dispatched { recipients: usize },
}

pub struct NotificationTrigger {
    enabled: bool,
    cooldown: Duration,
    /// Company key -> when the last batch for it was started.
    last_notified: Mutex<HashMap<String, Instant>>,
    store: Arc<dyn SubscriptionStore>,
    sender: Arc<dyn PushSender>,
    metrics: Arc<dyn MetricsSink>,
}

impl NotificationTrigger {
    #[must_use]
    pub fn new(
        enabled: bool,
        cooldown: Duration,
        store: Arc<dyn SubscriptionStore>,
        sender: Arc<dyn PushSender>,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        Self { enabled, cooldown, last_notified: Mutex::new(HashMap::new()), store, sender, metrics }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Notify subscribers of `company_name` that `user_name` joined the queue.
    /// `own_subscription` is skipped so nobody is told about themselves.
    pub async fn notify_arrival(
        &self,
        user_name: &str,
        company_name: &str,
        own_subscription: Option<Uuid>,
    ) -> TriggerOutcome {
        self.notify_arrival_at(user_name, company_name, own_subscription, Instant::now())
            .await
    }

    pub(crate) async fn notify_arrival_at(
        &self,
        user_name: &str,
        company_name: &str,
        own_subscription: Option<Uuid>,
        now: Instant,
    ) -> TriggerOutcome {
        if !self.enabled {
            return TriggerOutcome::Disabled;
        }

        if !self.claim_cooldown_slot(company_name, now) {
            debug!(company = company_name, "notification held by cooldown");
            self.metrics.increment(metrics::NOTIFICATION_HELD);
            return TriggerOutcome::Held;
        }

        let subscriptions = match self.store.get_all().await {
            Ok(subscriptions) => subscriptions,
            Err(e) => {
                warn!(error = %e, company = company_name, "subscription store unavailable, skipping notifications");
                Vec::new()
            }
        };

        let payload = NotificationPayload::arrival(user_name, company_name);
        let mut recipients = 0;
        for subscription in subscriptions
            .into_iter()
            .filter(|s| s.follows(company_name) && Some(s.subscription_id) != own_subscription)
        {
            recipients += 1;
            self.metrics.increment(metrics::NOTIFICATION_ATTEMPTED);

            let sender = Arc::clone(&self.sender);
            let store = Arc::clone(&self.store);
            let sink = Arc::clone(&self.metrics);
            let payload = payload.clone();
            tokio::spawn(async move {
                let id = subscription.subscription_id;
                match sender.send(&subscription.subscription, &payload).await {
                    Ok(()) => debug!(subscription_id = %id, "notification delivered"),
                    Err(e) => {
                        warn!(error = %e, subscription_id = %id, "failed to push to one target");
                        sink.increment(metrics::NOTIFICATION_FAILED);
                        if matches!(e, PushError::Gone { .. }) {
                            if let Err(e) = store.remove(id).await {
                                warn!(error = %e, subscription_id = %id, "failed to drop gone subscription");
                            }
                        }
                    }
                }
            });
        }

        info!(company = company_name, recipients, "notification batch started");
        TriggerOutcome::Dispatched { recipients }
    }

    /// Record `now` as the company's last notification unless the previous
    /// one is still inside the cooldown window.
    fn claim_cooldown_slot(&self, company_name: &str, now: Instant) -> bool {
        let mut last_notified = self
            .last_notified
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let key = company_key(company_name);
        if let Some(last) = last_notified.get(&key) {
            if now.saturating_duration_since(*last) < self.cooldown {
                return false;
            }
        }
        last_notified.insert(key, now);
        true
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================


#[cfg(test)]
#[path = "notification_test.rs"]
mod tests;
