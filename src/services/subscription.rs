//! Subscription store — push subscriptions keyed by subscription ID.
//!
//! DESIGN
//! ======
//! The notification trigger only needs `get_all`; the subscribe and
//! unsubscribe routes use the rest. The trait keeps the storage backend
//! swappable; the in-memory store is the one the server runs with.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::services::queue::company_key;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("subscription not found: {0}")]
    NotFound(Uuid),
    #[error("subscription store failure: {0}")]
    Backend(String),
}

/// Browser push endpoint as produced by `PushManager.subscribe()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushSubscription {
    pub endpoint: String,
    #[serde(default)]
    pub expiration_time: Option<u64>,
    #[serde(default)]
    pub keys: Option<PushKeys>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushKeys {
    pub p256dh: String,
    pub auth: String,
}

/// One browser that wants to hear about arrivals at any of `company_names`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub subscription_id: Uuid,
    pub company_names: Vec<String>,
    pub subscription: PushSubscription,
}

impl Subscription {
    #[must_use]
    pub fn new(company_name: &str, subscription: PushSubscription) -> Self {
        Self { subscription_id: Uuid::new_v4(), company_names: vec![company_name.to_string()], subscription }
    }

    /// Case-insensitive membership test against `company_names`.
    #[must_use]
    pub fn follows(&self, company_name: &str) -> bool {
        let key = company_key(company_name);
        self.company_names.iter().any(|c| company_key(c) == key)
    }

    /// Add a company unless an equivalent spelling is already present.
    /// Returns `true` when the set changed.
    pub fn follow(&mut self, company_name: &str) -> bool {
        if self.follows(company_name) {
            return false;
        }
        self.company_names.push(company_name.to_string());
        true
    }
}

#[async_trait::async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Every stored subscription, in no particular order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] when the backend cannot be read.
    async fn get_all(&self) -> Result<Vec<Subscription>, StoreError>;

    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] when the backend cannot be read.
    async fn get(&self, subscription_id: Uuid) -> Result<Option<Subscription>, StoreError>;

    /// Insert or replace a subscription.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] when the write fails.
    async fn add(&self, subscription: Subscription) -> Result<(), StoreError>;

    /// Replace an existing subscription.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no subscription has that ID.
    async fn update(&self, subscription: Subscription) -> Result<(), StoreError>;

    /// Remove a subscription, returning whether it existed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] when the write fails.
    async fn remove(&self, subscription_id: Uuid) -> Result<bool, StoreError>;
}

// =============================================================================
// IN-MEMORY STORE
// =============================================================================

#[derive(Default)]
pub struct InMemorySubscriptionStore {
    subscriptions: RwLock<HashMap<Uuid, Subscription>>,
}

impl InMemorySubscriptionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl SubscriptionStore for InMemorySubscriptionStore {
    async fn get_all(&self) -> Result<Vec<Subscription>, StoreError> {
        Ok(self.subscriptions.read().await.values().cloned().collect())
    }

    async fn get(&self, subscription_id: Uuid) -> Result<Option<Subscription>, StoreError> {
        Ok(self.subscriptions.read().await.get(&subscription_id).cloned())
    }

    async fn add(&self, subscription: Subscription) -> Result<(), StoreError> {
        self.subscriptions
            .write()
            .await
            .insert(subscription.subscription_id, subscription);
        Ok(())
    }

    async fn update(&self, subscription: Subscription) -> Result<(), StoreError> {
        let mut subscriptions = self.subscriptions.write().await;
        let Some(existing) = subscriptions.get_mut(&subscription.subscription_id) else {
            return Err(StoreError::NotFound(subscription.subscription_id));
        };
        *existing = subscription;
        Ok(())
    }

    async fn remove(&self, subscription_id: Uuid) -> Result<bool, StoreError> {
        Ok(self.subscriptions.write().await.remove(&subscription_id).is_some())
    }
}

#[cfg(test)]
#[path = "subscription_test.rs"]
mod tests;
