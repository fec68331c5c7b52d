//! Push subscription routes.
//!
//! A browser subscribes once per company page it visits. Sending back the
//! `subscriptionId` it already holds adds the company to that subscription
//! instead of creating a second one.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::services::subscription::{PushSubscription, StoreError, Subscription};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeBody {
    pub subscription: PushSubscription,
    pub company_name: String,
    #[serde(default)]
    pub subscription_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsubscribeBody {
    pub subscription_id: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionAck {
    pub success: bool,
    pub subscription_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct AckResponse {
    pub data: SubscriptionAck,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyResponse {
    pub public_key: String,
}

fn ack(subscription_id: Uuid) -> Json<AckResponse> {
    Json(AckResponse { data: SubscriptionAck { success: true, subscription_id } })
}

/// `POST /api/notifications/subscribe` — register or extend a subscription.
pub async fn subscribe(
    State(state): State<AppState>,
    Json(body): Json<SubscribeBody>,
) -> Result<Json<AckResponse>, StatusCode> {
    if body.subscription.endpoint.trim().is_empty() || body.company_name.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let existing = match body.subscription_id {
        Some(id) => state
            .subscriptions
            .get(id)
            .await
            .map_err(store_error_to_status)?,
        None => None,
    };

    if let Some(mut subscription) = existing {
        subscription.follow(&body.company_name);
        subscription.subscription = body.subscription;
        let id = subscription.subscription_id;
        state
            .subscriptions
            .update(subscription)
            .await
            .map_err(store_error_to_status)?;
        info!(subscription_id = %id, company = %body.company_name, "subscription extended");
        return Ok(ack(id));
    }

    let subscription = Subscription::new(&body.company_name, body.subscription);
    let id = subscription.subscription_id;
    state
        .subscriptions
        .add(subscription)
        .await
        .map_err(store_error_to_status)?;
    info!(subscription_id = %id, company = %body.company_name, "registering new subscription");
    Ok(ack(id))
}

/// `POST /api/notifications/unsubscribe` — drop a subscription.
pub async fn unsubscribe(
    State(state): State<AppState>,
    Json(body): Json<UnsubscribeBody>,
) -> Result<Json<AckResponse>, StatusCode> {
    let removed = state
        .subscriptions
        .remove(body.subscription_id)
        .await
        .map_err(store_error_to_status)?;
    if !removed {
        return Err(StatusCode::NOT_FOUND);
    }
    info!(subscription_id = %body.subscription_id, "removing subscription");
    Ok(ack(body.subscription_id))
}

/// `GET /api/notifications/public-key` — application server key for `PushManager.subscribe()`.
pub async fn public_key(State(state): State<AppState>) -> Json<PublicKeyResponse> {
    Json(PublicKeyResponse { public_key: state.push_public_key.to_string() })
}

pub(crate) fn store_error_to_status(err: StoreError) -> StatusCode {
    match err {
        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        StoreError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
#[path = "notifications_test.rs"]
mod tests;
