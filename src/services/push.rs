//! Push sender — delivers one notification payload to one subscription.
//!
//! DESIGN
//! ======
//! `WebPushSender` speaks the Web Push protocol: the payload is encrypted
//! for the browser with its `p256dh`/`auth` keys (`aes128gcm`) and the
//! request carries a VAPID `Authorization` header signed with the server's
//! private key. `web-push` builds the message; `reqwest` sends it. Callers
//! treat delivery as fire-and-forget: errors are reported back once and
//! never retried.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{CONTENT_ENCODING, CONTENT_TYPE};
use serde::Serialize;
use web_push::{ContentEncoding, SubscriptionInfo, VapidSignatureBuilder, WebPushMessage, WebPushMessageBuilder};

use crate::services::subscription::PushSubscription;

const REQUEST_TIMEOUT_SECS: u64 = 30;
const CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum PushError {
    #[error("http client build failed: {0}")]
    HttpClientBuild(String),
    #[error("push subscription has no encryption keys")]
    MissingKeys,
    #[error("payload encoding failed: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("web push message build failed: {0}")]
    Message(#[from] web_push::WebPushError),
    #[error("push request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("push subscription is gone (status {status})")]
    Gone { status: u16 },
    #[error("push service rejected message (status {status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Body of an arrival notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
    pub message: String,
    pub company_name: String,
}

impl NotificationPayload {
    #[must_use]
    pub fn arrival(user_name: &str, company_name: &str) -> Self {
        Self {
            message: format!("{user_name} is at the {company_name} water cooler"),
            company_name: company_name.to_string(),
        }
    }
}

#[async_trait::async_trait]
pub trait PushSender: Send + Sync {
    /// Deliver `payload` to a single subscription.
    ///
    /// # Errors
    ///
    /// Returns [`PushError::Gone`] when the endpoint no longer exists, and
    /// another [`PushError`] for any other delivery failure.
    async fn send(&self, subscription: &PushSubscription, payload: &NotificationPayload) -> Result<(), PushError>;
}

// =============================================================================
// WEB PUSH SENDER
// =============================================================================

pub struct WebPushSender {
    http: reqwest::Client,
    vapid_private_key: String,
    subject: String,
    ttl_secs: u32,
}

impl WebPushSender {
    /// `vapid_private_key` is the URL-safe base64 P-256 scalar whose public
    /// half browsers received as the application server key.
    ///
    /// # Errors
    ///
    /// Returns [`PushError::HttpClientBuild`] if the HTTP client cannot be created.
    pub fn new(vapid_private_key: &str, subject: &str, ttl_secs: u64) -> Result<Self, PushError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| PushError::HttpClientBuild(e.to_string()))?;
        Ok(Self {
            http,
            vapid_private_key: vapid_private_key.trim().to_string(),
            subject: subject.to_string(),
            ttl_secs: u32::try_from(ttl_secs).unwrap_or(u32::MAX),
        })
    }

    /// Encrypt and sign `payload` for one browser.
    fn build_message(
        &self,
        subscription: &PushSubscription,
        payload: &NotificationPayload,
    ) -> Result<WebPushMessage, PushError> {
        let keys = subscription.keys.as_ref().ok_or(PushError::MissingKeys)?;
        let info = SubscriptionInfo::new(subscription.endpoint.clone(), keys.p256dh.clone(), keys.auth.clone());

        let mut signature = VapidSignatureBuilder::from_base64(&self.vapid_private_key, web_push::URL_SAFE_NO_PAD, &info)?;
        signature.add_claim("sub", self.subject.as_str());

        let body = serde_json::to_vec(payload)?;
        let mut builder = WebPushMessageBuilder::new(&info);
        builder.set_ttl(self.ttl_secs);
        builder.set_payload(ContentEncoding::Aes128Gcm, &body);
        builder.set_vapid_signature(signature.build()?);
        Ok(builder.build()?)
    }

    /// The HTTP request the push service receives for one delivery.
    pub(crate) fn build_request(
        &self,
        subscription: &PushSubscription,
        payload: &NotificationPayload,
    ) -> Result<reqwest::Request, PushError> {
        let message = self.build_message(subscription, payload)?;
        let mut request = self
            .http
            .post(message.endpoint.to_string())
            .header("TTL", message.ttl.to_string());
        if let Some(encrypted) = message.payload {
            request = request
                .header(CONTENT_ENCODING, encrypted.content_encoding.to_str())
                .header(CONTENT_TYPE, "application/octet-stream");
            for (name, value) in encrypted.crypto_headers {
                request = request.header(name, value);
            }
            request = request.body(encrypted.content);
        }
        Ok(request.build()?)
    }
}

#[async_trait::async_trait]
impl PushSender for WebPushSender {
    async fn send(&self, subscription: &PushSubscription, payload: &NotificationPayload) -> Result<(), PushError> {
        let request = self.build_request(subscription, payload)?;
        let response = self.http.execute(request).await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(classify_failure(status, body))
    }
}

/// Map a non-success push service status to an error.
pub(crate) fn classify_failure(status: StatusCode, body: String) -> PushError {
    match status {
        StatusCode::NOT_FOUND | StatusCode::GONE => PushError::Gone { status: status.as_u16() },
        _ => PushError::Rejected { status: status.as_u16(), body },
    }
}
