//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! This module binds the JSON API used by the browser client and serves the
//! static client from `PUBLIC_DIR`. Company pages (`/at/{companyName}`) all
//! serve the same `company.html`; the client reads the company from the URL.

pub mod features;
pub mod notifications;
pub mod queue;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// API routes plus static assets.
pub fn app(state: AppState) -> Router {
    let public_dir = state.public_dir.as_ref().clone();
    let company_page = ServeFile::new(public_dir.join("company.html"));

    Router::new()
        .route("/api/queue", put(queue::add_to_queue))
        .route("/api/match/{queue_id}", post(queue::find_match))
        .route("/api/notifications/subscribe", post(notifications::subscribe))
        .route("/api/notifications/unsubscribe", post(notifications::unsubscribe))
        .route("/api/notifications/public-key", get(notifications::public_key))
        .route("/api/features/enabled", get(features::enabled))
        .route("/healthz", get(healthz))
        .route_service("/at/{company_name}", company_page)
        .fallback_service(ServeDir::new(public_dir).append_index_html_on_directories(true))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
