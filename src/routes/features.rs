//! Feature flags advertised to the browser client.

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct FeaturesResponse {
    pub features: Vec<&'static str>,
}

/// `GET /api/features/enabled` — list enabled client features.
pub async fn enabled(State(state): State<AppState>) -> Json<FeaturesResponse> {
    Json(FeaturesResponse { features: state.enabled_features() })
}
