//! Queue routes — enter the queue and poll for a chat group.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Deserialize;
use uuid::Uuid;

use crate::services::queue::{MatchResponse, QueueError, QueueTicket};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToQueueBody {
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub subscription_id: Option<Uuid>,
}

/// `PUT /api/queue` — enter the queue for a company.
pub async fn add_to_queue(
    State(state): State<AppState>,
    Json(body): Json<AddToQueueBody>,
) -> Result<Json<QueueTicket>, StatusCode> {
    let ticket = state
        .queue
        .add(&body.user_name, &body.company_name, body.subscription_id)
        .await
        .map_err(queue_error_to_status)?;
    Ok(Json(ticket))
}

/// `POST /api/match/{queue_id}` — advance matching by one step.
pub async fn find_match(
    State(state): State<AppState>,
    Path(queue_id): Path<Uuid>,
) -> Result<Json<MatchResponse>, StatusCode> {
    let response = state
        .queue
        .find_match(queue_id)
        .map_err(queue_error_to_status)?;
    Ok(Json(response))
}

pub(crate) fn queue_error_to_status(err: QueueError) -> StatusCode {
    match err {
        QueueError::NotFound(_) => StatusCode::NOT_FOUND,
        QueueError::MissingField(_) => StatusCode::BAD_REQUEST,
    }
}

#[cfg(test)]
#[path = "queue_test.rs"]
mod tests;
