//! User event produce endpoint

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};

use crate::error::AppError;
use crate::models::{ApiResponse, UserActionParams, UserEvent};
use crate::AppState;

/// `POST /events/user_action?user_id=&action=&page=`
///
/// Stamps the event with the current time, publishes it and answers once
/// the log accepted it. Delivery is reported asynchronously.
pub async fn produce_user_event(
    State(state): State<AppState>,
    params: Result<Query<UserActionParams>, QueryRejection>,
) -> Result<Json<ApiResponse<UserEvent>>, AppError> {
    let Query(params) = params.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let event = params.into_event(chrono::Utc::now().timestamp_millis());

    state.pipeline.publish(None, &event).await?;

    tracing::debug!(user_id = event.user_id, action = %event.action, "User event accepted");
    let message = format!("Event produced to {}", state.transport.log_name());
    Ok(Json(ApiResponse::success(message, event)))
}
