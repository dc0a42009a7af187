//! Health endpoint

use axum::{extract::State, Json};

use crate::models::HealthResponse;
use crate::AppState;

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let stats = state.pipeline.stats();
    Json(HealthResponse {
        status: "ok".to_string(),
        topic: state.pipeline.topic().to_string(),
        subject: state.pipeline.subject().to_string(),
        schema_id: state.pipeline.registered().map(|r| r.id),
        published: stats.published,
        delivered: stats.delivered,
        failed: stats.failed,
    })
}
