//! Error handling for the event API.
//!
//! Every failure is answered with `{"status":"error","message":..}`.
//!
//! | Cause | Status |
//! |-------|--------|
//! | Malformed query | 400 |
//! | Event does not match the schema | 422 |
//! | Registry or log unreachable | 503 |
//! | Anything else | 500 |

use crate::models::{ApiResponse, UserEvent};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use schemaflow_client::ClientError;
use schemaflow_codec::CodecError;
use schemaflow_registry::RegistryError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Failed to produce event: {0}")]
    Produce(#[from] ClientError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Produce(ClientError::Codec(CodecError::SchemaMismatch(_))) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::Produce(ClientError::Transport(_))
            | AppError::Produce(ClientError::Codec(CodecError::Registry(
                RegistryError::Unavailable(_),
            )))
            | AppError::Produce(ClientError::Registry(RegistryError::Unavailable(_))) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::Produce(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Event request failed");
        } else {
            tracing::warn!(error = %self, "Event request rejected");
        }
        (status, Json(ApiResponse::<UserEvent>::error(self.to_string()))).into_response()
    }
}
