//! API models

use serde::{Deserialize, Serialize};

/// A user action, written to the log as Avro.
///
/// Field names and types mirror `schema/user_event.avsc`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserEvent {
    pub user_id: i32,
    pub action: String,
    pub page: String,
    /// Milliseconds since the Unix epoch, assigned by the server
    pub timestamp: i64,
}

/// Query parameters of `POST /events/user_action`
#[derive(Debug, Clone, Deserialize)]
pub struct UserActionParams {
    pub user_id: i32,
    pub action: String,
    #[serde(default = "default_page")]
    pub page: String,
}

fn default_page() -> String {
    "/".to_string()
}

impl UserActionParams {
    pub fn into_event(self, timestamp: i64) -> UserEvent {
        UserEvent {
            user_id: self.user_id,
            action: self.action,
            page: self.page,
            timestamp,
        }
    }
}

/// Body of every event endpoint response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub status: ResponseStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

impl<T> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            status: ResponseStatus::Success,
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Error,
            message: message.into(),
            data: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub topic: String,
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_id: Option<u32>,
    pub published: u64,
    pub delivered: u64,
    pub failed: u64,
}
