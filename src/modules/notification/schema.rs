use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationEvent {
    RequestReceived,
    RequestAccepted,
    RequestRejected,
}

impl NotificationEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationEvent::RequestReceived => "request_received",
            NotificationEvent::RequestAccepted => "request_accepted",
            NotificationEvent::RequestRejected => "request_rejected",
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct NotificationEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub event: String,
    pub payload: serde_json::Value,
    pub read: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
