use serde::{Deserialize, Serialize};
use sqlx::prelude::{FromRow, Type};
use uuid::Uuid;

/// One state machine, two flavors of request. A match request proposes an
/// introduction; a photo-reveal request asks to see the gated profile photo.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Type, Serialize, Deserialize)]
#[sqlx(type_name = "request_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RequestType {
    Match,
    PhotoReveal,
}

/// `Pending` is the only state a row can leave, and it leaves exactly once.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Type, Serialize, Deserialize)]
#[sqlx(type_name = "request_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Rejected,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct RequestEntity {
    pub id: Uuid,
    pub requester_id: Uuid,
    pub requested_id: Uuid,
    pub request_type: RequestType,
    pub status: RequestStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub responded_at: Option<chrono::DateTime<chrono::Utc>>,
}
