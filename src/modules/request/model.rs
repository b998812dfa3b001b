use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::modules::request::schema::{RequestStatus, RequestType};

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequestBody {
    pub recipient_id: Uuid,
    pub request_type: RequestType,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RequestTypeQuery {
    #[serde(rename = "type")]
    pub request_type: RequestType,
}

/// The accept/decline verb, kept separate from `RequestStatus` so callers
/// cannot ask for a transition back to `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestDecision {
    Accepted,
    Rejected,
}

impl RequestDecision {
    pub fn status(self) -> RequestStatus {
        match self {
            RequestDecision::Accepted => RequestStatus::Accepted,
            RequestDecision::Rejected => RequestStatus::Rejected,
        }
    }
}

/// The counterparty as shown in inbox/outbox lists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileSummary {
    pub id: Uuid,
    pub display_name: String,
    pub city: Option<String>,
    pub photo_url: Option<String>,
}

/// Raw join row from the ledger; photo gating is applied when mapping into
/// `RequestListItem`.
#[derive(sqlx::FromRow)]
pub struct RequestUserRow {
    pub req_id: Uuid,
    pub request_type: RequestType,
    pub status: RequestStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub user_id: Uuid,
    pub display_name: String,
    pub city: Option<String>,
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestListItem {
    pub id: Uuid,
    pub request_type: RequestType,
    pub status: RequestStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub user: ProfileSummary,
}

impl From<RequestUserRow> for RequestListItem {
    fn from(row: RequestUserRow) -> Self {
        // visibility is derived, never stored: the photo travels with the
        // row only once the request is accepted
        let photo_url = if row.status == RequestStatus::Accepted { row.photo_url } else { None };

        RequestListItem {
            id: row.req_id,
            request_type: row.request_type,
            status: row.status,
            created_at: row.created_at,
            user: ProfileSummary {
                id: row.user_id,
                display_name: row.display_name,
                city: row.city,
                photo_url,
            },
        }
    }
}
