use uuid::Uuid;

use crate::api::error;
use crate::modules::request::model::RequestListItem;
use crate::modules::request::schema::{RequestEntity, RequestStatus, RequestType};

/// Ledger access for directional requests. Policy lives in the service;
/// everything here is storage plus the two atomic guards the workflow
/// depends on (quota decrement and status compare-and-swap).
#[async_trait::async_trait]
pub trait RequestRepository {
    async fn find_by_id(
        &self,
        request_id: &Uuid,
    ) -> Result<Option<RequestEntity>, error::SystemError>;

    async fn find_pending(
        &self,
        requester_id: &Uuid,
        requested_id: &Uuid,
        request_type: RequestType,
    ) -> Result<Option<RequestEntity>, error::SystemError>;

    /// An accepted row between the two users, either direction. Used to
    /// derive photo visibility at read time.
    async fn find_accepted_between(
        &self,
        user_id_a: &Uuid,
        user_id_b: &Uuid,
        request_type: RequestType,
    ) -> Result<Option<RequestEntity>, error::SystemError>;

    /// Insert a pending row and consume one unit of the requester's quota in
    /// the same transaction. When `unlimited` is set the decrement is
    /// skipped. A decrement matching zero rows aborts the whole operation
    /// with `InsufficientRequests`; a duplicate pending row surfaces as
    /// `DuplicateActiveRequest`.
    async fn create_consuming_quota(
        &self,
        requester_id: &Uuid,
        requested_id: &Uuid,
        request_type: RequestType,
        unlimited: bool,
    ) -> Result<RequestEntity, error::SystemError>;

    /// Pending rows addressed to the user, requester profile joined in,
    /// newest first.
    async fn list_pending_for_recipient(
        &self,
        user_id: &Uuid,
        request_type: RequestType,
    ) -> Result<Vec<RequestListItem>, error::SystemError>;

    /// Every row the user has sent, any status, recipient profile joined in.
    async fn list_for_requester(
        &self,
        user_id: &Uuid,
        request_type: RequestType,
    ) -> Result<Vec<RequestListItem>, error::SystemError>;

    /// Conditional single-row update: `pending -> status`. Returns `None`
    /// when the row was not pending anymore, so two concurrent responses
    /// resolve to exactly one winner.
    async fn update_status_if_pending(
        &self,
        request_id: &Uuid,
        status: RequestStatus,
    ) -> Result<Option<RequestEntity>, error::SystemError>;
}
