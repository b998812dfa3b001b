use uuid::Uuid;

use crate::api::error;
use crate::modules::entitlement::policy::GrantKind;
use crate::modules::user::schema::UserEntity;

#[async_trait::async_trait]
pub trait AllocationRepository {
    /// All members a period run considers. The policy decides per user
    /// whether anything is granted.
    async fn active_users(&self) -> Result<Vec<UserEntity>, error::SystemError>;

    /// Record the allocation and apply it to the user's counter in one
    /// transaction. Returns false when the (user, period) pair was already
    /// recorded; the counter is untouched in that case.
    async fn record_and_apply(
        &self,
        user_id: &Uuid,
        billing_period: &str,
        amount: i32,
        kind: GrantKind,
    ) -> Result<bool, error::SystemError>;
}
