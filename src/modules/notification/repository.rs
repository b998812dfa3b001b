use uuid::Uuid;

use crate::api::error;
use crate::modules::notification::schema::{NotificationEntity, NotificationEvent};

#[async_trait::async_trait]
pub trait NotificationRepository {
    async fn insert(
        &self,
        user_id: &Uuid,
        event: NotificationEvent,
        payload: &serde_json::Value,
    ) -> Result<(), error::SystemError>;

    async fn list_for_user(
        &self,
        user_id: &Uuid,
    ) -> Result<Vec<NotificationEntity>, error::SystemError>;

    async fn mark_read(&self, user_id: &Uuid, id: &Uuid) -> Result<bool, error::SystemError>;
}
