use std::sync::Arc;

use uuid::Uuid;

use crate::api::error;
use crate::modules::notification::{
    repository::NotificationRepository,
    schema::{NotificationEntity, NotificationEvent},
};

/// Sink for workflow events. Delivery is best-effort: callers log failures
/// and never roll back the state change that produced the event.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(
        &self,
        user_id: &Uuid,
        event: NotificationEvent,
        payload: serde_json::Value,
    ) -> Result<(), error::SystemError>;
}

#[derive(Clone)]
pub struct NotificationService<R>
where
    R: NotificationRepository + Send + Sync,
{
    repo: Arc<R>,
}

impl<R> NotificationService<R>
where
    R: NotificationRepository + Send + Sync,
{
    pub fn with_dependencies(repo: Arc<R>) -> Self {
        NotificationService { repo }
    }

    pub async fn list(&self, user_id: Uuid) -> Result<Vec<NotificationEntity>, error::SystemError> {
        self.repo.list_for_user(&user_id).await
    }

    pub async fn mark_read(&self, user_id: Uuid, id: Uuid) -> Result<(), error::SystemError> {
        let updated = self.repo.mark_read(&user_id, &id).await?;
        if !updated {
            return Err(error::SystemError::not_found("Notification not found"));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl<R> Notifier for NotificationService<R>
where
    R: NotificationRepository + Send + Sync,
{
    async fn notify(
        &self,
        user_id: &Uuid,
        event: NotificationEvent,
        payload: serde_json::Value,
    ) -> Result<(), error::SystemError> {
        self.repo.insert(user_id, event, &payload).await
    }
}
