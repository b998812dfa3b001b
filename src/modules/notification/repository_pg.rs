use uuid::Uuid;

use crate::{
    api::error,
    modules::notification::{
        repository::NotificationRepository,
        schema::{NotificationEntity, NotificationEvent},
    },
};

#[derive(Clone)]
pub struct NotificationRepositoryPg {
    pool: sqlx::PgPool,
}

impl NotificationRepositoryPg {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl NotificationRepository for NotificationRepositoryPg {
    async fn insert(
        &self,
        user_id: &Uuid,
        event: NotificationEvent,
        payload: &serde_json::Value,
    ) -> Result<(), error::SystemError> {
        let id = Uuid::new_v7(uuid::Timestamp::now(uuid::NoContext));
        sqlx::query("INSERT INTO notifications (id, user_id, event, payload) VALUES ($1, $2, $3, $4)")
            .bind(id)
            .bind(user_id)
            .bind(event.as_str())
            .bind(payload)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn list_for_user(
        &self,
        user_id: &Uuid,
    ) -> Result<Vec<NotificationEntity>, error::SystemError> {
        let notifications = sqlx::query_as::<_, NotificationEntity>(
            "SELECT * FROM notifications WHERE user_id = $1 ORDER BY created_at DESC LIMIT 100",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(notifications)
    }

    async fn mark_read(&self, user_id: &Uuid, id: &Uuid) -> Result<bool, error::SystemError> {
        let rows =
            sqlx::query("UPDATE notifications SET read = TRUE WHERE id = $1 AND user_id = $2")
                .bind(id)
                .bind(user_id)
                .execute(&self.pool)
                .await?
                .rows_affected();

        Ok(rows > 0)
    }
}
