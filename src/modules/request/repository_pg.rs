use uuid::Uuid;

use crate::{
    api::error,
    modules::request::{
        model::{RequestListItem, RequestUserRow},
        repository::RequestRepository,
        schema::{RequestEntity, RequestStatus, RequestType},
    },
};

#[derive(Clone)]
pub struct RequestRepositoryPg {
    pool: sqlx::PgPool,
}

impl RequestRepositoryPg {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl RequestRepository for RequestRepositoryPg {
    async fn find_by_id(
        &self,
        request_id: &Uuid,
    ) -> Result<Option<RequestEntity>, error::SystemError> {
        let request = sqlx::query_as::<_, RequestEntity>("SELECT * FROM requests WHERE id = $1")
            .bind(request_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(request)
    }

    async fn find_pending(
        &self,
        requester_id: &Uuid,
        requested_id: &Uuid,
        request_type: RequestType,
    ) -> Result<Option<RequestEntity>, error::SystemError> {
        let request = sqlx::query_as::<_, RequestEntity>(
            r#"
            SELECT *
            FROM requests
            WHERE requester_id = $1
              AND requested_id = $2
              AND request_type = $3
              AND status = 'pending'
            "#,
        )
        .bind(requester_id)
        .bind(requested_id)
        .bind(request_type)
        .fetch_optional(&self.pool)
        .await?;

        Ok(request)
    }

    async fn find_accepted_between(
        &self,
        user_id_a: &Uuid,
        user_id_b: &Uuid,
        request_type: RequestType,
    ) -> Result<Option<RequestEntity>, error::SystemError> {
        let request = sqlx::query_as::<_, RequestEntity>(
            r#"
            SELECT *
            FROM requests
            WHERE request_type = $3
              AND status = 'accepted'
              AND (
                   (requester_id = $1 AND requested_id = $2)
                OR (requester_id = $2 AND requested_id = $1)
              )
            LIMIT 1
            "#,
        )
        .bind(user_id_a)
        .bind(user_id_b)
        .bind(request_type)
        .fetch_optional(&self.pool)
        .await?;

        Ok(request)
    }

    async fn create_consuming_quota(
        &self,
        requester_id: &Uuid,
        requested_id: &Uuid,
        request_type: RequestType,
        unlimited: bool,
    ) -> Result<RequestEntity, error::SystemError> {
        let mut tx = self.pool.begin().await?;

        if !unlimited {
            // decrement-if-positive; the WHERE guard is what keeps the
            // counter from going negative under concurrent submits
            let rows = sqlx::query(
                "UPDATE users SET requests_remaining = requests_remaining - 1 WHERE id = $1 AND requests_remaining > 0",
            )
            .bind(requester_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

            if rows == 0 {
                tx.rollback().await?;
                return Err(error::SystemError::InsufficientRequests);
            }
        }

        let id = Uuid::new_v7(uuid::Timestamp::now(uuid::NoContext));
        let request = sqlx::query_as::<_, RequestEntity>(
            r#"
            INSERT INTO requests (id, requester_id, requested_id, request_type)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(requester_id)
        .bind(requested_id)
        .bind(request_type)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(request)
    }

    async fn list_pending_for_recipient(
        &self,
        user_id: &Uuid,
        request_type: RequestType,
    ) -> Result<Vec<RequestListItem>, error::SystemError> {
        let rows = sqlx::query_as::<_, RequestUserRow>(
            r#"
            SELECT
                r.id AS req_id,
                r.request_type,
                r.status,
                r.created_at,
                u.id AS user_id,
                u.display_name,
                u.city,
                u.photo_url
            FROM requests r
            JOIN users u
                ON r.requester_id = u.id
            WHERE r.requested_id = $1
              AND r.request_type = $2
              AND r.status = 'pending'
            ORDER BY r.created_at DESC
            "#,
        )
        .bind(user_id)
        .bind(request_type)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(RequestListItem::from).collect())
    }

    async fn list_for_requester(
        &self,
        user_id: &Uuid,
        request_type: RequestType,
    ) -> Result<Vec<RequestListItem>, error::SystemError> {
        let rows = sqlx::query_as::<_, RequestUserRow>(
            r#"
            SELECT
                r.id AS req_id,
                r.request_type,
                r.status,
                r.created_at,
                u.id AS user_id,
                u.display_name,
                u.city,
                u.photo_url
            FROM requests r
            JOIN users u
                ON r.requested_id = u.id
            WHERE r.requester_id = $1
              AND r.request_type = $2
            ORDER BY r.created_at DESC
            "#,
        )
        .bind(user_id)
        .bind(request_type)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(RequestListItem::from).collect())
    }

    async fn update_status_if_pending(
        &self,
        request_id: &Uuid,
        status: RequestStatus,
    ) -> Result<Option<RequestEntity>, error::SystemError> {
        let request = sqlx::query_as::<_, RequestEntity>(
            r#"
            UPDATE requests
            SET status = $2, responded_at = NOW()
            WHERE id = $1 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(request_id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?;

        Ok(request)
    }
}
