use uuid::Uuid;

use crate::{
    api::error,
    modules::{
        allocation::repository::AllocationRepository, entitlement::policy::GrantKind,
        user::schema::UserEntity,
    },
};

#[derive(Clone)]
pub struct AllocationRepositoryPg {
    pool: sqlx::PgPool,
}

impl AllocationRepositoryPg {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl AllocationRepository for AllocationRepositoryPg {
    async fn active_users(&self) -> Result<Vec<UserEntity>, error::SystemError> {
        let users =
            sqlx::query_as::<_, UserEntity>("SELECT * FROM users WHERE deleted_at IS NULL")
                .fetch_all(&self.pool)
                .await?;

        Ok(users)
    }

    async fn record_and_apply(
        &self,
        user_id: &Uuid,
        billing_period: &str,
        amount: i32,
        kind: GrantKind,
    ) -> Result<bool, error::SystemError> {
        let mut tx = self.pool.begin().await?;

        let id = Uuid::new_v7(uuid::Timestamp::now(uuid::NoContext));
        let inserted = sqlx::query(
            r#"
            INSERT INTO request_allocations (id, user_id, billing_period, amount, rollover)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id, billing_period) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(billing_period)
        .bind(amount)
        .bind(kind == GrantKind::Rollover)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if inserted == 0 {
            // already granted for this period
            tx.rollback().await?;
            return Ok(false);
        }

        let update = match kind {
            GrantKind::Reset => "UPDATE users SET requests_remaining = $2 WHERE id = $1",
            GrantKind::Rollover => {
                "UPDATE users SET requests_remaining = requests_remaining + $2 WHERE id = $1"
            }
        };
        sqlx::query(update).bind(user_id).bind(amount).execute(&mut *tx).await?;

        tx.commit().await?;

        Ok(true)
    }
}
