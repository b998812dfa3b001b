use std::sync::Arc;

use serde::Serialize;

use crate::{
    api::error,
    modules::{
        allocation::repository::AllocationRepository, entitlement::policy,
        user::schema::UserEntity,
    },
};

#[derive(Debug, Serialize)]
pub struct AllocationRunSummary {
    pub billing_period: String,
    pub granted: usize,
    pub skipped: usize,
}

#[derive(Clone)]
pub struct AllocationService<A>
where
    A: AllocationRepository + Send + Sync,
{
    repo: Arc<A>,
}

impl<A> AllocationService<A>
where
    A: AllocationRepository + Send + Sync,
{
    pub fn with_dependencies(repo: Arc<A>) -> Self {
        AllocationService { repo }
    }

    /// Grant one user's monthly quota for the period. Returns false when
    /// the policy grants nothing or the period was already allocated.
    pub async fn grant_for_user(
        &self,
        user: &UserEntity,
        billing_period: &str,
    ) -> Result<bool, error::SystemError> {
        let Some(grant) = policy::monthly_grant(user) else {
            return Ok(false);
        };

        self.repo.record_and_apply(&user.id, billing_period, grant.amount, grant.kind).await
    }

    /// One full allocation pass. Safe to run more than once per period:
    /// the (user, period) ledger key makes repeat grants no-ops.
    pub async fn run_period(
        &self,
        billing_period: Option<String>,
    ) -> Result<AllocationRunSummary, error::SystemError> {
        let billing_period = match billing_period {
            Some(p) => validate_period(p)?,
            None => chrono::Utc::now().format("%Y-%m").to_string(),
        };

        let users = self.repo.active_users().await?;

        let mut granted = 0;
        let mut skipped = 0;
        for user in &users {
            if self.grant_for_user(user, &billing_period).await? {
                granted += 1;
            } else {
                skipped += 1;
            }
        }

        log::info!(
            "Allocation run for {}: {} granted, {} skipped",
            billing_period,
            granted,
            skipped
        );

        Ok(AllocationRunSummary { billing_period, granted, skipped })
    }
}

fn validate_period(period: String) -> Result<String, error::SystemError> {
    let bytes = period.as_bytes();
    let well_formed = bytes.len() == 7
        && bytes[4] == b'-'
        && bytes.iter().enumerate().all(|(i, b)| i == 4 || b.is_ascii_digit());

    if well_formed {
        Ok(period)
    } else {
        Err(error::SystemError::bad_request("Billing period must be formatted as YYYY-MM"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;
    use uuid::Uuid;

    use crate::modules::entitlement::policy::tests::test_user;
    use crate::modules::entitlement::policy::GrantKind;
    use crate::modules::user::schema::{Gender, PlanTier, SubscriptionStatus};

    struct InMemoryAllocations {
        users: Mutex<HashMap<Uuid, UserEntity>>,
        recorded: Mutex<HashSet<(Uuid, String)>>,
    }

    impl InMemoryAllocations {
        fn new(entities: Vec<UserEntity>) -> Self {
            InMemoryAllocations {
                users: Mutex::new(entities.into_iter().map(|u| (u.id, u)).collect()),
                recorded: Mutex::new(HashSet::new()),
            }
        }

        fn remaining(&self, id: &Uuid) -> i32 {
            self.users.lock().unwrap().get(id).unwrap().requests_remaining
        }
    }

    #[async_trait::async_trait]
    impl AllocationRepository for InMemoryAllocations {
        async fn active_users(&self) -> Result<Vec<UserEntity>, error::SystemError> {
            Ok(self.users.lock().unwrap().values().cloned().collect())
        }

        async fn record_and_apply(
            &self,
            user_id: &Uuid,
            billing_period: &str,
            amount: i32,
            kind: GrantKind,
        ) -> Result<bool, error::SystemError> {
            let mut recorded = self.recorded.lock().unwrap();
            if !recorded.insert((*user_id, billing_period.to_string())) {
                return Ok(false);
            }

            let mut users = self.users.lock().unwrap();
            let user = users.get_mut(user_id).expect("user exists");
            match kind {
                GrantKind::Reset => user.requests_remaining = amount,
                GrantKind::Rollover => user.requests_remaining += amount,
            }
            Ok(true)
        }
    }

    #[tokio::test]
    async fn second_run_in_the_same_period_changes_nothing() {
        let subscriber =
            test_user(Gender::Male, SubscriptionStatus::Active, Some(PlanTier::Basic), 2);
        let id = subscriber.id;
        let repo = Arc::new(InMemoryAllocations::new(vec![subscriber]));
        let service = AllocationService::with_dependencies(repo.clone());

        let first = service.run_period(Some("2026-08".to_string())).await.unwrap();
        assert_eq!(first.granted, 1);
        assert_eq!(repo.remaining(&id), 7);

        let second = service.run_period(Some("2026-08".to_string())).await.unwrap();
        assert_eq!(second.granted, 0);
        assert_eq!(second.skipped, 1);
        assert_eq!(repo.remaining(&id), 7);

        // a new period grants again, rolling over the balance
        let next = service.run_period(Some("2026-09".to_string())).await.unwrap();
        assert_eq!(next.granted, 1);
        assert_eq!(repo.remaining(&id), 12);
    }

    #[tokio::test]
    async fn female_reset_discards_the_old_balance() {
        let member = test_user(Gender::Female, SubscriptionStatus::Inactive, None, 9);
        let id = member.id;
        let repo = Arc::new(InMemoryAllocations::new(vec![member]));
        let service = AllocationService::with_dependencies(repo.clone());

        service.run_period(Some("2026-08".to_string())).await.unwrap();
        assert_eq!(repo.remaining(&id), policy::FREE_MONTHLY_QUOTA);
    }

    #[tokio::test]
    async fn freemium_males_are_skipped() {
        let freemium = test_user(Gender::Male, SubscriptionStatus::Inactive, None, 0);
        let id = freemium.id;
        let repo = Arc::new(InMemoryAllocations::new(vec![freemium]));
        let service = AllocationService::with_dependencies(repo.clone());

        let run = service.run_period(Some("2026-08".to_string())).await.unwrap();
        assert_eq!(run.granted, 0);
        assert_eq!(repo.remaining(&id), 0);
    }

    #[tokio::test]
    async fn malformed_period_is_rejected() {
        let repo = Arc::new(InMemoryAllocations::new(vec![]));
        let service = AllocationService::with_dependencies(repo);

        let err = service.run_period(Some("Aug 2026".to_string())).await.unwrap_err();
        assert!(matches!(err, error::SystemError::BadRequest(_)));
    }
}
