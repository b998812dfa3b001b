//! Entitlement rules: who may create or respond to requests, and how the
//! monthly quota is granted. Pure functions over user attributes so the
//! rules can change without touching the request workflow.

use crate::api::error;
use crate::modules::user::schema::{
    Gender, PlanTier, SubscriptionStatus, UserEntity, UserRole,
};

/// Monthly quota for members without any paid plan.
pub const FREE_MONTHLY_QUOTA: i32 = 3;

/// Freemium means browse-only on the respond side: male members without an
/// active subscription. Females and affiliates are never freemium.
pub fn is_freemium(user: &UserEntity) -> bool {
    if user.role == UserRole::Affiliate {
        return false;
    }
    user.gender == Gender::Male && user.subscription_status != SubscriptionStatus::Active
}

/// Freemium members may list their inbox but not accept or decline; the
/// caller surfaces an upgrade prompt instead.
pub fn can_respond(user: &UserEntity) -> bool {
    !is_freemium(user)
}

pub fn has_unlimited_requests(user: &UserEntity) -> bool {
    user.subscription_plan == Some(PlanTier::Unlimited)
}

/// A new request needs either the unlimited tier or a positive balance.
pub fn can_create(user: &UserEntity) -> Result<(), error::SystemError> {
    if has_unlimited_requests(user) || user.requests_remaining > 0 {
        Ok(())
    } else {
        Err(error::SystemError::InsufficientRequests)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GrantKind {
    /// Overwrite the balance with the quota. Unused requests do not carry
    /// over.
    Reset,
    /// Add the quota on top of the current balance. Unused requests carry
    /// over across renewals.
    Rollover,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonthlyGrant {
    pub amount: i32,
    pub kind: GrantKind,
}

/// The monthly allocation rule. Female members get a non-rollover reset to
/// their quota every period; male members accrue their plan quota on
/// renewal while subscribed. The reset/rollover split is plan-significant,
/// not an accident.
pub fn monthly_grant(user: &UserEntity) -> Option<MonthlyGrant> {
    if has_unlimited_requests(user) {
        return None;
    }

    match user.gender {
        Gender::Female => {
            let amount = user
                .subscription_plan
                .as_ref()
                .map(PlanTier::monthly_quota)
                .unwrap_or(FREE_MONTHLY_QUOTA);
            Some(MonthlyGrant { amount, kind: GrantKind::Reset })
        }
        Gender::Male => {
            if user.subscription_status != SubscriptionStatus::Active {
                return None;
            }
            user.subscription_plan
                .as_ref()
                .map(|plan| MonthlyGrant { amount: plan.monthly_quota(), kind: GrantKind::Rollover })
        }
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use uuid::Uuid;

    pub fn test_user(
        gender: Gender,
        status: SubscriptionStatus,
        plan: Option<PlanTier>,
        requests_remaining: i32,
    ) -> UserEntity {
        let now = chrono::Utc::now();
        UserEntity {
            id: Uuid::new_v7(uuid::Timestamp::now(uuid::NoContext)),
            username: "amina".to_string(),
            email: "amina@example.com".to_string(),
            hash_password: String::new(),
            role: UserRole::User,
            display_name: "Amina K".to_string(),
            gender,
            bio: None,
            city: None,
            photo_url: Some("https://cdn.example.com/p/1.jpg".to_string()),
            subscription_plan: plan,
            subscription_status: status,
            requests_remaining,
            renewal_at: None,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn male_without_active_subscription_is_freemium() {
        let user = test_user(Gender::Male, SubscriptionStatus::Inactive, None, 0);
        assert!(is_freemium(&user));
        assert!(!can_respond(&user));

        let canceled = test_user(Gender::Male, SubscriptionStatus::Canceled, Some(PlanTier::Basic), 2);
        assert!(is_freemium(&canceled));
    }

    #[test]
    fn subscribed_male_is_not_freemium() {
        let user = test_user(Gender::Male, SubscriptionStatus::Active, Some(PlanTier::Basic), 0);
        assert!(!is_freemium(&user));
        assert!(can_respond(&user));
    }

    #[test]
    fn females_and_affiliates_are_never_freemium() {
        let female = test_user(Gender::Female, SubscriptionStatus::Inactive, None, 0);
        assert!(!is_freemium(&female));

        let mut affiliate = test_user(Gender::Male, SubscriptionStatus::Inactive, None, 0);
        affiliate.role = UserRole::Affiliate;
        assert!(!is_freemium(&affiliate));
    }

    #[test]
    fn create_requires_balance_or_unlimited() {
        let broke = test_user(Gender::Male, SubscriptionStatus::Active, Some(PlanTier::Basic), 0);
        assert!(matches!(can_create(&broke), Err(error::SystemError::InsufficientRequests)));

        let funded = test_user(Gender::Male, SubscriptionStatus::Active, Some(PlanTier::Basic), 1);
        assert!(can_create(&funded).is_ok());

        let unlimited =
            test_user(Gender::Male, SubscriptionStatus::Active, Some(PlanTier::Unlimited), 0);
        assert!(can_create(&unlimited).is_ok());
        assert!(has_unlimited_requests(&unlimited));
    }

    #[test]
    fn female_grant_resets_to_quota() {
        let free = test_user(Gender::Female, SubscriptionStatus::Inactive, None, 7);
        let grant = monthly_grant(&free).unwrap();
        assert_eq!(grant.kind, GrantKind::Reset);
        assert_eq!(grant.amount, FREE_MONTHLY_QUOTA);

        let premium =
            test_user(Gender::Female, SubscriptionStatus::Active, Some(PlanTier::Premium), 0);
        let grant = monthly_grant(&premium).unwrap();
        assert_eq!(grant.kind, GrantKind::Reset);
        assert_eq!(grant.amount, 15);
    }

    #[test]
    fn male_renewal_grant_rolls_over() {
        let subscriber =
            test_user(Gender::Male, SubscriptionStatus::Active, Some(PlanTier::Basic), 2);
        let grant = monthly_grant(&subscriber).unwrap();
        assert_eq!(grant.kind, GrantKind::Rollover);
        assert_eq!(grant.amount, 5);
    }

    #[test]
    fn freemium_male_and_unlimited_tier_get_no_grant() {
        let freemium = test_user(Gender::Male, SubscriptionStatus::Inactive, None, 0);
        assert!(monthly_grant(&freemium).is_none());

        let unlimited =
            test_user(Gender::Female, SubscriptionStatus::Active, Some(PlanTier::Unlimited), 0);
        assert!(monthly_grant(&unlimited).is_none());
    }
}
