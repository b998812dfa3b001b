use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::modules::user::schema::{Gender, PlanTier, SubscriptionStatus, UserEntity};
use crate::utils::double_option;

#[derive(Deserialize, Validate)]
pub struct SignUpModel {
    #[validate(length(min = 3, message = "Username must be at least 3 characters long"))]
    pub username: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters long"))]
    pub password: String,
    #[validate(length(min = 1, message = "First name cannot be empty"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "Last name cannot be empty"))]
    pub last_name: String,
    pub gender: Gender,
}

#[derive(Deserialize, Validate)]
pub struct SignInModel {
    #[validate(length(min = 3, message = "Username must be at least 3 characters long"))]
    pub username: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters long"))]
    pub password: String,
}

#[derive(Deserialize, Validate)]
pub struct UpdateUserModel {
    #[validate(length(min = 1, message = "Display name cannot be empty"))]
    pub display_name: Option<String>,
    // Some(None) clears the field, None leaves it unchanged
    #[serde(default, deserialize_with = "double_option")]
    pub bio: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub city: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub photo_url: Option<Option<String>>,
}

pub struct InsertUser {
    pub username: String,
    pub email: String,
    pub hash_password: String,
    pub display_name: String,
    pub gender: Gender,
}

pub struct UpdateUser {
    pub display_name: Option<String>,
    pub bio: Option<Option<String>>,
    pub city: Option<Option<String>>,
    pub photo_url: Option<Option<String>>,
}

#[derive(Serialize)]
pub struct SignUpResponse {
    pub id: uuid::Uuid,
}

#[derive(Serialize)]
pub struct SignInResponse {
    pub access_token: String,
}

/// The authenticated user's own view, including quota and plan fields.
#[derive(Deserialize, Serialize)]
pub struct UserResponse {
    pub id: uuid::Uuid,
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub gender: Gender,
    pub bio: Option<String>,
    pub city: Option<String>,
    pub photo_url: Option<String>,
    pub subscription_plan: Option<PlanTier>,
    pub subscription_status: SubscriptionStatus,
    pub requests_remaining: i32,
    pub renewal_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<UserEntity> for UserResponse {
    fn from(entity: UserEntity) -> Self {
        UserResponse {
            id: entity.id,
            username: entity.username,
            email: entity.email,
            display_name: entity.display_name,
            gender: entity.gender,
            bio: entity.bio,
            city: entity.city,
            photo_url: entity.photo_url,
            subscription_plan: entity.subscription_plan,
            subscription_status: entity.subscription_status,
            requests_remaining: entity.requests_remaining,
            renewal_at: entity.renewal_at,
        }
    }
}

/// What other members see. `photo_url` is populated only when an accepted
/// photo-reveal request links the viewer and this profile.
#[derive(Serialize)]
pub struct ProfileCard {
    pub id: uuid::Uuid,
    pub display_name: String,
    pub gender: Gender,
    pub bio: Option<String>,
    pub city: Option<String>,
    pub photo_url: Option<String>,
}

impl ProfileCard {
    pub fn from_entity(entity: UserEntity, photo_visible: bool) -> Self {
        ProfileCard {
            id: entity.id,
            display_name: entity.display_name,
            gender: entity.gender,
            bio: entity.bio,
            city: entity.city,
            photo_url: if photo_visible { entity.photo_url } else { None },
        }
    }
}
