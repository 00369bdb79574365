use crate::db::models::users::UserDBResponse;
use crate::types::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Which side of the marketplace an account belongs to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash, ToSchema)]
#[sqlx(type_name = "user_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    Professional,
    Customer,
    Admin,
}

/// Self-service profile update for `PUT /auth/me`
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UserUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
}

impl UserUpdate {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none() && self.last_name.is_none() && self.phone.is_none()
    }
}

/// Admin update of account flags
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UserStatusUpdate {
    pub is_active: Option<bool>,
    pub is_verified: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: UserId,
    pub email: String,
    pub user_type: UserType,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub is_active: bool,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}

/// Query parameters for listing users
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListUsersQuery {
    /// Filter by account type
    pub user_type: Option<UserType>,
}

/// The authenticated caller, resolved from a bearer token
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CurrentUser {
    #[schema(value_type = String, format = "uuid")]
    pub id: UserId,
    pub email: String,
    pub user_type: UserType,
    pub first_name: String,
    pub last_name: String,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.user_type == UserType::Admin
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl From<UserDBResponse> for UserResponse {
    fn from(db: UserDBResponse) -> Self {
        Self {
            id: db.id,
            email: db.email,
            user_type: db.user_type,
            first_name: db.first_name,
            last_name: db.last_name,
            phone: db.phone,
            is_active: db.is_active,
            is_verified: db.is_verified,
            created_at: db.created_at,
        }
    }
}

impl From<UserDBResponse> for CurrentUser {
    fn from(db: UserDBResponse) -> Self {
        Self {
            id: db.id,
            email: db.email,
            user_type: db.user_type,
            first_name: db.first_name,
            last_name: db.last_name,
        }
    }
}

impl From<UserResponse> for CurrentUser {
    fn from(response: UserResponse) -> Self {
        Self {
            id: response.id,
            email: response.email,
            user_type: response.user_type,
            first_name: response.first_name,
            last_name: response.last_name,
        }
    }
}
