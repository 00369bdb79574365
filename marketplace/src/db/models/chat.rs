use crate::types::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, FromRow)]
pub struct ChatSessionDBResponse {
    pub session_id: String,
    pub user_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChatSessionDBResponse {
    /// Sessions without an owner are open to anyone holding the id
    pub fn is_accessible_by(&self, user_id: Option<UserId>) -> bool {
        match (self.user_id, user_id) {
            (None, _) => true,
            (Some(owner), Some(caller)) => owner == caller,
            (Some(_), None) => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatMessageCreateDBRequest {
    pub session_id: String,
    pub role: ChatRole,
    pub content: String,
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, FromRow)]
pub struct ChatMessageDBResponse {
    pub id: Uuid,
    pub session_id: String,
    pub role: ChatRole,
    pub content: String,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}
