use crate::{
    db::models::chat::{ChatMessageDBResponse, ChatRole, ChatSessionDBResponse},
    types::UserId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatRequest {
    pub message: String,
    /// Continue this session; a new one is started when absent or unknown
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatResponse {
    pub message: String,
    pub session_id: String,
    pub is_new_session: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatMessageResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: Uuid,
    pub session_id: String,
    pub role: ChatRole,
    pub content: String,
    #[schema(value_type = Object)]
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl From<ChatMessageDBResponse> for ChatMessageResponse {
    fn from(db: ChatMessageDBResponse) -> Self {
        Self {
            id: db.id,
            session_id: db.session_id,
            role: db.role,
            content: db.content,
            metadata: db.metadata,
            created_at: db.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatHistoryResponse {
    pub session_id: String,
    pub messages: Vec<ChatMessageResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatSessionResponse {
    pub session_id: String,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub user_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ChatSessionDBResponse> for ChatSessionResponse {
    fn from(db: ChatSessionDBResponse) -> Self {
        Self {
            session_id: db.session_id,
            user_id: db.user_id,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatSessionsResponse {
    pub sessions: Vec<ChatSessionResponse>,
}
