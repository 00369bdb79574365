use crate::types::{ReviewId, UserId};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone)]
pub struct ReviewCreateDBRequest {
    pub customer_id: UserId,
    pub professional_id: UserId,
    pub rating: i32,
    pub title: String,
    pub comment: String,
    pub customer_name: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct ReviewDBResponse {
    pub id: ReviewId,
    pub customer_id: UserId,
    pub professional_id: UserId,
    pub rating: i32,
    pub title: String,
    pub comment: String,
    pub customer_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A review joined with the reviewed professional's business name
#[derive(Debug, Clone, FromRow)]
pub struct AuthoredReviewDBResponse {
    #[sqlx(flatten)]
    pub review: ReviewDBResponse,
    pub professional_name: Option<String>,
}
