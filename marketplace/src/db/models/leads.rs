use crate::{
    api::models::requests::LeadStatus,
    types::{CustomerRequestId, LeadId, UserId},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;

#[derive(Debug, Clone)]
pub struct LeadCreateDBRequest {
    pub customer_request_id: CustomerRequestId,
    pub professional_id: UserId,
}

/// Setting `status` to contacted or completed also stamps the matching timestamp
#[derive(Debug, Clone, Default)]
pub struct LeadUpdateDBRequest {
    pub status: Option<LeadStatus>,
    pub notes: Option<String>,
    pub quote_amount: Option<Decimal>,
    pub is_won: Option<bool>,
}

#[derive(Debug, Clone, FromRow)]
pub struct LeadDBResponse {
    pub id: LeadId,
    pub customer_request_id: CustomerRequestId,
    pub professional_id: UserId,
    pub status: LeadStatus,
    pub assigned_at: DateTime<Utc>,
    pub contacted_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub notes: String,
    pub quote_amount: Option<Decimal>,
    pub is_won: Option<bool>,
    pub feedback_rating: Option<i32>,
    pub feedback_comment: Option<String>,
    pub credits_used: i64,
    pub viewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Outcome of a professional unlocking a request
#[derive(Debug, Clone)]
pub struct LeadUnlock {
    pub lead: LeadDBResponse,
    /// Credits charged by this unlock; 0 when the lead already existed
    pub charged: i64,
    pub balance: i64,
}
