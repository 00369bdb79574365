use crate::{api::models::credits::CreditPackage, types::UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Initiated,
    Completed,
    Failed,
    Expired,
}

#[derive(Debug, Clone)]
pub struct PaymentCreateDBRequest {
    pub session_id: String,
    pub user_id: UserId,
    pub amount: Decimal,
    pub currency: String,
    pub credits_purchased: i64,
    pub package_type: CreditPackage,
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, FromRow)]
pub struct PaymentDBResponse {
    pub id: Uuid,
    pub session_id: String,
    pub user_id: UserId,
    pub amount: Decimal,
    pub currency: String,
    pub credits_purchased: i64,
    pub package_type: CreditPackage,
    pub payment_status: PaymentStatus,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Result of trying to complete a checkout session
#[derive(Debug, Clone)]
pub enum PaymentCompletion {
    /// This call completed the session and credited the account
    Completed { payment: PaymentDBResponse, new_balance: i64 },
    /// An earlier confirmation already did
    AlreadyCompleted { payment: PaymentDBResponse },
    /// No such session is recorded
    Unknown,
}
