use crate::types::{LeadId, TransactionId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Credit transaction type enum stored as TEXT in database
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CreditTransactionType {
    Purchase,
    Usage,
}

/// Database request for appending a ledger entry
#[derive(Debug, Clone)]
pub struct CreditTransactionCreateDBRequest {
    pub user_id: UserId,
    pub transaction_type: CreditTransactionType,
    pub amount: i64,
    pub description: Option<String>,
    pub lead_id: Option<LeadId>,
    pub payment_session_id: Option<String>,
}

impl CreditTransactionCreateDBRequest {
    pub fn purchase(user_id: UserId, amount: i64, session_id: &str, description: String) -> Self {
        Self {
            user_id,
            transaction_type: CreditTransactionType::Purchase,
            amount,
            description: Some(description),
            lead_id: None,
            payment_session_id: Some(session_id.to_string()),
        }
    }

    pub fn usage(user_id: UserId, amount: i64, lead_id: LeadId, description: String) -> Self {
        Self {
            user_id,
            transaction_type: CreditTransactionType::Usage,
            amount,
            description: Some(description),
            lead_id: Some(lead_id),
            payment_session_id: None,
        }
    }
}

/// Database response for a ledger entry
#[derive(Debug, Clone, FromRow)]
pub struct CreditTransactionDBResponse {
    pub id: TransactionId,
    pub user_id: UserId,
    pub transaction_type: CreditTransactionType,
    pub amount: i64,
    pub balance_after: i64,
    pub previous_transaction_id: Option<TransactionId>,
    pub description: Option<String>,
    pub lead_id: Option<LeadId>,
    pub payment_session_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Balance and lifetime totals derived from the ledger
#[derive(Debug, Clone, Default, FromRow)]
pub struct BalanceSummary {
    pub balance: i64,
    pub total_purchased: i64,
    pub total_used: i64,
    pub last_updated: Option<DateTime<Utc>>,
}
