use crate::{
    db::{
        errors::Result,
        models::credits::{BalanceSummary, CreditTransactionCreateDBRequest, CreditTransactionDBResponse, CreditTransactionType},
    },
    types::UserId,
};
use sqlx::{Connection, PgConnection};
use tracing::{instrument, trace};

const TRANSACTION_COLUMNS: &str = "id, user_id, transaction_type, amount, balance_after, previous_transaction_id, \
     description, lead_id, payment_session_id, created_at";

pub struct Credits<'c> {
    db: &'c mut PgConnection,
}

/// Advisory lock key for a user's ledger: the first 8 bytes of the UUID
fn ledger_lock_key(user_id: UserId) -> i64 {
    let bytes = user_id.as_bytes();
    i64::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7]])
}

impl<'c> Credits<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Append a ledger entry.
    ///
    /// Writers for the same user serialize on a transaction-scoped advisory
    /// lock, so `balance_after` always extends the newest entry. When called
    /// on a connection that is already inside a transaction this runs in a
    /// savepoint and the lock is held until the outer transaction ends.
    ///
    /// A debit larger than the balance fails with `DbError::CheckViolation`.
    #[instrument(skip(self, request), fields(user_id = %request.user_id, amount = request.amount), err)]
    pub async fn create_transaction(&mut self, request: &CreditTransactionCreateDBRequest) -> Result<CreditTransactionDBResponse> {
        let mut tx = self.db.begin().await?;

        // Blocks until any other writer for this user commits or rolls back
        sqlx::query_scalar::<_, i32>("SELECT 1 FROM (SELECT pg_advisory_xact_lock($1)) AS _")
            .bind(ledger_lock_key(request.user_id))
            .fetch_one(&mut *tx)
            .await?;

        trace!("Acquired ledger lock for user_id {}", request.user_id);

        let previous = sqlx::query_as::<_, (i64, uuid::Uuid)>(
            r#"
            SELECT balance_after, id
            FROM credits_transactions
            WHERE user_id = $1
            ORDER BY seq DESC
            LIMIT 1
            "#,
        )
        .bind(request.user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let (current_balance, previous_transaction_id) = match previous {
            Some((balance, id)) => (balance, Some(id)),
            None => (0, None),
        };

        let new_balance = match request.transaction_type {
            CreditTransactionType::Purchase => current_balance + request.amount,
            CreditTransactionType::Usage => current_balance - request.amount,
        };

        // A negative balance is rejected by the table CHECK
        let transaction = sqlx::query_as::<_, CreditTransactionDBResponse>(&format!(
            r#"
            INSERT INTO credits_transactions
                (user_id, transaction_type, amount, balance_after, previous_transaction_id, description, lead_id, payment_session_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {TRANSACTION_COLUMNS}
            "#
        ))
        .bind(request.user_id)
        .bind(request.transaction_type)
        .bind(request.amount)
        .bind(new_balance)
        .bind(previous_transaction_id)
        .bind(&request.description)
        .bind(request.lead_id)
        .bind(&request.payment_session_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(transaction)
    }

    /// Current balance (latest `balance_after`), read without locking
    #[instrument(skip(self), err)]
    pub async fn get_user_balance(&mut self, user_id: UserId) -> Result<i64> {
        let balance = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT balance_after
            FROM credits_transactions
            WHERE user_id = $1
            ORDER BY seq DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(balance.unwrap_or(0))
    }

    #[instrument(skip(self), err)]
    pub async fn get_balance_summary(&mut self, user_id: UserId) -> Result<BalanceSummary> {
        let summary = sqlx::query_as::<_, BalanceSummary>(
            r#"
            SELECT
                COALESCE(
                    (SELECT balance_after FROM credits_transactions WHERE user_id = $1 ORDER BY seq DESC LIMIT 1),
                    0
                ) AS balance,
                COALESCE(SUM(amount) FILTER (WHERE transaction_type = 'purchase'), 0)::BIGINT AS total_purchased,
                COALESCE(SUM(amount) FILTER (WHERE transaction_type = 'usage'), 0)::BIGINT AS total_used,
                MAX(created_at) AS last_updated
            FROM credits_transactions
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(summary)
    }

    /// Newest first
    #[instrument(skip(self), err)]
    pub async fn list_user_transactions(&mut self, user_id: UserId, skip: i64, limit: i64) -> Result<Vec<CreditTransactionDBResponse>> {
        let transactions = sqlx::query_as::<_, CreditTransactionDBResponse>(&format!(
            r#"
            SELECT {TRANSACTION_COLUMNS}
            FROM credits_transactions
            WHERE user_id = $1
            ORDER BY seq DESC
            OFFSET $2
            LIMIT $3
            "#
        ))
        .bind(user_id)
        .bind(skip)
        .bind(limit)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(transactions)
    }
}
