use crate::{
    db::{
        errors::Result,
        handlers::credits::Credits,
        models::{
            credits::CreditTransactionCreateDBRequest,
            payments::{PaymentCompletion, PaymentCreateDBRequest, PaymentDBResponse, PaymentStatus},
        },
    },
    types::UserId,
};
use sqlx::{Connection, PgConnection};
use tracing::{info, instrument};

const PAYMENT_COLUMNS: &str = "id, session_id, user_id, amount, currency, credits_purchased, package_type, \
     payment_status, metadata, created_at, updated_at";

pub struct Payments<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Payments<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Record a freshly created checkout session in the `initiated` state
    #[instrument(skip(self, request), fields(session_id = %request.session_id), err)]
    pub async fn create(&mut self, request: &PaymentCreateDBRequest) -> Result<PaymentDBResponse> {
        let payment = sqlx::query_as::<_, PaymentDBResponse>(&format!(
            r#"
            INSERT INTO payment_transactions
                (session_id, user_id, amount, currency, credits_purchased, package_type, payment_status, metadata)
            VALUES ($1, $2, $3, $4, $5, $6, 'initiated', $7)
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(&request.session_id)
        .bind(request.user_id)
        .bind(request.amount)
        .bind(&request.currency)
        .bind(request.credits_purchased)
        .bind(request.package_type)
        .bind(&request.metadata)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(payment)
    }

    #[instrument(skip(self), err)]
    pub async fn get_by_session_id(&mut self, session_id: &str) -> Result<Option<PaymentDBResponse>> {
        let payment = sqlx::query_as::<_, PaymentDBResponse>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payment_transactions WHERE session_id = $1"
        ))
        .bind(session_id)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(payment)
    }

    /// A session only if it belongs to the given user
    #[instrument(skip(self), err)]
    pub async fn get_for_user(&mut self, session_id: &str, user_id: UserId) -> Result<Option<PaymentDBResponse>> {
        let payment = sqlx::query_as::<_, PaymentDBResponse>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payment_transactions WHERE session_id = $1 AND user_id = $2"
        ))
        .bind(session_id)
        .bind(user_id)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(payment)
    }

    /// Move a session that is not completed to another non-terminal status.
    /// A completed session is never touched; `None` means no row changed.
    #[instrument(skip(self), err)]
    pub async fn set_status(&mut self, session_id: &str, status: PaymentStatus) -> Result<Option<PaymentDBResponse>> {
        let payment = sqlx::query_as::<_, PaymentDBResponse>(&format!(
            r#"
            UPDATE payment_transactions SET payment_status = $2, updated_at = NOW()
            WHERE session_id = $1 AND payment_status <> 'completed'
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(session_id)
        .bind(status)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(payment)
    }

    /// Mark a session completed and credit the buyer, exactly once.
    ///
    /// The status flip is a conditional update in the same transaction as the
    /// ledger entry, so of any number of concurrent confirmations (client poll
    /// or webhook) only one sees its update match and only that one credits.
    #[instrument(skip(self), err)]
    pub async fn complete(&mut self, session_id: &str) -> Result<PaymentCompletion> {
        let mut tx = self.db.begin().await?;

        let completed = sqlx::query_as::<_, PaymentDBResponse>(&format!(
            r#"
            UPDATE payment_transactions SET payment_status = 'completed', updated_at = NOW()
            WHERE session_id = $1 AND payment_status <> 'completed'
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(session_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(payment) = completed else {
            tx.rollback().await?;
            return Ok(match self.get_by_session_id(session_id).await? {
                Some(payment) => PaymentCompletion::AlreadyCompleted { payment },
                None => PaymentCompletion::Unknown,
            });
        };

        let entry = Credits::new(&mut tx)
            .create_transaction(&CreditTransactionCreateDBRequest::purchase(
                payment.user_id,
                payment.credits_purchased,
                session_id,
                format!("Credit purchase - {}", payment.package_type.as_str()),
            ))
            .await?;

        tx.commit().await?;

        info!(
            session_id,
            user_id = %payment.user_id,
            credits = payment.credits_purchased,
            "payment completed"
        );

        Ok(PaymentCompletion::Completed {
            payment,
            new_balance: entry.balance_after,
        })
    }
}
