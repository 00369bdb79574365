use crate::{
    api::models::requests::LeadStatus,
    db::{
        errors::{DbError, Result},
        handlers::{credits::Credits, repository::Repository},
        models::{
            credits::CreditTransactionCreateDBRequest,
            leads::{LeadCreateDBRequest, LeadDBResponse, LeadUnlock, LeadUpdateDBRequest},
        },
    },
    types::{CustomerRequestId, LeadId, UserId},
};
use sqlx::{Connection, PgConnection};
use tracing::{info, instrument};

const LEAD_COLUMNS: &str = "id, customer_request_id, professional_id, status, assigned_at, contacted_at, completed_at, \
     notes, quote_amount, is_won, feedback_rating, feedback_comment, credits_used, viewed_at, created_at, updated_at";

/// Filter for listing leads, newest first
#[derive(Debug, Clone, Default)]
pub struct LeadFilter {
    pub professional_id: Option<UserId>,
    pub status: Option<LeadStatus>,
    pub skip: i64,
    pub limit: i64,
}

impl LeadFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            skip,
            limit,
            ..Default::default()
        }
    }
}

pub struct Leads<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Leads<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// A lead only if it belongs to the given professional
    #[instrument(skip(self), err)]
    pub async fn get_for_professional(&mut self, id: LeadId, professional_id: UserId) -> Result<Option<LeadDBResponse>> {
        let lead = sqlx::query_as::<_, LeadDBResponse>(&format!(
            "SELECT {LEAD_COLUMNS} FROM leads WHERE id = $1 AND professional_id = $2"
        ))
        .bind(id)
        .bind(professional_id)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(lead)
    }

    #[instrument(skip(self), err)]
    pub async fn get_for_request(
        &mut self,
        customer_request_id: CustomerRequestId,
        professional_id: UserId,
    ) -> Result<Option<LeadDBResponse>> {
        let lead = sqlx::query_as::<_, LeadDBResponse>(&format!(
            "SELECT {LEAD_COLUMNS} FROM leads WHERE customer_request_id = $1 AND professional_id = $2"
        ))
        .bind(customer_request_id)
        .bind(professional_id)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(lead)
    }

    #[instrument(skip(self), err)]
    pub async fn count_for_request(&mut self, customer_request_id: CustomerRequestId) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM leads WHERE customer_request_id = $1")
            .bind(customer_request_id)
            .fetch_one(&mut *self.db)
            .await?;

        Ok(count)
    }

    /// Delete a lead and, when it was the last one for its request, put the
    /// request back to pending. Returns the deleted lead.
    ///
    /// The parent request row is locked first, so concurrent deletes of
    /// sibling leads see each other's result before checking for leftovers.
    #[instrument(skip(self), err)]
    pub async fn delete_and_release(&mut self, id: LeadId) -> Result<Option<LeadDBResponse>> {
        let mut tx = self.db.begin().await?;

        let parent = sqlx::query_scalar::<_, CustomerRequestId>(
            r#"
            SELECT r.id
            FROM customer_requests r
            JOIN leads l ON l.customer_request_id = r.id
            WHERE l.id = $1
            FOR UPDATE OF r
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        if parent.is_none() {
            return Ok(None);
        }

        let deleted = sqlx::query_as::<_, LeadDBResponse>(&format!("DELETE FROM leads WHERE id = $1 RETURNING {LEAD_COLUMNS}"))
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

        // Lost a race with another delete of this same lead
        let Some(lead) = deleted else {
            return Ok(None);
        };

        sqlx::query(
            r#"
            UPDATE customer_requests SET status = 'pending', updated_at = NOW()
            WHERE id = $1
              AND NOT EXISTS (SELECT 1 FROM leads WHERE customer_request_id = $1)
            "#,
        )
        .bind(lead.customer_request_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(lead))
    }

    /// Unlock a request for a professional.
    ///
    /// The first unlock inserts the lead and debits `cost` credits in the
    /// same transaction; any later unlock of the same pair (including a lead
    /// an admin assigned) charges nothing and only records the first view.
    /// An insufficient balance fails with a check violation on
    /// `NEGATIVE_BALANCE_CONSTRAINT` and leaves no lead behind.
    #[instrument(skip(self, description), err)]
    pub async fn unlock(
        &mut self,
        customer_request_id: CustomerRequestId,
        professional_id: UserId,
        cost: i64,
        description: String,
    ) -> Result<LeadUnlock> {
        let mut tx = self.db.begin().await?;

        let inserted = sqlx::query_as::<_, LeadDBResponse>(&format!(
            r#"
            INSERT INTO leads (customer_request_id, professional_id, credits_used, viewed_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT ON CONSTRAINT leads_request_professional_key DO NOTHING
            RETURNING {LEAD_COLUMNS}
            "#
        ))
        .bind(customer_request_id)
        .bind(professional_id)
        .bind(cost)
        .fetch_optional(&mut *tx)
        .await?;

        let unlock = match inserted {
            Some(lead) => {
                let entry = Credits::new(&mut tx)
                    .create_transaction(&CreditTransactionCreateDBRequest::usage(professional_id, cost, lead.id, description))
                    .await?;
                info!(lead_id = %lead.id, balance = entry.balance_after, "lead unlocked");
                LeadUnlock {
                    lead,
                    charged: cost,
                    balance: entry.balance_after,
                }
            }
            None => {
                let lead = sqlx::query_as::<_, LeadDBResponse>(&format!(
                    r#"
                    UPDATE leads SET viewed_at = COALESCE(viewed_at, NOW())
                    WHERE customer_request_id = $1 AND professional_id = $2
                    RETURNING {LEAD_COLUMNS}
                    "#
                ))
                .bind(customer_request_id)
                .bind(professional_id)
                .fetch_one(&mut *tx)
                .await?;
                let balance = Credits::new(&mut tx).get_user_balance(professional_id).await?;
                LeadUnlock {
                    lead,
                    charged: 0,
                    balance,
                }
            }
        };

        tx.commit().await?;

        Ok(unlock)
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Leads<'c> {
    type CreateRequest = LeadCreateDBRequest;
    type UpdateRequest = LeadUpdateDBRequest;
    type Response = LeadDBResponse;
    type Id = LeadId;
    type Filter = LeadFilter;

    /// Admin assignment; also marks the request as assigned
    #[instrument(skip(self), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let mut tx = self.db.begin().await?;

        let lead = sqlx::query_as::<_, LeadDBResponse>(&format!(
            r#"
            INSERT INTO leads (customer_request_id, professional_id)
            VALUES ($1, $2)
            RETURNING {LEAD_COLUMNS}
            "#
        ))
        .bind(request.customer_request_id)
        .bind(request.professional_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE customer_requests SET status = 'assigned', updated_at = NOW() WHERE id = $1")
            .bind(request.customer_request_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(lead)
    }

    #[instrument(skip(self), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let lead = sqlx::query_as::<_, LeadDBResponse>(&format!("SELECT {LEAD_COLUMNS} FROM leads WHERE id = $1"))
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(lead)
    }

    #[instrument(skip(self), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let leads = sqlx::query_as::<_, LeadDBResponse>(&format!(
            r#"
            SELECT {LEAD_COLUMNS}
            FROM leads
            WHERE ($1::uuid IS NULL OR professional_id = $1)
              AND ($2::text IS NULL OR status = $2)
            ORDER BY created_at DESC, id
            OFFSET $3
            LIMIT $4
            "#
        ))
        .bind(filter.professional_id)
        .bind(filter.status)
        .bind(filter.skip)
        .bind(filter.limit)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(leads)
    }

    #[instrument(skip(self, request), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let lead = sqlx::query_as::<_, LeadDBResponse>(&format!(
            r#"
            UPDATE leads SET
                status = COALESCE($2, status),
                notes = COALESCE($3, notes),
                quote_amount = COALESCE($4, quote_amount),
                is_won = COALESCE($5, is_won),
                contacted_at = CASE WHEN $2 = 'contacted' THEN NOW() ELSE contacted_at END,
                completed_at = CASE WHEN $2 = 'completed' THEN NOW() ELSE completed_at END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {LEAD_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(request.status)
        .bind(&request.notes)
        .bind(request.quote_amount)
        .bind(request.is_won)
        .fetch_optional(&mut *self.db)
        .await?;

        lead.ok_or(DbError::NotFound)
    }

    #[instrument(skip(self), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM leads WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
