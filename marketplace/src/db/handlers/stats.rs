use crate::db::errors::Result;
use sqlx::{FromRow, PgConnection};
use tracing::instrument;

/// Raw platform counters for the admin dashboard
#[derive(Debug, Clone, Default, FromRow)]
pub struct PlatformCounts {
    pub total_users: i64,
    pub total_professionals: i64,
    pub total_customers: i64,
    pub total_profiles: i64,
    pub verified_profiles: i64,
    pub total_requests: i64,
    pub pending_requests: i64,
    pub total_leads: i64,
    pub active_leads: i64,
}

pub struct Stats<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Stats<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self), err)]
    pub async fn counts(&mut self) -> Result<PlatformCounts> {
        let counts = sqlx::query_as::<_, PlatformCounts>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM users) AS total_users,
                (SELECT COUNT(*) FROM users WHERE user_type = 'professional') AS total_professionals,
                (SELECT COUNT(*) FROM users WHERE user_type = 'customer') AS total_customers,
                (SELECT COUNT(*) FROM business_profiles) AS total_profiles,
                (SELECT COUNT(*) FROM business_profiles WHERE is_verified) AS verified_profiles,
                (SELECT COUNT(*) FROM customer_requests) AS total_requests,
                (SELECT COUNT(*) FROM customer_requests WHERE status = 'pending') AS pending_requests,
                (SELECT COUNT(*) FROM leads) AS total_leads,
                (SELECT COUNT(*) FROM leads WHERE status IN ('assigned', 'contacted', 'in_progress')) AS active_leads
            "#,
        )
        .fetch_one(&mut *self.db)
        .await?;

        Ok(counts)
    }
}
