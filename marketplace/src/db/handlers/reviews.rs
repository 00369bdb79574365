use crate::{
    db::{
        errors::Result,
        handlers::profiles::Profiles,
        models::reviews::{AuthoredReviewDBResponse, ReviewCreateDBRequest, ReviewDBResponse},
    },
    types::{ReviewId, UserId},
};
use sqlx::{Connection, PgConnection};
use tracing::instrument;

const REVIEW_COLUMNS: &str = "r.id, r.customer_id, r.professional_id, r.rating, r.title, r.comment, r.customer_name, \
     r.created_at, r.updated_at";

pub struct Reviews<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Reviews<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Insert the review and refresh the professional's rating together
    #[instrument(skip(self, request), fields(professional_id = %request.professional_id), err)]
    pub async fn create(&mut self, request: &ReviewCreateDBRequest) -> Result<ReviewDBResponse> {
        let mut tx = self.db.begin().await?;

        let review = sqlx::query_as::<_, ReviewDBResponse>(&format!(
            r#"
            INSERT INTO reviews AS r (customer_id, professional_id, rating, title, comment, customer_name)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {REVIEW_COLUMNS}
            "#
        ))
        .bind(request.customer_id)
        .bind(request.professional_id)
        .bind(request.rating)
        .bind(&request.title)
        .bind(&request.comment)
        .bind(&request.customer_name)
        .fetch_one(&mut *tx)
        .await?;

        Profiles::new(&mut tx).refresh_rating(request.professional_id).await?;

        tx.commit().await?;

        Ok(review)
    }

    #[instrument(skip(self), err)]
    pub async fn get_by_id(&mut self, id: ReviewId) -> Result<Option<ReviewDBResponse>> {
        let review = sqlx::query_as::<_, ReviewDBResponse>(&format!("SELECT {REVIEW_COLUMNS} FROM reviews r WHERE r.id = $1"))
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(review)
    }

    /// Delete the review and refresh the professional's rating together
    #[instrument(skip(self), err)]
    pub async fn delete(&mut self, id: ReviewId) -> Result<Option<ReviewDBResponse>> {
        let mut tx = self.db.begin().await?;

        let deleted = sqlx::query_as::<_, ReviewDBResponse>(&format!(
            "DELETE FROM reviews AS r WHERE r.id = $1 RETURNING {REVIEW_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(review) = &deleted {
            Profiles::new(&mut tx).refresh_rating(review.professional_id).await?;
        }

        tx.commit().await?;

        Ok(deleted)
    }

    /// Newest first
    #[instrument(skip(self), err)]
    pub async fn list_for_professional(&mut self, professional_id: UserId, limit: i64) -> Result<Vec<ReviewDBResponse>> {
        let reviews = sqlx::query_as::<_, ReviewDBResponse>(&format!(
            r#"
            SELECT {REVIEW_COLUMNS}
            FROM reviews r
            WHERE r.professional_id = $1
            ORDER BY r.created_at DESC, r.id
            LIMIT $2
            "#
        ))
        .bind(professional_id)
        .bind(limit)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(reviews)
    }

    /// Newest first, with the business name of each reviewed professional
    #[instrument(skip(self), err)]
    pub async fn list_by_customer(&mut self, customer_id: UserId, limit: i64) -> Result<Vec<AuthoredReviewDBResponse>> {
        let reviews = sqlx::query_as::<_, AuthoredReviewDBResponse>(&format!(
            r#"
            SELECT {REVIEW_COLUMNS}, p.business_name AS professional_name
            FROM reviews r
            LEFT JOIN business_profiles p ON p.user_id = r.professional_id
            WHERE r.customer_id = $1
            ORDER BY r.created_at DESC, r.id
            LIMIT $2
            "#
        ))
        .bind(customer_id)
        .bind(limit)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(reviews)
    }
}
