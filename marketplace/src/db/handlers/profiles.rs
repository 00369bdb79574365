use crate::{
    api::models::profiles::ServiceCategory,
    db::{
        errors::{DbError, Result},
        handlers::repository::Repository,
        models::profiles::{ProfileCreateDBRequest, ProfileDBResponse, ProfileUpdateDBRequest},
    },
    types::{ProfileId, UserId},
};
use sqlx::PgConnection;
use tracing::instrument;

const PROFILE_COLUMNS: &str = "p.id, p.user_id, p.business_name, p.service_categories, p.description, p.service_areas, \
     p.years_experience, p.license_number, p.insurance_verified, p.website, p.business_phone, p.address, p.city, \
     p.province, p.postal_code, p.hourly_rate_min, p.hourly_rate_max, p.portfolio_images, p.certifications, \
     p.rating, p.review_count, p.is_featured, p.is_verified, p.created_at, p.updated_at";

/// Filter for listing profiles. Public search sets `active_only` so that
/// profiles of deactivated accounts stay hidden.
#[derive(Debug, Clone, Default)]
pub struct ProfileFilter {
    pub service_category: Option<ServiceCategory>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub is_verified: Option<bool>,
    pub active_only: bool,
    pub skip: i64,
    pub limit: i64,
}

impl ProfileFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            skip,
            limit,
            ..Default::default()
        }
    }
}

pub struct Profiles<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Profiles<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self), err)]
    pub async fn get_by_user_id(&mut self, user_id: UserId) -> Result<Option<ProfileDBResponse>> {
        let profile = sqlx::query_as::<_, ProfileDBResponse>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM business_profiles p WHERE p.user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(profile)
    }

    /// Recompute the average rating (2 decimals) and review count from the
    /// reviews table. A professional without a profile is a no-op.
    #[instrument(skip(self), err)]
    pub async fn refresh_rating(&mut self, professional_user_id: UserId) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE business_profiles SET
                rating = COALESCE(
                    (SELECT ROUND(AVG(rating)::numeric, 2) FROM reviews WHERE professional_id = $1),
                    0
                ),
                review_count = (SELECT COUNT(*) FROM reviews WHERE professional_id = $1),
                updated_at = NOW()
            WHERE user_id = $1
            "#,
        )
        .bind(professional_user_id)
        .execute(&mut *self.db)
        .await?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Profiles<'c> {
    type CreateRequest = ProfileCreateDBRequest;
    type UpdateRequest = ProfileUpdateDBRequest;
    type Response = ProfileDBResponse;
    type Id = ProfileId;
    type Filter = ProfileFilter;

    #[instrument(skip(self, request), fields(user_id = %request.user_id), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let profile = sqlx::query_as::<_, ProfileDBResponse>(&format!(
            r#"
            INSERT INTO business_profiles AS p (
                user_id, business_name, service_categories, description, service_areas, years_experience,
                license_number, website, business_phone, address, city, province, postal_code,
                hourly_rate_min, hourly_rate_max, portfolio_images, certifications
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            RETURNING {PROFILE_COLUMNS}
            "#
        ))
        .bind(request.user_id)
        .bind(&request.business_name)
        .bind(&request.service_categories)
        .bind(&request.description)
        .bind(&request.service_areas)
        .bind(request.years_experience)
        .bind(&request.license_number)
        .bind(&request.website)
        .bind(&request.business_phone)
        .bind(&request.address)
        .bind(&request.city)
        .bind(&request.province)
        .bind(&request.postal_code)
        .bind(request.hourly_rate_min)
        .bind(request.hourly_rate_max)
        .bind(&request.portfolio_images)
        .bind(&request.certifications)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(profile)
    }

    #[instrument(skip(self), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let profile = sqlx::query_as::<_, ProfileDBResponse>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM business_profiles p WHERE p.id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(profile)
    }

    /// Featured profiles first, then by rating
    #[instrument(skip(self), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let profiles = sqlx::query_as::<_, ProfileDBResponse>(&format!(
            r#"
            SELECT {PROFILE_COLUMNS}
            FROM business_profiles p
            JOIN users u ON u.id = p.user_id
            WHERE ($1::text IS NULL OR $1 = ANY(p.service_categories))
              AND ($2::text IS NULL OR p.city ILIKE '%' || $2 || '%')
              AND ($3::text IS NULL OR p.province ILIKE '%' || $3 || '%')
              AND ($4::boolean IS NULL OR p.is_verified = $4)
              AND (NOT $5 OR u.is_active)
            ORDER BY p.is_featured DESC, p.rating DESC, p.created_at DESC
            OFFSET $6
            LIMIT $7
            "#
        ))
        .bind(filter.service_category)
        .bind(&filter.city)
        .bind(&filter.province)
        .bind(filter.is_verified)
        .bind(filter.active_only)
        .bind(filter.skip)
        .bind(filter.limit)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(profiles)
    }

    #[instrument(skip(self, request), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let profile = sqlx::query_as::<_, ProfileDBResponse>(&format!(
            r#"
            UPDATE business_profiles AS p SET
                business_name = COALESCE($2, p.business_name),
                service_categories = COALESCE($3, p.service_categories),
                description = COALESCE($4, p.description),
                service_areas = COALESCE($5, p.service_areas),
                years_experience = COALESCE($6, p.years_experience),
                license_number = COALESCE($7, p.license_number),
                website = COALESCE($8, p.website),
                business_phone = COALESCE($9, p.business_phone),
                address = COALESCE($10, p.address),
                city = COALESCE($11, p.city),
                province = COALESCE($12, p.province),
                postal_code = COALESCE($13, p.postal_code),
                hourly_rate_min = COALESCE($14, p.hourly_rate_min),
                hourly_rate_max = COALESCE($15, p.hourly_rate_max),
                portfolio_images = COALESCE($16, p.portfolio_images),
                certifications = COALESCE($17, p.certifications),
                is_verified = COALESCE($18, p.is_verified),
                is_featured = COALESCE($19, p.is_featured),
                updated_at = NOW()
            WHERE p.id = $1
            RETURNING {PROFILE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&request.business_name)
        .bind(&request.service_categories)
        .bind(&request.description)
        .bind(&request.service_areas)
        .bind(request.years_experience)
        .bind(&request.license_number)
        .bind(&request.website)
        .bind(&request.business_phone)
        .bind(&request.address)
        .bind(&request.city)
        .bind(&request.province)
        .bind(&request.postal_code)
        .bind(request.hourly_rate_min)
        .bind(request.hourly_rate_max)
        .bind(&request.portfolio_images)
        .bind(&request.certifications)
        .bind(request.is_verified)
        .bind(request.is_featured)
        .fetch_optional(&mut *self.db)
        .await?;

        profile.ok_or(DbError::NotFound)
    }

    #[instrument(skip(self), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM business_profiles WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
