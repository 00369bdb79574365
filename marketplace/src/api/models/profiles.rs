use crate::{
    db::models::profiles::ProfileDBResponse,
    types::{ProfileId, UserId},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Trades and services offered on the marketplace, stored as TEXT
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash, ToSchema)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ServiceCategory {
    Contractor,
    RealEstate,
    MortgageBroker,
    Plumber,
    Electrician,
    Hvac,
    Roofing,
    Landscaping,
    Cleaning,
    Handyman,
    Painter,
    Flooring,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProfileCreate {
    pub business_name: String,
    pub service_categories: Vec<ServiceCategory>,
    pub description: String,
    pub service_areas: Vec<String>,
    pub years_experience: i32,
    pub license_number: Option<String>,
    pub website: Option<String>,
    pub business_phone: Option<String>,
    pub address: Option<String>,
    pub city: String,
    pub province: String,
    pub postal_code: String,
    #[schema(value_type = Option<f64>)]
    pub hourly_rate_min: Option<Decimal>,
    #[schema(value_type = Option<f64>)]
    pub hourly_rate_max: Option<Decimal>,
    #[serde(default)]
    pub portfolio_images: Vec<String>,
    #[serde(default)]
    pub certifications: Vec<String>,
}

/// Partial update of the caller's own profile. Rating, review count and the
/// verification/featured flags are managed elsewhere and cannot be set here.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ProfileUpdate {
    pub business_name: Option<String>,
    pub service_categories: Option<Vec<ServiceCategory>>,
    pub description: Option<String>,
    pub service_areas: Option<Vec<String>>,
    pub years_experience: Option<i32>,
    pub license_number: Option<String>,
    pub website: Option<String>,
    pub business_phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub postal_code: Option<String>,
    #[schema(value_type = Option<f64>)]
    pub hourly_rate_min: Option<Decimal>,
    #[schema(value_type = Option<f64>)]
    pub hourly_rate_max: Option<Decimal>,
    pub portfolio_images: Option<Vec<String>>,
    pub certifications: Option<Vec<String>>,
}

/// Admin verification toggle
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProfileVerification {
    #[serde(default = "default_true")]
    pub is_verified: bool,
    #[serde(default)]
    pub is_featured: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProfileResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: ProfileId,
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
    pub business_name: String,
    pub service_categories: Vec<ServiceCategory>,
    pub description: String,
    pub service_areas: Vec<String>,
    pub years_experience: i32,
    pub license_number: Option<String>,
    pub insurance_verified: bool,
    pub website: Option<String>,
    pub business_phone: Option<String>,
    pub city: String,
    pub province: String,
    #[schema(value_type = Option<f64>)]
    pub hourly_rate_min: Option<Decimal>,
    #[schema(value_type = Option<f64>)]
    pub hourly_rate_max: Option<Decimal>,
    pub portfolio_images: Vec<String>,
    pub certifications: Vec<String>,
    #[schema(value_type = f64)]
    pub rating: Decimal,
    pub review_count: i32,
    pub is_featured: bool,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}

impl From<ProfileDBResponse> for ProfileResponse {
    fn from(db: ProfileDBResponse) -> Self {
        Self {
            id: db.id,
            user_id: db.user_id,
            business_name: db.business_name,
            service_categories: db.service_categories,
            description: db.description,
            service_areas: db.service_areas,
            years_experience: db.years_experience,
            license_number: db.license_number,
            insurance_verified: db.insurance_verified,
            website: db.website,
            business_phone: db.business_phone,
            city: db.city,
            province: db.province,
            hourly_rate_min: db.hourly_rate_min,
            hourly_rate_max: db.hourly_rate_max,
            portfolio_images: db.portfolio_images,
            certifications: db.certifications,
            rating: db.rating,
            review_count: db.review_count,
            is_featured: db.is_featured,
            is_verified: db.is_verified,
            created_at: db.created_at,
        }
    }
}

/// Public search over professional profiles
#[derive(Debug, Deserialize, IntoParams)]
pub struct SearchProfessionalsQuery {
    pub service_category: Option<ServiceCategory>,
    /// Case-insensitive substring match
    pub city: Option<String>,
    /// Case-insensitive substring match
    pub province: Option<String>,
    pub is_verified: Option<bool>,
    /// Number of items to skip
    #[param(default = 0, minimum = 0)]
    pub skip: Option<i64>,
    /// Maximum number of items to return
    #[param(default = 20, minimum = 1, maximum = 100)]
    pub limit: Option<i64>,
}

/// Admin listing of profiles
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListProfilesQuery {
    pub service_category: Option<ServiceCategory>,
    pub is_verified: Option<bool>,
}
