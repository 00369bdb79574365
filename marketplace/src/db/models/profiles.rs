use crate::{
    api::models::profiles::{ProfileCreate, ProfileUpdate, ServiceCategory},
    types::{ProfileId, UserId},
};
use bon::Builder;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;

#[derive(Debug, Clone, Builder)]
pub struct ProfileCreateDBRequest {
    pub user_id: UserId,
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
    pub hourly_rate_min: Option<Decimal>,
    pub hourly_rate_max: Option<Decimal>,
    #[builder(default)]
    pub portfolio_images: Vec<String>,
    #[builder(default)]
    pub certifications: Vec<String>,
}

impl ProfileCreateDBRequest {
    pub fn new(user_id: UserId, create: ProfileCreate) -> Self {
        Self::builder()
            .user_id(user_id)
            .business_name(create.business_name)
            .service_categories(create.service_categories)
            .description(create.description)
            .service_areas(create.service_areas)
            .years_experience(create.years_experience)
            .maybe_license_number(create.license_number)
            .maybe_website(create.website)
            .maybe_business_phone(create.business_phone)
            .maybe_address(create.address)
            .city(create.city)
            .province(create.province)
            .postal_code(create.postal_code)
            .maybe_hourly_rate_min(create.hourly_rate_min)
            .maybe_hourly_rate_max(create.hourly_rate_max)
            .portfolio_images(create.portfolio_images)
            .certifications(create.certifications)
            .build()
    }
}

/// `None` leaves a column untouched
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdateDBRequest {
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
    pub hourly_rate_min: Option<Decimal>,
    pub hourly_rate_max: Option<Decimal>,
    pub portfolio_images: Option<Vec<String>>,
    pub certifications: Option<Vec<String>>,
    pub is_verified: Option<bool>,
    pub is_featured: Option<bool>,
}

/// Owner-facing updates never touch the verification flags
impl From<ProfileUpdate> for ProfileUpdateDBRequest {
    fn from(update: ProfileUpdate) -> Self {
        Self {
            business_name: update.business_name,
            service_categories: update.service_categories,
            description: update.description,
            service_areas: update.service_areas,
            years_experience: update.years_experience,
            license_number: update.license_number,
            website: update.website,
            business_phone: update.business_phone,
            address: update.address,
            city: update.city,
            province: update.province,
            postal_code: update.postal_code,
            hourly_rate_min: update.hourly_rate_min,
            hourly_rate_max: update.hourly_rate_max,
            portfolio_images: update.portfolio_images,
            certifications: update.certifications,
            is_verified: None,
            is_featured: None,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ProfileDBResponse {
    pub id: ProfileId,
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
    pub address: Option<String>,
    pub city: String,
    pub province: String,
    pub postal_code: String,
    pub hourly_rate_min: Option<Decimal>,
    pub hourly_rate_max: Option<Decimal>,
    pub portfolio_images: Vec<String>,
    pub certifications: Vec<String>,
    pub rating: Decimal,
    pub review_count: i32,
    pub is_featured: bool,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
