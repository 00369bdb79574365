use crate::{
    api::models::{
        profiles::ServiceCategory,
        requests::{LeadStatus, RequestCreate, RequestUpdate, Submitter, Urgency},
    },
    types::{CustomerRequestId, UserId},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;

#[derive(Debug, Clone)]
pub struct RequestCreateDBRequest {
    pub submitter: Submitter,
    pub service_category: ServiceCategory,
    pub title: String,
    pub description: String,
    pub location: String,
    pub city: String,
    pub province: String,
    pub budget_min: Option<Decimal>,
    pub budget_max: Option<Decimal>,
    pub timeline: String,
    pub urgency: Urgency,
    pub contact_preference: String,
    pub property_type: Option<String>,
    pub square_footage: Option<i32>,
    pub additional_details: serde_json::Value,
}

impl RequestCreateDBRequest {
    pub fn new(submitter: Submitter, request: RequestCreate) -> Self {
        Self {
            submitter,
            service_category: request.service_category,
            title: request.title,
            description: request.description,
            location: request.location,
            city: request.city,
            province: request.province,
            budget_min: request.budget_min,
            budget_max: request.budget_max,
            timeline: request.timeline,
            urgency: request.urgency,
            contact_preference: request.contact_preference,
            property_type: request.property_type,
            square_footage: request.square_footage,
            additional_details: request.additional_details,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RequestUpdateDBRequest {
    pub service_category: Option<ServiceCategory>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub budget_min: Option<Decimal>,
    pub budget_max: Option<Decimal>,
    pub timeline: Option<String>,
    pub urgency: Option<Urgency>,
    pub contact_preference: Option<String>,
    pub property_type: Option<String>,
    pub square_footage: Option<i32>,
    pub additional_details: Option<serde_json::Value>,
    pub status: Option<LeadStatus>,
}

impl From<RequestUpdate> for RequestUpdateDBRequest {
    fn from(update: RequestUpdate) -> Self {
        Self {
            service_category: update.service_category,
            title: update.title,
            description: update.description,
            location: update.location,
            city: update.city,
            province: update.province,
            budget_min: update.budget_min,
            budget_max: update.budget_max,
            timeline: update.timeline,
            urgency: update.urgency,
            contact_preference: update.contact_preference,
            property_type: update.property_type,
            square_footage: update.square_footage,
            additional_details: update.additional_details,
            status: None,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct RequestDBResponse {
    pub id: CustomerRequestId,
    pub customer_id: Option<UserId>,
    pub guest_email: Option<String>,
    pub guest_phone: Option<String>,
    pub service_category: ServiceCategory,
    pub title: String,
    pub description: String,
    pub location: String,
    pub city: String,
    pub province: String,
    pub budget_min: Option<Decimal>,
    pub budget_max: Option<Decimal>,
    pub timeline: String,
    pub urgency: Urgency,
    pub contact_preference: String,
    pub property_type: Option<String>,
    pub square_footage: Option<i32>,
    pub additional_details: serde_json::Value,
    pub status: LeadStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RequestDBResponse {
    /// The submitter columns are kept mutually exclusive by a table CHECK
    pub fn submitter(&self) -> Submitter {
        match self.customer_id {
            Some(customer_id) => Submitter::Customer { customer_id },
            None => Submitter::Anonymous {
                email: self.guest_email.clone().unwrap_or_default(),
                phone: self.guest_phone.clone().unwrap_or_default(),
            },
        }
    }
}
