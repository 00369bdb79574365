use crate::{
    api::models::{
        profiles::ServiceCategory,
        requests::{LeadStatus, RequestResponse, Urgency},
    },
    db::models::{leads::LeadDBResponse, requests::RequestDBResponse},
    types::{CustomerRequestId, LeadId, UserId},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Credits charged for unlocking one request
pub const CREDITS_PER_LEAD: i64 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LeadResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: LeadId,
    #[schema(value_type = String, format = "uuid")]
    pub customer_request_id: CustomerRequestId,
    #[schema(value_type = String, format = "uuid")]
    pub professional_id: UserId,
    pub status: LeadStatus,
    pub assigned_at: DateTime<Utc>,
    pub contacted_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub notes: String,
    #[schema(value_type = Option<f64>)]
    pub quote_amount: Option<Decimal>,
    pub is_won: Option<bool>,
    pub credits_used: i64,
    pub viewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<LeadDBResponse> for LeadResponse {
    fn from(db: LeadDBResponse) -> Self {
        Self {
            id: db.id,
            customer_request_id: db.customer_request_id,
            professional_id: db.professional_id,
            status: db.status,
            assigned_at: db.assigned_at,
            contacted_at: db.contacted_at,
            completed_at: db.completed_at,
            notes: db.notes,
            quote_amount: db.quote_amount,
            is_won: db.is_won,
            credits_used: db.credits_used,
            viewed_at: db.viewed_at,
            created_at: db.created_at,
        }
    }
}

/// Professional's progress update on one of their leads
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct LeadStatusUpdate {
    pub status: Option<LeadStatus>,
    pub notes: Option<String>,
    #[schema(value_type = Option<f64>)]
    pub quote_amount: Option<Decimal>,
    pub is_won: Option<bool>,
}

/// Admin assignment of a request to a professional
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LeadAssign {
    #[schema(value_type = String, format = "uuid")]
    pub customer_request_id: CustomerRequestId,
    #[schema(value_type = String, format = "uuid")]
    pub professional_id: UserId,
}

/// A request as shown before it is unlocked: no contact details
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LeadPreview {
    #[schema(value_type = String, format = "uuid")]
    pub id: CustomerRequestId,
    pub title: String,
    pub description: String,
    pub service_category: ServiceCategory,
    pub city: String,
    pub province: String,
    pub budget_range: Option<String>,
    pub timeline: String,
    pub urgency: Urgency,
    pub credits_required: i64,
    pub created_at: DateTime<Utc>,
}

fn budget_range(min: Option<Decimal>, max: Option<Decimal>) -> Option<String> {
    match (min, max) {
        (Some(min), Some(max)) => Some(format!("${} - ${}", min.normalize(), max.normalize())),
        (Some(min), None) => Some(format!("From ${}", min.normalize())),
        (None, Some(max)) => Some(format!("Up to ${}", max.normalize())),
        (None, None) => None,
    }
}

impl From<RequestDBResponse> for LeadPreview {
    fn from(db: RequestDBResponse) -> Self {
        Self {
            id: db.id,
            budget_range: budget_range(db.budget_min, db.budget_max),
            title: db.title,
            description: db.description,
            service_category: db.service_category,
            city: db.city,
            province: db.province,
            timeline: db.timeline,
            urgency: db.urgency,
            credits_required: CREDITS_PER_LEAD,
            created_at: db.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ContactDetails {
    pub name: Option<String>,
    pub email: String,
    pub phone: Option<String>,
}

/// Result of unlocking a request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LeadViewResponse {
    #[schema(value_type = String, format = "uuid")]
    pub lead_id: LeadId,
    /// Credits charged by this call: the lead price on first view, 0 afterwards
    pub credits_used: i64,
    pub balance: i64,
    pub request: RequestResponse,
    pub contact: ContactDetails,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct PreviewQuery {
    #[param(default = 5, minimum = 1, maximum = 50)]
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct MyLeadsQuery {
    pub status_filter: Option<LeadStatus>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct AdminLeadsQuery {
    pub status: Option<LeadStatus>,
    #[param(value_type = Option<String>, format = "uuid")]
    pub professional_id: Option<UserId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_range_formats() {
        assert_eq!(
            budget_range(Some(Decimal::new(50000, 2)), Some(Decimal::new(150000, 2))).as_deref(),
            Some("$500 - $1500")
        );
        assert_eq!(budget_range(Some(Decimal::new(250, 0)), None).as_deref(), Some("From $250"));
        assert_eq!(budget_range(None, Some(Decimal::new(9999, 2))).as_deref(), Some("Up to $99.99"));
        assert_eq!(budget_range(None, None), None);
    }
}
