use crate::{
    api::models::profiles::ServiceCategory,
    db::models::requests::RequestDBResponse,
    errors::Error,
    types::{CustomerRequestId, UserId},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Lifecycle shared by customer requests and leads
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    Pending,
    Assigned,
    Contacted,
    InProgress,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Low,
    Medium,
    High,
    Urgent,
}

/// Who posted a request: a registered customer, or a visitor using the
/// landing page form who left an email and phone number instead.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Submitter {
    Customer {
        #[schema(value_type = String, format = "uuid")]
        customer_id: UserId,
    },
    Anonymous {
        email: String,
        phone: String,
    },
}

impl Submitter {
    pub fn customer_id(&self) -> Option<UserId> {
        match self {
            Submitter::Customer { customer_id } => Some(*customer_id),
            Submitter::Anonymous { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RequestCreate {
    pub service_category: ServiceCategory,
    pub title: String,
    pub description: String,
    pub location: String,
    pub city: String,
    pub province: String,
    #[schema(value_type = Option<f64>)]
    pub budget_min: Option<Decimal>,
    #[schema(value_type = Option<f64>)]
    pub budget_max: Option<Decimal>,
    pub timeline: String,
    pub urgency: Urgency,
    pub contact_preference: String,
    pub property_type: Option<String>,
    pub square_footage: Option<i32>,
    #[serde(default = "empty_object")]
    #[schema(value_type = Object)]
    pub additional_details: serde_json::Value,
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(Default::default())
}

/// Landing page form. Every field is optional at the wire level so that a
/// missing one is reported by name.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct QuickRequestCreate {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub service_category: Option<ServiceCategory>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub location: Option<String>,
    #[schema(value_type = Option<f64>)]
    pub budget_min: Option<Decimal>,
    #[schema(value_type = Option<f64>)]
    pub budget_max: Option<Decimal>,
    pub timeline: Option<String>,
    pub urgency: Option<Urgency>,
    pub contact_preference: Option<String>,
}

fn required<T>(value: Option<T>, field: &str) -> Result<T, Error> {
    value.ok_or_else(|| Error::BadRequest {
        message: format!("Missing required field: {field}"),
    })
}

impl QuickRequestCreate {
    /// Fill in the landing page defaults and split off the anonymous submitter
    pub fn into_request(self) -> Result<(Submitter, RequestCreate), Error> {
        let email = required(self.email, "email")?;
        let phone = required(self.phone, "phone")?;
        let service_category = required(self.service_category, "service_category")?;
        let title = required(self.title, "title")?;
        let description = required(self.description, "description")?;
        let city = required(self.city, "city")?;
        let province = required(self.province, "province")?;

        let request = RequestCreate {
            service_category,
            title,
            description,
            location: self.location.unwrap_or_else(|| format!("{city}, {province}")),
            city,
            province,
            budget_min: self.budget_min,
            budget_max: self.budget_max,
            timeline: self.timeline.unwrap_or_else(|| "ASAP".to_string()),
            urgency: self.urgency.unwrap_or(Urgency::Medium),
            contact_preference: self.contact_preference.unwrap_or_else(|| "either".to_string()),
            property_type: None,
            square_footage: None,
            additional_details: empty_object(),
        };

        Ok((Submitter::Anonymous { email, phone }, request))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct RequestUpdate {
    pub service_category: Option<ServiceCategory>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    #[schema(value_type = Option<f64>)]
    pub budget_min: Option<Decimal>,
    #[schema(value_type = Option<f64>)]
    pub budget_max: Option<Decimal>,
    pub timeline: Option<String>,
    pub urgency: Option<Urgency>,
    pub contact_preference: Option<String>,
    pub property_type: Option<String>,
    pub square_footage: Option<i32>,
    #[schema(value_type = Option<Object>)]
    pub additional_details: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RequestResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: CustomerRequestId,
    pub submitter: Submitter,
    pub service_category: ServiceCategory,
    pub title: String,
    pub description: String,
    pub location: String,
    pub city: String,
    pub province: String,
    #[schema(value_type = Option<f64>)]
    pub budget_min: Option<Decimal>,
    #[schema(value_type = Option<f64>)]
    pub budget_max: Option<Decimal>,
    pub timeline: String,
    pub urgency: Urgency,
    pub contact_preference: String,
    pub property_type: Option<String>,
    pub square_footage: Option<i32>,
    #[schema(value_type = Object)]
    pub additional_details: serde_json::Value,
    pub status: LeadStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<RequestDBResponse> for RequestResponse {
    fn from(db: RequestDBResponse) -> Self {
        Self {
            id: db.id,
            submitter: db.submitter(),
            service_category: db.service_category,
            title: db.title,
            description: db.description,
            location: db.location,
            city: db.city,
            province: db.province,
            budget_min: db.budget_min,
            budget_max: db.budget_max,
            timeline: db.timeline,
            urgency: db.urgency,
            contact_preference: db.contact_preference,
            property_type: db.property_type,
            square_footage: db.square_footage,
            additional_details: db.additional_details,
            status: db.status,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

/// Customer listing of their own requests
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListRequestsQuery {
    pub status_filter: Option<LeadStatus>,
}

/// Admin listing of every request
#[derive(Debug, Deserialize, IntoParams)]
pub struct AdminRequestsQuery {
    pub status: Option<LeadStatus>,
    pub service_category: Option<ServiceCategory>,
    pub urgency: Option<Urgency>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quick_request_defaults() {
        let quick = QuickRequestCreate {
            email: Some("guest@example.com".to_string()),
            phone: Some("555-0100".to_string()),
            service_category: Some(ServiceCategory::Plumber),
            title: Some("Leaky tap".to_string()),
            description: Some("Kitchen tap drips".to_string()),
            city: Some("Toronto".to_string()),
            province: Some("Ontario".to_string()),
            ..Default::default()
        };

        let (submitter, request) = quick.into_request().unwrap();
        assert_eq!(
            submitter,
            Submitter::Anonymous {
                email: "guest@example.com".to_string(),
                phone: "555-0100".to_string(),
            }
        );
        assert_eq!(request.location, "Toronto, Ontario");
        assert_eq!(request.timeline, "ASAP");
        assert_eq!(request.urgency, Urgency::Medium);
        assert_eq!(request.contact_preference, "either");
    }

    #[test]
    fn test_quick_request_reports_missing_field() {
        let quick = QuickRequestCreate {
            email: Some("guest@example.com".to_string()),
            ..Default::default()
        };

        match quick.into_request() {
            Err(Error::BadRequest { message }) => assert_eq!(message, "Missing required field: phone"),
            other => panic!("Expected BadRequest, got {other:?}"),
        }
    }

    #[test]
    fn test_submitter_serializes_with_type_tag() {
        let json = serde_json::to_value(Submitter::Anonymous {
            email: "a@b.co".to_string(),
            phone: "1".to_string(),
        })
        .unwrap();
        assert_eq!(json["type"], "anonymous");
        assert_eq!(json["email"], "a@b.co");
    }
}
