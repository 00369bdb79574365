use crate::{
    api::models::{
        profiles::ServiceCategory,
        requests::{LeadStatus, Submitter, Urgency},
    },
    db::{
        errors::{DbError, Result},
        handlers::repository::Repository,
        models::requests::{RequestCreateDBRequest, RequestDBResponse, RequestUpdateDBRequest},
    },
    types::{CustomerRequestId, UserId},
};
use sqlx::PgConnection;
use tracing::instrument;

const REQUEST_COLUMNS: &str = "id, customer_id, guest_email, guest_phone, service_category, title, description, \
     location, city, province, budget_min, budget_max, timeline, urgency, contact_preference, property_type, \
     square_footage, additional_details, status, created_at, updated_at";

/// Filter for listing requests, newest first
#[derive(Debug, Clone, Default)]
pub struct RequestFilter {
    pub customer_id: Option<UserId>,
    pub status: Option<LeadStatus>,
    pub service_category: Option<ServiceCategory>,
    pub urgency: Option<Urgency>,
    pub skip: i64,
    pub limit: i64,
}

impl RequestFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self {
            skip,
            limit,
            ..Default::default()
        }
    }

    pub fn for_customer(mut self, customer_id: UserId) -> Self {
        self.customer_id = Some(customer_id);
        self
    }
}

pub struct Requests<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Requests<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Apply an update only while the request is still pending. Returns
    /// `None` when the request is missing or has moved on.
    #[instrument(skip(self, request), err)]
    pub async fn update_pending(
        &mut self,
        id: CustomerRequestId,
        request: &RequestUpdateDBRequest,
    ) -> Result<Option<RequestDBResponse>> {
        let updated = sqlx::query_as::<_, RequestDBResponse>(&format!(
            r#"
            UPDATE customer_requests SET
                service_category = COALESCE($2, service_category),
                title = COALESCE($3, title),
                description = COALESCE($4, description),
                location = COALESCE($5, location),
                city = COALESCE($6, city),
                province = COALESCE($7, province),
                budget_min = COALESCE($8, budget_min),
                budget_max = COALESCE($9, budget_max),
                timeline = COALESCE($10, timeline),
                urgency = COALESCE($11, urgency),
                contact_preference = COALESCE($12, contact_preference),
                property_type = COALESCE($13, property_type),
                square_footage = COALESCE($14, square_footage),
                additional_details = COALESCE($15, additional_details),
                updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            RETURNING {REQUEST_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(request.service_category)
        .bind(&request.title)
        .bind(&request.description)
        .bind(&request.location)
        .bind(&request.city)
        .bind(&request.province)
        .bind(request.budget_min)
        .bind(request.budget_max)
        .bind(&request.timeline)
        .bind(request.urgency)
        .bind(&request.contact_preference)
        .bind(&request.property_type)
        .bind(request.square_footage)
        .bind(&request.additional_details)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(updated)
    }

    /// Delete only while pending. Returns whether a row was removed.
    #[instrument(skip(self), err)]
    pub async fn delete_pending(&mut self, id: CustomerRequestId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM customer_requests WHERE id = $1 AND status = 'pending'")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), err)]
    pub async fn set_status(&mut self, id: CustomerRequestId, status: LeadStatus) -> Result<()> {
        let result = sqlx::query("UPDATE customer_requests SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(&mut *self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    /// Pending requests the professional has not unlocked yet, newest first.
    /// An empty category list matches every category.
    #[instrument(skip(self), err)]
    pub async fn list_previewable(
        &mut self,
        professional_id: UserId,
        categories: &[ServiceCategory],
        limit: i64,
    ) -> Result<Vec<RequestDBResponse>> {
        let requests = sqlx::query_as::<_, RequestDBResponse>(&format!(
            r#"
            SELECT {REQUEST_COLUMNS}
            FROM customer_requests r
            WHERE r.status = 'pending'
              AND (cardinality($2::text[]) = 0 OR r.service_category = ANY($2))
              AND NOT EXISTS (
                  SELECT 1 FROM leads l
                  WHERE l.customer_request_id = r.id AND l.professional_id = $1
              )
            ORDER BY r.created_at DESC, r.id
            LIMIT $3
            "#
        ))
        .bind(professional_id)
        .bind(categories)
        .bind(limit)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(requests)
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Requests<'c> {
    type CreateRequest = RequestCreateDBRequest;
    type UpdateRequest = RequestUpdateDBRequest;
    type Response = RequestDBResponse;
    type Id = CustomerRequestId;
    type Filter = RequestFilter;

    #[instrument(skip(self, request), fields(title = %request.title), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let (customer_id, guest_email, guest_phone) = match &request.submitter {
            Submitter::Customer { customer_id } => (Some(*customer_id), None, None),
            Submitter::Anonymous { email, phone } => (None, Some(email.as_str()), Some(phone.as_str())),
        };

        let created = sqlx::query_as::<_, RequestDBResponse>(&format!(
            r#"
            INSERT INTO customer_requests (
                customer_id, guest_email, guest_phone, service_category, title, description, location, city,
                province, budget_min, budget_max, timeline, urgency, contact_preference, property_type,
                square_footage, additional_details
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            RETURNING {REQUEST_COLUMNS}
            "#
        ))
        .bind(customer_id)
        .bind(guest_email)
        .bind(guest_phone)
        .bind(request.service_category)
        .bind(&request.title)
        .bind(&request.description)
        .bind(&request.location)
        .bind(&request.city)
        .bind(&request.province)
        .bind(request.budget_min)
        .bind(request.budget_max)
        .bind(&request.timeline)
        .bind(request.urgency)
        .bind(&request.contact_preference)
        .bind(&request.property_type)
        .bind(request.square_footage)
        .bind(&request.additional_details)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(created)
    }

    #[instrument(skip(self), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let request = sqlx::query_as::<_, RequestDBResponse>(&format!(
            "SELECT {REQUEST_COLUMNS} FROM customer_requests WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(request)
    }

    #[instrument(skip(self), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let requests = sqlx::query_as::<_, RequestDBResponse>(&format!(
            r#"
            SELECT {REQUEST_COLUMNS}
            FROM customer_requests
            WHERE ($1::uuid IS NULL OR customer_id = $1)
              AND ($2::text IS NULL OR status = $2)
              AND ($3::text IS NULL OR service_category = $3)
              AND ($4::text IS NULL OR urgency = $4)
            ORDER BY created_at DESC, id
            OFFSET $5
            LIMIT $6
            "#
        ))
        .bind(filter.customer_id)
        .bind(filter.status)
        .bind(filter.service_category)
        .bind(filter.urgency)
        .bind(filter.skip)
        .bind(filter.limit)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(requests)
    }

    #[instrument(skip(self, request), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let updated = sqlx::query_as::<_, RequestDBResponse>(&format!(
            r#"
            UPDATE customer_requests SET
                service_category = COALESCE($2, service_category),
                title = COALESCE($3, title),
                description = COALESCE($4, description),
                location = COALESCE($5, location),
                city = COALESCE($6, city),
                province = COALESCE($7, province),
                budget_min = COALESCE($8, budget_min),
                budget_max = COALESCE($9, budget_max),
                timeline = COALESCE($10, timeline),
                urgency = COALESCE($11, urgency),
                contact_preference = COALESCE($12, contact_preference),
                property_type = COALESCE($13, property_type),
                square_footage = COALESCE($14, square_footage),
                additional_details = COALESCE($15, additional_details),
                status = COALESCE($16, status),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {REQUEST_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(request.service_category)
        .bind(&request.title)
        .bind(&request.description)
        .bind(&request.location)
        .bind(&request.city)
        .bind(&request.province)
        .bind(request.budget_min)
        .bind(request.budget_max)
        .bind(&request.timeline)
        .bind(request.urgency)
        .bind(&request.contact_preference)
        .bind(&request.property_type)
        .bind(request.square_footage)
        .bind(&request.additional_details)
        .bind(request.status)
        .fetch_optional(&mut *self.db)
        .await?;

        updated.ok_or(DbError::NotFound)
    }

    #[instrument(skip(self), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM customer_requests WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
