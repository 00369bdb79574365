use crate::{
    api::models::{
        admin::MessageResponse,
        requests::{ListRequestsQuery, QuickRequestCreate, RequestCreate, RequestResponse, RequestUpdate, Submitter},
        users::CurrentUser,
    },
    auth::permissions::{operation, resource, RequiresPermission},
    db::{
        handlers::{requests::RequestFilter, Repository, Requests},
        models::requests::{RequestCreateDBRequest, RequestDBResponse, RequestUpdateDBRequest},
    },
    email::{Notification, Notifier},
    errors::{Error, Result},
    types::CustomerRequestId,
    AppState,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use sqlx::PgConnection;
use tracing::info;

const MY_REQUESTS_LIMIT: i64 = 100;

fn request_not_found(id: CustomerRequestId) -> Error {
    Error::NotFound {
        resource: "Customer request".to_string(),
        id: id.to_string(),
    }
}

/// Load a request, hiding requests that belong to someone else
async fn get_owned_request(conn: &mut PgConnection, id: CustomerRequestId, owner: &CurrentUser) -> Result<RequestDBResponse> {
    Requests::new(conn)
        .get_by_id(id)
        .await?
        .filter(|request| request.customer_id == Some(owner.id))
        .ok_or_else(|| request_not_found(id))
}

fn announce(notifier: &Notifier, request: &RequestDBResponse) {
    let contact_email = match request.submitter() {
        Submitter::Anonymous { email, .. } => Some(email),
        Submitter::Customer { .. } => None,
    };
    notifier.notify(Notification::NewCustomerRequest {
        title: request.title.clone(),
        service_category: request.service_category,
        location: request.location.clone(),
        contact_email,
    });
}

#[utoipa::path(
    post,
    path = "/customers/requests",
    tag = "customers",
    summary = "Post a service request",
    request_body = RequestCreate,
    responses(
        (status = 201, description = "Request created", body = RequestResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Customers only"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_request(
    State(state): State<AppState>,
    current_user: RequiresPermission<resource::CustomerRequests, operation::CreateOwn>,
    Json(data): Json<RequestCreate>,
) -> Result<(StatusCode, Json<RequestResponse>)> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let request = Requests::new(&mut conn)
        .create(&RequestCreateDBRequest::new(
            Submitter::Customer {
                customer_id: current_user.id,
            },
            data,
        ))
        .await?;

    info!(request_id = %request.id, customer_id = %current_user.id, "customer request created");
    announce(&state.notifier, &request);

    Ok((StatusCode::CREATED, Json(RequestResponse::from(request))))
}

#[utoipa::path(
    get,
    path = "/customers/requests",
    tag = "customers",
    summary = "Own service requests",
    params(ListRequestsQuery),
    responses(
        (status = 200, description = "Requests, newest first", body = [RequestResponse]),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Customers only"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_my_requests(
    State(state): State<AppState>,
    Query(query): Query<ListRequestsQuery>,
    current_user: RequiresPermission<resource::CustomerRequests, operation::ReadOwn>,
) -> Result<Json<Vec<RequestResponse>>> {
    let filter = RequestFilter {
        status: query.status_filter,
        ..RequestFilter::new(0, MY_REQUESTS_LIMIT).for_customer(current_user.id)
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let requests = Requests::new(&mut conn).list(&filter).await?;

    Ok(Json(requests.into_iter().map(RequestResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/customers/requests/{request_id}",
    tag = "customers",
    summary = "Own service request",
    params(("request_id" = String, Path, description = "Request ID (UUID)")),
    responses(
        (status = 200, description = "Request", body = RequestResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Customers only"),
        (status = 404, description = "Not found or not the caller's"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_my_request(
    State(state): State<AppState>,
    Path(request_id): Path<CustomerRequestId>,
    current_user: RequiresPermission<resource::CustomerRequests, operation::ReadOwn>,
) -> Result<Json<RequestResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let request = get_owned_request(&mut conn, request_id, &current_user).await?;

    Ok(Json(RequestResponse::from(request)))
}

#[utoipa::path(
    put,
    path = "/customers/requests/{request_id}",
    tag = "customers",
    summary = "Edit a pending request",
    params(("request_id" = String, Path, description = "Request ID (UUID)")),
    request_body = RequestUpdate,
    responses(
        (status = 200, description = "Updated request", body = RequestResponse),
        (status = 400, description = "Request is no longer pending"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Customers only"),
        (status = 404, description = "Not found or not the caller's"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_my_request(
    State(state): State<AppState>,
    Path(request_id): Path<CustomerRequestId>,
    current_user: RequiresPermission<resource::CustomerRequests, operation::UpdateOwn>,
    Json(update): Json<RequestUpdate>,
) -> Result<Json<RequestResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    get_owned_request(&mut conn, request_id, &current_user).await?;

    let updated = Requests::new(&mut conn)
        .update_pending(request_id, &RequestUpdateDBRequest::from(update))
        .await?
        .ok_or_else(|| Error::BadRequest {
            message: "Cannot update request that has been assigned to professionals".to_string(),
        })?;

    Ok(Json(RequestResponse::from(updated)))
}

#[utoipa::path(
    delete,
    path = "/customers/requests/{request_id}",
    tag = "customers",
    summary = "Withdraw a pending request",
    params(("request_id" = String, Path, description = "Request ID (UUID)")),
    responses(
        (status = 200, description = "Request deleted", body = MessageResponse),
        (status = 400, description = "Request is no longer pending"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Customers only"),
        (status = 404, description = "Not found or not the caller's"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_my_request(
    State(state): State<AppState>,
    Path(request_id): Path<CustomerRequestId>,
    current_user: RequiresPermission<resource::CustomerRequests, operation::DeleteOwn>,
) -> Result<Json<MessageResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    get_owned_request(&mut conn, request_id, &current_user).await?;

    if !Requests::new(&mut conn).delete_pending(request_id).await? {
        return Err(Error::BadRequest {
            message: "Cannot delete request that has been assigned to professionals".to_string(),
        });
    }

    Ok(Json(MessageResponse::new("Customer request deleted successfully")))
}

#[utoipa::path(
    post,
    path = "/customers/requests/quick",
    tag = "customers",
    summary = "Quick request without an account",
    description = "Landing-page flow. Requires email, phone, service_category, title, description, city and province; \
                   location, timeline, urgency and contact preference fall back to defaults.",
    request_body = QuickRequestCreate,
    responses(
        (status = 201, description = "Request created", body = RequestResponse),
        (status = 400, description = "Missing required field"),
    )
)]
pub async fn create_quick_request(
    State(state): State<AppState>,
    Json(data): Json<QuickRequestCreate>,
) -> Result<(StatusCode, Json<RequestResponse>)> {
    let (submitter, body) = data.into_request()?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let request = Requests::new(&mut conn)
        .create(&RequestCreateDBRequest::new(submitter, body))
        .await?;

    info!(request_id = %request.id, "quick request created");
    announce(&state.notifier, &request);

    Ok((StatusCode::CREATED, Json(RequestResponse::from(request))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        api::models::{
            profiles::ServiceCategory,
            requests::{LeadStatus, Urgency},
            users::UserType,
        },
        db::{handlers::Leads, models::leads::LeadCreateDBRequest},
        test_utils::*,
    };
    use serde_json::json;
    use sqlx::PgPool;

    fn request_body() -> serde_json::Value {
        serde_json::to_value(test_request_body(ServiceCategory::Electrician)).expect("Failed to serialize")
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_and_list_requests(pool: PgPool) {
        let (app, _) = create_test_app(pool.clone()).await;
        let customer = create_test_user(&pool, UserType::Customer).await;
        let other = create_test_user(&pool, UserType::Customer).await;
        create_test_request(&pool, other.id, ServiceCategory::Plumber).await;
        let (name, value) = add_auth_headers(&customer);

        let response = app
            .post("/api/customers/requests")
            .add_header(name.clone(), value.clone())
            .json(&request_body())
            .await;
        response.assert_status(StatusCode::CREATED);
        let created: RequestResponse = response.json();
        assert_eq!(created.status, LeadStatus::Pending);
        assert_eq!(created.submitter, Submitter::Customer { customer_id: customer.id });

        let mine: Vec<RequestResponse> = app
            .get("/api/customers/requests")
            .add_header(name.clone(), value.clone())
            .await
            .json();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].id, created.id);

        let assigned: Vec<RequestResponse> = app
            .get("/api/customers/requests?status_filter=assigned")
            .add_header(name, value)
            .await
            .json();
        assert!(assigned.is_empty());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_other_customers_requests_are_not_found(pool: PgPool) {
        let (app, _) = create_test_app(pool.clone()).await;
        let owner = create_test_user(&pool, UserType::Customer).await;
        let snoop = create_test_user(&pool, UserType::Customer).await;
        let request = create_test_request(&pool, owner.id, ServiceCategory::Cleaning).await;
        let path = format!("/api/customers/requests/{}", request.id);
        let (name, value) = add_auth_headers(&snoop);

        app.get(&path).add_header(name.clone(), value.clone()).await.assert_status_not_found();
        app.put(&path)
            .add_header(name.clone(), value.clone())
            .json(&json!({"title": "Mine now"}))
            .await
            .assert_status_not_found();
        app.delete(&path).add_header(name, value).await.assert_status_not_found();

        let (name, value) = add_auth_headers(&owner);
        app.get(&path).add_header(name, value).await.assert_status_ok();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_edits_only_while_pending(pool: PgPool) {
        let (app, _) = create_test_app(pool.clone()).await;
        let customer = create_test_user(&pool, UserType::Customer).await;
        let pro = create_test_user(&pool, UserType::Professional).await;
        let editable = create_test_request(&pool, customer.id, ServiceCategory::Flooring).await;
        let assigned = create_test_request(&pool, customer.id, ServiceCategory::Flooring).await;
        {
            let mut conn = pool.acquire().await.expect("Failed to acquire connection");
            Leads::new(&mut conn)
                .create(&LeadCreateDBRequest {
                    customer_request_id: assigned.id,
                    professional_id: pro.id,
                })
                .await
                .expect("Failed to assign lead");
        }
        let (name, value) = add_auth_headers(&customer);

        let response = app
            .put(&format!("/api/customers/requests/{}", editable.id))
            .add_header(name.clone(), value.clone())
            .json(&json!({"title": "New floor", "urgency": "urgent"}))
            .await;
        response.assert_status_ok();
        let updated: RequestResponse = response.json();
        assert_eq!(updated.title, "New floor");
        assert_eq!(updated.urgency, Urgency::Urgent);

        app.put(&format!("/api/customers/requests/{}", assigned.id))
            .add_header(name.clone(), value.clone())
            .json(&json!({"title": "Too late"}))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
        app.delete(&format!("/api/customers/requests/{}", assigned.id))
            .add_header(name.clone(), value.clone())
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        app.delete(&format!("/api/customers/requests/{}", editable.id))
            .add_header(name.clone(), value.clone())
            .await
            .assert_status_ok();
        app.get(&format!("/api/customers/requests/{}", editable.id))
            .add_header(name, value)
            .await
            .assert_status_not_found();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_customer_routes_reject_other_roles(pool: PgPool) {
        let (app, _) = create_test_app(pool.clone()).await;
        let pro = create_test_user(&pool, UserType::Professional).await;
        let (name, value) = add_auth_headers(&pro);

        app.post("/api/customers/requests")
            .add_header(name.clone(), value.clone())
            .json(&request_body())
            .await
            .assert_status_forbidden();
        app.get("/api/customers/requests").add_header(name, value).await.assert_status_forbidden();
        app.get("/api/customers/requests").await.assert_status_unauthorized();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_quick_request(pool: PgPool) {
        let (app, _) = create_test_app(pool).await;

        let response = app
            .post("/api/customers/requests/quick")
            .json(&json!({
                "email": "guest@example.com",
                "phone": "555-0142",
                "service_category": "roofing",
                "title": "Leaking roof",
                "description": "Water in the attic after rain",
                "city": "Calgary",
                "province": "Alberta"
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let created: RequestResponse = response.json();
        assert_eq!(
            created.submitter,
            Submitter::Anonymous {
                email: "guest@example.com".to_string(),
                phone: "555-0142".to_string()
            }
        );
        assert_eq!(created.location, "Calgary, Alberta");
        assert_eq!(created.timeline, "ASAP");
        assert_eq!(created.urgency, Urgency::Medium);
        assert_eq!(created.contact_preference, "either");

        let missing = app
            .post("/api/customers/requests/quick")
            .json(&json!({"email": "guest@example.com", "title": "No phone"}))
            .await;
        missing.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(missing.json::<serde_json::Value>()["detail"], "Missing required field: phone");
    }
}
