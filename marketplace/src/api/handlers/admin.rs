use crate::{
    api::models::{
        admin::{MessageResponse, PlatformStatsResponse, RecentActivity},
        leads::{AdminLeadsQuery, LeadAssign, LeadResponse},
        profiles::{ListProfilesQuery, ProfileResponse, ProfileVerification},
        requests::{AdminRequestsQuery, RequestResponse},
        users::{ListUsersQuery, UserResponse, UserStatusUpdate},
    },
    auth::permissions::{operation, resource, RequiresPermission},
    db::{
        errors::DbError,
        handlers::{
            leads::LeadFilter, profiles::ProfileFilter, requests::RequestFilter, users::UserFilter, Leads, Profiles,
            Repository, Requests, Stats, Users,
        },
        models::{leads::LeadCreateDBRequest, profiles::ProfileUpdateDBRequest, users::UserUpdateDBRequest},
    },
    errors::{Error, Result},
    types::{LeadId, ProfileId, UserId},
    AppState,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use tracing::info;

const ADMIN_LIST_LIMIT: i64 = 100;
const RECENT_ACTIVITY_LIMIT: i64 = 5;
const LEAD_PAIR_CONSTRAINT: &str = "leads_request_professional_key";

fn not_found(resource: &str, id: impl ToString) -> Error {
    Error::NotFound {
        resource: resource.to_string(),
        id: id.to_string(),
    }
}

#[utoipa::path(
    get,
    path = "/admin/users",
    tag = "admin",
    summary = "List accounts",
    params(ListUsersQuery),
    responses(
        (status = 200, description = "Accounts, newest first", body = [UserResponse]),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Admins only"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<ListUsersQuery>,
    _: RequiresPermission<resource::Users, operation::ReadAll>,
) -> Result<Json<Vec<UserResponse>>> {
    let mut filter = UserFilter::new(0, ADMIN_LIST_LIMIT);
    if let Some(user_type) = query.user_type {
        filter = filter.with_user_type(user_type);
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let users = Users::new(&mut conn).list(&filter).await?;

    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

#[utoipa::path(
    put,
    path = "/admin/users/{user_id}/status",
    tag = "admin",
    summary = "Activate, deactivate or verify an account",
    params(("user_id" = String, Path, description = "User ID (UUID)")),
    request_body = UserStatusUpdate,
    responses(
        (status = 200, description = "Status updated", body = MessageResponse),
        (status = 400, description = "Neither flag given"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Admins only"),
        (status = 404, description = "User not found"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_user_status(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    current_user: RequiresPermission<resource::Users, operation::UpdateAll>,
    Json(update): Json<UserStatusUpdate>,
) -> Result<Json<MessageResponse>> {
    if update.is_active.is_none() && update.is_verified.is_none() {
        return Err(Error::BadRequest {
            message: "No valid status fields provided".to_string(),
        });
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    Users::new(&mut conn)
        .update(
            user_id,
            &UserUpdateDBRequest {
                is_active: update.is_active,
                is_verified: update.is_verified,
                ..Default::default()
            },
        )
        .await
        .map_err(|e| match e {
            DbError::NotFound => not_found("User", user_id),
            other => other.into(),
        })?;

    info!(%user_id, admin_id = %current_user.id, ?update, "account status changed");
    Ok(Json(MessageResponse::new("User status updated successfully")))
}

#[utoipa::path(
    get,
    path = "/admin/profiles",
    tag = "admin",
    summary = "List business profiles",
    params(ListProfilesQuery),
    responses(
        (status = 200, description = "Profiles, including those of inactive accounts", body = [ProfileResponse]),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Admins only"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_profiles(
    State(state): State<AppState>,
    Query(query): Query<ListProfilesQuery>,
    _: RequiresPermission<resource::Profiles, operation::ReadAll>,
) -> Result<Json<Vec<ProfileResponse>>> {
    let filter = ProfileFilter {
        service_category: query.service_category,
        is_verified: query.is_verified,
        ..ProfileFilter::new(0, ADMIN_LIST_LIMIT)
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let profiles = Profiles::new(&mut conn).list(&filter).await?;

    Ok(Json(profiles.into_iter().map(ProfileResponse::from).collect()))
}

#[utoipa::path(
    put,
    path = "/admin/profiles/{profile_id}/verify",
    tag = "admin",
    summary = "Verify or feature a business profile",
    params(("profile_id" = String, Path, description = "Profile ID (UUID)")),
    request_body = ProfileVerification,
    responses(
        (status = 200, description = "Verification updated", body = MessageResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Admins only"),
        (status = 404, description = "Business profile not found"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn verify_profile(
    State(state): State<AppState>,
    Path(profile_id): Path<ProfileId>,
    current_user: RequiresPermission<resource::Profiles, operation::UpdateAll>,
    Json(verification): Json<ProfileVerification>,
) -> Result<Json<MessageResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    Profiles::new(&mut conn)
        .update(
            profile_id,
            &ProfileUpdateDBRequest {
                is_verified: Some(verification.is_verified),
                is_featured: Some(verification.is_featured),
                ..Default::default()
            },
        )
        .await
        .map_err(|e| match e {
            DbError::NotFound => not_found("Business profile", profile_id),
            other => other.into(),
        })?;

    info!(%profile_id, admin_id = %current_user.id, is_verified = verification.is_verified, "profile verification changed");
    Ok(Json(MessageResponse::new("Business profile verification updated successfully")))
}

#[utoipa::path(
    get,
    path = "/admin/customer-requests",
    tag = "admin",
    summary = "List every customer request",
    params(AdminRequestsQuery),
    responses(
        (status = 200, description = "Requests, newest first", body = [RequestResponse]),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Admins only"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_customer_requests(
    State(state): State<AppState>,
    Query(query): Query<AdminRequestsQuery>,
    _: RequiresPermission<resource::CustomerRequests, operation::ReadAll>,
) -> Result<Json<Vec<RequestResponse>>> {
    let filter = RequestFilter {
        status: query.status,
        service_category: query.service_category,
        urgency: query.urgency,
        ..RequestFilter::new(0, ADMIN_LIST_LIMIT)
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let requests = Requests::new(&mut conn).list(&filter).await?;

    Ok(Json(requests.into_iter().map(RequestResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/admin/leads",
    tag = "admin",
    summary = "Assign a request to a professional",
    description = "Assigned leads are free for the professional; the request moves to `assigned`.",
    request_body = LeadAssign,
    responses(
        (status = 201, description = "Lead created", body = LeadResponse),
        (status = 400, description = "Lead already assigned to this professional"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Admins only"),
        (status = 404, description = "Request or professional profile not found"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn assign_lead(
    State(state): State<AppState>,
    current_user: RequiresPermission<resource::Leads, operation::CreateAll>,
    Json(assign): Json<LeadAssign>,
) -> Result<(StatusCode, Json<LeadResponse>)> {
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

    if Requests::new(&mut tx).get_by_id(assign.customer_request_id).await?.is_none() {
        return Err(not_found("Customer request", assign.customer_request_id));
    }
    if Profiles::new(&mut tx).get_by_user_id(assign.professional_id).await?.is_none() {
        return Err(not_found("Professional profile", assign.professional_id));
    }

    let lead = Leads::new(&mut tx)
        .create(&LeadCreateDBRequest {
            customer_request_id: assign.customer_request_id,
            professional_id: assign.professional_id,
        })
        .await
        .map_err(|e| {
            if e.is_unique_violation_on(LEAD_PAIR_CONSTRAINT) {
                Error::BadRequest {
                    message: "Lead already assigned to this professional".to_string(),
                }
            } else {
                e.into()
            }
        })?;

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    info!(lead_id = %lead.id, admin_id = %current_user.id, "lead assigned");
    Ok((StatusCode::CREATED, Json(LeadResponse::from(lead))))
}

#[utoipa::path(
    get,
    path = "/admin/leads",
    tag = "admin",
    summary = "List leads",
    params(AdminLeadsQuery),
    responses(
        (status = 200, description = "Leads, newest first", body = [LeadResponse]),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Admins only"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_leads(
    State(state): State<AppState>,
    Query(query): Query<AdminLeadsQuery>,
    _: RequiresPermission<resource::Leads, operation::ReadAll>,
) -> Result<Json<Vec<LeadResponse>>> {
    let filter = LeadFilter {
        status: query.status,
        professional_id: query.professional_id,
        ..LeadFilter::new(0, ADMIN_LIST_LIMIT)
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let leads = Leads::new(&mut conn).list(&filter).await?;

    Ok(Json(leads.into_iter().map(LeadResponse::from).collect()))
}

#[utoipa::path(
    delete,
    path = "/admin/leads/{lead_id}",
    tag = "admin",
    summary = "Delete a lead",
    description = "The request returns to `pending` once no lead references it.",
    params(("lead_id" = String, Path, description = "Lead ID (UUID)")),
    responses(
        (status = 200, description = "Lead deleted", body = MessageResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Admins only"),
        (status = 404, description = "Lead not found"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_lead(
    State(state): State<AppState>,
    Path(lead_id): Path<LeadId>,
    current_user: RequiresPermission<resource::Leads, operation::DeleteAll>,
) -> Result<Json<MessageResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let lead = Leads::new(&mut conn)
        .delete_and_release(lead_id)
        .await?
        .ok_or_else(|| not_found("Lead", lead_id))?;

    info!(%lead_id, request_id = %lead.customer_request_id, admin_id = %current_user.id, "lead deleted");
    Ok(Json(MessageResponse::new("Lead deleted successfully")))
}

#[utoipa::path(
    get,
    path = "/admin/stats",
    tag = "admin",
    summary = "Platform statistics",
    responses(
        (status = 200, description = "Counts, rates and recent activity", body = PlatformStatsResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Admins only"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn platform_stats(
    State(state): State<AppState>,
    _: RequiresPermission<resource::Stats, operation::ReadAll>,
) -> Result<Json<PlatformStatsResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let counts = Stats::new(&mut conn).counts().await?;
    let recent_requests = Requests::new(&mut conn)
        .list(&RequestFilter::new(0, RECENT_ACTIVITY_LIMIT))
        .await?;
    let recent_registrations = Users::new(&mut conn)
        .list(&UserFilter::new(0, RECENT_ACTIVITY_LIMIT))
        .await?;

    Ok(Json(PlatformStatsResponse::new(
        counts,
        RecentActivity {
            recent_requests: recent_requests.into_iter().map(RequestResponse::from).collect(),
            recent_registrations: recent_registrations.into_iter().map(UserResponse::from).collect(),
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        api::models::{
            profiles::ServiceCategory,
            requests::{LeadStatus, RequestResponse},
            users::UserType,
        },
        test_utils::*,
    };
    use serde_json::json;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_admin_routes_reject_other_roles(pool: PgPool) {
        let (app, _) = create_test_app(pool.clone()).await;
        let pro = create_test_user(&pool, UserType::Professional).await;
        let customer = create_test_user(&pool, UserType::Customer).await;

        for path in [
            "/api/admin/users",
            "/api/admin/profiles",
            "/api/admin/customer-requests",
            "/api/admin/leads",
            "/api/admin/stats",
        ] {
            for user in [&pro, &customer] {
                let (name, value) = add_auth_headers(user);
                app.get(path).add_header(name, value).await.assert_status_forbidden();
            }
            app.get(path).await.assert_status_unauthorized();
        }

        let (name, value) = add_auth_headers(&customer);
        app.put(&format!("/api/admin/users/{}/status", pro.id))
            .add_header(name, value)
            .json(&json!({"is_active": false}))
            .await
            .assert_status_forbidden();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_user_management(pool: PgPool) {
        let (app, _) = create_test_app(pool.clone()).await;
        let admin = create_test_user(&pool, UserType::Admin).await;
        let pro = create_test_user(&pool, UserType::Professional).await;
        create_test_user(&pool, UserType::Customer).await;
        let (name, value) = add_auth_headers(&admin);

        let professionals: Vec<UserResponse> = app
            .get("/api/admin/users?user_type=professional")
            .add_header(name.clone(), value.clone())
            .await
            .json();
        assert_eq!(professionals.len(), 1);
        assert_eq!(professionals[0].id, pro.id);

        app.put(&format!("/api/admin/users/{}/status", pro.id))
            .add_header(name.clone(), value.clone())
            .json(&json!({}))
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        app.put(&format!("/api/admin/users/{}/status", uuid::Uuid::new_v4()))
            .add_header(name.clone(), value.clone())
            .json(&json!({"is_active": false}))
            .await
            .assert_status_not_found();

        app.put(&format!("/api/admin/users/{}/status", pro.id))
            .add_header(name, value)
            .json(&json!({"is_active": false, "is_verified": true}))
            .await
            .assert_status_ok();

        let (name, value) = add_auth_headers(&pro);
        app.get("/api/auth/me").add_header(name, value).await.assert_status_unauthorized();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_verify_profile(pool: PgPool) {
        let (app, _) = create_test_app(pool.clone()).await;
        let admin = create_test_user(&pool, UserType::Admin).await;
        let pro = create_test_user(&pool, UserType::Professional).await;
        let profile = create_test_profile(&pool, pro.id, vec![ServiceCategory::Hvac]).await;
        let (name, value) = add_auth_headers(&admin);

        let unverified: Vec<ProfileResponse> = app
            .get("/api/admin/profiles?is_verified=false")
            .add_header(name.clone(), value.clone())
            .await
            .json();
        assert_eq!(unverified.len(), 1);

        app.put(&format!("/api/admin/profiles/{}/verify", profile.id))
            .add_header(name.clone(), value.clone())
            .json(&json!({}))
            .await
            .assert_status_ok();

        let verified: Vec<ProfileResponse> = app
            .get("/api/admin/profiles?is_verified=true&service_category=hvac")
            .add_header(name.clone(), value.clone())
            .await
            .json();
        assert_eq!(verified.len(), 1);
        assert!(verified[0].is_verified);
        assert!(!verified[0].is_featured);

        app.put(&format!("/api/admin/profiles/{}/verify", uuid::Uuid::new_v4()))
            .add_header(name, value)
            .json(&json!({"is_verified": false}))
            .await
            .assert_status_not_found();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_assign_and_delete_lead_releases_request(pool: PgPool) {
        let (app, _) = create_test_app(pool.clone()).await;
        let admin = create_test_user(&pool, UserType::Admin).await;
        let customer = create_test_user(&pool, UserType::Customer).await;
        let first = create_test_user(&pool, UserType::Professional).await;
        let second = create_test_user(&pool, UserType::Professional).await;
        create_test_profile(&pool, first.id, vec![ServiceCategory::Painter]).await;
        create_test_profile(&pool, second.id, vec![ServiceCategory::Painter]).await;
        let request = create_test_request(&pool, customer.id, ServiceCategory::Painter).await;
        let (name, value) = add_auth_headers(&admin);

        let mut lead_ids = Vec::new();
        for pro in [&first, &second] {
            let response = app
                .post("/api/admin/leads")
                .add_header(name.clone(), value.clone())
                .json(&json!({"customer_request_id": request.id, "professional_id": pro.id}))
                .await;
            response.assert_status(StatusCode::CREATED);
            lead_ids.push(response.json::<LeadResponse>().id);
        }

        let duplicate = app
            .post("/api/admin/leads")
            .add_header(name.clone(), value.clone())
            .json(&json!({"customer_request_id": request.id, "professional_id": first.id}))
            .await;
        duplicate.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(
            duplicate.json::<serde_json::Value>()["detail"],
            "Lead already assigned to this professional"
        );

        let request_status = |requests: Vec<RequestResponse>| {
            requests
                .into_iter()
                .find(|r| r.id == request.id)
                .map(|r| r.status)
                .expect("request listed")
        };

        let listed: Vec<RequestResponse> = app
            .get("/api/admin/customer-requests")
            .add_header(name.clone(), value.clone())
            .await
            .json();
        assert_eq!(request_status(listed), LeadStatus::Assigned);

        // One lead still references the request
        app.delete(&format!("/api/admin/leads/{}", lead_ids[0]))
            .add_header(name.clone(), value.clone())
            .await
            .assert_status_ok();
        let listed: Vec<RequestResponse> = app
            .get("/api/admin/customer-requests?status=assigned")
            .add_header(name.clone(), value.clone())
            .await
            .json();
        assert_eq!(request_status(listed), LeadStatus::Assigned);

        app.delete(&format!("/api/admin/leads/{}", lead_ids[1]))
            .add_header(name.clone(), value.clone())
            .await
            .assert_status_ok();
        let listed: Vec<RequestResponse> = app
            .get("/api/admin/customer-requests?status=pending")
            .add_header(name.clone(), value.clone())
            .await
            .json();
        assert_eq!(request_status(listed), LeadStatus::Pending);

        app.delete(&format!("/api/admin/leads/{}", lead_ids[1]))
            .add_header(name, value)
            .await
            .assert_status_not_found();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_assign_lead_requires_existing_records(pool: PgPool) {
        let (app, _) = create_test_app(pool.clone()).await;
        let admin = create_test_user(&pool, UserType::Admin).await;
        let customer = create_test_user(&pool, UserType::Customer).await;
        let pro_without_profile = create_test_user(&pool, UserType::Professional).await;
        let request = create_test_request(&pool, customer.id, ServiceCategory::Handyman).await;
        let (name, value) = add_auth_headers(&admin);

        app.post("/api/admin/leads")
            .add_header(name.clone(), value.clone())
            .json(&json!({"customer_request_id": uuid::Uuid::new_v4(), "professional_id": pro_without_profile.id}))
            .await
            .assert_status_not_found();

        let response = app
            .post("/api/admin/leads")
            .add_header(name, value)
            .json(&json!({"customer_request_id": request.id, "professional_id": pro_without_profile.id}))
            .await;
        response.assert_status_not_found();
        assert_eq!(response.json::<serde_json::Value>()["detail"], "Professional profile not found");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_stats(pool: PgPool) {
        let (app, _) = create_test_app(pool.clone()).await;
        let admin = create_test_user(&pool, UserType::Admin).await;
        let customer = create_test_user(&pool, UserType::Customer).await;
        let pro = create_test_user(&pool, UserType::Professional).await;
        create_test_profile(&pool, pro.id, vec![ServiceCategory::Plumber]).await;
        for _ in 0..6 {
            create_test_request(&pool, customer.id, ServiceCategory::Plumber).await;
        }
        let (name, value) = add_auth_headers(&admin);

        let response = app.get("/api/admin/stats").add_header(name, value).await;
        response.assert_status_ok();
        let stats: PlatformStatsResponse = response.json();
        assert_eq!(stats.user_stats.total_users, 3);
        assert_eq!(stats.user_stats.total_professionals, 1);
        assert_eq!(stats.profile_stats.total_profiles, 1);
        assert_eq!(stats.profile_stats.verification_rate, 0.0);
        assert_eq!(stats.request_stats.total_requests, 6);
        assert_eq!(stats.request_stats.pending_requests, 6);
        assert_eq!(stats.lead_stats.total_leads, 0);
        assert_eq!(stats.recent_activity.recent_requests.len(), 5);
        assert_eq!(stats.recent_activity.recent_registrations.len(), 3);
    }
}
