use crate::{
    api::models::{
        leads::{
            ContactDetails, LeadPreview, LeadResponse, LeadStatusUpdate, LeadViewResponse, MyLeadsQuery, PreviewQuery,
            CREDITS_PER_LEAD,
        },
        profiles::{ProfileCreate, ProfileResponse, ProfileUpdate, SearchProfessionalsQuery},
        requests::{LeadStatus, RequestResponse, Submitter},
    },
    auth::permissions::{operation, resource, RequiresPermission},
    db::{
        errors::NEGATIVE_BALANCE_CONSTRAINT,
        handlers::{leads::LeadFilter, profiles::ProfileFilter, Leads, Profiles, Repository, Requests, Users},
        models::{
            leads::LeadUpdateDBRequest,
            profiles::{ProfileCreateDBRequest, ProfileUpdateDBRequest},
            requests::RequestDBResponse,
        },
    },
    email::Notification,
    errors::{Error, Result},
    types::{CustomerRequestId, LeadId, UserId},
    AppState,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use sqlx::PgConnection;
use tracing::info;

const PROFILE_CONSTRAINT: &str = "business_profiles_user_id_key";
const MY_LEADS_LIMIT: i64 = 100;

fn profile_not_found(user_id: UserId) -> Error {
    Error::NotFound {
        resource: "Business profile".to_string(),
        id: user_id.to_string(),
    }
}

#[utoipa::path(
    post,
    path = "/professionals/profile",
    tag = "professionals",
    summary = "Create business profile",
    description = "Each professional has at most one profile; new profiles await admin verification",
    request_body = ProfileCreate,
    responses(
        (status = 201, description = "Profile created", body = ProfileResponse),
        (status = 400, description = "Business profile already exists"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Professionals only"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_profile(
    State(state): State<AppState>,
    current_user: RequiresPermission<resource::Profiles, operation::CreateOwn>,
    Json(data): Json<ProfileCreate>,
) -> Result<(StatusCode, Json<ProfileResponse>)> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let profile = Profiles::new(&mut conn)
        .create(&ProfileCreateDBRequest::new(current_user.id, data))
        .await
        .map_err(|e| {
            if e.is_unique_violation_on(PROFILE_CONSTRAINT) {
                Error::BadRequest {
                    message: "Business profile already exists".to_string(),
                }
            } else {
                e.into()
            }
        })?;

    info!(profile_id = %profile.id, user_id = %current_user.id, "business profile created");
    state.notifier.notify(Notification::VerificationNeeded {
        business_name: profile.business_name.clone(),
        email: current_user.email.clone(),
    });

    Ok((StatusCode::CREATED, Json(ProfileResponse::from(profile))))
}

#[utoipa::path(
    get,
    path = "/professionals/profile",
    tag = "professionals",
    summary = "Own business profile",
    responses(
        (status = 200, description = "The caller's profile", body = ProfileResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Professionals only"),
        (status = 404, description = "No profile yet"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_my_profile(
    State(state): State<AppState>,
    current_user: RequiresPermission<resource::Profiles, operation::ReadOwn>,
) -> Result<Json<ProfileResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let profile = Profiles::new(&mut conn)
        .get_by_user_id(current_user.id)
        .await?
        .ok_or_else(|| profile_not_found(current_user.id))?;

    Ok(Json(ProfileResponse::from(profile)))
}

#[utoipa::path(
    put,
    path = "/professionals/profile",
    tag = "professionals",
    summary = "Update own business profile",
    description = "Rating, review count and verification flags are not editable here",
    request_body = ProfileUpdate,
    responses(
        (status = 200, description = "Updated profile", body = ProfileResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Professionals only"),
        (status = 404, description = "No profile yet"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_my_profile(
    State(state): State<AppState>,
    current_user: RequiresPermission<resource::Profiles, operation::UpdateOwn>,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<ProfileResponse>> {
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let profile;
    {
        let mut repo = Profiles::new(&mut tx);
        let existing = repo
            .get_by_user_id(current_user.id)
            .await?
            .ok_or_else(|| profile_not_found(current_user.id))?;
        profile = repo.update(existing.id, &ProfileUpdateDBRequest::from(update)).await?;
    }
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(ProfileResponse::from(profile)))
}

#[utoipa::path(
    get,
    path = "/professionals/leads",
    tag = "professionals",
    summary = "Own leads",
    description = "Leads assigned to or unlocked by the caller, newest first",
    params(MyLeadsQuery),
    responses(
        (status = 200, description = "Leads", body = [LeadResponse]),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Professionals only"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_my_leads(
    State(state): State<AppState>,
    Query(query): Query<MyLeadsQuery>,
    current_user: RequiresPermission<resource::Leads, operation::ReadOwn>,
) -> Result<Json<Vec<LeadResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let filter = LeadFilter {
        professional_id: Some(current_user.id),
        status: query.status_filter,
        ..LeadFilter::new(0, MY_LEADS_LIMIT)
    };
    let leads = Leads::new(&mut conn).list(&filter).await?;

    Ok(Json(leads.into_iter().map(LeadResponse::from).collect()))
}

#[utoipa::path(
    put,
    path = "/professionals/leads/{lead_id}/status",
    tag = "professionals",
    summary = "Update lead progress",
    params(("lead_id" = String, Path, description = "Lead ID (UUID)")),
    request_body = LeadStatusUpdate,
    responses(
        (status = 200, description = "Updated lead", body = LeadResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Professionals only"),
        (status = 404, description = "Lead not found or not the caller's"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_lead_status(
    State(state): State<AppState>,
    Path(lead_id): Path<LeadId>,
    current_user: RequiresPermission<resource::Leads, operation::UpdateOwn>,
    Json(update): Json<LeadStatusUpdate>,
) -> Result<Json<LeadResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Leads::new(&mut conn);

    let lead = repo
        .get_for_professional(lead_id, current_user.id)
        .await?
        .ok_or_else(|| Error::NotFound {
            resource: "Lead".to_string(),
            id: lead_id.to_string(),
        })?;

    let updated = repo
        .update(
            lead.id,
            &LeadUpdateDBRequest {
                status: update.status,
                notes: update.notes,
                quote_amount: update.quote_amount,
                is_won: update.is_won,
            },
        )
        .await?;

    Ok(Json(LeadResponse::from(updated)))
}

#[utoipa::path(
    get,
    path = "/professionals/leads/preview",
    tag = "professionals",
    summary = "Preview available leads",
    description = "Pending requests the caller has not unlocked, filtered by the caller's service categories. \
                   Contact details are withheld until the lead is unlocked.",
    params(PreviewQuery),
    responses(
        (status = 200, description = "Lead previews", body = [LeadPreview]),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Professionals only"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn preview_leads(
    State(state): State<AppState>,
    Query(query): Query<PreviewQuery>,
    current_user: RequiresPermission<resource::Leads, operation::ReadOwn>,
) -> Result<Json<Vec<LeadPreview>>> {
    let limit = query.limit.unwrap_or(5).clamp(1, 50);

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let categories = Profiles::new(&mut conn)
        .get_by_user_id(current_user.id)
        .await?
        .map(|profile| profile.service_categories)
        .unwrap_or_default();

    let requests = Requests::new(&mut conn)
        .list_previewable(current_user.id, &categories, limit)
        .await?;

    Ok(Json(requests.into_iter().map(LeadPreview::from).collect()))
}

async fn contact_details(conn: &mut PgConnection, request: &RequestDBResponse) -> Result<ContactDetails> {
    match request.submitter() {
        Submitter::Anonymous { email, phone } => Ok(ContactDetails {
            name: None,
            email,
            phone: Some(phone),
        }),
        Submitter::Customer { customer_id } => {
            let customer = Users::new(conn).get_by_id(customer_id).await?.ok_or_else(|| Error::NotFound {
                resource: "Customer".to_string(),
                id: customer_id.to_string(),
            })?;
            Ok(ContactDetails {
                name: Some(format!("{} {}", customer.first_name, customer.last_name)),
                email: customer.email,
                phone: customer.phone,
            })
        }
    }
}

#[utoipa::path(
    post,
    path = "/professionals/leads/{request_id}/view",
    tag = "professionals",
    summary = "Unlock a lead",
    description = "Reveals the full request with contact details. The first view charges one credit; \
                   later views of the same request are free.",
    params(("request_id" = String, Path, description = "Customer request ID (UUID)")),
    responses(
        (status = 200, description = "Unlocked lead", body = LeadViewResponse),
        (status = 400, description = "Request is closed"),
        (status = 401, description = "Not authenticated"),
        (status = 402, description = "Insufficient credits"),
        (status = 403, description = "Professionals only"),
        (status = 404, description = "Request not found"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn view_lead(
    State(state): State<AppState>,
    Path(request_id): Path<CustomerRequestId>,
    current_user: RequiresPermission<resource::Leads, operation::CreateOwn>,
) -> Result<Json<LeadViewResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let request = Requests::new(&mut conn)
        .get_by_id(request_id)
        .await?
        .ok_or_else(|| Error::NotFound {
            resource: "Customer request".to_string(),
            id: request_id.to_string(),
        })?;

    if matches!(request.status, LeadStatus::Completed | LeadStatus::Cancelled)
        && Leads::new(&mut conn).get_for_request(request.id, current_user.id).await?.is_none()
    {
        return Err(Error::BadRequest {
            message: "This request is no longer accepting professionals".to_string(),
        });
    }

    let unlock = Leads::new(&mut conn)
        .unlock(
            request.id,
            current_user.id,
            CREDITS_PER_LEAD,
            format!("Used {CREDITS_PER_LEAD} credit(s) to view lead: {}", request.title),
        )
        .await
        .map_err(|e| {
            if e.is_check_violation_on(NEGATIVE_BALANCE_CONSTRAINT) {
                Error::PaymentRequired {
                    message: "Insufficient credits. Please purchase more credits to view leads.".to_string(),
                }
            } else {
                e.into()
            }
        })?;

    let contact = contact_details(&mut conn, &request).await?;

    Ok(Json(LeadViewResponse {
        lead_id: unlock.lead.id,
        credits_used: unlock.charged,
        balance: unlock.balance,
        request: RequestResponse::from(request),
        contact,
    }))
}

#[utoipa::path(
    get,
    path = "/professionals",
    tag = "professionals",
    summary = "Search professionals",
    description = "Public directory of active professionals, featured first and then by rating. \
                   City and province match case-insensitive substrings.",
    params(SearchProfessionalsQuery),
    responses(
        (status = 200, description = "Matching profiles", body = [ProfileResponse]),
    )
)]
pub async fn search_professionals(
    State(state): State<AppState>,
    Query(query): Query<SearchProfessionalsQuery>,
) -> Result<Json<Vec<ProfileResponse>>> {
    let skip = query.skip.unwrap_or(0).max(0);
    let limit = query.limit.unwrap_or(20).clamp(1, 100);

    let filter = ProfileFilter {
        service_category: query.service_category,
        city: query.city,
        province: query.province,
        is_verified: query.is_verified,
        active_only: true,
        ..ProfileFilter::new(skip, limit)
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let profiles = Profiles::new(&mut conn).list(&filter).await?;

    Ok(Json(profiles.into_iter().map(ProfileResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/professionals/{professional_id}",
    tag = "professionals",
    summary = "Professional profile",
    params(("professional_id" = String, Path, description = "Professional's user ID (UUID)")),
    responses(
        (status = 200, description = "Profile", body = ProfileResponse),
        (status = 404, description = "Professional profile not found"),
    )
)]
pub async fn get_professional(
    State(state): State<AppState>,
    Path(professional_id): Path<UserId>,
) -> Result<Json<ProfileResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let profile = Profiles::new(&mut conn)
        .get_by_user_id(professional_id)
        .await?
        .ok_or_else(|| Error::NotFound {
            resource: "Professional profile".to_string(),
            id: professional_id.to_string(),
        })?;

    Ok(Json(ProfileResponse::from(profile)))
}
