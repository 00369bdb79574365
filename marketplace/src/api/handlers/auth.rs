use crate::{
    api::models::{
        auth::{LoginForm, RegisterRequest, TokenResponse},
        users::{UserResponse, UserType, UserUpdate},
    },
    auth::{
        password,
        permissions::{operation, resource, RequiresPermission},
        session::create_session_token,
    },
    db::{
        handlers::{Repository, Users},
        models::users::{UserCreateDBRequest, UserUpdateDBRequest},
    },
    email::Notification,
    errors::{Error, Result},
    AppState,
};
use axum::{
    extract::State,
    response::Json,
    Form,
};
use tracing::info;

const EMAIL_CONSTRAINT: &str = "users_email_key";

#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "auth",
    summary = "Register",
    description = "Create a professional or customer account and return a session token",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Account created", body = TokenResponse),
        (status = 400, description = "Email already registered, invalid email, or admin account requested"),
        (status = 422, description = "Malformed body"),
    )
)]
pub async fn register(State(state): State<AppState>, Json(data): Json<RegisterRequest>) -> Result<Json<TokenResponse>> {
    if data.user_type == UserType::Admin {
        return Err(Error::BadRequest {
            message: "Admin accounts cannot be self-registered".to_string(),
        });
    }
    if !data.has_valid_email() {
        return Err(Error::BadRequest {
            message: "Invalid email address".to_string(),
        });
    }
    if data.password.is_empty() {
        return Err(Error::BadRequest {
            message: "Password must not be empty".to_string(),
        });
    }

    let password_hash = password::hash_string(&data.password).map_err(|e| Error::Internal {
        operation: format!("hash password: {e}"),
    })?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let user = Users::new(&mut conn)
        .create(&UserCreateDBRequest {
            email: data.email,
            password_hash,
            user_type: data.user_type,
            first_name: data.first_name,
            last_name: data.last_name,
            phone: data.phone,
        })
        .await
        .map_err(|e| {
            if e.is_unique_violation_on(EMAIL_CONSTRAINT) {
                Error::BadRequest {
                    message: "Email already registered".to_string(),
                }
            } else {
                e.into()
            }
        })?;

    info!(user_id = %user.id, user_type = ?user.user_type, "account registered");
    state.notifier.notify(Notification::NewUserSignup {
        email: user.email.clone(),
        name: format!("{} {}", user.first_name, user.last_name),
        user_type: user.user_type,
    });

    let token = create_session_token(&user, &state.config.auth)?;
    Ok(Json(TokenResponse::bearer(token, UserResponse::from(user))))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    summary = "Log in",
    description = "OAuth2 password grant; `username` carries the account email",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Logged in", body = TokenResponse),
        (status = 401, description = "Incorrect email or password, or account disabled"),
    )
)]
pub async fn login(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Result<Json<TokenResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let user = Users::new(&mut conn).get_user_by_email(&form.username).await?;

    let Some(user) = user.filter(|user| password::verify_string(&form.password, &user.password_hash)) else {
        return Err(Error::Unauthenticated {
            message: "Incorrect email or password".to_string(),
        });
    };

    if !user.is_active {
        return Err(Error::Unauthenticated {
            message: "User account is disabled".to_string(),
        });
    }

    let token = create_session_token(&user, &state.config.auth)?;
    Ok(Json(TokenResponse::bearer(token, UserResponse::from(user))))
}

#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "auth",
    summary = "Current user",
    responses(
        (status = 200, description = "The authenticated account", body = UserResponse),
        (status = 401, description = "Not authenticated"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_me(
    State(state): State<AppState>,
    current_user: RequiresPermission<resource::Users, operation::ReadOwn>,
) -> Result<Json<UserResponse>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let user = Users::new(&mut conn)
        .get_by_id(current_user.id)
        .await?
        .ok_or_else(|| Error::NotFound {
            resource: "User".to_string(),
            id: current_user.id.to_string(),
        })?;

    Ok(Json(UserResponse::from(user)))
}

#[utoipa::path(
    put,
    path = "/auth/me",
    tag = "auth",
    summary = "Update current user",
    description = "Only the name and phone fields can be changed here",
    request_body = UserUpdate,
    responses(
        (status = 200, description = "Updated account", body = UserResponse),
        (status = 400, description = "No updatable field given"),
        (status = 401, description = "Not authenticated"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_me(
    State(state): State<AppState>,
    current_user: RequiresPermission<resource::Users, operation::UpdateOwn>,
    Json(update): Json<UserUpdate>,
) -> Result<Json<UserResponse>> {
    if update.is_empty() {
        return Err(Error::BadRequest {
            message: "No valid fields to update".to_string(),
        });
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let user = Users::new(&mut conn)
        .update(
            current_user.id,
            &UserUpdateDBRequest {
                first_name: update.first_name,
                last_name: update.last_name,
                phone: update.phone,
                ..Default::default()
            },
        )
        .await?;

    Ok(Json(UserResponse::from(user)))
}
