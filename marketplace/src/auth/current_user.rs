use crate::{
    api::models::users::CurrentUser,
    auth::session::verify_session_token,
    db::handlers::{Repository, Users},
    errors::Error,
    AppState,
};
use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts},
    http::{header, request::Parts},
};
use tracing::{debug, instrument};

/// Pull the token out of an `Authorization: Bearer <token>` header
fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() {
        Some(token.trim())
    } else {
        None
    }
}

/// Resolve a token to a live account. Deleted and deactivated accounts are
/// rejected even while their tokens are unexpired.
#[instrument(skip_all, err)]
async fn authenticate(token: &str, state: &AppState) -> Result<CurrentUser, Error> {
    let claims = verify_session_token(token, &state.config.auth)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let user = Users::new(&mut conn).get_by_id(claims.user_id).await?;

    match user {
        Some(user) if user.is_active => Ok(CurrentUser::from(user)),
        Some(_) => {
            debug!(user_id = %claims.user_id, "token for inactive account");
            Err(Error::unauthenticated())
        }
        None => {
            debug!(user_id = %claims.user_id, "token for unknown account");
            Err(Error::unauthenticated())
        }
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or_else(|| Error::Unauthenticated {
            message: "Not authenticated".to_string(),
        })?;
        authenticate(token, state).await
    }
}

/// Optional authentication: no token, or a token that does not resolve to
/// a live account, means an anonymous caller.
impl OptionalFromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Option<Self>, Self::Rejection> {
        let Some(token) = bearer_token(parts) else {
            return Ok(None);
        };

        match authenticate(token, state).await {
            Ok(user) => Ok(Some(user)),
            Err(Error::Unauthenticated { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
