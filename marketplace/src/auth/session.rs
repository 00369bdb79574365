//! Stateless bearer tokens (HS256 JWT).

use crate::{
    api::models::users::UserType, config::AuthConfig, db::models::users::UserDBResponse, errors::Error, types::UserId,
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// Account email
    pub sub: String,
    pub user_id: UserId,
    pub user_type: UserType,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn new(user: &UserDBResponse, config: &AuthConfig) -> Self {
        let now = Utc::now().timestamp();
        let lifetime = i64::try_from(config.token_lifetime.as_secs()).unwrap_or(i64::MAX);
        Self {
            sub: user.email.clone(),
            user_id: user.id,
            user_type: user.user_type,
            iat: now,
            exp: now.saturating_add(lifetime),
        }
    }
}

pub fn create_session_token(user: &UserDBResponse, config: &AuthConfig) -> Result<String, Error> {
    let claims = Claims::new(user, config);
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| Error::Internal {
        operation: format!("sign session token: {e}"),
    })
}

/// Decode and check signature and expiry
pub fn verify_session_token(token: &str, config: &AuthConfig) -> Result<Claims, Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.set_required_spec_claims(&["exp", "sub"]);

    decode::<Claims>(token, &DecodingKey::from_secret(config.jwt_secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!(error = %e, "rejected session token");
            Error::unauthenticated()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn user() -> UserDBResponse {
        UserDBResponse {
            id: uuid::Uuid::new_v4(),
            email: "pro@example.com".to_string(),
            password_hash: "x".to_string(),
            user_type: UserType::Professional,
            first_name: "Pat".to_string(),
            last_name: "Pro".to_string(),
            phone: None,
            is_active: true,
            is_verified: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret".to_string(),
            token_lifetime: Duration::from_secs(30 * 60),
        }
    }

    #[test]
    fn test_token_carries_identity() {
        let user = user();
        let token = create_session_token(&user, &config()).expect("Failed to sign");
        let claims = verify_session_token(&token, &config()).expect("Failed to verify");

        assert_eq!(claims.sub, user.email);
        assert_eq!(claims.user_id, user.id);
        assert_eq!(claims.user_type, UserType::Professional);
        assert_eq!(claims.exp - claims.iat, 30 * 60);
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = create_session_token(&user(), &config()).expect("Failed to sign");
        let other = AuthConfig {
            jwt_secret: "another-secret".to_string(),
            ..config()
        };
        let err = verify_session_token(&token, &other).expect_err("Should reject");
        assert!(matches!(err, Error::Unauthenticated { .. }));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let user = user();
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user.email.clone(),
            user_id: user.id,
            user_type: user.user_type,
            iat: now - 3600,
            exp: now - 60,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .expect("Failed to sign");

        assert!(verify_session_token(&token, &config()).is_err());
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(verify_session_token("not.a.jwt", &config()).is_err());
    }
}
