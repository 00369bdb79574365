//! Argon2id password hashing in PHC string format.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

/// Hash a password with a fresh random salt
pub fn hash_string(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Check a password against a stored hash. A malformed hash never verifies.
pub fn verify_string(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok(),
        Err(e) => {
            tracing::warn!(error = %e, "stored password hash is malformed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_string("hunter22").expect("Failed to hash");
        assert!(hash.starts_with("$argon2"));
        assert!(verify_string("hunter22", &hash));
        assert!(!verify_string("hunter23", &hash));
    }

    #[test]
    fn test_salts_differ() {
        let a = hash_string("same").expect("Failed to hash");
        let b = hash_string("same").expect("Failed to hash");
        assert_ne!(a, b);
    }

    #[test]
    fn test_malformed_hash_rejects() {
        assert!(!verify_string("anything", "not-a-phc-string"));
    }
}
