//! argon2 password hashing, run on the blocking pool.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};

use crate::error::SecurityError;

/// Hash a password into a PHC string.
pub async fn hash_password(password: &str) -> Result<String, SecurityError> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| SecurityError::PasswordHash(e.to_string()))
    })
    .await
    .map_err(|e| SecurityError::PasswordHash(e.to_string()))?
}

/// Check a password against a stored PHC string. Malformed hashes never verify.
pub async fn verify_password(password: &str, hash: &str) -> bool {
    let password = password.to_string();
    let hash = hash.to_string();
    tokio::task::spawn_blocking(move || {
        let Ok(parsed) = PasswordHash::new(&hash) else {
            tracing::warn!("Stored password hash is malformed");
            return false;
        };
        Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok()
    })
    .await
    .unwrap_or(false)
}
