//! Password hashing and session tokens
//!
//! Passwords are stored as argon2 PHC strings with an embedded random salt.
//! Session tokens are HS256 JWTs carrying `user_id`, `user_role`, `iat` and an
//! `exp` 24 hours after issue. Nothing is stored server-side: a token is valid
//! as long as its signature checks out and it has not expired.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    error::{AppError, AppResult},
    models::Role,
};

pub const USER_ID_CLAIM: &str = "user_id";
pub const USER_ROLE_CLAIM: &str = "user_role";

const TOKEN_LIFETIME_HOURS: i64 = 24;

/// Claim set of a verified token, as decoded (not yet interpreted)
pub type TokenClaims = Map<String, Value>;

/// Claims written into every issued token
#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    user_id: i32,
    user_role: String,
    iat: i64,
    exp: i64,
}

/// Digest used to spend the same effort when there is nothing real to check
static DUMMY_DIGEST: Lazy<Option<String>> =
    Lazy::new(|| hash_secret("correct horse battery staple").ok());

/// Hash a password using Argon2 with a fresh random salt
pub fn hash_secret(plaintext: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

/// Check a password against a stored digest.
///
/// A digest that does not parse yields `false` after the same amount of work
/// as a real comparison.
pub fn verify_secret(plaintext: &str, digest: &str) -> bool {
    match PasswordHash::new(digest) {
        Ok(parsed) => Argon2::default()
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => {
            verify_against_dummy(plaintext);
            false
        }
    }
}

/// Run a full verification whose result is thrown away
pub fn verify_against_dummy(plaintext: &str) {
    if let Some(parsed) = DUMMY_DIGEST.as_deref().and_then(|d| PasswordHash::new(d).ok()) {
        let _ = Argon2::default().verify_password(plaintext.as_bytes(), &parsed);
    }
}

/// Issue a signed session token valid for 24 hours
pub fn issue_token(user_id: i32, role: &Role, signing_key: &str) -> AppResult<String> {
    let now = Utc::now();
    let claims = SessionClaims {
        user_id,
        user_role: role.as_str().to_string(),
        iat: now.timestamp(),
        exp: (now + Duration::hours(TOKEN_LIFETIME_HOURS)).timestamp(),
    };
    sign(&claims, signing_key)
}

fn sign<T: Serialize>(claims: &T, signing_key: &str) -> AppResult<String> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(signing_key.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
}

/// Verify signature and expiry, returning the raw claim set.
///
/// Whitespace anywhere in `token` is dropped before parsing.
pub fn verify_token(
    token: &str,
    signing_key: &str,
) -> Result<TokenClaims, jsonwebtoken::errors::Error> {
    let compact: String = token.split_whitespace().collect();
    let data = decode::<TokenClaims>(
        &compact,
        &DecodingKey::from_secret(signing_key.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}
