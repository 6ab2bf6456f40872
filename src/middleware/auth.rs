//! Bearer-token authentication stage

use async_trait::async_trait;
use axum::{
    extract::Request,
    http::{header::AUTHORIZATION, HeaderMap},
    response::{IntoResponse, Response},
};
use serde_json::Value;
use std::sync::Arc;

use super::{
    context::{Identity, RequestContext},
    pipeline::{Next, Stage},
};
use crate::{
    error::{AppError, AppResult},
    models::Role,
    services::credentials::{self, TokenClaims, USER_ID_CLAIM, USER_ROLE_CLAIM},
};

const BEARER_SCHEME: &str = "Bearer";

/// Verifies the session token and attaches the caller's [`Identity`]
pub struct Authenticate {
    signing_key: Arc<str>,
}

impl Authenticate {
    pub fn new(signing_key: impl Into<Arc<str>>) -> Self {
        Self {
            signing_key: signing_key.into(),
        }
    }
}

#[async_trait]
impl Stage for Authenticate {
    async fn handle(&self, mut req: Request, next: Next<'_>) -> Response {
        match authenticate(req.headers(), &self.signing_key) {
            Ok(identity) => {
                tracing::debug!(user_id = identity.user_id, role = %identity.role, "Authenticated");
                RequestContext::attach_identity(&mut req, identity);
                next.run(req).await
            }
            Err(e) => e.into_response(),
        }
    }
}

/// Resolve the caller from the `Authorization` header
pub fn authenticate(headers: &HeaderMap, signing_key: &str) -> AppResult<Identity> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix(BEARER_SCHEME))
        .ok_or_else(|| AppError::Authentication("Unauthorized".to_string()))?;

    let claims = credentials::verify_token(token, signing_key)
        .map_err(|_| AppError::Authentication("Invalid or expired token".to_string()))?;

    identity_from_claims(&claims)
}

fn identity_from_claims(claims: &TokenClaims) -> AppResult<Identity> {
    let user_id = claims
        .get(USER_ID_CLAIM)
        .ok_or_else(|| missing_claim(USER_ID_CLAIM))?;
    let role = claims
        .get(USER_ROLE_CLAIM)
        .ok_or_else(|| missing_claim(USER_ROLE_CLAIM))?;

    let user_id = claim_as_id(user_id).ok_or_else(|| malformed_claim(USER_ID_CLAIM))?;
    let role = role.as_str().ok_or_else(|| malformed_claim(USER_ROLE_CLAIM))?;

    Ok(Identity {
        user_id,
        role: Role::from(role),
    })
}

/// Integer id, also accepted as a whole-valued float
fn claim_as_id(value: &Value) -> Option<i32> {
    match value.as_i64() {
        Some(id) => i32::try_from(id).ok(),
        None => value
            .as_f64()
            .filter(|f| f.fract() == 0.0 && *f >= i32::MIN as f64 && *f <= i32::MAX as f64)
            .map(|f| f as i32),
    }
}

fn missing_claim(name: &str) -> AppError {
    AppError::Authentication(format!("Missing {} in token", name))
}

fn malformed_claim(name: &str) -> AppError {
    AppError::Authentication(format!("Malformed {} in token", name))
}
