//! Role and ownership authorization stages
//!
//! All of them read the [`Identity`] attached by
//! [`Authenticate`](super::auth::Authenticate) and must run after it.

use async_trait::async_trait;
use axum::{
    extract::{RawPathParams, Request},
    http::request::Parts,
    response::{IntoResponse, Response},
    RequestPartsExt,
};
use std::{collections::HashSet, sync::Arc};

use super::{
    context::{Identity, RequestContext},
    pipeline::{Next, Stage},
};
use crate::{
    error::{AppError, AppResult},
    models::Role,
};

/// Resolves who owns a resource, supplied by the resource's service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OwnerLookup: Send + Sync {
    /// Owner's user id, or an error when the resource or its owner cannot be read
    async fn owner_of(&self, ctx: &RequestContext, resource_id: i32) -> AppResult<i32>;
}

/// Allow-list of roles
#[derive(Debug, Clone, Default)]
pub struct RoleSet(HashSet<Role>);

impl RoleSet {
    pub fn new(roles: impl IntoIterator<Item = Role>) -> Self {
        Self(roles.into_iter().collect())
    }

    pub fn contains(&self, role: &Role) -> bool {
        self.0.contains(role)
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
        Self::new(iter)
    }
}

pub fn check_role(identity: &Identity, allowed: &RoleSet) -> AppResult<()> {
    if identity.role.as_str().is_empty() {
        return Err(AppError::Authorization(
            "Forbidden: no role provided".to_string(),
        ));
    }
    if !allowed.contains(&identity.role) {
        return Err(AppError::Authorization(
            "Forbidden: insufficient role".to_string(),
        ));
    }
    Ok(())
}

/// Any lookup failure, missing resource included, is a server-side fault
pub async fn check_owner(
    lookup: &dyn OwnerLookup,
    ctx: &RequestContext,
    identity: &Identity,
    resource_id: i32,
) -> AppResult<()> {
    let owner_id = lookup
        .owner_of(ctx, resource_id)
        .await
        .map_err(|e| AppError::OwnershipUnverified(e.to_string()))?;

    if owner_id != identity.user_id {
        tracing::debug!(
            user_id = identity.user_id,
            owner_id,
            resource_id,
            "Ownership check failed"
        );
        return Err(AppError::Authorization("Forbidden: not owner".to_string()));
    }
    Ok(())
}

fn caller(parts: &Parts) -> AppResult<(RequestContext, Identity)> {
    let ctx = parts
        .extensions
        .get::<RequestContext>()
        .ok_or_else(|| AppError::Authentication("Unauthorized".to_string()))?;
    let identity = ctx.require_identity()?.clone();
    Ok((ctx.clone(), identity))
}

/// Integer value of the route parameter `name`
async fn resource_id(parts: &mut Parts, name: &str) -> AppResult<i32> {
    let invalid = || AppError::BadRequest("Invalid ID".to_string());
    let params = parts
        .extract::<RawPathParams>()
        .await
        .map_err(|_| invalid())?;
    params
        .iter()
        .find(|(key, _)| *key == name)
        .and_then(|(_, value)| value.parse::<i32>().ok())
        .ok_or_else(invalid)
}

/// Admits only callers whose role is in the allow-list
pub struct RequireRole {
    allowed: RoleSet,
}

impl RequireRole {
    pub fn new(allowed: impl IntoIterator<Item = Role>) -> Self {
        Self {
            allowed: RoleSet::new(allowed),
        }
    }
}

#[async_trait]
impl Stage for RequireRole {
    async fn handle(&self, req: Request, next: Next<'_>) -> Response {
        let decision = RequestContext::get(&req)
            .ok_or_else(|| AppError::Authentication("Unauthorized".to_string()))
            .and_then(|ctx| ctx.require_identity().cloned())
            .and_then(|identity| check_role(&identity, &self.allowed));

        match decision {
            Ok(()) => next.run(req).await,
            Err(e) => e.into_response(),
        }
    }
}

/// Admits only the owner of the resource named by a route parameter
pub struct RequireOwner {
    param: &'static str,
    lookup: Arc<dyn OwnerLookup>,
}

impl RequireOwner {
    pub fn new(param: &'static str, lookup: Arc<dyn OwnerLookup>) -> Self {
        Self { param, lookup }
    }

    async fn decide(&self, parts: &mut Parts) -> AppResult<()> {
        let (ctx, identity) = caller(parts)?;
        let id = resource_id(parts, self.param).await?;
        check_owner(self.lookup.as_ref(), &ctx, &identity, id).await
    }
}

#[async_trait]
impl Stage for RequireOwner {
    async fn handle(&self, req: Request, next: Next<'_>) -> Response {
        let (mut parts, body) = req.into_parts();
        let decision = self.decide(&mut parts).await;
        match decision {
            Ok(()) => next.run(Request::from_parts(parts, body)).await,
            Err(e) => e.into_response(),
        }
    }
}

/// Admits callers with an allowed role, otherwise falls back to ownership.
///
/// The owner lookup is skipped entirely when the role already admits.
pub struct RequireOwnerOrRole {
    allowed: RoleSet,
    owner: RequireOwner,
}

impl RequireOwnerOrRole {
    pub fn new(
        param: &'static str,
        lookup: Arc<dyn OwnerLookup>,
        allowed: impl IntoIterator<Item = Role>,
    ) -> Self {
        Self {
            allowed: RoleSet::new(allowed),
            owner: RequireOwner::new(param, lookup),
        }
    }

    async fn decide(&self, parts: &mut Parts) -> AppResult<()> {
        let (_, identity) = caller(parts)?;
        if check_role(&identity, &self.allowed).is_ok() {
            return Ok(());
        }
        self.owner.decide(parts).await
    }
}

#[async_trait]
impl Stage for RequireOwnerOrRole {
    async fn handle(&self, req: Request, next: Next<'_>) -> Response {
        let (mut parts, body) = req.into_parts();
        let decision = self.decide(&mut parts).await;
        match decision {
            Ok(()) => next.run(Request::from_parts(parts, body)).await,
            Err(e) => e.into_response(),
        }
    }
}
