//! Request-scoped context shared by the stages of one request

use axum::extract::{ConnectInfo, Request};
use std::net::SocketAddr;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::Role,
};

/// Client identifier used when the peer address is not available
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Verified caller, attached by the authentication stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: i32,
    pub role: Role,
}

/// Per-request state carried in the request extensions.
///
/// Created by the first pipeline that sees the request. `identity` stays
/// `None` until the authentication stage has verified a token.
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: Uuid,
    client_id: String,
    identity: Option<Identity>,
}

impl RequestContext {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            client_id: client_id.into(),
            identity: None,
        }
    }

    /// Build a fresh context, keyed on the peer IP when the server exposes it
    pub fn for_request(req: &Request) -> Self {
        let client_id = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| UNKNOWN_CLIENT.to_string());
        Self::new(client_id)
    }

    /// Insert a fresh context into `req` unless one exists already
    pub fn ensure(req: &mut Request) {
        if req.extensions().get::<RequestContext>().is_none() {
            let ctx = Self::for_request(req);
            req.extensions_mut().insert(ctx);
        }
    }

    /// Record the verified caller on `req`
    pub(crate) fn attach_identity(req: &mut Request, identity: Identity) {
        match req.extensions_mut().get_mut::<RequestContext>() {
            Some(ctx) => ctx.identity = Some(identity),
            None => {
                let mut ctx = Self::for_request(req);
                ctx.identity = Some(identity);
                req.extensions_mut().insert(ctx);
            }
        }
    }

    pub fn get(req: &Request) -> Option<&RequestContext> {
        req.extensions().get::<RequestContext>()
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Identity of the caller, or 401 when the request is not authenticated
    pub fn require_identity(&self) -> AppResult<&Identity> {
        self.identity
            .as_ref()
            .ok_or_else(|| AppError::Authentication("Unauthorized".to_string()))
    }
}

/// Identity attached to `req`, or 401
pub fn require_identity(req: &Request) -> AppResult<Identity> {
    RequestContext::get(req)
        .ok_or_else(|| AppError::Authentication("Unauthorized".to_string()))?
        .require_identity()
        .cloned()
}
