//! Rate-limit stage

use async_trait::async_trait;
use axum::{
    extract::Request,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::warn;

use super::{
    context::{RequestContext, UNKNOWN_CLIENT},
    pipeline::{Next, Stage},
};
use crate::{error::AppError, services::rate_limit::RateLimiter};

/// Refuses clients over their quota with 429 before anything else runs
pub struct RateLimit {
    limiter: Arc<dyn RateLimiter>,
}

impl RateLimit {
    pub fn new(limiter: Arc<dyn RateLimiter>) -> Self {
        Self { limiter }
    }
}

#[async_trait]
impl Stage for RateLimit {
    async fn handle(&self, req: Request, next: Next<'_>) -> Response {
        let client_id = RequestContext::get(&req)
            .map(|ctx| ctx.client_id().to_string())
            .unwrap_or_else(|| UNKNOWN_CLIENT.to_string());

        match self.limiter.admit(&client_id).await {
            Ok(true) => next.run(req).await,
            Ok(false) => {
                warn!(client_id = %client_id, path = %req.uri().path(), "Rate limit exceeded");
                AppError::RateLimited.into_response()
            }
            Err(e) => e.into_response(),
        }
    }
}
