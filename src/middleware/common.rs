//! Stages applied to every request regardless of route
//!
//! Request logging, panic recovery, CORS, transport-security headers and
//! user-agent logging. None of them depend on the caller's identity.

use async_trait::async_trait;
use axum::{
    extract::Request,
    http::{
        header::{
            ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
            ACCESS_CONTROL_ALLOW_ORIGIN, ORIGIN, STRICT_TRANSPORT_SECURITY, USER_AGENT, VARY,
        },
        HeaderValue, Method, StatusCode,
    },
    response::{IntoResponse, Response},
};
use futures_util::FutureExt;
use std::{any::Any, collections::HashSet, panic::AssertUnwindSafe, time::Instant};
use tracing::{debug, error, info, warn};

use super::{
    context::RequestContext,
    pipeline::{Next, Stage},
};
use crate::{config::CorsConfig, error::AppError};

const ANY_ORIGIN: &str = "*";
const DEFAULT_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
const DEFAULT_HEADERS: &str = "Content-Type, Authorization";
const HSTS_POLICY: &str = "max-age=31536000; includeSubDomains";

/// Logs the start and completion of each request with its latency
pub struct RequestLogging;

#[async_trait]
impl Stage for RequestLogging {
    async fn handle(&self, req: Request, next: Next<'_>) -> Response {
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let request_id = RequestContext::get(&req).map(|ctx| ctx.request_id());
        let start = Instant::now();

        debug!(method = %method, path = %path, request_id = ?request_id, "Started request");

        let response = next.run(req).await;

        let status = response.status().as_u16();
        let latency_ms = start.elapsed().as_millis();
        if status >= 500 {
            warn!(
                method = %method,
                path = %path,
                status,
                latency_ms,
                request_id = ?request_id,
                "Request failed (5xx)"
            );
        } else {
            info!(method = %method, path = %path, status, latency_ms, "Request completed");
        }

        response
    }
}

/// Turns a panic anywhere downstream into a generic 500
pub struct Recovery;

#[async_trait]
impl Stage for Recovery {
    async fn handle(&self, req: Request, next: Next<'_>) -> Response {
        let path = req.uri().path().to_string();
        match AssertUnwindSafe(next.run(req)).catch_unwind().await {
            Ok(response) => response,
            Err(payload) => {
                let panic = panic_message(payload.as_ref());
                error!(path = %path, panic = %panic, "Recovered from panic");
                AppError::Internal("handler panicked".to_string()).into_response()
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

enum AllowedOrigins {
    Any,
    List(HashSet<String>),
}

/// Cross-origin headers, with an empty 204 answer to `OPTIONS` requests
pub struct Cors {
    origins: AllowedOrigins,
    allow_methods: HeaderValue,
    allow_headers: HeaderValue,
}

impl Cors {
    /// Any origin, the usual REST methods
    pub fn permissive() -> Self {
        Self {
            origins: AllowedOrigins::Any,
            allow_methods: HeaderValue::from_static(DEFAULT_METHODS),
            allow_headers: HeaderValue::from_static(DEFAULT_HEADERS),
        }
    }

    /// Origins and methods from configuration; `"*"` among the origins allows any
    pub fn from_config(config: &CorsConfig) -> Self {
        let origins = if config.allowed_origins.iter().any(|o| o == ANY_ORIGIN) {
            AllowedOrigins::Any
        } else {
            AllowedOrigins::List(config.allowed_origins.iter().cloned().collect())
        };

        let mut methods: Vec<String> = config
            .allowed_methods
            .iter()
            .map(|m| m.trim().to_ascii_uppercase())
            .filter(|m| !m.is_empty())
            .collect();
        if !methods.iter().any(|m| m == Method::OPTIONS.as_str()) {
            methods.push(Method::OPTIONS.to_string());
        }
        let allow_methods = HeaderValue::from_str(&methods.join(", ")).unwrap_or_else(|_| {
            warn!("Invalid CORS method list, falling back to defaults");
            HeaderValue::from_static(DEFAULT_METHODS)
        });

        Self {
            origins,
            allow_methods,
            allow_headers: HeaderValue::from_static(DEFAULT_HEADERS),
        }
    }

    fn allow_origin(&self, origin: Option<&HeaderValue>) -> Option<HeaderValue> {
        match &self.origins {
            AllowedOrigins::Any => Some(HeaderValue::from_static(ANY_ORIGIN)),
            AllowedOrigins::List(allowed) => origin
                .filter(|value| {
                    value
                        .to_str()
                        .map(|origin| allowed.contains(origin))
                        .unwrap_or(false)
                })
                .cloned(),
        }
    }
}

#[async_trait]
impl Stage for Cors {
    async fn handle(&self, req: Request, next: Next<'_>) -> Response {
        let allow_origin = self.allow_origin(req.headers().get(ORIGIN));

        let mut response = if *req.method() == Method::OPTIONS {
            next.respond(StatusCode::NO_CONTENT.into_response())
        } else {
            next.run(req).await
        };

        let headers = response.headers_mut();
        if let Some(origin) = allow_origin {
            headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin);
        }
        if let AllowedOrigins::List(_) = self.origins {
            headers.append(VARY, HeaderValue::from_static("Origin"));
        }
        headers.insert(ACCESS_CONTROL_ALLOW_METHODS, self.allow_methods.clone());
        headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, self.allow_headers.clone());
        response
    }
}

/// Adds `Strict-Transport-Security` to every response
pub struct Hsts;

#[async_trait]
impl Stage for Hsts {
    async fn handle(&self, req: Request, next: Next<'_>) -> Response {
        let mut response = next.run(req).await;
        self.decorate(&mut response);
        response
    }

    fn decorate(&self, response: &mut Response) {
        response
            .headers_mut()
            .insert(STRICT_TRANSPORT_SECURITY, HeaderValue::from_static(HSTS_POLICY));
    }
}

/// Logs the caller's `User-Agent` header
pub struct UserAgentLog;

#[async_trait]
impl Stage for UserAgentLog {
    async fn handle(&self, req: Request, next: Next<'_>) -> Response {
        let user_agent = req
            .headers()
            .get(USER_AGENT)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("-");
        debug!(user_agent = %user_agent, "User-Agent");
        next.run(req).await
    }
}
