//! Request pipeline: stages, their composer and the shared request context
//!
//! Global order, outermost first:
//!
//! 1. [`RequestLogging`]
//! 2. [`Recovery`]
//! 3. [`RateLimit`]
//! 4. [`Cors`] and [`Hsts`]
//! 5. [`UserAgentLog`]
//!
//! Protected routes add [`Authenticate`] followed by one of the
//! authorization stages.

pub mod auth;
pub mod authorize;
pub mod common;
pub mod context;
pub mod pipeline;
pub mod rate_limit;

pub use auth::Authenticate;
pub use authorize::{OwnerLookup, RequireOwner, RequireOwnerOrRole, RequireRole, RoleSet};
pub use common::{Cors, Hsts, Recovery, RequestLogging, UserAgentLog};
pub use context::{Identity, RequestContext};
pub use pipeline::{Next, Pipeline, PipelineLayer, Stage};
pub use rate_limit::RateLimit;
