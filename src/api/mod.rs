//! HTTP handlers and router assembly

pub mod admin;
pub mod auth;
pub mod books;
pub mod health;

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Path, Request},
    http::request::Parts,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::{
    error::AppError,
    middleware::{
        Authenticate, Cors, Hsts, Identity, OwnerLookup, Pipeline, RateLimit, Recovery,
        RequestContext, RequestLogging, RequireOwner, RequireOwnerOrRole, RequireRole,
        UserAgentLog,
    },
    models::Role,
    AppState,
};

/// Success envelope
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub data: T,
    pub meta: Option<Value>,
}

impl<T> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data, meta: None }
    }
}

/// Identity of the authenticated caller, as attached by the authentication stage
pub struct CurrentUser(pub Identity);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let identity = parts
            .extensions
            .get::<RequestContext>()
            .ok_or_else(|| AppError::Authentication("Unauthorized".to_string()))?
            .require_identity()?
            .clone();
        Ok(CurrentUser(identity))
    }
}

/// Integer `:id` route parameter; anything else is a 400
pub struct PathId(pub i32);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for PathId {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<i32>::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::BadRequest("Invalid ID".to_string()))?;
        Ok(PathId(id))
    }
}

/// JSON body whose decoding failures use the error envelope
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await.map_err(|e| {
            tracing::debug!("Rejected request body: {}", e);
            AppError::BadRequest("Invalid input".to_string())
        })?;
        Ok(JsonBody(value))
    }
}

/// Global stages wrapping every route, outermost first
pub fn global_pipeline(state: &AppState) -> Pipeline {
    Pipeline::new()
        .with(RequestLogging)
        .with(Recovery)
        .with(RateLimit::new(Arc::clone(&state.services.rate_limiter)))
        .with(Cors::from_config(&state.config.cors))
        .with(Hsts)
        .with(UserAgentLog)
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    let signing_key = state.config.auth.jwt_secret.as_str();
    let book_owners: Arc<dyn OwnerLookup> = state.services.books.clone();
    let admin_only = || RequireRole::new([Role::Admin]);

    let public = Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let admin = Router::new()
        .route("/admin/users", get(admin::list_users))
        .route("/admin/profile", get(admin::profile))
        .route_layer(
            Pipeline::new()
                .with(Authenticate::new(signing_key))
                .with(admin_only())
                .layer(),
        );

    let books = Router::new()
        .route("/books", get(books::list_books).post(books::create_book))
        .route(
            "/books/transfer",
            post(books::transfer_pages).route_layer(Pipeline::new().with(admin_only()).layer()),
        )
        .route(
            "/books/:id",
            get(books::get_book)
                .merge(
                    put(books::update_book).route_layer(
                        Pipeline::new()
                            .with(RequireOwnerOrRole::new(
                                "id",
                                Arc::clone(&book_owners),
                                [Role::Admin],
                            ))
                            .layer(),
                    ),
                )
                .merge(
                    delete(books::delete_book).route_layer(
                        Pipeline::new()
                            .with(RequireOwner::new("id", book_owners))
                            .with(admin_only())
                            .layer(),
                    ),
                ),
        )
        .route_layer(Pipeline::new().with(Authenticate::new(signing_key)).layer());

    let global = global_pipeline(&state);

    Router::new()
        .merge(public)
        .merge(admin)
        .merge(books)
        .layer(global.layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
