//! Registration and login endpoints

use axum::{extract::State, http::StatusCode, Json};

use super::{ApiResponse, JsonBody};
use crate::{
    error::AppResult,
    models::user::{LoginRequest, RegisterRequest, RegisteredUser},
    AppState,
};

/// Create an account
pub async fn register(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<RegisterRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<RegisteredUser>>)> {
    let user = state.services.users.register(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::new(user))))
}

/// Exchange credentials for a session token
pub async fn login(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<LoginRequest>,
) -> AppResult<Json<ApiResponse<String>>> {
    let token = state.services.users.login(request).await?;
    Ok(Json(ApiResponse::new(token)))
}
