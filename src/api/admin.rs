//! Administrator endpoints

use axum::{extract::State, Json};

use super::{ApiResponse, CurrentUser};
use crate::{error::AppResult, models::user::User, AppState};

/// List every account
pub async fn list_users(State(state): State<AppState>) -> AppResult<Json<ApiResponse<Vec<User>>>> {
    let users = state.services.users.list().await?;
    Ok(Json(ApiResponse::new(users)))
}

pub async fn profile(CurrentUser(identity): CurrentUser) -> String {
    format!("Welcome user {}", identity.user_id)
}
