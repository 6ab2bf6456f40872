//! Book endpoints

use axum::{extract::State, http::StatusCode, Json};

use super::{ApiResponse, CurrentUser, JsonBody, PathId};
use crate::{
    error::AppResult,
    models::book::{Book, BookInput, TransferRequest},
    AppState,
};

pub async fn list_books(State(state): State<AppState>) -> AppResult<Json<ApiResponse<Vec<Book>>>> {
    let books = state.services.books.list().await?;
    Ok(Json(ApiResponse::new(books)))
}

/// Create a book owned by the caller
pub async fn create_book(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    JsonBody(input): JsonBody<BookInput>,
) -> AppResult<(StatusCode, Json<ApiResponse<Book>>)> {
    let book = state.services.books.create(input, identity.user_id).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::new(book))))
}

pub async fn get_book(
    State(state): State<AppState>,
    PathId(id): PathId,
) -> AppResult<Json<ApiResponse<Book>>> {
    let book = state.services.books.get(id).await?;
    Ok(Json(ApiResponse::new(book)))
}

pub async fn update_book(
    State(state): State<AppState>,
    PathId(id): PathId,
    JsonBody(input): JsonBody<BookInput>,
) -> AppResult<Json<ApiResponse<Book>>> {
    let book = state.services.books.update(id, input).await?;
    Ok(Json(ApiResponse::new(book)))
}

pub async fn delete_book(
    State(state): State<AppState>,
    PathId(id): PathId,
) -> AppResult<StatusCode> {
    state.services.books.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Move pages from one book to another; echoes the request on success
pub async fn transfer_pages(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<TransferRequest>,
) -> AppResult<Json<ApiResponse<TransferRequest>>> {
    let transferred = state.services.books.transfer(request).await?;
    Ok(Json(ApiResponse::new(transferred)))
}
