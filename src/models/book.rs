//! Book model and related types

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Book record from database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub pages: i32,
    /// Set once at creation, never exposed
    #[serde(skip_serializing, default)]
    pub owner_id: i32,
}

/// Create or replace book request
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct BookInput {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "Author is required"))]
    pub author: String,
    #[validate(range(min = 1, message = "Pages must be greater than 0"))]
    pub pages: i32,
}

/// Move pages from one book to another
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct TransferRequest {
    #[validate(range(min = 1, message = "Sender Book ID is invalid"))]
    pub from_id: i32,
    #[validate(range(min = 1, message = "Receiver Book ID is invalid"))]
    pub to_id: i32,
    #[validate(range(min = 0, message = "Pages must be greater or equal to 0"))]
    pub pages: i32,
}
