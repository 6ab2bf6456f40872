//! Data models for BookAPI

pub mod book;
pub mod user;

pub use book::{Book, BookInput, TransferRequest};
pub use user::{LoginRequest, RegisterRequest, RegisteredUser, Role, User};
