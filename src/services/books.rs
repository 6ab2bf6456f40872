//! Book catalog service

use async_trait::async_trait;
use std::sync::Arc;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    middleware::{OwnerLookup, RequestContext},
    models::book::{Book, BookInput, TransferRequest},
    repository::BookStore,
};

#[derive(Clone)]
pub struct BooksService {
    store: Arc<dyn BookStore>,
}

impl BooksService {
    pub fn new(store: Arc<dyn BookStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> AppResult<Vec<Book>> {
        self.store.list().await
    }

    pub async fn get(&self, id: i32) -> AppResult<Book> {
        self.store
            .get_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Book not found".to_string()))
    }

    /// Create a book owned by `owner_id`
    pub async fn create(&self, input: BookInput, owner_id: i32) -> AppResult<Book> {
        input.validate()?;
        let book = self.store.create(&input, owner_id).await?;
        tracing::info!(book_id = book.id, owner_id, "Book created");
        Ok(book)
    }

    pub async fn update(&self, id: i32, input: BookInput) -> AppResult<Book> {
        input.validate()?;
        self.store
            .update(id, &input)
            .await?
            .ok_or_else(|| AppError::NotFound("Book not found".to_string()))
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        if !self.store.delete(id).await? {
            return Err(AppError::NotFound("Book not found".to_string()));
        }
        tracing::info!(book_id = id, "Book deleted");
        Ok(())
    }

    /// Move pages between two books atomically.
    ///
    /// The source may end up with negative pages, and a book may transfer to itself.
    pub async fn transfer(&self, request: TransferRequest) -> AppResult<TransferRequest> {
        request.validate()?;
        self.store.transfer_pages(&request).await?;
        Ok(request)
    }
}

#[async_trait]
impl OwnerLookup for BooksService {
    async fn owner_of(&self, ctx: &RequestContext, resource_id: i32) -> AppResult<i32> {
        tracing::debug!(
            request_id = %ctx.request_id(),
            book_id = resource_id,
            "Looking up book owner"
        );
        self.store
            .owner_id(resource_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Book not found".to_string()))
    }
}
