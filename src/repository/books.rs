//! Books repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookInput, TransferRequest},
};

/// Storage operations the books service depends on
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookStore: Send + Sync {
    async fn list(&self) -> AppResult<Vec<Book>>;
    async fn get_by_id(&self, id: i32) -> AppResult<Option<Book>>;
    async fn create(&self, input: &BookInput, owner_id: i32) -> AppResult<Book>;
    async fn update(&self, id: i32, input: &BookInput) -> AppResult<Option<Book>>;
    /// Returns false when no book has this id
    async fn delete(&self, id: i32) -> AppResult<bool>;
    async fn owner_id(&self, id: i32) -> AppResult<Option<i32>>;
    /// Move `pages` from one book to another in a single transaction
    async fn transfer_pages(&self, request: &TransferRequest) -> AppResult<()>;
}

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookStore for BooksRepository {
    async fn list(&self) -> AppResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>(
            "SELECT id, title, author, pages, owner_id FROM books ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(books)
    }

    async fn get_by_id(&self, id: i32) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(
            "SELECT id, title, author, pages, owner_id FROM books WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(book)
    }

    async fn create(&self, input: &BookInput, owner_id: i32) -> AppResult<Book> {
        let book = sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (title, author, pages, owner_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id, title, author, pages, owner_id
            "#,
        )
        .bind(&input.title)
        .bind(&input.author)
        .bind(input.pages)
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(book)
    }

    async fn update(&self, id: i32, input: &BookInput) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(
            r#"
            UPDATE books SET title = $1, author = $2, pages = $3
            WHERE id = $4
            RETURNING id, title, author, pages, owner_id
            "#,
        )
        .bind(&input.title)
        .bind(&input.author)
        .bind(input.pages)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(book)
    }

    async fn delete(&self, id: i32) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn owner_id(&self, id: i32) -> AppResult<Option<i32>> {
        let owner = sqlx::query_scalar::<_, i32>("SELECT owner_id FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(owner)
    }

    async fn transfer_pages(&self, request: &TransferRequest) -> AppResult<()> {
        // Dropping `tx` without commit (early return, cancelled future) rolls back
        let mut tx = self.pool.begin().await?;

        // Lock both rows in ascending id order so opposite-direction transfers
        // queue behind each other instead of deadlocking
        let locked = sqlx::query_scalar::<_, i32>(
            "SELECT id FROM books WHERE id = ANY($1) ORDER BY id FOR UPDATE",
        )
        .bind(vec![request.from_id, request.to_id])
        .fetch_all(&mut *tx)
        .await?;
        for id in [request.from_id, request.to_id] {
            if !locked.contains(&id) {
                return Err(AppError::NotFound(format!("Book with id {} not found", id)));
            }
        }

        let debited = sqlx::query("UPDATE books SET pages = pages - $1 WHERE id = $2")
            .bind(request.pages)
            .bind(request.from_id)
            .execute(&mut *tx)
            .await?;
        if debited.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Book with id {} not found",
                request.from_id
            )));
        }

        let credited = sqlx::query("UPDATE books SET pages = pages + $1 WHERE id = $2")
            .bind(request.pages)
            .bind(request.to_id)
            .execute(&mut *tx)
            .await?;
        if credited.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Book with id {} not found",
                request.to_id
            )));
        }

        tx.commit().await?;

        tracing::debug!(
            from_id = request.from_id,
            to_id = request.to_id,
            pages = request.pages,
            "Pages transferred"
        );

        Ok(())
    }
}
