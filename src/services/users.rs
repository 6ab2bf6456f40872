//! Account registration, login and listing

use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::user::{LoginRequest, RegisterRequest, RegisteredUser, User},
    repository::UsersRepository,
    services::credentials,
};

const INVALID_CREDENTIALS: &str = "Invalid email or password";

#[derive(Clone)]
pub struct UsersService {
    repository: UsersRepository,
    signing_key: Arc<str>,
}

impl UsersService {
    pub fn new(repository: UsersRepository, signing_key: impl Into<Arc<str>>) -> Self {
        Self {
            repository,
            signing_key: signing_key.into(),
        }
    }

    /// Create an account with the default role
    pub async fn register(&self, request: RegisterRequest) -> AppResult<RegisteredUser> {
        let (email, password) = normalize_registration(request)?;

        if self.repository.email_exists(&email).await? {
            return Err(AppError::Conflict("Email is already registered".to_string()));
        }

        let digest = credentials::hash_secret(&password)?;
        let user = self
            .repository
            .create(&email, &digest)
            .await
            .map_err(|e| match e {
                // Lost a race with a concurrent registration of the same email
                AppError::Database(sqlx::Error::Database(ref db)) if db.is_unique_violation() => {
                    AppError::Conflict("Email is already registered".to_string())
                }
                other => other,
            })?;

        tracing::info!(user_id = user.id, "User registered");
        Ok(RegisteredUser {
            id: user.id,
            email: user.email,
        })
    }

    /// Check credentials and issue a session token.
    ///
    /// Unknown email and wrong password give the same error after the same work.
    pub async fn login(&self, request: LoginRequest) -> AppResult<String> {
        let user = match self.repository.get_by_email(&request.email).await? {
            Some(user) => user,
            None => {
                credentials::verify_against_dummy(&request.password);
                return Err(AppError::Authentication(INVALID_CREDENTIALS.to_string()));
            }
        };

        if !credentials::verify_secret(&request.password, &user.password) {
            tracing::warn!(user_id = user.id, "Failed login attempt");
            return Err(AppError::Authentication(INVALID_CREDENTIALS.to_string()));
        }

        credentials::issue_token(user.id, &user.role, &self.signing_key)
    }

    pub async fn list(&self) -> AppResult<Vec<User>> {
        self.repository.list().await
    }
}

fn normalize_registration(request: RegisterRequest) -> AppResult<(String, String)> {
    let email = request.email.trim().to_string();
    let password = request.password.trim().to_string();
    if email.is_empty() || password.is_empty() {
        return Err(AppError::Validation(
            "Email and password are required".to_string(),
        ));
    }
    Ok((email, password))
}
