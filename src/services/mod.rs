//! Business logic services

pub mod books;
pub mod credentials;
pub mod rate_limit;
pub mod redis;
pub mod users;

use std::{sync::Arc, time::Duration};

use crate::{
    config::{AppConfig, RateLimitBackend, RateLimitConfig},
    error::{AppError, AppResult},
    repository::Repository,
};

use rate_limit::{RateLimiter, WindowRateLimiter};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub users: users::UsersService,
    pub books: Arc<books::BooksService>,
    pub rate_limiter: Arc<dyn RateLimiter>,
}

impl Services {
    /// Create all services with the given repository
    pub async fn new(repository: Repository, config: &AppConfig) -> AppResult<Self> {
        let rate_limiter = build_rate_limiter(&config.rate_limit).await?;

        Ok(Self {
            users: users::UsersService::new(
                repository.users.clone(),
                config.auth.jwt_secret.as_str(),
            ),
            books: Arc::new(books::BooksService::new(Arc::new(repository.books))),
            rate_limiter,
        })
    }
}

/// Pick the limiter implementation named in configuration
pub async fn build_rate_limiter(config: &RateLimitConfig) -> AppResult<Arc<dyn RateLimiter>> {
    match config.backend {
        RateLimitBackend::Memory => {
            tracing::info!("Using in-process rate limiter");
            Ok(Arc::new(WindowRateLimiter::new()))
        }
        RateLimitBackend::Redis => {
            // EXPIRE with 0 deletes the counter, which would admit everything
            if config.period_secs == 0 {
                return Err(AppError::Internal(
                    "rate_limit.period_secs must be at least 1".to_string(),
                ));
            }
            let limiter = redis::RedisRateLimiter::connect(
                &config.redis_url,
                config.limit,
                Duration::from_secs(config.period_secs),
            )
            .await?;
            tracing::info!(
                limit = config.limit,
                period_secs = config.period_secs,
                "Using Redis rate limiter"
            );
            Ok(Arc::new(limiter))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_zero_redis_period_is_rejected_before_connecting() {
        let config = RateLimitConfig {
            backend: RateLimitBackend::Redis,
            redis_url: "redis://127.0.0.1:1".to_string(),
            period_secs: 0,
            ..RateLimitConfig::default()
        };

        match build_rate_limiter(&config).await {
            Err(AppError::Internal(message)) => assert!(message.contains("period_secs")),
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("zero period accepted"),
        }
    }

    #[tokio::test]
    async fn test_memory_backend_ignores_period() {
        let config = RateLimitConfig {
            backend: RateLimitBackend::Memory,
            period_secs: 0,
            ..RateLimitConfig::default()
        };

        let limiter = build_rate_limiter(&config).await.unwrap();
        assert!(limiter.admit("10.0.0.1").await.unwrap());
    }
}
