//! Redis-backed rate limiter for multi-instance deployments

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client};
use std::time::Duration;

use crate::{
    error::{AppError, AppResult},
    services::rate_limit::RateLimiter,
};

const KEY_PREFIX: &str = "ratelimit";

/// Fixed quota per period: the first request of a period creates a counter
/// that expires after `period`; requests beyond `limit` are refused until then.
#[derive(Clone)]
pub struct RedisRateLimiter {
    conn: ConnectionManager,
    limit: u64,
    period: Duration,
}

impl RedisRateLimiter {
    /// Connect to Redis and check the connection
    pub async fn connect(url: &str, limit: u64, period: Duration) -> AppResult<Self> {
        let client = Client::open(url)
            .map_err(|e| AppError::Internal(format!("Failed to create Redis client: {}", e)))?;

        let mut conn = ConnectionManager::new(client)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to connect to Redis: {}", e)))?;

        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map_err(|e| AppError::Internal(format!("Redis connection test failed: {}", e)))?;

        Ok(Self { conn, limit, period })
    }

    fn key(client_id: &str) -> String {
        format!("{}:{}", KEY_PREFIX, client_id)
    }
}

#[async_trait]
impl RateLimiter for RedisRateLimiter {
    async fn admit(&self, client_id: &str) -> AppResult<bool> {
        let mut conn = self.conn.clone();
        let key = Self::key(client_id);

        let (count, ttl): (u64, i64) = redis::pipe()
            .atomic()
            .incr(&key, 1u64)
            .ttl(&key)
            .query_async(&mut conn)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to count request in Redis: {}", e)))?;

        // No expiry yet: this request opened the period
        if ttl < 0 {
            conn.expire::<_, ()>(&key, self.period.as_secs() as i64)
                .await
                .map_err(|e| {
                    AppError::Internal(format!("Failed to set rate limit period in Redis: {}", e))
                })?;
        }

        Ok(count <= self.limit)
    }
}
