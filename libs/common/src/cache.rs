//! Redis-backed key/value cache
//!
//! The service uses Redis as the session backend: values are written with a
//! TTL, and the TTL can be reset in place to implement idle expiry.

use anyhow::Result;
use redis::{AsyncCommands, Client};
use tracing::info;

/// Configuration for the Redis connection
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis connection URL (e.g., "redis://localhost:6379")
    pub url: String,
}

impl RedisConfig {
    /// Create a new RedisConfig from environment variables
    ///
    /// # Environment Variables
    /// - `REDIS_URL`: Redis connection URL (default: "redis://localhost:6379")
    pub fn from_env() -> Result<Self> {
        let url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());

        Ok(RedisConfig { url })
    }
}

/// Handle to the Redis server
///
/// The underlying client hands out multiplexed connections, so this is cheap
/// to clone and share across handlers.
#[derive(Clone)]
pub struct RedisPool {
    client: Client,
}

impl RedisPool {
    /// Open a client against the configured Redis server
    pub async fn new(config: &RedisConfig) -> Result<Self> {
        let client = Client::open(config.url.clone())?;
        info!("Redis client initialized with URL: {}", config.url);
        Ok(RedisPool { client })
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection> {
        let conn = self.client.get_multiplexed_async_connection().await?;
        Ok(conn)
    }

    /// Store a value, optionally with a TTL in seconds
    pub async fn set(&self, key: &str, value: &str, ttl_seconds: Option<u64>) -> Result<()> {
        let mut conn = self.connection().await?;

        if let Some(ttl) = ttl_seconds {
            let _: () = conn.set_ex(key, value, ttl).await?;
        } else {
            let _: () = conn.set(key, value).await?;
        }

        Ok(())
    }

    /// Fetch a value by key
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.connection().await?;
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    /// Remove a key; removing an absent key is not an error
    pub async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.connection().await?;
        let _: u64 = conn.del(key).await?;
        Ok(())
    }

    /// Reset the TTL of an existing key
    ///
    /// Returns false when the key does not exist.
    pub async fn expire(&self, key: &str, ttl_seconds: u64) -> Result<bool> {
        let mut conn = self.connection().await?;
        let refreshed: bool = conn.expire(key, ttl_seconds as i64).await?;
        Ok(refreshed)
    }

    /// Check that the server answers PING
    pub async fn health_check(&self) -> Result<bool> {
        let mut conn = self.connection().await?;
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(pong == "PONG")
    }
}
