//! Server-side session store
//!
//! A session is a Redis value keyed by an opaque random token the client
//! holds in an HTTP-only cookie. The TTL is the idle timeout: every
//! successful authentication touches it back to the full window. A token
//! that is absent, unparseable, or not marked authenticated is treated
//! identically: the key is destroyed and the caller must log in again.

use anyhow::Result;
use common::cache::RedisPool;
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

/// Cookie carrying the session token
pub const SESSION_COOKIE: &str = "portfolio_session";

const TOKEN_LENGTH: usize = 48;

/// Server-side session state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    pub admin_id: Uuid,
    pub authenticated: bool,
}

/// Session store configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Idle timeout in seconds; 24 hours by default
    pub ttl_seconds: u64,
}

impl SessionConfig {
    /// Create a new SessionConfig from environment variables
    ///
    /// # Environment Variables
    /// - `SESSION_TTL_SECS`: idle timeout in seconds (default: 86400)
    pub fn from_env() -> Result<Self> {
        let ttl_seconds = std::env::var("SESSION_TTL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(24 * 60 * 60);

        Ok(SessionConfig { ttl_seconds })
    }
}

/// Token-keyed session store backed by Redis
#[derive(Clone)]
pub struct SessionStore {
    cache: RedisPool,
    ttl_seconds: u64,
}

impl SessionStore {
    pub fn new(cache: RedisPool, config: SessionConfig) -> Self {
        Self {
            cache,
            ttl_seconds: config.ttl_seconds,
        }
    }

    /// Idle timeout, also used for the cookie Max-Age
    pub fn ttl_seconds(&self) -> u64 {
        self.ttl_seconds
    }

    /// Create a session for an admin and return its token
    pub async fn create(&self, admin_id: Uuid) -> Result<String> {
        let token = generate_token();
        let data = SessionData {
            admin_id,
            authenticated: true,
        };

        self.cache
            .set(
                &session_key(&token),
                &serde_json::to_string(&data)?,
                Some(self.ttl_seconds),
            )
            .await?;

        info!("created session for admin {}", admin_id);
        Ok(token)
    }

    /// Validate a token and touch its idle timeout
    ///
    /// Returns `None` for any token that does not map to a live,
    /// authenticated session; such keys are destroyed on sight.
    pub async fn authenticate(&self, token: &str) -> Result<Option<SessionData>> {
        let key = session_key(token);

        let Some(raw) = self.cache.get(&key).await? else {
            return Ok(None);
        };

        let data: SessionData = match serde_json::from_str(&raw) {
            Ok(data) => data,
            Err(e) => {
                warn!("destroying malformed session: {}", e);
                self.cache.delete(&key).await?;
                return Ok(None);
            }
        };

        if !data.authenticated {
            self.cache.delete(&key).await?;
            return Ok(None);
        }

        self.cache.expire(&key, self.ttl_seconds).await?;

        Ok(Some(data))
    }

    /// Destroy a session; destroying a nonexistent session succeeds
    pub async fn destroy(&self, token: &str) -> Result<()> {
        self.cache.delete(&session_key(token)).await
    }
}

fn session_key(token: &str) -> String {
    format!("session:{}", token)
}

fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}
