//! Login attempt throttle
//!
//! Per-username sliding window over failed logins. A successful login
//! clears the window; an exhausted window blocks further attempts until it
//! expires.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::warn;

#[derive(Debug, Clone, Copy)]
struct AttemptWindow {
    failures: u32,
    started: Instant,
}

/// Throttle over failed login attempts
#[derive(Clone)]
pub struct LoginThrottle {
    max_failures: u32,
    window: Duration,
    entries: Arc<Mutex<HashMap<String, AttemptWindow>>>,
}

impl Default for LoginThrottle {
    fn default() -> Self {
        Self::new(5, Duration::from_secs(300))
    }
}

impl LoginThrottle {
    pub fn new(max_failures: u32, window: Duration) -> Self {
        Self {
            max_failures,
            window,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Whether another attempt for this key is currently allowed
    pub fn check(&self, key: &str) -> bool {
        let mut entries = self.entries.lock().expect("throttle lock poisoned");

        match entries.get(key).copied() {
            Some(window) if window.started.elapsed() >= self.window => {
                entries.remove(key);
                true
            }
            Some(window) => window.failures < self.max_failures,
            None => true,
        }
    }

    /// Record a failed attempt for this key
    pub fn record_failure(&self, key: &str) {
        let mut entries = self.entries.lock().expect("throttle lock poisoned");
        let now = Instant::now();

        let window = entries.entry(key.to_string()).or_insert(AttemptWindow {
            failures: 0,
            started: now,
        });

        if now.duration_since(window.started) >= self.window {
            window.failures = 0;
            window.started = now;
        }

        window.failures += 1;

        if window.failures == self.max_failures {
            warn!("login throttle engaged for '{}'", key);
        }
    }

    /// Forget all failures for this key
    pub fn clear(&self, key: &str) {
        let mut entries = self.entries.lock().expect("throttle lock poisoned");
        entries.remove(key);
    }
}
