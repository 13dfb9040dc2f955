use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::security::auth::hash_ip;

/// Window sign-in attempts are counted over.
pub const LOGIN_WINDOW: Duration = Duration::from_secs(15 * 60);

/// In-memory rate limiter keyed by (bucket, ip_hash). Clones share state.
#[derive(Clone)]
pub struct RateLimiter {
    entries: Arc<Mutex<HashMap<String, Vec<Instant>>>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        RateLimiter {
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, Vec<Instant>>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record an attempt and return true if the attempt is allowed (under the limit).
    pub fn check_and_record(&self, key: &str, max_attempts: u64, window: Duration) -> bool {
        let mut map = self.entries();
        let now = Instant::now();

        let attempts = map.entry(key.to_string()).or_default();
        attempts.retain(|t| now.duration_since(*t) < window);

        if (attempts.len() as u64) < max_attempts {
            attempts.push(now);
            true
        } else {
            false
        }
    }

    /// Check remaining attempts without recording a new one.
    pub fn remaining(&self, key: &str, max_attempts: u64, window: Duration) -> u64 {
        let mut map = self.entries();
        let now = Instant::now();

        let attempts = map.entry(key.to_string()).or_default();
        attempts.retain(|t| now.duration_since(*t) < window);

        max_attempts.saturating_sub(attempts.len() as u64)
    }

    /// Forget a key, e.g. after a successful sign-in.
    pub fn reset(&self, key: &str) {
        self.entries().remove(key);
    }

    /// Drop attempts older than `max_age` and keys left empty.
    pub fn cleanup(&self, max_age: Duration) {
        let mut map = self.entries();
        let now = Instant::now();
        map.retain(|_, attempts| {
            attempts.retain(|t| now.duration_since(*t) < max_age);
            !attempts.is_empty()
        });
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

/// Bucket key for sign-in attempts from `ip`. The address itself is never stored.
pub fn login_key(ip: &str) -> String {
    format!("login:{}", hash_ip(ip))
}
