//! In-memory sliding-window limiter for login attempts.
//!
//! Each client id maps to the instants of its attempts inside the trailing
//! window. A single mutex guards the whole map so that prune, count and record
//! happen as one step; there is no await point while it is held.
//!
//! Scaling: state is per process. Several replicas behind a load balancer each
//! allow `max_attempts` per window.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info};

pub const DEFAULT_MAX_ATTEMPTS: usize = 10;
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(10 * 60);
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("too many login attempts, retry in {retry_after_seconds}s")]
pub struct RateLimitExceeded {
    pub retry_after_seconds: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub max_attempts: usize,
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            window: DEFAULT_WINDOW,
        }
    }
}

#[derive(Debug, Default)]
pub struct LoginRateLimiter {
    config: RateLimitConfig,
    attempts: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl LoginRateLimiter {
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            attempts: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn config(&self) -> RateLimitConfig {
        self.config
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, VecDeque<Instant>>> {
        self.attempts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Admit and record one attempt for `client_id`, or reject it.
    ///
    /// # Errors
    /// Returns [`RateLimitExceeded`] when the client already has
    /// `max_attempts` attempts inside the window. Rejected attempts are not
    /// recorded.
    pub fn check_and_record(&self, client_id: &str) -> Result<(), RateLimitExceeded> {
        self.check_and_record_at(client_id, Instant::now())
    }

    /// Like [`check_and_record`](Self::check_and_record) with an explicit clock.
    ///
    /// # Errors
    /// See [`check_and_record`](Self::check_and_record).
    pub fn check_and_record_at(
        &self,
        client_id: &str,
        now: Instant,
    ) -> Result<(), RateLimitExceeded> {
        let RateLimitConfig {
            max_attempts,
            window,
        } = self.config;

        let mut attempts = self.lock();
        let entries = attempts.entry(client_id.to_string()).or_default();
        while entries
            .front()
            .is_some_and(|ts| now.saturating_duration_since(*ts) >= window)
        {
            entries.pop_front();
        }

        if entries.len() >= max_attempts {
            let remaining = entries
                .front()
                .and_then(|oldest| oldest.checked_add(window))
                .map_or(window, |end| end.saturating_duration_since(now));
            let retry_after_seconds = remaining.as_secs().saturating_add(1);
            debug!(retry_after_seconds, "login attempt rate limited");
            return Err(RateLimitExceeded {
                retry_after_seconds,
            });
        }

        entries.push_back(now);
        Ok(())
    }

    /// Attempts `client_id` has left in the current window.
    #[must_use]
    pub fn remaining(&self, client_id: &str) -> usize {
        self.remaining_at(client_id, Instant::now())
    }

    #[must_use]
    pub fn remaining_at(&self, client_id: &str, now: Instant) -> usize {
        let window = self.config.window;
        let used = self.lock().get(client_id).map_or(0, |entries| {
            entries
                .iter()
                .filter(|ts| now.saturating_duration_since(**ts) < window)
                .count()
        });
        self.config.max_attempts.saturating_sub(used)
    }

    /// Forget every attempt recorded for `client_id`.
    pub fn reset(&self, client_id: &str) {
        self.lock().remove(client_id);
    }

    /// Drop clients whose latest attempt is older than `max_age` (or who have
    /// none left). Returns how many were removed.
    ///
    /// `max_age` never goes below the window: attempts still being counted are
    /// kept.
    pub fn evict_stale(&self, max_age: Duration) -> usize {
        self.evict_stale_at(max_age, Instant::now())
    }

    pub fn evict_stale_at(&self, max_age: Duration, now: Instant) -> usize {
        let max_age = max_age.max(self.config.window);
        let mut attempts = self.lock();
        let before = attempts.len();
        attempts.retain(|_, entries| {
            entries
                .back()
                .is_some_and(|last| now.saturating_duration_since(*last) <= max_age)
        });
        before - attempts.len()
    }

    /// Number of clients currently tracked.
    #[must_use]
    pub fn tracked_clients(&self) -> usize {
        self.lock().len()
    }
}

/// Periodically evict idle clients so the map does not grow without bound.
pub fn spawn_eviction_worker(
    limiter: Arc<LoginRateLimiter>,
    interval: Duration,
    max_age: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately; nothing is stale yet.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let evicted = limiter.evict_stale(max_age);
            if evicted > 0 {
                info!(evicted, "evicted idle login rate limit entries");
            }
        }
    })
}
