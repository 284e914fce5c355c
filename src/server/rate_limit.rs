use dashmap::DashMap;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::config::settings::RateLimitConfig;

// stale windows are swept once the table grows past this
const SWEEP_THRESHOLD: usize = 10_000;

/// Per-key request budget
pub trait RateLimiter: Send + Sync {
    /// Count one request for `key`; `false` once the budget is spent
    fn check(&self, key: &str) -> bool;
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Fixed-window counter keyed by client address
pub struct FixedWindowLimiter {
    max_requests: u32,
    window: Duration,
    windows: DashMap<String, Window>,
}

impl FixedWindowLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            windows: DashMap::new(),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.max_requests, Duration::from_secs(config.window_seconds))
    }

    pub fn check_at(&self, key: &str, now: Instant) -> bool {
        if self.windows.len() > SWEEP_THRESHOLD {
            self.sweep(now);
        }

        let mut entry = self.windows.entry(key.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });
        if now.duration_since(entry.started) >= self.window {
            *entry = Window {
                started: now,
                count: 0,
            };
        }

        if entry.count >= self.max_requests {
            warn!("Rate limit exceeded for {}", key);
            return false;
        }
        entry.count += 1;
        debug!("Rate limiter: {} used {}/{}", key, entry.count, self.max_requests);
        true
    }

    fn sweep(&self, now: Instant) {
        let window = self.window;
        self.windows
            .retain(|_, w| now.duration_since(w.started) < window);
    }
}

impl RateLimiter for FixedWindowLimiter {
    fn check(&self, key: &str) -> bool {
        self.check_at(key, Instant::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_is_per_key_and_resets_with_window() {
        let limiter = FixedWindowLimiter::new(2, Duration::from_secs(60));
        let start = Instant::now();

        assert!(limiter.check_at("10.0.0.1", start));
        assert!(limiter.check_at("10.0.0.1", start));
        assert!(!limiter.check_at("10.0.0.1", start + Duration::from_secs(30)));
        assert!(limiter.check_at("10.0.0.2", start));

        assert!(limiter.check_at("10.0.0.1", start + Duration::from_secs(61)));
    }

    #[test]
    fn config_defaults_allow_two_signups() {
        let limiter = FixedWindowLimiter::from_config(&RateLimitConfig::default());
        assert!(limiter.check("ip"));
        assert!(limiter.check("ip"));
        assert!(!limiter.check("ip"));
    }
}
