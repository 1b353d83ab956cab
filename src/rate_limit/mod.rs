//! Per-client attempt limiting for the password gate.
//!
//! Each client identifier moves through `fresh -> accumulating -> cooldown`
//! and back to fresh once the cooldown (or an idle tracking window) lapses:
//!
//! - **Attempt limit:** `max_attempts` per tracking window (default 10 in 15 minutes).
//! - **Cooldown:** reaching the limit blocks the identifier for `cooldown` (default 15 minutes).
//! - **Eviction:** stale records are swept once the store grows past
//!   `cleanup_threshold`, and by the periodic sweeper started with the server.
//!
//! State lives in process memory only. It does not survive a restart and is
//! not shared between instances.

mod store;

pub use store::{MemoryStore, RateLimitStore};

use std::{sync::Arc, time::Duration};
use tracing::debug;

use crate::unix_millis;

const DEFAULT_MAX_ATTEMPTS: u32 = 10;
const DEFAULT_WINDOW: Duration = Duration::from_secs(15 * 60);
const DEFAULT_COOLDOWN: Duration = Duration::from_secs(15 * 60);
const DEFAULT_RETENTION: Duration = Duration::from_secs(60 * 60);
const DEFAULT_CLEANUP_THRESHOLD: usize = 1000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimitRecord {
    pub attempt_count: u32,
    /// Unix milliseconds.
    pub window_start: i64,
    /// Unix milliseconds; set once `attempt_count` reaches the limit.
    pub cooldown_until: Option<i64>,
}

impl RateLimitRecord {
    fn fresh(now: i64) -> Self {
        Self {
            attempt_count: 1,
            window_start: now,
            cooldown_until: None,
        }
    }

    fn cooldown_active(&self, now: i64) -> bool {
        self.cooldown_until.is_some_and(|until| until > now)
    }

    /// A stale record would be reset by the next check anyway.
    fn is_stale(&self, now: i64, config: &RateLimitConfig) -> bool {
        if self.cooldown_active(now) {
            return false;
        }
        let age = now.saturating_sub(self.window_start);
        self.cooldown_until.is_some() || age >= millis(config.window) || age > millis(config.retention)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub max_attempts: u32,
    pub window: Duration,
    pub cooldown: Duration,
    pub retention: Duration,
    pub cleanup_threshold: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            window: DEFAULT_WINDOW,
            cooldown: DEFAULT_COOLDOWN,
            retention: DEFAULT_RETENTION,
            cleanup_threshold: DEFAULT_CLEANUP_THRESHOLD,
        }
    }
}

impl RateLimitConfig {
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    #[must_use]
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    #[must_use]
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    #[must_use]
    pub fn with_cleanup_threshold(mut self, threshold: usize) -> Self {
        self.cleanup_threshold = threshold;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub attempts_remaining: u32,
    pub cooldown_remaining_seconds: Option<u64>,
    /// Set only on the call that crossed the limit: the start of the new
    /// cooldown episode, used to dedup abuse alerts.
    pub cooldown_started_at: Option<i64>,
}

impl RateLimitDecision {
    fn allowed(attempts_remaining: u32) -> Self {
        Self {
            allowed: true,
            attempts_remaining,
            cooldown_remaining_seconds: None,
            cooldown_started_at: None,
        }
    }

    fn blocked(cooldown_until: i64, now: i64) -> Self {
        Self {
            allowed: false,
            attempts_remaining: 0,
            cooldown_remaining_seconds: Some(ceil_seconds(cooldown_until.saturating_sub(now))),
            cooldown_started_at: None,
        }
    }
}

pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    config: RateLimitConfig,
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("config", &self.config)
            .field("tracked", &self.store.len())
            .finish()
    }
}

impl RateLimiter {
    #[must_use]
    pub fn new(store: Arc<dyn RateLimitStore>, config: RateLimitConfig) -> Self {
        Self { store, config }
    }

    #[must_use]
    pub fn in_memory(config: RateLimitConfig) -> Self {
        Self::new(Arc::new(MemoryStore::new()), config)
    }

    /// Register an attempt for `identifier` and decide whether it may proceed.
    pub fn check(&self, identifier: &str) -> RateLimitDecision {
        self.check_at(identifier, unix_millis())
    }

    pub fn check_at(&self, identifier: &str, now: i64) -> RateLimitDecision {
        if self.store.len() > self.config.cleanup_threshold {
            self.sweep_at(now);
        }

        let max = self.config.max_attempts;
        let window = millis(self.config.window);
        let cooldown = millis(self.config.cooldown);
        let mut decision = RateLimitDecision::allowed(max.saturating_sub(1));

        self.store.update(identifier, &mut |current| match current {
            Some(record) if record.cooldown_active(now) => {
                let until = record.cooldown_until.unwrap_or(now);
                decision = RateLimitDecision::blocked(until, now);
                record
            }
            Some(record)
                if record.cooldown_until.is_none()
                    && now.saturating_sub(record.window_start) < window =>
            {
                let attempt_count = record.attempt_count.saturating_add(1);
                if attempt_count >= max {
                    let until = now.saturating_add(cooldown);
                    decision = RateLimitDecision {
                        cooldown_started_at: Some(now),
                        ..RateLimitDecision::blocked(until, now)
                    };
                    RateLimitRecord {
                        attempt_count,
                        cooldown_until: Some(until),
                        ..record
                    }
                } else {
                    decision = RateLimitDecision::allowed(max - attempt_count);
                    RateLimitRecord {
                        attempt_count,
                        ..record
                    }
                }
            }
            // No record, idle window, or lapsed cooldown: start over.
            _ => {
                decision = RateLimitDecision::allowed(max.saturating_sub(1));
                RateLimitRecord::fresh(now)
            }
        });

        decision
    }

    /// Forget `identifier`, e.g. after it proved the right password.
    pub fn reset(&self, identifier: &str) {
        self.store.delete(identifier);
    }

    /// Drop stale records; returns how many were removed.
    pub fn sweep(&self) -> usize {
        self.sweep_at(unix_millis())
    }

    pub fn sweep_at(&self, now: i64) -> usize {
        let config = self.config;
        let removed = self
            .store
            .sweep(&|record: &RateLimitRecord| record.is_stale(now, &config));
        if removed > 0 {
            debug!(removed, remaining = self.store.len(), "swept rate limit records");
        }
        removed
    }

    #[must_use]
    pub fn tracked(&self) -> usize {
        self.store.len()
    }
}

fn millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

fn ceil_seconds(millis: i64) -> u64 {
    u64::try_from(millis.max(0)).unwrap_or(0).div_ceil(1000)
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: i64 = 1_700_000_000_000;
    const MINUTE: i64 = 60 * 1000;

    fn limiter() -> RateLimiter {
        RateLimiter::in_memory(RateLimitConfig::default())
    }

    #[test]
    fn attempts_below_limit_are_allowed() {
        let limiter = limiter();
        for attempt in 1..=9 {
            let decision = limiter.check_at("10.0.0.1", T0 + i64::from(attempt));
            assert!(decision.allowed, "attempt {attempt} should pass");
            assert_eq!(decision.attempts_remaining, 10 - attempt);
            assert_eq!(decision.cooldown_remaining_seconds, None);
        }
    }

    #[test]
    fn reaching_limit_starts_cooldown_once() {
        let limiter = limiter();
        for attempt in 0..9 {
            assert!(limiter.check_at("10.0.0.1", T0 + attempt).allowed);
        }

        let crossing = limiter.check_at("10.0.0.1", T0 + 10);
        assert!(!crossing.allowed);
        assert_eq!(crossing.attempts_remaining, 0);
        assert_eq!(crossing.cooldown_remaining_seconds, Some(15 * 60));
        assert_eq!(crossing.cooldown_started_at, Some(T0 + 10));

        let during = limiter.check_at("10.0.0.1", T0 + 10 + MINUTE);
        assert!(!during.allowed);
        assert_eq!(during.cooldown_remaining_seconds, Some(14 * 60));
        assert_eq!(during.cooldown_started_at, None);
    }

    #[test]
    fn cooldown_seconds_round_up() {
        let limiter = limiter();
        for attempt in 0..10 {
            limiter.check_at("ip", T0 + attempt);
        }
        // Cooldown ends at T0 + 9 + 15min; 1.5s before that reports 2s.
        let decision = limiter.check_at("ip", T0 + 9 + 15 * MINUTE - 1_500);
        assert_eq!(decision.cooldown_remaining_seconds, Some(2));
    }

    #[test]
    fn expired_cooldown_resets_counter() {
        let limiter = limiter();
        for attempt in 0..10 {
            limiter.check_at("ip", T0 + attempt);
        }
        let after = limiter.check_at("ip", T0 + 16 * MINUTE);
        assert!(after.allowed);
        assert_eq!(after.attempts_remaining, 9);

        let next = limiter.check_at("ip", T0 + 16 * MINUTE + 1);
        assert_eq!(next.attempts_remaining, 8);
    }

    #[test]
    fn idle_window_resets_counter() {
        let limiter = limiter();
        for attempt in 0..5 {
            limiter.check_at("ip", T0 + attempt);
        }
        let decision = limiter.check_at("ip", T0 + 15 * MINUTE);
        assert_eq!(decision.attempts_remaining, 9);
    }

    #[test]
    fn reset_behaves_like_fresh_identifier() {
        let limiter = limiter();
        for attempt in 0..10 {
            limiter.check_at("ip", T0 + attempt);
        }
        limiter.reset("ip");

        let decision = limiter.check_at("ip", T0 + 20);
        assert!(decision.allowed);
        assert_eq!(decision.attempts_remaining, 9);
    }

    #[test]
    fn identifiers_are_independent() {
        let limiter = limiter();
        for attempt in 0..10 {
            limiter.check_at("a", T0 + attempt);
        }
        assert!(!limiter.check_at("a", T0 + 11).allowed);
        assert!(limiter.check_at("b", T0 + 11).allowed);
    }

    #[test]
    fn sweep_keeps_active_cooldowns() {
        let limiter = limiter();
        for attempt in 0..10 {
            limiter.check_at("blocked", T0 + attempt);
        }
        limiter.check_at("idle", T0);
        limiter.check_at("recent", T0 + 14 * MINUTE);

        let removed = limiter.sweep_at(T0 + 15 * MINUTE);
        assert_eq!(removed, 1);
        assert_eq!(limiter.tracked(), 2);

        let removed = limiter.sweep_at(T0 + 31 * MINUTE);
        assert_eq!(removed, 2);
        assert_eq!(limiter.tracked(), 0);
    }

    #[test]
    fn oversized_store_is_swept_on_check() {
        let limiter =
            RateLimiter::in_memory(RateLimitConfig::default().with_cleanup_threshold(3));
        for n in 0..5 {
            limiter.check_at(&format!("10.0.0.{n}"), T0);
        }
        assert_eq!(limiter.tracked(), 5);

        limiter.check_at("10.0.1.1", T0 + 20 * MINUTE);
        assert_eq!(limiter.tracked(), 1);
    }
}
