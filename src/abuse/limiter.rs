//! Coarse per-client request limiter.
//!
//! Catches floods that spoof a benign user agent. Independent from the
//! password attempt limiter: fixed windows, higher ceiling, no cooldown.

use dashmap::{mapref::entry::Entry, DashMap};
use std::time::Duration;

const DEFAULT_MAX_REQUESTS: u32 = 120;
const DEFAULT_WINDOW: Duration = Duration::from_secs(60);
const DEFAULT_CLEANUP_THRESHOLD: usize = 10_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Window {
    started: i64,
    count: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
    Allowed,
    Limited { retry_after_seconds: u64 },
}

#[derive(Debug)]
pub struct RequestLimiter {
    windows: DashMap<String, Window>,
    max_requests: u32,
    window: Duration,
    cleanup_threshold: usize,
}

impl Default for RequestLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW)
    }
}

impl RequestLimiter {
    #[must_use]
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            windows: DashMap::new(),
            max_requests: max_requests.max(1),
            window,
            cleanup_threshold: DEFAULT_CLEANUP_THRESHOLD,
        }
    }

    /// Tracked clients above which `admit` sweeps ended windows inline.
    #[must_use]
    pub fn with_cleanup_threshold(mut self, threshold: usize) -> Self {
        self.cleanup_threshold = threshold;
        self
    }

    /// Count one request for `identifier`.
    pub fn admit(&self, identifier: &str, now: i64) -> Admission {
        // Rotating forwarded addresses must not grow the map between sweeps.
        if self.windows.len() > self.cleanup_threshold {
            self.sweep(now);
        }

        let window = window_millis(self.window);

        let current = match self.windows.entry(identifier.to_string()) {
            Entry::Occupied(mut entry) => {
                let state = entry.get_mut();
                if now.saturating_sub(state.started) >= window {
                    *state = Window {
                        started: now,
                        count: 1,
                    };
                } else {
                    state.count = state.count.saturating_add(1);
                }
                *state
            }
            Entry::Vacant(entry) => *entry.insert(Window {
                started: now,
                count: 1,
            }),
        };

        if current.count > self.max_requests {
            let remaining = current.started.saturating_add(window).saturating_sub(now);
            Admission::Limited {
                retry_after_seconds: u64::try_from(remaining.max(1_000))
                    .unwrap_or(1_000)
                    .div_ceil(1000),
            }
        } else {
            Admission::Allowed
        }
    }

    /// Drop windows that have ended.
    pub fn sweep(&self, now: i64) -> usize {
        let window = window_millis(self.window);
        let before = self.windows.len();
        self.windows
            .retain(|_, state| now.saturating_sub(state.started) < window);
        before.saturating_sub(self.windows.len())
    }

    #[must_use]
    pub fn tracked(&self) -> usize {
        self.windows.len()
    }
}

fn window_millis(window: Duration) -> i64 {
    i64::try_from(window.as_millis()).unwrap_or(i64::MAX)
}
