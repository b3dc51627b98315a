//! Fixed-window per-caller rate limiting.

use std::collections::HashMap;
use std::time::{Duration, Instant};

struct Window {
    started: Instant,
    count: u32,
}

/// Counts requests per caller in fixed windows.
///
/// A window opens on a caller's first request and admits up to `max`
/// requests until `window` has elapsed, after which the next request
/// opens a fresh window. Rejected requests do not consume budget.
pub struct RateLimiter {
    windows: HashMap<String, Window>,
    max: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max: u32, window: Duration) -> Self {
        Self {
            windows: HashMap::new(),
            max,
            window,
        }
    }

    pub fn max_requests(&self) -> u32 {
        self.max
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Admits or rejects a request from `caller` at time `now`.
    pub fn check(&mut self, caller: &str, now: Instant) -> bool {
        match self.windows.get_mut(caller) {
            Some(win) if now.saturating_duration_since(win.started) < self.window => {
                if win.count >= self.max {
                    false
                } else {
                    win.count += 1;
                    true
                }
            }
            _ => {
                self.windows.insert(
                    caller.to_string(),
                    Window {
                        started: now,
                        count: 1,
                    },
                );
                self.max > 0
            }
        }
    }
}
