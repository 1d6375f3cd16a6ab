//! Per-source message rate limiting.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// One fixed counting window for a source address.
struct RateWindow {
    count: u32,
    window_start: Instant,
}

/// Fixed-window rate limiter keyed by source address.
///
/// The count keeps incrementing past the limit inside a window, so a client
/// cannot buy extra allowance by sending faster than it is rejected.
pub struct RateLimiter {
    windows: Mutex<HashMap<String, RateWindow>>,
    max_messages: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_messages: u32, window: Duration) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            max_messages,
            window,
        }
    }

    /// Whether a message from `source` may proceed.
    pub fn admit(&self, source: &str) -> bool {
        self.admit_at(source, Instant::now())
    }

    fn admit_at(&self, source: &str, now: Instant) -> bool {
        let mut windows = self.windows.lock().expect("rate limiter mutex poisoned");
        let window = windows.entry(source.to_string()).or_insert(RateWindow {
            count: 0,
            window_start: now,
        });

        if now.duration_since(window.window_start) > self.window {
            window.count = 0;
            window.window_start = now;
        }

        window.count = window.count.saturating_add(1);
        window.count <= self.max_messages
    }

    /// Drop windows idle for more than twice the window length.
    ///
    /// Bounds memory by the set of recently active sources rather than all
    /// sources ever seen. Returns the number of windows removed.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    fn sweep_at(&self, now: Instant) -> usize {
        let mut windows = self.windows.lock().expect("rate limiter mutex poisoned");
        let before = windows.len();
        windows.retain(|_, w| now.duration_since(w.window_start) <= self.window * 2);
        before - windows.len()
    }

    /// Number of source addresses currently tracked.
    pub fn tracked_sources(&self) -> usize {
        self.windows.lock().expect("rate limiter mutex poisoned").len()
    }
}
