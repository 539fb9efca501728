//! Sliding-window limiter for dispatch attempts.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

pub const WINDOW: Duration = Duration::from_millis(60_000);

/// Counts attempts started within the trailing window.
///
/// Timestamps are pruned lazily on every check. A slot is reserved before the
/// provider is contacted, so failed attempts still count against the window.
#[derive(Debug)]
pub struct SlidingWindowLimiter {
    limit: usize,
    window: Duration,
    stamps: VecDeque<Instant>,
}

impl SlidingWindowLimiter {
    pub fn new(limit_per_minute: u32) -> Self {
        Self::with_window(limit_per_minute, WINDOW)
    }

    pub fn with_window(limit: u32, window: Duration) -> Self {
        Self {
            limit: limit as usize,
            window,
            stamps: VecDeque::new(),
        }
    }

    /// Prune expired entries, then report whether the window is full.
    pub fn is_limited(&mut self, now: Instant) -> bool {
        while let Some(oldest) = self.stamps.front() {
            if now.saturating_duration_since(*oldest) < self.window {
                break;
            }
            self.stamps.pop_front();
        }
        self.stamps.len() >= self.limit
    }

    pub fn reserve(&mut self, now: Instant) {
        self.stamps.push_back(now);
    }

    /// Attempts currently counted in the window (as of the last prune).
    pub fn in_window(&self) -> usize {
        self.stamps.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limits_at_capacity() {
        let mut limiter = SlidingWindowLimiter::new(3);
        let now = Instant::now();

        for _ in 0..3 {
            assert!(!limiter.is_limited(now));
            limiter.reserve(now);
        }
        assert!(limiter.is_limited(now));
        assert_eq!(limiter.in_window(), 3);
    }

    #[test]
    fn test_window_slides() {
        let mut limiter = SlidingWindowLimiter::new(2);
        let start = Instant::now();

        limiter.reserve(start);
        limiter.reserve(start + Duration::from_secs(30));
        assert!(limiter.is_limited(start + Duration::from_secs(59)));

        // The first stamp is exactly one window old and no longer counts.
        assert!(!limiter.is_limited(start + WINDOW));
        assert_eq!(limiter.in_window(), 1);
    }
}
