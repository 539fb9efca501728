//! Exponential backoff between retry rounds.

use std::time::Duration;
use rand::Rng;

/// Delay to wait after failed round `round_index` (zero-based).
///
/// `base_ms * 2^round_index`, saturating and capped at `max_ms`. A non-zero
/// `jitter_ratio` adds a random `0..jitter_ratio * delay` on top.
pub fn backoff_delay(round_index: u32, base_ms: u64, max_ms: u64, jitter_ratio: f64) -> Duration {
    let exponential_base = 2u64.saturating_pow(round_index);
    let delay_ms = base_ms.saturating_mul(exponential_base);
    let capped_delay = delay_ms.min(max_ms);

    let jitter_range = (capped_delay as f64 * jitter_ratio.clamp(0.0, 1.0)) as u64;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_delay + jitter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_per_round() {
        assert_eq!(backoff_delay(0, 1000, 60_000, 0.0), Duration::from_millis(1000));
        assert_eq!(backoff_delay(1, 1000, 60_000, 0.0), Duration::from_millis(2000));
        assert_eq!(backoff_delay(2, 1000, 60_000, 0.0), Duration::from_millis(4000));
    }

    #[test]
    fn test_backoff_cap_and_saturation() {
        assert_eq!(backoff_delay(10, 100, 1000, 0.0), Duration::from_millis(1000));
        assert_eq!(backoff_delay(200, u64::MAX, u64::MAX, 0.0), Duration::from_millis(u64::MAX));
    }

    #[test]
    fn test_jitter_stays_in_range() {
        for _ in 0..100 {
            let delay = backoff_delay(1, 1000, 60_000, 0.1);
            assert!(delay >= Duration::from_millis(2000));
            assert!(delay < Duration::from_millis(2200));
        }
    }
}
