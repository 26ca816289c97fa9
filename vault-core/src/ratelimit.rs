//! C3 — sliding-window rate limiter.
//!
//! Spec §4.3 calls for a sliding window, not a token bucket: a principal's
//! quota is "the last `max_requests` calls fell more than `window` apart
//! from the oldest of them", not a steady refill rate. Grounded in the
//! teacher's `main.rs` rate limiter shape (one mutex-guarded map keyed by
//! principal) with the window-membership check swapped in for bucket math.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    calls: Mutex<HashMap<String, Vec<Instant>>>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self { max_requests, window, calls: Mutex::new(HashMap::new()) }
    }

    pub fn is_allowed(&self, principal: &str) -> bool {
        self.is_allowed_at(principal, Instant::now())
    }

    pub fn retry_after(&self, principal: &str) -> u64 {
        self.retry_after_at(principal, Instant::now())
    }

    /// Testable variant taking an explicit clock reading, so tests can
    /// simulate the passage of time without sleeping.
    pub fn is_allowed_at(&self, principal: &str, now: Instant) -> bool {
        let mut calls = self.calls.lock().expect("rate limiter mutex poisoned");
        let timestamps = calls.entry(principal.to_string()).or_default();
        timestamps.retain(|&t| now.saturating_duration_since(t) < self.window);

        if timestamps.len() >= self.max_requests as usize {
            false
        } else {
            timestamps.push(now);
            true
        }
    }

    /// Seconds until the oldest timestamp in the window exits it; 0 if the
    /// principal has no timestamps at all (per spec — this only ever comes
    /// up if `retry_after` is queried without a preceding rejected
    /// `is_allowed` call, which current callers don't do).
    pub fn retry_after_at(&self, principal: &str, now: Instant) -> u64 {
        let calls = self.calls.lock().expect("rate limiter mutex poisoned");
        let oldest = calls.get(principal).and_then(|ts| ts.iter().min().copied());
        match oldest {
            Some(oldest) => {
                let elapsed = now.saturating_duration_since(oldest);
                self.window.saturating_sub(elapsed).as_secs()
            }
            None => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_max_requests_within_window() {
        let limiter = RateLimiter::new(30, Duration::from_secs(60));
        let start = Instant::now();
        for _ in 0..30 {
            assert!(limiter.is_allowed_at("T", start));
        }
        assert!(!limiter.is_allowed_at("T", start));
    }

    #[test]
    fn thirty_first_call_in_window_is_rejected() {
        let limiter = RateLimiter::new(30, Duration::from_secs(60));
        let start = Instant::now();
        for i in 0..30 {
            assert!(limiter.is_allowed_at("T", start + Duration::from_millis(i)));
        }
        assert!(!limiter.is_allowed_at("T", start + Duration::from_millis(30)));
    }

    #[test]
    fn window_expiry_frees_up_quota() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let start = Instant::now();
        assert!(limiter.is_allowed_at("T", start));
        assert!(!limiter.is_allowed_at("T", start + Duration::from_secs(30)));
        assert!(limiter.is_allowed_at("T", start + Duration::from_secs(61)));
    }

    #[test]
    fn principals_have_independent_quotas() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let start = Instant::now();
        assert!(limiter.is_allowed_at("A", start));
        assert!(limiter.is_allowed_at("B", start));
        assert!(!limiter.is_allowed_at("A", start));
    }

    #[test]
    fn retry_after_is_zero_for_a_principal_with_no_timestamps() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        assert_eq!(limiter.retry_after_at("never-seen", Instant::now()), 0);
    }
}
