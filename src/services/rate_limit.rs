//! In-memory sliding-window rate limiter keyed by client address.
//!
//! Each address keeps a log of request instants inside the window. State is
//! per process and not persisted across restarts.

use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Prune idle addresses once the table grows past this many entries.
const PRUNE_THRESHOLD: usize = 1024;

#[derive(Clone)]
pub struct RateLimiter {
    hits: Arc<Mutex<HashMap<IpAddr, VecDeque<Instant>>>>,
    max_requests: usize,
    window: Duration,
}

/// Returned when a request is over the limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limited {
    /// Time until the oldest logged request leaves the window.
    pub retry_after: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            hits: Arc::new(Mutex::new(HashMap::new())),
            max_requests,
            window,
        }
    }

    /// Record a request from `addr` unless it is over the limit.
    pub fn check(&self, addr: IpAddr) -> Result<(), Limited> {
        self.check_at(addr, Instant::now())
    }

    fn check_at(&self, addr: IpAddr, now: Instant) -> Result<(), Limited> {
        let mut hits = self.hits.lock();

        if hits.len() > PRUNE_THRESHOLD {
            let window = self.window;
            hits.retain(|_, log| log.back().is_some_and(|t| now.duration_since(*t) < window));
        }

        let log = hits.entry(addr).or_default();
        while log
            .front()
            .is_some_and(|t| now.duration_since(*t) >= self.window)
        {
            log.pop_front();
        }

        if log.len() >= self.max_requests {
            let retry_after = log
                .front()
                .map(|oldest| self.window.saturating_sub(now.duration_since(*oldest)))
                .unwrap_or(self.window);
            return Err(Limited { retry_after });
        }

        log.push_back(now);
        Ok(())
    }

    pub fn max_requests(&self) -> usize {
        self.max_requests
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(last: u8) -> IpAddr {
        IpAddr::from([10, 0, 0, last])
    }

    #[test]
    fn test_eleventh_request_in_window_is_limited() {
        let limiter = RateLimiter::new(10, Duration::from_secs(900));
        let start = Instant::now();

        for i in 0..10 {
            assert!(limiter.check_at(addr(1), start + Duration::from_secs(i)).is_ok());
        }
        let limited = limiter
            .check_at(addr(1), start + Duration::from_secs(60))
            .unwrap_err();
        assert_eq!(limited.retry_after, Duration::from_secs(840));
    }

    #[test]
    fn test_addresses_are_independent() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let now = Instant::now();
        assert!(limiter.check_at(addr(1), now).is_ok());
        assert!(limiter.check_at(addr(1), now).is_err());
        assert!(limiter.check_at(addr(2), now).is_ok());
    }

    #[test]
    fn test_window_slides() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        let start = Instant::now();
        assert!(limiter.check_at(addr(1), start).is_ok());
        assert!(limiter.check_at(addr(1), start + Duration::from_secs(30)).is_ok());
        assert!(limiter.check_at(addr(1), start + Duration::from_secs(59)).is_err());
        // First hit has aged out; the second is still inside the window
        assert!(limiter.check_at(addr(1), start + Duration::from_secs(60)).is_ok());
        assert!(limiter.check_at(addr(1), start + Duration::from_secs(61)).is_err());
    }

    #[test]
    fn test_rejected_requests_are_not_logged() {
        let limiter = RateLimiter::new(1, Duration::from_secs(10));
        let start = Instant::now();
        assert!(limiter.check_at(addr(1), start).is_ok());
        for s in 1..10 {
            assert!(limiter.check_at(addr(1), start + Duration::from_secs(s)).is_err());
        }
        assert!(limiter.check_at(addr(1), start + Duration::from_secs(10)).is_ok());
    }
}
