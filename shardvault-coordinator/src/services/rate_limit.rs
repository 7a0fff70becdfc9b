//! Fixed-window per-address rate limiting for the account routes.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

struct Window {
    started: Instant,
    count: u32,
}

/// Fixed-window counters keyed by route and caller address.
#[derive(Clone, Default)]
pub struct RateLimiter {
    windows: Arc<Mutex<HashMap<(&'static str, IpAddr), Window>>>,
}

impl RateLimiter {
    /// Records a hit for `(route, ip)` and reports whether it is still
    /// within `limit` requests per `window`.
    pub fn check(&self, route: &'static str, ip: IpAddr, limit: u32, window: Duration) -> bool {
        let mut windows = self.windows.lock();
        let now = Instant::now();
        let entry = windows.entry((route, ip)).or_insert(Window {
            started: now,
            count: 0,
        });
        if now.duration_since(entry.started) >= window {
            entry.started = now;
            entry.count = 0;
        }
        entry.count += 1;
        entry.count <= limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_within_a_window() {
        let limiter = RateLimiter::default();
        let ip: IpAddr = "10.0.0.1".parse().unwrap();
        let window = Duration::from_secs(60);

        for _ in 0..3 {
            assert!(limiter.check("register", ip, 3, window));
        }
        assert!(!limiter.check("register", ip, 3, window));

        // Another address and another route are unaffected.
        let other: IpAddr = "10.0.0.2".parse().unwrap();
        assert!(limiter.check("register", other, 3, window));
        assert!(limiter.check("login", ip, 3, window));
    }
}
