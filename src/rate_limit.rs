use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use dashmap::DashMap;
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::config::RateLimitConfig;

/// Sliding-window admission control keyed by client identity.
///
/// Each key keeps the instants of its admitted requests inside the trailing
/// window. The check-and-record runs under the key's shard write lock, so two
/// concurrent calls for the same key can never both take the last slot.
/// Distinct keys only contend when they hash to the same shard.
///
/// Idle keys are swept once the map outgrows `next_sweep`. After each sweep
/// the mark moves to twice the surviving key count, never below the configured
/// threshold.
pub struct SlidingWindowLimiter<C: Clock = SystemClock> {
    name: &'static str,
    limit: usize,
    window: Duration,
    gc_threshold: usize,
    next_sweep: AtomicUsize,
    windows: DashMap<String, VecDeque<Instant>>,
    clock: C,
    admitted: AtomicU64,
    denied: AtomicU64,
    sweeps: AtomicU64,
}

impl SlidingWindowLimiter<SystemClock> {
    pub fn new(name: &'static str, config: &RateLimitConfig) -> Self {
        Self::with_clock(name, config, SystemClock)
    }
}

impl<C: Clock> SlidingWindowLimiter<C> {
    pub fn with_clock(name: &'static str, config: &RateLimitConfig, clock: C) -> Self {
        Self {
            name,
            limit: config.limit,
            window: config.window(),
            gc_threshold: config.gc_threshold,
            next_sweep: AtomicUsize::new(config.gc_threshold),
            windows: DashMap::new(),
            clock,
            admitted: AtomicU64::new(0),
            denied: AtomicU64::new(0),
            sweeps: AtomicU64::new(0),
        }
    }

    /// Admit or deny one request for `key`. Denied attempts are not recorded.
    pub fn check(&self, key: &str) -> bool {
        let now = self.clock.now();

        // Sweep before taking the entry lock; retain() needs every shard.
        if self.windows.len() > self.next_sweep.load(Ordering::Relaxed) {
            self.sweep(now);
        }

        let mut stamps = self.windows.entry(key.to_string()).or_default();
        prune(&mut stamps, now, self.window);

        if stamps.len() >= self.limit {
            self.denied.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        stamps.push_back(now);
        self.admitted.fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Drop every key whose window has emptied out.
    fn sweep(&self, now: Instant) {
        let before = self.windows.len();
        let window = self.window;
        self.windows.retain(|_, stamps| {
            prune(stamps, now, window);
            !stamps.is_empty()
        });
        let remaining = self.windows.len();
        let next = self.gc_threshold.max(remaining.saturating_mul(2));
        self.next_sweep.store(next, Ordering::Relaxed);
        self.sweeps.fetch_add(1, Ordering::Relaxed);
        debug!(
            "Rate limiter '{}' swept {} idle keys ({} remain, next sweep above {})",
            self.name,
            before.saturating_sub(remaining),
            remaining,
            next
        );
    }

    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }

    pub fn get_stats(&self) -> serde_json::Value {
        serde_json::json!({
            "name": self.name,
            "limit": self.limit,
            "window_ms": self.window.as_millis() as u64,
            "tracked_keys": self.windows.len(),
            "admitted": self.admitted.load(Ordering::Relaxed),
            "denied": self.denied.load(Ordering::Relaxed),
            "sweeps": self.sweeps.load(Ordering::Relaxed),
        })
    }
}

fn prune(stamps: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(&oldest) = stamps.front() {
        if now.saturating_duration_since(oldest) >= window {
            stamps.pop_front();
        } else {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;
    use std::sync::Arc;

    fn config(limit: usize, window_ms: u64, gc_threshold: usize) -> RateLimitConfig {
        RateLimitConfig { limit, window_ms, gc_threshold }
    }

    fn limiter(limit: usize, window_ms: u64) -> (SlidingWindowLimiter<MockClock>, MockClock) {
        let clock = MockClock::new(Instant::now());
        let limiter = SlidingWindowLimiter::with_clock("test", &config(limit, window_ms, 1024), clock.clone());
        (limiter, clock)
    }

    #[test]
    fn test_burst_admits_exactly_limit() {
        let (limiter, _clock) = limiter(3, 1000);
        let admitted = (0..4).filter(|_| limiter.check("1.2.3.4")).count();
        assert_eq!(admitted, 3);
        assert!(!limiter.check("1.2.3.4"));
    }

    #[test]
    fn test_window_expiry_readmits() {
        let (limiter, clock) = limiter(2, 1000);
        assert!(limiter.check("k"));
        clock.advance(Duration::from_millis(400));
        assert!(limiter.check("k"));
        assert!(!limiter.check("k"));

        // First stamp leaves the window, second is still inside
        clock.advance(Duration::from_millis(601));
        assert!(limiter.check("k"));
        assert!(!limiter.check("k"));
    }

    #[test]
    fn test_denied_attempts_are_not_recorded() {
        let (limiter, clock) = limiter(1, 1000);
        assert!(limiter.check("k"));
        for _ in 0..10 {
            clock.advance(Duration::from_millis(50));
            assert!(!limiter.check("k"));
        }
        // Only the admitted stamp at t=0 counts, so t=1000 is free again
        clock.advance(Duration::from_millis(500));
        assert!(limiter.check("k"));
    }

    #[test]
    fn test_keys_are_independent() {
        let (limiter, _clock) = limiter(1, 1000);
        assert!(limiter.check("a"));
        assert!(limiter.check("b"));
        assert!(!limiter.check("a"));
        assert!(!limiter.check("b"));
    }

    #[test]
    fn test_zero_limit_denies_everything() {
        let (limiter, _clock) = limiter(0, 1000);
        assert!(!limiter.check("k"));
    }

    #[test]
    fn test_gc_drops_idle_keys() {
        let clock = MockClock::new(Instant::now());
        let limiter = SlidingWindowLimiter::with_clock("gc", &config(5, 100, 3), clock.clone());
        for key in ["a", "b", "c", "d"] {
            assert!(limiter.check(key));
        }
        assert_eq!(limiter.tracked_keys(), 4);

        clock.advance(Duration::from_millis(150));
        assert!(limiter.check("e"));
        assert_eq!(limiter.tracked_keys(), 1);
    }

    #[test]
    fn test_live_keys_do_not_sweep_every_request() {
        let clock = MockClock::new(Instant::now());
        let limiter = SlidingWindowLimiter::with_clock("gc", &config(5, 60_000, 3), clock.clone());
        for key in ["a", "b", "c", "d"] {
            assert!(limiter.check(key));
        }
        assert_eq!(limiter.get_stats()["sweeps"], 0);

        // Four live keys over the threshold: one sweep, nothing dropped
        assert!(limiter.check("e"));
        assert_eq!(limiter.get_stats()["sweeps"], 1);
        assert_eq!(limiter.tracked_keys(), 5);

        // Next mark is 2 * 4 = 8
        for key in ["f", "g", "h", "i"] {
            assert!(limiter.check(key));
        }
        assert_eq!(limiter.get_stats()["sweeps"], 1);
        assert!(limiter.check("j"));
        assert_eq!(limiter.get_stats()["sweeps"], 2);
    }

    #[test]
    fn test_concurrent_same_key_never_exceeds_limit() {
        let limiter = Arc::new(SlidingWindowLimiter::new("threads", &config(10, 60_000, 1024)));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = limiter.clone();
                std::thread::spawn(move || (0..50).filter(|_| limiter.check("shared")).count())
            })
            .collect();
        let total: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(total, 10);
    }

    #[test]
    fn test_stats_count_decisions() {
        let (limiter, _clock) = limiter(1, 1000);
        limiter.check("k");
        limiter.check("k");
        let stats = limiter.get_stats();
        assert_eq!(stats["admitted"], 1);
        assert_eq!(stats["denied"], 1);
        assert_eq!(stats["tracked_keys"], 1);
    }
}
