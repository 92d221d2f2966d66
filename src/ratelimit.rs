//! Global token bucket, shared across every worker thread hashing files.
//!
//! Grounded in the original throttling behavior (sleep proportional to bytes read
//! divided by the configured rate) but reshaped into a proper bucket: tokens accrue
//! continuously at `rate` bytes/sec up to `capacity`, and `acquire` blocks the caller
//! until enough tokens exist. The mutex protects only the bookkeeping; the sleep
//! happens after the guard is dropped so threads never serialize on I/O wait time.

use std::sync::Mutex;
use std::time::{Duration, Instant};

struct Bucket {
    tokens: f64,
    capacity: f64,
    rate: f64,
    last_refill: Instant,
}

impl Bucket {
    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.rate).min(self.capacity);
        self.last_refill = now;
    }
}

/// Shared rate limiter. Construct once per run and clone the `Arc` into every worker.
pub struct RateLimiter {
    bucket: Option<Mutex<Bucket>>,
}

impl RateLimiter {
    /// `bytes_per_sec = None` (or `Some(0)`) makes `acquire` a permanent no-op that never
    /// takes a lock, per §4.2's "when no rate is configured" requirement.
    pub fn new(bytes_per_sec: Option<u64>) -> Self {
        let bucket = bytes_per_sec.filter(|&r| r > 0).map(|rate| {
            let rate = rate as f64;
            Mutex::new(Bucket {
                tokens: rate, // start with one second's worth of burst capacity
                capacity: rate,
                rate,
                last_refill: Instant::now(),
            })
        });
        Self { bucket }
    }

    pub fn unlimited() -> Self {
        Self::new(None)
    }

    /// Block the caller until `n` bytes' worth of tokens are available.
    pub fn acquire(&self, n: usize) {
        let Some(bucket) = &self.bucket else {
            return;
        };
        let mut remaining = n as f64;
        loop {
            let wait = {
                let mut b = bucket.lock().unwrap();
                b.refill();
                if b.tokens >= remaining {
                    b.tokens -= remaining;
                    0.0
                } else {
                    let take = b.tokens;
                    b.tokens = 0.0;
                    remaining -= take;
                    // time until enough tokens accrue for the rest
                    remaining / b.rate
                }
            };
            if wait <= 0.0 {
                break;
            }
            std::thread::sleep(Duration::from_secs_f64(wait));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfigured_limiter_never_blocks() {
        let rl = RateLimiter::new(None);
        let start = Instant::now();
        rl.acquire(1_000_000_000);
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[test]
    fn zero_rate_is_treated_as_unlimited() {
        let rl = RateLimiter::new(Some(0));
        let start = Instant::now();
        rl.acquire(1_000_000);
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[test]
    fn acquire_within_capacity_does_not_sleep() {
        let rl = RateLimiter::new(Some(1_000_000));
        let start = Instant::now();
        rl.acquire(1_000);
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[test]
    fn acquire_beyond_capacity_sleeps_proportionally() {
        let rl = RateLimiter::new(Some(1_000));
        let start = Instant::now();
        rl.acquire(1_500);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(400));
        assert!(elapsed < Duration::from_millis(1200));
    }
}
