//! Token bucket rate limiter for provider adapters.
//!
//! Each adapter owns one limiter sized from its declared [`RateLimit`]; the
//! batch engine itself performs no rate coordination.

use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use log::{debug, warn};

/// Default rate limit: 60 requests per minute.
const DEFAULT_REQUESTS_PER_MINUTE: u32 = 60;

/// Default bucket capacity (allows bursting).
const DEFAULT_BUCKET_CAPACITY: f64 = 10.0;

/// Rate limiting configuration for a provider.
///
/// Controls how aggressively an adapter may call its upstream to avoid
/// getting blocked.
#[derive(Clone, Debug, PartialEq)]
pub struct RateLimit {
    /// Maximum requests allowed per minute.
    pub requests_per_minute: u32,

    /// Requests that may be issued back to back before throttling starts.
    pub burst_capacity: f64,
}

impl Default for RateLimit {
    fn default() -> Self {
        Self {
            requests_per_minute: DEFAULT_REQUESTS_PER_MINUTE,
            burst_capacity: DEFAULT_BUCKET_CAPACITY,
        }
    }
}

/// Token bucket state.
#[derive(Debug)]
struct TokenBucket {
    /// Current number of available tokens.
    tokens: f64,
    /// Last time the bucket was updated.
    last_update: Instant,
    /// Token refill rate (tokens per second).
    rate: f64,
    /// Maximum bucket capacity.
    capacity: f64,
}

impl TokenBucket {
    fn from_limit(limit: &RateLimit) -> Self {
        let capacity = limit.burst_capacity.max(1.0);
        Self {
            tokens: capacity,
            last_update: Instant::now(),
            rate: f64::from(limit.requests_per_minute.max(1)) / 60.0,
            capacity,
        }
    }

    /// Refill tokens based on elapsed time.
    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update).as_secs_f64();

        self.tokens = (self.tokens + elapsed * self.rate).min(self.capacity);
        self.last_update = now;
    }

    /// Try to take a token immediately.
    fn try_acquire(&mut self) -> bool {
        self.refill();

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Wait time until a token becomes available.
    fn time_until_available(&mut self) -> Duration {
        self.refill();

        if self.tokens >= 1.0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64((1.0 - self.tokens) / self.rate)
        }
    }
}

/// Thread-safe token bucket shared by all concurrent calls into one adapter.
#[derive(Debug)]
pub struct RateLimiter {
    name: &'static str,
    bucket: Mutex<TokenBucket>,
}

impl RateLimiter {
    /// Create a limiter for the named adapter.
    pub fn new(name: &'static str, limit: &RateLimit) -> Self {
        Self {
            name,
            bucket: Mutex::new(TokenBucket::from_limit(limit)),
        }
    }

    /// Lock the bucket, recovering from poison if necessary.
    fn lock_bucket(&self) -> MutexGuard<'_, TokenBucket> {
        self.bucket.lock().unwrap_or_else(|poisoned| {
            warn!("Rate limiter mutex for '{}' was poisoned, recovering", self.name);
            poisoned.into_inner()
        })
    }

    /// Wait (asynchronously) until a token is available, then take it.
    pub async fn acquire(&self) {
        loop {
            let wait_time = {
                let mut bucket = self.lock_bucket();
                if bucket.try_acquire() {
                    return;
                }
                bucket.time_until_available()
            };

            if wait_time > Duration::ZERO {
                debug!("Rate limiter: waiting {:?} for '{}'", wait_time, self.name);
                tokio::time::sleep(wait_time).await;
            }
        }
    }

    /// Take a token without waiting. Returns false when throttled.
    pub fn try_acquire(&self) -> bool {
        self.lock_bucket().try_acquire()
    }

    /// Tokens currently available.
    pub fn remaining_tokens(&self) -> f64 {
        let mut bucket = self.lock_bucket();
        bucket.refill();
        bucket.tokens
    }
}
