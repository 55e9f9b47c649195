//! Token bucket rate limiter for oracle requests.
//!
//! Tokens refill continuously based on elapsed time; `acquire` waits until
//! a full token is available and consumes it. Capacity equals the refill
//! rate, allowing a one-second burst at most.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tokio::time::sleep;

/// Token bucket limiter shared across clones.
#[derive(Clone)]
pub struct TokenBucketRateLimiter {
    state: Arc<Mutex<BucketState>>,
    capacity: f64,
    refill_rate: f64,
}

struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucketRateLimiter {
    /// Create a limiter allowing `requests_per_second` sustained requests.
    pub fn new(requests_per_second: f64) -> Self {
        let rate = requests_per_second.max(0.01);
        Self {
            state: Arc::new(Mutex::new(BucketState {
                tokens: rate,
                last_refill: Instant::now(),
            })),
            capacity: rate,
            refill_rate: rate,
        }
    }

    /// Wait until a token is available, then consume it.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut state = self.state.lock().await;
                let elapsed = state.last_refill.elapsed().as_secs_f64();
                state.tokens = (state.tokens + elapsed * self.refill_rate).min(self.capacity);
                state.last_refill = Instant::now();
                if state.tokens >= 1.0 {
                    state.tokens -= 1.0;
                    return;
                }
                // Time until one full token accumulates.
                Duration::from_secs_f64((1.0 - state.tokens) / self.refill_rate)
            };
            sleep(wait).await;
        }
    }
}
