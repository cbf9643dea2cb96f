//! Rate limiter contract and a token-bucket implementation.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::transport::RateLimitError;

/// A shared gate that admits calls at a bounded rate.
///
/// Implementations are shared across concurrent calls and must be safe for
/// concurrent use.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Waits until the call is permitted or `deadline` makes waiting pointless.
    ///
    /// Dropping the returned future abandons the wait.
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitError`] when no permit can be granted in time.
    async fn wait(&self, deadline: Instant) -> Result<(), RateLimitError>;
}

/// A token bucket: `burst` tokens up front, refilled at a steady rate.
///
/// Waiting callers reserve a future token immediately, so concurrent
/// waiters are served in arrival order. A reservation that is abandoned
/// before it matures is refunded.
///
/// # Example
///
/// ```
/// use resilient_http::resilience::TokenBucket;
///
/// // Two requests immediately, then one per second.
/// let bucket = TokenBucket::new(1.0, 2);
/// assert_eq!(bucket.burst(), 2);
/// ```
#[derive(Debug)]
pub struct TokenBucket {
    rate_per_sec: f64,
    burst: u32,
    state: Mutex<BucketState>,
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    refilled_at: Instant,
}

impl TokenBucket {
    /// Creates a full bucket.
    ///
    /// A non-positive or non-finite rate is treated as one token per second,
    /// and a zero burst as one.
    #[must_use]
    pub fn new(rate_per_sec: f64, burst: u32) -> Self {
        let rate_per_sec = if rate_per_sec.is_finite() && rate_per_sec > 0.0 {
            rate_per_sec
        } else {
            1.0
        };
        let burst = burst.max(1);
        Self {
            rate_per_sec,
            burst,
            state: Mutex::new(BucketState {
                tokens: f64::from(burst),
                refilled_at: Instant::now(),
            }),
        }
    }

    /// Returns the refill rate in tokens per second.
    #[must_use]
    pub const fn rate_per_sec(&self) -> f64 {
        self.rate_per_sec
    }

    /// Returns the bucket capacity.
    #[must_use]
    pub const fn burst(&self) -> u32 {
        self.burst
    }

    /// Takes a token if one is available right now.
    #[must_use]
    pub fn try_acquire(&self) -> bool {
        let mut state = self.lock();
        self.refill(&mut state, Instant::now());
        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Reserves the next token and returns how long until it matures.
    fn reserve(&self, now: Instant, deadline: Instant) -> Result<Duration, RateLimitError> {
        let mut state = self.lock();
        self.refill(&mut state, now);

        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            return Ok(Duration::ZERO);
        }
        if now >= deadline {
            return Err(RateLimitError::DeadlineExceeded);
        }

        let wait = Duration::from_secs_f64((1.0 - state.tokens) / self.rate_per_sec);
        if now + wait > deadline {
            return Err(RateLimitError::WouldExceedDeadline { wait });
        }
        state.tokens -= 1.0;
        Ok(wait)
    }

    fn refund(&self) {
        let mut state = self.lock();
        state.tokens = (state.tokens + 1.0).min(f64::from(self.burst));
    }

    fn refill(&self, state: &mut BucketState, now: Instant) {
        let elapsed = now.saturating_duration_since(state.refilled_at);
        state.tokens =
            (state.tokens + elapsed.as_secs_f64() * self.rate_per_sec).min(f64::from(self.burst));
        state.refilled_at = now;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BucketState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Refunds a reserved token unless the wait completed.
struct Reservation<'a> {
    bucket: &'a TokenBucket,
    matured: bool,
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if !self.matured {
            self.bucket.refund();
        }
    }
}

#[async_trait]
impl RateLimiter for TokenBucket {
    async fn wait(&self, deadline: Instant) -> Result<(), RateLimitError> {
        let now = Instant::now();
        let wait = self.reserve(now, deadline)?;
        if wait.is_zero() {
            return Ok(());
        }

        let mut reservation = Reservation {
            bucket: self,
            matured: false,
        };
        tokio::time::sleep_until(now + wait).await;
        reservation.matured = true;
        Ok(())
    }
}
