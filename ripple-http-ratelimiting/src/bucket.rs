//! A single route's (or the account's global) cooldown gate.

use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Mutex as StdMutex,
};

use tokio::{sync::Mutex as AsyncMutex, time::Instant};

use crate::error::{BucketError, BucketErrorType};

/// Tracks the remaining-request budget and reset time for one rate-limit
/// bucket.
///
/// A `Bucket` is shared (`Arc`-wrapped by its owner) because the same server
/// bucket can be reached through more than one [`LimitKey`](crate::LimitKey)
/// — see the module docs on [`crate::Ratelimiter`] for the aliasing this
/// exists to support. All mutation here is through atomics or a narrow
/// mutex so that holding a clone of the `Arc` is enough to observe and
/// participate in the cooldown, without a table-wide lock.
#[derive(Debug)]
pub struct Bucket {
    limit: AtomicU64,
    remaining: AtomicU64,
    reset_time: StdMutex<Instant>,
    on_cooldown: AtomicBool,
    gate: AsyncMutex<()>,
}

impl Bucket {
    /// Create a new bucket with no observed limit yet.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            limit: AtomicU64::new(u64::MAX),
            remaining: AtomicU64::new(u64::MAX),
            reset_time: StdMutex::new(Instant::now()),
            on_cooldown: AtomicBool::new(false),
            gate: AsyncMutex::new(()),
        }
    }

    /// The total request budget of the most recent window, as reported by
    /// `X-RateLimit-Limit`.
    #[must_use]
    pub fn limit(&self) -> u64 {
        self.limit.load(Ordering::Relaxed)
    }

    /// The number of requests left in the current window, as of the most
    /// recent header update.
    #[must_use]
    pub fn remaining(&self) -> u64 {
        self.remaining.load(Ordering::Relaxed)
    }

    /// The instant the current window resets.
    #[must_use]
    pub fn reset_time(&self) -> Instant {
        *self.reset_time.lock().expect("bucket mutex poisoned")
    }

    /// Whether a caller is currently sleeping out a cooldown on this bucket.
    #[must_use]
    pub fn on_cooldown(&self) -> bool {
        self.on_cooldown.load(Ordering::Relaxed)
    }

    /// Whether the *next* request against this bucket, absent a header
    /// update, would exhaust the window (`remaining` is already zero and
    /// `reset_time` hasn't passed).
    #[must_use]
    pub fn next_will_limit(&self, now: Instant) -> bool {
        self.remaining() == 0 && now < self.reset_time()
    }

    /// Overwrite this bucket's tracked fields, e.g. after a response carried
    /// fresh headers. Crate-private: callers go through
    /// [`crate::Ratelimiter::update`].
    pub(crate) fn set_fields(&self, limit: u64, remaining: u64, reset_time: Instant) {
        self.limit.store(limit, Ordering::Relaxed);
        self.remaining.store(remaining, Ordering::Relaxed);
        *self.reset_time.lock().expect("bucket mutex poisoned") = reset_time;
    }

    /// Block until this bucket is off cooldown, returning how long the
    /// caller waited if it had to. Returns `None` immediately if the bucket
    /// wasn't on cooldown.
    ///
    /// Concurrent callers all queue on the same internal gate: only one at a
    /// time actually sleeps out a cooldown, and the rest are released once
    /// it's done, just as `twilight-http-ratelimiting`'s own bucket queue
    /// task serializes waiters.
    pub async fn wait(&self) -> Option<std::time::Duration> {
        if !self.on_cooldown() {
            return None;
        }

        let started = Instant::now();
        let _permit = self.gate.lock().await;
        Some(started.elapsed())
    }

    /// Put this bucket on cooldown until `reset_time`, holding the internal
    /// gate for the duration so concurrent [`Bucket::wait`] callers block
    /// until it clears.
    ///
    /// # Errors
    ///
    /// Returns [`BucketErrorType::ClockSkew`] if `reset_time` is already in
    /// the past relative to `now`.
    pub async fn cooldown(&self, now: Instant) -> Result<(), BucketError> {
        let reset_time = self.reset_time();

        let delay = reset_time.checked_duration_since(now).ok_or_else(|| {
            BucketErrorType::ClockSkew {
                reset_time_nanos_ago: now.saturating_duration_since(reset_time).as_nanos(),
            }
        })?;

        self.on_cooldown.store(true, Ordering::Relaxed);
        let _permit = self.gate.lock().await;
        tokio::time::sleep(delay).await;
        self.on_cooldown.store(false, Ordering::Relaxed);

        Ok(())
    }
}

impl Default for Bucket {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::Bucket;
    use static_assertions::assert_impl_all;
    use tokio::time::{self, Duration, Instant};

    assert_impl_all!(Bucket: Send, Sync);

    #[test]
    fn fresh_bucket_is_not_on_cooldown() {
        let bucket = Bucket::new();
        assert!(!bucket.on_cooldown());
    }

    #[tokio::test(start_paused = true)]
    async fn wait_is_instant_when_not_on_cooldown() {
        let bucket = Bucket::new();
        assert_eq!(None, bucket.wait().await);
    }

    #[tokio::test(start_paused = true)]
    async fn cooldown_blocks_concurrent_waiters_until_reset() {
        use std::sync::Arc;

        let bucket = Arc::new(Bucket::new());
        let now = Instant::now();
        bucket.set_fields(1, 0, now + Duration::from_secs(5));

        let cooling = {
            let bucket = Arc::clone(&bucket);
            tokio::spawn(async move { bucket.cooldown(Instant::now()).await })
        };

        time::sleep(Duration::from_millis(1)).await;
        assert!(bucket.on_cooldown());

        let waiter = {
            let bucket = Arc::clone(&bucket);
            tokio::spawn(async move { bucket.wait().await })
        };

        time::advance(Duration::from_secs(5)).await;

        cooling
            .await
            .expect("task completes")
            .expect("cooldown does not error");
        waiter.await.expect("task completes");

        assert!(!bucket.on_cooldown());
    }

    #[tokio::test(start_paused = true)]
    async fn cooldown_rejects_a_reset_time_already_in_the_past() {
        let bucket = Bucket::new();
        let now = Instant::now();
        bucket.set_fields(1, 0, now);

        time::advance(Duration::from_secs(1)).await;

        let result = bucket.cooldown(Instant::now()).await;
        assert!(result.is_err());
    }

    #[test]
    fn next_will_limit_reflects_remaining_and_reset_time() {
        let bucket = Bucket::new();
        let now = Instant::now();
        bucket.set_fields(1, 0, now + Duration::from_secs(1));

        assert!(bucket.next_will_limit(now));
        assert!(!bucket.next_will_limit(now + Duration::from_secs(2)));
    }
}
