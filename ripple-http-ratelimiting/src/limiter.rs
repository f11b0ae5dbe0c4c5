//! The dual-indexed bucket registry: [`Ratelimiter`].

use std::{
    collections::HashMap,
    sync::{Arc, Mutex as StdMutex},
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use tokio::time::Instant;

#[cfg(feature = "tracing")]
use tracing::debug;

use crate::{
    bucket::Bucket,
    error::{UpdateError, UpdateErrorType},
    headers::parse_raw,
    key::LimitKey,
};

/// Tracks one [`Bucket`] per route the caller has seen, plus a second index
/// keyed by the server-assigned bucket id so that routes which alias to the
/// same server bucket (a detail only discoverable from response headers)
/// converge onto a single shared `Bucket` instance.
///
/// This mirrors `twilight-http-ratelimiting`'s own path-to-bucket-id
/// indirection, generalized to the caller-supplied [`LimitKey`] this crate
/// uses in place of a concrete route enum.
#[derive(Debug, Default)]
pub struct Ratelimiter {
    by_key: StdMutex<HashMap<LimitKey, Arc<Bucket>>>,
    by_bucket_id: StdMutex<HashMap<Box<str>, Arc<Bucket>>>,
}

impl Ratelimiter {
    /// Create an empty ratelimiter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the bucket currently associated with `key`, if any request
    /// through this key has been seen before.
    #[must_use]
    pub fn lookup(&self, key: LimitKey) -> Option<Arc<Bucket>> {
        self.by_key
            .lock()
            .expect("ratelimiter mutex poisoned")
            .get(&key)
            .cloned()
    }

    /// Look up the bucket currently associated with a server-assigned
    /// bucket id, if headers carrying that id have been seen before.
    #[must_use]
    pub fn lookup_bucket_id(&self, bucket_id: &str) -> Option<Arc<Bucket>> {
        self.by_bucket_id
            .lock()
            .expect("ratelimiter mutex poisoned")
            .get(bucket_id)
            .cloned()
    }

    /// Get-or-create the bucket for `key`, to block on before issuing a
    /// request.
    #[must_use]
    pub fn entry(&self, key: LimitKey) -> Arc<Bucket> {
        let mut by_key = self.by_key.lock().expect("ratelimiter mutex poisoned");

        Arc::clone(by_key.entry(key).or_insert_with(|| Arc::new(Bucket::new())))
    }

    /// Apply a response's rate-limit headers to the table, resolving the
    /// bucket for `key` and updating its remaining/limit/reset fields.
    ///
    /// Three cases, checked in order:
    ///
    /// 1. `X-RateLimit-Limit`, `X-RateLimit-Remaining`, `X-RateLimit-Reset`,
    ///    and `X-RateLimit-Bucket` are all present: the reset instant is
    ///    `Date + Retry-After` when both of those are also present, else the
    ///    UNIX-seconds value of `X-RateLimit-Reset` directly.
    /// 2. Only `Retry-After` is present (a global `429`, which carries no
    ///    bucket of its own): synthesize a zeroed-out bucket with
    ///    `limit = remaining = 0` and `reset = (Date or now) + Retry-After`,
    ///    installed at `key` with no bucket id.
    /// 3. Neither: the headers are insufficient to track a window.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateErrorType::HeadersIncomplete`] if neither case above
    /// applies, and propagates [`UpdateErrorType::Parsing`] from malformed
    /// header values.
    pub fn update(
        &self,
        key: LimitKey,
        headers: &http::HeaderMap,
    ) -> Result<Arc<Bucket>, UpdateError> {
        let raw = parse_raw(headers)?;
        let now_instant = Instant::now();
        let now_system = SystemTime::now();

        let bucket = if let (Some(limit), Some(remaining), Some(reset), Some(bucket_id)) =
            (raw.limit, raw.remaining, raw.reset, raw.bucket.as_deref())
        {
            let reset_time = match (raw.retry_after, raw.date.as_deref()) {
                (Some(retry_after_ms), Some(date)) => {
                    let date = parse_http_date(date)?;
                    to_instant(
                        now_instant,
                        now_system,
                        date + Duration::from_secs_f64(retry_after_ms / 1000.0),
                    )
                }
                _ => to_instant(now_instant, now_system, UNIX_EPOCH + Duration::from_secs_f64(reset)),
            };

            self.inner_update(key, Some(bucket_id), limit, remaining, reset_time)
        } else if let Some(retry_after_ms) = raw.retry_after {
            let base = raw
                .date
                .as_deref()
                .map(parse_http_date)
                .transpose()?
                .unwrap_or(now_system);
            let reset_time = to_instant(
                now_instant,
                now_system,
                base + Duration::from_secs_f64(retry_after_ms / 1000.0),
            );

            self.inner_update(key, None, 0, 0, reset_time)
        } else {
            return Err(UpdateErrorType::HeadersIncomplete {
                missing: "x-ratelimit-reset",
            }
            .into());
        };

        #[cfg(feature = "tracing")]
        debug!(%key, limit = bucket.limit(), remaining = bucket.remaining(), "updated ratelimit bucket");

        Ok(bucket)
    }

    fn inner_update(
        &self,
        key: LimitKey,
        bucket_id: Option<&str>,
        limit: u64,
        remaining: u64,
        reset_time: Instant,
    ) -> Arc<Bucket> {
        let mut by_bucket_id = self.by_bucket_id.lock().expect("ratelimiter mutex poisoned");
        let mut by_key = self.by_key.lock().expect("ratelimiter mutex poisoned");

        let existing = bucket_id.and_then(|id| by_bucket_id.get(id).cloned());

        let bucket = existing.unwrap_or_else(|| Arc::new(Bucket::new()));
        bucket.set_fields(limit, remaining, reset_time);

        by_key.insert(key, Arc::clone(&bucket));

        if let Some(id) = bucket_id {
            by_bucket_id.insert(id.into(), Arc::clone(&bucket));
        }

        bucket
    }
}

fn parse_http_date(date: &str) -> Result<SystemTime, UpdateError> {
    httpdate::parse_http_date(date)
        .map_err(|_| UpdateError::from(UpdateErrorType::Parsing { name: "date", value: date.into() }))
}

/// Translate a `SystemTime` target into an `Instant` on the tokio clock, by
/// offsetting from the current instant by the wall-clock delta to target.
/// This keeps the calculation correct under `tokio::time::pause` (where
/// `Instant::now()` and `SystemTime::now()` advance in lockstep only via
/// `tokio::time::advance`) without the ratelimiter needing to know whether
/// the clock is paused.
fn to_instant(now_instant: Instant, now_system: SystemTime, target: SystemTime) -> Instant {
    match target.duration_since(now_system) {
        Ok(delta) => now_instant + delta,
        Err(expired) => now_instant - expired.duration(),
    }
}

#[cfg(test)]
mod tests {
    use super::Ratelimiter;
    use crate::key::LimitKey;
    use http::HeaderMap;
    use static_assertions::assert_impl_all;
    use std::sync::Arc;

    assert_impl_all!(Ratelimiter: Send, Sync);

    #[test]
    fn unseen_key_has_no_bucket() {
        let limiter = Ratelimiter::new();
        assert!(limiter.lookup(LimitKey::global()).is_none());
    }

    #[test]
    fn entry_creates_and_then_reuses_a_bucket() {
        let limiter = Ratelimiter::new();
        let key = LimitKey::new("get_gateway");

        let first = limiter.entry(key);
        let second = limiter.entry(key);

        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test(start_paused = true)]
    async fn update_without_any_recognized_header_is_an_error() {
        let limiter = Ratelimiter::new();
        let headers = HeaderMap::new();

        assert!(limiter.update(LimitKey::global(), &headers).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn update_resolves_reset_time_from_the_reset_header() {
        let limiter = Ratelimiter::new();
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs_f64();
        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-bucket", "abcd".parse().unwrap());
        headers.insert("x-ratelimit-limit", "5".parse().unwrap());
        headers.insert("x-ratelimit-remaining", "4".parse().unwrap());
        headers.insert("x-ratelimit-reset", (now + 1.0).to_string().parse().unwrap());

        let bucket = limiter
            .update(LimitKey::new("get_gateway"), &headers)
            .expect("headers are sufficient");

        assert_eq!(5, bucket.limit());
        assert_eq!(4, bucket.remaining());
    }

    #[tokio::test(start_paused = true)]
    async fn update_synthesizes_a_zeroed_bucket_for_a_global_429() {
        let limiter = Ratelimiter::new();
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", "500".parse().unwrap());

        let bucket = limiter
            .update(LimitKey::global(), &headers)
            .expect("retry-after alone is sufficient for the global bucket");

        assert_eq!(0, bucket.limit());
        assert_eq!(0, bucket.remaining());
    }

    #[tokio::test(start_paused = true)]
    async fn two_keys_sharing_a_bucket_id_alias_to_one_bucket() {
        let limiter = Ratelimiter::new();
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs_f64();
        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-bucket", "shared-bucket".parse().unwrap());
        headers.insert("x-ratelimit-limit", "5".parse().unwrap());
        headers.insert("x-ratelimit-remaining", "2".parse().unwrap());
        headers.insert("x-ratelimit-reset", (now + 1.0).to_string().parse().unwrap());

        let a = limiter
            .update(LimitKey::with_channel("get_messages", 1), &headers)
            .unwrap();

        headers.insert("x-ratelimit-remaining", "1".parse().unwrap());
        let b = limiter
            .update(LimitKey::with_channel("edit_message", 1), &headers)
            .unwrap();

        assert!(std::sync::Arc::ptr_eq(&a, &b));
        assert_eq!(1, a.remaining());
    }
}
