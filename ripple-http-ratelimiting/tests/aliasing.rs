use http::HeaderMap;
use ripple_http_ratelimiting::{LimitKey, Ratelimiter};
use std::sync::Arc;

fn headers(remaining: u64) -> HeaderMap {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs_f64();

    let mut headers = HeaderMap::new();
    headers.insert("x-ratelimit-bucket", "B".parse().unwrap());
    headers.insert("x-ratelimit-limit", "5".parse().unwrap());
    headers.insert("x-ratelimit-remaining", remaining.to_string().parse().unwrap());
    headers.insert("x-ratelimit-reset", (now + 5.0).to_string().parse().unwrap());
    headers
}

/// S5/S7: two keys that share a server bucket id must resolve to the exact
/// same `Bucket` instance, and a decrement observed through one key is
/// visible through the other and through the bucket-id index directly.
#[tokio::test(start_paused = true)]
async fn two_keys_sharing_a_bucket_id_converge_to_one_bucket() {
    let limiter = Ratelimiter::new();
    let key_a = LimitKey::with_channel("get_a", 1);
    let key_b = LimitKey::with_guild("get_a", 2);

    let from_a = limiter.update(key_a, &headers(4)).unwrap();
    let from_b = limiter.update(key_b, &headers(3)).unwrap();

    assert!(Arc::ptr_eq(&from_a, &from_b));

    let by_key_a = limiter.lookup(key_a).unwrap();
    let by_key_b = limiter.lookup(key_b).unwrap();
    let by_id = limiter.lookup_bucket_id("B").unwrap();

    assert!(Arc::ptr_eq(&by_key_a, &by_key_b));
    assert!(Arc::ptr_eq(&by_key_a, &by_id));
    assert_eq!(3, by_id.remaining());
}

#[tokio::test(start_paused = true)]
async fn distinct_bucket_ids_do_not_alias() {
    let limiter = Ratelimiter::new();
    let key_a = LimitKey::new("get_a");
    let key_c = LimitKey::new("get_c");

    let mut other = headers(2);
    other.insert("x-ratelimit-bucket", "C".parse().unwrap());

    let from_a = limiter.update(key_a, &headers(4)).unwrap();
    let from_c = limiter.update(key_c, &other).unwrap();

    assert!(!Arc::ptr_eq(&from_a, &from_c));
}
