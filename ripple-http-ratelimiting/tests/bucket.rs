use http::HeaderMap;
use ripple_http_ratelimiting::{LimitKey, Ratelimiter};
use std::sync::Arc;
use tokio::time::{self, Duration, Instant};

fn headers_with_reset_in(secs_from_now: f64) -> HeaderMap {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs_f64();

    let mut headers = HeaderMap::new();
    headers.insert("x-ratelimit-bucket", "scenario-bucket".parse().unwrap());
    headers.insert("x-ratelimit-limit", "1".parse().unwrap());
    headers.insert("x-ratelimit-remaining", "0".parse().unwrap());
    headers.insert(
        "x-ratelimit-reset",
        (now + secs_from_now).to_string().parse().unwrap(),
    );
    headers
}

#[tokio::test(start_paused = true)]
async fn wait_completes_around_the_reset_delay_and_then_clears_cooldown() {
    let limiter = Ratelimiter::new();
    let key = LimitKey::new("get_gateway");

    let bucket = limiter
        .update(key, &headers_with_reset_in(1.0))
        .expect("headers are sufficient");

    assert!(bucket.next_will_limit(Instant::now()));

    let cooling = {
        let bucket = Arc::clone(&bucket);
        tokio::spawn(async move { bucket.cooldown(Instant::now()).await })
    };

    time::sleep(Duration::from_millis(1)).await;
    assert!(bucket.on_cooldown());

    let waiter = {
        let bucket = Arc::clone(&bucket);
        tokio::spawn(async move {
            let started = Instant::now();
            bucket.wait().await;
            started.elapsed()
        })
    };

    time::advance(Duration::from_secs(1)).await;
    cooling.await.unwrap().expect("cooldown does not error");

    let elapsed = waiter.await.unwrap();
    assert!(elapsed >= Duration::from_millis(980));
    assert!(elapsed <= Duration::from_millis(1020));

    assert!(!bucket.on_cooldown());
    assert_eq!(None, bucket.wait().await);
}
