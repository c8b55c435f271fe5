use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use masa_rate_limit::{InMemoryWindowLog, RateLimitDecision, RequestCounter, WindowLimiter, WindowPolicy};

#[test]
fn policy_allows_below_max() {
    let policy = WindowPolicy::new(3, Duration::from_secs(300));
    assert_eq!(policy.decide(0), RateLimitDecision::Allowed { remaining: 2 });
    assert_eq!(policy.decide(2), RateLimitDecision::Allowed { remaining: 0 });
}

#[test]
fn policy_limits_at_max() {
    let policy = WindowPolicy::new(3, Duration::from_secs(300));
    assert_eq!(
        policy.decide(3),
        RateLimitDecision::Limited {
            retry_after: Duration::from_secs(300)
        }
    );
    assert!(!policy.decide(10).is_allowed());
}

#[test]
fn window_log_blocks_over_limit() {
    let log = InMemoryWindowLog::new(WindowPolicy::new(2, Duration::from_secs(1)));
    assert!(log.try_acquire(&"key").is_allowed());
    assert!(log.try_acquire(&"key").is_allowed());
    assert!(!log.try_acquire(&"key").is_allowed());
}

#[test]
fn window_log_slides() {
    let log = InMemoryWindowLog::new(WindowPolicy::new(2, Duration::from_secs(10)));
    let t0 = Instant::now();
    assert!(log.try_acquire_at(&"key", t0).is_allowed());
    assert!(log.try_acquire_at(&"key", t0 + Duration::from_secs(4)).is_allowed());

    let limited = log.try_acquire_at(&"key", t0 + Duration::from_secs(6));
    assert_eq!(
        limited,
        RateLimitDecision::Limited {
            retry_after: Duration::from_secs(4)
        }
    );

    // The first event has left the window.
    assert!(log.try_acquire_at(&"key", t0 + Duration::from_secs(10)).is_allowed());
}

#[test]
fn window_log_independent_keys() {
    let log = InMemoryWindowLog::new(WindowPolicy::new(1, Duration::from_secs(1)));
    assert!(log.try_acquire(&"a").is_allowed());
    assert!(!log.try_acquire(&"a").is_allowed());
    assert!(log.try_acquire(&"b").is_allowed());
}

#[test]
fn purge_drops_idle_keys() {
    let log = InMemoryWindowLog::new(WindowPolicy::new(5, Duration::from_secs(1)));
    let t0 = Instant::now();
    log.try_acquire_at(&"a", t0);
    log.try_acquire_at(&"b", t0 + Duration::from_millis(900));
    log.purge_at(t0 + Duration::from_millis(1500));
    assert_eq!(log.tracked_keys(), 1);
}

/// Counter over fixed event timestamps.
struct Events(Mutex<HashMap<&'static str, Vec<DateTime<Utc>>>>);

impl RequestCounter<&'static str> for Events {
    type Error = String;

    async fn count_since(&self, key: &&'static str, since: DateTime<Utc>) -> Result<u64, String> {
        let events = self.0.lock().map_err(|e| e.to_string())?;
        Ok(events
            .get(key)
            .map(|ts| ts.iter().filter(|t| **t >= since).count() as u64)
            .unwrap_or(0))
    }
}

#[tokio::test]
async fn limiter_counts_trailing_window() {
    let now = Utc::now();
    let minutes = |m: i64| now - chrono::Duration::minutes(m);
    let events = Events(Mutex::new(HashMap::from([(
        "table-1",
        vec![minutes(1), minutes(2), minutes(4)],
    )])));
    let limiter = WindowLimiter::new(WindowPolicy::new(3, Duration::from_secs(300)), events);

    assert!(!limiter.check(&"table-1", now).await.unwrap().is_allowed());
    // Two minutes later the oldest event is outside the window.
    let later = now + chrono::Duration::minutes(2);
    assert_eq!(
        limiter.check(&"table-1", later).await.unwrap(),
        RateLimitDecision::Allowed { remaining: 0 }
    );
    assert!(limiter.check(&"table-2", now).await.unwrap().is_allowed());
}
