//! Trailing-window rate limiting.
//!
//! A [`WindowPolicy`] turns "how many events happened in the last window"
//! into a [`RateLimitDecision`]. The count comes from a [`RequestCounter`]:
//! the service-request store for per-table limits, or an
//! [`InMemoryWindowLog`] for anonymous clients.

pub mod throttle;
pub use throttle::{client_key, throttle_clients, ClientThrottle};

use std::collections::VecDeque;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use dashmap::DashMap;

/// At most `max` events per trailing `window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowPolicy {
    pub max: u64,
    pub window: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    /// `remaining` events may still follow this one inside the window.
    Allowed { remaining: u64 },
    Limited { retry_after: Duration },
}

impl RateLimitDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitDecision::Allowed { .. })
    }
}

impl WindowPolicy {
    pub fn new(max: u64, window: Duration) -> Self {
        Self { max, window }
    }

    /// Decide given the number of events already inside the window.
    ///
    /// Without the timestamp of the oldest event the full window is the
    /// retry hint.
    pub fn decide(&self, count: u64) -> RateLimitDecision {
        if count >= self.max {
            RateLimitDecision::Limited {
                retry_after: self.window,
            }
        } else {
            RateLimitDecision::Allowed {
                remaining: self.max - count - 1,
            }
        }
    }

    /// Start of the window ending at `now`.
    pub fn window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let window = chrono::Duration::from_std(self.window).unwrap_or(chrono::Duration::MAX);
        now.checked_sub_signed(window).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

/// Source of "how many events for `key` happened since `since`".
pub trait RequestCounter<K: Sync>: Send + Sync {
    type Error: Send;

    fn count_since(
        &self,
        key: &K,
        since: DateTime<Utc>,
    ) -> impl Future<Output = Result<u64, Self::Error>> + Send;
}

/// A policy applied to counts from a [`RequestCounter`].
///
/// The check does not record anything; the caller inserts the event after an
/// `Allowed` decision, so concurrent callers may briefly overshoot `max`.
#[derive(Clone)]
pub struct WindowLimiter<C> {
    policy: WindowPolicy,
    counter: C,
}

impl<C> WindowLimiter<C> {
    pub fn new(policy: WindowPolicy, counter: C) -> Self {
        Self { policy, counter }
    }

    pub fn policy(&self) -> &WindowPolicy {
        &self.policy
    }

    pub async fn check<K: Sync>(&self, key: &K, now: DateTime<Utc>) -> Result<RateLimitDecision, C::Error>
    where
        C: RequestCounter<K>,
    {
        let count = self.counter.count_since(key, self.policy.window_start(now)).await?;
        Ok(self.policy.decide(count))
    }
}

/// In-memory sliding log keyed by an arbitrary type.
///
/// Each key keeps the instants of its admitted events; instants older than
/// the window are dropped on access.
#[derive(Clone)]
pub struct InMemoryWindowLog<K> {
    entries: Arc<DashMap<K, VecDeque<Instant>>>,
    policy: WindowPolicy,
}

impl<K: Eq + Hash + Clone> InMemoryWindowLog<K> {
    pub fn new(policy: WindowPolicy) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            policy,
        }
    }

    pub fn policy(&self) -> &WindowPolicy {
        &self.policy
    }

    /// Record an event for `key` if the policy allows it.
    pub fn try_acquire(&self, key: &K) -> RateLimitDecision {
        self.try_acquire_at(key, Instant::now())
    }

    pub fn try_acquire_at(&self, key: &K, now: Instant) -> RateLimitDecision {
        let mut entry = self.entries.entry(key.clone()).or_default();
        let log = entry.value_mut();
        while let Some(&oldest) = log.front() {
            if now.saturating_duration_since(oldest) >= self.policy.window {
                log.pop_front();
            } else {
                break;
            }
        }

        match self.policy.decide(log.len() as u64) {
            RateLimitDecision::Limited { .. } => {
                let retry_after = log
                    .front()
                    .map(|&oldest| self.policy.window.saturating_sub(now.saturating_duration_since(oldest)))
                    .unwrap_or(self.policy.window);
                RateLimitDecision::Limited { retry_after }
            }
            allowed => {
                log.push_back(now);
                allowed
            }
        }
    }

    /// Drop keys whose every event has left the window.
    pub fn purge_at(&self, now: Instant) {
        let window = self.policy.window;
        self.entries.retain(|_, log| {
            log.back()
                .map(|&newest| now.saturating_duration_since(newest) < window)
                .unwrap_or(false)
        });
    }

    pub fn tracked_keys(&self) -> usize {
        self.entries.len()
    }
}

impl<K: Eq + Hash + Clone + Send + Sync> RequestCounter<K> for InMemoryWindowLog<K> {
    type Error = std::convert::Infallible;

    /// Counts the events still inside the log's own window; `since` is
    /// honoured by converting it to an instant relative to now.
    fn count_since(
        &self,
        key: &K,
        since: DateTime<Utc>,
    ) -> impl Future<Output = Result<u64, Self::Error>> + Send {
        let age = (Utc::now() - since).to_std().unwrap_or_default();
        let cutoff = Instant::now().checked_sub(age);
        let count = self
            .entries
            .get(key)
            .map(|log| {
                log.iter()
                    .filter(|&&at| cutoff.map_or(true, |cutoff| at >= cutoff))
                    .count() as u64
            })
            .unwrap_or(0);
        async move { Ok(count) }
    }
}
