use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl ChangeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeKind::Insert => "INSERT",
            ChangeKind::Update => "UPDATE",
            ChangeKind::Delete => "DELETE",
        }
    }
}

/// One row-level change of a tenant table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowChange<T> {
    pub kind: ChangeKind,
    pub table: &'static str,
    pub organization_id: Uuid,
    pub new: Option<T>,
    pub old: Option<T>,
}

impl<T> RowChange<T> {
    pub fn insert(table: &'static str, organization_id: Uuid, row: T) -> Self {
        Self {
            kind: ChangeKind::Insert,
            table,
            organization_id,
            new: Some(row),
            old: None,
        }
    }

    pub fn update(table: &'static str, organization_id: Uuid, old: T, new: T) -> Self {
        Self {
            kind: ChangeKind::Update,
            table,
            organization_id,
            new: Some(new),
            old: Some(old),
        }
    }

    pub fn delete(table: &'static str, organization_id: Uuid, old: T) -> Self {
        Self {
            kind: ChangeKind::Delete,
            table,
            organization_id,
            new: None,
            old: Some(old),
        }
    }
}

/// Lifecycle of a subscription as reported to its status callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionStatus {
    Subscribed,
    ChannelError,
    TimedOut,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FeedError {
    #[error("feed closed")]
    Closed,
    #[error("subscriber lagged behind by {0} changes")]
    Lagged(u64),
    #[error("no change received within {0:?}")]
    TimedOut(Duration),
}

type StatusCallback = Arc<dyn Fn(SubscriptionStatus) + Send + Sync>;

/// Per-organization broadcast of row changes.
///
/// Cloning shares the channels. Publishing to an organization nobody
/// listens to is a no-op.
pub struct ChangeFeed<T> {
    channels: Arc<DashMap<Uuid, broadcast::Sender<RowChange<T>>>>,
    capacity: usize,
}

impl<T> Clone for ChangeFeed<T> {
    fn clone(&self) -> Self {
        Self {
            channels: self.channels.clone(),
            capacity: self.capacity,
        }
    }
}

impl<T: Clone + Send + 'static> ChangeFeed<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: Arc::new(DashMap::new()),
            capacity: capacity.max(1),
        }
    }

    fn sender(&self, organization_id: Uuid) -> broadcast::Sender<RowChange<T>> {
        self.channels
            .entry(organization_id)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }

    /// Broadcast a change to the organization's subscribers. Returns how
    /// many subscribers received it.
    pub fn publish(&self, change: RowChange<T>) -> usize {
        let organization_id = change.organization_id;
        let kind = change.kind;
        let Some(tx) = self.channels.get(&organization_id).map(|tx| tx.clone()) else {
            return 0;
        };
        match tx.send(change) {
            Ok(receivers) => {
                tracing::trace!(%organization_id, kind = kind.as_str(), receivers, "Row change published");
                receivers
            }
            Err(_) => 0,
        }
    }

    pub fn subscribe(&self, organization_id: Uuid) -> FeedSubscription<T> {
        self.subscribe_with_status(organization_id, |_| {})
    }

    /// Subscribe and report lifecycle changes to `on_status`. `Subscribed` is
    /// reported before this returns.
    pub fn subscribe_with_status(
        &self,
        organization_id: Uuid,
        on_status: impl Fn(SubscriptionStatus) + Send + Sync + 'static,
    ) -> FeedSubscription<T> {
        let rx = self.sender(organization_id).subscribe();
        let on_status: StatusCallback = Arc::new(on_status);
        on_status(SubscriptionStatus::Subscribed);
        FeedSubscription {
            organization_id,
            rx,
            on_status,
            closed: false,
            lagged: false,
        }
    }

    pub fn subscriber_count(&self, organization_id: Uuid) -> usize {
        self.channels
            .get(&organization_id)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }

    /// Drop the organization's channel; its subscribers see `Closed`.
    pub fn close(&self, organization_id: Uuid) {
        self.channels.remove(&organization_id);
    }
}

/// A live subscription to one organization's changes.
pub struct FeedSubscription<T> {
    organization_id: Uuid,
    rx: broadcast::Receiver<RowChange<T>>,
    on_status: StatusCallback,
    closed: bool,
    lagged: bool,
}

impl<T: Clone> FeedSubscription<T> {
    pub fn organization_id(&self) -> Uuid {
        self.organization_id
    }

    /// Next change, skipping over lag. `None` once the feed is closed.
    pub async fn recv(&mut self) -> Option<RowChange<T>> {
        loop {
            match self.next().await {
                Ok(change) => return Some(change),
                Err(FeedError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    }

    /// Like [`recv`](Self::recv) but gives up after `timeout`.
    pub async fn recv_timeout(&mut self, timeout: Duration) -> Result<RowChange<T>, FeedError> {
        match tokio::time::timeout(timeout, self.next()).await {
            Ok(result) => result,
            Err(_) => {
                (self.on_status)(SubscriptionStatus::TimedOut);
                Err(FeedError::TimedOut(timeout))
            }
        }
    }

    /// Next change, or the reason there is none. `Lagged` means changes were
    /// skipped; the subscription stays usable and reports `Subscribed` again
    /// on the next delivered change.
    pub async fn next(&mut self) -> Result<RowChange<T>, FeedError> {
        if self.closed {
            return Err(FeedError::Closed);
        }
        match self.rx.recv().await {
            Ok(change) => {
                if std::mem::take(&mut self.lagged) {
                    (self.on_status)(SubscriptionStatus::Subscribed);
                }
                Ok(change)
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(organization_id = %self.organization_id, skipped, "Feed subscriber lagged");
                self.lagged = true;
                (self.on_status)(SubscriptionStatus::ChannelError);
                Err(FeedError::Lagged(skipped))
            }
            Err(broadcast::error::RecvError::Closed) => {
                self.closed = true;
                (self.on_status)(SubscriptionStatus::Closed);
                Err(FeedError::Closed)
            }
        }
    }
}
