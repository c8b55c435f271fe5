//! Live pending-request counter for one organization's dashboard.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use masa_core::ActionResult;
use masa_data::{ServiceRequest, ServiceRequestRepository};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::feed::{ChangeFeed, ChangeKind, FeedError, FeedSubscription, RowChange, SubscriptionStatus};

pub const SERVICE_REQUESTS: &str = "service_requests";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected,
    Error,
}

impl From<SubscriptionStatus> for ConnectionState {
    fn from(status: SubscriptionStatus) -> Self {
        match status {
            SubscriptionStatus::Subscribed => ConnectionState::Connected,
            SubscriptionStatus::ChannelError => ConnectionState::Error,
            SubscriptionStatus::TimedOut | SubscriptionStatus::Closed => ConnectionState::Disconnected,
        }
    }
}

/// Snapshot of the pending requests, loaded on (re)connect and after the
/// subscription lagged.
#[async_trait]
pub trait PendingSource: Send + Sync {
    async fn pending_ids(&self, organization_id: Uuid) -> ActionResult<Vec<Uuid>>;
}

/// Plays the new-request tone.
pub trait Notifier: Send + Sync {
    fn play_tone(&self, request: &ServiceRequest);
}

/// Marks cached views of the organization as stale.
pub trait QueryInvalidator: Send + Sync {
    fn invalidate(&self, organization_id: Uuid);
}

/// [`PendingSource`] reading the service-request store.
pub struct RepositoryPendingSource(pub Arc<dyn ServiceRequestRepository>);

#[async_trait]
impl PendingSource for RepositoryPendingSource {
    async fn pending_ids(&self, organization_id: Uuid) -> ActionResult<Vec<Uuid>> {
        Ok(self.0.pending_ids(organization_id).await?)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MonitorSnapshot {
    pub pending_count: u64,
    pub connection: ConnectionState,
    pub latest: Option<ServiceRequest>,
}

type NewRequestCallback = Arc<dyn Fn(&ServiceRequest) + Send + Sync>;

#[derive(Default)]
struct Counters {
    /// Tracked by id so a change already reflected in a snapshot is not
    /// counted twice.
    pending: HashSet<Uuid>,
    latest: Option<ServiceRequest>,
}

struct Shared {
    organization_id: Uuid,
    counters: Mutex<Counters>,
    connection: watch::Sender<ConnectionState>,
    sound_enabled: AtomicBool,
    notifier: Option<Arc<dyn Notifier>>,
    invalidator: Option<Arc<dyn QueryInvalidator>>,
    on_new_request: Option<NewRequestCallback>,
}

impl Shared {
    fn counters(&self) -> std::sync::MutexGuard<'_, Counters> {
        self.counters.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, state: ConnectionState) {
        self.connection.send_replace(state);
    }

    fn invalidate(&self) {
        if let Some(invalidator) = &self.invalidator {
            invalidator.invalidate(self.organization_id);
        }
    }

    /// Replace the pending set with a fresh snapshot.
    async fn resync(&self, source: &dyn PendingSource) -> ActionResult<usize> {
        match source.pending_ids(self.organization_id).await {
            Ok(ids) => {
                let mut counters = self.counters();
                counters.pending = ids.into_iter().collect();
                Ok(counters.pending.len())
            }
            Err(e) => {
                tracing::warn!(organization_id = %self.organization_id, error = %e, "Could not load pending requests");
                Err(e)
            }
        }
    }

    fn apply(&self, change: &RowChange<ServiceRequest>) {
        if change.table != SERVICE_REQUESTS || change.organization_id != self.organization_id {
            return;
        }
        let is_pending = change.new.as_ref().is_some_and(|r| r.status.is_pending());

        match change.kind {
            ChangeKind::Insert => {
                let Some(row) = &change.new else { return };
                {
                    let mut counters = self.counters();
                    if is_pending {
                        counters.pending.insert(row.id);
                    }
                    counters.latest = Some(row.clone());
                }
                tracing::debug!(
                    organization_id = %self.organization_id,
                    request_id = %row.id,
                    table_id = %row.table_id,
                    "New service request"
                );
                if let Some(callback) = &self.on_new_request {
                    callback(row);
                }
                if self.sound_enabled.load(Ordering::Relaxed) {
                    if let Some(notifier) = &self.notifier {
                        notifier.play_tone(row);
                    }
                }
                self.invalidate();
            }
            ChangeKind::Update => {
                {
                    let Some(row) = &change.new else { return };
                    let mut counters = self.counters();
                    if is_pending {
                        counters.pending.insert(row.id);
                    } else {
                        counters.pending.remove(&row.id);
                    }
                    if let Some(latest) = counters.latest.as_mut() {
                        if latest.id == row.id {
                            *latest = row.clone();
                        }
                    }
                }
                self.invalidate();
            }
            ChangeKind::Delete => {
                if let Some(row) = &change.old {
                    self.counters().pending.remove(&row.id);
                }
                self.invalidate();
            }
        }
    }
}

/// Subscribes to an organization's service-request changes and keeps the
/// number of pending requests.
///
/// The background subscription is torn down by [`stop`](Self::stop) or when
/// the monitor is dropped.
pub struct ServiceRequestMonitor {
    shared: Arc<Shared>,
    feed: ChangeFeed<ServiceRequest>,
    source: Arc<dyn PendingSource>,
    task: Mutex<Option<JoinHandle<()>>>,
}

pub struct MonitorBuilder {
    organization_id: Uuid,
    feed: ChangeFeed<ServiceRequest>,
    source: Arc<dyn PendingSource>,
    sound_enabled: bool,
    notifier: Option<Arc<dyn Notifier>>,
    invalidator: Option<Arc<dyn QueryInvalidator>>,
    on_new_request: Option<NewRequestCallback>,
}

impl MonitorBuilder {
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn invalidator(mut self, invalidator: Arc<dyn QueryInvalidator>) -> Self {
        self.invalidator = Some(invalidator);
        self
    }

    pub fn on_new_request(mut self, callback: impl Fn(&ServiceRequest) + Send + Sync + 'static) -> Self {
        self.on_new_request = Some(Arc::new(callback));
        self
    }

    pub fn sound_enabled(mut self, enabled: bool) -> Self {
        self.sound_enabled = enabled;
        self
    }

    pub fn build(self) -> ServiceRequestMonitor {
        let (connection, _) = watch::channel(ConnectionState::Disconnected);
        ServiceRequestMonitor {
            shared: Arc::new(Shared {
                organization_id: self.organization_id,
                counters: Mutex::new(Counters::default()),
                connection,
                sound_enabled: AtomicBool::new(self.sound_enabled),
                notifier: self.notifier,
                invalidator: self.invalidator,
                on_new_request: self.on_new_request,
            }),
            feed: self.feed,
            source: self.source,
            task: Mutex::new(None),
        }
    }
}

impl ServiceRequestMonitor {
    pub fn builder(
        organization_id: Uuid,
        feed: ChangeFeed<ServiceRequest>,
        source: Arc<dyn PendingSource>,
    ) -> MonitorBuilder {
        MonitorBuilder {
            organization_id,
            feed,
            source,
            sound_enabled: true,
            notifier: None,
            invalidator: None,
            on_new_request: None,
        }
    }

    pub fn organization_id(&self) -> Uuid {
        self.shared.organization_id
    }

    /// Subscribe, then load the pending snapshot. Restarts if already running.
    ///
    /// Changes published while the snapshot loads stay queued on the
    /// subscription and are folded in afterwards; folding is idempotent per
    /// request id.
    pub async fn start(&self) -> ActionResult<()> {
        self.teardown();
        let organization_id = self.shared.organization_id;

        let status_target = self.shared.clone();
        let subscription = self.feed.subscribe_with_status(organization_id, move |status| {
            status_target.set_state(status.into());
        });
        self.shared.set_state(ConnectionState::Connecting);

        let pending = match self.shared.resync(self.source.as_ref()).await {
            Ok(pending) => pending,
            Err(e) => {
                self.shared.set_state(ConnectionState::Error);
                return Err(e);
            }
        };
        self.shared.set_state(ConnectionState::Connected);

        let handle = tokio::spawn(drain(subscription, self.shared.clone(), self.source.clone()));
        *self.task.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);

        tracing::debug!(%organization_id, pending, "Monitor started");
        Ok(())
    }

    /// Manual teardown and resubscribe; reloads the pending count.
    pub async fn reconnect(&self) -> ActionResult<()> {
        tracing::info!(organization_id = %self.shared.organization_id, "Monitor reconnecting");
        self.start().await
    }

    pub fn stop(&self) {
        self.teardown();
        self.shared.set_state(ConnectionState::Disconnected);
    }

    fn teardown(&self) {
        if let Some(handle) = self.task.lock().unwrap_or_else(|e| e.into_inner()).take() {
            handle.abort();
        }
    }

    /// Fold one change into the counters. The background task calls this for
    /// every change it receives.
    pub fn apply(&self, change: &RowChange<ServiceRequest>) {
        self.shared.apply(change);
    }

    pub fn pending_count(&self) -> u64 {
        self.shared.counters().pending.len() as u64
    }

    pub fn latest(&self) -> Option<ServiceRequest> {
        self.shared.counters().latest.clone()
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.shared.connection.borrow()
    }

    pub fn watch_connection(&self) -> watch::Receiver<ConnectionState> {
        self.shared.connection.subscribe()
    }

    pub fn set_sound_enabled(&self, enabled: bool) {
        self.shared.sound_enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MonitorSnapshot {
        let counters = self.shared.counters();
        MonitorSnapshot {
            pending_count: counters.pending.len() as u64,
            connection: self.connection_state(),
            latest: counters.latest.clone(),
        }
    }
}

/// Fold changes until the feed closes. Skipped changes are recovered by
/// reloading the snapshot; the queue after the lag point is still applied.
async fn drain(
    mut subscription: FeedSubscription<ServiceRequest>,
    shared: Arc<Shared>,
    source: Arc<dyn PendingSource>,
) {
    loop {
        match subscription.next().await {
            Ok(change) => shared.apply(&change),
            Err(FeedError::Lagged(_)) => {
                if shared.resync(source.as_ref()).await.is_ok() {
                    shared.invalidate();
                    shared.set_state(ConnectionState::Connected);
                }
            }
            Err(_) => break,
        }
    }
}

impl Drop for ServiceRequestMonitor {
    fn drop(&mut self) {
        self.teardown();
    }
}
