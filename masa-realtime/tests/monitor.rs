mod support;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use masa_core::{ActionError, ActionResult};
use masa_data::{RequestStatus, ServiceRequest};
use masa_realtime::{
    ChangeFeed, ConnectionState, Notifier, PendingSource, QueryInvalidator, RowChange, ServiceRequestMonitor,
};
use uuid::Uuid;

use support::{request, with_status};

const TABLE: &str = "service_requests";

#[derive(Default)]
struct Snapshot(Mutex<Vec<Uuid>>);

impl Snapshot {
    fn of(ids: Vec<Uuid>) -> Arc<Self> {
        Arc::new(Self(Mutex::new(ids)))
    }

    fn replace(&self, ids: Vec<Uuid>) {
        *self.0.lock().unwrap() = ids;
    }
}

#[async_trait]
impl PendingSource for Snapshot {
    async fn pending_ids(&self, _organization_id: Uuid) -> ActionResult<Vec<Uuid>> {
        Ok(self.0.lock().unwrap().clone())
    }
}

/// A guest's call lands while the snapshot query is in flight.
struct RacingSource {
    feed: ChangeFeed<ServiceRequest>,
    row: ServiceRequest,
    seen_by_query: bool,
}

#[async_trait]
impl PendingSource for RacingSource {
    async fn pending_ids(&self, organization_id: Uuid) -> ActionResult<Vec<Uuid>> {
        self.feed.publish(RowChange::insert(TABLE, organization_id, self.row.clone()));
        tokio::task::yield_now().await;
        Ok(if self.seen_by_query { vec![self.row.id] } else { Vec::new() })
    }
}

struct FailingSource;

#[async_trait]
impl PendingSource for FailingSource {
    async fn pending_ids(&self, _organization_id: Uuid) -> ActionResult<Vec<Uuid>> {
        Err(ActionError::database("connection refused"))
    }
}

#[derive(Default)]
struct Tones(AtomicU64);

impl Notifier for Tones {
    fn play_tone(&self, _request: &ServiceRequest) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct Invalidations(Mutex<Vec<Uuid>>);

impl QueryInvalidator for Invalidations {
    fn invalidate(&self, organization_id: Uuid) {
        self.0.lock().unwrap().push(organization_id);
    }
}

/// Wait until the background task has folded in pending changes.
async fn settle<F: Fn() -> bool>(done: F) {
    for _ in 0..100 {
        if done() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("monitor did not settle");
}

#[tokio::test]
async fn counter_matches_pending_rows_after_drain() {
    let org = Uuid::new_v4();
    let feed = ChangeFeed::new(64);
    let existing = vec![Uuid::new_v4(), Uuid::new_v4()];
    let monitor = ServiceRequestMonitor::builder(org, feed.clone(), Snapshot::of(existing)).build();
    monitor.start().await.unwrap();
    assert_eq!(monitor.connection_state(), ConnectionState::Connected);
    assert_eq!(monitor.pending_count(), 2);

    // r1 is acknowledged, completed and reopened; r2 is deleted while pending.
    let r1 = request(org, RequestStatus::Pending);
    let r2 = request(org, RequestStatus::Pending);
    feed.publish(RowChange::insert(TABLE, org, r1.clone()));
    feed.publish(RowChange::insert(TABLE, org, r2.clone()));
    let r1_ack = with_status(&r1, RequestStatus::Acknowledged);
    feed.publish(RowChange::update(TABLE, org, r1.clone(), r1_ack.clone()));
    let r1_done = with_status(&r1_ack, RequestStatus::Completed);
    feed.publish(RowChange::update(TABLE, org, r1_ack, r1_done.clone()));
    feed.publish(RowChange::update(TABLE, org, r1_done.clone(), with_status(&r1_done, RequestStatus::Pending)));
    feed.publish(RowChange::delete(TABLE, org, r2));
    let marker = request(org, RequestStatus::Acknowledged);
    feed.publish(RowChange::insert(TABLE, org, marker.clone()));

    settle(|| monitor.latest().map(|r| r.id) == Some(marker.id)).await;
    // 2 initial + r1 pending again
    assert_eq!(monitor.pending_count(), 3);
}

#[tokio::test]
async fn inserts_notify_and_invalidate() {
    let org = Uuid::new_v4();
    let feed = ChangeFeed::new(16);
    let tones = Arc::new(Tones::default());
    let invalidations = Arc::new(Invalidations::default());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();

    let monitor = ServiceRequestMonitor::builder(org, feed.clone(), Snapshot::of(Vec::new()))
        .notifier(tones.clone())
        .invalidator(invalidations.clone())
        .on_new_request(move |r| sink.lock().unwrap().push(r.id))
        .build();

    let row = request(org, RequestStatus::Pending);
    monitor.apply(&RowChange::insert(TABLE, org, row.clone()));
    assert_eq!(monitor.pending_count(), 1);
    assert_eq!(*seen.lock().unwrap(), vec![row.id]);
    assert_eq!(tones.0.load(Ordering::SeqCst), 1);
    assert_eq!(*invalidations.0.lock().unwrap(), vec![org]);

    monitor.set_sound_enabled(false);
    monitor.apply(&RowChange::insert(TABLE, org, request(org, RequestStatus::Pending)));
    assert_eq!(tones.0.load(Ordering::SeqCst), 1);
    assert_eq!(monitor.pending_count(), 2);
}

#[tokio::test]
async fn changes_of_other_tables_or_tenants_are_ignored() {
    let org = Uuid::new_v4();
    let feed = ChangeFeed::new(16);
    let monitor = ServiceRequestMonitor::builder(org, feed, Snapshot::of(Vec::new())).build();

    let other = Uuid::new_v4();
    monitor.apply(&RowChange::insert(TABLE, other, request(other, RequestStatus::Pending)));
    monitor.apply(&RowChange::insert("orders", org, request(org, RequestStatus::Pending)));
    assert_eq!(monitor.pending_count(), 0);
}

#[tokio::test]
async fn reconnect_reloads_the_count() {
    let org = Uuid::new_v4();
    let feed = ChangeFeed::new(16);
    let source = Snapshot::of(vec![Uuid::new_v4()]);
    let monitor = ServiceRequestMonitor::builder(org, feed.clone(), source.clone()).build();
    monitor.start().await.unwrap();

    feed.close(org);
    let mut state = monitor.watch_connection();
    tokio::time::timeout(Duration::from_secs(1), state.wait_for(|s| *s == ConnectionState::Disconnected))
        .await
        .unwrap()
        .unwrap();

    source.replace((0..4).map(|_| Uuid::new_v4()).collect());
    monitor.reconnect().await.unwrap();
    assert_eq!(monitor.pending_count(), 4);
    assert_eq!(monitor.connection_state(), ConnectionState::Connected);

    feed.publish(RowChange::insert(TABLE, org, request(org, RequestStatus::Pending)));
    settle(|| monitor.pending_count() == 5).await;
}

#[tokio::test]
async fn failed_initial_load_reports_error() {
    let org = Uuid::new_v4();
    let monitor = ServiceRequestMonitor::builder(org, ChangeFeed::new(4), Arc::new(FailingSource)).build();
    assert!(monitor.start().await.is_err());
    assert_eq!(monitor.connection_state(), ConnectionState::Error);
}

#[tokio::test]
async fn stop_disconnects() {
    let org = Uuid::new_v4();
    let feed = ChangeFeed::new(4);
    let monitor = ServiceRequestMonitor::builder(org, feed.clone(), Snapshot::of(Vec::new())).build();
    monitor.start().await.unwrap();
    monitor.stop();
    assert_eq!(monitor.connection_state(), ConnectionState::Disconnected);

    feed.publish(RowChange::insert(TABLE, org, request(org, RequestStatus::Pending)));
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(monitor.pending_count(), 0);
}

#[tokio::test]
async fn call_during_initial_load_is_counted_once() {
    for seen_by_query in [false, true] {
        let org = Uuid::new_v4();
        let feed = ChangeFeed::new(16);
        let row = request(org, RequestStatus::Pending);
        let source = RacingSource {
            feed: feed.clone(),
            row: row.clone(),
            seen_by_query,
        };
        let monitor = ServiceRequestMonitor::builder(org, feed, Arc::new(source)).build();
        monitor.start().await.unwrap();

        settle(|| monitor.latest().map(|r| r.id) == Some(row.id)).await;
        assert_eq!(monitor.pending_count(), 1, "seen_by_query = {seen_by_query}");
    }
}

#[tokio::test]
async fn lagged_monitor_resyncs_and_reconnects() {
    let org = Uuid::new_v4();
    let feed = ChangeFeed::new(2);
    let source = Snapshot::of(Vec::new());
    let invalidations = Arc::new(Invalidations::default());
    let monitor = ServiceRequestMonitor::builder(org, feed.clone(), source.clone())
        .invalidator(invalidations.clone())
        .build();
    monitor.start().await.unwrap();
    let state = monitor.watch_connection();

    // The task has not run yet, so the burst overflows its queue.
    let rows: Vec<_> = (0..5).map(|_| request(org, RequestStatus::Pending)).collect();
    for row in &rows {
        feed.publish(RowChange::insert(TABLE, org, row.clone()));
    }
    source.replace(rows.iter().map(|r| r.id).collect());

    let last = rows[4].id;
    settle(|| monitor.latest().map(|r| r.id) == Some(last)).await;
    assert_eq!(monitor.pending_count(), 5);
    assert_eq!(monitor.connection_state(), ConnectionState::Connected);
    assert!(state.has_changed().unwrap());
    assert!(invalidations.0.lock().unwrap().len() >= 3);
}
