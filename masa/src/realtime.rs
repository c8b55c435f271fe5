//! Server-side glue for the realtime layer: one live monitor per
//! organization backing the dashboard summary badge.

use std::sync::Arc;

use dashmap::DashMap;
use masa_core::{ActionResult, QueryCache};
use masa_data::ServiceRequest;
use masa_realtime::{
    ChangeFeed, ConnectionState, Notifier, PendingSource, QueryInvalidator, ServiceRequestMonitor,
};
use serde_json::Value;
use uuid::Uuid;

use crate::services::dashboard_prefix;

/// Drops the organization's cached dashboard views.
#[derive(Clone)]
pub struct CacheInvalidator {
    cache: QueryCache<Value>,
}

impl CacheInvalidator {
    pub fn new(cache: QueryCache<Value>) -> Self {
        Self { cache }
    }
}

impl QueryInvalidator for CacheInvalidator {
    fn invalidate(&self, organization_id: Uuid) {
        self.cache.invalidate_prefix(&dashboard_prefix(organization_id));
    }
}

/// There is no speaker on the server; the tone becomes a log line.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn play_tone(&self, request: &ServiceRequest) {
        tracing::info!(
            organization_id = %request.organization_id,
            table_id = %request.table_id,
            request_id = %request.id,
            request_type = ?request.request_type,
            "New waiter call"
        );
    }
}

/// Lazily started monitors keyed by organization.
#[derive(Clone)]
pub struct MonitorRegistry {
    monitors: Arc<DashMap<Uuid, Arc<ServiceRequestMonitor>>>,
    feed: ChangeFeed<ServiceRequest>,
    source: Arc<dyn PendingSource>,
    invalidator: Arc<dyn QueryInvalidator>,
}

impl MonitorRegistry {
    pub fn new(
        feed: ChangeFeed<ServiceRequest>,
        source: Arc<dyn PendingSource>,
        invalidator: Arc<dyn QueryInvalidator>,
    ) -> Self {
        Self {
            monitors: Arc::new(DashMap::new()),
            feed,
            source,
            invalidator,
        }
    }

    /// The running monitor for the organization, started on first use.
    /// A monitor whose initial load failed is restarted.
    pub async fn get_or_start(&self, organization_id: Uuid) -> ActionResult<Arc<ServiceRequestMonitor>> {
        let existing = self.monitors.get(&organization_id).map(|m| m.value().clone());
        if let Some(monitor) = existing {
            if monitor.connection_state() == ConnectionState::Error {
                monitor.reconnect().await?;
            }
            return Ok(monitor);
        }

        let monitor = Arc::new(
            ServiceRequestMonitor::builder(organization_id, self.feed.clone(), self.source.clone())
                .notifier(Arc::new(LogNotifier))
                .invalidator(self.invalidator.clone())
                .build(),
        );
        monitor.start().await?;
        // Another request may have raced us; keep the first one registered.
        Ok(self
            .monitors
            .entry(organization_id)
            .or_insert(monitor)
            .value()
            .clone())
    }

    pub async fn reconnect(&self, organization_id: Uuid) -> ActionResult<Arc<ServiceRequestMonitor>> {
        let existing = self.monitors.get(&organization_id).map(|m| m.value().clone());
        match existing {
            Some(monitor) => {
                monitor.reconnect().await?;
                Ok(monitor)
            }
            None => self.get_or_start(organization_id).await,
        }
    }

    pub fn stop(&self, organization_id: Uuid) {
        if let Some((_, monitor)) = self.monitors.remove(&organization_id) {
            monitor.stop();
        }
    }

    pub fn stop_all(&self) {
        for entry in self.monitors.iter() {
            entry.value().stop();
        }
        self.monitors.clear();
    }

    pub fn len(&self) -> usize {
        self.monitors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }
}
