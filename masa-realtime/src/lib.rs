//! In-process realtime layer.
//!
//! Writers publish [`RowChange`]s on a [`ChangeFeed`]; each organization has
//! its own broadcast channel. Browsers receive them as Server-Sent Events and
//! the [`ServiceRequestMonitor`] folds them into a live pending counter.

pub mod feed;
pub mod monitor;
pub mod sse;

pub use feed::{ChangeFeed, ChangeKind, FeedError, FeedSubscription, RowChange, SubscriptionStatus};
pub use monitor::{
    ConnectionState, MonitorSnapshot, Notifier, PendingSource, QueryInvalidator, RepositoryPendingSource,
    ServiceRequestMonitor,
};
pub use sse::sse_stream;
