//! Liveness/readiness endpoints.
//!
//! | Path                | Description                                |
//! |---------------------|--------------------------------------------|
//! | `GET /health`       | Aggregated status, 200 if UP, 503 if DOWN  |
//! | `GET /health/live`  | Liveness probe, always 200                 |
//! | `GET /health/ready` | Same checks as `/health`                   |

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

/// Result of a single health check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Up,
    Down(String),
}

/// A named health check (database ping, broker connection, ...).
pub trait HealthIndicator: Send + Sync + 'static {
    fn name(&self) -> &str;
    fn check(&self) -> Pin<Box<dyn Future<Output = HealthStatus> + Send + '_>>;
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthCheck {
    pub name: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub checks: Vec<HealthCheck>,
    pub uptime_seconds: u64,
}

impl HealthReport {
    pub fn is_up(&self) -> bool {
        self.status == "UP"
    }
}

/// Set of indicators served under `/health`.
#[derive(Clone)]
pub struct Health {
    checks: Arc<Vec<Box<dyn HealthIndicator>>>,
    started: Instant,
}

impl Health {
    pub fn new(checks: Vec<Box<dyn HealthIndicator>>) -> Self {
        Self {
            checks: Arc::new(checks),
            started: Instant::now(),
        }
    }

    pub async fn report(&self) -> HealthReport {
        let mut checks = Vec::with_capacity(self.checks.len());
        for indicator in self.checks.iter() {
            let start = Instant::now();
            let status = indicator.check().await;
            let (status, reason) = match status {
                HealthStatus::Up => ("UP", None),
                HealthStatus::Down(reason) => {
                    tracing::warn!(check = indicator.name(), %reason, "Health check failed");
                    ("DOWN", Some(reason))
                }
            };
            checks.push(HealthCheck {
                name: indicator.name().to_string(),
                status,
                reason,
                duration_ms: start.elapsed().as_millis() as u64,
            });
        }
        let all_up = checks.iter().all(|c| c.status == "UP");
        HealthReport {
            status: if all_up { "UP" } else { "DOWN" },
            checks,
            uptime_seconds: self.started.elapsed().as_secs(),
        }
    }

    /// Routes for the probes, ready to be merged into the application router.
    pub fn router<S: Clone + Send + Sync + 'static>(self) -> Router<S> {
        Router::new()
            .route("/health", get(aggregate_handler))
            .route("/health/ready", get(aggregate_handler))
            .route("/health/live", get(|| async { (StatusCode::OK, "OK") }))
            .with_state(self)
    }
}

async fn aggregate_handler(State(health): State<Health>) -> impl IntoResponse {
    let report = health.report().await;
    let status = if report.is_up() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report))
}
