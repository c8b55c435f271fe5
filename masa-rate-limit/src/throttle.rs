//! Per-client throttling for anonymous endpoints.

use std::net::SocketAddr;
use std::time::Duration;

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use masa_core::{ActionError, MessageKey};

use crate::{InMemoryWindowLog, RateLimitDecision, WindowPolicy};

/// Sliding-window throttle keyed by client address.
#[derive(Clone)]
pub struct ClientThrottle {
    log: InMemoryWindowLog<String>,
}

impl ClientThrottle {
    pub fn new(policy: WindowPolicy) -> Self {
        Self {
            log: InMemoryWindowLog::new(policy),
        }
    }

    /// 60 requests per minute.
    pub fn per_minute(max: u64) -> Self {
        Self::new(WindowPolicy::new(max, Duration::from_secs(60)))
    }

    pub fn check(&self, key: &str) -> RateLimitDecision {
        self.log.try_acquire(&key.to_string())
    }

    pub fn log(&self) -> &InMemoryWindowLog<String> {
        &self.log
    }
}

impl Default for ClientThrottle {
    fn default() -> Self {
        Self::per_minute(60)
    }
}

/// Best-effort client identity: first `X-Forwarded-For` hop, `X-Real-IP`,
/// then the socket peer address when the server was started with connect info.
pub fn client_key(request: &Request) -> String {
    let headers = request.headers();
    if let Some(forwarded) = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return forwarded.to_string();
    }
    if let Some(real_ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        return real_ip.trim().to_string();
    }
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Middleware rejecting clients over their budget with `429`.
///
/// ```ignore
/// router.layer(axum::middleware::from_fn_with_state(throttle, throttle_clients))
/// ```
pub async fn throttle_clients(
    State(throttle): State<ClientThrottle>,
    request: Request,
    next: Next,
) -> Response {
    let key = client_key(&request);
    match throttle.check(&key) {
        RateLimitDecision::Allowed { .. } => next.run(request).await,
        RateLimitDecision::Limited { retry_after } => {
            tracing::warn!(client = %key, "Client throttled");
            let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
            ActionError::rate_limited(secs.max(1))
                .with_message(MessageKey::TooManyRequests)
                .into_response()
        }
    }
}
