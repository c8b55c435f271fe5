use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use garde::Validate;
use masa_core::validation::validate;
use masa_core::{ActionError, ActionResult, Clock, MessageKey, QueryCache};
use masa_data::{
    DataError, Page, Pageable, RequestStatus, RequestType, ServiceRequest, ServiceRequestRepository,
    TableRepository, Transition, TransitionOutcome, NewServiceRequest,
};
use masa_rate_limit::{RateLimitDecision, RequestCounter, WindowLimiter, WindowPolicy};
use masa_realtime::monitor::SERVICE_REQUESTS;
use masa_realtime::{ChangeFeed, RowChange};
use masa_security::StaffUser;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::dashboard_prefix;

/// A guest's waiter call, posted from the table's menu page.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateServiceRequest {
    #[garde(skip)]
    pub organization_id: Uuid,
    #[garde(skip)]
    pub table_id: Uuid,
    #[garde(skip)]
    pub request_type: RequestType,
    #[serde(default)]
    #[garde(length(chars, max = 500))]
    pub message: Option<String>,
    #[serde(default)]
    #[garde(length(chars, min = 1, max = 128))]
    pub session_id: Option<String>,
}

/// Counts a table's requests in the store; the rate window is never stored.
#[derive(Clone)]
pub struct TableRequestCounter(pub Arc<dyn ServiceRequestRepository>);

impl RequestCounter<Uuid> for TableRequestCounter {
    type Error = DataError;

    fn count_since(
        &self,
        table_id: &Uuid,
        since: DateTime<Utc>,
    ) -> impl Future<Output = Result<u64, Self::Error>> + Send {
        let repo = self.0.clone();
        let table_id = *table_id;
        async move { repo.count_since(table_id, since).await }
    }
}

fn verb(transition: Transition) -> &'static str {
    match transition {
        Transition::Acknowledge => "acknowledge",
        Transition::Start => "start",
        Transition::Complete => "complete",
        Transition::Cancel => "cancel",
    }
}

#[derive(Clone)]
pub struct ServiceRequestService {
    requests: Arc<dyn ServiceRequestRepository>,
    tables: Arc<dyn TableRepository>,
    limiter: Arc<WindowLimiter<TableRequestCounter>>,
    feed: ChangeFeed<ServiceRequest>,
    cache: QueryCache<Value>,
    clock: Arc<dyn Clock>,
}

impl ServiceRequestService {
    pub fn new(
        requests: Arc<dyn ServiceRequestRepository>,
        tables: Arc<dyn TableRepository>,
        policy: WindowPolicy,
        feed: ChangeFeed<ServiceRequest>,
        cache: QueryCache<Value>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let limiter = WindowLimiter::new(policy, TableRequestCounter(requests.clone()));
        Self {
            requests,
            tables,
            limiter: Arc::new(limiter),
            feed,
            cache,
            clock,
        }
    }

    /// Record a waiter call for an active table.
    ///
    /// The count check and the insert are separate statements; concurrent
    /// calls for one table can overshoot the budget by a few requests.
    pub async fn create(&self, input: CreateServiceRequest) -> ActionResult<ServiceRequest> {
        validate(&input)?;

        let organization_id = input.organization_id;
        let table = self
            .tables
            .find(organization_id, input.table_id)
            .await?
            .filter(|t| t.is_active)
            .ok_or_else(|| ActionError::not_found(MessageKey::TableNotFound))?;

        let now = self.clock.now();
        match self.limiter.check(&table.id, now).await? {
            RateLimitDecision::Limited { retry_after } => {
                warn!(%organization_id, table_id = %table.id, "Service request rate limit hit");
                return Err(ActionError::rate_limited(retry_after.as_secs().max(1)));
            }
            RateLimitDecision::Allowed { remaining } => {
                debug!(table_id = %table.id, remaining, "Service request admitted");
            }
        }

        let row = self
            .requests
            .insert(
                NewServiceRequest {
                    organization_id,
                    table_id: table.id,
                    request_type: input.request_type,
                    message: input.message,
                    session_id: input.session_id,
                },
                now,
            )
            .await?;

        info!(%organization_id, table_id = %table.id, request_id = %row.id, request_type = ?row.request_type, "Service request created");
        self.cache.invalidate_prefix(&dashboard_prefix(organization_id));
        self.feed
            .publish(RowChange::insert(SERVICE_REQUESTS, organization_id, row.clone()));
        Ok(row)
    }

    /// Apply a staff transition. Rows of other organizations are reported as
    /// missing.
    pub async fn transition(
        &self,
        user: &StaffUser,
        id: Uuid,
        transition: Transition,
    ) -> ActionResult<ServiceRequest> {
        let organization_id = user.organization()?;
        let outcome = self
            .requests
            .transition(organization_id, id, transition, user.id, self.clock.now())
            .await?;

        match outcome {
            TransitionOutcome::Updated { old, new } => {
                info!(%organization_id, request_id = %id, from = %old.status, to = %new.status, handled_by = %user.id, "Service request updated");
                self.cache.invalidate_prefix(&dashboard_prefix(organization_id));
                self.feed
                    .publish(RowChange::update(SERVICE_REQUESTS, organization_id, old, new.clone()));
                Ok(new)
            }
            TransitionOutcome::NotFound => Err(ActionError::not_found(MessageKey::RequestNotFound)),
            TransitionOutcome::InvalidState(status) => {
                Err(ActionError::validation(MessageKey::InvalidTransition)
                    .with_details(format!("cannot {} a {status} request", verb(transition))))
            }
        }
    }

    pub async fn get(&self, user: &StaffUser, id: Uuid) -> ActionResult<ServiceRequest> {
        let organization_id = user.organization()?;
        self.requests
            .find(organization_id, id)
            .await?
            .ok_or_else(|| ActionError::not_found(MessageKey::RequestNotFound))
    }

    /// Newest first. Pages are cached until the next write.
    pub async fn list(
        &self,
        user: &StaffUser,
        status: Option<RequestStatus>,
        pageable: Pageable,
    ) -> ActionResult<Value> {
        let organization_id = user.organization()?;
        let key = format!(
            "{}requests:{}:{}:{}",
            dashboard_prefix(organization_id),
            status.map_or("all", RequestStatus::as_str),
            pageable.page,
            pageable.limit()
        );
        self.cache
            .get_or_try_insert(&key, || async {
                let page: Page<ServiceRequest> =
                    self.requests.list(organization_id, status, pageable).await?;
                serde_json::to_value(page).map_err(|e| ActionError::unknown(e.to_string()))
            })
            .await
    }
}
