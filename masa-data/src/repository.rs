//! Tenant-scoped repository seams.
//!
//! Every query touching tenant data takes the caller's `organization_id` and
//! filters on it, so a row of another organization is indistinguishable from
//! a missing one.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::error::DataResult;
use crate::models::*;
use crate::page::{Page, Pageable};

#[async_trait]
pub trait OrganizationRepository: Send + Sync {
    async fn find(&self, id: Uuid) -> DataResult<Option<Organization>>;
    async fn find_by_slug(&self, slug: &str) -> DataResult<Option<Organization>>;
    async fn list(&self) -> DataResult<Vec<Organization>>;
    /// Fails with `Conflict` when the slug is taken.
    async fn create(&self, new: NewOrganization, now: DateTime<Utc>) -> DataResult<Organization>;
    async fn write_document(
        &self,
        id: Uuid,
        document: OrgDocument,
        value: Value,
        now: DateTime<Utc>,
    ) -> DataResult<Option<Organization>>;
}

#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn find(&self, id: Uuid) -> DataResult<Option<Profile>>;
    /// Emails are stored lowercase; lookups are case-insensitive.
    async fn find_by_email(&self, email: &str) -> DataResult<Option<Profile>>;
    async fn list(&self) -> DataResult<Vec<Profile>>;
    /// Fails with `Conflict` when the email is taken.
    async fn create(&self, new: NewProfile, now: DateTime<Utc>) -> DataResult<Profile>;
    async fn set_role(&self, id: Uuid, role: Role) -> DataResult<Option<Profile>>;
    async fn set_password_hash(&self, id: Uuid, password_hash: &str) -> DataResult<bool>;
}

#[async_trait]
pub trait PasswordResetRepository: Send + Sync {
    async fn insert(&self, reset: PasswordReset) -> DataResult<()>;
    /// Remove and return the token. A token can be taken once.
    async fn take(&self, token: &str) -> DataResult<Option<PasswordReset>>;
}

#[async_trait]
pub trait TableRepository: Send + Sync {
    async fn list(&self, organization_id: Uuid) -> DataResult<Vec<Table>>;
    async fn find(&self, organization_id: Uuid, id: Uuid) -> DataResult<Option<Table>>;
    async fn find_by_qr_token(&self, organization_id: Uuid, qr_token: &str) -> DataResult<Option<Table>>;
    async fn create(&self, new: NewTable, now: DateTime<Utc>) -> DataResult<Table>;
    async fn update(&self, organization_id: Uuid, id: Uuid, update: TableUpdate) -> DataResult<Option<Table>>;
    async fn set_qr_token(&self, organization_id: Uuid, id: Uuid, qr_token: &str) -> DataResult<Option<Table>>;
    /// Delete the table and its service requests. Returns the removed
    /// requests, or `None` when the table does not exist in the organization.
    async fn delete(&self, organization_id: Uuid, id: Uuid) -> DataResult<Option<Vec<ServiceRequest>>>;
}

#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Ordered by `sort_order`, then name.
    async fn list(&self, organization_id: Uuid) -> DataResult<Vec<Category>>;
    async fn find(&self, organization_id: Uuid, id: Uuid) -> DataResult<Option<Category>>;
    async fn create(&self, new: NewCategory, now: DateTime<Utc>) -> DataResult<Category>;
    async fn update(&self, organization_id: Uuid, id: Uuid, update: CategoryUpdate) -> DataResult<Option<Category>>;
    async fn delete(&self, organization_id: Uuid, id: Uuid) -> DataResult<bool>;
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Ordered by `sort_order`, then name.
    async fn list(&self, organization_id: Uuid, category_id: Option<Uuid>) -> DataResult<Vec<Product>>;
    async fn find(&self, organization_id: Uuid, id: Uuid) -> DataResult<Option<Product>>;
    async fn create(&self, new: NewProduct, now: DateTime<Utc>) -> DataResult<Product>;
    async fn update(&self, organization_id: Uuid, id: Uuid, update: ProductUpdate) -> DataResult<Option<Product>>;
    async fn delete(&self, organization_id: Uuid, id: Uuid) -> DataResult<bool>;
}

#[async_trait]
pub trait ServiceRequestRepository: Send + Sync {
    /// Number of requests for the table created at or after `since`.
    async fn count_since(&self, table_id: Uuid, since: DateTime<Utc>) -> DataResult<u64>;
    /// Insert a `pending` request.
    async fn insert(&self, new: NewServiceRequest, now: DateTime<Utc>) -> DataResult<ServiceRequest>;
    async fn find(&self, organization_id: Uuid, id: Uuid) -> DataResult<Option<ServiceRequest>>;
    /// Newest first.
    async fn list(
        &self,
        organization_id: Uuid,
        status: Option<RequestStatus>,
        pageable: Pageable,
    ) -> DataResult<Page<ServiceRequest>>;
    /// Guarded status update keyed by id and organization.
    async fn transition(
        &self,
        organization_id: Uuid,
        id: Uuid,
        transition: Transition,
        handled_by: Uuid,
        now: DateTime<Utc>,
    ) -> DataResult<TransitionOutcome>;
    /// Ids of the organization's pending requests.
    async fn pending_ids(&self, organization_id: Uuid) -> DataResult<Vec<Uuid>>;
}
