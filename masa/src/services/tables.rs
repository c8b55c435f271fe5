use std::sync::Arc;

use garde::Validate;
use masa_core::validation::validate;
use masa_core::{ActionError, ActionResult, Clock, MessageKey, QueryCache};
use masa_data::{NewTable, OrganizationRepository, ServiceRequest, Table, TableRepository, TableUpdate};
use masa_realtime::monitor::SERVICE_REQUESTS;
use masa_realtime::{ChangeFeed, RowChange};
use masa_security::{random_token, StaffUser};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use super::dashboard_prefix;

const QR_TOKEN_LEN: usize = 24;

fn default_capacity() -> i32 {
    4
}

fn yes() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTable {
    #[garde(length(chars, min = 1, max = 50))]
    pub name: String,
    #[serde(default = "default_capacity")]
    #[garde(range(min = 1, max = 100))]
    pub capacity: i32,
    #[serde(default = "yes")]
    #[garde(skip)]
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateTable {
    #[serde(default)]
    #[garde(length(chars, min = 1, max = 50))]
    pub name: Option<String>,
    #[serde(default)]
    #[garde(range(min = 1, max = 100))]
    pub capacity: Option<i32>,
    #[serde(default)]
    #[garde(skip)]
    pub is_active: Option<bool>,
}

/// What gets printed on the table card.
#[derive(Debug, Clone, Serialize)]
pub struct TableQr {
    pub table_id: Uuid,
    pub qr_token: String,
    pub url: String,
}

#[derive(Clone)]
pub struct TableService {
    tables: Arc<dyn TableRepository>,
    organizations: Arc<dyn OrganizationRepository>,
    feed: ChangeFeed<ServiceRequest>,
    cache: QueryCache<Value>,
    clock: Arc<dyn Clock>,
    base_url: String,
}

impl TableService {
    pub fn new(
        tables: Arc<dyn TableRepository>,
        organizations: Arc<dyn OrganizationRepository>,
        feed: ChangeFeed<ServiceRequest>,
        cache: QueryCache<Value>,
        clock: Arc<dyn Clock>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            tables,
            organizations,
            feed,
            cache,
            clock,
            base_url: base_url.into(),
        }
    }

    async fn find(&self, organization_id: Uuid, id: Uuid) -> ActionResult<Table> {
        self.tables
            .find(organization_id, id)
            .await?
            .ok_or_else(|| ActionError::not_found(MessageKey::TableNotFound))
    }

    pub async fn list(&self, user: &StaffUser) -> ActionResult<Vec<Table>> {
        Ok(self.tables.list(user.organization()?).await?)
    }

    pub async fn get(&self, user: &StaffUser, id: Uuid) -> ActionResult<Table> {
        self.find(user.organization()?, id).await
    }

    pub async fn create(&self, user: &StaffUser, input: CreateTable) -> ActionResult<Table> {
        user.require_manager()?;
        validate(&input)?;
        let organization_id = user.organization()?;
        let table = self
            .tables
            .create(
                NewTable {
                    organization_id,
                    name: input.name,
                    capacity: input.capacity,
                    qr_token: random_token(QR_TOKEN_LEN),
                    is_active: input.is_active,
                },
                self.clock.now(),
            )
            .await?;
        info!(%organization_id, table_id = %table.id, "Table created");
        Ok(table)
    }

    pub async fn update(&self, user: &StaffUser, id: Uuid, input: UpdateTable) -> ActionResult<Table> {
        user.require_manager()?;
        validate(&input)?;
        let update = TableUpdate {
            name: input.name,
            capacity: input.capacity,
            is_active: input.is_active,
        };
        self.tables
            .update(user.organization()?, id, update)
            .await?
            .ok_or_else(|| ActionError::not_found(MessageKey::TableNotFound))
    }

    /// Deleting a table deletes its service requests; each one is announced
    /// on the feed so live counters drop them.
    pub async fn delete(&self, user: &StaffUser, id: Uuid) -> ActionResult<()> {
        user.require_manager()?;
        let organization_id = user.organization()?;
        let removed = self
            .tables
            .delete(organization_id, id)
            .await?
            .ok_or_else(|| ActionError::not_found(MessageKey::TableNotFound))?;

        self.cache.invalidate_prefix(&dashboard_prefix(organization_id));
        let requests = removed.len();
        for request in removed {
            self.feed
                .publish(RowChange::delete(SERVICE_REQUESTS, organization_id, request));
        }
        info!(%organization_id, table_id = %id, requests, "Table deleted");
        Ok(())
    }

    /// Menu link encoded in the table's QR code.
    pub async fn qr(&self, user: &StaffUser, id: Uuid) -> ActionResult<TableQr> {
        let organization_id = user.organization()?;
        let table = self.find(organization_id, id).await?;
        self.link(organization_id, table).await
    }

    /// Issue a new token; printed cards with the old one stop working.
    pub async fn rotate_qr(&self, user: &StaffUser, id: Uuid) -> ActionResult<TableQr> {
        user.require_manager()?;
        let organization_id = user.organization()?;
        let table = self
            .tables
            .set_qr_token(organization_id, id, &random_token(QR_TOKEN_LEN))
            .await?
            .ok_or_else(|| ActionError::not_found(MessageKey::TableNotFound))?;
        info!(%organization_id, table_id = %id, "Table QR token rotated");
        self.link(organization_id, table).await
    }

    async fn link(&self, organization_id: Uuid, table: Table) -> ActionResult<TableQr> {
        let organization = self
            .organizations
            .find(organization_id)
            .await?
            .ok_or_else(|| ActionError::not_found(MessageKey::OrganizationNotFound))?;
        Ok(TableQr {
            url: format!("{}/m/{}?t={}", self.base_url, organization.slug, table.qr_token),
            table_id: table.id,
            qr_token: table.qr_token,
        })
    }
}
