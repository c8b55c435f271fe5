use std::sync::Arc;

use masa_core::json::merged;
use masa_core::{ActionError, ActionResult, Clock, MessageKey, QueryCache};
use masa_data::{OrgDocument, Organization, OrganizationRepository};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use super::menu_key;

/// Reads and patches the settings, theme and legal blobs of an organization.
#[derive(Clone)]
pub struct OrganizationService {
    organizations: Arc<dyn OrganizationRepository>,
    cache: QueryCache<Value>,
    clock: Arc<dyn Clock>,
}

impl OrganizationService {
    pub fn new(
        organizations: Arc<dyn OrganizationRepository>,
        cache: QueryCache<Value>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            organizations,
            cache,
            clock,
        }
    }

    pub async fn find(&self, organization_id: Uuid) -> ActionResult<Organization> {
        self.organizations
            .find(organization_id)
            .await?
            .ok_or_else(|| ActionError::not_found(MessageKey::OrganizationNotFound))
    }

    pub async fn document(&self, organization_id: Uuid, document: OrgDocument) -> ActionResult<Value> {
        Ok(self.find(organization_id).await?.document(document).clone())
    }

    /// Merge `patch` (RFC 7386) into the stored blob and write the result.
    ///
    /// Legal patches also stamp `updated_at`. Read and write are separate
    /// statements, so the last of two concurrent patches wins.
    pub async fn patch_document(
        &self,
        organization_id: Uuid,
        document: OrgDocument,
        patch: Value,
    ) -> ActionResult<Value> {
        if !patch.is_object() {
            return Err(ActionError::validation(MessageKey::InvalidInput)
                .with_details("patch body must be a JSON object"));
        }

        let current = self.find(organization_id).await?;
        let now = self.clock.now();
        let mut next = merged(current.document(document), &patch);
        if document == OrgDocument::Legal {
            next["updated_at"] = Value::String(now.to_rfc3339());
        }

        let updated = self
            .organizations
            .write_document(organization_id, document, next, now)
            .await?
            .ok_or_else(|| ActionError::not_found(MessageKey::OrganizationNotFound))?;

        info!(%organization_id, document = document.column(), "Organization document updated");
        self.cache.remove(&menu_key(organization_id));
        Ok(updated.document(document).clone())
    }
}
