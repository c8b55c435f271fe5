use std::sync::Arc;

use chrono::{DateTime, Utc};
use garde::Validate;
use masa_core::validation::validate;
use masa_core::{ActionError, ActionResult, Clock, MessageKey};
use masa_data::{
    DataError, NewProfile, Organization, OrganizationRepository, Profile, ProfileRepository, Role,
};
use masa_security::{hash_password, StaffUser};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use super::normalize_email;

fn default_role() -> Role {
    Role::Owner
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateUser {
    #[garde(email)]
    pub email: String,
    #[garde(length(min = 8, max = 128))]
    pub password: String,
    #[garde(length(chars, min = 1, max = 120))]
    pub full_name: String,
    #[serde(default = "default_role")]
    #[garde(skip)]
    pub role: Role,
    #[serde(default)]
    #[garde(skip)]
    pub organization_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SetPassword {
    #[garde(length(min = 8, max = 128))]
    pub new_password: String,
}

/// Create a profile with a hashed password. Shared by the admin API and the
/// setup CLI.
pub async fn provision_user(
    profiles: &dyn ProfileRepository,
    input: CreateUser,
    now: DateTime<Utc>,
) -> ActionResult<Profile> {
    validate(&input)?;
    let password_hash = hash_password(&input.password).await?;
    let profile = profiles
        .create(
            NewProfile {
                organization_id: input.organization_id,
                email: normalize_email(&input.email),
                full_name: input.full_name.trim().to_string(),
                role: input.role,
                password_hash,
            },
            now,
        )
        .await
        .map_err(|e| match e {
            DataError::Conflict(_) => ActionError::validation(MessageKey::EmailTaken),
            other => other.into(),
        })?;
    info!(profile_id = %profile.id, role = %profile.role, "User provisioned");
    Ok(profile)
}

/// Platform administration. Every operation requires a superadmin.
#[derive(Clone)]
pub struct AdminService {
    profiles: Arc<dyn ProfileRepository>,
    organizations: Arc<dyn OrganizationRepository>,
    clock: Arc<dyn Clock>,
}

impl AdminService {
    pub fn new(
        profiles: Arc<dyn ProfileRepository>,
        organizations: Arc<dyn OrganizationRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            profiles,
            organizations,
            clock,
        }
    }

    pub async fn list_users(&self, admin: &StaffUser) -> ActionResult<Vec<Profile>> {
        admin.require_superadmin()?;
        Ok(self.profiles.list().await?)
    }

    /// Owners and staff must belong to an existing organization.
    pub async fn create_user(&self, admin: &StaffUser, input: CreateUser) -> ActionResult<Profile> {
        admin.require_superadmin()?;
        match (input.role, input.organization_id) {
            (Role::Superadmin, _) => {}
            (_, None) => {
                return Err(ActionError::validation(MessageKey::InvalidInput)
                    .with_details("organization_id is required for owners and staff"))
            }
            (_, Some(id)) => {
                if self.organizations.find(id).await?.is_none() {
                    return Err(ActionError::not_found(MessageKey::OrganizationNotFound));
                }
            }
        }
        provision_user(self.profiles.as_ref(), input, self.clock.now()).await
    }

    pub async fn promote(&self, admin: &StaffUser, id: Uuid) -> ActionResult<Profile> {
        admin.require_superadmin()?;
        let profile = self.set_role(id, Role::Superadmin).await?;
        info!(admin = %admin.id, profile_id = %id, "User promoted to superadmin");
        Ok(profile)
    }

    /// Demoted superadmins become owners. Admins cannot demote themselves.
    pub async fn demote(&self, admin: &StaffUser, id: Uuid) -> ActionResult<Profile> {
        admin.require_superadmin()?;
        if admin.id == id {
            return Err(ActionError::validation(MessageKey::InvalidInput)
                .with_details("cannot demote your own account"));
        }
        let profile = self.set_role(id, Role::Owner).await?;
        info!(admin = %admin.id, profile_id = %id, "Superadmin demoted");
        Ok(profile)
    }

    async fn set_role(&self, id: Uuid, role: Role) -> ActionResult<Profile> {
        self.profiles
            .set_role(id, role)
            .await?
            .ok_or_else(|| ActionError::not_found(MessageKey::UserNotFound))
    }

    pub async fn reset_password(&self, admin: &StaffUser, id: Uuid, input: SetPassword) -> ActionResult<()> {
        admin.require_superadmin()?;
        validate(&input)?;
        let password_hash = hash_password(&input.new_password).await?;
        if !self.profiles.set_password_hash(id, &password_hash).await? {
            return Err(ActionError::not_found(MessageKey::UserNotFound));
        }
        info!(admin = %admin.id, profile_id = %id, "Password reset by admin");
        Ok(())
    }

    pub async fn list_organizations(&self, admin: &StaffUser) -> ActionResult<Vec<Organization>> {
        admin.require_superadmin()?;
        Ok(self.organizations.list().await?)
    }
}
