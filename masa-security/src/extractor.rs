use std::sync::Arc;

use axum::extract::{FromRef, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use masa_core::{ActionError, ActionResult};
use masa_data::Role;
use tracing::warn;
use uuid::Uuid;

use crate::error::SecurityError;
use crate::jwt::TokenService;

/// Extract a Bearer token from an `Authorization` header value.
pub fn extract_bearer_token(header_value: &str) -> Result<&str, SecurityError> {
    let (scheme, token) = header_value
        .split_once(' ')
        .ok_or(SecurityError::InvalidAuthScheme)?;
    if !scheme.eq_ignore_ascii_case("Bearer") || token.trim().is_empty() {
        return Err(SecurityError::InvalidAuthScheme);
    }
    Ok(token.trim())
}

/// The authenticated dashboard user, built from the session claims.
#[derive(Debug, Clone, PartialEq)]
pub struct StaffUser {
    pub id: Uuid,
    pub organization_id: Option<Uuid>,
    pub email: String,
    pub role: Role,
}

impl StaffUser {
    pub fn is_superadmin(&self) -> bool {
        self.role == Role::Superadmin
    }

    /// Owners and superadmins may change catalog, tables and settings.
    pub fn can_manage(&self) -> bool {
        matches!(self.role, Role::Owner | Role::Superadmin)
    }

    /// The organization every tenant query is scoped to.
    pub fn organization(&self) -> ActionResult<Uuid> {
        self.organization_id.ok_or_else(ActionError::permission_denied)
    }

    pub fn require_manager(&self) -> ActionResult<()> {
        if self.can_manage() {
            Ok(())
        } else {
            warn!(user = %self.id, role = %self.role, "Write attempted without owner role");
            Err(ActionError::permission_denied())
        }
    }

    pub fn require_superadmin(&self) -> ActionResult<()> {
        if self.is_superadmin() {
            Ok(())
        } else {
            warn!(user = %self.id, role = %self.role, "Admin endpoint attempted without superadmin role");
            Err(ActionError::permission_denied())
        }
    }
}

impl<S> FromRequestParts<S> for StaffUser
where
    S: Send + Sync,
    Arc<TokenService>: FromRef<S>,
{
    type Rejection = ActionError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(SecurityError::MissingAuthHeader)?
            .to_str()
            .map_err(|_| SecurityError::InvalidAuthScheme)?;
        let token = extract_bearer_token(header)?;

        let tokens: Arc<TokenService> = Arc::from_ref(state);
        let claims = tokens.validate(token).map_err(|e| {
            warn!(uri = %parts.uri, error = %e, "Session token rejected");
            e
        })?;

        Ok(StaffUser {
            id: claims.sub,
            organization_id: claims.org,
            email: claims.email,
            role: claims.role,
        })
    }
}
