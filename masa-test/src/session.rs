use std::sync::Arc;

use chrono::Utc;
use masa_data::{Profile, Role};
use masa_security::{JwtConfig, TokenService};
use uuid::Uuid;

/// Issues session tokens without going through login.
#[derive(Clone)]
pub struct TestTokens {
    service: Arc<TokenService>,
}

impl TestTokens {
    pub fn new(service: Arc<TokenService>) -> Self {
        Self { service }
    }

    pub fn from_secret(secret: &str) -> Self {
        Self::new(Arc::new(TokenService::new(JwtConfig::new(secret))))
    }

    pub fn service(&self) -> Arc<TokenService> {
        self.service.clone()
    }

    pub fn for_profile(&self, profile: &Profile) -> String {
        self.service.issue(profile).expect("failed to sign test token")
    }

    /// Token for a user that exists only in the claims.
    pub fn token(&self, role: Role, organization_id: Option<Uuid>) -> String {
        self.for_profile(&Profile {
            id: Uuid::new_v4(),
            organization_id,
            email: format!("{}@test.local", role.as_str()),
            full_name: role.as_str().to_string(),
            role,
            password_hash: String::new(),
            created_at: Utc::now(),
        })
    }

    pub fn owner(&self, organization_id: Uuid) -> String {
        self.token(Role::Owner, Some(organization_id))
    }

    pub fn staff(&self, organization_id: Uuid) -> String {
        self.token(Role::Staff, Some(organization_id))
    }

    pub fn superadmin(&self) -> String {
        self.token(Role::Superadmin, None)
    }
}
