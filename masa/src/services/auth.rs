use std::sync::Arc;
use std::time::Duration;

use garde::Validate;
use masa_core::validation::validate;
use masa_core::{ActionError, ActionResult, Clock, MessageKey};
use masa_data::{
    DataError, NewOrganization, NewProfile, Organization, OrganizationRepository, PasswordReset,
    PasswordResetRepository, Profile, ProfileRepository, Role,
};
use masa_security::{hash_password, random_token, verify_password, StaffUser, TokenService};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::normalize_email;
use crate::mailer::ResetMailer;

const RESET_TOKEN_LEN: usize = 48;
/// Give up on slug suffixes after this many collisions.
const MAX_SLUG_ATTEMPTS: u32 = 50;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    #[garde(email)]
    pub email: String,
    #[garde(length(min = 8, max = 128))]
    pub password: String,
    #[garde(length(chars, min = 1, max = 120))]
    pub full_name: String,
    #[garde(length(chars, min = 1, max = 120))]
    pub organization_name: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[garde(length(min = 1))]
    pub email: String,
    #[garde(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ResetRequest {
    #[garde(length(min = 1))]
    pub email: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ResetConfirm {
    #[garde(length(min = 1))]
    pub token: String,
    #[garde(length(min = 8, max = 128))]
    pub new_password: String,
}

/// A signed-in session.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub token: String,
    pub profile: Profile,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<Organization>,
}

/// URL-safe slug. Turkish letters are folded to ASCII.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    // 'İ' lowercases to 'i' plus a combining dot.
    let lowered = name
        .chars()
        .flat_map(|c| if c == 'İ' { 'i'.to_lowercase() } else { c.to_lowercase() });
    for c in lowered {
        let folded = match c {
            'ç' => 'c',
            'ğ' => 'g',
            'ı' => 'i',
            'ö' => 'o',
            'ş' => 's',
            'ü' => 'u',
            'â' | 'à' | 'á' | 'ä' => 'a',
            'é' | 'è' | 'ê' => 'e',
            'î' | 'í' => 'i',
            'û' | 'ú' => 'u',
            c => c,
        };
        if folded.is_ascii_alphanumeric() {
            slug.push(folded);
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        "restaurant".to_string()
    } else {
        slug.to_string()
    }
}

#[derive(Clone)]
pub struct AuthService {
    profiles: Arc<dyn ProfileRepository>,
    organizations: Arc<dyn OrganizationRepository>,
    resets: Arc<dyn PasswordResetRepository>,
    tokens: Arc<TokenService>,
    mailer: Arc<dyn ResetMailer>,
    clock: Arc<dyn Clock>,
    reset_ttl: Duration,
    base_url: String,
}

impl AuthService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        profiles: Arc<dyn ProfileRepository>,
        organizations: Arc<dyn OrganizationRepository>,
        resets: Arc<dyn PasswordResetRepository>,
        tokens: Arc<TokenService>,
        mailer: Arc<dyn ResetMailer>,
        clock: Arc<dyn Clock>,
        reset_ttl: Duration,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            profiles,
            organizations,
            resets,
            tokens,
            mailer,
            clock,
            reset_ttl,
            base_url: base_url.into(),
        }
    }

    fn session(&self, profile: Profile, organization: Option<Organization>) -> ActionResult<Session> {
        Ok(Session {
            token: self.tokens.issue(&profile)?,
            profile,
            organization,
        })
    }

    /// Create an organization and its owner, then sign the owner in.
    pub async fn register(&self, input: RegisterRequest) -> ActionResult<Session> {
        validate(&input)?;
        let email = normalize_email(&input.email);
        if self.profiles.find_by_email(&email).await?.is_some() {
            return Err(ActionError::validation(MessageKey::EmailTaken));
        }
        let password_hash = hash_password(&input.password).await?;

        let organization = self.create_organization(input.organization_name.trim()).await?;
        let profile = self
            .profiles
            .create(
                NewProfile {
                    organization_id: Some(organization.id),
                    email,
                    full_name: input.full_name.trim().to_string(),
                    role: Role::Owner,
                    password_hash,
                },
                self.clock.now(),
            )
            .await
            .map_err(|e| match e {
                DataError::Conflict(_) => ActionError::validation(MessageKey::EmailTaken),
                other => other.into(),
            })?;

        info!(organization_id = %organization.id, profile_id = %profile.id, slug = %organization.slug, "Organization registered");
        self.session(profile, Some(organization))
    }

    /// Insert with the name's slug, appending `-2`, `-3`... while it is taken.
    async fn create_organization(&self, name: &str) -> ActionResult<Organization> {
        let base = slugify(name);
        for attempt in 1..=MAX_SLUG_ATTEMPTS {
            let slug = if attempt == 1 {
                base.clone()
            } else {
                format!("{base}-{attempt}")
            };
            let new = NewOrganization {
                name: name.to_string(),
                slug,
            };
            match self.organizations.create(new, self.clock.now()).await {
                Ok(organization) => return Ok(organization),
                Err(DataError::Conflict(_)) => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Err(ActionError::validation(MessageKey::InvalidInput)
            .with_details(format!("no free slug for '{base}'")))
    }

    /// Wrong email and wrong password produce the same error.
    pub async fn login(&self, input: LoginRequest) -> ActionResult<Session> {
        validate(&input)?;
        let denied = || ActionError::permission_denied().with_message(MessageKey::InvalidCredentials);

        let Some(profile) = self.profiles.find_by_email(&normalize_email(&input.email)).await? else {
            warn!("Login attempt for unknown email");
            return Err(denied());
        };
        if !verify_password(&input.password, &profile.password_hash).await {
            warn!(profile_id = %profile.id, "Login attempt with wrong password");
            return Err(denied());
        }

        let organization = match profile.organization_id {
            Some(id) => self.organizations.find(id).await?,
            None => None,
        };
        info!(profile_id = %profile.id, role = %profile.role, "Signed in");
        self.session(profile, organization)
    }

    pub async fn me(&self, user: &StaffUser) -> ActionResult<Profile> {
        self.profiles
            .find(user.id)
            .await?
            .ok_or_else(|| ActionError::not_found(MessageKey::UserNotFound))
    }

    /// Issue a single-use reset token. The outcome is not revealed to the
    /// caller, so unknown emails succeed silently.
    pub async fn request_reset(&self, input: ResetRequest) -> ActionResult<()> {
        validate(&input)?;
        let Some(profile) = self.profiles.find_by_email(&normalize_email(&input.email)).await? else {
            info!("Password reset requested for unknown email");
            return Ok(());
        };

        let ttl = chrono::Duration::from_std(self.reset_ttl).unwrap_or(chrono::Duration::hours(1));
        let token = random_token(RESET_TOKEN_LEN);
        self.resets
            .insert(PasswordReset {
                token: token.clone(),
                profile_id: profile.id,
                expires_at: self.clock.now() + ttl,
            })
            .await?;

        let link = format!("{}/reset-password?token={token}", self.base_url);
        self.mailer.send_reset(&profile, &link).await
    }

    pub async fn confirm_reset(&self, input: ResetConfirm) -> ActionResult<()> {
        validate(&input)?;
        let invalid = || ActionError::validation(MessageKey::InvalidResetToken);

        let reset = self.resets.take(&input.token).await?.ok_or_else(invalid)?;
        if reset.expires_at < self.clock.now() {
            return Err(invalid());
        }

        let password_hash = hash_password(&input.new_password).await?;
        if !self.profiles.set_password_hash(reset.profile_id, &password_hash).await? {
            return Err(ActionError::not_found(MessageKey::UserNotFound));
        }
        info!(profile_id = %reset.profile_id, "Password reset completed");
        Ok(())
    }
}
