//! Delivery of password reset links.

use async_trait::async_trait;
use masa_core::ActionResult;
use masa_data::Profile;

/// Sends the reset link to the account holder.
#[async_trait]
pub trait ResetMailer: Send + Sync {
    async fn send_reset(&self, profile: &Profile, link: &str) -> ActionResult<()>;
}

/// Writes the link to the log. Used until an SMTP relay is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[async_trait]
impl ResetMailer for LogMailer {
    async fn send_reset(&self, profile: &Profile, link: &str) -> ActionResult<()> {
        tracing::info!(profile_id = %profile.id, email = %profile.email, %link, "Password reset link issued");
        Ok(())
    }
}
