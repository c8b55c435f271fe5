use masa_core::ActionError;

/// Authentication failures.
#[derive(Debug, thiserror::Error)]
pub enum SecurityError {
    #[error("Missing Authorization header")]
    MissingAuthHeader,
    #[error("Invalid authorization scheme")]
    InvalidAuthScheme,
    #[error("Invalid token: {0}")]
    InvalidToken(String),
    #[error("Token expired")]
    TokenExpired,
    #[error("Failed to sign token: {0}")]
    Signing(String),
    #[error("Password hashing failed: {0}")]
    PasswordHash(String),
}

impl From<SecurityError> for ActionError {
    fn from(err: SecurityError) -> Self {
        match err {
            SecurityError::MissingAuthHeader
            | SecurityError::InvalidAuthScheme
            | SecurityError::InvalidToken(_)
            | SecurityError::TokenExpired => ActionError::unauthenticated(),
            SecurityError::Signing(msg) | SecurityError::PasswordHash(msg) => ActionError::unknown(msg),
        }
    }
}
