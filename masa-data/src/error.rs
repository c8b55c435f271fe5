use masa_core::{ActionError, MessageKey};

/// Errors that can occur in the data layer.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("Not found: {0}")]
    NotFound(String),
    /// A unique constraint was violated (duplicate slug, email, QR token...).
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Database error: {0}")]
    Database(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("Data error: {0}")]
    Other(String),
}

impl DataError {
    /// Wrap a driver-specific error.
    pub fn database(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        DataError::Database(Box::new(err))
    }
}

impl From<DataError> for ActionError {
    fn from(err: DataError) -> Self {
        match err {
            DataError::NotFound(what) => ActionError::not_found(MessageKey::NotFound).with_details(what),
            DataError::Conflict(what) => {
                ActionError::validation(MessageKey::InvalidInput).with_details(what)
            }
            DataError::Database(e) => ActionError::database(e.to_string()),
            DataError::Other(msg) => ActionError::unknown(msg),
        }
    }
}

/// Convenience alias for data-layer results.
pub type DataResult<T> = Result<T, DataError>;
