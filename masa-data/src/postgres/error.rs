use crate::error::DataError;

/// Extension trait for converting `sqlx::Error` into [`DataError`].
///
/// Orphan rules prevent `From<sqlx::Error>`; use `.into_data_error()` in
/// `map_err`.
pub trait SqlxErrorExt {
    fn into_data_error(self) -> DataError;
}

const UNIQUE_VIOLATION: &str = "23505";

impl SqlxErrorExt for sqlx::Error {
    fn into_data_error(self) -> DataError {
        match &self {
            sqlx::Error::RowNotFound => DataError::NotFound("Row not found".into()),
            sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                DataError::Conflict(db.constraint().unwrap_or("unique constraint").to_string())
            }
            _ => DataError::database(self),
        }
    }
}

pub(crate) fn db(err: sqlx::Error) -> DataError {
    err.into_data_error()
}
