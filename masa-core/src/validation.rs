//! Bridging `garde` validation into [`ActionError`].

use crate::error::{ActionError, FieldError};

pub use garde::Validate;

/// Convert a garde report into field-level errors.
pub fn field_errors(report: &garde::Report) -> Vec<FieldError> {
    report
        .iter()
        .map(|(path, error)| {
            let field = path.to_string();
            FieldError {
                field: if field.is_empty() { "value".to_string() } else { field },
                message: error.message().to_string(),
            }
        })
        .collect()
}

impl From<garde::Report> for ActionError {
    fn from(report: garde::Report) -> Self {
        ActionError::invalid_fields(field_errors(&report))
    }
}

/// Validate `value`, mapping failures to a `validation` error.
pub fn validate<T>(value: &T) -> Result<(), ActionError>
where
    T: Validate,
    T::Context: Default,
{
    value.validate().map_err(ActionError::from)
}
