use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::i18n::{Locale, MessageKey};

/// Closed set of failure categories surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    PermissionDenied,
    DatabaseError,
    RateLimited,
    UnknownError,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::PermissionDenied => "permission_denied",
            ErrorKind::DatabaseError => "database_error",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::UnknownError => "unknown_error",
        }
    }

    pub fn status(self) -> StatusCode {
        match self {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::PermissionDenied => StatusCode::FORBIDDEN,
            ErrorKind::DatabaseError => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ErrorKind::UnknownError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn default_message(self) -> MessageKey {
        match self {
            ErrorKind::Validation => MessageKey::InvalidInput,
            ErrorKind::NotFound => MessageKey::NotFound,
            ErrorKind::PermissionDenied => MessageKey::PermissionDenied,
            ErrorKind::DatabaseError => MessageKey::DatabaseError,
            ErrorKind::RateLimited => MessageKey::RateLimited,
            ErrorKind::UnknownError => MessageKey::UnknownError,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A field-level validation error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Tagged failure returned by every operation.
///
/// The user-facing text is a [`MessageKey`] resolved against the caller's
/// locale when the response is rendered; `details` carries the technical
/// cause for logs and API consumers.
#[derive(Debug, Clone)]
pub struct ActionError {
    pub kind: ErrorKind,
    pub message: MessageKey,
    pub details: Option<String>,
    pub fields: Vec<FieldError>,
    pub retry_after_secs: Option<u64>,
    unauthenticated: bool,
}

impl ActionError {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: kind.default_message(),
            details: None,
            fields: Vec::new(),
            retry_after_secs: None,
            unauthenticated: false,
        }
    }

    pub fn validation(message: MessageKey) -> Self {
        Self::new(ErrorKind::Validation).with_message(message)
    }

    pub fn invalid_fields(fields: Vec<FieldError>) -> Self {
        Self {
            fields,
            ..Self::new(ErrorKind::Validation)
        }
    }

    pub fn not_found(message: MessageKey) -> Self {
        Self::new(ErrorKind::NotFound).with_message(message)
    }

    pub fn permission_denied() -> Self {
        Self::new(ErrorKind::PermissionDenied)
    }

    /// Missing or invalid credentials. Categorised as `permission_denied`
    /// but rendered with `401 Unauthorized`.
    pub fn unauthenticated() -> Self {
        Self {
            unauthenticated: true,
            ..Self::new(ErrorKind::PermissionDenied).with_message(MessageKey::Unauthenticated)
        }
    }

    pub fn database(details: impl Into<String>) -> Self {
        Self::new(ErrorKind::DatabaseError).with_details(details)
    }

    pub fn rate_limited(retry_after_secs: u64) -> Self {
        Self {
            retry_after_secs: Some(retry_after_secs),
            ..Self::new(ErrorKind::RateLimited)
        }
    }

    pub fn unknown(details: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnknownError).with_details(details)
    }

    pub fn with_message(mut self, message: MessageKey) -> Self {
        self.message = message;
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn status(&self) -> StatusCode {
        if self.unauthenticated {
            StatusCode::UNAUTHORIZED
        } else {
            self.kind.status()
        }
    }

    /// Render the tagged error body in the given language.
    pub fn render(&self, locale: Locale) -> Response {
        let mut error = serde_json::json!({
            "code": self.kind,
            "message": self.message.text(locale),
        });
        // Internal causes stay in the logs.
        if let Some(details) = &self.details {
            if !matches!(self.kind, ErrorKind::DatabaseError | ErrorKind::UnknownError) {
                error["details"] = serde_json::Value::String(details.clone());
            }
        }
        if !self.fields.is_empty() {
            error["fields"] = serde_json::json!(self.fields);
        }
        if let Some(secs) = self.retry_after_secs {
            error["retry_after_secs"] = serde_json::json!(secs);
        }

        let body = serde_json::json!({ "success": false, "error": error });
        let mut response = (self.status(), Json(body)).into_response();
        if let Some(secs) = self.retry_after_secs {
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(axum::http::header::RETRY_AFTER, value);
            }
        }
        response.extensions_mut().insert(self.clone());
        response
    }
}

impl std::fmt::Display for ActionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.details {
            Some(details) => write!(f, "{}: {details}", self.kind),
            None => write!(f, "{}: {}", self.kind, self.message.text(Locale::En)),
        }
    }
}

impl std::error::Error for ActionError {}

impl IntoResponse for ActionError {
    fn into_response(self) -> Response {
        match self.kind {
            ErrorKind::DatabaseError | ErrorKind::UnknownError => {
                tracing::error!(kind = %self.kind, details = ?self.details, "Request failed");
            }
            _ => {
                tracing::debug!(kind = %self.kind, message = ?self.message, "Request rejected");
            }
        }
        self.render(Locale::default())
    }
}

/// Result alias used by services and handlers.
pub type ActionResult<T> = Result<T, ActionError>;

/// Success envelope: `{"success": true, "data": ...}`.
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T> {
    #[serde(skip)]
    status: StatusCode,
    success: bool,
    data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            status: StatusCode::OK,
            success: true,
            data,
        }
    }

    pub fn created(data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            success: true,
            data,
        }
    }

    pub fn accepted(data: T) -> Self {
        Self {
            status: StatusCode::ACCEPTED,
            success: true,
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}
