//! HTTP routes. Each module exposes `routes()` for the application router.

pub mod admin;
pub mod auth;
pub mod catalog;
pub mod menu;
pub mod service_requests;
pub mod settings;
pub mod tables;

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request};
use axum::http::request::Parts;
use masa_core::{ActionError, MessageKey};
use serde::de::DeserializeOwned;
use uuid::Uuid;

/// `axum::Json` whose rejections render as tagged `validation` errors.
pub struct Body<T>(pub T);

impl<S, T> FromRequest<S> for Body<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ActionError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(value)) => Ok(Body(value)),
            Err(rejection) => Err(reject(rejection)),
        }
    }
}

fn reject(rejection: JsonRejection) -> ActionError {
    tracing::debug!(error = %rejection.body_text(), "Malformed request body");
    ActionError::validation(MessageKey::InvalidInput).with_details(rejection.body_text())
}

/// The `{id}` segment of the route.
pub struct PathId(pub Uuid);

impl<S: Send + Sync> FromRequestParts<S> for PathId {
    type Rejection = ActionError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<Uuid>::from_request_parts(parts, state).await {
            Ok(Path(id)) => Ok(PathId(id)),
            Err(rejection) => Err(ActionError::validation(MessageKey::InvalidInput).with_details(rejection.body_text())),
        }
    }
}

/// Query string parameters, rejected as `validation` errors.
pub struct Params<T>(pub T);

impl<S, T> FromRequestParts<S> for Params<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ActionError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(Params(value)),
            Err(rejection) => Err(ActionError::validation(MessageKey::InvalidInput).with_details(rejection.body_text())),
        }
    }
}
