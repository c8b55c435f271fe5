use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::error::ActionError;
use crate::i18n::Locale;

/// Initialise the global `tracing` subscriber with a standard `fmt` layer.
///
/// Respects the `RUST_LOG` environment variable. Falls back to
/// `info,tower_http=debug` when `RUST_LOG` is not set. Safe to call more
/// than once; later calls are no-ops.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Permissive CORS: the public menu is embedded from arbitrary restaurant domains.
pub fn default_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// `TraceLayer` logging requests and responses at `DEBUG`.
pub fn default_trace(
) -> TraceLayer<tower_http::classify::SharedClassifier<tower_http::classify::ServerErrorsAsFailures>>
{
    TraceLayer::new_for_http()
}

/// `CatchPanicLayer` that converts panics into tagged `unknown_error` responses.
pub fn catch_panic_layer() -> CatchPanicLayer<fn(Box<dyn std::any::Any + Send>) -> Response> {
    CatchPanicLayer::custom(panic_handler as fn(_) -> _)
}

fn panic_handler(err: Box<dyn std::any::Any + Send>) -> Response {
    let details = err
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| err.downcast_ref::<&str>().map(|s| s.to_string()))
        .unwrap_or_else(|| "handler panicked".to_string());
    tracing::error!(%details, "Handler panicked");
    let mut response = ActionError::unknown(details).render(Locale::default());
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
}

/// Middleware re-rendering tagged errors in the caller's language.
///
/// Errors render in English by default and stash themselves in the response
/// extensions; this swaps the body when `Accept-Language` asks for another
/// supported locale.
pub async fn localize_errors(request: Request, next: Next) -> Response {
    let locale = request
        .headers()
        .get(axum::http::header::ACCEPT_LANGUAGE)
        .and_then(|v| v.to_str().ok())
        .map(Locale::from_accept_language)
        .unwrap_or_default();

    let response = next.run(request).await;
    if locale == Locale::default() {
        return response;
    }
    match response.extensions().get::<ActionError>().cloned() {
        Some(error) => error.render(locale).into_response(),
        None => response,
    }
}
