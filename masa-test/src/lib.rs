//! Test utilities: an in-process HTTP client over the axum router with
//! assertions for the `{success, data | error}` envelope, and session tokens
//! for any role.

mod app;
mod session;

pub use app::{resolve_path, TestApp, TestRequest, TestResponse};
pub use session::TestTokens;
