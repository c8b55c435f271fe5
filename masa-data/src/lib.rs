//! Data access for Masa: entities, tenant-scoped repository traits and their
//! backends.
//!
//! The in-memory backend is always available; enable the `postgres` feature
//! for the sqlx implementation.

pub mod error;
pub mod memory;
pub mod models;
pub mod page;
pub mod repository;

#[cfg(feature = "postgres")]
pub mod postgres;

use std::sync::Arc;

pub use error::{DataError, DataResult};
pub use models::*;
pub use page::{Page, Pageable};
pub use repository::*;

/// Handles to every repository, shared through the application state.
#[derive(Clone)]
pub struct Repositories {
    pub organizations: Arc<dyn OrganizationRepository>,
    pub profiles: Arc<dyn ProfileRepository>,
    pub password_resets: Arc<dyn PasswordResetRepository>,
    pub tables: Arc<dyn TableRepository>,
    pub categories: Arc<dyn CategoryRepository>,
    pub products: Arc<dyn ProductRepository>,
    pub service_requests: Arc<dyn ServiceRequestRepository>,
}

impl Repositories {
    /// All repositories backed by one fresh [`memory::MemoryStore`].
    pub fn in_memory() -> Self {
        let store = Arc::new(memory::MemoryStore::new());
        Self {
            organizations: store.clone(),
            profiles: store.clone(),
            password_resets: store.clone(),
            tables: store.clone(),
            categories: store.clone(),
            products: store.clone(),
            service_requests: store,
        }
    }

    #[cfg(feature = "postgres")]
    pub fn postgres(pool: sqlx::PgPool) -> Self {
        let store = Arc::new(postgres::PgStore::new(pool));
        Self {
            organizations: store.clone(),
            profiles: store.clone(),
            password_resets: store.clone(),
            tables: store.clone(),
            categories: store.clone(),
            products: store.clone(),
            service_requests: store,
        }
    }
}
