use std::sync::Arc;

use axum::extract::FromRef;
use masa_core::health::{Health, HealthIndicator};
use masa_core::{Clock, QueryCache, SystemClock};
use masa_data::{Repositories, ServiceRequest};
use masa_rate_limit::ClientThrottle;
use masa_realtime::{ChangeFeed, RepositoryPendingSource};
use masa_security::TokenService;
use serde_json::Value;

use crate::config::{AppConfig, Backend};
use crate::mailer::{LogMailer, ResetMailer};
use crate::realtime::{CacheInvalidator, MonitorRegistry};
use crate::services::{
    AdminService, AuthService, CatalogService, MenuService, OrganizationService, ServiceRequestService,
    TableService,
};

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub repos: Repositories,
    pub tokens: Arc<TokenService>,
    pub feed: ChangeFeed<ServiceRequest>,
    pub cache: QueryCache<Value>,
    pub throttle: ClientThrottle,
    pub monitors: MonitorRegistry,
    pub health: Health,
    pub auth: AuthService,
    pub admin: AdminService,
    pub catalog: CatalogService,
    pub tables: TableService,
    pub organizations: OrganizationService,
    pub menu: MenuService,
    pub requests: ServiceRequestService,
}

impl FromRef<AppState> for Arc<TokenService> {
    fn from_ref(state: &AppState) -> Self {
        state.tokens.clone()
    }
}

impl FromRef<AppState> for ClientThrottle {
    fn from_ref(state: &AppState) -> Self {
        state.throttle.clone()
    }
}

impl AppState {
    pub fn builder(config: AppConfig, repos: Repositories) -> AppStateBuilder {
        AppStateBuilder {
            config,
            repos,
            clock: Arc::new(SystemClock),
            mailer: Arc::new(LogMailer),
            health: Vec::new(),
        }
    }

    /// Open the configured backend and assemble the state.
    pub async fn connect(config: AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        match config.database.backend {
            Backend::Memory => {
                tracing::warn!("Using the in-memory backend; data is lost on restart");
                Ok(Self::builder(config, Repositories::in_memory()).build())
            }
            #[cfg(feature = "postgres")]
            Backend::Postgres => {
                let url = config.database.url.clone().unwrap_or_default();
                let pool = masa_data::postgres::connect(&url, config.database.max_connections).await?;
                masa_data::postgres::migrate(&pool).await?;
                let health = masa_data::postgres::DatabaseHealth::new(pool.clone());
                Ok(Self::builder(config, Repositories::postgres(pool))
                    .health_check(Box::new(health))
                    .build())
            }
            #[cfg(not(feature = "postgres"))]
            Backend::Postgres => Err("database.backend is 'postgres' but the postgres feature is disabled".into()),
        }
    }
}

pub struct AppStateBuilder {
    config: AppConfig,
    repos: Repositories,
    clock: Arc<dyn Clock>,
    mailer: Arc<dyn ResetMailer>,
    health: Vec<Box<dyn HealthIndicator>>,
}

impl AppStateBuilder {
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn mailer(mut self, mailer: Arc<dyn ResetMailer>) -> Self {
        self.mailer = mailer;
        self
    }

    pub fn health_check(mut self, indicator: Box<dyn HealthIndicator>) -> Self {
        self.health.push(indicator);
        self
    }

    pub fn build(self) -> AppState {
        let AppStateBuilder {
            config,
            repos,
            clock,
            mailer,
            health,
        } = self;

        let tokens = Arc::new(TokenService::new(config.jwt.clone()));
        let feed = ChangeFeed::new(config.channel_capacity);
        let cache = QueryCache::new(config.cache_ttl);
        let monitors = MonitorRegistry::new(
            feed.clone(),
            Arc::new(RepositoryPendingSource(repos.service_requests.clone())),
            Arc::new(CacheInvalidator::new(cache.clone())),
        );

        AppState {
            auth: AuthService::new(
                repos.profiles.clone(),
                repos.organizations.clone(),
                repos.password_resets.clone(),
                tokens.clone(),
                mailer,
                clock.clone(),
                config.reset_ttl,
                config.base_url.clone(),
            ),
            admin: AdminService::new(repos.profiles.clone(), repos.organizations.clone(), clock.clone()),
            catalog: CatalogService::new(
                repos.categories.clone(),
                repos.products.clone(),
                cache.clone(),
                clock.clone(),
            ),
            tables: TableService::new(
                repos.tables.clone(),
                repos.organizations.clone(),
                feed.clone(),
                cache.clone(),
                clock.clone(),
                config.base_url.clone(),
            ),
            organizations: OrganizationService::new(repos.organizations.clone(), cache.clone(), clock.clone()),
            menu: MenuService::new(
                repos.organizations.clone(),
                repos.categories.clone(),
                repos.products.clone(),
                repos.tables.clone(),
                cache.clone(),
            ),
            requests: ServiceRequestService::new(
                repos.service_requests.clone(),
                repos.tables.clone(),
                config.request_limit,
                feed.clone(),
                cache.clone(),
                clock,
            ),
            throttle: ClientThrottle::new(config.public_throttle),
            health: Health::new(health),
            config: Arc::new(config),
            repos,
            tokens,
            feed,
            cache,
            monitors,
        }
    }
}
