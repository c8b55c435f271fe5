use std::time::Duration;

use masa_core::config::{ConfigError, FromConfig, MasaConfig};
use masa_rate_limit::WindowPolicy;
use masa_security::JwtConfig;

/// Storage backend selected by `database.backend`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub backend: Backend,
    pub url: Option<String>,
    pub max_connections: u32,
}

impl FromConfig for DatabaseConfig {
    fn from_config(config: &MasaConfig) -> Result<Self, ConfigError> {
        let backend = match config.get_or("database.backend", "postgres".to_string())?.as_str() {
            "postgres" => Backend::Postgres,
            "memory" => Backend::Memory,
            other => {
                return Err(ConfigError::Invalid {
                    key: "database.backend".into(),
                    message: format!("expected 'postgres' or 'memory', got '{other}'"),
                })
            }
        };
        let url: Option<String> = config.get_or("database.url", None)?;
        if backend == Backend::Postgres && url.is_none() {
            return Err(ConfigError::NotFound("database.url".into()));
        }
        Ok(DatabaseConfig {
            backend,
            url,
            max_connections: config.get_or("database.max_connections", 10)?,
        })
    }
}

/// Everything the service reads at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub addr: String,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    /// Lifetime of password reset tokens.
    pub reset_ttl: Duration,
    /// Per-table waiter-call budget.
    pub request_limit: WindowPolicy,
    /// Per-client budget on public endpoints.
    pub public_throttle: WindowPolicy,
    /// Origin used to build table QR links.
    pub base_url: String,
    pub channel_capacity: usize,
    pub cache_ttl: Duration,
}

impl AppConfig {
    /// Defaults for tests and local runs against the in-memory backend.
    pub fn for_memory(jwt_secret: &str) -> Self {
        AppConfig {
            addr: "0.0.0.0:3000".into(),
            database: DatabaseConfig {
                backend: Backend::Memory,
                url: None,
                max_connections: 10,
            },
            jwt: JwtConfig::new(jwt_secret),
            reset_ttl: Duration::from_secs(3600),
            request_limit: WindowPolicy::new(3, Duration::from_secs(300)),
            public_throttle: WindowPolicy::new(60, Duration::from_secs(60)),
            base_url: "http://localhost:3000".into(),
            channel_capacity: 256,
            cache_ttl: Duration::from_secs(30),
        }
    }
}

fn positive(key: &str, value: u64) -> Result<u64, ConfigError> {
    if value == 0 {
        return Err(ConfigError::Invalid {
            key: key.into(),
            message: "must be greater than zero".into(),
        });
    }
    Ok(value)
}

impl FromConfig for AppConfig {
    fn from_config(config: &MasaConfig) -> Result<Self, ConfigError> {
        let request_limit = WindowPolicy::new(
            positive(
                "service_requests.rate_limit.max",
                config.get_or("service_requests.rate_limit.max", 3)?,
            )?,
            Duration::from_secs(positive(
                "service_requests.rate_limit.window_secs",
                config.get_or("service_requests.rate_limit.window_secs", 300)?,
            )?),
        );
        let public_throttle = WindowPolicy::new(
            positive("public.throttle.max", config.get_or("public.throttle.max", 60)?)?,
            Duration::from_secs(positive(
                "public.throttle.window_secs",
                config.get_or("public.throttle.window_secs", 60)?,
            )?),
        );
        let base_url: String = config.get_or("public.base_url", "http://localhost:3000".to_string())?;

        Ok(AppConfig {
            addr: config.get_or("server.addr", "0.0.0.0:3000".to_string())?,
            database: config.bind()?,
            jwt: config.bind()?,
            reset_ttl: Duration::from_secs(config.get_or("auth.reset_ttl_secs", 3600)?),
            request_limit,
            public_throttle,
            base_url: base_url.trim_end_matches('/').to_string(),
            channel_capacity: config.get_or("realtime.channel_capacity", 256)?,
            cache_ttl: Duration::from_secs(config.get_or("cache.ttl_secs", 30)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = r#"
auth:
  jwt:
    secret: test-secret
database:
  backend: memory
"#;

    #[test]
    fn defaults_apply() {
        let config = MasaConfig::from_yaml_str(BASE, "test").unwrap();
        let app: AppConfig = config.bind().unwrap();
        assert_eq!(app.request_limit.max, 3);
        assert_eq!(app.request_limit.window, Duration::from_secs(300));
        assert_eq!(app.database.backend, Backend::Memory);
        assert_eq!(app.base_url, "http://localhost:3000");
    }

    #[test]
    fn missing_secret_is_fatal() {
        let config = MasaConfig::from_yaml_str("database:\n  backend: memory\n", "test").unwrap();
        assert!(matches!(
            config.bind::<AppConfig>(),
            Err(ConfigError::NotFound(key)) if key == "auth.jwt.secret"
        ));
    }

    #[test]
    fn postgres_needs_url() {
        let config = MasaConfig::from_yaml_str("auth:\n  jwt:\n    secret: s\n", "test").unwrap();
        assert!(matches!(
            config.bind::<AppConfig>(),
            Err(ConfigError::NotFound(key)) if key == "database.url"
        ));
    }

    #[test]
    fn zero_window_is_rejected() {
        let yaml = format!("{BASE}service_requests:\n  rate_limit:\n    window_secs: 0\n");
        let config = MasaConfig::from_yaml_str(&yaml, "test").unwrap();
        assert!(matches!(config.bind::<AppConfig>(), Err(ConfigError::Invalid { .. })));
    }
}
