use masa_core::config::{ConfigError, FromConfig, MasaConfig};

/// Session token settings (`auth.jwt.*`).
#[derive(Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_secs: u64,
}

impl JwtConfig {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            issuer: "masa".into(),
            audience: "masa-dashboard".into(),
            ttl_secs: 60 * 60 * 12,
        }
    }

    pub fn with_ttl(mut self, ttl_secs: u64) -> Self {
        self.ttl_secs = ttl_secs;
        self
    }
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("ttl_secs", &self.ttl_secs)
            .finish()
    }
}

impl FromConfig for JwtConfig {
    fn from_config(config: &MasaConfig) -> Result<Self, ConfigError> {
        let secret: String = config.get("auth.jwt.secret")?;
        if secret.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "auth.jwt.secret".into(),
                message: "must not be empty".into(),
            });
        }
        let defaults = JwtConfig::new(secret);
        Ok(JwtConfig {
            issuer: config.get_or("auth.jwt.issuer", defaults.issuer.clone())?,
            audience: config.get_or("auth.jwt.audience", defaults.audience.clone())?,
            ttl_secs: config.get_or("auth.jwt.ttl_secs", defaults.ttl_secs)?,
            ..defaults
        })
    }
}
