use masa_core::config::{ConfigError, FromConfig, MasaConfig};
use url::Url;

/// Worker settings (`offline.*`).
#[derive(Debug, Clone)]
pub struct OfflineConfig {
    pub cache_prefix: String,
    pub version: u32,
    /// Origin the worker serves; requests to other origins are not cached.
    pub origin: Url,
    /// Paths fetched and stored at install time. `/` is the offline fallback page.
    pub precache: Vec<String>,
}

impl OfflineConfig {
    pub fn new(origin: Url) -> Self {
        Self {
            cache_prefix: "masa".into(),
            version: 1,
            origin,
            precache: vec!["/".into(), "/manifest.json".into()],
        }
    }

    pub fn cache_name(&self) -> String {
        format!("{}-v{}", self.cache_prefix, self.version)
    }
}

impl FromConfig for OfflineConfig {
    fn from_config(config: &MasaConfig) -> Result<Self, ConfigError> {
        let raw: String = config.get_or("offline.origin", "http://localhost:3000".to_string())?;
        let origin = Url::parse(&raw).map_err(|e| ConfigError::Invalid {
            key: "offline.origin".into(),
            message: e.to_string(),
        })?;
        let defaults = OfflineConfig::new(origin);
        Ok(OfflineConfig {
            cache_prefix: config.get_or("offline.cache_prefix", defaults.cache_prefix.clone())?,
            version: config.get_or("offline.version", defaults.version)?,
            precache: config.get_or("offline.precache", defaults.precache.clone())?,
            ..defaults
        })
    }
}
