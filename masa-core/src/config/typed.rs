use super::{ConfigError, MasaConfig};

/// A strongly-typed configuration section built from [`MasaConfig`].
///
/// ```ignore
/// impl FromConfig for DatabaseConfig {
///     fn from_config(config: &MasaConfig) -> Result<Self, ConfigError> {
///         Ok(Self {
///             url: config.get("database.url")?,
///             max_connections: config.get_or("database.max_connections", 10)?,
///         })
///     }
/// }
/// ```
pub trait FromConfig: Sized {
    fn from_config(config: &MasaConfig) -> Result<Self, ConfigError>;
}
