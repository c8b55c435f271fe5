mod loader;
pub mod secrets;
pub mod typed;
pub mod value;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub use secrets::{DefaultSecretResolver, SecretResolver};
pub use typed::FromConfig;
pub use value::{ConfigValue, FromConfigValue};

/// Environment variable selecting the active profile.
pub const PROFILE_ENV: &str = "MASA_PROFILE";

/// Error type for configuration operations.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The requested key was not found in the configuration.
    #[error("Config key not found: {0}")]
    NotFound(String),
    /// The value could not be converted to the requested type.
    #[error("Config type mismatch for '{key}': expected {expected}")]
    TypeMismatch { key: String, expected: &'static str },
    /// An I/O or YAML parsing error occurred while loading config files.
    #[error("Config load error: {0}")]
    Load(String),
    /// A value is present but outside the accepted domain.
    #[error("Invalid config value for '{key}': {message}")]
    Invalid { key: String, message: String },
}

/// Application configuration loaded from YAML files, `.env` files, and environment variables.
///
/// Resolution order (lowest to highest priority):
/// 1. `application.yaml` (base)
/// 2. `application-{profile}.yaml` (profile override)
/// 3. `.env` file (loaded into process environment)
/// 4. `.env.{profile}` file (loaded into process environment)
/// 5. Environment variables (e.g., `DATABASE_URL` overrides `database.url`)
///
/// `.env` files never overwrite already-set environment variables.
///
/// Profile is determined by: `MASA_PROFILE` env var > argument > default `"dev"`.
#[derive(Debug, Clone)]
pub struct MasaConfig {
    values: HashMap<String, ConfigValue>,
    profile: String,
}

impl MasaConfig {
    /// Load configuration for the given profile from the current directory.
    pub fn load(profile: &str) -> Result<Self, ConfigError> {
        Self::load_from_dir(Path::new("."), profile, &DefaultSecretResolver)
    }

    /// Load configuration rooted at `dir` with a custom secret resolver.
    ///
    /// Looks for `application.yaml` and `application-{profile}.yaml` in `dir`,
    /// resolves `${...}` placeholders in string values, then overlays
    /// environment variables.
    pub fn load_from_dir(
        dir: &Path,
        profile: &str,
        resolver: &dyn SecretResolver,
    ) -> Result<Self, ConfigError> {
        let active_profile = std::env::var(PROFILE_ENV).unwrap_or_else(|_| profile.to_string());

        let mut values = HashMap::new();

        loader::load_yaml_file(&dir.join("application.yaml"), &mut values)?;
        let profile_path: PathBuf = dir.join(format!("application-{active_profile}.yaml"));
        loader::load_yaml_file(&profile_path, &mut values)?;

        let _ = dotenvy::from_path(dir.join(".env"));
        let _ = dotenvy::from_path(dir.join(format!(".env.{active_profile}")));

        resolve_string_values(&mut values, resolver)?;

        // Convention: `database.url` <-> `DATABASE_URL`
        for (env_key, env_val) in std::env::vars() {
            let config_key = env_key.to_lowercase().replace('_', ".");
            values.insert(config_key, ConfigValue::String(env_val));
        }

        tracing::debug!(profile = %active_profile, keys = values.len(), "Configuration loaded");

        Ok(MasaConfig {
            values,
            profile: active_profile,
        })
    }

    /// Create a config from a YAML string (useful for testing).
    pub fn from_yaml_str(yaml: &str, profile: &str) -> Result<Self, ConfigError> {
        let mut values = HashMap::new();
        loader::load_yaml_str(yaml, &mut values)?;
        Ok(MasaConfig {
            values,
            profile: profile.to_string(),
        })
    }

    /// Create an empty config (useful for testing).
    pub fn empty() -> Self {
        MasaConfig {
            values: HashMap::new(),
            profile: "test".to_string(),
        }
    }

    /// Set a value programmatically.
    pub fn set(&mut self, key: &str, value: ConfigValue) {
        self.values.insert(key.to_string(), value);
    }

    /// Get a typed value for the given dot-separated key.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotFound` if the key does not exist, or
    /// `ConfigError::TypeMismatch` if the value cannot be converted.
    pub fn get<V: FromConfigValue>(&self, key: &str) -> Result<V, ConfigError> {
        let value = self
            .values
            .get(key)
            .ok_or_else(|| ConfigError::NotFound(key.to_string()))?;
        V::from_config_value(value, key)
    }

    /// Get a typed value, returning a default if the key is missing.
    ///
    /// A present value of the wrong type is still an error.
    pub fn get_or<V: FromConfigValue>(&self, key: &str, default: V) -> Result<V, ConfigError> {
        match self.get(key) {
            Ok(v) => Ok(v),
            Err(ConfigError::NotFound(_)) => Ok(default),
            Err(e) => Err(e),
        }
    }

    /// Check whether a key exists in the config.
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// The active profile name.
    pub fn profile(&self) -> &str {
        &self.profile
    }

    /// Build a typed section from the raw values.
    pub fn bind<C: FromConfig>(&self) -> Result<C, ConfigError> {
        C::from_config(self)
    }
}

/// Resolve `${...}` placeholders in all string values of the config map.
fn resolve_string_values(
    values: &mut HashMap<String, ConfigValue>,
    resolver: &dyn SecretResolver,
) -> Result<(), ConfigError> {
    let keys: Vec<String> = values.keys().cloned().collect();
    for key in keys {
        if let Some(ConfigValue::String(s)) = values.get(&key) {
            if s.contains("${") {
                let resolved = secrets::resolve_placeholders(s, resolver)?;
                values.insert(key, ConfigValue::String(resolved));
            }
        }
    }
    Ok(())
}
