use super::ConfigError;

/// Resolves the `reference` part of a `${reference}` placeholder.
pub trait SecretResolver: Send + Sync {
    fn resolve(&self, reference: &str) -> Result<String, ConfigError>;
}

/// Default resolver: environment variables and mounted secret files.
///
/// - `${VAR_NAME}` / `${env:VAR_NAME}` read an environment variable
/// - `${file:/run/secrets/jwt}` reads a file and trims it
/// - `${VAR_NAME:-fallback}` uses `fallback` when the variable is unset
pub struct DefaultSecretResolver;

impl SecretResolver for DefaultSecretResolver {
    fn resolve(&self, reference: &str) -> Result<String, ConfigError> {
        let reference = reference.trim();
        if let Some(path) = reference.strip_prefix("file:") {
            return std::fs::read_to_string(path.trim())
                .map(|s| s.trim().to_string())
                .map_err(|e| ConfigError::Load(format!("Secret file '{}': {e}", path.trim())));
        }
        let var = reference.strip_prefix("env:").unwrap_or(reference);
        let (name, fallback) = match var.split_once(":-") {
            Some((name, fallback)) => (name.trim(), Some(fallback)),
            None => (var.trim(), None),
        };
        match (std::env::var(name), fallback) {
            (Ok(v), _) => Ok(v),
            (Err(_), Some(fallback)) => Ok(fallback.to_string()),
            (Err(_), None) => Err(ConfigError::NotFound(format!("env:{name}"))),
        }
    }
}

/// Replace every `${...}` placeholder in `value` using `resolver`.
pub fn resolve_placeholders(
    value: &str,
    resolver: &dyn SecretResolver,
) -> Result<String, ConfigError> {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find('}')
            .ok_or_else(|| ConfigError::Load(format!("Unclosed placeholder in: {value}")))?;
        out.push_str(&resolver.resolve(&after[..end])?);
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}
