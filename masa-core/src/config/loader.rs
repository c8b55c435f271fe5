use std::collections::HashMap;
use std::path::Path;

use serde_yaml::Value as Yaml;

use super::value::ConfigValue;
use super::ConfigError;

/// Read a YAML file (if present) and merge its flattened keys into `values`.
pub(crate) fn load_yaml_file(
    path: &Path,
    values: &mut HashMap<String, ConfigValue>,
) -> Result<(), ConfigError> {
    if !path.exists() {
        return Ok(());
    }
    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Load(format!("{}: {e}", path.display())))?;
    load_yaml_str(&content, values)
}

/// Parse a YAML document and merge its flattened keys into `values`.
pub(crate) fn load_yaml_str(
    content: &str,
    values: &mut HashMap<String, ConfigValue>,
) -> Result<(), ConfigError> {
    let yaml: Yaml = serde_yaml::from_str(content).map_err(|e| ConfigError::Load(e.to_string()))?;
    flatten("", &yaml, values);
    Ok(())
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

/// Flatten a YAML tree into dot-separated keys.
///
/// Sequences are stored whole under their key and element-wise under
/// `key.0`, `key.1`, ... so that single elements can be overridden from the
/// environment.
fn flatten(prefix: &str, value: &Yaml, out: &mut HashMap<String, ConfigValue>) {
    match value {
        Yaml::Mapping(map) => {
            for (k, v) in map {
                let key = match k {
                    Yaml::String(s) => s.clone(),
                    Yaml::Number(n) => n.to_string(),
                    Yaml::Bool(b) => b.to_string(),
                    _ => continue,
                };
                flatten(&join(prefix, &key), v, out);
            }
        }
        Yaml::Sequence(items) if !prefix.is_empty() => {
            out.insert(
                prefix.to_string(),
                ConfigValue::List(items.iter().map(ConfigValue::from_yaml).collect()),
            );
            for (i, item) in items.iter().enumerate() {
                flatten(&join(prefix, &i.to_string()), item, out);
            }
        }
        leaf if !prefix.is_empty() => {
            out.insert(prefix.to_string(), ConfigValue::from_yaml(leaf));
        }
        _ => {}
    }
}
