//! Layered configuration for trustseed runs.
//!
//! Configuration values are resolved in this priority order:
//! 1. Values set programmatically (command-line flags and their environment variables)
//! 2. Values loaded from the YAML config file
//! 3. Default values
//!
//! The merged document is validated against a JSON schema before it is
//! deserialized into a [`SetupConfig`].
//!
//! ## Example
//!
//! ```rust,ignore
//! use trustseed_core::config::Config;
//!
//! let mut config = Config::load(Some("trustseed.yml"))?;
//! config.set("subject.country", "DE")?;
//! let setup = config.resolve()?;
//! ```

use trustseed_types::{SetupError, Result, SetupConfig};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::fs;

/// Configuration layer priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConfigLayer {
    /// Default values
    Default = 0,
    /// Values loaded from file
    Loaded = 1,
    /// Values set programmatically
    Set = 2,
}

const LAYERS_BY_MERGE_ORDER: [ConfigLayer; 3] = [ConfigLayer::Default, ConfigLayer::Loaded, ConfigLayer::Set];

/// Configuration with multi-layer support.
#[derive(Clone, Debug)]
pub struct Config {
    layers: HashMap<ConfigLayer, Value>,
    file_path: Option<PathBuf>,
    schema: Value,
}

impl Config {
    /// Create a configuration seeded with defaults and, if given, a YAML file.
    ///
    /// A path that is given but does not exist is an error; the file is
    /// optional only in the sense that no path may be supplied at all.
    pub fn load(path: Option<impl AsRef<Path>>) -> Result<Self> {
        let mut layers = HashMap::new();
        layers.insert(ConfigLayer::Default, serde_json::to_value(SetupConfig::default())?);

        let file_path = path.map(|p| p.as_ref().to_path_buf());

        if let Some(path) = &file_path {
            let content = fs::read_to_string(path)
                .map_err(|e| SetupError::Config(format!("Failed to read config file {}: {}", path.display(), e)))?;

            let value: Value = serde_yaml::from_str(&content)
                .map_err(|e| SetupError::Config(format!("Failed to parse config {}: {}", path.display(), e)))?;

            // An empty YAML file parses to null
            if !value.is_null() {
                layers.insert(ConfigLayer::Loaded, value);
            }
        }

        Ok(Self {
            layers,
            file_path,
            schema: setup_schema(),
        })
    }

    /// Path of the loaded config file, if any.
    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    /// Set a configuration value programmatically.
    pub fn set(&mut self, key: &str, value: impl Serialize) -> Result<()> {
        let value = serde_json::to_value(value)
            .map_err(|e| SetupError::Config(format!("Failed to serialize value for {}: {}", key, e)))?;

        let set_layer = self.layers.entry(ConfigLayer::Set).or_insert(Value::Object(Default::default()));

        set_value_at_path(set_layer, key, value)
    }

    /// Set a value only when `value` is `Some`.
    pub fn set_opt(&mut self, key: &str, value: Option<impl Serialize>) -> Result<()> {
        match value {
            Some(value) => self.set(key, value),
            None => Ok(()),
        }
    }

    /// Get merged data from all layers.
    pub fn merged_data(&self) -> Value {
        let mut merged = Value::Object(serde_json::Map::new());

        for layer in &LAYERS_BY_MERGE_ORDER {
            if let Some(layer_data) = self.layers.get(layer) {
                merged = crate::util::data::deep_merge(merged, layer_data.clone());
            }
        }

        merged
    }

    /// Validate the merged configuration against the schema.
    pub fn validate(&self) -> Result<()> {
        let instance = self.merged_data();

        let compiled = jsonschema::JSONSchema::compile(&self.schema)
            .map_err(|e| SetupError::Bug(format!("Invalid configuration schema: {}", e)))?;

        let result = compiled.validate(&instance);
        if let Err(errors) = result {
            let error_msgs: Vec<String> = errors
                .map(|e| format!("{} (at {})", e, e.instance_path))
                .collect();
            return Err(SetupError::Config(format!(
                "Validation failed: {}",
                error_msgs.join(", ")
            )));
        }
        Ok(())
    }

    /// Validate and deserialize into the run configuration.
    pub fn resolve(&self) -> Result<SetupConfig> {
        self.validate()?;
        serde_json::from_value(self.merged_data())
            .map_err(|e| SetupError::Config(format!("Failed to parse configuration: {}", e)))
    }
}

/// JSON schema for the merged configuration document.
pub fn setup_schema() -> Value {
    let text = json!({"type": "string"});
    json!({
        "type": "object",
        "properties": {
            "state_dir": text,
            "secrets_file": text,
            "ca_dir": text,
            "openssl_config": text,
            "subject": {
                "type": "object",
                "properties": {
                    "country": {"type": "string", "pattern": "^[A-Za-z]{2}$"},
                    "state": text,
                    "locality": text,
                    "organization": text,
                    "unit": text,
                    "email": {"type": "string", "pattern": "^[^@\\s]+@[^@\\s]+$"}
                }
            },
            "common_names": {
                "type": "object",
                "additionalProperties": {"type": "string", "minLength": 1}
            },
            "skip_verification": {"type": "boolean"},
            "entropy": {"enum": ["strict", "best-effort"]},
            "backend": {"enum": ["openssl", "native"]},
            "password_length": {"type": "integer", "minimum": 8},
            "ca_validity_days": {"type": "integer", "minimum": 1},
            "cert_validity_days": {"type": "integer", "minimum": 1}
        }
    })
}

fn set_value_at_path(data: &mut Value, path: &str, value: Value) -> Result<()> {
    let parts: Vec<&str> = path.split('.').collect();

    let (last, parents) = match parts.split_last() {
        Some(split) if !path.is_empty() => split,
        _ => return Err(SetupError::Config("Empty configuration key".to_string())),
    };

    // Navigate to parent, creating intermediate objects as needed
    let mut current = data;
    for part in parents {
        if !current.is_object() {
            *current = Value::Object(Default::default());
        }
        current = match current {
            Value::Object(map) => map
                .entry(part.to_string())
                .or_insert_with(|| Value::Object(Default::default())),
            _ => unreachable!("replaced with an object above"),
        };
    }

    if !current.is_object() {
        *current = Value::Object(Default::default());
    }
    if let Value::Object(map) = current {
        map.insert(last.to_string(), value);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;
    use trustseed_types::{BackendKind, EntropyPolicy};

    #[test]
    fn test_config_layers() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "subject:\n  country: DE\n  unit: Platform\npassword_length: 40").unwrap();

        let mut config = Config::load(Some(file.path())).unwrap();
        config.set("subject.unit", "SRE").unwrap();

        let setup = config.resolve().unwrap();
        assert_eq!(setup.subject.country, "DE");
        assert_eq!(setup.subject.unit, "SRE");
        assert_eq!(setup.subject.locality, "Anytown");
        assert_eq!(setup.password_length, 40);
    }

    #[test]
    fn test_defaults_without_file() {
        let config = Config::load(None::<&Path>).unwrap();
        let setup = config.resolve().unwrap();
        assert_eq!(setup.entropy, EntropyPolicy::BestEffort);
        assert_eq!(setup.backend, BackendKind::Openssl);
        assert!(config.file_path().is_none());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = Config::load(Some("/nonexistent/trustseed.yml"));
        assert!(matches!(result, Err(SetupError::Config(_))));
    }

    #[test]
    fn test_schema_rejects_bad_values() {
        let mut config = Config::load(None::<&Path>).unwrap();
        config.set("subject.country", "USA").unwrap();
        assert!(matches!(config.resolve(), Err(SetupError::Config(_))));

        let mut config = Config::load(None::<&Path>).unwrap();
        config.set("password_length", 4).unwrap();
        assert!(config.resolve().is_err());

        let mut config = Config::load(None::<&Path>).unwrap();
        config.set("entropy", "sometimes").unwrap();
        assert!(config.resolve().is_err());
    }

    #[test]
    fn test_set_opt_skips_none() {
        let mut config = Config::load(None::<&Path>).unwrap();
        config.set_opt("subject.state", None::<String>).unwrap();
        config.set_opt("common_names.consul", Some("consul.service.consul")).unwrap();

        let setup = config.resolve().unwrap();
        assert_eq!(setup.subject.state, "New York");
        assert_eq!(setup.common_name_for("consul"), "consul.service.consul");
    }
}
