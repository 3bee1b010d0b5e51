//! Configuration types and structures.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use crate::enums::{BackendKind, EntropyPolicy};

/// Common name baked into the root certificate.
pub const CA_COMMON_NAME: &str = "trustseed Root CA";

/// Subject fields shared by the root certificate and every issued certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubjectFields {
    /// Two-letter country code (C)
    pub country: String,
    /// State or province (ST)
    pub state: String,
    /// Locality (L)
    pub locality: String,
    /// Organization (O)
    pub organization: String,
    /// Organizational unit (OU)
    pub unit: String,
    /// Contact email (emailAddress)
    pub email: String,
}

impl Default for SubjectFields {
    fn default() -> Self {
        Self {
            country: "US".to_string(),
            state: "New York".to_string(),
            locality: "Anytown".to_string(),
            organization: "Example Company Inc".to_string(),
            unit: "Operations".to_string(),
            email: "operations@example.com".to_string(),
        }
    }
}

/// Fully resolved run configuration.
///
/// Built by merging defaults, the optional config file and command-line
/// flags; see `trustseed_core::config`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SetupConfig {
    /// Directory holding the secret document and the CA tree
    pub state_dir: PathBuf,
    /// Secret document path, relative paths resolve against `state_dir`
    pub secrets_file: PathBuf,
    /// CA directory, relative paths resolve against `state_dir`
    pub ca_dir: PathBuf,
    /// openssl configuration, defaults to `<ca_dir>/openssl.cnf`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openssl_config: Option<PathBuf>,
    /// Subject defaults
    pub subject: SubjectFields,
    /// Per-service common-name overrides
    pub common_names: BTreeMap<String, String>,
    /// Skip post-issuance verification against the CA
    pub skip_verification: bool,
    /// Entropy fallback policy
    pub entropy: EntropyPolicy,
    /// Certificate backend
    pub backend: BackendKind,
    /// Length of generated passwords
    pub password_length: usize,
    /// Root certificate lifetime
    pub ca_validity_days: u32,
    /// Issued certificate lifetime
    pub cert_validity_days: u32,
}

impl Default for SetupConfig {
    fn default() -> Self {
        Self {
            state_dir: PathBuf::from("."),
            secrets_file: PathBuf::from("security.json"),
            ca_dir: PathBuf::from("ssl"),
            openssl_config: None,
            subject: SubjectFields::default(),
            common_names: BTreeMap::new(),
            skip_verification: false,
            entropy: EntropyPolicy::default(),
            backend: BackendKind::default(),
            password_length: 32,
            ca_validity_days: 3650,
            cert_validity_days: 365,
        }
    }
}

impl SetupConfig {
    /// Absolute-or-relative path of the secret document.
    pub fn secrets_path(&self) -> PathBuf {
        self.resolve(&self.secrets_file)
    }

    /// Root of the CA tree.
    pub fn ca_path(&self) -> PathBuf {
        self.resolve(&self.ca_dir)
    }

    /// openssl configuration consumed by the openssl backend.
    pub fn openssl_config_path(&self) -> PathBuf {
        match &self.openssl_config {
            Some(path) => self.resolve(path),
            None => self.ca_path().join("openssl.cnf"),
        }
    }

    /// Common name for a service certificate.
    ///
    /// Falls back to `<service>.example.com` when no override is configured.
    pub fn common_name_for(&self, service: &str) -> String {
        self.common_names
            .get(service)
            .cloned()
            .unwrap_or_else(|| format!("{}.example.com", service))
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.state_dir.join(path)
        }
    }
}
