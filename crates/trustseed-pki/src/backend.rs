//! The certificate backend capability.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use trustseed_types::{BackendKind, Result, SetupConfig, SubjectFields};

use crate::layout::CaLayout;
use crate::native::NativeBackend;
use crate::openssl::OpensslBackend;

/// Distinguished name of a certificate or signing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    /// Shared subject defaults
    pub fields: SubjectFields,
    /// Common name (CN)
    pub common_name: String,
}

impl Subject {
    /// Subject defaults with `common_name` as the CN.
    pub fn new(fields: &SubjectFields, common_name: impl Into<String>) -> Self {
        Self {
            fields: fields.clone(),
            common_name: common_name.into(),
        }
    }

    /// Non-empty attributes as `(openssl short name, value)` pairs.
    pub fn attributes(&self) -> Vec<(&'static str, &str)> {
        [
            ("C", self.fields.country.as_str()),
            ("ST", self.fields.state.as_str()),
            ("L", self.fields.locality.as_str()),
            ("O", self.fields.organization.as_str()),
            ("OU", self.fields.unit.as_str()),
            ("CN", self.common_name.as_str()),
            ("emailAddress", self.fields.email.as_str()),
        ]
        .into_iter()
        .filter(|(_, value)| !value.is_empty())
        .collect()
    }

    /// Subject in openssl's `-subj` form, e.g. `/C=US/O=Example/CN=consul`.
    pub fn to_openssl_subj(&self) -> String {
        self.attributes()
            .into_iter()
            .map(|(name, value)| format!("/{}={}", name, value.replace('\\', "\\\\").replace('/', "\\/")))
            .collect()
    }
}

/// Result of checking a certificate against the CA.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    /// Whether the chain verified
    pub verified: bool,
    /// Raw verifier output
    pub diagnostic: String,
}

impl Verification {
    /// Successful verification.
    pub fn ok(diagnostic: impl Into<String>) -> Self {
        Self { verified: true, diagnostic: diagnostic.into() }
    }

    /// Failed verification.
    pub fn failed(diagnostic: impl Into<String>) -> Self {
        Self { verified: false, diagnostic: diagnostic.into() }
    }
}

/// Key generation, signing and verification for one CA layout.
///
/// Implementations write PEM files to the paths they are given and leave
/// permissions to the caller.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CertificateBackend: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Generate the root key and a self-signed root certificate.
    async fn create_root(&self, subject: &Subject, key: &Path, cert: &Path) -> Result<()>;

    /// Generate a private key.
    async fn generate_key(&self, key: &Path) -> Result<()>;

    /// Create a signing request for `key` with `subject`.
    async fn create_signing_request(&self, key: &Path, subject: &Subject, csr: &Path) -> Result<()>;

    /// Sign `csr` with the root key, writing the certificate to `cert`.
    async fn sign_request(&self, csr: &Path, cert: &Path) -> Result<()>;

    /// Verify `cert` against the root certificate.
    async fn verify_certificate(&self, cert: &Path) -> Result<Verification>;
}

/// Build the backend selected in `config` for `layout`.
pub fn backend_for(config: &SetupConfig, layout: CaLayout) -> Arc<dyn CertificateBackend> {
    match config.backend {
        BackendKind::Openssl => Arc::new(OpensslBackend::new(
            layout,
            config.openssl_config_path(),
            config.ca_validity_days,
            config.cert_validity_days,
        )),
        BackendKind::Native => Arc::new(NativeBackend::new(
            layout,
            config.ca_validity_days,
            config.cert_validity_days,
        )),
    }
}
