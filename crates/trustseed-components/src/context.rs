//! Everything a task needs, passed explicitly.

use std::sync::Arc;
use trustseed_pki::{backend_for, CaLayout, CaManager, CertificateBackend, CertificateIssuer};
use trustseed_secrets::{SecretGenerator, SecretStore, Secrets};
use trustseed_types::{Result, SetupConfig};

/// Shared state handed to every task.
pub struct TaskContext {
    /// Resolved run configuration
    pub config: SetupConfig,
    /// Secret document handle
    pub store: SecretStore,
    /// Random material source
    pub generator: SecretGenerator,
    /// Root CA manager
    pub authority: CaManager,
    /// Service certificate issuer
    pub issuer: CertificateIssuer,
    warnings: Vec<String>,
}

impl TaskContext {
    /// Build a context from `config`, using the backend and entropy policy it selects.
    pub fn new(config: SetupConfig) -> Result<Self> {
        let generator = SecretGenerator::new(config.entropy)?;
        let backend = backend_for(&config, CaLayout::new(config.ca_path()));
        Ok(Self::with_parts(config, generator, backend))
    }

    /// Build a context around an explicit generator and backend.
    pub fn with_parts(
        config: SetupConfig,
        generator: SecretGenerator,
        backend: Arc<dyn CertificateBackend>,
    ) -> Self {
        let store = SecretStore::open(config.secrets_path());
        let authority = CaManager::new(CaLayout::new(config.ca_path()), backend, config.subject.clone());
        let issuer = authority.issuer(!config.skip_verification);

        Self {
            config,
            store,
            generator,
            authority,
            issuer,
            warnings: Vec::new(),
        }
    }

    /// Record a warning for the run report.
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{}", message);
        self.warnings.push(message);
    }

    /// Warnings recorded since the last call.
    pub fn take_warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.warnings)
    }
}

/// Set `key` to a fresh password of `length` characters if absent.
pub(crate) fn ensure_password(
    secrets: &mut Secrets,
    generator: &mut SecretGenerator,
    key: &str,
    length: usize,
) -> bool {
    secrets.set_if_absent(key, || generator.password(length))
}
