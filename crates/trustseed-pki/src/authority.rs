//! Root certificate authority bootstrap.

use std::sync::Arc;
use trustseed_core::util::set_mode;
use trustseed_types::{Result, SubjectFields, CA_COMMON_NAME};

use crate::backend::{CertificateBackend, Subject};
use crate::issuer::CertificateIssuer;
use crate::layout::CaLayout;
use crate::{INITIAL_SERIAL, KEY_MODE};

/// What [`CaManager::initialize`] found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaState {
    /// A new root was generated on this run
    Created,
    /// A complete root was already on disk
    Existing,
    /// Only one of the root key and certificate exists; nothing was touched
    HalfInitialized,
}

/// Owns the CA directory and its root key and certificate.
pub struct CaManager {
    layout: CaLayout,
    backend: Arc<dyn CertificateBackend>,
    subject: SubjectFields,
}

impl CaManager {
    /// Manager for `layout` using `backend` for crypto.
    pub fn new(layout: CaLayout, backend: Arc<dyn CertificateBackend>, subject: SubjectFields) -> Self {
        Self { layout, backend, subject }
    }

    /// Create the root key and certificate unless either already exists.
    ///
    /// Regeneration is never attempted once any root file is present: a half
    /// initialized directory is reported and left for the operator.
    pub async fn initialize(&self) -> Result<CaState> {
        let key = self.layout.root_key();
        let cert = self.layout.root_cert();

        match (key.exists(), cert.exists()) {
            (true, true) => {
                tracing::debug!("Certificate authority already present in {}", self.layout.root().display());
                return Ok(CaState::Existing);
            }
            (true, false) | (false, true) => {
                tracing::warn!(
                    "Certificate authority in {} is half initialized (key present: {}, certificate present: {}); not regenerating",
                    self.layout.root().display(),
                    key.exists(),
                    cert.exists()
                );
                return Ok(CaState::HalfInitialized);
            }
            (false, false) => {}
        }

        std::fs::create_dir_all(self.layout.private_dir())?;
        std::fs::create_dir_all(self.layout.certs_dir())?;

        let serial = self.layout.serial();
        if !serial.exists() {
            std::fs::write(&serial, format!("{}\n", INITIAL_SERIAL))?;
        }
        let index = self.layout.index();
        if !index.exists() {
            std::fs::write(&index, "")?;
        }

        tracing::info!("Creating certificate authority with the {} backend", self.backend.name());
        let subject = Subject::new(&self.subject, CA_COMMON_NAME);
        self.backend.create_root(&subject, &key, &cert).await?;

        set_mode(&key, KEY_MODE)?;
        set_mode(&cert, KEY_MODE)?;

        Ok(CaState::Created)
    }

    /// Issuer signing with this CA.
    pub fn issuer(&self, verify: bool) -> CertificateIssuer {
        CertificateIssuer::new(self.layout.clone(), Arc::clone(&self.backend), self.subject.clone(), verify)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockCertificateBackend;
    use crate::native::NativeBackend;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_initialize_creates_layout() {
        let dir = TempDir::new().unwrap();
        let layout = CaLayout::new(dir.path().join("ssl"));
        let backend = Arc::new(NativeBackend::new(layout.clone(), 3650, 365));
        let manager = CaManager::new(layout.clone(), backend, SubjectFields::default());

        assert_eq!(manager.initialize().await.unwrap(), CaState::Created);

        assert_eq!(std::fs::read_to_string(layout.serial()).unwrap().trim(), "1000");
        assert_eq!(std::fs::read_to_string(layout.index()).unwrap(), "");
        assert!(layout.certs_dir().is_dir());
        assert!(layout.root_cert().exists());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(layout.root_key()).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
            let mode = std::fs::metadata(layout.root_cert()).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[tokio::test]
    async fn test_initialize_twice_keeps_root() {
        let dir = TempDir::new().unwrap();
        let layout = CaLayout::new(dir.path());
        let backend = Arc::new(NativeBackend::new(layout.clone(), 3650, 365));
        let manager = CaManager::new(layout.clone(), backend, SubjectFields::default());

        manager.initialize().await.unwrap();
        let before = std::fs::read(layout.root_cert()).unwrap();

        assert_eq!(manager.initialize().await.unwrap(), CaState::Existing);
        assert_eq!(std::fs::read(layout.root_cert()).unwrap(), before);
    }

    #[tokio::test]
    async fn test_half_initialized_is_left_alone() {
        let dir = TempDir::new().unwrap();
        let layout = CaLayout::new(dir.path());
        std::fs::create_dir_all(layout.private_dir()).unwrap();
        std::fs::write(layout.root_key(), "key").unwrap();

        let mut backend = MockCertificateBackend::new();
        backend.expect_create_root().never();
        let manager = CaManager::new(layout.clone(), Arc::new(backend), SubjectFields::default());

        assert_eq!(manager.initialize().await.unwrap(), CaState::HalfInitialized);
        assert!(!layout.root_cert().exists());
        assert!(!layout.serial().exists());
    }

    #[tokio::test]
    async fn test_root_uses_fixed_common_name() {
        let dir = TempDir::new().unwrap();
        let layout = CaLayout::new(dir.path());

        let mut backend = MockCertificateBackend::new();
        backend.expect_name().return_const("mock");
        backend
            .expect_create_root()
            .withf(|subject, _, _| subject.common_name == CA_COMMON_NAME && subject.fields.country == "US")
            .times(1)
            .returning(|_, key, cert| {
                std::fs::write(key, "key").unwrap();
                std::fs::write(cert, "cert").unwrap();
                Ok(())
            });
        let manager = CaManager::new(layout, Arc::new(backend), SubjectFields::default());

        assert_eq!(manager.initialize().await.unwrap(), CaState::Created);
    }
}
