//! Per-service key and certificate issuance.

use std::sync::Arc;
use trustseed_core::util::set_mode;
use trustseed_types::{Result, SetupError, SubjectFields, TaskOutcome};

use crate::backend::{CertificateBackend, Subject};
use crate::layout::CaLayout;
use crate::{CERT_MODE, KEY_MODE};

/// What one [`CertificateIssuer::issue`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Issuance {
    /// A new private key was generated
    pub key_created: bool,
    /// A new certificate was signed
    pub cert_created: bool,
    /// The certificate was verified against the CA
    pub verified: bool,
}

impl Issuance {
    /// Changed when anything was written to disk.
    pub fn outcome(&self) -> TaskOutcome {
        TaskOutcome::from_changed(self.key_created || self.cert_created)
    }
}

/// Issues CA-signed certificates for named services.
pub struct CertificateIssuer {
    layout: CaLayout,
    backend: Arc<dyn CertificateBackend>,
    subject: SubjectFields,
    verify: bool,
}

impl CertificateIssuer {
    /// Issuer over `layout`. With `verify` false the chain check is skipped.
    pub fn new(
        layout: CaLayout,
        backend: Arc<dyn CertificateBackend>,
        subject: SubjectFields,
        verify: bool,
    ) -> Self {
        Self {
            layout,
            backend,
            subject,
            verify,
        }
    }

    /// Make sure `service` has a key and a signed certificate for `common_name`.
    ///
    /// Key and certificate are checked independently: an existing key is
    /// reused to sign a missing certificate. Existing files are never
    /// replaced. A certificate that fails verification stays on disk.
    pub async fn issue(&self, service: &str, common_name: &str) -> Result<Issuance> {
        let key = self.layout.service_key(service);
        let csr = self.layout.service_csr(service);
        let cert = self.layout.service_cert(service);
        let mut issuance = Issuance::default();

        if !key.exists() {
            std::fs::create_dir_all(self.layout.private_dir())?;
            tracing::info!("Generating private key for {}", service);
            self.backend.generate_key(&key).await?;
            set_mode(&key, KEY_MODE)?;
            issuance.key_created = true;
        }

        if !cert.exists() {
            std::fs::create_dir_all(self.layout.certs_dir())?;
            let subject = Subject::new(&self.subject, common_name);
            tracing::info!("Requesting certificate for {} ({})", service, common_name);
            self.backend.create_signing_request(&key, &subject, &csr).await?;
            self.backend.sign_request(&csr, &cert).await?;
            set_mode(&cert, CERT_MODE)?;
            issuance.cert_created = true;
        }

        if self.verify {
            let verification = self.backend.verify_certificate(&cert).await?;
            if !verification.verified {
                return Err(SetupError::Verification {
                    certificate: cert,
                    diagnostic: verification.diagnostic,
                });
            }
            tracing::debug!("{}", verification.diagnostic);
            issuance.verified = true;
        }

        Ok(issuance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authority::CaManager;
    use crate::backend::{MockCertificateBackend, Verification};
    use crate::native::NativeBackend;
    use mockall::predicate::always;
    use tempfile::TempDir;

    fn touching_mock() -> MockCertificateBackend {
        let mut backend = MockCertificateBackend::new();
        backend.expect_generate_key().returning(|key| {
            std::fs::write(key, "key").unwrap();
            Ok(())
        });
        backend
            .expect_create_signing_request()
            .returning(|_, _, csr| {
                std::fs::write(csr, "csr").unwrap();
                Ok(())
            });
        backend.expect_sign_request().returning(|_, cert| {
            std::fs::write(cert, "cert").unwrap();
            Ok(())
        });
        backend
    }

    #[tokio::test]
    async fn test_existing_key_is_reused() {
        let dir = TempDir::new().unwrap();
        let layout = CaLayout::new(dir.path());
        std::fs::create_dir_all(layout.private_dir()).unwrap();
        std::fs::write(layout.service_key("nginx"), "existing").unwrap();

        let mut backend = MockCertificateBackend::new();
        backend.expect_generate_key().never();
        backend
            .expect_create_signing_request()
            .withf(|_, subject, _| subject.common_name == "proxy.internal")
            .times(1)
            .returning(|_, _, csr| {
                std::fs::write(csr, "csr").unwrap();
                Ok(())
            });
        backend.expect_sign_request().times(1).returning(|_, cert| {
            std::fs::write(cert, "cert").unwrap();
            Ok(())
        });

        let issuer = CertificateIssuer::new(layout.clone(), Arc::new(backend), SubjectFields::default(), false);
        let issuance = issuer.issue("nginx", "proxy.internal").await.unwrap();

        assert!(!issuance.key_created);
        assert!(issuance.cert_created);
        assert!(!issuance.verified);
        assert_eq!(std::fs::read_to_string(layout.service_key("nginx")).unwrap(), "existing");
    }

    #[tokio::test]
    async fn test_second_issue_is_unchanged() {
        let dir = TempDir::new().unwrap();
        let layout = CaLayout::new(dir.path());
        let issuer = CertificateIssuer::new(layout, Arc::new(touching_mock()), SubjectFields::default(), false);

        assert!(issuer.issue("consul", "consul.example.com").await.unwrap().outcome().is_changed());
        assert!(!issuer.issue("consul", "consul.example.com").await.unwrap().outcome().is_changed());
    }

    #[tokio::test]
    async fn test_verification_failure_keeps_certificate() {
        let dir = TempDir::new().unwrap();
        let layout = CaLayout::new(dir.path());
        let mut backend = touching_mock();
        backend
            .expect_verify_certificate()
            .with(always())
            .returning(|_| Ok(Verification::failed("error 20 at 0 depth lookup: unable to get local issuer certificate")));

        let issuer = CertificateIssuer::new(layout.clone(), Arc::new(backend), SubjectFields::default(), true);
        let err = issuer.issue("consul", "consul.example.com").await.unwrap_err();

        match err {
            SetupError::Verification { certificate, diagnostic } => {
                assert_eq!(certificate, layout.service_cert("consul"));
                assert!(diagnostic.contains("unable to get local issuer"));
            }
            other => panic!("unexpected error: {}", other),
        }
        assert!(layout.service_cert("consul").exists());
    }

    #[tokio::test]
    async fn test_native_issue_and_verify() {
        let dir = TempDir::new().unwrap();
        let layout = CaLayout::new(dir.path().join("ssl"));
        let backend = Arc::new(NativeBackend::new(layout.clone(), 3650, 365));
        let manager = CaManager::new(layout.clone(), backend, SubjectFields::default());
        manager.initialize().await.unwrap();

        let issuer = manager.issuer(true);
        let first = issuer.issue("nginx", "nginx.example.com").await.unwrap();
        assert!(first.key_created && first.cert_created && first.verified);

        let second = issuer.issue("nginx", "nginx.example.com").await.unwrap();
        assert_eq!(second.outcome(), TaskOutcome::Unchanged);
        assert!(second.verified);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(layout.service_key("nginx")).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
            let mode = std::fs::metadata(layout.service_cert("nginx")).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o666);
        }
    }

    #[tokio::test]
    async fn test_native_resigns_missing_certificate() {
        let dir = TempDir::new().unwrap();
        let layout = CaLayout::new(dir.path());
        let backend = Arc::new(NativeBackend::new(layout.clone(), 3650, 365));
        let manager = CaManager::new(layout.clone(), backend, SubjectFields::default());
        manager.initialize().await.unwrap();
        let issuer = manager.issuer(true);

        issuer.issue("consul", "consul.example.com").await.unwrap();
        let key_before = std::fs::read(layout.service_key("consul")).unwrap();
        std::fs::remove_file(layout.service_cert("consul")).unwrap();

        let again = issuer.issue("consul", "consul.example.com").await.unwrap();
        assert!(!again.key_created);
        assert!(again.cert_created);
        assert!(again.verified);
        assert_eq!(std::fs::read(layout.service_key("consul")).unwrap(), key_before);
    }
}
