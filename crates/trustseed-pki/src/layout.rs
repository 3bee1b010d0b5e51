//! On-disk layout of the certificate authority.

use std::path::{Path, PathBuf};

/// Paths inside a CA directory.
///
/// ```text
/// <root>/
///   cacert.pem           root certificate
///   serial               next serial number (hex)
///   index.txt            issued certificate ledger
///   openssl.cnf          openssl configuration (operator supplied)
///   private/cakey.pem    root key
///   private/<svc>.key.pem
///   certs/<svc>.csr.pem
///   certs/<svc>.cert.pem
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaLayout {
    root: PathBuf,
}

impl CaLayout {
    /// Layout rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// CA directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding private keys.
    pub fn private_dir(&self) -> PathBuf {
        self.root.join("private")
    }

    /// Directory holding CSRs and certificates.
    pub fn certs_dir(&self) -> PathBuf {
        self.root.join("certs")
    }

    /// Root private key.
    pub fn root_key(&self) -> PathBuf {
        self.private_dir().join("cakey.pem")
    }

    /// Root certificate.
    pub fn root_cert(&self) -> PathBuf {
        self.root.join("cacert.pem")
    }

    /// Serial counter.
    pub fn serial(&self) -> PathBuf {
        self.root.join("serial")
    }

    /// Issued certificate ledger.
    pub fn index(&self) -> PathBuf {
        self.root.join("index.txt")
    }

    /// Private key for `service`.
    pub fn service_key(&self, service: &str) -> PathBuf {
        self.private_dir().join(format!("{}.key.pem", service))
    }

    /// Signing request for `service`.
    pub fn service_csr(&self, service: &str) -> PathBuf {
        self.certs_dir().join(format!("{}.csr.pem", service))
    }

    /// Signed certificate for `service`.
    pub fn service_cert(&self, service: &str) -> PathBuf {
        self.certs_dir().join(format!("{}.cert.pem", service))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_paths() {
        let layout = CaLayout::new("/srv/ssl");
        assert_eq!(layout.service_key("consul"), PathBuf::from("/srv/ssl/private/consul.key.pem"));
        assert_eq!(layout.service_csr("consul"), PathBuf::from("/srv/ssl/certs/consul.csr.pem"));
        assert_eq!(layout.service_cert("consul"), PathBuf::from("/srv/ssl/certs/consul.cert.pem"));
        assert_eq!(layout.root_key(), PathBuf::from("/srv/ssl/private/cakey.pem"));
        assert_eq!(layout.root_cert(), PathBuf::from("/srv/ssl/cacert.pem"));
    }
}
