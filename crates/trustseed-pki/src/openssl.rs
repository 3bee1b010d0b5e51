//! Certificate backend that shells out to the `openssl` command-line tool.
//!
//! Signing goes through `openssl ca`, so the CA directory needs an
//! `openssl.cnf` whose `[ CA_default ]` section points at this layout
//! (`dir = .`; commands run from the CA directory). trustseed never writes
//! that file; `share/openssl.cnf` is a working starting point.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use trustseed_core::util::process::{run_async, run_async_in, ProcessOutput};
use trustseed_core::util::write_private;
use trustseed_types::{Result, SetupError};

use crate::backend::{CertificateBackend, Subject, Verification};
use crate::layout::CaLayout;

const OPENSSL: &str = "openssl";
const ROOT_KEY_BITS: &str = "rsa:4096";
const SERVICE_KEY_BITS: &str = "2048";

/// `openssl` CLI backend.
#[derive(Debug, Clone)]
pub struct OpensslBackend {
    layout: CaLayout,
    config: PathBuf,
    ca_validity_days: u32,
    cert_validity_days: u32,
}

impl OpensslBackend {
    /// Backend for `layout` using the openssl configuration at `config`.
    pub fn new(layout: CaLayout, config: impl Into<PathBuf>, ca_validity_days: u32, cert_validity_days: u32) -> Self {
        Self {
            layout,
            config: config.into(),
            ca_validity_days,
            cert_validity_days,
        }
    }

    fn require_config(&self) -> Result<()> {
        if self.config.is_file() {
            return Ok(());
        }
        Err(SetupError::Config(format!(
            "openssl configuration {} not found; copy share/openssl.cnf there or pass --openssl-config",
            self.config.display()
        )))
    }

    fn root_args(&self, subject: &Subject, key: &Path, cert: &Path) -> Vec<String> {
        vec![
            "req".to_string(),
            "-x509".to_string(),
            "-new".to_string(),
            "-nodes".to_string(),
            "-newkey".to_string(),
            ROOT_KEY_BITS.to_string(),
            "-sha256".to_string(),
            "-days".to_string(),
            self.ca_validity_days.to_string(),
            "-config".to_string(),
            path_arg(&self.config),
            "-extensions".to_string(),
            "v3_ca".to_string(),
            "-subj".to_string(),
            subject.to_openssl_subj(),
            "-keyout".to_string(),
            path_arg(key),
            "-out".to_string(),
            path_arg(cert),
        ]
    }

    fn key_args(&self, key: &Path) -> Vec<String> {
        vec![
            "genrsa".to_string(),
            "-out".to_string(),
            path_arg(key),
            SERVICE_KEY_BITS.to_string(),
        ]
    }

    fn request_args(&self, key: &Path, subject: &Subject, csr: &Path) -> Vec<String> {
        vec![
            "req".to_string(),
            "-new".to_string(),
            "-sha256".to_string(),
            "-config".to_string(),
            path_arg(&self.config),
            "-key".to_string(),
            path_arg(key),
            "-subj".to_string(),
            subject.to_openssl_subj(),
            "-out".to_string(),
            path_arg(csr),
        ]
    }

    fn sign_args(&self, csr: &Path, cert: &Path) -> Vec<String> {
        vec![
            "ca".to_string(),
            "-batch".to_string(),
            "-notext".to_string(),
            "-config".to_string(),
            path_arg(&self.config),
            "-days".to_string(),
            self.cert_validity_days.to_string(),
            "-keyfile".to_string(),
            path_arg(&self.layout.root_key()),
            "-cert".to_string(),
            path_arg(&self.layout.root_cert()),
            "-in".to_string(),
            path_arg(csr),
            "-out".to_string(),
            path_arg(cert),
        ]
    }

    fn verify_args(&self, cert: &Path) -> Vec<String> {
        vec![
            "verify".to_string(),
            "-CAfile".to_string(),
            path_arg(&self.layout.root_cert()),
            path_arg(cert),
        ]
    }
}

/// Run an openssl command that writes `key`, with the file created 0600 first.
///
/// openssl truncates the existing file and keeps its mode. A failed command
/// removes the placeholder so the key is generated again next run.
async fn write_key_with(
    key: &Path,
    command: impl std::future::Future<Output = Result<ProcessOutput>>,
) -> Result<()> {
    write_private(key, b"")?;
    match command.await.and_then(ProcessOutput::check) {
        Ok(_) => Ok(()),
        Err(e) => {
            let _ = std::fs::remove_file(key);
            Err(e)
        }
    }
}

#[async_trait]
impl CertificateBackend for OpensslBackend {
    fn name(&self) -> &'static str {
        "openssl"
    }

    async fn create_root(&self, subject: &Subject, key: &Path, cert: &Path) -> Result<()> {
        self.require_config()?;
        write_key_with(key, run_async(OPENSSL, &self.root_args(subject, key, cert))).await
    }

    async fn generate_key(&self, key: &Path) -> Result<()> {
        write_key_with(key, run_async(OPENSSL, &self.key_args(key))).await
    }

    async fn create_signing_request(&self, key: &Path, subject: &Subject, csr: &Path) -> Result<()> {
        self.require_config()?;
        run_async(OPENSSL, &self.request_args(key, subject, csr)).await?.check()?;
        Ok(())
    }

    async fn sign_request(&self, csr: &Path, cert: &Path) -> Result<()> {
        self.require_config()?;
        run_async_in(self.layout.root(), OPENSSL, &self.sign_args(csr, cert))
            .await?
            .check()?;
        Ok(())
    }

    async fn verify_certificate(&self, cert: &Path) -> Result<Verification> {
        let output = run_async(OPENSSL, &self.verify_args(cert)).await?;
        let diagnostic = format!("{}{}", output.stdout, output.stderr).trim().to_string();

        // Older openssl releases exit 0 even when verification fails
        if output.success() && output.stdout.trim_end().ends_with(": OK") {
            Ok(Verification::ok(diagnostic))
        } else {
            Ok(Verification::failed(diagnostic))
        }
    }
}

// `openssl ca` runs from the CA directory, so relative paths are anchored
// to our own working directory first.
fn path_arg(path: &Path) -> String {
    let path = match std::env::current_dir() {
        Ok(cwd) if path.is_relative() => cwd.join(path),
        _ => path.to_path_buf(),
    };
    path.to_string_lossy().into_owned()
}
