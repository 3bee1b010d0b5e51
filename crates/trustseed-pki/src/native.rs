//! In-process certificate backend built on rcgen and x509-parser.
//!
//! Keeps the same `serial`/`index.txt` bookkeeping as `openssl ca`, so a CA
//! directory can move between backends.

use async_trait::async_trait;
use chrono::Utc;
use rcgen::{
    string::Ia5String, BasicConstraints, CertificateParams, CertificateSigningRequestParams, DistinguishedName,
    DnType, DnValue, ExtendedKeyUsagePurpose, IsCa, Issuer, KeyPair, KeyUsagePurpose, SanType, SerialNumber,
};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use time::OffsetDateTime;
use trustseed_core::time::index_timestamp;
use trustseed_core::util::write_private;
use trustseed_types::{Result, SetupError};
use x509_parser::pem::parse_x509_pem;

use crate::backend::{CertificateBackend, Subject, Verification};
use crate::layout::CaLayout;
use crate::INITIAL_SERIAL;

/// PKCS#9 emailAddress attribute.
const EMAIL_ADDRESS_OID: [u64; 7] = [1, 2, 840, 113549, 1, 9, 1];

/// Serial number given to the self-signed root.
const ROOT_SERIAL: u64 = 1;

/// rcgen/x509-parser backend.
#[derive(Debug, Clone)]
pub struct NativeBackend {
    layout: CaLayout,
    ca_validity_days: u32,
    cert_validity_days: u32,
}

impl NativeBackend {
    /// Backend for `layout`.
    pub fn new(layout: CaLayout, ca_validity_days: u32, cert_validity_days: u32) -> Self {
        Self {
            layout,
            ca_validity_days,
            cert_validity_days,
        }
    }

    fn load_root_key(&self) -> Result<KeyPair> {
        let pem = std::fs::read_to_string(self.layout.root_key())?;
        KeyPair::from_pem(&pem).map_err(|e| certificate_error("failed to load CA key", e))
    }

    fn next_serial(&self) -> Result<u64> {
        let path = self.layout.serial();
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => INITIAL_SERIAL.to_string(),
            Err(e) => return Err(e.into()),
        };
        u64::from_str_radix(text.trim(), 16)
            .map_err(|e| SetupError::Certificate(format!("serial file {} is not hex: {}", path.display(), e)))
    }

    fn record_issue(&self, serial: u64, subject: &str) -> Result<()> {
        std::fs::write(self.layout.serial(), format!("{}\n", format_serial(serial + 1)))?;

        let expires = Utc::now() + chrono::Duration::days(i64::from(self.cert_validity_days));
        let mut index = OpenOptions::new().create(true).append(true).open(self.layout.index())?;
        writeln!(
            index,
            "V\t{}\t\t{}\tunknown\t{}",
            index_timestamp(expires),
            format_serial(serial),
            subject
        )?;
        Ok(())
    }

    fn validity(&self, days: u32, params: &mut CertificateParams) {
        let now = OffsetDateTime::now_utc();
        params.not_before = now - time::Duration::minutes(5);
        params.not_after = now + time::Duration::days(i64::from(days));
    }
}

#[async_trait]
impl CertificateBackend for NativeBackend {
    fn name(&self) -> &'static str {
        "native"
    }

    async fn create_root(&self, subject: &Subject, key: &Path, cert: &Path) -> Result<()> {
        let key_pair = KeyPair::generate().map_err(|e| certificate_error("failed to generate CA key", e))?;

        let mut params = CertificateParams::default();
        params.distinguished_name = distinguished_name(subject);
        params.serial_number = Some(SerialNumber::from(ROOT_SERIAL));
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params.key_usages = vec![
            KeyUsagePurpose::KeyCertSign,
            KeyUsagePurpose::CrlSign,
            KeyUsagePurpose::DigitalSignature,
        ];
        self.validity(self.ca_validity_days, &mut params);

        let certificate = params
            .self_signed(&key_pair)
            .map_err(|e| certificate_error("failed to create CA certificate", e))?;

        write_private(key, key_pair.serialize_pem().as_bytes())?;
        std::fs::write(cert, certificate.pem())?;
        Ok(())
    }

    async fn generate_key(&self, key: &Path) -> Result<()> {
        let key_pair = KeyPair::generate().map_err(|e| certificate_error("failed to generate key", e))?;
        write_private(key, key_pair.serialize_pem().as_bytes())?;
        Ok(())
    }

    async fn create_signing_request(&self, key: &Path, subject: &Subject, csr: &Path) -> Result<()> {
        let pem = std::fs::read_to_string(key)?;
        let key_pair = KeyPair::from_pem(&pem).map_err(|e| certificate_error("failed to load key", e))?;

        let mut params = CertificateParams::default();
        params.distinguished_name = distinguished_name(subject);

        let request = params
            .serialize_request(&key_pair)
            .map_err(|e| certificate_error("failed to create signing request", e))?;
        let request_pem = request
            .pem()
            .map_err(|e| certificate_error("failed to encode signing request", e))?;

        std::fs::write(csr, request_pem)?;
        Ok(())
    }

    async fn sign_request(&self, csr: &Path, cert: &Path) -> Result<()> {
        let csr_pem = std::fs::read_to_string(csr)?;
        let mut request = CertificateSigningRequestParams::from_pem(&csr_pem)
            .map_err(|e| certificate_error("failed to parse signing request", e))?;

        let serial = self.next_serial()?;
        request.params.serial_number = Some(SerialNumber::from(serial));
        request.params.is_ca = IsCa::NoCa;
        request.params.key_usages = vec![KeyUsagePurpose::DigitalSignature, KeyUsagePurpose::KeyEncipherment];
        request.params.extended_key_usages = vec![
            ExtendedKeyUsagePurpose::ServerAuth,
            ExtendedKeyUsagePurpose::ClientAuth,
        ];
        let common_name = request
            .params
            .distinguished_name
            .get(&DnType::CommonName)
            .and_then(dn_value)
            .map(str::to_string);
        if let Some(dns_name) = common_name.and_then(|cn| Ia5String::try_from(cn).ok()) {
            request.params.subject_alt_names = vec![SanType::DnsName(dns_name)];
        }
        let subject = openssl_subject(&request.params.distinguished_name);
        self.validity(self.cert_validity_days, &mut request.params);

        let ca_cert_pem = std::fs::read_to_string(self.layout.root_cert())?;
        let ca_key = self.load_root_key()?;
        let issuer = Issuer::from_ca_cert_pem(&ca_cert_pem, &ca_key)
            .map_err(|e| certificate_error("failed to load CA certificate", e))?;

        let signed = request
            .signed_by(&issuer)
            .map_err(|e| certificate_error("failed to sign certificate", e))?;

        std::fs::write(cert, signed.pem())?;
        self.record_issue(serial, &subject)?;
        tracing::debug!("Signed {} with serial {}", cert.display(), format_serial(serial));
        Ok(())
    }

    async fn verify_certificate(&self, cert: &Path) -> Result<Verification> {
        let ca_pem = std::fs::read(self.layout.root_cert())?;
        let cert_pem = std::fs::read(cert)?;

        let (_, ca_block) = parse_x509_pem(&ca_pem)
            .map_err(|e| SetupError::Certificate(format!("failed to read CA certificate: {}", e)))?;
        let ca = ca_block
            .parse_x509()
            .map_err(|e| SetupError::Certificate(format!("failed to parse CA certificate: {}", e)))?;

        let (_, cert_block) = match parse_x509_pem(&cert_pem) {
            Ok(parsed) => parsed,
            Err(e) => return Ok(Verification::failed(format!("{}: not a PEM certificate: {}", cert.display(), e))),
        };
        let leaf = match cert_block.parse_x509() {
            Ok(leaf) => leaf,
            Err(e) => return Ok(Verification::failed(format!("{}: unable to parse certificate: {}", cert.display(), e))),
        };

        if leaf.issuer().as_raw() != ca.subject().as_raw() {
            return Ok(Verification::failed(format!(
                "{}: issuer '{}' does not match CA subject '{}'",
                cert.display(),
                leaf.issuer(),
                ca.subject()
            )));
        }

        if let Err(e) = leaf.verify_signature(Some(ca.public_key())) {
            return Ok(Verification::failed(format!(
                "{}: certificate signature failure: {}",
                cert.display(),
                e
            )));
        }

        if !leaf.validity().is_valid() {
            return Ok(Verification::failed(format!(
                "{}: certificate is not within its validity period",
                cert.display()
            )));
        }

        Ok(Verification::ok(format!("{}: OK", cert.display())))
    }
}

fn dn_value(value: &DnValue) -> Option<&str> {
    match value {
        DnValue::Utf8String(s) => Some(s.as_str()),
        DnValue::PrintableString(s) => Some(s.as_str()),
        DnValue::Ia5String(s) => Some(s.as_str()),
        _ => None,
    }
}

fn dn_short_name(dn_type: &DnType) -> String {
    match dn_type {
        DnType::CountryName => "C".to_string(),
        DnType::StateOrProvinceName => "ST".to_string(),
        DnType::LocalityName => "L".to_string(),
        DnType::OrganizationName => "O".to_string(),
        DnType::OrganizationalUnitName => "OU".to_string(),
        DnType::CommonName => "CN".to_string(),
        DnType::CustomDnType(oid) if oid.as_slice() == EMAIL_ADDRESS_OID => "emailAddress".to_string(),
        DnType::CustomDnType(oid) => oid.iter().map(u64::to_string).collect::<Vec<_>>().join("."),
        other => format!("{:?}", other),
    }
}

/// Subject of a parsed request in the `/K=V` form `index.txt` uses.
fn openssl_subject(dn: &DistinguishedName) -> String {
    dn.iter()
        .map(|(dn_type, value)| format!("/{}={}", dn_short_name(dn_type), dn_value(value).unwrap_or("?")))
        .collect()
}

fn distinguished_name(subject: &Subject) -> DistinguishedName {
    let mut dn = DistinguishedName::new();
    for (name, value) in subject.attributes() {
        let dn_type = match name {
            "C" => DnType::CountryName,
            "ST" => DnType::StateOrProvinceName,
            "L" => DnType::LocalityName,
            "O" => DnType::OrganizationName,
            "OU" => DnType::OrganizationalUnitName,
            "CN" => DnType::CommonName,
            _ => DnType::CustomDnType(EMAIL_ADDRESS_OID.to_vec()),
        };
        dn.push(dn_type, DnValue::Utf8String(value.to_string()));
    }
    dn
}

fn format_serial(serial: u64) -> String {
    let hex = format!("{:X}", serial);
    if hex.len() % 2 == 1 {
        format!("0{}", hex)
    } else {
        hex
    }
}

fn certificate_error(context: &str, error: rcgen::Error) -> SetupError {
    SetupError::Certificate(format!("{}: {}", context, error))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use trustseed_types::SubjectFields;

    async fn root_in(dir: &TempDir) -> (CaLayout, NativeBackend) {
        let layout = CaLayout::new(dir.path());
        std::fs::create_dir_all(layout.private_dir()).unwrap();
        std::fs::create_dir_all(layout.certs_dir()).unwrap();
        std::fs::write(layout.serial(), "1000\n").unwrap();
        std::fs::write(layout.index(), "").unwrap();

        let backend = NativeBackend::new(layout.clone(), 3650, 365);
        let subject = Subject::new(&SubjectFields::default(), "trustseed Root CA");
        backend
            .create_root(&subject, &layout.root_key(), &layout.root_cert())
            .await
            .unwrap();
        (layout, backend)
    }

    async fn issue(layout: &CaLayout, backend: &NativeBackend, service: &str) {
        let subject = Subject::new(&SubjectFields::default(), format!("{}.example.com", service));
        backend.generate_key(&layout.service_key(service)).await.unwrap();
        backend
            .create_signing_request(&layout.service_key(service), &subject, &layout.service_csr(service))
            .await
            .unwrap();
        backend
            .sign_request(&layout.service_csr(service), &layout.service_cert(service))
            .await
            .unwrap();
    }

    #[test]
    fn test_format_serial_is_even_length() {
        assert_eq!(format_serial(0x1000), "1000");
        assert_eq!(format_serial(0x100), "0100");
        assert_eq!(format_serial(0xABCDE), "0ABCDE");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_keys_are_created_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let (layout, backend) = root_in(&dir).await;
        backend.generate_key(&layout.service_key("consul")).await.unwrap();

        for key in [layout.root_key(), layout.service_key("consul")] {
            let mode = std::fs::metadata(&key).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600, "{}", key.display());
        }
    }

    #[tokio::test]
    async fn test_signed_certificate_chains_to_root() {
        let dir = TempDir::new().unwrap();
        let (layout, backend) = root_in(&dir).await;
        issue(&layout, &backend, "consul").await;

        let verification = backend.verify_certificate(&layout.service_cert("consul")).await.unwrap();
        assert!(verification.verified, "{}", verification.diagnostic);

        let cert_pem = std::fs::read(layout.service_cert("consul")).unwrap();
        let (_, block) = parse_x509_pem(&cert_pem).unwrap();
        let leaf = block.parse_x509().unwrap();
        let cn = leaf.subject().iter_common_name().next().unwrap().as_str().unwrap().to_string();
        assert_eq!(cn, "consul.example.com");
        assert!(leaf.issuer().to_string().contains("trustseed Root CA"));
    }

    #[tokio::test]
    async fn test_signing_advances_serial_and_index() {
        let dir = TempDir::new().unwrap();
        let (layout, backend) = root_in(&dir).await;
        issue(&layout, &backend, "consul").await;
        issue(&layout, &backend, "nginx").await;

        assert_eq!(std::fs::read_to_string(layout.serial()).unwrap().trim(), "1002");

        let index = std::fs::read_to_string(layout.index()).unwrap();
        let lines: Vec<&str> = index.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("V\t"));
        assert!(lines[0].contains("\t1000\t"));
        assert!(lines[1].contains("CN=nginx.example.com"));
    }

    #[tokio::test]
    async fn test_certificate_from_other_ca_fails_verification() {
        let ours = TempDir::new().unwrap();
        let theirs = TempDir::new().unwrap();
        let (our_layout, our_backend) = root_in(&ours).await;
        let (their_layout, their_backend) = root_in(&theirs).await;

        issue(&their_layout, &their_backend, "nginx").await;

        let verification = our_backend
            .verify_certificate(&their_layout.service_cert("nginx"))
            .await
            .unwrap();
        assert!(!verification.verified);
        assert!(verification.diagnostic.contains("signature"), "{}", verification.diagnostic);
        assert!(our_layout.root_cert().exists());
    }

    #[tokio::test]
    async fn test_garbage_certificate_fails_verification() {
        let dir = TempDir::new().unwrap();
        let (layout, backend) = root_in(&dir).await;
        std::fs::write(layout.service_cert("nginx"), "not a certificate").unwrap();

        let verification = backend.verify_certificate(&layout.service_cert("nginx")).await.unwrap();
        assert!(!verification.verified);
    }
}
