//! # trustseed PKI
//!
//! The private certificate authority and per-service certificate issuance.
//!
//! Cryptographic work happens behind the [`CertificateBackend`] trait, which
//! has two implementations:
//! - [`OpensslBackend`] shells out to the `openssl` command-line tool
//! - [`NativeBackend`] generates and verifies in-process with rcgen and x509-parser
//!
//! Both leave the same on-disk [`CaLayout`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod layout;
pub mod backend;
pub mod openssl;
pub mod native;
pub mod authority;
pub mod issuer;

pub use layout::CaLayout;
pub use backend::{backend_for, CertificateBackend, Subject, Verification};
pub use openssl::OpensslBackend;
pub use native::NativeBackend;
pub use authority::{CaManager, CaState};
pub use issuer::{CertificateIssuer, Issuance};

/// Mode for private keys: owner read/write.
pub const KEY_MODE: u32 = 0o600;

/// Mode for issued certificates: read/write for everyone.
pub const CERT_MODE: u32 = 0o666;

/// Starting value written to a fresh `serial` file.
pub const INITIAL_SERIAL: &str = "1000";
