//! # trustseed Secrets
//!
//! Secret generation and the persisted secret store.
//!
//! - Random byte strings, alphanumeric passwords and UUID tokens drawn from
//!   an entropy source with an explicit fallback policy
//! - Username/credential digests for ZooKeeper digest authentication
//! - A JSON secret document with scoped load/mutate/commit transactions
//! - Append-only principal/secret credential lists

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod random;
pub mod store;
pub mod credentials;

pub use random::{digest, EntropySource, SecretGenerator};
pub use store::{SecretStore, Secrets, Transaction, SECURITY_ENABLED};
pub use credentials::CredentialEntry;
