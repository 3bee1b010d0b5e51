//! Cluster scheduler.
//!
//! Mesos authenticates frameworks and followers against the principal/secret
//! list in [`CREDENTIALS`]. Entries are only ever appended.

use trustseed_secrets::{CredentialEntry, Secrets};
use trustseed_types::{bail, Result, TaskOutcome};

use crate::context::{ensure_password, TaskContext};
use crate::marathon;

/// Principal/secret list consumed by the Mesos masters.
pub const CREDENTIALS: &str = "mesos_credentials";
/// Whether frameworks must authenticate.
pub const AUTHENTICATE_FRAMEWORKS: &str = "mesos_authenticate_frameworks";
/// Follower principal.
pub const FOLLOWER_PRINCIPAL: &str = "mesos_follower_principal";
/// Follower secret.
pub const FOLLOWER_SECRET: &str = "mesos_follower_secret";
/// Whether followers must authenticate.
pub const AUTHENTICATE_FOLLOWERS: &str = "mesos_authenticate_followers";

const DEFAULT_FOLLOWER_PRINCIPAL: &str = "follower";

/// Register Marathon's framework credentials, when Marathon has any.
pub fn framework_credentials(ctx: &mut TaskContext) -> Result<TaskOutcome> {
    ctx.store.transact(register_framework)
}

/// Make sure the follower principal and secret exist and are registered.
pub fn follower_credentials(ctx: &mut TaskContext) -> Result<TaskOutcome> {
    let TaskContext { store, generator, config, .. } = ctx;
    store.transact(|secrets| {
        secrets.ensure_default(FOLLOWER_PRINCIPAL, DEFAULT_FOLLOWER_PRINCIPAL);
        ensure_password(secrets, generator, FOLLOWER_SECRET, config.password_length);

        if let Some(entry) = entry_for(secrets, FOLLOWER_PRINCIPAL, FOLLOWER_SECRET)? {
            secrets.append_credential(CREDENTIALS, entry)?;
        }
        secrets.set(AUTHENTICATE_FOLLOWERS, true);
        Ok(())
    })
}

fn register_framework(secrets: &mut Secrets) -> Result<()> {
    let registered = match entry_for(secrets, marathon::PRINCIPAL, marathon::SECRET)? {
        Some(entry) => {
            secrets.append_credential(CREDENTIALS, entry.clone())?;
            secrets.has_credential(CREDENTIALS, &entry)?
        }
        None => {
            tracing::debug!("No marathon framework credentials to register");
            false
        }
    };
    secrets.set(AUTHENTICATE_FRAMEWORKS, registered);
    Ok(())
}

/// Entry built from two stored keys. Absent keys mean no entry.
fn entry_for(secrets: &Secrets, principal_key: &str, secret_key: &str) -> Result<Option<CredentialEntry>> {
    if !secrets.contains(principal_key) || !secrets.contains(secret_key) {
        return Ok(None);
    }
    let (Some(principal), Some(secret)) = (secrets.get_str(principal_key), secrets.get_str(secret_key)) else {
        bail!(
            Config,
            "{} and {} must be strings to register in {}",
            principal_key,
            secret_key,
            CREDENTIALS
        );
    };
    Ok(Some(CredentialEntry::new(principal, secret)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use trustseed_types::SetupError;

    #[test]
    fn test_framework_without_marathon_disables_auth() {
        let mut secrets = Secrets::new();
        register_framework(&mut secrets).unwrap();

        assert_eq!(secrets.get_bool(AUTHENTICATE_FRAMEWORKS), Some(false));
        assert!(secrets.credentials(CREDENTIALS).unwrap().is_empty());
    }

    #[test]
    fn test_framework_registration_is_unique() {
        let mut secrets = Secrets::new();
        secrets.set(marathon::PRINCIPAL, "marathon");
        secrets.set(marathon::SECRET, "s3cret");

        for _ in 0..3 {
            register_framework(&mut secrets).unwrap();
        }

        assert_eq!(
            secrets.credentials(CREDENTIALS).unwrap(),
            vec![CredentialEntry::new("marathon", "s3cret")]
        );
        assert_eq!(secrets.get_bool(AUTHENTICATE_FRAMEWORKS), Some(true));
    }

    #[test]
    fn test_framework_keeps_existing_entries() {
        let mut secrets = Secrets::new();
        secrets
            .append_credential(CREDENTIALS, CredentialEntry::new("chronos", "other"))
            .unwrap();
        secrets.set(marathon::PRINCIPAL, "marathon");
        secrets.set(marathon::SECRET, "s3cret");

        register_framework(&mut secrets).unwrap();

        let entries = secrets.credentials(CREDENTIALS).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].principal, "chronos");
    }

    #[test]
    fn test_framework_with_non_string_secret_is_config_error() {
        let mut secrets = Secrets::new();
        secrets.set(marathon::PRINCIPAL, "marathon");
        secrets.set(marathon::SECRET, 42);

        match register_framework(&mut secrets) {
            Err(SetupError::Config(msg)) => assert!(msg.contains(marathon::SECRET)),
            other => panic!("unexpected: {:?}", other),
        }
        assert!(!secrets.contains(CREDENTIALS));
        assert!(!secrets.contains(AUTHENTICATE_FRAMEWORKS));
    }

    #[test]
    fn test_framework_registers_beside_incomplete_entry() {
        let mut secrets = Secrets::new();
        secrets.set(CREDENTIALS, serde_json::json!([{"principal": "legacy"}]));
        secrets.set(marathon::PRINCIPAL, "marathon");
        secrets.set(marathon::SECRET, "s3cret");

        register_framework(&mut secrets).unwrap();

        assert_eq!(secrets.get_bool(AUTHENTICATE_FRAMEWORKS), Some(true));
        assert_eq!(secrets.get(CREDENTIALS).unwrap().as_array().unwrap().len(), 2);
    }
}
