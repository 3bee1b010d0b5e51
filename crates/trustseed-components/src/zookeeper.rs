//! Coordination ensemble.
//!
//! ZooKeeper digest authentication stores `user:base64(sha1(user:secret))`
//! in its ACLs, so every user with an ACL gets a precomputed digest next to
//! its secret.

use trustseed_secrets::{digest, SecretGenerator, Secrets};
use trustseed_types::{bail, Result, TaskOutcome};

use crate::context::{ensure_password, TaskContext};

/// Super user name.
pub const SUPER_USER: &str = "zk_super_user";
/// Super user secret.
pub const SUPER_USER_SECRET: &str = "zk_super_user_secret";

/// Mesos user name.
pub const MESOS_USER: &str = "zk_mesos_user";
/// Mesos user secret.
pub const MESOS_USER_SECRET: &str = "zk_mesos_user_secret";
/// Mesos user digest.
pub const MESOS_USER_DIGEST: &str = "zk_mesos_user_secret_digest";

/// Marathon user name.
pub const MARATHON_USER: &str = "zk_marathon_user";
/// Marathon user secret.
pub const MARATHON_USER_SECRET: &str = "zk_marathon_user_secret";
/// Marathon user digest.
pub const MARATHON_USER_DIGEST: &str = "zk_marathon_user_secret_digest";

/// Whether the local Consul agent talks TLS.
pub const CONSUL_SSL: &str = "zk_consul_ssl";
/// Whether the local Consul agent verifies peers.
pub const CONSUL_SSL_VERIFY: &str = "zk_consul_ssl_verify";

/// Keys describing one ZooKeeper user.
struct ZkUser {
    user: &'static str,
    default_name: &'static str,
    secret: &'static str,
    digest: Option<&'static str>,
}

const SUPER: ZkUser = ZkUser {
    user: SUPER_USER,
    default_name: "super",
    secret: SUPER_USER_SECRET,
    digest: None,
};

const MESOS: ZkUser = ZkUser {
    user: MESOS_USER,
    default_name: "mesos",
    secret: MESOS_USER_SECRET,
    digest: Some(MESOS_USER_DIGEST),
};

const MARATHON: ZkUser = ZkUser {
    user: MARATHON_USER,
    default_name: "marathon",
    secret: MARATHON_USER_SECRET,
    digest: Some(MARATHON_USER_DIGEST),
};

/// Make sure the super user and its secret exist.
pub fn super_user(ctx: &mut TaskContext) -> Result<TaskOutcome> {
    ensure_user(ctx, &SUPER)
}

/// Make sure the Mesos user, its secret and its digest exist.
pub fn mesos_user(ctx: &mut TaskContext) -> Result<TaskOutcome> {
    ensure_user(ctx, &MESOS)
}

/// Make sure the Marathon user, its secret and its digest exist.
pub fn marathon_user(ctx: &mut TaskContext) -> Result<TaskOutcome> {
    ensure_user(ctx, &MARATHON)
}

/// Default the Consul TLS toggles.
pub fn consul_tls(ctx: &mut TaskContext) -> Result<TaskOutcome> {
    let verify = !ctx.config.skip_verification;
    ctx.store.transact(|secrets| {
        secrets.ensure_default(CONSUL_SSL, true);
        secrets.ensure_default(CONSUL_SSL_VERIFY, verify);
        Ok(())
    })
}

fn ensure_user(ctx: &mut TaskContext, zk_user: &ZkUser) -> Result<TaskOutcome> {
    let TaskContext { store, generator, config, .. } = ctx;
    store.transact(|secrets| apply_user(secrets, generator, zk_user, config.password_length))
}

fn apply_user(secrets: &mut Secrets, generator: &mut SecretGenerator, zk_user: &ZkUser, length: usize) -> Result<()> {
    secrets.ensure_default(zk_user.user, zk_user.default_name);
    let generated = ensure_password(secrets, generator, zk_user.secret, length);

    let Some(digest_key) = zk_user.digest else {
        return Ok(());
    };
    if !generated && secrets.contains(digest_key) {
        return Ok(());
    }

    let (Some(user), Some(secret)) = (secrets.get_str(zk_user.user), secrets.get_str(zk_user.secret)) else {
        bail!(
            Config,
            "{} and {} must be strings to compute {}",
            zk_user.user,
            zk_user.secret,
            digest_key
        );
    };
    let value = digest(user, secret);
    secrets.set(digest_key, value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_digest_follows_customized_user() {
        let mut secrets = Secrets::new();
        secrets.set(MESOS_USER, "scheduler");
        secrets.set(MESOS_USER_SECRET, "abc123");
        let mut generator = SecretGenerator::from_seed(7);

        apply_user(&mut secrets, &mut generator, &MESOS, 32).unwrap();

        assert_eq!(secrets.get_str(MESOS_USER), Some("scheduler"));
        assert_eq!(secrets.get_str(MESOS_USER_SECRET), Some("abc123"));
        assert_eq!(secrets.get_str(MESOS_USER_DIGEST), Some(digest("scheduler", "abc123").as_str()));
    }

    #[test]
    fn test_existing_digest_kept_when_secret_kept() {
        let mut secrets = Secrets::new();
        secrets.set(MESOS_USER_SECRET, "abc123");
        secrets.set(MESOS_USER_DIGEST, "precomputed");
        let mut generator = SecretGenerator::from_seed(7);

        apply_user(&mut secrets, &mut generator, &MESOS, 32).unwrap();

        assert_eq!(secrets.get_str(MESOS_USER), Some("mesos"));
        assert_eq!(secrets.get_str(MESOS_USER_DIGEST), Some("precomputed"));
    }

    #[test]
    fn test_new_secret_recomputes_stale_digest() {
        let mut secrets = Secrets::new();
        secrets.set(MARATHON_USER_DIGEST, "stale");
        let mut generator = SecretGenerator::from_seed(7);

        apply_user(&mut secrets, &mut generator, &MARATHON, 32).unwrap();

        let secret = secrets.get_str(MARATHON_USER_SECRET).unwrap().to_string();
        assert_eq!(secret.len(), 32);
        assert_eq!(secrets.get_str(MARATHON_USER_DIGEST), Some(digest("marathon", &secret).as_str()));
    }

    #[test]
    fn test_super_user_has_no_digest() {
        let mut secrets = Secrets::new();
        let mut generator = SecretGenerator::from_seed(7);

        apply_user(&mut secrets, &mut generator, &SUPER, 16).unwrap();

        assert_eq!(secrets.get_str(SUPER_USER), Some("super"));
        assert_eq!(secrets.get_str(SUPER_USER_SECRET).map(str::len), Some(16));
        assert_eq!(secrets.len(), 2);
    }

    #[test]
    fn test_non_string_user_is_rejected() {
        let mut secrets = Secrets::new();
        secrets.set(MESOS_USER, json!(42));
        let mut generator = SecretGenerator::from_seed(7);

        assert!(apply_user(&mut secrets, &mut generator, &MESOS, 32).is_err());
    }
}
