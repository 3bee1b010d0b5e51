//! Service discovery agent.

use trustseed_types::{Result, TaskOutcome};

use crate::certificates::issue_for;
use crate::context::TaskContext;

/// Certificate service name.
pub const SERVICE: &str = "consul";

/// Gossip encryption key, 16 random bytes base64 encoded.
pub const GOSSIP_KEY: &str = "consul_gossip_key";
/// ACL master token.
pub const ACL_MASTER_TOKEN: &str = "consul_acl_master_token";
/// ACL default policy.
pub const ACL_DEFAULT_POLICY: &str = "consul_acl_default_policy";

const GOSSIP_KEY_BYTES: usize = 16;
const DEFAULT_POLICY: &str = "allow";

/// Generate the gossip key.
pub fn gossip_key(ctx: &mut TaskContext) -> Result<TaskOutcome> {
    let TaskContext { store, generator, .. } = ctx;
    store.transact(|secrets| {
        secrets.set_if_absent(GOSSIP_KEY, || generator.random_bytes(GOSSIP_KEY_BYTES));
        Ok(())
    })
}

/// Generate the ACL master token.
pub fn master_token(ctx: &mut TaskContext) -> Result<TaskOutcome> {
    let TaskContext { store, generator, .. } = ctx;
    store.transact(|secrets| {
        secrets.set_if_absent(ACL_MASTER_TOKEN, || generator.token());
        Ok(())
    })
}

/// Issue the agent certificate.
pub async fn certificate(ctx: &mut TaskContext) -> Result<TaskOutcome> {
    issue_for(ctx, SERVICE).await
}

/// Default the ACL policy to `allow`.
pub fn default_policy(ctx: &mut TaskContext) -> Result<TaskOutcome> {
    ctx.store.transact(|secrets| {
        secrets.ensure_default(ACL_DEFAULT_POLICY, DEFAULT_POLICY);
        Ok(())
    })
}
