//! Certificate authority bootstrap and shared issuance helper.

use trustseed_pki::CaState;
use trustseed_types::{Result, TaskOutcome};

use crate::context::TaskContext;

/// Create the root CA unless it already exists.
pub async fn create_authority(ctx: &mut TaskContext) -> Result<TaskOutcome> {
    let tx = ctx.store.transaction()?;
    let state = ctx.authority.initialize().await?;
    let outcome = tx.commit()?;
    if state == CaState::HalfInitialized {
        ctx.warn(format!(
            "certificate authority in {} is half initialized; remove it or restore the missing root file",
            ctx.config.ca_path().display()
        ));
    }
    Ok(TaskOutcome::from_changed(state == CaState::Created).merge(outcome))
}

/// Issue (or reuse and verify) the certificate for `service`.
pub(crate) async fn issue_for(ctx: &mut TaskContext, service: &str) -> Result<TaskOutcome> {
    let common_name = ctx.config.common_name_for(service);
    let tx = ctx.store.transaction()?;
    let issuance = ctx.issuer.issue(service, &common_name).await?;
    let outcome = tx.commit()?;
    Ok(issuance.outcome().merge(outcome))
}
