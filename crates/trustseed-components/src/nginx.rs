//! Reverse proxy.

use trustseed_types::{Result, TaskOutcome};

use crate::certificates::issue_for;
use crate::context::{ensure_password, TaskContext};

/// Certificate service name.
pub const SERVICE: &str = "nginx";

/// Admin interface password.
pub const ADMIN_PASSWORD: &str = "nginx_admin_password";

/// Issue the proxy certificate.
pub async fn certificate(ctx: &mut TaskContext) -> Result<TaskOutcome> {
    issue_for(ctx, SERVICE).await
}

/// Generate the admin password.
pub fn admin_password(ctx: &mut TaskContext) -> Result<TaskOutcome> {
    let TaskContext { store, generator, config, .. } = ctx;
    store.transact(|secrets| {
        ensure_password(secrets, generator, ADMIN_PASSWORD, config.password_length);
        Ok(())
    })
}
