//! Scheduler framework.

use trustseed_types::{Result, TaskOutcome};

use crate::context::{ensure_password, TaskContext};

/// Framework principal used to authenticate with Mesos.
pub const PRINCIPAL: &str = "marathon_principal";
/// Framework secret used to authenticate with Mesos.
pub const SECRET: &str = "marathon_secret";
/// HTTP basic-auth credentials, `admin:<password>`.
pub const HTTP_CREDENTIALS: &str = "marathon_http_credentials";

const DEFAULT_PRINCIPAL: &str = "marathon";
const HTTP_USER: &str = "admin";

/// Make sure the framework principal and secret exist.
pub fn framework_secret(ctx: &mut TaskContext) -> Result<TaskOutcome> {
    let TaskContext { store, generator, config, .. } = ctx;
    store.transact(|secrets| {
        secrets.ensure_default(PRINCIPAL, DEFAULT_PRINCIPAL);
        ensure_password(secrets, generator, SECRET, config.password_length);
        Ok(())
    })
}

/// Generate the HTTP credentials.
pub fn http_credentials(ctx: &mut TaskContext) -> Result<TaskOutcome> {
    let TaskContext { store, generator, config, .. } = ctx;
    store.transact(|secrets| {
        secrets.set_if_absent(HTTP_CREDENTIALS, || {
            format!("{}:{}", HTTP_USER, generator.password(config.password_length))
        });
        Ok(())
    })
}
