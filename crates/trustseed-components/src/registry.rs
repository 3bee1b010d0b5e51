//! The component registry.
//!
//! Order matters: later components read what earlier ones wrote. Mesos
//! registers Marathon's framework credentials, so Marathon must run first.

use std::fmt;
use trustseed_types::{Result, TaskOutcome};

use crate::context::TaskContext;
use crate::{certificates, consul, marathon, mesos, nginx, zookeeper};

/// A service trustseed prepares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Component {
    /// Root certificate authority
    Certificates,
    /// Reverse proxy
    Nginx,
    /// Service discovery
    Consul,
    /// Scheduler framework
    Marathon,
    /// Coordination ensemble
    Zookeeper,
    /// Cluster scheduler
    Mesos,
}

const REGISTRY: [Component; 6] = [
    Component::Certificates,
    Component::Nginx,
    Component::Consul,
    Component::Marathon,
    Component::Zookeeper,
    Component::Mesos,
];

impl Component {
    /// All components in run order.
    pub fn registry() -> &'static [Component] {
        &REGISTRY
    }

    /// Lowercase component name.
    pub fn name(&self) -> &'static str {
        match self {
            Component::Certificates => "certificates",
            Component::Nginx => "nginx",
            Component::Consul => "consul",
            Component::Marathon => "marathon",
            Component::Zookeeper => "zookeeper",
            Component::Mesos => "mesos",
        }
    }

    /// Tasks in run order.
    pub fn tasks(&self) -> &'static [Task] {
        match self {
            Component::Certificates => &[Task::CertificateAuthority],
            Component::Nginx => &[Task::NginxCertificate, Task::NginxAdminPassword],
            Component::Consul => &[
                Task::ConsulGossipKey,
                Task::ConsulMasterToken,
                Task::ConsulCertificate,
                Task::ConsulDefaultPolicy,
            ],
            Component::Marathon => &[Task::MarathonFrameworkSecret, Task::MarathonHttpCredentials],
            Component::Zookeeper => &[
                Task::ZookeeperSuperUser,
                Task::ZookeeperMesosUser,
                Task::ZookeeperMarathonUser,
                Task::ZookeeperConsulTls,
            ],
            Component::Mesos => &[Task::MesosFrameworkCredentials, Task::MesosFollowerCredentials],
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One idempotent unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Task {
    /// Create the root CA
    CertificateAuthority,
    /// Issue the proxy certificate
    NginxCertificate,
    /// Proxy admin password
    NginxAdminPassword,
    /// Gossip encryption key
    ConsulGossipKey,
    /// ACL master token
    ConsulMasterToken,
    /// Issue the Consul certificate
    ConsulCertificate,
    /// ACL default policy
    ConsulDefaultPolicy,
    /// Framework principal and secret
    MarathonFrameworkSecret,
    /// HTTP basic-auth credentials
    MarathonHttpCredentials,
    /// ZooKeeper super user
    ZookeeperSuperUser,
    /// ZooKeeper user for Mesos
    ZookeeperMesosUser,
    /// ZooKeeper user for Marathon
    ZookeeperMarathonUser,
    /// ZooKeeper's Consul TLS toggles
    ZookeeperConsulTls,
    /// Register Marathon with Mesos
    MesosFrameworkCredentials,
    /// Follower principal and secret
    MesosFollowerCredentials,
}

impl Task {
    /// What the task does, as shown to the operator.
    pub fn description(&self) -> &'static str {
        match self {
            Task::CertificateAuthority => "create a certificate authority",
            Task::NginxCertificate => "create an nginx certificate",
            Task::NginxAdminPassword => "set an nginx admin password",
            Task::ConsulGossipKey => "set a gossip encryption key",
            Task::ConsulMasterToken => "set an ACL master token",
            Task::ConsulCertificate => "create a consul certificate",
            Task::ConsulDefaultPolicy => "set a default ACL policy",
            Task::MarathonFrameworkSecret => "set a marathon framework principal and secret",
            Task::MarathonHttpCredentials => "set marathon HTTP credentials",
            Task::ZookeeperSuperUser => "set a zookeeper super user",
            Task::ZookeeperMesosUser => "set a zookeeper user for mesos",
            Task::ZookeeperMarathonUser => "set a zookeeper user for marathon",
            Task::ZookeeperConsulTls => "enable TLS for zookeeper's consul agent",
            Task::MesosFrameworkCredentials => "register framework credentials with mesos",
            Task::MesosFollowerCredentials => "set mesos follower credentials",
        }
    }

    /// Run the task to completion.
    pub async fn run(&self, ctx: &mut TaskContext) -> Result<TaskOutcome> {
        match self {
            Task::CertificateAuthority => certificates::create_authority(ctx).await,
            Task::NginxCertificate => nginx::certificate(ctx).await,
            Task::NginxAdminPassword => nginx::admin_password(ctx),
            Task::ConsulGossipKey => consul::gossip_key(ctx),
            Task::ConsulMasterToken => consul::master_token(ctx),
            Task::ConsulCertificate => consul::certificate(ctx).await,
            Task::ConsulDefaultPolicy => consul::default_policy(ctx),
            Task::MarathonFrameworkSecret => marathon::framework_secret(ctx),
            Task::MarathonHttpCredentials => marathon::http_credentials(ctx),
            Task::ZookeeperSuperUser => zookeeper::super_user(ctx),
            Task::ZookeeperMesosUser => zookeeper::mesos_user(ctx),
            Task::ZookeeperMarathonUser => zookeeper::marathon_user(ctx),
            Task::ZookeeperConsulTls => zookeeper::consul_tls(ctx),
            Task::MesosFrameworkCredentials => mesos::framework_credentials(ctx),
            Task::MesosFollowerCredentials => mesos::follower_credentials(ctx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn position(component: Component) -> usize {
        Component::registry().iter().position(|c| *c == component).unwrap()
    }

    #[test]
    fn test_mesos_registered_after_marathon() {
        assert!(position(Component::Mesos) > position(Component::Marathon));
    }

    #[test]
    fn test_certificates_run_first() {
        assert_eq!(Component::registry()[0], Component::Certificates);
        assert!(position(Component::Certificates) < position(Component::Nginx));
        assert!(position(Component::Certificates) < position(Component::Consul));
    }

    #[test]
    fn test_every_task_registered_once() {
        let tasks: Vec<Task> = Component::registry().iter().flat_map(|c| c.tasks().iter().copied()).collect();
        let unique: HashSet<Task> = tasks.iter().copied().collect();
        assert_eq!(tasks.len(), unique.len());
        assert_eq!(tasks.len(), 15);
    }

    #[test]
    fn test_consul_task_order() {
        assert_eq!(
            Component::Consul.tasks(),
            &[
                Task::ConsulGossipKey,
                Task::ConsulMasterToken,
                Task::ConsulCertificate,
                Task::ConsulDefaultPolicy
            ]
        );
    }
}
