//! Command-line flags and how they layer over the config file.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use trustseed_core::config::Config;
use trustseed_core::util::expand_path;
use trustseed_types::{BackendKind, EntropyPolicy, LogLevel, SetupConfig};

#[derive(Parser, Debug)]
#[command(name = "trustseed")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Bootstrap the certificate authority and secrets for a Mesos/Consul/ZooKeeper cluster")]
#[command(long_about = "Creates a private certificate authority, issues service certificates and \
generates every shared secret the cluster needs. Existing material is never overwritten, so the \
command is safe to run repeatedly.")]
pub struct Cli {
    /// YAML configuration file
    #[arg(long, env = "TRUSTSEED_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory holding the secret document and CA
    #[arg(long, env = "TRUSTSEED_STATE_DIR")]
    pub state_dir: Option<PathBuf>,

    /// Secret document, relative to the state directory
    #[arg(long, env = "TRUSTSEED_SECRETS_FILE")]
    pub secrets_file: Option<PathBuf>,

    /// CA directory, relative to the state directory
    #[arg(long, env = "TRUSTSEED_CA_DIR")]
    pub ca_dir: Option<PathBuf>,

    /// openssl configuration used by the openssl backend [default: <ca-dir>/openssl.cnf]
    #[arg(long, env = "TRUSTSEED_OPENSSL_CONFIG")]
    pub openssl_config: Option<PathBuf>,

    /// Certificate subject: country (two letters)
    #[arg(long, env = "TRUSTSEED_COUNTRY")]
    pub country: Option<String>,

    /// Certificate subject: state or province
    #[arg(long, env = "TRUSTSEED_STATE")]
    pub state: Option<String>,

    /// Certificate subject: locality
    #[arg(long, env = "TRUSTSEED_LOCALITY")]
    pub locality: Option<String>,

    /// Certificate subject: organization
    #[arg(long, env = "TRUSTSEED_ORGANIZATION")]
    pub organization: Option<String>,

    /// Certificate subject: organizational unit
    #[arg(long, env = "TRUSTSEED_UNIT")]
    pub unit: Option<String>,

    /// Certificate subject: contact email
    #[arg(long, env = "TRUSTSEED_EMAIL")]
    pub email: Option<String>,

    /// Common name for the Consul certificate [default: consul.example.com]
    #[arg(long, env = "TRUSTSEED_CONSUL_COMMON_NAME")]
    pub consul_common_name: Option<String>,

    /// Common name for the Nginx certificate [default: nginx.example.com]
    #[arg(long, env = "TRUSTSEED_NGINX_COMMON_NAME")]
    pub nginx_common_name: Option<String>,

    /// Do not verify issued certificates against the CA
    #[arg(long, env = "TRUSTSEED_SKIP_VERIFICATION")]
    pub skip_verification: bool,

    /// What to do when the OS entropy source is unavailable (strict, best-effort)
    #[arg(long, env = "TRUSTSEED_ENTROPY")]
    pub entropy: Option<EntropyPolicy>,

    /// Certificate backend (openssl, native)
    #[arg(long, env = "TRUSTSEED_BACKEND")]
    pub backend: Option<BackendKind>,

    /// Length of generated passwords
    #[arg(long, env = "TRUSTSEED_PASSWORD_LENGTH")]
    pub password_length: Option<usize>,

    /// Lifetime of the root certificate in days
    #[arg(long, env = "TRUSTSEED_CA_VALIDITY_DAYS")]
    pub ca_validity_days: Option<u32>,

    /// Lifetime of issued certificates in days
    #[arg(long, env = "TRUSTSEED_CERT_VALIDITY_DAYS")]
    pub cert_validity_days: Option<u32>,

    /// Also write debug logs to this file
    #[arg(long, env = "TRUSTSEED_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Print the components and their tasks, then exit
    #[arg(long)]
    pub list_tasks: bool,

    /// More log output (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Less log output (repeat for less)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub quiet: u8,
}

impl Cli {
    /// Console log level from `-v`/`-q`.
    pub fn log_level(&self) -> LogLevel {
        LogLevel::from_verbosity(self.verbose, self.quiet)
    }

    /// Merge defaults, the config file and these flags.
    pub fn setup_config(&self) -> Result<SetupConfig> {
        let config_path = self.config.as_ref().map(expand_path);
        let mut config = Config::load(config_path.as_ref())?;

        config.set_opt("state_dir", self.state_dir.as_ref().map(expand_path))?;
        config.set_opt("secrets_file", self.secrets_file.as_ref())?;
        config.set_opt("ca_dir", self.ca_dir.as_ref())?;
        config.set_opt("openssl_config", self.openssl_config.as_ref().map(expand_path))?;

        config.set_opt("subject.country", self.country.as_ref())?;
        config.set_opt("subject.state", self.state.as_ref())?;
        config.set_opt("subject.locality", self.locality.as_ref())?;
        config.set_opt("subject.organization", self.organization.as_ref())?;
        config.set_opt("subject.unit", self.unit.as_ref())?;
        config.set_opt("subject.email", self.email.as_ref())?;

        config.set_opt("common_names.consul", self.consul_common_name.as_ref())?;
        config.set_opt("common_names.nginx", self.nginx_common_name.as_ref())?;

        config.set_opt("skip_verification", self.skip_verification.then_some(true))?;
        config.set_opt("entropy", self.entropy)?;
        config.set_opt("backend", self.backend)?;
        config.set_opt("password_length", self.password_length)?;
        config.set_opt("ca_validity_days", self.ca_validity_days)?;
        config.set_opt("cert_validity_days", self.cert_validity_days)?;

        let resolved = config.resolve().with_context(|| match config.file_path() {
            Some(path) => format!("Invalid configuration (file {})", path.display()),
            None => "Invalid configuration".to_string(),
        })?;
        tracing::debug!("Resolved configuration: {:?}", resolved);
        Ok(resolved)
    }
}
