//! Host registry and the session factory built on it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::defaults::TransportConfig;
use crate::error::{Error, Result};
use crate::local::LocalSession;
use crate::session::{Session, SessionFactory};
use crate::ssh::{SshClient, SshSession};

/// How a host alias is reached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostTransport {
    #[default]
    Ssh,
    /// The machine running robodeploy; steps act on the local filesystem.
    Local,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostConfig {
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub user: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_file: Option<String>,
    #[serde(default)]
    pub transport: HostTransport,
}

fn default_port() -> u16 {
    22
}

impl HostConfig {
    pub fn ssh(host: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            user: user.into(),
            port: default_port(),
            identity_file: None,
            transport: HostTransport::Ssh,
        }
    }

    pub fn local() -> Self {
        Self {
            host: String::new(),
            user: String::new(),
            port: default_port(),
            identity_file: None,
            transport: HostTransport::Local,
        }
    }

    pub fn is_local(&self) -> bool {
        self.transport == HostTransport::Local
    }
}

/// Opens ssh or local sessions according to the host registry.
pub struct HostSessionFactory {
    hosts: BTreeMap<String, HostConfig>,
    transport: TransportConfig,
}

impl HostSessionFactory {
    pub fn new(hosts: BTreeMap<String, HostConfig>, transport: TransportConfig) -> Self {
        Self { hosts, transport }
    }

    pub fn host(&self, host_alias: &str) -> Result<&HostConfig> {
        self.hosts.get(host_alias).ok_or_else(|| {
            Error::host_not_found(host_alias, self.hosts.keys().cloned().collect())
        })
    }
}

impl SessionFactory for HostSessionFactory {
    fn open(&self, host_alias: &str) -> Result<Box<dyn Session>> {
        let host = self.host(host_alias)?;

        match host.transport {
            HostTransport::Local => {
                log_status!("local", "Using local filesystem for '{}'", host_alias);
                Ok(Box::new(LocalSession::new(host_alias)))
            }
            HostTransport::Ssh => {
                let client = SshClient::from_host(host_alias, host, &self.transport)?;
                Ok(Box::new(SshSession::open(client)?))
            }
        }
    }
}
