use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::build::BuildConfig;
use crate::config::{RoutineConfig, TargetConfig};
use crate::hosts::HostConfig;
use crate::target::DeployStep;

/// Settings for the ssh/scp transport. Timeouts live here, never in step
/// sequencing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportConfig {
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u32,

    #[serde(default = "default_server_alive_interval")]
    pub server_alive_interval_secs: u32,

    #[serde(default = "default_server_alive_count_max")]
    pub server_alive_count_max: u32,

    /// Reuse one ssh connection for every step of a target.
    #[serde(default = "default_multiplex")]
    pub multiplex: bool,

    #[serde(default = "default_scp_flags")]
    pub scp_flags: Vec<String>,

    /// Binaries to invoke; a path or a name looked up on `PATH`.
    #[serde(default = "default_ssh_program")]
    pub ssh_program: String,

    #[serde(default = "default_scp_program")]
    pub scp_program: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout(),
            server_alive_interval_secs: default_server_alive_interval(),
            server_alive_count_max: default_server_alive_count_max(),
            multiplex: default_multiplex(),
            scp_flags: default_scp_flags(),
            ssh_program: default_ssh_program(),
            scp_program: default_scp_program(),
        }
    }
}

// =============================================================================
// Default value functions (match the reference robot lab setup)
// =============================================================================

fn default_connect_timeout() -> u32 {
    10
}

fn default_server_alive_interval() -> u32 {
    15
}

fn default_server_alive_count_max() -> u32 {
    3
}

fn default_multiplex() -> bool {
    true
}

// Legacy scp protocol so remote paths are shell-quoted the same way as ssh
// commands.
fn default_scp_flags() -> Vec<String> {
    vec!["-O".to_string()]
}

fn default_ssh_program() -> String {
    "ssh".to_string()
}

fn default_scp_program() -> String {
    "scp".to_string()
}

pub const CONTROLLER_HOST: &str = "link";
pub const PERCEPTION_HOST: &str = "zelda";
pub const LOCAL_HOST: &str = "local";

const REMOTE_USER: &str = "val";
const REMOTE_ROOT: &str = "/home/val/valkyrie";
const LOCAL_ROOT: &str = "~/valkyrie";

pub fn builtin_build() -> BuildConfig {
    BuildConfig {
        command: "gradle installDist distTar".to_string(),
        working_dir: ".".to_string(),
        install_dir: "build/install/valkyrie".to_string(),
        archive_dir: "build/distributions".to_string(),
        module_name: "valkyrie".to_string(),
        version: "0.1.0".to_string(),
        archive_extension: "tar".to_string(),
    }
}

pub fn builtin_hosts() -> BTreeMap<String, HostConfig> {
    let mut hosts = BTreeMap::new();
    hosts.insert(
        CONTROLLER_HOST.to_string(),
        HostConfig::ssh(CONTROLLER_HOST, REMOTE_USER),
    );
    hosts.insert(
        PERCEPTION_HOST.to_string(),
        HostConfig::ssh(PERCEPTION_HOST, REMOTE_USER),
    );
    hosts.insert(LOCAL_HOST.to_string(), HostConfig::local());
    hosts
}

/// Replace `lib/` and `bin/` under the target root with a fresh copy of the
/// local install, then make the launch scripts executable.
fn install_tree_steps() -> Vec<DeployStep> {
    vec![
        DeployStep::remove("{{remoteRoot}}/lib"),
        DeployStep::mkdir("{{remoteRoot}}/lib"),
        DeployStep::copy("{{installDir}}/lib", "{{remoteRoot}}/lib"),
        DeployStep::remove("{{remoteRoot}}/bin"),
        DeployStep::mkdir("{{remoteRoot}}/bin"),
        DeployStep::copy("{{installDir}}/bin", "{{remoteRoot}}/bin"),
        DeployStep::run("chmod +x {{remoteRoot}}/bin/*"),
    ]
}

pub fn builtin_routines() -> BTreeMap<String, RoutineConfig> {
    let mut controller_steps = install_tree_steps();
    controller_steps.push(DeployStep::copy("{{archive}}", "{{remoteRoot}}/"));

    let mut routines = BTreeMap::new();
    routines.insert(
        "deploy".to_string(),
        RoutineConfig {
            description: Some("Deploy the controller to the realtime computer".to_string()),
            include: Vec::new(),
            targets: vec![TargetConfig {
                host_alias: CONTROLLER_HOST.to_string(),
                remote_root_dir: REMOTE_ROOT.to_string(),
                operations: controller_steps,
            }],
        },
    );
    routines.insert(
        "deploy-network-processor".to_string(),
        RoutineConfig {
            description: Some(
                "Deploy the controller, then the network processor on the perception computer"
                    .to_string(),
            ),
            include: vec!["deploy".to_string()],
            targets: vec![TargetConfig {
                host_alias: PERCEPTION_HOST.to_string(),
                remote_root_dir: REMOTE_ROOT.to_string(),
                operations: install_tree_steps(),
            }],
        },
    );
    routines.insert(
        "deploy-local".to_string(),
        RoutineConfig {
            description: Some("Install into the local home directory".to_string()),
            include: Vec::new(),
            targets: vec![TargetConfig {
                host_alias: LOCAL_HOST.to_string(),
                remote_root_dir: LOCAL_ROOT.to_string(),
                operations: install_tree_steps(),
            }],
        },
    );
    routines
}
