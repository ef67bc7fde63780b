//! Deployment target model: one host, one remote root, an ordered step list.
//!
//! Targets are validated once at construction and are immutable afterwards.
//! Relative remote paths in steps are resolved against the target's
//! `remote_root_dir`, so a constructed target only ever holds absolute
//! remote paths.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::utils::base_path;

/// One primitive operation against a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op")]
pub enum DeployStep {
    /// Delete a file or directory tree. Absence is not an error.
    #[serde(rename = "remove")]
    RemoveRemotePath { path: String },
    /// Create a directory and all missing ancestors.
    #[serde(rename = "mkdir")]
    CreateRemoteDir { path: String },
    /// Copy a local file or tree, merging into whatever already exists.
    #[serde(rename = "copy")]
    CopyToRemote { local: PathBuf, remote: String },
    /// Run a shell command line; non-zero exit fails the step.
    #[serde(rename = "run")]
    RunRemoteCommand { command: String },
}

impl DeployStep {
    pub fn remove(path: impl Into<String>) -> Self {
        DeployStep::RemoveRemotePath { path: path.into() }
    }

    pub fn mkdir(path: impl Into<String>) -> Self {
        DeployStep::CreateRemoteDir { path: path.into() }
    }

    pub fn copy(local: impl Into<PathBuf>, remote: impl Into<String>) -> Self {
        DeployStep::CopyToRemote {
            local: local.into(),
            remote: remote.into(),
        }
    }

    pub fn run(command: impl Into<String>) -> Self {
        DeployStep::RunRemoteCommand {
            command: command.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            DeployStep::RemoveRemotePath { .. } => "remove",
            DeployStep::CreateRemoteDir { .. } => "mkdir",
            DeployStep::CopyToRemote { .. } => "copy",
            DeployStep::RunRemoteCommand { .. } => "run",
        }
    }

    /// Local source read by this step, if any.
    pub fn local_source(&self) -> Option<&Path> {
        match self {
            DeployStep::CopyToRemote { local, .. } => Some(local),
            _ => None,
        }
    }

    fn resolve(self, remote_root: &str) -> Result<Self> {
        Ok(match self {
            DeployStep::RemoveRemotePath { path } => {
                let path = base_path::join_remote_path(remote_root, &path)?;
                if base_path::is_dangerous_removal(&path) {
                    return Err(Error::config_invalid_value(
                        "operations.remove",
                        Some(path),
                        "Refusing to remove a filesystem or home root",
                    ));
                }
                DeployStep::RemoveRemotePath { path }
            }
            DeployStep::CreateRemoteDir { path } => DeployStep::CreateRemoteDir {
                path: base_path::join_remote_path(remote_root, &path)?,
            },
            DeployStep::CopyToRemote { local, remote } => {
                if local.as_os_str().is_empty() {
                    return Err(Error::config_invalid_value(
                        "operations.copy.local",
                        None,
                        "Local path cannot be empty",
                    ));
                }
                DeployStep::CopyToRemote {
                    local,
                    remote: base_path::join_remote_path(remote_root, &remote)?,
                }
            }
            DeployStep::RunRemoteCommand { command } => {
                if command.trim().is_empty() {
                    return Err(Error::config_invalid_value(
                        "operations.run.command",
                        None,
                        "Command cannot be empty",
                    ));
                }
                DeployStep::RunRemoteCommand { command }
            }
        })
    }
}

impl fmt::Display for DeployStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeployStep::RemoveRemotePath { path } => write!(f, "remove {}", path),
            DeployStep::CreateRemoteDir { path } => write!(f, "mkdir {}", path),
            DeployStep::CopyToRemote { local, remote } => {
                write!(f, "copy {} -> {}", local.display(), remote)
            }
            DeployStep::RunRemoteCommand { command } => write!(f, "run {}", command),
        }
    }
}

/// A host plus the ordered steps to perform against it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployTarget {
    host_alias: String,
    remote_root_dir: String,
    operations: Vec<DeployStep>,
}

impl DeployTarget {
    pub fn new(
        host_alias: impl Into<String>,
        remote_root_dir: impl Into<String>,
        operations: Vec<DeployStep>,
    ) -> Result<Self> {
        let host_alias = host_alias.into();
        let remote_root_dir = remote_root_dir.into();

        if host_alias.trim().is_empty() {
            return Err(Error::config_invalid_value(
                "hostAlias",
                None,
                "Host alias cannot be empty",
            ));
        }

        if !remote_root_dir.starts_with('/') {
            return Err(Error::config_invalid_value(
                "remoteRootDir",
                Some(remote_root_dir),
                "Remote root directory must be an absolute path",
            ));
        }

        if operations.is_empty() {
            return Err(Error::config_invalid_value(
                "operations",
                Some(host_alias),
                "A deploy target needs at least one operation",
            ));
        }

        let operations = operations
            .into_iter()
            .map(|step| step.resolve(&remote_root_dir))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            host_alias,
            remote_root_dir,
            operations,
        })
    }

    pub fn builder(
        host_alias: impl Into<String>,
        remote_root_dir: impl Into<String>,
    ) -> DeployTargetBuilder {
        DeployTargetBuilder {
            host_alias: host_alias.into(),
            remote_root_dir: remote_root_dir.into(),
            operations: Vec::new(),
        }
    }

    pub fn host_alias(&self) -> &str {
        &self.host_alias
    }

    pub fn remote_root_dir(&self) -> &str {
        &self.remote_root_dir
    }

    pub fn operations(&self) -> &[DeployStep] {
        &self.operations
    }
}

/// Accumulates steps in declaration order.
#[derive(Debug, Clone)]
pub struct DeployTargetBuilder {
    host_alias: String,
    remote_root_dir: String,
    operations: Vec<DeployStep>,
}

impl DeployTargetBuilder {
    pub fn step(mut self, step: DeployStep) -> Self {
        self.operations.push(step);
        self
    }

    pub fn remove(self, path: impl Into<String>) -> Self {
        self.step(DeployStep::remove(path))
    }

    pub fn mkdir(self, path: impl Into<String>) -> Self {
        self.step(DeployStep::mkdir(path))
    }

    /// Remove then recreate `path`. Not atomic: a crash in between leaves
    /// the path absent.
    pub fn ensure_empty_dir(self, path: impl Into<String>) -> Self {
        let path = path.into();
        self.remove(path.clone()).mkdir(path)
    }

    pub fn copy(self, local: impl Into<PathBuf>, remote: impl Into<String>) -> Self {
        self.step(DeployStep::copy(local, remote))
    }

    pub fn run(self, command: impl Into<String>) -> Self {
        self.step(DeployStep::run(command))
    }

    pub fn build(self) -> Result<DeployTarget> {
        DeployTarget::new(self.host_alias, self.remote_root_dir, self.operations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn builder_keeps_declaration_order() {
        let target = DeployTarget::builder("link", "/srv/app")
            .ensure_empty_dir("lib")
            .copy("build/lib", "lib")
            .run("ls -la /srv/app/lib")
            .build()
            .unwrap();

        let kinds: Vec<&str> = target.operations().iter().map(|s| s.kind()).collect();
        assert_eq!(kinds, vec!["remove", "mkdir", "copy", "run"]);
        assert_eq!(target.operations()[0], DeployStep::remove("/srv/app/lib"));
        assert_eq!(
            target.operations()[2],
            DeployStep::copy("build/lib", "/srv/app/lib")
        );
    }

    #[test]
    fn empty_operations_are_rejected() {
        let err = DeployTarget::new("link", "/srv/app", Vec::new()).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigInvalidValue);
    }

    #[test]
    fn relative_root_is_rejected() {
        let err = DeployTarget::builder("link", "srv/app")
            .mkdir("lib")
            .build()
            .unwrap_err();
        assert_eq!(err.details["key"], "remoteRootDir");
    }

    #[test]
    fn removing_root_is_rejected() {
        let err = DeployTarget::builder("link", "/srv/app")
            .remove("/")
            .build()
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigInvalidValue);
    }

    #[test]
    fn steps_deserialize_from_tagged_json() {
        let steps: Vec<DeployStep> = serde_json::from_str(
            r#"[
                {"op": "remove", "path": "lib"},
                {"op": "mkdir", "path": "lib"},
                {"op": "copy", "local": "build/lib", "remote": "lib"},
                {"op": "run", "command": "chmod +x bin/*"}
            ]"#,
        )
        .unwrap();

        assert_eq!(steps[3], DeployStep::run("chmod +x bin/*"));
        assert_eq!(steps[2].local_source(), Some(Path::new("build/lib")));
    }

    #[test]
    fn display_names_the_operation() {
        assert_eq!(DeployStep::mkdir("/srv/app").to_string(), "mkdir /srv/app");
        assert_eq!(
            DeployStep::copy("build/bin", "/srv/app/bin").to_string(),
            "copy build/bin -> /srv/app/bin"
        );
    }
}
