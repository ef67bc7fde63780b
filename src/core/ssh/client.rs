use std::path::Path;
use std::process::{Command, Stdio};

use crate::defaults::TransportConfig;
use crate::error::{Error, Result};
use crate::hosts::HostConfig;
use crate::utils::command::CapturedOutput;
use crate::utils::shell;

/// Thin wrapper around the system `ssh`, `scp` and `tar` binaries.
pub struct SshClient {
    pub host_alias: String,
    pub host: String,
    pub user: String,
    pub port: u16,
    pub identity_file: Option<String>,
    /// When true, all commands run locally instead of over SSH.
    /// Set automatically when the host is localhost/127.0.0.1/::1.
    pub is_local: bool,
    transport: TransportConfig,
    control_path: Option<String>,
}

impl SshClient {
    pub fn from_host(host_alias: &str, host: &HostConfig, transport: &TransportConfig) -> Result<Self> {
        if host.host.trim().is_empty() || host.user.trim().is_empty() {
            return Err(Error::config_invalid_value(
                format!("hosts.{}", host_alias),
                None,
                "Host needs both 'host' and 'user'",
            ));
        }

        let identity_file = match &host.identity_file {
            Some(path) if !path.is_empty() => {
                let expanded = shellexpand::tilde(path).to_string();
                if !Path::new(&expanded).exists() {
                    return Err(Error::ssh_identity_file_not_found(host_alias, expanded));
                }
                Some(expanded)
            }
            _ => None,
        };

        let is_local = is_local_host(&host.host);
        if is_local {
            log_status!("ssh", "Host '{}' is localhost, using local execution", host_alias);
        }

        let control_path = (transport.multiplex && !is_local).then(|| {
            std::env::temp_dir()
                .join(format!("robodeploy-{}-{}.ctl", host_alias, std::process::id()))
                .to_string_lossy()
                .to_string()
        });

        Ok(Self {
            host_alias: host_alias.to_string(),
            host: host.host.clone(),
            user: host.user.clone(),
            port: host.port,
            identity_file,
            is_local,
            transport: transport.clone(),
            control_path,
        })
    }

    pub fn destination(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }

    /// Options shared by ssh and scp (`-o` style, so both accept them).
    fn common_options(&self) -> Vec<String> {
        let mut args = Vec::new();

        if let Some(identity_file) = &self.identity_file {
            args.push("-i".to_string());
            args.push(identity_file.clone());
        }

        // Non-interactive: never prompt, and give up on stalled connections.
        args.extend([
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={}", self.transport.connect_timeout_secs),
            "-o".to_string(),
            format!("ServerAliveInterval={}", self.transport.server_alive_interval_secs),
            "-o".to_string(),
            format!("ServerAliveCountMax={}", self.transport.server_alive_count_max),
        ]);

        if let Some(control_path) = &self.control_path {
            args.push("-o".to_string());
            args.push(format!("ControlPath={}", control_path));
        }

        args
    }

    fn build_ssh_args(&self, command: Option<&str>) -> Vec<String> {
        let mut args = self.common_options();

        if self.port != 22 {
            args.push("-p".to_string());
            args.push(self.port.to_string());
        }

        args.push(self.destination());

        if let Some(cmd) = command {
            args.push(cmd.to_string());
        }

        args
    }

    /// Establish the connection. With multiplexing enabled this starts a
    /// persistent master that later commands reuse until `disconnect`.
    pub fn connect(&self) -> CapturedOutput {
        if self.is_local {
            return execute_local_command("true");
        }

        let mut args = Vec::new();
        if self.control_path.is_some() {
            args.extend([
                "-o".to_string(),
                "ControlMaster=auto".to_string(),
                "-o".to_string(),
                "ControlPersist=yes".to_string(),
            ]);
        }
        args.extend(self.build_ssh_args(Some("true")));

        run_captured(
            Command::new(&self.transport.ssh_program).args(&args),
            "SSH error",
        )
    }

    /// Tear down the multiplexed master, if one was started.
    pub fn disconnect(&self) -> CapturedOutput {
        if self.control_path.is_none() {
            return CapturedOutput::default();
        }

        let mut args = self.common_options();
        args.extend(["-O".to_string(), "exit".to_string(), self.destination()]);
        run_captured(
            Command::new(&self.transport.ssh_program).args(&args),
            "SSH error",
        )
    }

    pub fn execute(&self, command: &str) -> CapturedOutput {
        if self.is_local {
            return execute_local_command(command);
        }

        let args = self.build_ssh_args(Some(command));
        run_captured(
            Command::new(&self.transport.ssh_program).args(&args),
            "SSH error",
        )
    }

    /// Copy one file to `remote_path`. An existing directory there receives
    /// the file under its own name.
    pub fn upload_file(&self, local_path: &Path, remote_path: &str) -> CapturedOutput {
        if self.is_local {
            let cmd = format!(
                "cp {} {}",
                shell::quote_path(&local_path.to_string_lossy()),
                shell::quote_path(remote_path)
            );
            return execute_local_command(&cmd);
        }

        let mut args: Vec<String> = self.transport.scp_flags.clone();
        args.extend(self.common_options());

        if self.port != 22 {
            args.extend(["-P".to_string(), self.port.to_string()]);
        }

        args.push(local_path.to_string_lossy().to_string());
        args.push(format!("{}:{}", self.destination(), shell::quote_path(remote_path)));

        log_status!(
            "ssh",
            "Uploading file: {} -> {}:{}",
            local_path.display(),
            self.host_alias,
            remote_path
        );
        run_captured(
            Command::new(&self.transport.scp_program).args(&args),
            "SCP error",
        )
    }

    /// Copy the contents of a local directory into `remote_path`, creating
    /// it if needed. Existing remote files not in the source are kept.
    pub fn upload_tree(&self, local_dir: &Path, remote_path: &str) -> CapturedOutput {
        let quoted_remote = shell::quote_path(remote_path);

        if self.is_local {
            let cmd = format!(
                "mkdir -p {dst} && cp -R {src}/. {dst}",
                src = shell::quote_path(&local_dir.to_string_lossy()),
                dst = quoted_remote
            );
            return execute_local_command(&cmd);
        }

        log_status!(
            "ssh",
            "Uploading directory: {} -> {}:{}",
            local_dir.display(),
            self.host_alias,
            remote_path
        );

        let mut tar = match Command::new("tar")
            .arg("-C")
            .arg(local_dir)
            .args(["-cf", "-", "."])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => return tar_failure(e),
        };

        let Some(archive) = tar.stdout.take() else {
            return tar_failure("tar stdout unavailable");
        };

        let remote_cmd = format!(
            "mkdir -p {dst} && tar -C {dst} -xf -",
            dst = quoted_remote
        );
        let args = self.build_ssh_args(Some(&remote_cmd));
        let upload = run_captured(
            Command::new(&self.transport.ssh_program)
                .args(&args)
                .stdin(Stdio::from(archive)),
            "SSH error",
        );
        let packed = tar.wait_with_output();

        // A failed remote side closes the pipe and kills tar, so the ssh
        // status is the one that explains the failure.
        if !upload.success() {
            return upload;
        }

        match packed {
            Ok(out) if !out.status.success() => CapturedOutput::new(
                out.status.code().unwrap_or(1),
                String::new(),
                String::from_utf8_lossy(&out.stderr).to_string(),
            ),
            Ok(_) => upload,
            Err(e) => tar_failure(e),
        }
    }
}

fn run_captured(cmd: &mut Command, label: &str) -> CapturedOutput {
    match cmd.output() {
        Ok(out) => CapturedOutput::from_output(&out),
        Err(e) => spawn_failure(label, e),
    }
}

fn spawn_failure(label: &str, error: impl std::fmt::Display) -> CapturedOutput {
    CapturedOutput::new(-1, String::new(), format!("{}: {}", label, error))
}

// Local packing problems are step failures, never connection failures.
fn tar_failure(error: impl std::fmt::Display) -> CapturedOutput {
    CapturedOutput::new(1, String::new(), format!("tar error: {}", error))
}

pub fn execute_local_command(command: &str) -> CapturedOutput {
    execute_local_command_in_dir(command, None, None)
}

pub fn execute_local_command_in_dir(
    command: &str,
    current_dir: Option<&Path>,
    env: Option<&[(&str, &str)]>,
) -> CapturedOutput {
    #[cfg(windows)]
    let mut cmd = {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", command]);
        cmd
    };

    #[cfg(not(windows))]
    let mut cmd = {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", command]);
        cmd
    };

    if let Some(dir) = current_dir {
        cmd.current_dir(dir);
    }

    if let Some(env_pairs) = env {
        cmd.envs(env_pairs.iter().copied());
    }

    run_captured(&mut cmd, "Command error")
}

/// Check if a host address refers to the local machine.
pub fn is_local_host(host: &str) -> bool {
    matches!(host, "localhost" | "127.0.0.1" | "::1")
}

/// ssh reserves exit status 255 for its own connection errors.
pub fn is_connection_failure(output: &CapturedOutput) -> bool {
    output.exit_code == 255 || output.exit_code == -1
}
