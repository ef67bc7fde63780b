mod client;

pub use client::{
    execute_local_command, execute_local_command_in_dir, is_connection_failure, is_local_host,
    SshClient,
};

use std::path::Path;

use crate::error::{Error, Result};
use crate::session::{file_destination, Session};
use crate::utils::base_path;
use crate::utils::command::CapturedOutput;
use crate::utils::shell;

/// A session to one host over ssh.
pub struct SshSession {
    client: SshClient,
}

impl SshSession {
    /// Connect to the host. Fails with `session.open_failed` when the host
    /// is unreachable or rejects authentication.
    pub fn open(client: SshClient) -> Result<Self> {
        let output = client.connect();
        if !output.success() {
            return Err(Error::session_open_failed(
                &client.host_alias,
                Some(client.destination()),
                output.error_text(),
            ));
        }
        log_status!("ssh", "Connected to '{}' ({})", client.host_alias, client.destination());
        Ok(Self { client })
    }

    fn check(&self, operation: &str, path: &str, output: CapturedOutput) -> Result<()> {
        if output.success() {
            return Ok(());
        }
        if !self.client.is_local && is_connection_failure(&output) {
            return Err(self.lost(output));
        }
        Err(Error::step_execution_failed(operation, path, output.error_text()))
    }

    fn lost(&self, output: CapturedOutput) -> Error {
        Error::session_lost(
            &self.client.host_alias,
            Some(self.client.destination()),
            output.error_text(),
        )
    }
}

impl Session for SshSession {
    fn host_alias(&self) -> &str {
        &self.client.host_alias
    }

    fn remove_path(&mut self, path: &str) -> Result<()> {
        let output = self.client.execute(&format!("rm -rf {}", shell::quote_path(path)));
        self.check("remove", path, output)
    }

    fn create_dir(&mut self, path: &str) -> Result<()> {
        let output = self.client.execute(&format!("mkdir -p {}", shell::quote_path(path)));
        self.check("mkdir", path, output)
    }

    fn copy_to(&mut self, local: &Path, remote: &str) -> Result<()> {
        if local.is_dir() {
            let output = self.client.upload_tree(local, remote);
            return self.check("copy", remote, output);
        }

        let destination = file_destination(local, remote)?;
        let parent = base_path::remote_dirname(&destination)?;
        let output = self
            .client
            .execute(&format!("mkdir -p {}", shell::quote_path(&parent)));
        self.check("copy", &parent, output)?;

        let output = self.client.upload_file(local, &destination);
        self.check("copy", &destination, output)
    }

    fn run_command(&mut self, command: &str) -> Result<CapturedOutput> {
        let output = self.client.execute(command);
        if !self.client.is_local && is_connection_failure(&output) {
            return Err(self.lost(output));
        }
        Ok(output)
    }

    fn close(&mut self) -> Result<()> {
        let output = self.client.disconnect();
        if output.success() {
            Ok(())
        } else {
            Err(self.lost(output))
        }
    }
}
