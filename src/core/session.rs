//! Session capability the orchestrator drives.
//!
//! A session exposes exactly the four primitive operations plus close.
//! `SshSession` and `LocalSession` are the two implementations; tests supply
//! in-memory fakes through the same traits.

use std::path::Path;

use crate::error::{Error, Result};
use crate::utils::command::CapturedOutput;

/// An open, authenticated channel to one host.
pub trait Session {
    fn host_alias(&self) -> &str;

    /// Delete `path` recursively. Absence is not an error.
    fn remove_path(&mut self, path: &str) -> Result<()>;

    /// Create `path` and all missing ancestors.
    fn create_dir(&mut self, path: &str) -> Result<()>;

    /// Copy a local file or tree to `remote`, overwriting files that exist
    /// in both and leaving extra destination files in place.
    fn copy_to(&mut self, local: &Path, remote: &str) -> Result<()>;

    /// Run a command line. A non-zero exit is returned as output, not as an
    /// error; the caller decides what a failing status means.
    fn run_command(&mut self, command: &str) -> Result<CapturedOutput>;

    fn close(&mut self) -> Result<()>;
}

/// Opens sessions by host alias.
pub trait SessionFactory {
    fn open(&self, host_alias: &str) -> Result<Box<dyn Session>>;
}

/// Closes the wrapped session exactly once, on whichever path drops it.
pub struct SessionGuard {
    session: Box<dyn Session>,
}

impl SessionGuard {
    pub fn new(session: Box<dyn Session>) -> Self {
        Self { session }
    }

    pub fn session(&mut self) -> &mut dyn Session {
        self.session.as_mut()
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let alias = self.session.host_alias().to_string();
        if let Err(err) = self.session.close() {
            log_status!("deploy", "Closing session to '{}' failed: {}", alias, err);
        }
    }
}

/// Destination of a single-file copy. A trailing `/` on `remote` means "into
/// this directory, keeping the file name"; anything else is the exact path,
/// unless a directory already exists there, in which case sessions place the
/// file inside it.
pub fn file_destination(local: &Path, remote: &str) -> Result<String> {
    if !remote.ends_with('/') {
        return Ok(remote.to_string());
    }

    let name = local.file_name().and_then(|n| n.to_str()).ok_or_else(|| {
        Error::step_execution_failed(
            "copy",
            local.display().to_string(),
            "Local path must include a file name",
        )
    })?;
    Ok(format!("{}{}", remote, name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_keeps_file_name() {
        let dest = file_destination(Path::new("build/ValkyrieConfig.ini"), "/home/val/.ihmc/").unwrap();
        assert_eq!(dest, "/home/val/.ihmc/ValkyrieConfig.ini");
    }

    #[test]
    fn plain_remote_is_exact_path() {
        let dest = file_destination(Path::new("build/a.ini"), "/home/val/b.ini").unwrap();
        assert_eq!(dest, "/home/val/b.ini");
    }
}
