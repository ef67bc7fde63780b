//! Session over the local filesystem, used by local installs.
//!
//! Shares the step interpreter with remote targets; "remote" paths are local
//! absolute paths and commands run through `sh -c`.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::session::{file_destination, Session};
use crate::ssh::execute_local_command;
use crate::utils::command::CapturedOutput;

pub struct LocalSession {
    host_alias: String,
}

impl LocalSession {
    pub fn new(host_alias: impl Into<String>) -> Self {
        Self {
            host_alias: host_alias.into(),
        }
    }
}

fn io_failure(operation: &str, path: &Path, err: std::io::Error) -> Error {
    Error::step_execution_failed(operation, path.display().to_string(), err.to_string())
}

impl Session for LocalSession {
    fn host_alias(&self) -> &str {
        &self.host_alias
    }

    fn remove_path(&mut self, path: &str) -> Result<()> {
        let path = Path::new(path);
        let metadata = match fs::symlink_metadata(path) {
            Ok(m) => m,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(io_failure("remove", path, e)),
        };

        let result = if metadata.is_dir() {
            fs::remove_dir_all(path)
        } else {
            fs::remove_file(path)
        };
        result.map_err(|e| io_failure("remove", path, e))
    }

    fn create_dir(&mut self, path: &str) -> Result<()> {
        let path = Path::new(path);
        fs::create_dir_all(path).map_err(|e| io_failure("mkdir", path, e))
    }

    fn copy_to(&mut self, local: &Path, remote: &str) -> Result<()> {
        if local.is_dir() {
            return copy_dir_merge(local, Path::new(remote));
        }

        // Same placement as scp: an existing directory receives the file.
        let mut destination = file_destination(local, remote)?;
        if Path::new(&destination).is_dir() {
            destination = file_destination(local, &format!("{}/", destination))?;
        }
        let destination = Path::new(&destination);
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).map_err(|e| io_failure("copy", parent, e))?;
        }
        fs::copy(local, destination)
            .map(|_| ())
            .map_err(|e| io_failure("copy", destination, e))
    }

    fn run_command(&mut self, command: &str) -> Result<CapturedOutput> {
        let output = execute_local_command(command);
        if output.exit_code == -1 {
            return Err(Error::step_execution_failed("run", command, output.error_text()));
        }
        Ok(output)
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Recursively copy `src` into `dst`, overwriting files present in both and
/// leaving everything else under `dst` untouched.
fn copy_dir_merge(src: &Path, dst: &Path) -> Result<()> {
    fs::create_dir_all(dst).map_err(|e| io_failure("copy", dst, e))?;

    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry.map_err(|e| {
            Error::step_execution_failed(
                "copy",
                src.display().to_string(),
                format!("Failed to read directory entry: {}", e),
            )
        })?;

        let rel_path = entry.path().strip_prefix(src).map_err(|_| {
            Error::step_execution_failed(
                "copy",
                entry.path().display().to_string(),
                "Entry is outside the source directory",
            )
        })?;
        let dst_path = dst.join(rel_path);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&dst_path).map_err(|e| io_failure("copy", &dst_path, e))?;
        } else if entry.file_type().is_symlink() {
            copy_symlink(entry.path(), &dst_path)?;
        } else {
            fs::copy(entry.path(), &dst_path).map_err(|e| io_failure("copy", &dst_path, e))?;
        }
    }

    Ok(())
}

#[cfg(unix)]
fn copy_symlink(src: &Path, dst: &Path) -> Result<()> {
    let target = fs::read_link(src).map_err(|e| io_failure("copy", src, e))?;
    if fs::symlink_metadata(dst).is_ok() {
        fs::remove_file(dst).map_err(|e| io_failure("copy", dst, e))?;
    }
    std::os::unix::fs::symlink(target, dst).map_err(|e| io_failure("copy", dst, e))
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, dst: &Path) -> Result<()> {
    fs::copy(src, dst)
        .map(|_| ())
        .map_err(|e| io_failure("copy", dst, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn remove_missing_path_is_ok() {
        let tmp = TempDir::new().unwrap();
        let mut session = LocalSession::new("local");
        let missing = tmp.path().join("missing");

        assert!(session.remove_path(missing.to_str().unwrap()).is_ok());
    }

    #[test]
    fn remove_then_mkdir_leaves_empty_dir() {
        let tmp = TempDir::new().unwrap();
        let mut session = LocalSession::new("local");
        let target = tmp.path().join("lib");
        fs::create_dir_all(target.join("nested")).unwrap();
        fs::write(target.join("nested/old.jar"), "old").unwrap();

        let path = target.to_str().unwrap();
        session.remove_path(path).unwrap();
        session.create_dir(path).unwrap();

        assert!(target.is_dir());
        assert_eq!(fs::read_dir(&target).unwrap().count(), 0);
    }

    #[test]
    fn remove_then_mkdir_replaces_a_file() {
        let tmp = TempDir::new().unwrap();
        let mut session = LocalSession::new("local");
        let target = tmp.path().join("lib");
        fs::write(&target, "not a directory").unwrap();

        let path = target.to_str().unwrap();
        session.remove_path(path).unwrap();
        session.create_dir(path).unwrap();

        assert!(target.is_dir());
    }

    #[test]
    fn copy_file_into_directory_with_trailing_slash() {
        let tmp = TempDir::new().unwrap();
        let mut session = LocalSession::new("local");
        let source = tmp.path().join("config.ini");
        fs::write(&source, "gain=1").unwrap();
        let dest_dir = tmp.path().join("deployed");

        session
            .copy_to(&source, &format!("{}/", dest_dir.display()))
            .unwrap();

        assert_eq!(fs::read_to_string(dest_dir.join("config.ini")).unwrap(), "gain=1");
    }

    #[test]
    fn copy_file_onto_existing_directory_lands_inside() {
        let tmp = TempDir::new().unwrap();
        let mut session = LocalSession::new("local");
        let source = tmp.path().join("valkyrie-0.1.0.tar");
        fs::write(&source, "archive").unwrap();
        let dest_dir = tmp.path().join("valkyrie");
        fs::create_dir_all(&dest_dir).unwrap();

        session
            .copy_to(&source, dest_dir.to_str().unwrap())
            .unwrap();

        assert_eq!(
            fs::read_to_string(dest_dir.join("valkyrie-0.1.0.tar")).unwrap(),
            "archive"
        );
    }

    #[test]
    fn copy_file_to_new_path_uses_exact_name() {
        let tmp = TempDir::new().unwrap();
        let mut session = LocalSession::new("local");
        let source = tmp.path().join("a.ini");
        fs::write(&source, "x").unwrap();
        let dest = tmp.path().join("conf/b.ini");

        session.copy_to(&source, dest.to_str().unwrap()).unwrap();

        assert_eq!(fs::read_to_string(&dest).unwrap(), "x");
    }

    #[test]
    fn failing_command_returns_output() {
        let mut session = LocalSession::new("local");
        let output = session.run_command("echo oops >&2; exit 3").unwrap();

        assert_eq!(output.exit_code, 3);
        assert_eq!(output.stderr.trim(), "oops");
    }
}
