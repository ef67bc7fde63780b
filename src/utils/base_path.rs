//! Remote path joining utilities.
//!
//! Remote paths are always POSIX paths, independent of the local platform.

use crate::{Error, Result};

/// Join `path` onto `base`. Absolute paths are returned unchanged.
pub fn join_remote_path(base: &str, path: &str) -> Result<String> {
    let path = path.trim();

    if path.is_empty() {
        return Err(Error::validation_invalid_argument(
            "path",
            "Path cannot be empty",
            None,
            None,
        ));
    }

    if path.starts_with('/') {
        return Ok(path.to_string());
    }

    let base = base.trim();
    if base.is_empty() {
        return Err(Error::config_missing_key("remoteRootDir", None));
    }

    if base.ends_with('/') {
        Ok(format!("{}{}", base, path))
    } else {
        Ok(format!("{}/{}", base, path))
    }
}

/// Parent directory of a remote path. The parent of a top-level entry is `/`.
pub fn remote_dirname(path: &str) -> Result<String> {
    let path = path.trim();

    if path.is_empty() {
        return Err(Error::validation_invalid_argument(
            "path",
            "Path cannot be empty",
            None,
            None,
        ));
    }

    let without_trailing = path.trim_end_matches('/');

    let Some((parent, _)) = without_trailing.rsplit_once('/') else {
        return Ok(".".to_string());
    };

    if parent.is_empty() {
        Ok("/".to_string())
    } else {
        Ok(parent.to_string())
    }
}

/// True for paths that would wipe a whole filesystem or home directory if
/// removed recursively.
pub fn is_dangerous_removal(path: &str) -> bool {
    let trimmed = path.trim().trim_end_matches('/');
    matches!(trimmed, "" | "/" | "~" | "." | ".." | "*" | "/*" | "~/*")
}
