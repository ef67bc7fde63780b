//! Build producer: runs the packaging command and checks its output layout.
//!
//! A successful build leaves `<installDir>/bin`, `<installDir>/lib` and one
//! archive named `<moduleName>-<version>.<ext>` under `<archiveDir>`.

use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{BuildFailedDetails, Error, Result};
use crate::ssh::execute_local_command_in_dir;
use crate::utils::command::{tail_lines, CapturedOutput};
use crate::utils::template::TemplateVars;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildConfig {
    pub command: String,
    #[serde(default = "default_working_dir")]
    pub working_dir: String,
    pub install_dir: String,
    pub archive_dir: String,
    pub module_name: String,
    pub version: String,
    #[serde(default = "default_archive_extension")]
    pub archive_extension: String,
}

fn default_working_dir() -> String {
    ".".to_string()
}

fn default_archive_extension() -> String {
    "tar".to_string()
}

impl BuildConfig {
    /// `<moduleName>-<version>.<ext>`, after validating both parts.
    pub fn archive_file_name(&self) -> Result<String> {
        let module_pattern = Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$")
            .map_err(|e| Error::internal_unexpected(e.to_string()))?;
        if !module_pattern.is_match(&self.module_name) {
            return Err(Error::config_invalid_value(
                "build.moduleName",
                Some(self.module_name.clone()),
                "Module name must be a plain file-name fragment",
            ));
        }

        semver::Version::parse(&self.version).map_err(|e| {
            Error::config_invalid_value(
                "build.version",
                Some(self.version.clone()),
                format!("Not a semantic version: {}", e),
            )
        })?;

        let extension = self.archive_extension.trim_start_matches('.');
        if extension.is_empty() {
            return Err(Error::config_invalid_value(
                "build.archiveExtension",
                None,
                "Archive extension cannot be empty",
            ));
        }

        Ok(format!("{}-{}.{}", self.module_name, self.version, extension))
    }

    pub fn working_dir(&self, base_dir: &Path) -> PathBuf {
        resolve_local(base_dir, &self.working_dir)
    }

    pub fn install_dir(&self, base_dir: &Path) -> PathBuf {
        resolve_local(base_dir, &self.install_dir)
    }

    pub fn archive_dir(&self, base_dir: &Path) -> PathBuf {
        resolve_local(base_dir, &self.archive_dir)
    }

    pub fn archive_path(&self, base_dir: &Path) -> Result<PathBuf> {
        Ok(self.archive_dir(base_dir).join(self.archive_file_name()?))
    }

    /// Values for the `{{installDir}}`-style placeholders in routine steps.
    pub fn template_vars(&self, base_dir: &Path) -> Result<HashMap<String, String>> {
        let mut vars = HashMap::new();
        vars.insert(
            TemplateVars::INSTALL_DIR.to_string(),
            self.install_dir(base_dir).to_string_lossy().to_string(),
        );
        vars.insert(
            TemplateVars::ARCHIVE_DIR.to_string(),
            self.archive_dir(base_dir).to_string_lossy().to_string(),
        );
        vars.insert(
            TemplateVars::ARCHIVE.to_string(),
            self.archive_path(base_dir)?.to_string_lossy().to_string(),
        );
        vars.insert(TemplateVars::MODULE_NAME.to_string(), self.module_name.clone());
        vars.insert(TemplateVars::VERSION.to_string(), self.version.clone());
        Ok(vars)
    }
}

/// Expand `~` and anchor relative paths at `base_dir`.
pub fn resolve_local(base_dir: &Path, path: &str) -> PathBuf {
    let expanded = PathBuf::from(shellexpand::tilde(path).to_string());
    if expanded.is_absolute() {
        expanded
    } else {
        base_dir.join(expanded)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildArtifacts {
    pub install_dir: String,
    pub bin_dir: String,
    pub lib_dir: String,
    pub archive: String,
    pub archive_size: u64,
    pub archive_sha256: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildReport {
    pub command: String,
    pub skipped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<CapturedOutput>,
    pub artifacts: BuildArtifacts,
}

/// Run the packaging step (unless `skip_build`) and verify its output.
pub fn produce(config: &BuildConfig, base_dir: &Path, skip_build: bool) -> Result<BuildReport> {
    // Fail on a bad module name or version before spending time on a build.
    config.archive_file_name()?;

    let output = if skip_build {
        log_status!("build", "Skipping build, using existing artifacts");
        None
    } else {
        Some(run_build(config, base_dir)?)
    };

    let artifacts = collect_artifacts(config, base_dir)?;
    log_status!(
        "build",
        "Archive {} ({} bytes)",
        artifacts.archive,
        artifacts.archive_size
    );

    Ok(BuildReport {
        command: config.command.clone(),
        skipped: skip_build,
        output,
        artifacts,
    })
}

/// Run the build command in its working directory.
pub fn run_build(config: &BuildConfig, base_dir: &Path) -> Result<CapturedOutput> {
    let working_dir = config.working_dir(base_dir);
    if !working_dir.is_dir() {
        return Err(Error::config_invalid_value(
            "build.workingDir",
            Some(working_dir.display().to_string()),
            "Build working directory does not exist",
        ));
    }

    log_status!("build", "Running '{}' in {}", config.command, working_dir.display());
    let output = execute_local_command_in_dir(&config.command, Some(&working_dir), None);

    if !output.success() {
        return Err(Error::build_failed(BuildFailedDetails {
            command: config.command.clone(),
            working_dir: working_dir.display().to_string(),
            exit_code: output.exit_code,
            output_tail: tail_lines(&output.error_text(), 15),
        })
        .with_hint(build_exit_hint(output.exit_code)));
    }

    Ok(output)
}

fn build_exit_hint(exit_code: i32) -> &'static str {
    match exit_code {
        127 => "Command not found. Check that the build tool is installed and in PATH.",
        126 => "Permission denied. Check file permissions on the build script.",
        _ => "Re-run the build command by hand to see the full output.",
    }
}

/// Verify the install layout and archive, and fingerprint the archive.
pub fn collect_artifacts(config: &BuildConfig, base_dir: &Path) -> Result<BuildArtifacts> {
    let install_dir = config.install_dir(base_dir);
    let bin_dir = install_dir.join("bin");
    let lib_dir = install_dir.join("lib");
    let archive = config.archive_path(base_dir)?;

    for (kind, dir) in [("bin directory", &bin_dir), ("lib directory", &lib_dir)] {
        if !dir.is_dir() {
            return Err(Error::build_artifact_missing(kind, dir.display().to_string()));
        }
    }
    if !archive.is_file() {
        return Err(Error::build_artifact_missing("archive", archive.display().to_string()));
    }

    let (archive_size, archive_sha256) = digest_file(&archive).map_err(|e| {
        Error::internal_io(e.to_string(), Some(format!("hash {}", archive.display())))
    })?;

    Ok(BuildArtifacts {
        install_dir: install_dir.display().to_string(),
        bin_dir: bin_dir.display().to_string(),
        lib_dir: lib_dir.display().to_string(),
        archive: archive.display().to_string(),
        archive_size,
        archive_sha256,
        version: config.version.clone(),
    })
}

fn digest_file(path: &Path) -> io::Result<(u64, String)> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let size = io::copy(&mut file, &mut hasher)?;
    Ok((size, format!("{:x}", hasher.finalize())))
}
