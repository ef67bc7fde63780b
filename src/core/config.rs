//! Deployment configuration: build settings, hosts, transport and routines.
//!
//! A config is read from an explicit path, `./robodeploy.json`, or the
//! global config dir, in that order. Without a file the built-in defaults
//! are used. File hosts and routines extend the built-in ones (the file wins
//! on a name clash) unless `inheritDefaults` is false.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use crate::build::{resolve_local, BuildConfig};
use crate::defaults::{self, TransportConfig};
use crate::error::{Error, Result};
use crate::hosts::{HostConfig, HostSessionFactory};
use crate::orchestrator::DeploymentRun;
use crate::paths;
use crate::target::{DeployStep, DeployTarget};
use crate::utils::template::{self, TemplateVars};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetConfig {
    pub host_alias: String,
    pub remote_root_dir: String,
    pub operations: Vec<DeployStep>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutineConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Routines whose targets run before this routine's own targets.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,
    #[serde(default)]
    pub targets: Vec<TargetConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployConfig {
    #[serde(default = "defaults::builtin_build")]
    pub build: BuildConfig,

    #[serde(default)]
    pub transport: TransportConfig,

    #[serde(default)]
    pub hosts: BTreeMap<String, HostConfig>,

    #[serde(default)]
    pub routines: BTreeMap<String, RoutineConfig>,

    #[serde(default = "default_inherit")]
    pub inherit_defaults: bool,
}

fn default_inherit() -> bool {
    true
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            build: defaults::builtin_build(),
            transport: TransportConfig::default(),
            hosts: defaults::builtin_hosts(),
            routines: defaults::builtin_routines(),
            inherit_defaults: true,
        }
    }
}

/// A parsed config plus where it came from. Relative local paths resolve
/// against `base_dir`.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: DeployConfig,
    pub source: Option<PathBuf>,
    pub base_dir: PathBuf,
}

impl DeployConfig {
    pub fn from_json(content: &str, source: &str) -> Result<Self> {
        let config: DeployConfig =
            serde_json::from_str(content).map_err(|e| Error::config_invalid_json(source, e))?;
        Ok(config.with_builtin_defaults())
    }

    fn with_builtin_defaults(mut self) -> Self {
        if !self.inherit_defaults {
            return self;
        }
        for (alias, host) in defaults::builtin_hosts() {
            self.hosts.entry(alias).or_insert(host);
        }
        for (name, routine) in defaults::builtin_routines() {
            self.routines.entry(name).or_insert(routine);
        }
        self
    }

    pub fn routine(&self, name: &str) -> Result<&RoutineConfig> {
        self.routines
            .get(name)
            .ok_or_else(|| Error::routine_not_found(name, self.routines.keys().cloned().collect()))
    }

    pub fn session_factory(&self) -> HostSessionFactory {
        HostSessionFactory::new(self.hosts.clone(), self.transport.clone())
    }

    /// Expand a routine (and its includes) into concrete, validated targets.
    pub fn resolve_routine(&self, name: &str, base_dir: &Path) -> Result<DeploymentRun> {
        let vars = self.build.template_vars(base_dir)?;
        let mut chain = Vec::new();
        self.resolve_into(name, base_dir, &vars, &mut chain)
    }

    fn resolve_into(
        &self,
        name: &str,
        base_dir: &Path,
        vars: &HashMap<String, String>,
        chain: &mut Vec<String>,
    ) -> Result<DeploymentRun> {
        if chain.iter().any(|n| n == name) {
            chain.push(name.to_string());
            return Err(Error::config_invalid_value(
                format!("routines.{}.include", name),
                Some(chain.join(" -> ")),
                "Routine includes form a cycle",
            ));
        }
        chain.push(name.to_string());

        let routine = self.routine(name)?;
        let mut run = DeploymentRun::default();

        for included in &routine.include {
            run = run.then(self.resolve_into(included, base_dir, vars, chain)?);
        }
        for target in &routine.targets {
            run.push(self.resolve_target(target, base_dir, vars)?);
        }

        chain.pop();

        if run.is_empty() {
            return Err(Error::config_invalid_value(
                format!("routines.{}", name),
                None,
                "Routine has no targets",
            ));
        }
        Ok(run)
    }

    fn resolve_target(
        &self,
        target: &TargetConfig,
        base_dir: &Path,
        vars: &HashMap<String, String>,
    ) -> Result<DeployTarget> {
        let host = self.hosts.get(&target.host_alias).ok_or_else(|| {
            Error::host_not_found(&target.host_alias, self.hosts.keys().cloned().collect())
        })?;

        let mut remote_root = template::render_map(&target.remote_root_dir, vars);
        if host.is_local() {
            remote_root = shellexpand::tilde(&remote_root).to_string();
        }

        let mut vars = vars.clone();
        vars.insert(TemplateVars::REMOTE_ROOT.to_string(), remote_root.clone());

        let operations = target
            .operations
            .iter()
            .map(|step| render_step(step, base_dir, &vars, host.is_local()))
            .collect::<Result<Vec<_>>>()?;

        DeployTarget::new(&target.host_alias, remote_root, operations)
    }
}

fn render(field: &str, value: &str, vars: &HashMap<String, String>) -> Result<String> {
    let rendered = template::render_map(value, vars);
    let leftover = template::unresolved(&rendered);
    if !leftover.is_empty() {
        return Err(Error::config_invalid_value(
            field,
            Some(value.to_string()),
            format!("Unknown placeholder(s): {}", leftover.join(", ")),
        ));
    }
    Ok(rendered)
}

fn render_step(
    step: &DeployStep,
    base_dir: &Path,
    vars: &HashMap<String, String>,
    local_host: bool,
) -> Result<DeployStep> {
    let remote = |field: &str, value: &str| -> Result<String> {
        let rendered = render(field, value, vars)?;
        Ok(if local_host {
            shellexpand::tilde(&rendered).to_string()
        } else {
            rendered
        })
    };

    Ok(match step {
        DeployStep::RemoveRemotePath { path } => DeployStep::remove(remote("remove.path", path)?),
        DeployStep::CreateRemoteDir { path } => DeployStep::mkdir(remote("mkdir.path", path)?),
        DeployStep::CopyToRemote { local, remote: dest } => {
            let local = render("copy.local", &local.to_string_lossy(), vars)?;
            DeployStep::copy(resolve_local(base_dir, &local), remote("copy.remote", dest)?)
        }
        DeployStep::RunRemoteCommand { command } => {
            DeployStep::run(render("run.command", command, vars)?)
        }
    })
}

/// Load configuration, falling back to built-in defaults when no file is
/// found. An explicit path that cannot be read is an error.
pub fn load(explicit: Option<&Path>) -> Result<LoadedConfig> {
    let cwd = std::env::current_dir()
        .map_err(|e| Error::internal_io(e.to_string(), Some("current dir".to_string())))?;

    if let Some(path) = explicit {
        let path = resolve_local(&cwd, &path.to_string_lossy());
        return load_from_file(&path);
    }

    let local = cwd.join(paths::CONFIG_FILE_NAME);
    if local.is_file() {
        return load_from_file(&local);
    }

    if let Ok(global) = paths::global_config() {
        if global.is_file() {
            let mut loaded = load_from_file(&global)?;
            // Global config describes hosts and routines, the build runs here.
            loaded.base_dir = cwd;
            return Ok(loaded);
        }
    }

    log_status!("config", "No robodeploy.json found, using built-in defaults");
    Ok(LoadedConfig {
        config: DeployConfig::default(),
        source: None,
        base_dir: cwd,
    })
}

pub fn load_from_file(path: &Path) -> Result<LoadedConfig> {
    let content = fs::read_to_string(path).map_err(|e| {
        Error::internal_io(e.to_string(), Some(format!("read {}", path.display())))
    })?;
    let config = DeployConfig::from_json(&content, &path.display().to_string())?;
    let base_dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    log_status!("config", "Loaded {}", path.display());
    Ok(LoadedConfig {
        config,
        source: Some(path.to_path_buf()),
        base_dir,
    })
}
