use clap::Args;
use serde::Serialize;

use robodeploy::build::{self, BuildReport};
use robodeploy::config;
use robodeploy::{DeployTarget, Orchestrator, RunReport};

use super::{CmdResult, GlobalArgs};

/// Flags shared by every deploying command.
#[derive(Args, Debug, Default)]
pub struct DeployArgs {
    /// Reuse existing build output instead of running the build command
    #[arg(long)]
    pub skip_build: bool,

    /// Resolve and print the plan without building or touching any host
    #[arg(long)]
    pub dry_run: bool,

    /// Resume a run at this host alias, skipping the targets before it
    #[arg(long, value_name = "HOST")]
    pub from_target: Option<String>,

    /// Do not check local sources before opening each session
    #[arg(long)]
    pub no_preflight: bool,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Routine name from the configuration
    pub routine: String,

    #[command(flatten)]
    pub deploy: DeployArgs,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployOutput {
    pub command: String,
    pub routine: String,
    pub dry_run: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<Vec<DeployTarget>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<RunReport>,
}

pub fn run(args: RunArgs, global: &GlobalArgs) -> CmdResult<DeployOutput> {
    run_routine(&args.routine, args.deploy, global)
}

/// Build (unless skipped) and deploy the named routine.
pub fn run_routine(routine: &str, args: DeployArgs, global: &GlobalArgs) -> CmdResult<DeployOutput> {
    let loaded = config::load(global.config.as_deref())?;

    // Resolve first so configuration mistakes surface before a long build.
    let mut run = loaded.config.resolve_routine(routine, &loaded.base_dir)?;
    if let Some(alias) = &args.from_target {
        run = run.starting_from(alias)?;
    }

    let config_source = loaded.source.as_ref().map(|p| p.display().to_string());

    if args.dry_run {
        return Ok((
            DeployOutput {
                command: "deploy.plan".to_string(),
                routine: routine.to_string(),
                dry_run: true,
                config_source,
                build: None,
                plan: Some(run.targets().to_vec()),
                report: None,
            },
            0,
        ));
    }

    let build_report = build::produce(&loaded.config.build, &loaded.base_dir, args.skip_build)?;

    let factory = loaded.config.session_factory();
    let mut orchestrator = Orchestrator::new(&factory);
    if args.no_preflight {
        orchestrator = orchestrator.without_preflight();
    }

    log_status!("deploy", "Running routine '{}'", routine);
    let report = orchestrator.run(&run)?;

    Ok((
        DeployOutput {
            command: "deploy.run".to_string(),
            routine: routine.to_string(),
            dry_run: false,
            config_source,
            build: Some(build_report),
            plan: None,
            report: Some(report),
        },
        0,
    ))
}
