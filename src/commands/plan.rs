use clap::Args;
use serde::Serialize;

use robodeploy::config;
use robodeploy::DeployTarget;

use super::{CmdResult, GlobalArgs};

#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Routine name from the configuration
    pub routine: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanOutput {
    pub routine: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub targets: Vec<DeployTarget>,
    pub steps: usize,
}

pub fn run(args: PlanArgs, global: &GlobalArgs) -> CmdResult<PlanOutput> {
    let loaded = config::load(global.config.as_deref())?;
    let description = loaded.config.routine(&args.routine)?.description.clone();
    let run = loaded.config.resolve_routine(&args.routine, &loaded.base_dir)?;

    let targets = run.targets().to_vec();
    let steps = targets.iter().map(|t| t.operations().len()).sum();

    Ok((
        PlanOutput {
            routine: args.routine,
            description,
            targets,
            steps,
        },
        0,
    ))
}
