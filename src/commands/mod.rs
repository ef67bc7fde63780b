use std::path::PathBuf;

pub type CmdResult<T> = robodeploy::Result<(T, i32)>;

pub(crate) struct GlobalArgs {
    /// Explicit configuration file; otherwise the usual search order applies.
    pub config: Option<PathBuf>,
}

pub mod build;
pub mod deploy;
pub mod plan;
pub mod routines;

macro_rules! dispatch {
    ($args:expr, $global:expr, $module:ident) => {
        crate::output::map_cmd_result_to_json($module::run($args, $global))
    };
}

pub(crate) fn run_json(
    command: crate::Commands,
    global: &GlobalArgs,
) -> (robodeploy::Result<serde_json::Value>, i32) {
    crate::tty::status("robodeploy is working...");

    match command {
        crate::Commands::Deploy(args) => {
            crate::output::map_cmd_result_to_json(deploy::run_routine("deploy", args, global))
        }
        crate::Commands::DeployNetworkProcessor(args) => crate::output::map_cmd_result_to_json(
            deploy::run_routine("deploy-network-processor", args, global),
        ),
        crate::Commands::DeployLocal(args) => {
            crate::output::map_cmd_result_to_json(deploy::run_routine("deploy-local", args, global))
        }
        crate::Commands::Run(args) => dispatch!(args, global, deploy),
        crate::Commands::Plan(args) => dispatch!(args, global, plan),
        crate::Commands::Routines(args) => dispatch!(args, global, routines),
        crate::Commands::Build(args) => dispatch!(args, global, build),
    }
}
