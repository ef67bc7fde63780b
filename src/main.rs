#[macro_use]
extern crate robodeploy;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::GlobalArgs;

mod commands;
mod output;
mod tty;

use commands::{build, deploy, plan, routines};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "robodeploy")]
#[command(version = VERSION)]
#[command(about = "Build and push robot software to its target computers")]
struct Cli {
    /// Configuration file (defaults to ./robodeploy.json, then the global config)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy the controller to the realtime computer
    Deploy(deploy::DeployArgs),
    /// Deploy the controller, then the network processor
    DeployNetworkProcessor(deploy::DeployArgs),
    /// Install into the local home directory
    DeployLocal(deploy::DeployArgs),
    /// Deploy any configured routine
    Run(deploy::RunArgs),
    /// Show the resolved steps of a routine without running them
    Plan(plan::PlanArgs),
    /// List configured routines and hosts
    Routines(routines::RoutinesArgs),
    /// Run the build and verify its artifacts
    Build(build::BuildArgs),
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    let global = GlobalArgs { config: cli.config };

    let (json_result, exit_code) = commands::run_json(cli.command, &global);
    if let Err(err) = output::print_json_result(json_result) {
        eprintln!("{}", err);
    }

    std::process::ExitCode::from(exit_code_to_u8(exit_code))
}

fn exit_code_to_u8(code: i32) -> u8 {
    if code <= 0 {
        0
    } else if code >= 255 {
        255
    } else {
        code as u8
    }
}
