use clap::Args;

use robodeploy::build::{self, BuildReport};
use robodeploy::config;

use super::{CmdResult, GlobalArgs};

#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Only verify existing build output
    #[arg(long)]
    pub check: bool,
}

pub fn run(args: BuildArgs, global: &GlobalArgs) -> CmdResult<BuildReport> {
    let loaded = config::load(global.config.as_deref())?;
    let report = build::produce(&loaded.config.build, &loaded.base_dir, args.check)?;
    Ok((report, 0))
}
