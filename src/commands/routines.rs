use clap::Args;
use serde::Serialize;

use robodeploy::config;

use super::{CmdResult, GlobalArgs};

#[derive(Args, Debug)]
pub struct RoutinesArgs {}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutineSummary {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub include: Vec<String>,
    pub hosts: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutinesOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_source: Option<String>,
    pub routines: Vec<RoutineSummary>,
    pub hosts: Vec<String>,
}

pub fn run(_args: RoutinesArgs, global: &GlobalArgs) -> CmdResult<RoutinesOutput> {
    let loaded = config::load(global.config.as_deref())?;

    let routines = loaded
        .config
        .routines
        .iter()
        .map(|(name, routine)| RoutineSummary {
            name: name.clone(),
            description: routine.description.clone(),
            include: routine.include.clone(),
            hosts: routine.targets.iter().map(|t| t.host_alias.clone()).collect(),
        })
        .collect();

    Ok((
        RoutinesOutput {
            config_source: loaded.source.map(|p| p.display().to_string()),
            routines,
            hosts: loaded.config.hosts.keys().cloned().collect(),
        },
        0,
    ))
}
