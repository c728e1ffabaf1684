pub mod aggregate;
pub mod compute;
pub mod config;
pub mod efficiency;

use anyhow::Result;
use pdn_cli::cli::ProjectArgs;
use pdn_cli::common::{load_project, InputSource};
use pdn_core::Project;
use tracing::info;

/// Load the project named on the command line and apply `--scenario`.
fn open_project(args: &ProjectArgs) -> Result<Project> {
    let source = InputSource::parse(&args.project);
    let mut project = load_project(&source)?;
    if let Some(scenario) = args.scenario {
        project.current_scenario = scenario.into();
    }
    info!(
        "Loaded {}: {} ({})",
        source.describe(),
        project.stats(),
        project.current_scenario
    );
    Ok(project)
}
