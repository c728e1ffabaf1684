use std::io;

use anyhow::Result;
use pdn_cli::cli::ProjectArgs;
use pdn_cli::common::{write_json, OutputFormat};
use pdn_cli::report::{write_aggregates, Style};
use pdn_cli::PdnConfig;
use pdn_core::compute_deep_aggregates_with_config;

use super::open_project;

pub fn handle(args: &ProjectArgs, config: &PdnConfig) -> Result<()> {
    let project = open_project(args)?;
    let aggregates = compute_deep_aggregates_with_config(&project, &config.engine);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match args.format.unwrap_or(config.output.format) {
        OutputFormat::Json => write_json(&aggregates, &mut out, true)?,
        OutputFormat::Table => {
            let style = Style::new(config.output.decimal_places, project.units);
            write_aggregates(&mut out, &aggregates, &style)?;
        }
    }
    Ok(())
}
