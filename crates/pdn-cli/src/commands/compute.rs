use std::io;

use anyhow::Result;
use pdn_cli::cli::ProjectArgs;
use pdn_cli::common::{write_json, OutputFormat};
use pdn_cli::report::{write_compute, Style};
use pdn_cli::PdnConfig;
use pdn_core::compute_with_config;
use tracing::{info, warn};

use super::open_project;

pub fn handle(args: &ProjectArgs, config: &PdnConfig) -> Result<()> {
    let project = open_project(args)?;
    let result = compute_with_config(&project, &config.engine);

    if result.has_fatal() {
        warn!("evaluation reported {}", result.global_warnings.summary());
    } else {
        info!(
            "Source power {:.4} W, load power {:.4} W",
            result.totals.source_power, result.totals.load_power
        );
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match args.format.unwrap_or(config.output.format) {
        OutputFormat::Json => write_json(&result, &mut out, true)?,
        OutputFormat::Table => {
            let style = Style::new(config.output.decimal_places, project.units);
            write_compute(&mut out, &project, &result, &style)?;
        }
    }
    Ok(())
}
