use std::io::{self, Write};

use anyhow::{Context, Result};
use pdn_cli::common::{write_json, InputSource, OutputFormat};
use pdn_core::{resolve_efficiency_with, EfficiencyModel, EngineConfig, OperatingPoint};
use serde::Serialize;
use tracing::warn;

#[derive(Serialize)]
struct Preview {
    eta: f64,
    /// Why the default was used, if it was
    fallback: Option<String>,
}

/// Operating point from the command-line figures; `pout` defaults to `iout * vout`.
pub fn point(iout: f64, vout: f64, pout: Option<f64>, phases: u32) -> OperatingPoint {
    OperatingPoint::new(pout.unwrap_or(iout * vout), iout, vout).with_phases(phases)
}

pub fn handle(
    model: &str,
    op: OperatingPoint,
    engine: &EngineConfig,
    format: OutputFormat,
) -> Result<()> {
    let source = InputSource::parse(model);
    let contents = source.read_to_string()?;
    let model: EfficiencyModel = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse efficiency model from {}", source.describe()))?;

    let resolution = resolve_efficiency_with(&model, &op, engine);
    if let Some(err) = &resolution.fallback {
        warn!("model unusable ({err}); using default {}", resolution.eta);
    }
    let preview = Preview {
        eta: resolution.eta,
        fallback: resolution.fallback.map(|err| err.to_string()),
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match format {
        OutputFormat::Json => write_json(&preview, &mut out, false)?,
        OutputFormat::Table => writeln!(out, "eta = {:.4}", preview.eta)?,
    }
    Ok(())
}
