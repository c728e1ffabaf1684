use clap::{Args, Parser, Subcommand, ValueEnum, ValueHint};
use pdn_core::Scenario;
use std::path::PathBuf;

use crate::common::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "pdn", author, version, about, long_about = None)]
pub struct Cli {
    /// Set the logging level
    #[arg(long, default_value = "info", global = true)]
    pub log_level: tracing::Level,

    /// Settings file (defaults to ~/.pdn/config.toml)
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Evaluate a project and print per-node and per-edge results
    Compute(ProjectArgs),
    /// Print load and loss roll-ups across all subsystem levels
    Aggregate(ProjectArgs),
    /// Preview an efficiency model at one operating point
    Efficiency {
        /// Efficiency model JSON file ("-" for stdin)
        #[arg(value_hint = ValueHint::FilePath)]
        model: String,
        /// Total output current (A)
        #[arg(long)]
        iout: f64,
        /// Output voltage (V), used by table models
        #[arg(long, default_value_t = 0.0)]
        vout: f64,
        /// Output power (W); defaults to iout * vout
        #[arg(long)]
        pout: Option<f64>,
        /// Number of phases sharing the current
        #[arg(long, default_value_t = 1)]
        phases: u32,
        /// Output format
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },
    /// Inspect or create the settings file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Args, Debug, Clone)]
pub struct ProjectArgs {
    /// Project snapshot JSON file ("-" for stdin)
    #[arg(value_hint = ValueHint::FilePath)]
    pub project: String,
    /// Override the project's current scenario
    #[arg(long, value_enum)]
    pub scenario: Option<ScenarioArg>,
    /// Output format (defaults to the configured one)
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the effective settings as TOML
    Show,
    /// Write the default settings file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScenarioArg {
    Typical,
    Max,
    Idle,
}

impl From<ScenarioArg> for Scenario {
    fn from(arg: ScenarioArg) -> Self {
        match arg {
            ScenarioArg::Typical => Scenario::Typical,
            ScenarioArg::Max => Scenario::Max,
            ScenarioArg::Idle => Scenario::Idle,
        }
    }
}
