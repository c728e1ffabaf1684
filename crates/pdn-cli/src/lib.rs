pub mod cli;
pub mod common;
pub mod config;
pub mod report;

pub use cli::{Cli, Commands, ConfigCommands, ScenarioArg};
pub use config::{OutputConfig, PdnConfig};
