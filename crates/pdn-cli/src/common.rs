//! Input/output helpers shared by the commands.

use anyhow::{Context, Result};
use clap::ValueEnum;
use pdn_core::Project;
use serde::{Deserialize, Serialize};
use std::io::{self, Read, Write};
use std::path::PathBuf;

/// Output format for command results.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable aligned tables
    #[default]
    Table,
    /// Pretty-printed JSON (pipe-friendly, structured)
    Json,
}

/// Input source that can be a file path or stdin.
#[derive(Clone, Debug)]
pub enum InputSource {
    File(PathBuf),
    /// Specified as "-"
    Stdin,
}

impl InputSource {
    /// Parse from a string argument. "-" means stdin, anything else is a file path.
    pub fn parse(s: &str) -> Self {
        if s == "-" {
            Self::Stdin
        } else {
            Self::File(PathBuf::from(s))
        }
    }

    pub fn read_to_string(&self) -> Result<String> {
        match self {
            Self::File(path) => std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display())),
            Self::Stdin => {
                let mut buf = String::new();
                io::stdin()
                    .read_to_string(&mut buf)
                    .context("failed to read stdin")?;
                Ok(buf)
            }
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::File(path) => path.display().to_string(),
            Self::Stdin => "<stdin>".to_string(),
        }
    }
}

/// Load a project snapshot from a file or stdin.
pub fn load_project(source: &InputSource) -> Result<Project> {
    let contents = source.read_to_string()?;
    Project::from_json_str(&contents)
        .with_context(|| format!("failed to parse project from {}", source.describe()))
}

/// Write data as JSON to the given writer.
pub fn write_json<W: Write, T: Serialize>(
    data: &T,
    writer: &mut W,
    pretty: bool,
) -> io::Result<()> {
    if pretty {
        serde_json::to_writer_pretty(&mut *writer, data).map_err(io::Error::other)?;
    } else {
        serde_json::to_writer(&mut *writer, data).map_err(io::Error::other)?;
    }
    writeln!(writer)?;
    Ok(())
}
