use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Result};
use pdn_cli::PdnConfig;
use tracing::info;

pub fn show(config: &PdnConfig) -> Result<()> {
    print!("{}", config.to_toml()?);
    Ok(())
}

/// Write the default settings to `explicit` or `~/.pdn/config.toml`.
pub fn init(explicit: Option<&Path>, force: bool) -> Result<()> {
    let path: PathBuf = match explicit {
        Some(path) => path.to_path_buf(),
        None => PdnConfig::config_path().ok_or_else(|| anyhow!("cannot determine home directory"))?,
    };
    if path.exists() && !force {
        bail!("{} already exists; pass --force to overwrite", path.display());
    }
    PdnConfig::default().save_to(&path)?;
    info!("Wrote {}", path.display());
    println!("{}", path.display());
    Ok(())
}
