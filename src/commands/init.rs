//! Initialize a new blog

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;

use crate::config::SiteConfig;

/// Write a default `_config.yml` into `target_dir`
pub fn init_site(target_dir: &Path) -> Result<()> {
    fs::create_dir_all(target_dir)
        .with_context(|| format!("Failed to create {:?}", target_dir))?;

    let config_path = target_dir.join("_config.yml");
    if config_path.exists() {
        bail!("{:?} already exists", config_path);
    }

    fs::write(&config_path, SiteConfig::template())
        .with_context(|| format!("Failed to write {:?}", config_path))?;
    tracing::debug!("Created: {:?}", config_path);

    Ok(())
}
