//! Default configuration writer

use anyhow::{Context, Result};
use geoclip_core::LodConfig;
use std::path::Path;

pub fn run(path: &str, force: bool) -> Result<()> {
    let target = Path::new(path);

    if target.exists() && !force {
        anyhow::bail!("'{}' already exists (use --force to overwrite)", path);
    }

    LodConfig::default()
        .save(target)
        .with_context(|| format!("Failed to write '{}'", path))?;

    println!("Wrote default clipmap configuration to {}", path);
    Ok(())
}
