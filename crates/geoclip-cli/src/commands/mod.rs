//! CLI command implementations

pub mod info;
pub mod init_config;
pub mod simulate;

use anyhow::{Context, Result};
use geoclip_core::LodConfig;

/// Where a command gets its LOD parameters from
pub struct LodArgs {
    pub config: Option<String>,
    pub k: Option<u8>,
    pub l: Option<u8>,
    pub r: Option<u8>,
}

impl LodArgs {
    /// Load the config file (or defaults) and apply command-line overrides
    pub fn resolve(&self) -> Result<LodConfig> {
        let mut config = match &self.config {
            Some(path) => LodConfig::load(path)
                .with_context(|| format!("Failed to load config '{}'", path))?,
            None => LodConfig::default(),
        };

        if let Some(k) = self.k {
            config.set_k(k);
        }
        if let Some(l) = self.l {
            config.set_l(l);
        }
        if let Some(r) = self.r {
            config.set_r(r);
        }

        log::info!(
            "using K={} L={} R={} height ratio {}",
            config.k(),
            config.l(),
            config.r(),
            config.height_ratio()
        );
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_are_clamped_on_top_of_defaults() {
        let args = LodArgs {
            config: None,
            k: Some(20),
            l: None,
            r: Some(2),
        };
        let config = args.resolve().unwrap();
        assert_eq!(config.k(), 10);
        assert_eq!(config.l(), 8);
        assert_eq!(config.r(), 2);
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let args = LodArgs {
            config: Some("/nonexistent/geoclip/lod.toml".into()),
            k: None,
            l: None,
            r: None,
        };
        let err = args.resolve().unwrap_err();
        assert!(err.to_string().contains("Failed to load config"));
    }
}
