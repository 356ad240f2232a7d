//! Level-of-detail configuration
//!
//! `LodConfig` holds the three tunable clipmap parameters (`K`, `L`, `R`) and
//! the grid sizes derived from `K`. A terrain captures a copy when it is
//! built; changing a parameter means building a new terrain from the new
//! value.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;

/// Smallest accepted detail exponent
pub const K_MIN: u8 = 4;
/// Largest accepted detail exponent
pub const K_MAX: u8 = 10;
/// Smallest accepted number of clipmap levels
pub const L_MIN: u8 = 4;
/// Largest accepted number of clipmap levels
pub const L_MAX: u8 = 12;
/// Smallest accepted number of simultaneously visible levels
pub const R_MIN: u8 = 1;
/// Largest accepted number of simultaneously visible levels
pub const R_MAX: u8 = 8;
/// Bounds for the viewer-height to level-extent ratio
pub const HEIGHT_RATIO_MIN: f32 = 0.05;
pub const HEIGHT_RATIO_MAX: f32 = 4.0;

const DEFAULT_K: u8 = 8;
const DEFAULT_L: u8 = 8;
const DEFAULT_R: u8 = 4;
const DEFAULT_HEIGHT_RATIO: f32 = 0.4;

/// Clipmap level-of-detail parameters.
///
/// Setters never fail: values outside their bounds are clamped. Setting `K`
/// recomputes `D`, `N`, `M`, `D2` and `H` in the same call.
#[derive(Clone, Debug, PartialEq)]
pub struct LodConfig {
    k: u8,
    d: usize,
    n: usize,
    m: usize,
    d2: usize,
    h: i32,
    l: u8,
    r: u8,
    height_ratio: f32,
}

impl Default for LodConfig {
    fn default() -> Self {
        let mut config = Self {
            k: 0,
            d: 0,
            n: 0,
            m: 0,
            d2: 0,
            h: 0,
            l: DEFAULT_L,
            r: DEFAULT_R,
            height_ratio: DEFAULT_HEIGHT_RATIO,
        };
        config.set_k(DEFAULT_K);
        config
    }
}

impl LodConfig {
    /// Build a configuration, clamping each parameter to its bounds
    pub fn new(k: u8, l: u8, r: u8) -> Self {
        let mut config = Self::default();
        config.set_k(k);
        config.set_l(l);
        config.set_r(r);
        config
    }

    pub fn set_k(&mut self, k: u8) {
        self.k = k.clamp(K_MIN, K_MAX);
        self.d = 1usize << self.k;
        self.n = self.d - 1;
        self.m = self.d / 4;
        self.d2 = self.d / 2;
        self.h = -2 * self.m as i32 + 1;
    }

    pub fn set_l(&mut self, l: u8) {
        self.l = l.clamp(L_MIN, L_MAX);
    }

    pub fn set_r(&mut self, r: u8) {
        self.r = r.clamp(R_MIN, R_MAX);
    }

    pub fn set_height_ratio(&mut self, ratio: f32) {
        // NaN would poison every later comparison
        self.height_ratio = if ratio.is_nan() {
            DEFAULT_HEIGHT_RATIO
        } else {
            ratio.clamp(HEIGHT_RATIO_MIN, HEIGHT_RATIO_MAX)
        };
    }

    /// Detail exponent
    pub fn k(&self) -> u8 {
        self.k
    }

    /// Sample grid width of every level, `2^K`
    pub fn d(&self) -> usize {
        self.d
    }

    /// Vertices along one side of a level, `D - 1`
    pub fn n(&self) -> usize {
        self.n
    }

    /// Block footprint size, `D / 4`
    pub fn m(&self) -> usize {
        self.m
    }

    /// Half the sample grid width
    pub fn d2(&self) -> usize {
        self.d2
    }

    /// Offset of a level's bottom-left corner from its centre, `-2M + 1`
    pub fn h(&self) -> i32 {
        self.h
    }

    /// Number of clipmap levels
    pub fn l(&self) -> u8 {
        self.l
    }

    /// Number of levels drawn at once
    pub fn r(&self) -> u8 {
        self.r
    }

    pub fn height_ratio(&self) -> f32 {
        self.height_ratio
    }

    /// Parse a configuration from a TOML string with a `[lod]` table.
    /// Missing keys take their defaults; out-of-range keys are clamped.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let file: LodFile = toml::from_str(s)?;
        Ok(file.lod.into_config())
    }

    /// Load a configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_toml_str(&content)?;
        log::debug!(
            "loaded lod config from {}: K={} L={} R={}",
            path.as_ref().display(),
            config.k,
            config.l,
            config.r
        );
        Ok(config)
    }

    /// Serialize the tunable parameters back to TOML
    pub fn to_toml_string(&self) -> Result<String> {
        let file = LodFile {
            lod: LodSettings {
                k: self.k as i64,
                l: self.l as i64,
                r: self.r as i64,
                height_ratio: self.height_ratio,
            },
        };
        Ok(toml::to_string_pretty(&file)?)
    }

    /// Write the configuration to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct LodFile {
    #[serde(default)]
    lod: LodSettings,
}

/// On-disk form. Integers are read wide so negative or oversized values
/// clamp instead of failing to parse.
#[derive(Serialize, Deserialize)]
#[serde(default)]
struct LodSettings {
    k: i64,
    l: i64,
    r: i64,
    height_ratio: f32,
}

impl Default for LodSettings {
    fn default() -> Self {
        Self {
            k: DEFAULT_K as i64,
            l: DEFAULT_L as i64,
            r: DEFAULT_R as i64,
            height_ratio: DEFAULT_HEIGHT_RATIO,
        }
    }
}

impl LodSettings {
    fn into_config(self) -> LodConfig {
        let narrow = |v: i64| v.clamp(0, u8::MAX as i64) as u8;
        let mut config = LodConfig::new(narrow(self.k), narrow(self.l), narrow(self.r));
        config.set_height_ratio(self.height_ratio);
        config
    }
}
