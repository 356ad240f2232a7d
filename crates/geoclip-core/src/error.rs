//! Error types for geoclip

use thiserror::Error;

/// The main error type for geoclip operations
#[derive(Debug, Error)]
pub enum GeoclipError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(String),

    #[error("TOML serialization error: {0}")]
    TomlSerError(String),

    #[error("Invalid height field: {width}x{depth} needs {expected} samples, got {got}")]
    InvalidHeightField {
        width: usize,
        depth: usize,
        expected: usize,
        got: usize,
    },

    #[error("Device error: {0}")]
    DeviceError(String),

    #[error("Image error: {0}")]
    ImageError(String),
}

/// Result type alias for geoclip operations
pub type Result<T> = std::result::Result<T, GeoclipError>;

impl From<toml::de::Error> for GeoclipError {
    fn from(err: toml::de::Error) -> Self {
        GeoclipError::TomlParseError(err.to_string())
    }
}

impl From<toml::ser::Error> for GeoclipError {
    fn from(err: toml::ser::Error) -> Self {
        GeoclipError::TomlSerError(err.to_string())
    }
}
