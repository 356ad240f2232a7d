//! Geoclip Core - Foundational types for the geoclip terrain engine
//!
//! This crate provides the pieces every other geoclip crate depends on:
//! - `LodConfig` - Clipmap level-of-detail parameters and their derived sizes
//! - Error types and Result alias

pub mod config;
mod error;

pub use config::LodConfig;
pub use error::{GeoclipError, Result};
