//! Translation of capacity expansion model generator data for production cost models.
//!
//! Generator records are classified into model classes and assigned reserve contributions using a
//! single, immutable [`config::Configuration`].
#![warn(missing_docs)]
use std::path::PathBuf;

pub mod cli;
pub mod column;
pub mod config;
pub mod generator;
pub mod id;
pub mod input;
pub mod log;
pub mod output;
pub mod reserve;
pub mod resolve;
pub mod settings;
pub mod technology;
pub mod units;

#[cfg(test)]
mod fixture;

/// Get the config folder for the program.
///
/// This will be a subfolder of the platform's config folder (e.g. `~/.config/r2x` on Linux). If
/// the platform has no config folder, the current directory is used.
pub fn get_r2x_config_dir() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_default();
    path.push("r2x");

    path
}
