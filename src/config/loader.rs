//! Configuration loading and discovery for `vipp2dfa.toml`
//!
//! Provides functions to find, load, and merge configuration.

use super::schema::{ConverterConfig, SubformMode};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Name of the configuration file
pub const CONFIG_FILE: &str = "vipp2dfa.toml";

/// Configuration loading error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// File I/O error
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error
    #[error("Failed to parse vipp2dfa.toml: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error
    #[error("Config validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Validation(Vec<String>),
}

/// CLI arguments that can override config values
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    /// Override output directory
    pub output_dir: Option<PathBuf>,
    /// Write the conversion report
    pub report: Option<bool>,
    /// Copy referenced resources
    pub copy_resources: Option<bool>,
    /// Number of parallel jobs
    pub jobs: Option<usize>,
    /// Override sub-form wrapping
    pub subform_mode: Option<SubformMode>,
}

/// Find vipp2dfa.toml by walking up from the current working directory.
///
/// Search order:
/// 1. Walk up from current directory looking for vipp2dfa.toml
/// 2. Check XDG_CONFIG_HOME/vipp2dfa/vipp2dfa.toml (or ~/.config/vipp2dfa/vipp2dfa.toml)
pub fn find_config() -> Option<PathBuf> {
    if let Ok(cwd) = env::current_dir() {
        if let Some(path) = find_config_from(cwd) {
            return Some(path);
        }
    }

    find_xdg_config()
}

/// Find vipp2dfa.toml in the XDG config directory.
pub fn find_xdg_config() -> Option<PathBuf> {
    let xdg_config = env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|_| env::var("HOME").map(|h| PathBuf::from(h).join(".config")))
        .ok()?;

    let config_path = xdg_config.join("vipp2dfa").join(CONFIG_FILE);
    if config_path.exists() {
        Some(config_path)
    } else {
        None
    }
}

/// Find vipp2dfa.toml by walking up from a specific directory.
pub fn find_config_from(start: PathBuf) -> Option<PathBuf> {
    let mut current = start;

    loop {
        let config_path = current.join(CONFIG_FILE);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Load configuration from a vipp2dfa.toml file.
///
/// If a path is provided, loads from that file. Otherwise, uses `find_config()`
/// to locate the config file. If no config file is found, returns the default
/// configuration.
///
/// # Example
/// ```ignore
/// let config = load_config(None)?;
/// let config = load_config(Some(Path::new("jobs/vipp2dfa.toml")))?;
/// ```
pub fn load_config(path: Option<&Path>) -> Result<ConverterConfig, ConfigError> {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => find_config(),
    };

    match config_path {
        Some(p) => load_config_file(&p),
        None => Ok(default_config()),
    }
}

/// Load configuration from a specific file path.
fn load_config_file(path: &Path) -> Result<ConverterConfig, ConfigError> {
    debug!("Loading config from {}", path.display());
    let contents = fs::read_to_string(path)?;
    let config: ConverterConfig = toml::from_str(&contents)?;

    let errors = config.validate();
    if !errors.is_empty() {
        return Err(ConfigError::Validation(errors.into_iter().map(|e| e.to_string()).collect()));
    }

    Ok(config)
}

/// Configuration used when no vipp2dfa.toml is found.
pub fn default_config() -> ConverterConfig {
    ConverterConfig::default()
}

/// Merge CLI overrides into a configuration.
///
/// CLI arguments take precedence over config file values.
pub fn merge_cli_overrides(config: &mut ConverterConfig, overrides: &CliOverrides) {
    if let Some(ref dir) = overrides.output_dir {
        config.output.dir = dir.clone();
    }

    if let Some(report) = overrides.report {
        config.output.report = report;
    }

    if let Some(copy_resources) = overrides.copy_resources {
        config.output.copy_resources = copy_resources;
    }

    if let Some(jobs) = overrides.jobs {
        config.output.jobs = Some(jobs);
    }

    if let Some(mode) = overrides.subform_mode {
        config.layout.subform_mode = mode;
    }
}
