//! Pipeline configuration management.
//!
//! This module provides configuration loading, the global verbose flag, and
//! the per-stage option types. CLI flags are layered on top of whatever the
//! config file supplies.

mod defaults;

pub use defaults::{AcceptanceConfig, Stage1Config, Stage2Config};

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::{OdmError, Result};

// Global verbose flag for progress output
static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Set the global verbose flag.
pub fn set_verbose(verbose: bool) {
    VERBOSE.store(verbose, Ordering::SeqCst);
}

/// Check if verbose mode is enabled.
pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::SeqCst)
}

/// Config file names searched for on disk, in order.
const CONFIG_FILENAMES: &[&str] = &["odm.yml", "odm.yaml"];

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "ODM_CONFIG";

/// Complete configuration file structure.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OdmConfig {
    /// Directory for `odm.log`; logs go to stderr when unset
    pub log_dir: Option<PathBuf>,
    pub stage1: Stage1Config,
    pub stage2: Stage2Config,
}

impl OdmConfig {
    /// Caselist stage 2 reads: explicit value or stage 1's manifest.
    pub fn caselist(&self) -> &Path {
        self.stage2
            .caselist
            .as_deref()
            .unwrap_or(&self.stage1.final_file)
    }

    pub fn validate(&self) -> Result<()> {
        self.stage1.validate()?;
        self.stage2.validate()
    }
}

/// Loaded configuration, where it came from, and anything worth warning about.
pub struct ConfigHandle {
    pub config: OdmConfig,
    pub source: Option<PathBuf>,
    pub warnings: Vec<String>,
}

/// Parse a config file, failing on unreadable or malformed YAML.
pub fn load_config_file(path: &Path) -> Result<OdmConfig> {
    let contents = fs::read_to_string(path).map_err(|e| {
        OdmError::ConfigValidation(format!("Failed to read config {}: {}", path.display(), e))
    })?;
    serde_yaml::from_str(&contents).map_err(|e| {
        OdmError::ConfigValidation(format!("Failed to parse config {}: {}", path.display(), e))
    })
}

/// Search the usual locations and load the first usable config file.
///
/// An explicitly requested path that cannot be read or parsed is an error.
/// Problems with the implicit candidates only produce warnings, after which
/// the built-in defaults are used.
pub fn load_config(custom_path: Option<&Path>) -> Result<ConfigHandle> {
    if let Some(path) = custom_path {
        let config = load_config_file(path)?;
        let source = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        return Ok(ConfigHandle {
            config,
            source: Some(source),
            warnings: Vec::new(),
        });
    }

    let mut warnings = Vec::new();
    for candidate in config_candidates() {
        if !candidate.is_file() {
            continue;
        }
        match load_config_file(&candidate) {
            Ok(config) => {
                let source = fs::canonicalize(&candidate).unwrap_or(candidate);
                return Ok(ConfigHandle {
                    config,
                    source: Some(source),
                    warnings,
                });
            }
            Err(err) => warnings.push(err.to_string()),
        }
    }

    warnings.push("No odm config found; using built-in defaults.".to_string());
    Ok(ConfigHandle {
        config: OdmConfig::default(),
        source: None,
        warnings,
    })
}

/// Get list of config file candidates to try
fn config_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(env_path) = std::env::var(CONFIG_ENV_VAR) {
        candidates.push(PathBuf::from(env_path));
    }

    if let Ok(cwd) = std::env::current_dir() {
        for name in CONFIG_FILENAMES {
            candidates.push(cwd.join("config").join(name));
            candidates.push(cwd.join(name));
        }
    }

    if let Some(home_dir) = dirs::home_dir() {
        for name in CONFIG_FILENAMES {
            candidates.push(home_dir.join("odm").join(name));
        }
    }

    candidates
}

/// Log where the config came from and any warnings collected while loading.
pub fn log_config_source(handle: &ConfigHandle) {
    match &handle.source {
        Some(source) => log::info!("Loaded config from {}", source.display()),
        None => log::info!("Using built-in config defaults"),
    }
    for warning in &handle.warnings {
        log::warn!("Config warning: {}", warning);
    }
}
