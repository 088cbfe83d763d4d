//! Configuration file support for xcapture.
//!
//! Two configuration file locations are consulted:
//! - Global: `~/.xcapture/config.toml` - User-wide defaults
//! - Project: `.xcapture/config.toml` - Project-specific overrides
//!
//! Project config takes precedence over global config. Command-line flags
//! are applied on top by the binary.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Settings for one capture session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CaptureConfig {
    /// Dump full failure detail when the build fails
    pub debug: bool,

    /// Directory the wrappers write capture results into
    pub results_dir: Option<PathBuf>,

    /// Extra arguments forwarded to the capture front end
    pub frontend_args: Vec<String>,

    /// Toolchain selector used to locate the native compiler
    pub xcrun: PathBuf,

    /// Build driver queried for its version banner
    pub xcodebuild: PathBuf,

    /// Additional variables exported to the build
    pub env: BTreeMap<String, String>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        CaptureConfig {
            debug: false,
            results_dir: None,
            frontend_args: Vec::new(),
            xcrun: PathBuf::from("xcrun"),
            xcodebuild: PathBuf::from("xcodebuild"),
            env: BTreeMap::new(),
        }
    }
}

/// On-disk layer: every field optional, so absent keys don't clobber
/// values from a lower-precedence file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ConfigLayer {
    debug: Option<bool>,
    results_dir: Option<PathBuf>,
    frontend_args: Option<Vec<String>>,
    xcrun: Option<PathBuf>,
    xcodebuild: Option<PathBuf>,
    env: BTreeMap<String, String>,
}

impl ConfigLayer {
    fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config: {}", path.display()))
    }
}

impl CaptureConfig {
    /// Merge a layer into this config (layer takes precedence).
    fn merge(&mut self, layer: ConfigLayer) {
        if let Some(debug) = layer.debug {
            self.debug = debug;
        }
        if layer.results_dir.is_some() {
            self.results_dir = layer.results_dir;
        }
        if let Some(args) = layer.frontend_args {
            self.frontend_args = args;
        }
        if let Some(xcrun) = layer.xcrun {
            self.xcrun = xcrun;
        }
        if let Some(xcodebuild) = layer.xcodebuild {
            self.xcodebuild = xcodebuild;
        }
        self.env.extend(layer.env);
    }

    /// Merge a config file into this one, if it exists.
    pub fn merge_file(&mut self, path: &Path) -> Result<()> {
        if path.exists() {
            let layer = ConfigLayer::load(path)?;
            tracing::debug!("Loaded config from {}", path.display());
            self.merge(layer);
        }
        Ok(())
    }
}

/// Load configuration from global and project paths.
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Result<CaptureConfig> {
    let mut config = CaptureConfig::default();

    if let Some(global) = global_path {
        config.merge_file(global)?;
    }

    // Project config overrides global
    config.merge_file(project_path)?;

    Ok(config)
}

/// Get the global xcapture config directory (~/.xcapture).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".xcapture"))
}

/// Get the global config path (~/.xcapture/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path (.xcapture/config.toml).
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(".xcapture").join("config.toml")
}
