use std::{
    env, fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    diagnostics::{DEFAULT_LOG_FILTER, DEFAULT_TRACE_FILE_PREFIX},
    session::{
        DEFAULT_OUTPUT_EXTENSION, DEFAULT_OUTSIDE_TOLERANCE_SECONDS, ExportSettings, NamingMode,
    },
};

pub const CONFIG_FILE_NAME: &str = "regionex.config.toml";
pub const CONFIG_PATH_ENV: &str = "REGIONEX_CONFIG_PATH";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub export: ExportConfig,
    pub diagnostics: DiagnosticsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExportConfig {
    pub trailing_time_seconds: f64,
    pub outside_tolerance_seconds: f64,
    pub use_document_names: bool,
    pub fixed_name: String,
    pub output_extension: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DiagnosticsConfig {
    pub rust_log_filter: String,
    pub trace_file_prefix: String,
    pub logs_dir: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            trailing_time_seconds: 0.0,
            outside_tolerance_seconds: DEFAULT_OUTSIDE_TOLERANCE_SECONDS,
            use_document_names: true,
            fixed_name: "region".to_string(),
            output_extension: DEFAULT_OUTPUT_EXTENSION.to_string(),
        }
    }
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            rust_log_filter: DEFAULT_LOG_FILTER.to_string(),
            trace_file_prefix: DEFAULT_TRACE_FILE_PREFIX.to_string(),
            logs_dir: PathBuf::from("logs"),
        }
    }
}

impl ExportConfig {
    #[must_use]
    pub fn settings(&self) -> ExportSettings {
        ExportSettings {
            trailing_time_seconds: self.trailing_time_seconds,
            outside_tolerance_seconds: self.outside_tolerance_seconds,
            naming: if self.use_document_names {
                NamingMode::Document
            } else {
                NamingMode::Fixed(self.fixed_name.clone())
            },
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let config_path = discover_config_path().with_context(|| {
            format!("failed to locate {CONFIG_FILE_NAME}; looked in cwd and parent directory")
        })?;
        Self::load_from(&config_path)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        let content = fs::read_to_string(config_path)
            .with_context(|| format!("failed to read config file {}", config_path.display()))?;
        let config = Self::from_toml(&content).with_context(|| {
            format!("failed to parse config TOML from {}", config_path.display())
        })?;
        debug!(path = %config_path.display(), "config loaded");
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

fn discover_config_path() -> Result<PathBuf> {
    if let Some(path) = env::var_os(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.is_file() {
            return Ok(path);
        }
    }

    let cwd = env::current_dir().context("failed to resolve current directory")?;
    let candidates = [
        cwd.join(CONFIG_FILE_NAME),
        cwd.join("..").join(CONFIG_FILE_NAME),
    ];

    candidates
        .into_iter()
        .find(|path| path.is_file())
        .ok_or_else(|| anyhow::anyhow!("{CONFIG_FILE_NAME} not found"))
}
