//! User settings, read from `config.json` in the platform config directory.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::ReportError;
use crate::report::{Field, FieldSelection, Format};

/// Overrides the settings file location.
pub(crate) const CONFIG_ENV: &str = "CASHLOG_CONFIG";

const CONFIG_FILE: &str = "config.json";
const DB_FILE: &str = "cashlog.db";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Settings {
    /// Database file. Defaults to `cashlog.db` in the platform data directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,

    /// Report format used when `--format` is not given.
    #[serde(default = "default_format")]
    pub default_format: String,

    /// Report fields used when `--fields` is not given.
    #[serde(default = "default_fields")]
    pub default_fields: Vec<String>,
}

fn default_format() -> String {
    Format::default().as_str().to_string()
}

fn default_fields() -> Vec<String> {
    FieldSelection::default()
        .fields()
        .iter()
        .map(Field::label)
        .map(str::to_string)
        .collect()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_path: None,
            default_format: default_format(),
            default_fields: default_fields(),
        }
    }
}

impl Settings {
    /// Read settings from `path`. A missing file yields the defaults.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no settings file, using defaults");
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;
        let settings = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse settings file: {}", path.display()))?;
        debug!(path = %path.display(), "settings loaded");
        Ok(settings)
    }

    /// Settings from `$CASHLOG_CONFIG`, or from the platform config directory.
    pub(crate) fn load_default() -> Result<Self> {
        Self::load(&config_path()?)
    }

    /// `explicit` wins, then the configured path, then the platform default.
    /// The parent directory is created if needed.
    pub(crate) fn resolve_database_path(&self, explicit: Option<&Path>) -> Result<PathBuf> {
        let path = match explicit.or(self.database_path.as_deref()) {
            Some(p) => p.to_path_buf(),
            None => project_dirs()?.data_dir().join(DB_FILE),
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create data directory: {}", parent.display()))?;
        }
        Ok(path)
    }

    pub(crate) fn report_format(&self) -> Result<Format, ReportError> {
        Format::parse(&self.default_format)
    }

    pub(crate) fn report_fields(&self) -> Result<FieldSelection, ReportError> {
        FieldSelection::parse(&self.default_fields)
    }
}

fn project_dirs() -> Result<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "cashlog", "CashLog")
        .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))
}

fn config_path() -> Result<PathBuf> {
    match std::env::var_os(CONFIG_ENV) {
        Some(path) if !path.is_empty() => Ok(PathBuf::from(path)),
        _ => Ok(project_dirs()?.config_dir().join(CONFIG_FILE)),
    }
}
