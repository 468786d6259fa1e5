//! Project configuration loaded from `.spec-mix/config.json`.
//!
//! The same file carries settings owned by other tools (language, mission),
//! so unknown keys are ignored rather than rejected.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{BoardError, Result};

/// Workflow mode of the project.
///
/// Unknown values fall back to `pro` with a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectMode {
    #[default]
    Pro,
    Normal,
}

impl<'de> Deserialize<'de> for ProjectMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(match value.as_str() {
            Some("pro") => Self::Pro,
            Some("normal") => Self::Normal,
            _ => {
                tracing::warn!(mode = %value, "unknown project mode, using default");
                Self::default()
            }
        })
    }
}

impl fmt::Display for ProjectMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pro => f.write_str("pro"),
            Self::Normal => f.write_str("normal"),
        }
    }
}

/// Settings for board and history queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Branch scanned for untracked commits.
    pub branch: String,

    /// Maximum number of recent commits scanned for untracked work.
    pub untracked_limit: usize,

    /// Upper bound on a single query in the host, in milliseconds.
    pub git_timeout_ms: u64,

    /// Keep parsed boards in memory between queries.
    pub cache: bool,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            branch: "HEAD".to_string(),
            untracked_limit: 100,
            git_timeout_ms: 30_000,
            cache: true,
        }
    }
}

/// Project configuration loaded from .spec-mix/config.json
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub mode: ProjectMode,

    pub dashboard: DashboardConfig,
}

impl ProjectConfig {
    /// Load configuration from a project directory.
    ///
    /// A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns `BoardError::Config` if the file exists but cannot be read or
    /// parsed.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let path = Self::config_path(project_dir);
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|e| {
            BoardError::config_with_path(format!("failed to read config: {e}"), path.clone())
        })?;
        let config: ProjectConfig = serde_json::from_str(&content).map_err(|e| {
            BoardError::config_with_path(format!("failed to parse config: {e}"), path.clone())
        })?;

        tracing::debug!(path = %path.display(), mode = %config.mode, "loaded project config");
        Ok(config)
    }

    /// Like [`ProjectConfig::load`], but a broken file only logs a warning.
    #[must_use]
    pub fn load_or_default(project_dir: &Path) -> Self {
        Self::load(project_dir).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "using default project config");
            Self::default()
        })
    }

    /// Get the config.json path for a project
    pub fn config_path(project_dir: &Path) -> PathBuf {
        project_dir.join(".spec-mix/config.json")
    }
}
