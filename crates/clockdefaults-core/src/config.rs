use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("workspace is not set; pass --workspace or set `workspace` in {}", .0.display())]
    MissingWorkspace(PathBuf),
}

/// Toggles consulted while reconciling defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Settings {
    /// Project, task and tag values may be names instead of ids.
    pub allow_name_for_id: bool,
    /// Tolerate failed name lookups and hand over to the prompt.
    pub interactive: bool,
    /// Name lookups for tags include archived ones.
    pub allow_archived_tags: bool,
}

impl Settings {
    pub fn is_allow_name_for_id(&self) -> bool {
        self.allow_name_for_id
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    pub fn is_allow_archived_tags(&self) -> bool {
        self.allow_archived_tags
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    pub workspace: Option<String>,
    pub allow_name_for_id: bool,
    pub interactive: bool,
    pub allow_archived_tags: bool,
    /// Workspace snapshot used as the lookup service.
    pub catalog: Option<PathBuf>,
    /// Base name of the defaults file, without extension.
    pub defaults_filename: Option<String>,
}

impl ToolConfig {
    pub fn settings(&self) -> Settings {
        Settings {
            allow_name_for_id: self.allow_name_for_id,
            interactive: self.interactive,
            allow_archived_tags: self.allow_archived_tags,
        }
    }

    pub fn workspace_id(&self) -> Result<String, ConfigError> {
        self.workspace
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                ConfigError::MissingWorkspace(global_config_path().unwrap_or_default())
            })
    }
}

pub fn resolve_user_home_dir() -> Option<PathBuf> {
    if let Ok(home) = std::env::var("HOME") {
        let trimmed = home.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }
    if let Ok(profile) = std::env::var("USERPROFILE") {
        let trimmed = profile.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }
    None
}

pub fn resolve_clockdefaults_home_dir() -> Option<PathBuf> {
    if let Ok(value) = std::env::var("CLOCKDEFAULTS_HOME") {
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }
    resolve_user_home_dir().map(|home| home.join(".clockdefaults"))
}

pub fn global_config_path() -> Option<PathBuf> {
    resolve_clockdefaults_home_dir().map(|home| home.join("config.toml"))
}

/// Loads `path`; a missing file yields the built-in defaults.
pub fn load_config(path: &Path) -> Result<ToolConfig, ConfigError> {
    if !path.is_file() {
        return Ok(ToolConfig::default());
    }
    let text = fs::read_to_string(path)?;
    Ok(toml::from_str(&text)?)
}

pub fn load_global_config() -> Result<ToolConfig, ConfigError> {
    match global_config_path() {
        Some(path) => load_config(&path),
        None => Ok(ToolConfig::default()),
    }
}

pub fn write_config(path: &Path, config: &ToolConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let body = toml::to_string_pretty(config)?;
    fs::write(path, body)?;
    Ok(())
}
