use super::schema::{ProjectSettings, Settings};
use crate::error::ConfigError;
use directories::BaseDirs;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "interactive-feedback";
const SETTINGS_FILE: &str = "settings.toml";

/// `<platform config dir>/interactive-feedback/settings.toml`.
pub fn default_settings_path() -> Result<PathBuf, ConfigError> {
    let dirs = BaseDirs::new().ok_or(ConfigError::NoConfigDir)?;
    Ok(dirs.config_dir().join(APP_DIR).join(SETTINGS_FILE))
}

/// Expand a leading `~` in a user-supplied path.
pub fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).into_owned())
}

/// Settings group for a project: `<basename>_<first 8 hex of SHA-256(path)>`.
pub fn project_group_key(project_dir: &Path) -> String {
    let basename = project_dir
        .file_name()
        .map_or_else(|| "project".to_string(), |n| n.to_string_lossy().into_owned());
    let digest = Sha256::digest(project_dir.to_string_lossy().as_bytes());
    let hash = hex::encode(digest);
    format!("{basename}_{}", &hash[..8])
}

/// Settings bound to the file they were loaded from.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
    settings: Settings,
}

impl SettingsStore {
    /// Load settings from `path`.
    ///
    /// A missing file yields defaults. An unreadable or malformed file is
    /// logged and also yields defaults; it is overwritten on the next save.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let settings = match fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str::<Settings>(&contents) {
                Ok(settings) => settings,
                Err(err) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %err,
                        "malformed settings file; using defaults"
                    );
                    Settings::default()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no settings file; using defaults");
                Settings::default()
            }
            Err(err) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %err,
                    "could not read settings file; using defaults"
                );
                Settings::default()
            }
        };
        Self { path, settings }
    }

    pub fn open_default() -> Result<Self, ConfigError> {
        Ok(Self::open(default_settings_path()?))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Per-project settings, or defaults for a project never seen before.
    #[must_use]
    pub fn project(&self, project_dir: &Path) -> ProjectSettings {
        self.settings
            .projects
            .get(&project_group_key(project_dir))
            .cloned()
            .unwrap_or_default()
    }

    pub fn update_project(&mut self, project_dir: &Path, update: impl FnOnce(&mut ProjectSettings)) {
        let entry = self
            .settings
            .projects
            .entry(project_group_key(project_dir))
            .or_default();
        update(entry);
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(&self.settings)?;
        fs::write(&self.path, contents)?;
        tracing::debug!(path = %self.path.display(), "settings saved");
        Ok(())
    }
}
