pub mod loader;
pub mod schema;

pub use loader::{SettingsStore, default_settings_path, expand_path, project_group_key};
pub use schema::{
    GeneralSettings, LanguagePreference, ProcessConfig, ProjectSettings, Settings, ThemeMode,
    WindowGeometry,
};
