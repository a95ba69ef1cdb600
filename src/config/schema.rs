use crate::attachments::AttachmentLimits;
use crate::i18n::Language;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Persisted settings: window preferences plus per-project command memory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub general: GeneralSettings,

    /// Keyed by [`super::project_group_key`].
    #[serde(default)]
    pub projects: BTreeMap<String, ProjectSettings>,

    #[serde(default)]
    pub attachments: AttachmentLimits,

    #[serde(default)]
    pub process: ProcessConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneralSettings {
    /// Last saved window geometry. `None` until the window is first closed.
    #[serde(default)]
    pub geometry: Option<WindowGeometry>,
    #[serde(default)]
    pub theme: ThemeMode,
    #[serde(default)]
    pub language: LanguagePreference,
    #[serde(default)]
    pub stay_on_top: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowGeometry {
    #[serde(default)]
    pub x: Option<i32>,
    #[serde(default)]
    pub y: Option<i32>,
    pub width: u32,
    pub height: u32,
}

impl WindowGeometry {
    /// Initial size, taller when the command section is shown.
    #[must_use]
    pub fn initial(command_section_visible: bool) -> Self {
        Self {
            x: None,
            y: None,
            width: 500,
            height: if command_section_visible { 1_000 } else { 600 },
        }
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ThemeMode {
    #[default]
    Auto,
    Dark,
    Light,
}

impl ThemeMode {
    /// Next mode in the `auto → dark → light → auto` cycle.
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::Auto => Self::Dark,
            Self::Dark => Self::Light,
            Self::Light => Self::Auto,
        }
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LanguagePreference {
    /// Follow the system locale.
    #[default]
    Auto,
    En,
    Zh,
}

impl From<Language> for LanguagePreference {
    fn from(language: Language) -> Self {
        match language {
            Language::En => Self::En,
            Language::Zh => Self::Zh,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSettings {
    #[serde(default)]
    pub run_command: String,
    #[serde(default)]
    pub execute_automatically: bool,
    #[serde(default = "default_true")]
    pub auto_submit: bool,
    #[serde(default)]
    pub command_section_visible: bool,
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self {
            run_command: String::new(),
            execute_automatically: false,
            auto_submit: default_true(),
            command_section_visible: false,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Command supervisor timing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessConfig {
    #[serde(default = "default_stop_grace_ms")]
    pub stop_grace_ms: u64,
    #[serde(default = "default_output_drain_ms")]
    pub output_drain_ms: u64,
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_stop_grace_ms() -> u64 {
    3_000
}

fn default_output_drain_ms() -> u64 {
    2_000
}

fn default_event_capacity() -> usize {
    1_024
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            stop_grace_ms: default_stop_grace_ms(),
            output_drain_ms: default_output_drain_ms(),
            event_capacity: default_event_capacity(),
        }
    }
}
