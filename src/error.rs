use thiserror::Error;

use crate::attachments::types::{AttachmentKind, format_size};
use crate::i18n::{Domain, Language};

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for the feedback core.
///
/// Validation and process failures are recoverable and surface to the
/// operator as localized notices. Submit-once misuse (`SessionError`) is a
/// logic fault returned to the caller.
#[derive(Debug, Error)]
pub enum FeedbackError {
    // ── Localization ────────────────────────────────────────────────────
    #[error("catalog: {0}")]
    Catalog(#[from] CatalogError),

    // ── Attachments ─────────────────────────────────────────────────────
    #[error("attachment: {0}")]
    Validation(#[from] ValidationError),

    // ── Command process ─────────────────────────────────────────────────
    #[error("process: {0}")]
    Process(#[from] ProcessError),

    // ── Session lifecycle ───────────────────────────────────────────────
    #[error("session: {0}")]
    Session(#[from] SessionError),

    // ── Config ──────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─── Catalog errors ──────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("no translation for {domain}.{key} in {language} or the fallback locale")]
    MissingTranslation {
        domain: Domain,
        key: String,
        language: Language,
    },

    #[error("template {domain}.{key} requires placeholder {{{placeholder}}}")]
    MissingPlaceholder {
        domain: Domain,
        key: String,
        placeholder: String,
    },

    #[error("invalid localization resource: {0}")]
    Resource(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Attachment validation errors ────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{filename}: unsupported file type")]
    UnsupportedFormat { filename: String },

    #[error("{filename}: {kind} of {size} bytes exceeds the {limit} byte limit")]
    TooLarge {
        filename: String,
        kind: AttachmentKind,
        size: u64,
        limit: u64,
    },

    #[error("{kind} limit of {limit} reached")]
    LimitReached { kind: AttachmentKind, limit: usize },

    #[error("{filename}: {source}")]
    Unreadable {
        filename: String,
        #[source]
        source: std::io::Error,
    },
}

impl ValidationError {
    /// Catalog key (in the `messages` domain) describing this rejection.
    #[must_use]
    pub fn message_key(&self) -> &'static str {
        match self {
            Self::UnsupportedFormat { .. } => "unsupported_file_type",
            Self::TooLarge {
                kind: AttachmentKind::Image,
                ..
            } => "image_too_large",
            Self::TooLarge {
                kind: AttachmentKind::TextFile,
                ..
            } => "text_file_too_large",
            Self::LimitReached {
                kind: AttachmentKind::Image,
                ..
            } => "max_images_reached",
            Self::LimitReached {
                kind: AttachmentKind::TextFile,
                ..
            } => "max_text_files_reached",
            Self::Unreadable { .. } => "file_read_error",
        }
    }

    /// Placeholder values for [`Self::message_key`].
    #[must_use]
    pub fn message_params(&self) -> Vec<(&'static str, String)> {
        match self {
            Self::TooLarge { limit, .. } => vec![("limit", format_size(*limit))],
            Self::LimitReached { limit, .. } => vec![("limit", limit.to_string())],
            Self::Unreadable { source, .. } => vec![("error", source.to_string())],
            Self::UnsupportedFormat { .. } => Vec::new(),
        }
    }
}

// ─── Process supervisor errors ───────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("command is empty")]
    EmptyCommand,

    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("supervisor worker has shut down")]
    SupervisorClosed,

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Session errors ──────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("feedback has already been submitted")]
    AlreadySubmitted,

    #[error("session is finalized; no further changes are accepted")]
    Finalized,

    #[error("quick reply {index} does not exist ({available} available)")]
    UnknownQuickReply { index: usize, available: usize },
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine a configuration directory")]
    NoConfigDir,

    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Convenience re-exports ─────────────────────────────────────────────────

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, FeedbackError>;
