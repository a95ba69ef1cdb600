use crate::attachments::{Attachment, TextEncoding};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::ser::{SerializeStruct, Serializer};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The terminal artifact of a session. Built once, never mutated.
#[derive(Debug, Clone, Serialize)]
pub struct FeedbackPayload {
    pub interactive_feedback: String,
    /// Output of the latest command run, up to the submit instant.
    pub logs: String,
    pub images: Vec<ImagePayload>,
    pub text_files: Vec<TextFilePayload>,
}

impl FeedbackPayload {
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// An image attachment; serialized with its bytes as a `data:` URL.
#[derive(Debug, Clone)]
pub struct ImagePayload {
    pub filename: String,
    pub mime_type: String,
    pub size: u64,
    pub data: Arc<[u8]>,
}

impl ImagePayload {
    #[must_use]
    pub fn data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime_type,
            STANDARD.encode(&self.data)
        )
    }
}

impl From<&Attachment> for ImagePayload {
    fn from(attachment: &Attachment) -> Self {
        Self {
            filename: attachment.filename.clone(),
            mime_type: attachment.mime_type.clone(),
            size: attachment.size_bytes,
            data: Arc::clone(&attachment.data),
        }
    }
}

impl Serialize for ImagePayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ImagePayload", 4)?;
        state.serialize_field("filename", &self.filename)?;
        state.serialize_field("mime_type", &self.mime_type)?;
        state.serialize_field("size", &self.size)?;
        state.serialize_field("data", &self.data_url())?;
        state.end()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TextFilePayload {
    pub filename: String,
    /// Absolute source path; `None` for content that never lived on disk.
    pub path: Option<String>,
    pub size: u64,
    pub encoding: TextEncoding,
    pub content: String,
}

impl From<&Attachment> for TextFilePayload {
    fn from(attachment: &Attachment) -> Self {
        let (encoding, content) = attachment.text.clone().unwrap_or_else(|| {
            (
                TextEncoding::Utf8,
                String::from_utf8_lossy(&attachment.data).into_owned(),
            )
        });
        Self {
            filename: attachment.filename.clone(),
            path: attachment
                .source_path
                .as_ref()
                .map(|p| p.display().to_string()),
            size: attachment.size_bytes,
            encoding,
            content,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A localized message for the operator, e.g. an attachment rejection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionNotice {
    pub level: NoticeLevel,
    pub message: String,
}

impl SessionNotice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }
}

/// How a session ended, if it has.
#[derive(Debug, Clone, Default)]
pub enum SessionOutcome {
    #[default]
    Pending,
    Submitted(Arc<FeedbackPayload>),
    Cancelled,
}

impl SessionOutcome {
    #[must_use]
    pub fn is_final(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    #[must_use]
    pub fn payload(&self) -> Option<&Arc<FeedbackPayload>> {
        match self {
            Self::Submitted(payload) => Some(payload),
            _ => None,
        }
    }
}

/// What selecting a quick reply did.
#[derive(Debug, Clone)]
pub enum QuickReplyOutcome {
    /// Text replaced; nothing submitted.
    TextSet,
    /// Auto-submit is on and a command is running; submit follows its exit.
    SubmitOnExit,
    Submitted(Arc<FeedbackPayload>),
}
