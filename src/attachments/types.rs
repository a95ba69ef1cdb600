use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Category an accepted attachment is filed under.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AttachmentKind {
    Image,
    TextFile,
}

/// Session-unique attachment identifier, assigned from a monotonic counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AttachmentId(pub u64);

impl fmt::Display for AttachmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "att-{}", self.0)
    }
}

/// Image formats accepted by content signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Bmp,
}

impl ImageFormat {
    #[must_use]
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime {
            "image/png" => Some(Self::Png),
            "image/jpeg" => Some(Self::Jpeg),
            "image/gif" => Some(Self::Gif),
            "image/bmp" => Some(Self::Bmp),
            _ => None,
        }
    }

    #[must_use]
    pub fn mime(self) -> mime::Mime {
        match self {
            Self::Png => mime::IMAGE_PNG,
            Self::Jpeg => mime::IMAGE_JPEG,
            Self::Gif => mime::IMAGE_GIF,
            Self::Bmp => mime::IMAGE_BMP,
        }
    }

    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Gif => "gif",
            Self::Bmp => "bmp",
        }
    }
}

/// Encoding a text attachment was decoded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    Utf8Bom,
    Utf16Le,
    Utf16Be,
    /// A single- or multi-byte legacy encoding picked by the detector,
    /// such as GBK or windows-1252.
    Legacy(&'static encoding_rs::Encoding),
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Utf8 => f.write_str("utf-8"),
            Self::Utf8Bom => f.write_str("utf-8-sig"),
            Self::Utf16Le => f.write_str("utf-16le"),
            Self::Utf16Be => f.write_str("utf-16be"),
            Self::Legacy(encoding) => f.write_str(&encoding.name().to_ascii_lowercase()),
        }
    }
}

impl Serialize for TextEncoding {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Result of content classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Image(ImageFormat),
    Text {
        encoding: TextEncoding,
        content: String,
    },
}

impl Classification {
    #[must_use]
    pub fn kind(&self) -> AttachmentKind {
        match self {
            Self::Image(_) => AttachmentKind::Image,
            Self::Text { .. } => AttachmentKind::TextFile,
        }
    }
}

/// Per-category count and size ceilings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentLimits {
    #[serde(default = "default_max_per_kind")]
    pub max_images: usize,
    #[serde(default = "default_max_per_kind")]
    pub max_text_files: usize,
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: u64,
    #[serde(default = "default_max_text_bytes")]
    pub max_text_bytes: u64,
}

fn default_max_per_kind() -> usize {
    5
}

fn default_max_image_bytes() -> u64 {
    10 * 1_024 * 1_024
}

fn default_max_text_bytes() -> u64 {
    5 * 1_024 * 1_024
}

impl Default for AttachmentLimits {
    fn default() -> Self {
        Self {
            max_images: default_max_per_kind(),
            max_text_files: default_max_per_kind(),
            max_image_bytes: default_max_image_bytes(),
            max_text_bytes: default_max_text_bytes(),
        }
    }
}

impl AttachmentLimits {
    #[must_use]
    pub fn max_count(&self, kind: AttachmentKind) -> usize {
        match kind {
            AttachmentKind::Image => self.max_images,
            AttachmentKind::TextFile => self.max_text_files,
        }
    }

    #[must_use]
    pub fn max_bytes(&self, kind: AttachmentKind) -> u64 {
        match kind {
            AttachmentKind::Image => self.max_image_bytes,
            AttachmentKind::TextFile => self.max_text_bytes,
        }
    }
}

/// One accepted file. Never mutated after creation.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub id: AttachmentId,
    pub kind: AttachmentKind,
    pub filename: String,
    pub mime_type: String,
    pub size_bytes: u64,
    /// Size as offered, before any image compression.
    pub original_size: u64,
    pub data: Arc<[u8]>,
    pub source_path: Option<PathBuf>,
    /// Decoded text and its detected encoding; `None` for images.
    pub text: Option<(TextEncoding, String)>,
    pub validated: bool,
    pub added_at: DateTime<Utc>,
}

impl Attachment {
    #[must_use]
    pub fn is_image(&self) -> bool {
        self.kind == AttachmentKind::Image
    }

    /// Percentage of the offered size saved by compression.
    #[must_use]
    pub fn compression_ratio(&self) -> f64 {
        super::compression::compression_ratio(self.original_size, self.size_bytes)
    }
}

/// Format a byte count the way notices display it: `B`, `KB` or `MB`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_size(bytes: u64) -> String {
    const KIB: u64 = 1_024;
    const MIB: u64 = KIB * 1_024;
    if bytes < KIB {
        format!("{bytes} B")
    } else if bytes < MIB {
        format!("{:.1} KB", bytes as f64 / KIB as f64)
    } else {
        format!("{:.1} MB", bytes as f64 / MIB as f64)
    }
}
