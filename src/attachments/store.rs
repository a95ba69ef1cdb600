use super::compression;
use super::detection::{classify, text_mime_from_extension};
use super::types::{
    Attachment, AttachmentId, AttachmentKind, AttachmentLimits, Classification, ImageFormat,
};
use crate::error::ValidationError;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A file offered for attachment, before validation.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub filename: String,
    pub data: Vec<u8>,
    pub source_path: Option<PathBuf>,
}

impl Candidate {
    pub fn from_bytes(filename: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            data,
            source_path: None,
        }
    }

    /// Read `path` without blocking the caller's thread.
    pub async fn from_path(path: &Path) -> Result<Self, ValidationError> {
        let filename = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        let data = tokio::fs::read(path)
            .await
            .map_err(|source| ValidationError::Unreadable {
                filename: filename.clone(),
                source,
            })?;
        let source_path = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
        Ok(Self {
            filename,
            data,
            source_path: Some(source_path),
        })
    }
}

/// Validates candidates and keeps accepted attachments in insertion order.
#[derive(Debug)]
pub struct AttachmentStore {
    limits: AttachmentLimits,
    items: Vec<Attachment>,
    next_id: u64,
    pasted: u64,
}

impl AttachmentStore {
    pub fn new(limits: AttachmentLimits) -> Self {
        Self {
            limits,
            items: Vec::new(),
            next_id: 1,
            pasted: 0,
        }
    }

    #[must_use]
    pub fn limits(&self) -> &AttachmentLimits {
        &self.limits
    }

    /// Validate `candidate` and append it on success.
    ///
    /// Checks run in a fixed order: content classification, size ceiling for
    /// the detected category, then the per-category count. Accepted images
    /// are then downscaled and re-encoded, which may change the extension.
    pub fn add(&mut self, candidate: Candidate) -> Result<Attachment, ValidationError> {
        let Candidate {
            filename,
            data,
            source_path,
        } = candidate;

        let classification =
            classify(&data).ok_or_else(|| ValidationError::UnsupportedFormat {
                filename: filename.clone(),
            })?;
        let kind = classification.kind();

        let size = data.len() as u64;
        let max_bytes = self.limits.max_bytes(kind);
        if size > max_bytes {
            return Err(ValidationError::TooLarge {
                filename,
                kind,
                size,
                limit: max_bytes,
            });
        }

        let max_count = self.limits.max_count(kind);
        if self.count(kind) >= max_count {
            return Err(ValidationError::LimitReached {
                kind,
                limit: max_count,
            });
        }

        let (filename, data, mime_type, text) = match classification {
            Classification::Image(format) => match compression::compress(&data, format) {
                Some(compressed) => (
                    with_extension(&filename, compressed.format.extension()),
                    compressed.data,
                    compressed.format.mime().to_string(),
                    None,
                ),
                None => (filename, data, format.mime().to_string(), None),
            },
            Classification::Text { encoding, content } => {
                let mime_type = text_mime_from_extension(&filename).to_string();
                (filename, data, mime_type, Some((encoding, content)))
            }
        };

        let attachment = Attachment {
            id: AttachmentId(self.next_id),
            kind,
            filename,
            mime_type,
            size_bytes: data.len() as u64,
            original_size: size,
            data: Arc::from(data),
            source_path,
            text,
            validated: true,
            added_at: chrono::Utc::now(),
        };
        self.next_id += 1;
        tracing::debug!(
            id = %attachment.id,
            kind = %attachment.kind,
            filename = %attachment.filename,
            size = attachment.size_bytes,
            "attachment accepted"
        );
        self.items.push(attachment.clone());
        Ok(attachment)
    }

    /// Accept clipboard image data that has no filename of its own.
    pub fn add_pasted_image(&mut self, data: Vec<u8>) -> Result<Attachment, ValidationError> {
        let ext = super::detection::detect_image_format(&data).map_or("png", ImageFormat::extension);
        let filename = format!("pasted_image_{}.{ext}", self.pasted + 1);
        let attachment = self.add(Candidate::from_bytes(filename, data))?;
        self.pasted += 1;
        Ok(attachment)
    }

    /// Remove `id` if present. Absent ids are a no-op.
    pub fn remove(&mut self, id: AttachmentId) -> Option<Attachment> {
        let index = self.items.iter().position(|a| a.id == id)?;
        Some(self.items.remove(index))
    }

    #[must_use]
    pub fn get(&self, id: AttachmentId) -> Option<&Attachment> {
        self.items.iter().find(|a| a.id == id)
    }

    #[must_use]
    pub fn count(&self, kind: AttachmentKind) -> usize {
        self.items.iter().filter(|a| a.kind == kind).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attachment> {
        self.items.iter()
    }

    pub fn of_kind(&self, kind: AttachmentKind) -> impl Iterator<Item = &Attachment> {
        self.items.iter().filter(move |a| a.kind == kind)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

/// `name` with its extension replaced by `ext`.
fn with_extension(name: &str, ext: &str) -> String {
    let stem = Path::new(name)
        .file_stem()
        .map_or_else(|| name.to_string(), |s| s.to_string_lossy().into_owned());
    format!("{stem}.{ext}")
}
