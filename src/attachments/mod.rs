pub mod compression;
pub mod detection;
pub mod store;
pub mod types;

pub use store::{AttachmentStore, Candidate};
pub use types::{
    Attachment, AttachmentId, AttachmentKind, AttachmentLimits, ImageFormat, TextEncoding,
};
