#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::struct_field_names,
    clippy::must_use_candidate,
    clippy::new_without_default,
    clippy::return_self_not_must_use
)]

pub mod attachments;
pub mod config;
pub mod error;
pub mod i18n;
pub mod process;
pub mod session;

pub use attachments::{Attachment, AttachmentId, AttachmentKind, AttachmentStore, Candidate};
pub use config::{Settings, SettingsStore};
pub use error::{FeedbackError, Result};
pub use i18n::{Catalog, Language, Localizer};
pub use process::{CommandSupervisor, ProcessEvent, ProcessState};
pub use session::{FeedbackPayload, FeedbackSession, SessionOptions, SessionOutcome};
