use super::types::{FeedbackPayload, ImagePayload, TextFilePayload};
use crate::attachments::{AttachmentKind, AttachmentStore};
use crate::error::SessionError;
use crate::i18n::Localizer;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};

const OPEN: u8 = 0;
const SUBMITTED: u8 = 1;
const CANCELLED: u8 = 2;

/// Final session state handed to [`FeedbackAssembler::submit`].
pub struct SubmitInputs<'a> {
    pub text: &'a str,
    pub attachments: &'a AttachmentStore,
    pub logs: String,
}

/// Builds the feedback payload exactly once.
///
/// The guard is a compare-and-swap on the assembler itself: of any number of
/// concurrent callers, exactly one gets the payload and the rest get
/// `AlreadySubmitted`.
#[derive(Debug)]
pub struct FeedbackAssembler {
    localizer: Localizer,
    state: AtomicU8,
    payload: OnceLock<Arc<FeedbackPayload>>,
}

impl FeedbackAssembler {
    pub fn new(localizer: Localizer) -> Self {
        Self {
            localizer,
            state: AtomicU8::new(OPEN),
            payload: OnceLock::new(),
        }
    }

    pub fn submit(&self, inputs: SubmitInputs<'_>) -> Result<Arc<FeedbackPayload>, SessionError> {
        match self
            .state
            .compare_exchange(OPEN, SUBMITTED, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => {}
            Err(SUBMITTED) => return Err(SessionError::AlreadySubmitted),
            Err(_) => return Err(SessionError::Finalized),
        }

        let payload = Arc::new(self.assemble(&inputs));
        let _ = self.payload.set(Arc::clone(&payload));
        tracing::info!(
            images = payload.images.len(),
            text_files = payload.text_files.len(),
            text_len = payload.interactive_feedback.len(),
            "feedback submitted"
        );
        Ok(payload)
    }

    /// Close without a payload. Returns `false` if already finalized.
    pub fn cancel(&self) -> bool {
        let cancelled = self
            .state
            .compare_exchange(OPEN, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if cancelled {
            tracing::info!("feedback cancelled");
        }
        cancelled
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state.load(Ordering::Acquire) == OPEN
    }

    #[must_use]
    pub fn is_submitted(&self) -> bool {
        self.state.load(Ordering::Acquire) == SUBMITTED
    }

    /// The stored payload, once submit has completed.
    #[must_use]
    pub fn payload(&self) -> Option<Arc<FeedbackPayload>> {
        self.payload.get().cloned()
    }

    fn assemble(&self, inputs: &SubmitInputs<'_>) -> FeedbackPayload {
        let images: Vec<ImagePayload> = inputs
            .attachments
            .of_kind(AttachmentKind::Image)
            .map(ImagePayload::from)
            .collect();
        let text_files: Vec<TextFilePayload> = inputs
            .attachments
            .of_kind(AttachmentKind::TextFile)
            .map(TextFilePayload::from)
            .collect();

        let image_names: Vec<&str> = images.iter().map(|i| i.filename.as_str()).collect();
        let text_names: Vec<&str> = text_files.iter().map(|t| t.filename.as_str()).collect();
        let interactive_feedback =
            compose_feedback(&self.localizer, inputs.text, &image_names, &text_names);

        FeedbackPayload {
            interactive_feedback,
            logs: inputs.logs.clone(),
            images,
            text_files,
        }
    }
}

/// Trimmed free text followed by the localized attachment summary block.
#[must_use]
pub fn compose_feedback(
    localizer: &Localizer,
    text: &str,
    image_names: &[&str],
    text_names: &[&str],
) -> String {
    let text = text.trim();
    if image_names.is_empty() && text_names.is_empty() {
        return text.to_string();
    }

    let mut block = vec![localizer.message("attachments_header", &[])];
    block.extend(category_line(localizer, "attachment_image", image_names));
    block.extend(category_line(localizer, "attachment_text", text_names));
    let block = block.join("\n");

    if text.is_empty() {
        block
    } else {
        format!("{text}\n\n{block}")
    }
}

fn category_line(localizer: &Localizer, prefix: &str, names: &[&str]) -> Option<String> {
    match names {
        [] => None,
        [only] => Some(localizer.message(&format!("{prefix}_single"), &[("filenames", *only)])),
        _ => Some(localizer.message(
            &format!("{prefix}_plural"),
            &[
                ("count", &names.len().to_string()),
                ("filenames", &names.join(", ")),
            ],
        )),
    }
}
