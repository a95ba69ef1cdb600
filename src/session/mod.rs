pub mod assembler;
pub mod feedback;
pub mod types;

pub use assembler::{FeedbackAssembler, SubmitInputs, compose_feedback};
pub use feedback::{FeedbackSession, SessionOptions};
pub use types::{
    FeedbackPayload, ImagePayload, NoticeLevel, QuickReplyOutcome, SessionNotice, SessionOutcome,
    TextFilePayload,
};
