use super::assembler::{FeedbackAssembler, SubmitInputs};
use super::types::{FeedbackPayload, QuickReplyOutcome, SessionNotice, SessionOutcome};
use crate::attachments::{
    Attachment, AttachmentId, AttachmentKind, AttachmentLimits, AttachmentStore, Candidate,
};
use crate::attachments::types::format_size;
use crate::error::{FeedbackError, ProcessError, SessionError, ValidationError};
use crate::i18n::{Language, Localizer};
use crate::process::{
    CommandSupervisor, EventReceiver, OutputLine, ProcessEvent, ProcessRun, ProcessState,
    SupervisorOptions,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};
use uuid::Uuid;

/// Compression savings, in percent, worth mentioning in the added notice.
const NOTABLE_COMPRESSION: f64 = 10.0;

/// Everything needed to open a session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub working_dir: PathBuf,
    /// Summary shown to the operator.
    pub prompt: String,
    pub command: String,
    /// Run `command` as soon as the session opens.
    pub execute_automatically: bool,
    pub auto_submit: bool,
    pub limits: AttachmentLimits,
    pub supervisor: SupervisorOptions,
    pub localizer: Localizer,
}

impl SessionOptions {
    pub fn new(working_dir: impl Into<PathBuf>, localizer: Localizer) -> Self {
        Self {
            working_dir: working_dir.into(),
            prompt: String::new(),
            command: String::new(),
            execute_automatically: false,
            auto_submit: true,
            limits: AttachmentLimits::default(),
            supervisor: SupervisorOptions::default(),
            localizer,
        }
    }
}

#[derive(Debug)]
struct SessionState {
    attachments: AttachmentStore,
    text: String,
    quick_reply: Option<usize>,
    auto_submit: bool,
    command: String,
}

/// One feedback interaction: text, attachments and an optional command,
/// ending in exactly one payload or a cancellation.
pub struct FeedbackSession {
    id: Uuid,
    working_dir: PathBuf,
    prompt: String,
    localizer: Localizer,
    state: Mutex<SessionState>,
    supervisor: CommandSupervisor,
    assembler: FeedbackAssembler,
    notices: broadcast::Sender<SessionNotice>,
    outcome: watch::Sender<SessionOutcome>,
}

impl FeedbackSession {
    /// Open a session. Must be called from within a tokio runtime.
    pub fn open(options: SessionOptions) -> Arc<Self> {
        let SessionOptions {
            working_dir,
            prompt,
            command,
            execute_automatically,
            auto_submit,
            limits,
            supervisor,
            localizer,
        } = options;

        let (notices, _) = broadcast::channel(64);
        let (outcome, _) = watch::channel(SessionOutcome::Pending);
        let session = Arc::new(Self {
            id: Uuid::new_v4(),
            working_dir,
            prompt,
            supervisor: CommandSupervisor::spawn(localizer.clone(), supervisor),
            assembler: FeedbackAssembler::new(localizer.clone()),
            localizer,
            state: Mutex::new(SessionState {
                attachments: AttachmentStore::new(limits),
                text: String::new(),
                quick_reply: None,
                auto_submit,
                command,
            }),
            notices,
            outcome,
        });
        tracing::info!(
            session_id = %session.id,
            working_dir = %session.working_dir.display(),
            "feedback session opened"
        );

        spawn_auto_submit(&session);
        if execute_automatically {
            if let Err(err) = session.run_command() {
                tracing::warn!(session_id = %session.id, error = %err, "automatic command run failed");
            }
        }
        session
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn localizer(&self) -> &Localizer {
        &self.localizer
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_open(&self) -> Result<(), SessionError> {
        if self.assembler.is_open() {
            Ok(())
        } else {
            Err(SessionError::Finalized)
        }
    }

    /// Lock the state of a session that is still open.
    ///
    /// Submit and cancel finalize under the same lock, so a mutation made
    /// through this guard can never land after the payload was assembled.
    fn lock_open(&self) -> Result<MutexGuard<'_, SessionState>, SessionError> {
        let state = self.lock();
        self.ensure_open()?;
        Ok(state)
    }

    fn notify(&self, notice: SessionNotice) {
        tracing::debug!(level = %notice.level, message = %notice.message, "session notice");
        let _ = self.notices.send(notice);
    }

    // ── Text ────────────────────────────────────────────────────────────

    pub fn set_feedback_text(&self, text: impl Into<String>) -> Result<(), SessionError> {
        self.lock_open()?.text = text.into();
        Ok(())
    }

    #[must_use]
    pub fn feedback_text(&self) -> String {
        self.lock().text.clone()
    }

    // ── Command ─────────────────────────────────────────────────────────

    pub fn set_command(&self, command: impl Into<String>) -> Result<(), SessionError> {
        self.lock_open()?.command = command.into();
        Ok(())
    }

    #[must_use]
    pub fn command(&self) -> String {
        self.lock().command.clone()
    }

    /// Run the current command text, replacing any active run.
    pub fn run_command(&self) -> Result<(), FeedbackError> {
        let state = self.lock_open()?;
        if state.command.trim().is_empty() {
            self.supervisor.reset_log();
            self.supervisor
                .append_notice(self.localizer.message("enter_command", &[]));
            return Err(ProcessError::EmptyCommand.into());
        }
        self.supervisor.run(&state.command, &self.working_dir)?;
        Ok(())
    }

    /// Stop the active run. Allowed after the session is finalized.
    pub fn stop_command(&self) {
        self.supervisor.stop();
    }

    /// Wait for the active run, if any, to finish.
    pub async fn wait_command(&self) {
        self.supervisor.wait_idle().await;
    }

    #[must_use]
    pub fn process_state(&self) -> ProcessState {
        self.supervisor.state()
    }

    #[must_use]
    pub fn last_run(&self) -> Option<ProcessRun> {
        self.supervisor.last_run()
    }

    #[must_use]
    pub fn output(&self) -> Vec<OutputLine> {
        self.supervisor.output()
    }

    pub fn clear_output(&self) {
        self.supervisor.clear_output();
    }

    pub fn subscribe_process(&self) -> EventReceiver {
        self.supervisor.subscribe()
    }

    // ── Attachments ─────────────────────────────────────────────────────

    pub fn add_attachment(&self, candidate: Candidate) -> Result<Attachment, FeedbackError> {
        let result = self.lock_open()?.attachments.add(candidate);
        self.report_attachment(result)
    }

    /// Read `path` off the caller's thread, then validate it.
    pub async fn add_attachment_path(&self, path: &Path) -> Result<Attachment, FeedbackError> {
        self.ensure_open()?;
        match Candidate::from_path(path).await {
            Ok(candidate) => self.add_attachment(candidate),
            Err(err) => self.report_attachment(Err(err)),
        }
    }

    pub fn add_pasted_image(&self, data: Vec<u8>) -> Result<Attachment, FeedbackError> {
        let result = self.lock_open()?.attachments.add_pasted_image(data);
        self.report_attachment(result)
    }

    fn report_attachment(
        &self,
        result: Result<Attachment, ValidationError>,
    ) -> Result<Attachment, FeedbackError> {
        match result {
            Ok(attachment) => {
                let saved = attachment.compression_ratio();
                let message = match attachment.kind {
                    AttachmentKind::Image if saved > NOTABLE_COMPRESSION => self.localizer.message(
                        "image_added_compressed",
                        &[
                            ("filename", &attachment.filename),
                            ("ratio", &format!("{saved:.0}")),
                        ],
                    ),
                    AttachmentKind::Image => self
                        .localizer
                        .message("image_added", &[("filename", &attachment.filename)]),
                    AttachmentKind::TextFile => self.localizer.message(
                        "text_file_added",
                        &[
                            ("filename", &attachment.filename),
                            ("size", &format_size(attachment.size_bytes)),
                        ],
                    ),
                };
                self.notify(SessionNotice::info(message));
                Ok(attachment)
            }
            Err(err) => {
                let params = err.message_params();
                let params: Vec<(&str, &str)> =
                    params.iter().map(|(k, v)| (*k, v.as_str())).collect();
                let message = self.localizer.message(err.message_key(), &params);
                tracing::info!(error = %err, "attachment rejected");
                self.notify(SessionNotice::warning(message));
                Err(err.into())
            }
        }
    }

    /// Remove an attachment. Unknown ids are a no-op.
    pub fn remove_attachment(&self, id: AttachmentId) -> Result<Option<Attachment>, SessionError> {
        let removed = self.lock_open()?.attachments.remove(id);
        if let Some(attachment) = &removed {
            let message = self
                .localizer
                .message("attachment_removed", &[("filename", &attachment.filename)]);
            self.notify(SessionNotice::info(message));
        }
        Ok(removed)
    }

    #[must_use]
    pub fn attachments(&self) -> Vec<Attachment> {
        self.lock().attachments.iter().cloned().collect()
    }

    // ── Quick replies and auto-submit ───────────────────────────────────

    #[must_use]
    pub fn quick_replies(&self) -> Vec<String> {
        self.localizer.quick_replies()
    }

    /// Replace the feedback text with quick reply `index`.
    ///
    /// With auto-submit on, submits now when no command is running, or after
    /// the running command exits.
    pub async fn select_quick_reply(&self, index: usize) -> Result<QuickReplyOutcome, SessionError> {
        let replies = self.quick_replies();
        let reply = replies
            .get(index)
            .ok_or(SessionError::UnknownQuickReply {
                index,
                available: replies.len(),
            })?
            .clone();

        let auto_submit = {
            let mut state = self.lock_open()?;
            state.text = reply;
            state.quick_reply = Some(index);
            state.auto_submit
        };

        if !auto_submit {
            return Ok(QuickReplyOutcome::TextSet);
        }
        // A run queued just before is only visible once the worker applied it.
        self.supervisor.settle().await;
        if self.supervisor.is_running() {
            tracing::debug!(index, "quick reply armed; submitting on command exit");
            return Ok(QuickReplyOutcome::SubmitOnExit);
        }
        match self.submit().await {
            Ok(payload) => Ok(QuickReplyOutcome::Submitted(payload)),
            // The exit watcher got there first with the same reply.
            Err(SessionError::AlreadySubmitted) => match self.wait_outcome().await {
                SessionOutcome::Submitted(payload) => Ok(QuickReplyOutcome::Submitted(payload)),
                _ => Err(SessionError::AlreadySubmitted),
            },
            Err(err) => Err(err),
        }
    }

    pub fn set_auto_submit(&self, enabled: bool) -> Result<(), SessionError> {
        self.lock_open()?.auto_submit = enabled;
        Ok(())
    }

    #[must_use]
    pub fn auto_submit(&self) -> bool {
        self.lock().auto_submit
    }

    fn auto_submit_armed(&self) -> bool {
        let state = self.lock();
        state.auto_submit && state.quick_reply.is_some()
    }

    /// Switch the language for text resolved from now on.
    pub fn set_language(&self, language: Language) {
        self.localizer.set_language(language);
    }

    // ── Finalization ────────────────────────────────────────────────────

    /// Build the payload. Succeeds at most once per session.
    ///
    /// Pending command controls are applied first; a command that is still
    /// running contributes its output so far.
    pub async fn submit(&self) -> Result<Arc<FeedbackPayload>, SessionError> {
        self.ensure_not_finalized()?;
        self.supervisor.settle().await;

        let payload = {
            let state = self.lock();
            self.assembler.submit(SubmitInputs {
                text: &state.text,
                attachments: &state.attachments,
                logs: self.supervisor.log_text(),
            })?
        };

        self.outcome
            .send_replace(SessionOutcome::Submitted(Arc::clone(&payload)));
        self.notify(SessionNotice::info(
            self.localizer.message("feedback_submitted", &[]),
        ));
        Ok(payload)
    }

    fn ensure_not_finalized(&self) -> Result<(), SessionError> {
        if self.assembler.is_submitted() {
            Err(SessionError::AlreadySubmitted)
        } else {
            self.ensure_open()
        }
    }

    /// Close without submitting. Returns `false` if already finalized.
    pub fn cancel(&self) -> bool {
        let cancelled = {
            let _state = self.lock();
            self.assembler.cancel()
        };
        if cancelled {
            self.outcome.send_replace(SessionOutcome::Cancelled);
        }
        self.supervisor.stop();
        cancelled
    }

    /// Tear the session down: cancel if still open and stop any command.
    pub async fn close(&self) {
        if self.assembler.is_open() {
            self.cancel();
        }
        self.supervisor.shutdown().await;
        tracing::info!(session_id = %self.id, "feedback session closed");
    }

    #[must_use]
    pub fn outcome(&self) -> SessionOutcome {
        self.outcome.borrow().clone()
    }

    /// Wait until the session is submitted or cancelled.
    pub async fn wait_outcome(&self) -> SessionOutcome {
        let mut rx = self.outcome.subscribe();
        match rx.wait_for(SessionOutcome::is_final).await {
            Ok(outcome) => outcome.clone(),
            Err(_) => self.outcome(),
        }
    }

    pub fn subscribe_notices(&self) -> broadcast::Receiver<SessionNotice> {
        self.notices.subscribe()
    }
}

/// Submit when an armed quick reply's command exits.
fn spawn_auto_submit(session: &Arc<FeedbackSession>) {
    let mut events = session.supervisor.subscribe();
    let weak: Weak<FeedbackSession> = Arc::downgrade(session);
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(ProcessEvent::Exited { run_id, code, .. }) => {
                    let Some(session) = weak.upgrade() else {
                        break;
                    };
                    if !session.assembler.is_open() {
                        break;
                    }
                    if session.auto_submit_armed() {
                        tracing::info!(run_id, code, "command exited; auto-submitting feedback");
                        if let Err(err) = session.submit().await {
                            tracing::debug!(error = %err, "auto-submit skipped");
                        }
                        break;
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "auto-submit watcher lagged behind process events");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
}
