#![allow(dead_code)]

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use interactive_feedback::i18n::{Catalog, Language, Localizer};
use interactive_feedback::process::ProcessEvent;
use interactive_feedback::session::{FeedbackSession, SessionOptions};

/// Smallest byte sequence `infer` recognises as PNG.
pub const PNG: [u8; 9] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0x00];

pub fn localizer(language: Language) -> Localizer {
    Localizer::new(
        Arc::new(Catalog::builtin().expect("built-in catalog")),
        language,
    )
}

pub fn open_session(dir: &Path) -> Arc<FeedbackSession> {
    open_session_with(dir, |_| {})
}

pub fn open_session_with(
    dir: &Path,
    configure: impl FnOnce(&mut SessionOptions),
) -> Arc<FeedbackSession> {
    let mut options = SessionOptions::new(dir, localizer(Language::En));
    configure(&mut options);
    FeedbackSession::open(options)
}

/// Fail the test instead of hanging on a stuck process.
pub async fn within<F: Future>(future: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(10), future)
        .await
        .expect("operation timed out")
}

/// Wait for a process output line equal to `want`.
pub async fn wait_for_line(
    events: &mut tokio::sync::broadcast::Receiver<ProcessEvent>,
    want: &str,
) {
    within(async {
        loop {
            if let ProcessEvent::Output { line, .. } = events.recv().await.expect("event bus") {
                if line == want {
                    return;
                }
            }
        }
    })
    .await;
}

/// Wait for the next run to be spawned.
pub async fn wait_for_start(events: &mut tokio::sync::broadcast::Receiver<ProcessEvent>) -> u64 {
    within(async {
        loop {
            if let ProcessEvent::Started { run_id, .. } = events.recv().await.expect("event bus") {
                return run_id;
            }
        }
    })
    .await
}
