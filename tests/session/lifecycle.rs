use std::sync::Arc;

use tempfile::TempDir;

use interactive_feedback::attachments::Candidate;
use interactive_feedback::error::{FeedbackError, ProcessError, SessionError};
use interactive_feedback::i18n::Language;
use interactive_feedback::process::ProcessState;
use interactive_feedback::session::{NoticeLevel, SessionOutcome};

use crate::session_harness::{PNG, open_session, wait_for_line, within};

#[tokio::test]
async fn looks_good_with_one_screenshot() {
    let tmp = TempDir::new().unwrap();
    let session = open_session(tmp.path());

    session.set_feedback_text("Looks good").unwrap();
    session
        .add_attachment(Candidate::from_bytes("shot.png", PNG.to_vec()))
        .unwrap();
    let payload = session.submit().await.unwrap();

    assert_eq!(
        payload.interactive_feedback,
        "Looks good\n\n--- Attachments ---\nImage (stored in images field): shot.png"
    );
    let images: Vec<_> = payload.images.iter().map(|i| i.filename.as_str()).collect();
    assert_eq!(images, vec!["shot.png"]);
    assert!(payload.text_files.is_empty());

    match within(session.wait_outcome()).await {
        SessionOutcome::Submitted(stored) => assert!(Arc::ptr_eq(&stored, &payload)),
        other => panic!("expected submitted outcome, got {other:?}"),
    }
    session.close().await;
}

#[tokio::test]
async fn submitting_twice_fails_and_keeps_first_payload() {
    let tmp = TempDir::new().unwrap();
    let session = open_session(tmp.path());

    session.set_feedback_text("first").unwrap();
    let first = session.submit().await.unwrap();
    let err = session.submit().await.unwrap_err();

    assert!(matches!(err, SessionError::AlreadySubmitted));
    let stored = session.outcome().payload().cloned().unwrap();
    assert!(Arc::ptr_eq(&first, &stored));
    assert_eq!(stored.interactive_feedback, "first");
}

#[tokio::test]
async fn mutations_after_submit_are_rejected_but_teardown_is_allowed() {
    let tmp = TempDir::new().unwrap();
    let session = open_session(tmp.path());
    session.submit().await.unwrap();

    assert!(matches!(
        session.set_feedback_text("late"),
        Err(SessionError::Finalized)
    ));
    assert!(matches!(
        session.set_command("echo late"),
        Err(SessionError::Finalized)
    ));
    assert!(matches!(
        session.add_attachment(Candidate::from_bytes("late.png", PNG.to_vec())),
        Err(FeedbackError::Session(SessionError::Finalized))
    ));
    assert!(matches!(
        session.run_command(),
        Err(FeedbackError::Session(SessionError::Finalized))
    ));

    session.stop_command();
    within(session.close()).await;
    assert_eq!(session.process_state(), ProcessState::Idle);
}

#[tokio::test]
async fn cancel_resolves_outcome_and_blocks_submit() {
    let tmp = TempDir::new().unwrap();
    let session = open_session(tmp.path());

    assert!(session.cancel());
    assert!(matches!(
        within(session.wait_outcome()).await,
        SessionOutcome::Cancelled
    ));
    assert!(matches!(
        session.submit().await,
        Err(SessionError::Finalized)
    ));
    assert!(!session.cancel());
}

#[tokio::test]
async fn empty_command_reports_a_hint_in_the_output() {
    let tmp = TempDir::new().unwrap();
    let session = open_session(tmp.path());

    let err = session.run_command().unwrap_err();
    assert!(matches!(
        err,
        FeedbackError::Process(ProcessError::EmptyCommand)
    ));
    let last = session.output().pop().unwrap();
    assert_eq!(last.text, "Please enter a command to run");
}

#[cfg(unix)]
#[tokio::test]
async fn exit_code_is_the_last_output_line() {
    let tmp = TempDir::new().unwrap();
    let session = open_session(tmp.path());

    session.set_command("exit 3").unwrap();
    session.run_command().unwrap();
    within(session.wait_command()).await;

    assert_eq!(
        session.output().last().unwrap().text,
        "Process exited with code 3"
    );
    assert_eq!(session.process_state(), ProcessState::Idle);
    assert_eq!(session.last_run().unwrap().exit_code, Some(3));
}

#[cfg(unix)]
#[tokio::test]
async fn submit_while_running_captures_partial_output() {
    let tmp = TempDir::new().unwrap();
    let session = open_session(tmp.path());
    let mut events = session.subscribe_process();

    session.set_command("echo started; sleep 30").unwrap();
    session.run_command().unwrap();
    wait_for_line(&mut events, "started").await;

    session.set_feedback_text("still running").unwrap();
    let payload = within(session.submit()).await.unwrap();

    assert!(payload.logs.contains("$ echo started; sleep 30"));
    assert!(payload.logs.contains("started"));
    assert!(!payload.logs.contains("Process exited"));

    within(session.close()).await;
    assert_eq!(session.process_state(), ProcessState::Idle);
}

#[tokio::test]
async fn language_switch_applies_to_later_text_only() {
    let tmp = TempDir::new().unwrap();
    let session = open_session(tmp.path());
    let mut notices = session.subscribe_notices();

    session
        .add_attachment(Candidate::from_bytes("a.png", PNG.to_vec()))
        .unwrap();
    let english = notices.recv().await.unwrap();
    assert_eq!(english.message, "Image added: a.png");
    assert_eq!(english.level, NoticeLevel::Info);

    session.set_language(Language::Zh);
    session.set_feedback_text("好").unwrap();
    let payload = session.submit().await.unwrap();

    assert_eq!(english.message, "Image added: a.png");
    assert_eq!(
        payload.interactive_feedback,
        "好\n\n--- 附件 ---\n图片（存储在 images 字段中）：a.png"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn edits_racing_submit_never_land_after_the_payload() {
    let tmp = TempDir::new().unwrap();
    for _ in 0..200 {
        let session = open_session(tmp.path());
        let writer = {
            let session = Arc::clone(&session);
            tokio::task::spawn_blocking(move || {
                let mut n = 0_u32;
                while session.set_feedback_text(format!("edit-{n}")).is_ok() {
                    n += 1;
                }
            })
        };

        let payload = session.submit().await.unwrap();
        within(writer).await.unwrap();

        assert_eq!(payload.interactive_feedback, session.feedback_text());
    }
}

#[cfg(unix)]
#[tokio::test]
async fn payload_logs_cover_only_the_latest_run() {
    let tmp = TempDir::new().unwrap();
    let session = open_session(tmp.path());

    session.set_command("echo first").unwrap();
    session.run_command().unwrap();
    within(session.wait_command()).await;
    session.set_command("echo second").unwrap();
    session.run_command().unwrap();
    within(session.wait_command()).await;

    let payload = session.submit().await.unwrap();
    assert_eq!(
        payload.logs,
        "$ echo second\nsecond\nProcess exited with code 0"
    );
    let shown: Vec<_> = session.output().into_iter().map(|l| l.text).collect();
    assert!(shown.contains(&"first".to_string()));
}
