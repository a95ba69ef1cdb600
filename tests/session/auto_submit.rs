use tempfile::TempDir;

use interactive_feedback::error::SessionError;
use interactive_feedback::session::{QuickReplyOutcome, SessionOutcome};

use crate::session_harness::{open_session, open_session_with, within};

#[tokio::test]
async fn quick_reply_submits_immediately_when_idle() {
    let tmp = TempDir::new().unwrap();
    let session = open_session(tmp.path());
    let replies = session.quick_replies();
    assert!(replies.len() > 1);

    let outcome = session.select_quick_reply(1).await.unwrap();

    let payload = match outcome {
        QuickReplyOutcome::Submitted(payload) => payload,
        other => panic!("expected an immediate submit, got {other:?}"),
    };
    assert_eq!(payload.interactive_feedback, replies[1]);
    assert!(session.outcome().payload().is_some());
}

#[tokio::test]
async fn quick_reply_only_sets_text_without_auto_submit() {
    let tmp = TempDir::new().unwrap();
    let session = open_session(tmp.path());
    session.set_auto_submit(false).unwrap();

    let outcome = session.select_quick_reply(0).await.unwrap();

    assert!(matches!(outcome, QuickReplyOutcome::TextSet));
    assert_eq!(session.feedback_text(), session.quick_replies()[0]);
    assert!(matches!(session.outcome(), SessionOutcome::Pending));
}

#[tokio::test]
async fn unknown_quick_reply_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let session = open_session(tmp.path());
    let available = session.quick_replies().len();

    let err = session.select_quick_reply(available).await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::UnknownQuickReply { index, available: a } if index == available && a == available
    ));
}

#[cfg(unix)]
#[tokio::test]
async fn quick_reply_during_a_run_submits_after_exit() {
    let tmp = TempDir::new().unwrap();
    let session = open_session(tmp.path());
    let mut events = session.subscribe_process();

    session.set_command("sleep 1; echo done").unwrap();
    session.run_command().unwrap();
    crate::session_harness::wait_for_start(&mut events).await;

    let outcome = session.select_quick_reply(0).await.unwrap();
    assert!(matches!(outcome, QuickReplyOutcome::SubmitOnExit));
    assert!(matches!(session.outcome(), SessionOutcome::Pending));

    let SessionOutcome::Submitted(payload) = within(session.wait_outcome()).await else {
        panic!("expected auto-submit after command exit");
    };
    assert_eq!(payload.interactive_feedback, session.quick_replies()[0]);
    assert!(payload.logs.contains("done"));
    assert!(payload.logs.contains("Process exited with code 0"));
}

#[cfg(unix)]
#[tokio::test]
async fn command_runs_on_open_when_configured() {
    let tmp = TempDir::new().unwrap();
    let session = open_session_with(tmp.path(), |options| {
        options.command = "echo on-open".into();
        options.execute_automatically = true;
    });

    within(session.wait_command()).await;

    let run = session.last_run().unwrap();
    assert_eq!(run.command, "echo on-open");
    assert_eq!(run.lines, vec!["on-open".to_string()]);
}

#[cfg(unix)]
#[tokio::test]
async fn exit_without_quick_reply_does_not_submit() {
    let tmp = TempDir::new().unwrap();
    let session = open_session(tmp.path());

    session.set_command("true").unwrap();
    session.run_command().unwrap();
    within(session.wait_command()).await;
    tokio::task::yield_now().await;

    assert!(matches!(session.outcome(), SessionOutcome::Pending));
}

#[cfg(unix)]
#[tokio::test]
async fn quick_reply_right_after_run_waits_for_the_command() {
    let tmp = TempDir::new().unwrap();
    let session = open_session(tmp.path());

    session.set_command("sleep 1; echo done").unwrap();
    session.run_command().unwrap();
    let outcome = session.select_quick_reply(0).await.unwrap();

    assert!(matches!(outcome, QuickReplyOutcome::SubmitOnExit));
    let SessionOutcome::Submitted(payload) = within(session.wait_outcome()).await else {
        panic!("expected auto-submit after command exit");
    };
    assert!(payload.logs.contains("done"));
    assert!(payload.logs.contains("Process exited with code 0"));
}

#[cfg(unix)]
#[tokio::test]
async fn quick_reply_on_open_waits_for_the_automatic_run() {
    let tmp = TempDir::new().unwrap();
    let session = open_session_with(tmp.path(), |options| {
        options.command = "sleep 1; echo finished".into();
        options.execute_automatically = true;
    });

    let outcome = session.select_quick_reply(1).await.unwrap();

    assert!(matches!(outcome, QuickReplyOutcome::SubmitOnExit));
    let SessionOutcome::Submitted(payload) = within(session.wait_outcome()).await else {
        panic!("expected auto-submit after command exit");
    };
    assert!(payload.logs.contains("finished"));
}
