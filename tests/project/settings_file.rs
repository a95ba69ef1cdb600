use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use interactive_feedback::attachments::Candidate;
use interactive_feedback::config::{
    LanguagePreference, SettingsStore, ThemeMode, project_group_key,
};
use interactive_feedback::i18n::{Catalog, Language, Localizer};
use interactive_feedback::process::SupervisorOptions;
use interactive_feedback::session::{FeedbackSession, SessionOptions};

const PNG: [u8; 9] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0x00];

#[test]
fn hand_written_settings_file_is_honoured() {
    let tmp = TempDir::new().unwrap();
    let project = tmp.path().join("app");
    let key = project_group_key(&project);
    let path = tmp.path().join("settings.toml");
    std::fs::write(
        &path,
        format!(
            r#"
[general]
theme = "light"
language = "zh"
stay_on_top = true

[projects.{key}]
run_command = "cargo test"
execute_automatically = true
auto_submit = false

[process]
stop_grace_ms = 500
"#
        ),
    )
    .unwrap();

    let store = SettingsStore::open(&path);
    let settings = store.settings();
    assert_eq!(settings.general.theme, ThemeMode::Light);
    assert_eq!(settings.general.language, LanguagePreference::Zh);
    assert!(settings.general.stay_on_top);

    let p = store.project(&project);
    assert_eq!(p.run_command, "cargo test");
    assert!(p.execute_automatically);
    assert!(!p.auto_submit);

    let options = SupervisorOptions::from(&settings.process);
    assert_eq!(options.grace_period, Duration::from_millis(500));
    assert_eq!(options.drain_timeout, Duration::from_secs(2));
}

#[test]
fn malformed_settings_fall_back_and_are_replaced_on_save() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("settings.toml");
    std::fs::write(&path, "this is = = not toml").unwrap();

    let mut store = SettingsStore::open(&path);
    assert_eq!(store.settings().general.theme, ThemeMode::Auto);

    store.settings_mut().general.theme = ThemeMode::Auto.toggled();
    store.save().unwrap();

    let reloaded = SettingsStore::open(&path);
    assert_eq!(reloaded.settings().general.theme, ThemeMode::Dark);
}

#[tokio::test]
async fn attachment_limits_from_settings_reach_the_session() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("settings.toml");
    std::fs::write(&path, "[attachments]\nmax_images = 1\n").unwrap();
    let store = SettingsStore::open(&path);

    let localizer = Localizer::new(Arc::new(Catalog::builtin().unwrap()), Language::En);
    let session = FeedbackSession::open(SessionOptions {
        limits: store.settings().attachments,
        supervisor: (&store.settings().process).into(),
        ..SessionOptions::new(tmp.path(), localizer)
    });

    session
        .add_attachment(Candidate::from_bytes("a.png", PNG.to_vec()))
        .unwrap();
    assert!(
        session
            .add_attachment(Candidate::from_bytes("b.png", PNG.to_vec()))
            .is_err()
    );
}
