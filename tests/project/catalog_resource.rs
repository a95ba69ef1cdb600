use std::sync::Arc;

use tempfile::TempDir;

use interactive_feedback::error::CatalogError;
use interactive_feedback::i18n::{Catalog, Domain, Language, Localizer};

#[test]
fn exported_resource_reloads_with_identical_lookups() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("i18n.json");
    let builtin = Catalog::builtin().unwrap();
    builtin.export(&path).unwrap();

    let reloaded = Catalog::load(&path).unwrap();
    for language in [Language::En, Language::Zh] {
        assert_eq!(
            reloaded
                .resolve(Domain::Buttons, "send_feedback", language, &[])
                .unwrap(),
            builtin
                .resolve(Domain::Buttons, "send_feedback", language, &[])
                .unwrap()
        );
        assert_eq!(
            reloaded.quick_replies(language),
            builtin.quick_replies(language)
        );
    }
}

#[test]
fn custom_resource_falls_back_to_english_then_marks_missing_keys() {
    let raw = r#"{
        "messages": {
            "en": { "feedback_submitted": "Sent", "process_exited": "exit {code}" },
            "zh": {}
        },
        "quick_replies": { "en": ["OK"] }
    }"#;
    let catalog = Arc::new(Catalog::from_json_str(raw).unwrap());
    let localizer = Localizer::new(Arc::clone(&catalog), Language::Zh);

    assert_eq!(localizer.message("feedback_submitted", &[]), "Sent");
    assert_eq!(localizer.message("process_exited", &[("code", "7")]), "exit 7");
    assert_eq!(localizer.message("no_such_key", &[]), "[messages.no_such_key]");
    assert_eq!(localizer.quick_replies(), vec!["OK".to_string()]);

    assert!(matches!(
        localizer.resolve(Domain::Messages, "no_such_key", &[]),
        Err(CatalogError::MissingTranslation { .. })
    ));
    assert!(matches!(
        localizer.resolve(Domain::Messages, "process_exited", &[]),
        Err(CatalogError::MissingPlaceholder { .. })
    ));
}

#[test]
fn loading_a_missing_resource_is_an_error() {
    let tmp = TempDir::new().unwrap();
    assert!(Catalog::load(&tmp.path().join("absent.json")).is_err());
}
