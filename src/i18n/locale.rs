use super::Language;
use crate::config::LanguagePreference;

/// Environment variable that overrides every other language source.
pub const LANGUAGE_ENV_VAR: &str = "IFEEDBACK_LANG";

fn detect_system_locale() -> Option<String> {
    std::env::var("LANG")
        .or_else(|_| std::env::var("LC_MESSAGES"))
        .ok()
        .map(|lang| lang.trim().to_lowercase())
        .filter(|lang| !lang.is_empty())
}

/// Detect language: `IFEEDBACK_LANG` env -> saved preference -> system `LANG` -> English.
pub fn detect_language(preference: LanguagePreference) -> Language {
    if let Ok(lang) = std::env::var(LANGUAGE_ENV_VAR) {
        let lang = lang.trim().to_lowercase();
        if !lang.is_empty() {
            return language_from_locale(&lang);
        }
    }

    match preference {
        LanguagePreference::En => return Language::En,
        LanguagePreference::Zh => return Language::Zh,
        LanguagePreference::Auto => {}
    }

    detect_system_locale().map_or(Language::En, |locale| language_from_locale(&locale))
}

/// Normalise `"zh_CN.UTF-8"` -> `"zh"`, `"en_US"` -> `"en"`, passthrough `"zh"`.
fn normalise_locale(raw: &str) -> String {
    let base = raw.split('.').next().unwrap_or(raw);
    let lang = base.split(['_', '-']).next().unwrap_or(base);
    lang.to_string()
}

fn language_from_locale(raw: &str) -> Language {
    if normalise_locale(raw) == "zh" {
        Language::Zh
    } else {
        Language::En
    }
}
