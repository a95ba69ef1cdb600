use crate::error::CatalogError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Localization resource compiled into the binary.
const BUILTIN_RESOURCE: &str = include_str!("../../locales/i18n.json");

/// Sub-table of the localization resource.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
    strum::EnumIter,
)]
#[strum(serialize_all = "snake_case")]
pub enum Domain {
    WindowTitles,
    Buttons,
    Labels,
    Placeholders,
    Checkboxes,
    GroupTitles,
    QuickReplies,
    Messages,
}

/// Supported UI languages.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Zh,
}

impl Language {
    /// Human-readable name, shown on the language toggle.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::En => "English",
            Self::Zh => "中文",
        }
    }

    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::En => Self::Zh,
            Self::Zh => Self::En,
        }
    }
}

type Templates = BTreeMap<String, String>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Resource {
    #[serde(default)]
    quick_replies: BTreeMap<String, Vec<String>>,
    #[serde(flatten)]
    domains: BTreeMap<String, BTreeMap<String, Templates>>,
}

/// Read-only table of localized templates.
///
/// Lookups fall back to `fallback` when the requested language has no entry
/// for a key. The catalog never mutates after construction, so it can be
/// shared freely across threads.
#[derive(Debug, Clone)]
pub struct Catalog {
    resource: Resource,
    fallback: Language,
}

impl Catalog {
    /// Catalog backed by the bundled `locales/i18n.json`.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json_str(BUILTIN_RESOURCE)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, CatalogError> {
        let resource: Resource =
            serde_json::from_str(raw).map_err(|e| CatalogError::Resource(e.to_string()))?;
        Ok(Self {
            resource,
            fallback: Language::En,
        })
    }

    /// Load a replacement resource from disk.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Write the resource back out as pretty JSON.
    pub fn export(&self, path: &Path) -> Result<(), CatalogError> {
        let json = serde_json::to_string_pretty(&self.resource)
            .map_err(|e| CatalogError::Resource(e.to_string()))?;
        std::fs::write(path, json)?;
        Ok(())
    }

    #[must_use]
    pub fn with_fallback(mut self, fallback: Language) -> Self {
        self.fallback = fallback;
        self
    }

    #[must_use]
    pub fn fallback(&self) -> Language {
        self.fallback
    }

    /// Resolve `domain.key` for `language`, substituting `{name}` placeholders.
    pub fn resolve(
        &self,
        domain: Domain,
        key: &str,
        language: Language,
        params: &[(&str, &str)],
    ) -> Result<String, CatalogError> {
        let template = self
            .template(domain, key, language)
            .or_else(|| self.template(domain, key, self.fallback))
            .ok_or_else(|| CatalogError::MissingTranslation {
                domain,
                key: key.to_string(),
                language,
            })?;
        substitute(template, params).map_err(|placeholder| CatalogError::MissingPlaceholder {
            domain,
            key: key.to_string(),
            placeholder,
        })
    }

    /// Ordered preset replies for `language`, or the fallback locale's list.
    #[must_use]
    pub fn quick_replies(&self, language: Language) -> &[String] {
        self.resource
            .quick_replies
            .get(language.as_ref())
            .or_else(|| self.resource.quick_replies.get(self.fallback.as_ref()))
            .map_or(&[][..], Vec::as_slice)
    }

    fn template(&self, domain: Domain, key: &str, language: Language) -> Option<&str> {
        self.resource
            .domains
            .get(domain.as_ref())?
            .get(language.as_ref())?
            .get(key)
            .map(String::as_str)
    }
}

/// Replace every `{name}` in `template` with its value from `params`.
///
/// Returns the first placeholder name that has no value. Braces that do not
/// enclose an identifier are copied through untouched.
fn substitute(template: &str, params: &[(&str, &str)]) -> Result<String, String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            out.push_str(&rest[open..]);
            return Ok(out);
        };
        let name = &after[..close];
        if is_placeholder_name(name) {
            let value = params
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| *v)
                .ok_or_else(|| name.to_string())?;
            out.push_str(value);
        } else {
            out.push('{');
            out.push_str(name);
            out.push('}');
        }
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

fn is_placeholder_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
