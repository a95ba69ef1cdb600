use super::{Catalog, Domain, Language};
use crate::error::CatalogError;
use arc_swap::ArcSwap;
use std::sync::Arc;

/// Shared catalog plus the session's active language.
///
/// Clones share both the catalog and the language slot, so a language switch
/// made through any clone affects every later lookup. Strings already
/// resolved are never touched.
#[derive(Debug, Clone)]
pub struct Localizer {
    catalog: Arc<Catalog>,
    language: Arc<ArcSwap<Language>>,
}

impl Localizer {
    pub fn new(catalog: Arc<Catalog>, language: Language) -> Self {
        Self {
            catalog,
            language: Arc::new(ArcSwap::from_pointee(language)),
        }
    }

    #[must_use]
    pub fn language(&self) -> Language {
        **self.language.load()
    }

    pub fn set_language(&self, language: Language) {
        self.language.store(Arc::new(language));
        tracing::debug!(%language, "active language changed");
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Strict lookup in the active language.
    pub fn resolve(
        &self,
        domain: Domain,
        key: &str,
        params: &[(&str, &str)],
    ) -> Result<String, CatalogError> {
        self.catalog.resolve(domain, key, self.language(), params)
    }

    /// Lenient lookup for display paths: a configuration defect is logged and
    /// the `[domain.key]` marker is shown instead of failing the caller.
    #[must_use]
    pub fn text(&self, domain: Domain, key: &str, params: &[(&str, &str)]) -> String {
        match self.resolve(domain, key, params) {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(%domain, key, error = %err, "localized text unavailable");
                format!("[{domain}.{key}]")
            }
        }
    }

    /// Shorthand for the `messages` domain.
    #[must_use]
    pub fn message(&self, key: &str, params: &[(&str, &str)]) -> String {
        self.text(Domain::Messages, key, params)
    }

    #[must_use]
    pub fn quick_replies(&self) -> Vec<String> {
        self.catalog.quick_replies(self.language()).to_vec()
    }
}
