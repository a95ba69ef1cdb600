pub mod catalog;
pub mod locale;
pub mod localizer;

pub use catalog::{Catalog, Domain, Language};
pub use locale::detect_language;
pub use localizer::Localizer;
