//! Internationalization module
//!
//! This module handles language negotiation for API requests and the
//! fallback rules used when reading per-language values.

pub mod language;

// Re-export commonly used i18n components
pub use language::I18n;
