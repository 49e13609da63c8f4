//! Language negotiation and per-language value fallback
//!
//! Requests pick their language from `Accept-Language`; stored per-language
//! values (translation rows, product names) are resolved with a fixed
//! fallback chain: requested language, default language, then any language.

use std::collections::HashMap;

use tracing::debug;

use crate::config::I18nConfig;

/// Configured languages of the service
#[derive(Debug, Clone)]
pub struct I18n {
    /// Default language code
    default_language: String,
    /// Supported language codes, in preference order
    supported_languages: Vec<String>,
}

impl I18n {
    /// Create a new I18n instance
    pub fn new(config: &I18nConfig) -> Self {
        Self {
            default_language: config.default_language.clone(),
            supported_languages: config.supported_languages.clone(),
        }
    }

    /// Pick the best supported language from an `Accept-Language` header
    ///
    /// Region subtags are ignored (`en-US` counts as `en`); entries are
    /// ranked by their `q` weight. Falls back to the default language.
    pub fn detect_language(&self, accept_language: Option<&str>) -> String {
        let Some(header) = accept_language else {
            return self.default_language.clone();
        };

        let mut best: Option<(&str, f32)> = None;
        for entry in header.split(',') {
            let mut parts = entry.split(';');
            let tag = parts.next().unwrap_or_default().trim();
            let primary = tag.split('-').next().unwrap_or(tag).to_ascii_lowercase();
            let weight = parts
                .find_map(|param| param.trim().strip_prefix("q="))
                .and_then(|q| q.trim().parse::<f32>().ok())
                .unwrap_or(1.0);

            if weight <= 0.0 {
                continue;
            }
            let Some(supported) = self.supported_languages.iter().find(|lang| **lang == primary) else {
                continue;
            };
            if best.map_or(true, |(_, best_weight)| weight > best_weight) {
                best = Some((supported.as_str(), weight));
            }
        }

        match best {
            Some((lang, _)) => lang.to_string(),
            None => {
                debug!(header = %header, "No supported language requested, using default");
                self.default_language.clone()
            }
        }
    }

    /// Value in the requested language, else the default language, else any language
    pub fn resolve<'a, V>(&self, values: &'a HashMap<String, V>, requested: &str) -> Option<&'a V> {
        values
            .get(requested)
            .or_else(|| values.get(&self.default_language))
            .or_else(|| {
                self.supported_languages
                    .iter()
                    .find_map(|lang| values.get(lang))
            })
            .or_else(|| {
                let mut keys: Vec<&String> = values.keys().collect();
                keys.sort();
                keys.first().and_then(|key| values.get(*key))
            })
    }
}
