/*!
 * Language utilities for locale code handling.
 *
 * Maps caller-facing locale codes (BCP-47 style, e.g. `fr-FR`) onto the tag
 * space of the MT backend (mBART-50 style, e.g. `fr_XX`), and provides helpers
 * for normalizing and describing those codes.
 */

use anyhow::{Result, anyhow};
use isolang::Language;
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Default locale -> backend tag table for mBART-50 models
static DEFAULT_BACKEND_TAGS: Lazy<Vec<(&'static str, &'static str)>> = Lazy::new(|| {
    vec![
        ("ar-SA", "ar_AR"),
        ("de-DE", "de_DE"),
        ("en-US", "en_XX"),
        ("es-ES", "es_XX"),
        ("fr-FR", "fr_XX"),
        ("hi-IN", "hi_IN"),
        ("it-IT", "it_IT"),
        ("ja-JP", "ja_XX"),
        ("ko-KR", "ko_KR"),
        ("nl-NL", "nl_XX"),
        ("pl-PL", "pl_PL"),
        ("pt-PT", "pt_XX"),
        ("pt-BR", "pt_BR"),
        ("ru-RU", "ru_RU"),
        ("sv-SE", "sv_SE"),
        ("tr-TR", "tr_TR"),
        ("uk-UA", "uk_UA"),
        ("zh-CN", "zh_CN"),
        ("zh-TW", "zh_TW"),
    ]
});

/// Immutable mapping from caller-facing locale codes to backend language tags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageMap {
    tags: HashMap<String, String>,
}

impl LanguageMap {
    /// Create a map from explicit (locale, backend tag) pairs
    pub fn new<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let tags = pairs
            .into_iter()
            .map(|(locale, tag)| (normalize_locale(locale.as_ref()), tag.into()))
            .collect();
        Self { tags }
    }

    /// Create a map holding only the built-in mBART-50 table
    pub fn mbart50() -> Self {
        Self::new(DEFAULT_BACKEND_TAGS.iter().copied())
    }

    /// Built-in table extended (or overridden) by the given pairs
    pub fn with_overrides(overrides: &HashMap<String, String>) -> Self {
        let mut map = Self::mbart50();
        for (locale, tag) in overrides {
            map.tags.insert(normalize_locale(locale), tag.clone());
        }
        map
    }

    /// Resolve a locale code to its backend tag
    pub fn backend_tag(&self, locale: &str) -> Option<&str> {
        self.tags.get(&normalize_locale(locale)).map(String::as_str)
    }

    /// Check whether a locale code has a backend mapping
    pub fn supports(&self, locale: &str) -> bool {
        self.backend_tag(locale).is_some()
    }

    /// Supported locale codes, sorted
    pub fn locales(&self) -> Vec<&str> {
        let mut locales: Vec<&str> = self.tags.keys().map(String::as_str).collect();
        locales.sort_unstable();
        locales
    }

    /// Number of mapped locales
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Whether the map is empty
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

impl Default for LanguageMap {
    fn default() -> Self {
        Self::mbart50()
    }
}

/// Normalize a locale code: trim, `_` to `-`, lowercase language, uppercase region
///
/// `fr_fr` and ` FR-fr ` both become `fr-FR`. Codes without a region are just lowercased.
pub fn normalize_locale(code: &str) -> String {
    let cleaned = code.trim().replace('_', "-");
    let mut parts = cleaned.split('-');

    let language = parts.next().unwrap_or_default().to_lowercase();
    let rest: Vec<String> = parts
        .map(|part| {
            if part.len() == 2 && part.chars().all(|c| c.is_ascii_alphabetic()) {
                part.to_uppercase()
            } else {
                part.to_string()
            }
        })
        .collect();

    if rest.is_empty() {
        language
    } else {
        format!("{}-{}", language, rest.join("-"))
    }
}

/// Get the English name of a locale's primary language (`fr-FR` -> `French`)
pub fn get_language_name(code: &str) -> Result<String> {
    let normalized = normalize_locale(code);
    let primary = normalized.split('-').next().unwrap_or_default();

    let language = match primary.len() {
        2 => Language::from_639_1(primary),
        3 => Language::from_639_3(primary),
        _ => None,
    };

    language
        .map(|lang| lang.to_name().to_string())
        .ok_or_else(|| anyhow!("Invalid language code: {}", code))
}

/// Describe a locale for log output, falling back to the raw code
pub fn describe_locale(code: &str) -> String {
    match get_language_name(code) {
        Ok(name) => format!("{} ({})", name, normalize_locale(code)),
        Err(_) => code.to_string(),
    }
}

/// Extract the target locale from a file name following the `Name.resx.fr-FR.xlf` convention
///
/// The locale is the second-to-last dot-separated component. Returns `None` when the
/// file name has fewer than three components or that component does not look like a
/// language code.
pub fn target_language_from_file_name(file_name: &str) -> Option<String> {
    let parts: Vec<&str> = file_name.split('.').collect();
    if parts.len() < 3 {
        return None;
    }

    let candidate = parts[parts.len() - 2];
    let primary = candidate.split(['-', '_']).next().unwrap_or_default();
    let looks_like_code = (2..=3).contains(&primary.len())
        && primary.chars().all(|c| c.is_ascii_alphabetic());

    if looks_like_code {
        Some(normalize_locale(candidate))
    } else {
        None
    }
}
