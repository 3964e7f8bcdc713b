//! Mapping from the app's locale file codes to translation service codes.
//!
//! Locale files are named after the codes the app uses (`zh.json`,
//! `he.json`, ...), which do not always match what the translation service
//! expects. The mapping sits behind [`LanguageMapper`] so runs and tests can
//! swap it out.

use anyhow::{bail, Result};
use std::collections::HashMap;

/// Resolves an app locale code to the code the translation service accepts.
pub trait LanguageMapper: Send + Sync {
    /// `None` means the service cannot translate into this language.
    fn service_code(&self, app_code: &str) -> Option<String>;
}

/// Codes the service accepts unchanged.
const IDENTITY_CODES: &[&str] = &[
    "af", "am", "ar", "az", "bg", "bn", "bs", "ca", "cs", "cy", "da", "de", "el", "en", "es",
    "et", "fa", "fi", "fr", "ga", "gu", "ha", "hi", "hr", "hu", "hy", "id", "is", "it", "ja",
    "ka", "kk", "km", "kn", "ko", "ky", "lo", "lt", "lv", "mk", "ml", "mn", "mr", "ms", "my",
    "ne", "nl", "no", "pa", "pl", "ps", "pt", "ro", "ru", "si", "sk", "sl", "so", "sq", "sr",
    "sv", "sw", "ta", "te", "th", "tr", "uk", "ur", "uz", "vi", "yo", "zu", "zh-CN", "zh-TW",
];

/// App codes that need a different service code.
const REMAPPED_CODES: &[(&str, &str)] = &[
    ("zh", "zh-CN"),
    ("zh-Hans", "zh-CN"),
    ("zh-Hant", "zh-TW"),
    ("he", "iw"),
    ("jv", "jw"),
    ("fil", "tl"),
    ("nb", "no"),
    ("pt-BR", "pt"),
    ("pt-PT", "pt"),
    ("es-MX", "es"),
];

/// Lookup table with the built-in mapping plus optional overrides.
#[derive(Debug, Clone)]
pub struct LanguageTable {
    codes: HashMap<String, String>,
}

impl LanguageTable {
    /// Table containing only the built-in mapping.
    pub fn builtin() -> Self {
        let codes = IDENTITY_CODES
            .iter()
            .map(|code| (code.to_string(), code.to_string()))
            .chain(
                REMAPPED_CODES
                    .iter()
                    .map(|(app, service)| (app.to_string(), service.to_string())),
            )
            .collect();
        Self { codes }
    }

    /// Table with no entries; only overrides will resolve.
    pub fn empty() -> Self {
        Self {
            codes: HashMap::new(),
        }
    }

    /// Add or replace one mapping.
    pub fn with_override(mut self, app_code: &str, service_code: &str) -> Self {
        self.codes
            .insert(app_code.to_string(), service_code.to_string());
        self
    }

    /// Apply overrides written as `app=service` pairs separated by commas,
    /// e.g. `kr=ko,tw=zh-TW`. Blank items are ignored.
    pub fn with_overrides(mut self, mappings: &str) -> Result<Self> {
        for item in mappings.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let Some((app, service)) = item.split_once('=') else {
                bail!("Invalid language mapping '{}'. Expected app=service", item);
            };
            let (app, service) = (app.trim(), service.trim());
            if app.is_empty() || service.is_empty() {
                bail!("Invalid language mapping '{}'. Expected app=service", item);
            }
            self = self.with_override(app, service);
        }
        Ok(self)
    }
}

impl Default for LanguageTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl LanguageMapper for LanguageTable {
    fn service_code(&self, app_code: &str) -> Option<String> {
        self.codes.get(app_code).cloned()
    }
}
