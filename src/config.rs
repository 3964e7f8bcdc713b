use crate::scheduler::ScheduleConfig;
use crate::sync::{SyncOptions, DEFAULT_MISSING_MARKER, DEFAULT_NEW_TRANSLATION_MARKER};
use anyhow::{bail, Result};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_TRANSLATE_API_URL: &str = "https://translate.googleapis.com/translate_a/single";

#[derive(Debug, Clone)]
pub struct Config {
    // Locale files
    pub locales_dir: PathBuf,
    pub source_language: String,

    // Translation service
    pub translate_api_url: String,
    pub request_timeout_secs: u64,
    /// Extra `app=service` language code mappings
    pub language_map: Option<String>,

    // Markers
    pub missing_marker: String,
    pub new_translation_marker: String,
    pub mark_new_translations: bool,

    // Throttling
    pub batch_size: usize,
    pub call_delay_ms: u64,
    pub batch_delay_ms: u64,
    pub language_concurrency: usize,

    // Cache (in-memory only when unset)
    pub cache_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            locales_dir: PathBuf::from("locales"),
            source_language: "en".to_string(),
            translate_api_url: DEFAULT_TRANSLATE_API_URL.to_string(),
            request_timeout_secs: 10,
            language_map: None,
            missing_marker: DEFAULT_MISSING_MARKER.to_string(),
            new_translation_marker: DEFAULT_NEW_TRANSLATION_MARKER.to_string(),
            mark_new_translations: false,
            batch_size: 5,
            call_delay_ms: 500,
            batch_delay_ms: 1500,
            language_concurrency: 1,
            cache_file: None,
        }
    }
}

fn parse_var<T: std::str::FromStr>(value: Option<String>) -> Option<T> {
    value.and_then(|v| v.trim().parse().ok())
}

fn flag_var(value: Option<String>) -> Option<bool> {
    value.map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

impl Config {
    /// Read the configuration from the process environment.
    ///
    /// Not validated here: command-line overrides are applied first, then
    /// the caller runs [`Config::validate`].
    pub fn from_env() -> Self {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Build a configuration from any variable lookup, with defaults for
    /// missing or unparsable values.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            // Locale files
            locales_dir: var("LOCALES_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.locales_dir),
            source_language: var("SOURCE_LANGUAGE").unwrap_or(defaults.source_language),

            // Translation service
            translate_api_url: var("TRANSLATE_API_URL").unwrap_or(defaults.translate_api_url),
            request_timeout_secs: parse_var(var("REQUEST_TIMEOUT_SECS"))
                .unwrap_or(defaults.request_timeout_secs),
            language_map: var("LANGUAGE_MAP"),

            // Markers
            missing_marker: var("MISSING_MARKER").unwrap_or(defaults.missing_marker),
            new_translation_marker: var("NEW_TRANSLATION_MARKER")
                .unwrap_or(defaults.new_translation_marker),
            mark_new_translations: flag_var(var("MARK_NEW_TRANSLATIONS"))
                .unwrap_or(defaults.mark_new_translations),

            // Throttling
            batch_size: parse_var(var("BATCH_SIZE")).unwrap_or(defaults.batch_size),
            call_delay_ms: parse_var(var("CALL_DELAY_MS")).unwrap_or(defaults.call_delay_ms),
            batch_delay_ms: parse_var(var("BATCH_DELAY_MS")).unwrap_or(defaults.batch_delay_ms),
            language_concurrency: parse_var(var("LANGUAGE_CONCURRENCY"))
                .unwrap_or(defaults.language_concurrency),

            // Cache
            cache_file: var("CACHE_FILE").map(PathBuf::from),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.source_language.trim().is_empty() {
            bail!("SOURCE_LANGUAGE must not be empty");
        }
        if self.batch_size == 0 {
            bail!("BATCH_SIZE must be at least 1");
        }
        if self.language_concurrency == 0 {
            bail!("LANGUAGE_CONCURRENCY must be at least 1");
        }
        if self.missing_marker.is_empty() {
            bail!("MISSING_MARKER must not be empty");
        }
        if self.missing_marker == self.new_translation_marker {
            bail!("MISSING_MARKER and NEW_TRANSLATION_MARKER must differ");
        }
        Ok(())
    }

    pub fn schedule(&self) -> ScheduleConfig {
        ScheduleConfig {
            batch_size: self.batch_size,
            call_delay: Duration::from_millis(self.call_delay_ms),
            batch_delay: Duration::from_millis(self.batch_delay_ms),
            language_concurrency: self.language_concurrency,
        }
    }

    pub fn sync_options(&self, force: bool) -> SyncOptions {
        SyncOptions {
            missing_marker: self.missing_marker.clone(),
            new_translation_marker: self.new_translation_marker.clone(),
            mark_new_translations: self.mark_new_translations,
            force,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.source_language, "en");
        assert_eq!(config.locales_dir, PathBuf::from("locales"));
    }

    fn vars<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |name: &str| {
            pairs
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| value.to_string())
        }
    }

    #[test]
    fn test_from_vars_reads_values() {
        let config = Config::from_vars(vars(&[
            ("LOCALES_DIR", "app/i18n"),
            ("SOURCE_LANGUAGE", "de"),
            ("BATCH_SIZE", " 3 "),
            ("MARK_NEW_TRANSLATIONS", "Yes"),
            ("CACHE_FILE", ".cache/translations.json"),
        ]));

        assert_eq!(config.locales_dir, PathBuf::from("app/i18n"));
        assert_eq!(config.source_language, "de");
        assert_eq!(config.batch_size, 3);
        assert!(config.mark_new_translations);
        assert_eq!(config.cache_file, Some(PathBuf::from(".cache/translations.json")));
    }

    #[test]
    fn test_from_vars_falls_back_on_unparsable_values() {
        let config = Config::from_vars(vars(&[("CALL_DELAY_MS", "soon")]));
        assert_eq!(config.call_delay_ms, Config::default().call_delay_ms);
    }

    #[test]
    fn test_invalid_env_value_can_be_overridden_before_validation() {
        let mut config = Config::from_vars(vars(&[("LANGUAGE_CONCURRENCY", "0")]));
        assert_eq!(config.language_concurrency, 0);
        assert!(config.validate().is_err());

        config.language_concurrency = 2;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_batch_size() {
        let config = Config {
            batch_size: 0,
            ..Config::default()
        };
        assert!(config.validate().unwrap_err().to_string().contains("BATCH_SIZE"));
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let config = Config {
            language_concurrency: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_markers() {
        let empty = Config {
            missing_marker: String::new(),
            ..Config::default()
        };
        assert!(empty.validate().is_err());

        let same = Config {
            missing_marker: "!".to_string(),
            new_translation_marker: "!".to_string(),
            ..Config::default()
        };
        assert!(same.validate().unwrap_err().to_string().contains("must differ"));
    }

    #[test]
    fn test_schedule_from_config() {
        let config = Config {
            batch_size: 3,
            call_delay_ms: 250,
            batch_delay_ms: 1000,
            language_concurrency: 2,
            ..Config::default()
        };
        let schedule = config.schedule();

        assert_eq!(schedule.batch_size, 3);
        assert_eq!(schedule.call_delay, Duration::from_millis(250));
        assert_eq!(schedule.batch_delay, Duration::from_secs(1));
        assert_eq!(schedule.language_concurrency, 2);
    }

    #[test]
    fn test_sync_options_from_config() {
        let config = Config {
            mark_new_translations: true,
            ..Config::default()
        };
        let options = config.sync_options(true);

        assert!(options.force);
        assert!(options.mark_new_translations);
        assert_eq!(options.missing_marker, DEFAULT_MISSING_MARKER);
    }
}
