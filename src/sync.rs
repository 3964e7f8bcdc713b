//! Merge of a target-language tree against the source-language tree.
//!
//! Every leaf path of the source ends up in the result with one of:
//! a preserved translation, a copy of the source value, a (cached or fresh)
//! machine translation, or the source text behind the missing marker.

use crate::cache::TranslationCache;
use crate::scheduler::{BatchScheduler, PendingTranslation};
use crate::translator::{is_translatable, Translator};
use crate::tree::{flatten, get_value_at_path, unflatten, TranslationEntry};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, warn};

pub const DEFAULT_MISSING_MARKER: &str = "[NEEDS TRANSLATION] ";
pub const DEFAULT_NEW_TRANSLATION_MARKER: &str = "[MT] ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    /// Prefix for values that still need a human translation
    pub missing_marker: String,
    /// Prefix for fresh machine translations, when marking is enabled
    pub new_translation_marker: String,
    pub mark_new_translations: bool,
    /// Retranslate every string, ignoring existing translations
    pub force: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            missing_marker: DEFAULT_MISSING_MARKER.to_string(),
            new_translation_marker: DEFAULT_NEW_TRANSLATION_MARKER.to_string(),
            mark_new_translations: false,
            force: false,
        }
    }
}

/// Counters for one language.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    pub preserved: usize,
    /// Fresh and cached machine translations
    pub translated: usize,
    pub failed: usize,
    /// Values copied from the source without translating
    pub passed_through: usize,
    /// Part of `translated` served from the cache
    pub cache_hits: usize,
    pub api_calls: usize,
    /// Target paths with no counterpart in the source, dropped
    pub obsolete: usize,
}

impl SyncStats {
    pub fn total(&self) -> usize {
        self.preserved + self.translated + self.failed + self.passed_through
    }

    pub fn add(&mut self, other: &SyncStats) {
        self.preserved += other.preserved;
        self.translated += other.translated;
        self.failed += other.failed;
        self.passed_through += other.passed_through;
        self.cache_hits += other.cache_hits;
        self.api_calls += other.api_calls;
        self.obsolete += other.obsolete;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyncResult {
    pub tree: Value,
    pub stats: SyncStats,
}

/// What happens to one source path.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Keep the existing target value
    Preserve(Value),
    /// Copy the source value as-is
    PassThrough(Value),
    /// Ask the translator for this source string
    Translate(String),
}

/// Decide the fate of one path from its source value and existing target value.
pub fn decide(source: &Value, existing: Option<&Value>, options: &SyncOptions) -> Decision {
    let Value::String(text) = source else {
        return Decision::PassThrough(source.clone());
    };

    if !options.force {
        if let Some(Value::String(current)) = existing {
            if !current.is_empty() && !current.starts_with(&options.missing_marker) {
                return Decision::Preserve(Value::String(current.clone()));
            }
        }
    }

    if !is_translatable(text) {
        return Decision::PassThrough(source.clone());
    }

    Decision::Translate(text.clone())
}

enum Slot {
    Done(Value),
    /// Index into the pending translations
    Pending(usize),
}

/// Produces a complete target tree for one language.
pub struct Synchronizer<'a, T> {
    translator: &'a T,
    scheduler: &'a BatchScheduler,
    cache: Option<&'a dyn TranslationCache>,
    options: SyncOptions,
}

impl<'a, T: Translator> Synchronizer<'a, T> {
    pub fn new(translator: &'a T, scheduler: &'a BatchScheduler, options: SyncOptions) -> Self {
        Self {
            translator,
            scheduler,
            cache: None,
            options,
        }
    }

    pub fn with_cache(mut self, cache: &'a dyn TranslationCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Merge `existing` against `source` for the service language `language`.
    ///
    /// Never fails: translation errors become marked placeholders.
    pub async fn sync(&self, source: &Value, existing: &Value, language: &str) -> SyncResult {
        let entries = flatten(source);
        let mut stats = SyncStats {
            obsolete: count_obsolete(&entries, existing),
            ..SyncStats::default()
        };

        let mut slots = Vec::with_capacity(entries.len());
        let mut pending = Vec::new();

        for entry in &entries {
            let existing_value = get_value_at_path(existing, &entry.path);
            let slot = match decide(&entry.value, existing_value, &self.options) {
                Decision::Preserve(value) => {
                    stats.preserved += 1;
                    Slot::Done(value)
                }
                Decision::PassThrough(value) => {
                    stats.passed_through += 1;
                    Slot::Done(value)
                }
                Decision::Translate(text) => match self.cached(&text, language) {
                    Some(translated) => {
                        stats.translated += 1;
                        stats.cache_hits += 1;
                        Slot::Done(self.mark_new(translated))
                    }
                    None => {
                        pending.push(PendingTranslation {
                            path: entry.path.clone(),
                            text,
                        });
                        Slot::Pending(pending.len() - 1)
                    }
                },
            };
            slots.push(slot);
        }

        debug!(
            "{}: {} paths, {} to translate",
            language,
            entries.len(),
            pending.len()
        );

        stats.api_calls = pending.len();
        let outcomes = self
            .scheduler
            .translate_all(self.translator, &pending, language)
            .await;

        let mut resolved = Vec::with_capacity(pending.len());
        for (entry, outcome) in pending.into_iter().zip(outcomes) {
            let value = match outcome {
                Ok(translated) => {
                    if let Some(cache) = self.cache {
                        cache.put(&entry.text, language, &translated);
                    }
                    stats.translated += 1;
                    self.mark_new(translated)
                }
                Err(e) => {
                    warn!("{}: failed to translate '{}': {}", language, entry.path, e);
                    stats.failed += 1;
                    Value::String(format!("{}{}", self.options.missing_marker, entry.text))
                }
            };
            resolved.push(value);
        }

        let merged: Vec<TranslationEntry> = entries
            .into_iter()
            .zip(slots)
            .map(|(entry, slot)| TranslationEntry {
                path: entry.path,
                value: match slot {
                    Slot::Done(value) => value,
                    Slot::Pending(index) => std::mem::take(&mut resolved[index]),
                },
            })
            .collect();

        SyncResult {
            tree: unflatten(merged),
            stats,
        }
    }

    /// Forced runs always go to the translator; the cache is only refreshed.
    fn cached(&self, text: &str, language: &str) -> Option<String> {
        if self.options.force {
            return None;
        }
        self.cache.and_then(|cache| cache.get(text, language))
    }

    fn mark_new(&self, translated: String) -> Value {
        if self.options.mark_new_translations {
            Value::String(format!("{}{}", self.options.new_translation_marker, translated))
        } else {
            Value::String(translated)
        }
    }
}

fn count_obsolete(source_entries: &[TranslationEntry], existing: &Value) -> usize {
    let source_paths: HashSet<&str> = source_entries.iter().map(|e| e.path.as_str()).collect();
    flatten(existing)
        .iter()
        .filter(|e| !source_paths.contains(e.path.as_str()))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::error::TranslateError;
    use crate::scheduler::ScheduleConfig;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Prefixes text with the target language; fails on texts containing "fail".
    #[derive(Default)]
    struct FakeTranslator {
        calls: AtomicUsize,
    }

    impl FakeTranslator {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Translator for FakeTranslator {
        async fn translate(&self, text: &str, language: &str) -> Result<String, TranslateError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if text.contains("fail") {
                Err(TranslateError::EmptyTranslation)
            } else {
                Ok(format!("{}:{}", language, text))
            }
        }
    }

    fn scheduler() -> BatchScheduler {
        BatchScheduler::new(ScheduleConfig {
            batch_size: 5,
            call_delay: Duration::ZERO,
            batch_delay: Duration::ZERO,
            language_concurrency: 1,
        })
    }

    async fn run(source: &Value, existing: &Value, options: SyncOptions) -> (SyncResult, usize) {
        let translator = FakeTranslator::default();
        let scheduler = scheduler();
        let result = Synchronizer::new(&translator, &scheduler, options)
            .sync(source, existing, "fr")
            .await;
        (result, translator.calls())
    }

    // ==================== decide ====================

    #[test]
    fn test_decide_preserves_good_translation() {
        let options = SyncOptions::default();
        let decision = decide(&json!("Hi"), Some(&json!("Salut")), &options);
        assert_eq!(decision, Decision::Preserve(json!("Salut")));
    }

    #[test]
    fn test_decide_retranslates_missing_marker() {
        let options = SyncOptions::default();
        let existing = json!(format!("{}Hi", DEFAULT_MISSING_MARKER));
        assert_eq!(
            decide(&json!("Hi"), Some(&existing), &options),
            Decision::Translate("Hi".to_string())
        );
    }

    #[test]
    fn test_decide_retranslates_empty_or_non_string_existing() {
        let options = SyncOptions::default();
        assert_eq!(
            decide(&json!("Hi"), Some(&json!("")), &options),
            Decision::Translate("Hi".to_string())
        );
        assert_eq!(
            decide(&json!("Hi"), Some(&json!({ "nested": "x" })), &options),
            Decision::Translate("Hi".to_string())
        );
        assert_eq!(
            decide(&json!("Hi"), None, &options),
            Decision::Translate("Hi".to_string())
        );
    }

    #[test]
    fn test_decide_keeps_new_translation_marker() {
        let options = SyncOptions::default();
        let existing = json!(format!("{}Salut", DEFAULT_NEW_TRANSLATION_MARKER));
        assert_eq!(
            decide(&json!("Hi"), Some(&existing), &options),
            Decision::Preserve(existing.clone())
        );
    }

    #[test]
    fn test_decide_non_string_source_wins_over_target() {
        let options = SyncOptions::default();
        assert_eq!(
            decide(&json!(5), Some(&json!("five")), &options),
            Decision::PassThrough(json!(5))
        );
        assert_eq!(decide(&json!(true), None, &options), Decision::PassThrough(json!(true)));
    }

    #[test]
    fn test_decide_passes_placeholders_through() {
        let options = SyncOptions::default();
        assert_eq!(
            decide(&json!("Hi {{name}}"), None, &options),
            Decision::PassThrough(json!("Hi {{name}}"))
        );
        assert_eq!(decide(&json!(""), None, &options), Decision::PassThrough(json!("")));
    }

    #[test]
    fn test_decide_force_ignores_existing() {
        let options = SyncOptions {
            force: true,
            ..SyncOptions::default()
        };
        assert_eq!(
            decide(&json!("Hi"), Some(&json!("Salut")), &options),
            Decision::Translate("Hi".to_string())
        );
    }

    // ==================== sync scenarios ====================

    #[tokio::test]
    async fn test_sync_new_nested_key_is_translated() {
        let source = json!({ "a": { "b": "Hello" } });
        let (result, calls) = run(&source, &json!({}), SyncOptions::default()).await;

        assert_eq!(result.tree, json!({ "a": { "b": "fr:Hello" } }));
        assert_eq!(result.stats.translated, 1);
        assert_eq!(result.stats.preserved, 0);
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_sync_failed_translation_is_marked() {
        let source = json!({ "a": { "b": "please fail" } });
        let (result, _) = run(&source, &json!({}), SyncOptions::default()).await;

        assert_eq!(
            result.tree,
            json!({ "a": { "b": format!("{}please fail", DEFAULT_MISSING_MARKER) } })
        );
        assert_eq!(result.stats.failed, 1);
        assert_eq!(result.stats.translated, 0);
    }

    #[tokio::test]
    async fn test_sync_preserves_existing_without_calls() {
        let (result, calls) = run(
            &json!({ "greeting": "Hi" }),
            &json!({ "greeting": "Bonjour" }),
            SyncOptions::default(),
        )
        .await;

        assert_eq!(result.tree, json!({ "greeting": "Bonjour" }));
        assert_eq!(result.stats.preserved, 1);
        assert_eq!(calls, 0);
    }

    #[tokio::test]
    async fn test_sync_number_passes_through_without_calls() {
        let (result, calls) = run(&json!({ "count": 5 }), &json!({}), SyncOptions::default()).await;

        assert_eq!(result.tree, json!({ "count": 5 }));
        assert_eq!(result.stats.passed_through, 1);
        assert_eq!(calls, 0);
    }

    #[tokio::test]
    async fn test_sync_failure_does_not_stop_other_paths() {
        let source = json!({ "one": "first", "two": "do fail", "three": "third" });
        let (result, calls) = run(&source, &json!({}), SyncOptions::default()).await;

        assert_eq!(calls, 3);
        assert_eq!(result.stats.translated, 2);
        assert_eq!(result.stats.failed, 1);
        assert_eq!(result.tree["three"], json!("fr:third"));
    }

    #[tokio::test]
    async fn test_sync_output_follows_source_order_and_drops_obsolete() {
        let source: Value =
            serde_json::from_str(r#"{"z": "Zed", "a": {"y": "Why", "b": "Bee"}}"#).unwrap();
        let existing = json!({ "a": { "b": "Abeille", "old": "Ancien" }, "gone": "Parti" });

        let (result, _) = run(&source, &existing, SyncOptions::default()).await;

        let keys: Vec<&String> = result.tree.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["z", "a"]);
        let nested: Vec<&String> = result.tree["a"].as_object().unwrap().keys().collect();
        assert_eq!(nested, vec!["y", "b"]);
        assert_eq!(result.tree["a"]["b"], json!("Abeille"));
        assert_eq!(result.stats.obsolete, 2);
    }

    #[tokio::test]
    async fn test_sync_marks_new_translations() {
        let options = SyncOptions {
            mark_new_translations: true,
            ..SyncOptions::default()
        };
        let (result, _) = run(&json!({ "k": "Hello" }), &json!({}), options).await;

        let expected = format!("{}fr:Hello", DEFAULT_NEW_TRANSLATION_MARKER);
        assert_eq!(result.tree, json!({ "k": expected }));
    }

    #[tokio::test]
    async fn test_sync_is_idempotent_on_own_output() {
        let source = json!({ "a": { "b": "Hello", "c": 3 }, "d": "Hi {{name}}", "e": "World" });

        let (first, _) = run(&source, &json!({}), SyncOptions::default()).await;
        let (second, calls) = run(&source, &first.tree, SyncOptions::default()).await;

        assert_eq!(second.tree, first.tree);
        assert_eq!(calls, 0);
    }

    #[tokio::test]
    async fn test_sync_completeness() {
        let source = json!({
            "home": { "title": "Home", "cards": { "count": 2, "empty": "" } },
            "errors": { "network": "fail: offline", "generic": "Oops" },
        });

        let existing = json!({ "home": "not an object" });
        let (result, _) = run(&source, &existing, SyncOptions::default()).await;

        for entry in flatten(&source) {
            assert!(
                get_value_at_path(&result.tree, &entry.path).is_some(),
                "missing path {}",
                entry.path
            );
        }
        assert_eq!(result.stats.total(), 5);
        let failed = result.tree["errors"]["network"].as_str().unwrap();
        assert_eq!(failed.strip_prefix(DEFAULT_MISSING_MARKER), Some("fail: offline"));
    }

    #[tokio::test]
    async fn test_sync_force_retranslates() {
        let options = SyncOptions {
            force: true,
            ..SyncOptions::default()
        };
        let (result, calls) = run(
            &json!({ "greeting": "Hi" }),
            &json!({ "greeting": "Bonjour" }),
            options,
        )
        .await;

        assert_eq!(result.tree, json!({ "greeting": "fr:Hi" }));
        assert_eq!(result.stats.preserved, 0);
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_sync_uses_and_fills_cache() {
        let translator = FakeTranslator::default();
        let scheduler = scheduler();
        let cache = MemoryCache::new();
        cache.put("Hello", "fr", "Salut (cache)");

        let synchronizer =
            Synchronizer::new(&translator, &scheduler, SyncOptions::default()).with_cache(&cache);
        let result = synchronizer
            .sync(&json!({ "a": "Hello", "b": "World" }), &json!({}), "fr")
            .await;

        assert_eq!(result.tree, json!({ "a": "Salut (cache)", "b": "fr:World" }));
        assert_eq!(result.stats.cache_hits, 1);
        assert_eq!(result.stats.translated, 2);
        assert_eq!(result.stats.api_calls, 1);
        assert_eq!(translator.calls(), 1);
        assert_eq!(cache.get("World", "fr").as_deref(), Some("fr:World"));
    }

    #[tokio::test]
    async fn test_sync_force_bypasses_cache_reads() {
        let translator = FakeTranslator::default();
        let scheduler = scheduler();
        let cache = MemoryCache::new();
        cache.put("Hello", "fr", "Salut (cache)");

        let options = SyncOptions {
            force: true,
            ..SyncOptions::default()
        };
        let result = Synchronizer::new(&translator, &scheduler, options)
            .with_cache(&cache)
            .sync(&json!({ "a": "Hello" }), &json!({ "a": "Salut" }), "fr")
            .await;

        assert_eq!(result.tree, json!({ "a": "fr:Hello" }));
        assert_eq!(result.stats.cache_hits, 0);
        assert_eq!(translator.calls(), 1);
        assert_eq!(cache.get("Hello", "fr").as_deref(), Some("fr:Hello"));
    }

    #[tokio::test]
    async fn test_sync_does_not_cache_failures() {
        let translator = FakeTranslator::default();
        let scheduler = scheduler();
        let cache = MemoryCache::new();

        Synchronizer::new(&translator, &scheduler, SyncOptions::default())
            .with_cache(&cache)
            .sync(&json!({ "a": "fail" }), &json!({}), "fr")
            .await;

        assert!(cache.is_empty());
    }

    #[test]
    fn test_stats_add() {
        let mut total = SyncStats::default();
        total.add(&SyncStats {
            preserved: 1,
            translated: 2,
            failed: 3,
            passed_through: 4,
            cache_hits: 1,
            api_calls: 4,
            obsolete: 0,
        });
        total.add(&SyncStats {
            preserved: 1,
            ..SyncStats::default()
        });

        assert_eq!(total.preserved, 2);
        assert_eq!(total.total(), 11);
    }
}
