use crate::cache::CacheStore;
use crate::config::Config;
use crate::languages::LanguageMapper;
use crate::locales::LocaleStore;
use crate::report::{LanguageOutcome, LanguageReport, RunReport};
use crate::scheduler::BatchScheduler;
use crate::sync::Synchronizer;
use crate::translator::Translator;
use anyhow::{bail, Context, Result};
use serde_json::Value;
use tracing::{error, info, warn};

/// What one invocation should do.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Only this language; all discovered languages when `None`
    pub language: Option<String>,
    /// Sync but write nothing
    pub dry_run: bool,
    /// Retranslate even strings that already have a translation
    pub force: bool,
}

/// Everything a single language needs, shared by all of them.
struct LanguageJob<'a, T> {
    store: &'a LocaleStore,
    mapper: &'a dyn LanguageMapper,
    synchronizer: Synchronizer<'a, T>,
    source: &'a Value,
    dry_run: bool,
}

impl<T: Translator> LanguageJob<'_, T> {
    async fn run(&self, language: String) -> LanguageReport {
        let Some(service_language) = self.mapper.service_code(&language) else {
            warn!("{}: no translation service code, skipping", language);
            return LanguageReport::skipped(&language, "no translation service code");
        };

        info!("{}: syncing (service code {})", language, service_language);
        let existing = self.store.load_target(&language);
        let result = self
            .synchronizer
            .sync(self.source, &existing, &service_language)
            .await;

        info!(
            "{}: {} preserved, {} translated, {} failed",
            language, result.stats.preserved, result.stats.translated, result.stats.failed
        );

        let outcome = if self.dry_run {
            LanguageOutcome::DryRun
        } else {
            match self.store.write(&language, &result.tree) {
                Ok(path) => LanguageOutcome::Written { path },
                Err(e) => {
                    error!("{}: {}", language, e);
                    LanguageOutcome::WriteFailed {
                        error: e.to_string(),
                    }
                }
            }
        };

        LanguageReport {
            language,
            service_language: Some(service_language),
            stats: result.stats,
            outcome,
        }
    }
}

/// Sync one or all target languages against the source locale file.
///
/// Fails only when the source file cannot be used or the requested language
/// makes no sense; per-language problems end up in the report.
pub async fn run<T: Translator>(
    config: &Config,
    translator: &T,
    mapper: &dyn LanguageMapper,
    cache: &CacheStore,
    options: &RunOptions,
) -> Result<RunReport> {
    let store = LocaleStore::new(&config.locales_dir);
    let source_language = config.source_language.as_str();

    let source = store
        .load_source(source_language)
        .context("Cannot sync without a readable source locale")?;

    let languages = match &options.language {
        Some(language) if language == source_language => {
            bail!("'{}' is the source language, nothing to sync", language)
        }
        Some(language) => vec![language.clone()],
        None => store
            .discover_languages(source_language)
            .context("Failed to list locale files")?,
    };

    if languages.is_empty() {
        warn!("No target locale files found in {}", store.dir().display());
        return Ok(RunReport::new(options.dry_run, Vec::new()));
    }
    info!(
        "Syncing {} language(s) against {}: {}",
        languages.len(),
        source_language,
        languages.join(", ")
    );

    let scheduler = BatchScheduler::new(config.schedule());
    let synchronizer = Synchronizer::new(translator, &scheduler, config.sync_options(options.force))
        .with_cache(cache);
    let job = LanguageJob {
        store: &store,
        mapper,
        synchronizer,
        source: &source,
        dry_run: options.dry_run,
    };

    let job = &job;
    let reports = scheduler
        .for_each_language(languages, move |language| job.run(language))
        .await;

    if !options.dry_run {
        match cache.persist() {
            Ok(true) => info!("Translation cache saved"),
            Ok(false) => {}
            Err(e) => warn!("Failed to save translation cache: {}", e),
        }
    }

    Ok(RunReport::new(options.dry_run, reports))
}
