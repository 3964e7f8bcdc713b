use anyhow::{Context, Result};
use clap::Parser;
use locale_sync::cache::CacheStore;
use locale_sync::config::Config;
use locale_sync::languages::LanguageTable;
use locale_sync::runner::{self, RunOptions};
use locale_sync::translator::GoogleTranslator;
use std::path::PathBuf;
use tracing::info;

/// Sync locale JSON files with the source language, machine translating new strings
#[derive(Parser, Debug)]
#[command(name = "locale-sync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Target language to sync (all locale files when omitted)
    #[arg(value_name = "LANGUAGE")]
    language: Option<String>,

    /// Sync and report without writing any file
    #[arg(long)]
    dry_run: bool,

    /// Retranslate every string, including existing translations
    #[arg(long)]
    force: bool,

    /// Directory containing <language>.json files [env: LOCALES_DIR]
    #[arg(long, value_name = "DIR")]
    locales_dir: Option<PathBuf>,

    /// Source language code [env: SOURCE_LANGUAGE]
    #[arg(long, value_name = "LANG")]
    source: Option<String>,

    /// Languages processed at the same time [env: LANGUAGE_CONCURRENCY]
    #[arg(long, value_name = "N")]
    concurrency: Option<usize>,

    /// Prefix fresh machine translations for review [env: MARK_NEW_TRANSLATIONS]
    #[arg(long)]
    mark_new: bool,

    /// Translation cache file [env: CACHE_FILE]
    #[arg(long, value_name = "FILE")]
    cache: Option<PathBuf>,
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        if let Some(dir) = &self.locales_dir {
            config.locales_dir = dir.clone();
        }
        if let Some(source) = &self.source {
            config.source_language = source.clone();
        }
        if let Some(concurrency) = self.concurrency {
            config.language_concurrency = concurrency;
        }
        if self.mark_new {
            config.mark_new_translations = true;
        }
        if let Some(cache) = &self.cache {
            config.cache_file = Some(cache.clone());
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("locale_sync=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env();
    cli.apply(&mut config);
    config.validate()?;

    let mut languages = LanguageTable::builtin();
    if let Some(overrides) = &config.language_map {
        languages = languages
            .with_overrides(overrides)
            .context("Invalid LANGUAGE_MAP")?;
    }

    let translator = GoogleTranslator::from_config(&config)?;
    let cache = CacheStore::open(config.cache_file.as_deref());
    let options = RunOptions {
        language: cli.language.clone(),
        dry_run: cli.dry_run,
        force: cli.force,
    };

    info!(
        "Syncing locales in {} (source: {})",
        config.locales_dir.display(),
        config.source_language
    );
    let report = runner::run(&config, &translator, &languages, &cache, &options).await?;

    println!("{}", report);

    if report.has_failures() {
        anyhow::bail!("{} language(s) could not be written", report.write_failures());
    }
    Ok(())
}
