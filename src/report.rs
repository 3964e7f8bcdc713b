//! Run summary: what happened to each language and overall totals.

use crate::sync::SyncStats;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// How the run ended for one language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LanguageOutcome {
    Written { path: PathBuf },
    /// Synced but not written (dry run)
    DryRun,
    Skipped { reason: String },
    WriteFailed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LanguageReport {
    pub language: String,
    /// Code sent to the translation service, when the language is mapped
    pub service_language: Option<String>,
    pub stats: SyncStats,
    pub outcome: LanguageOutcome,
}

impl LanguageReport {
    pub fn skipped(language: &str, reason: impl Into<String>) -> Self {
        Self {
            language: language.to_string(),
            service_language: None,
            stats: SyncStats::default(),
            outcome: LanguageOutcome::Skipped {
                reason: reason.into(),
            },
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, LanguageOutcome::WriteFailed { .. })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub dry_run: bool,
    pub languages: Vec<LanguageReport>,
}

impl RunReport {
    pub fn new(dry_run: bool, mut languages: Vec<LanguageReport>) -> Self {
        languages.sort_by(|a, b| a.language.cmp(&b.language));
        Self { dry_run, languages }
    }

    /// Counters summed over every synced language.
    pub fn totals(&self) -> SyncStats {
        self.languages.iter().fold(SyncStats::default(), |mut total, report| {
            total.add(&report.stats);
            total
        })
    }

    pub fn skipped(&self) -> usize {
        self.languages
            .iter()
            .filter(|r| matches!(r.outcome, LanguageOutcome::Skipped { .. }))
            .count()
    }

    pub fn write_failures(&self) -> usize {
        self.languages.iter().filter(|r| r.is_failure()).count()
    }

    pub fn has_failures(&self) -> bool {
        self.write_failures() > 0
    }
}

fn write_counts(f: &mut fmt::Formatter<'_>, stats: &SyncStats) -> fmt::Result {
    write!(
        f,
        "preserved {}, translated {} ({} cached), failed {}, passed through {}",
        stats.preserved, stats.translated, stats.cache_hits, stats.failed, stats.passed_through
    )?;
    if stats.obsolete > 0 {
        write!(f, ", dropped {} obsolete", stats.obsolete)?;
    }
    Ok(())
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.dry_run {
            writeln!(f, "Dry run: no files were written")?;
        }

        for report in &self.languages {
            write!(f, "{:<8}", report.language)?;
            match &report.outcome {
                LanguageOutcome::Skipped { reason } => writeln!(f, "skipped: {}", reason)?,
                outcome => {
                    write_counts(f, &report.stats)?;
                    match outcome {
                        LanguageOutcome::Written { path } => {
                            writeln!(f, " -> {}", path.display())?
                        }
                        LanguageOutcome::WriteFailed { error } => {
                            writeln!(f, " (NOT WRITTEN: {})", error)?
                        }
                        _ => writeln!(f)?,
                    }
                }
            }
        }

        write!(f, "{:<8}", "total")?;
        write_counts(f, &self.totals())?;
        write!(
            f,
            " | {} languages, {} skipped, {} write failures",
            self.languages.len(),
            self.skipped(),
            self.write_failures()
        )
    }
}
