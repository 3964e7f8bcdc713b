//! Keep per-language JSON locale files in sync with the source language.
//!
//! Every key path of the source locale (`en.json` by default) is guaranteed
//! to exist in each target locale after a run: existing translations are
//! kept, new strings are machine translated, and strings that could not be
//! translated are left behind a missing-translation marker for a human.

pub mod cache;
pub mod config;
pub mod error;
pub mod languages;
pub mod locales;
pub mod report;
pub mod retry;
pub mod runner;
pub mod scheduler;
pub mod sync;
pub mod translator;
pub mod tree;
