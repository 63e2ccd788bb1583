//! One run: fetch → normalize/deduplicate → write.
//!
//! A failed fetch never damages the feed. If an earlier run left a file in
//! place it stays byte-for-byte as it was and the run still counts as a
//! success, so scheduled builds keep working off the last good data.

use crate::config::FeedConfig;
use crate::dedupe::Deduplicator;
use crate::error::Result;
use crate::fetcher::Fetcher;
use crate::normalize::{Normalizer, PublicationEntry};
use crate::output::{load_entries, write_entries};
use crate::source::PublicationSource;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Entries gathered by one pass over the profile
#[derive(Debug, Default)]
pub struct RunSummary {
    pub entries: Vec<PublicationEntry>,
    /// Candidates dropped as duplicates
    pub skipped: usize,
    /// Publications whose detail fetch failed and were kept as listed
    pub partial: usize,
}

/// How a run ended
#[derive(Debug)]
pub enum RunOutcome {
    /// Fresh feed written
    Written {
        path: PathBuf,
        added: usize,
        skipped: usize,
    },
    /// Fetch failed; the previous feed was left untouched
    PreservedPrevious { path: PathBuf, error: String },
    /// Fetch failed and there was no usable previous feed
    Failed { error: String },
}

impl RunOutcome {
    pub fn exit_code(&self) -> u8 {
        match self {
            RunOutcome::Written { .. } | RunOutcome::PreservedPrevious { .. } => 0,
            RunOutcome::Failed { .. } => 1,
        }
    }
}

/// Fetch every publication and keep the ones that are not duplicates.
pub async fn collect_entries<S: PublicationSource>(
    fetcher: &mut Fetcher<S>,
    config: &FeedConfig,
) -> Result<RunSummary> {
    let normalizer = Normalizer::new(config.scholar_id.as_str(), config.adjustments.clone())?;

    println!("Fetching Google Scholar profile {}...", config.scholar_id);
    let profile = fetcher.resolve_author(&config.scholar_id).await?;
    println!("Author: {}", profile.name);

    let listing = fetcher.list_publications(&profile).await?;
    println!("Found {} publications on profile.", listing.len());

    let mut dedup = Deduplicator::new(config.thresholds)?;
    let mut summary = RunSummary::default();

    for raw in &listing {
        let filled = fetcher.fill_or_partial(raw).await;
        if filled.is_partial() {
            println!("  ! Detail fetch failed, using listed data: {}", raw.display_title());
            summary.partial += 1;
        }
        let record = filled.into_record();

        let entry = normalizer.normalize(&record);
        let label = format!("{} ({})", entry.title, entry.year);
        match dedup.offer(entry) {
            Ok(()) => println!("  + Added: {}", label),
            Err(rejection) => {
                summary.skipped += 1;
                println!(
                    "  - Skipped duplicate [{}]: {} ~ {}",
                    rejection.reason, label, rejection.existing_title
                );
            }
        }
    }

    summary.entries = dedup.into_entries();
    Ok(summary)
}

/// Run the whole pipeline and write to `output_path`.
pub async fn run<S: PublicationSource>(
    fetcher: &mut Fetcher<S>,
    config: &FeedConfig,
    output_path: &Path,
) -> RunOutcome {
    let result = match collect_entries(fetcher, config).await {
        Ok(summary) => write_entries(output_path, &summary.entries).map(|()| summary),
        Err(e) => Err(e),
    };

    match result {
        Ok(summary) => {
            info!(
                added = summary.entries.len(),
                skipped = summary.skipped,
                partial = summary.partial,
                "Run complete"
            );
            println!(
                "\n✓ Wrote {} publications ({} duplicates skipped) to {}",
                summary.entries.len(),
                summary.skipped,
                output_path.display()
            );
            RunOutcome::Written {
                path: output_path.to_path_buf(),
                added: summary.entries.len(),
                skipped: summary.skipped,
            }
        }
        Err(e) => preserve_previous(output_path, e.to_string()),
    }
}

/// Like [`run`], with building the fetcher counted as part of the run.
///
/// A setup failure is handled like a fetch failure.
pub async fn run_with<S, F>(setup: F, config: &FeedConfig, output_path: &Path) -> RunOutcome
where
    S: PublicationSource,
    F: FnOnce() -> Result<Fetcher<S>>,
{
    match setup() {
        Ok(mut fetcher) => run(&mut fetcher, config, output_path).await,
        Err(e) => preserve_previous(output_path, e.to_string()),
    }
}

/// Decide the outcome of a failed run from what is already on disk.
fn preserve_previous(output_path: &Path, error: String) -> RunOutcome {
    error!(error = %error, "Fetch failed");

    if !output_path.exists() {
        println!("\n✗ Fetch failed and no previous data exists: {}", error);
        return RunOutcome::Failed { error };
    }

    match load_entries(output_path) {
        Ok(previous) => {
            println!(
                "\n⚠ Fetch failed ({}); keeping previous data ({} publications) in {}",
                error,
                previous.len(),
                output_path.display()
            );
            RunOutcome::PreservedPrevious {
                path: output_path.to_path_buf(),
                error,
            }
        }
        Err(load_error) => {
            warn!(
                error = %load_error,
                path = ?output_path,
                "Previous feed is unreadable, leaving it as is"
            );
            println!(
                "\n✗ Fetch failed ({}) and previous data in {} is unreadable",
                error,
                output_path.display()
            );
            RunOutcome::Failed { error }
        }
    }
}
