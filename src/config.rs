//! Run configuration.
//!
//! Everything the components need is passed in through [`FeedConfig`];
//! nothing reads module-level state.

use crate::adjustments::CitationAdjustments;
use crate::dedupe::DedupThresholds;
use crate::fetcher::Pacing;
use crate::retry::RetryPolicy;
use std::path::PathBuf;

/// Scholar profile the feed is built from
pub const DEFAULT_SCHOLAR_ID: &str = "qc6CJjYAAAAJ";

/// Name of the JSON file the site build reads
pub const OUTPUT_FILE_NAME: &str = "scholar.json";

/// Configuration for one run
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Scholar profile identifier
    pub scholar_id: String,
    /// Mirror base URL, `None` for scholar.google.com
    pub base_url: Option<String>,
    pub thresholds: DedupThresholds,
    /// Retry budget for author lookup and publication listing
    pub lookup_retry: RetryPolicy,
    /// Retry budget for each publication's detail fetch
    pub detail_retry: RetryPolicy,
    pub pacing: Pacing,
    /// Explicit output file; resolved from the working directory when absent
    pub output: Option<PathBuf>,
    pub adjustments: CitationAdjustments,
}

impl FeedConfig {
    pub fn for_author(scholar_id: impl Into<String>) -> Self {
        Self {
            scholar_id: scholar_id.into(),
            ..Self::default()
        }
    }

    /// Same configuration with every sleep removed (tests, dry runs against fakes)
    pub fn without_delays(mut self) -> Self {
        self.lookup_retry = self.lookup_retry.without_delays();
        self.detail_retry = self.detail_retry.without_delays();
        self.pacing = Pacing::none();
        self
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            scholar_id: DEFAULT_SCHOLAR_ID.to_string(),
            base_url: None,
            thresholds: DedupThresholds::default(),
            lookup_retry: RetryPolicy::author_lookup(),
            detail_retry: RetryPolicy::detail_fill(),
            pacing: Pacing::default(),
            output: None,
            adjustments: CitationAdjustments::default(),
        }
    }
}
