//! Near-duplicate detection for feed entries.
//!
//! A candidate is compared against every entry accepted so far, in order.
//! Three independent triggers flag a duplicate:
//!
//! 1. similar titles and at least one shared author
//! 2. the candidate's title looks like the other entry's journal (or the reverse),
//!    which happens when the source put the venue into the title field
//! 3. similar journals, loosely similar titles, and a shared author
//!
//! Duplicates are dropped, never merged; the first accepted entry wins.

use crate::error::{Result, ScholarFeedError};
use crate::normalize::PublicationEntry;
use crate::similarity::ratio;
use regex::Regex;
use std::fmt;

/// Similarity thresholds; every comparison is strictly greater-than.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DedupThresholds {
    /// Title similarity for trigger 1
    pub title: f64,
    /// Title vs. journal similarity for trigger 2
    pub title_journal: f64,
    /// Journal similarity for trigger 3
    pub journal: f64,
    /// Looser title similarity for trigger 3
    pub loose_title: f64,
    /// Per-name similarity for two authors to count as the same person
    pub author: f64,
}

impl Default for DedupThresholds {
    fn default() -> Self {
        Self {
            title: 0.85,
            title_journal: 0.85,
            journal: 0.85,
            loose_title: 0.70,
            author: 0.8,
        }
    }
}

/// Which trigger fired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateReason {
    TitleAndAuthor,
    TitleMatchesJournal,
    JournalTitleAndAuthor,
}

impl DuplicateReason {
    /// Short tag for status lines
    pub fn tag(&self) -> &'static str {
        match self {
            DuplicateReason::TitleAndAuthor => "title+author",
            DuplicateReason::TitleMatchesJournal => "title~journal",
            DuplicateReason::JournalTitleAndAuthor => "journal+title+author",
        }
    }
}

impl fmt::Display for DuplicateReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A rejected candidate and what it collided with
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub reason: DuplicateReason,
    /// Title of the previously accepted entry
    pub existing_title: String,
}

/// Thresholds plus the compiled author separator
#[derive(Debug, Clone)]
pub struct DuplicateRules {
    thresholds: DedupThresholds,
    author_separator: Regex,
}

impl DuplicateRules {
    pub fn new(thresholds: DedupThresholds) -> Result<Self> {
        let author_separator =
            Regex::new(r",|\band\b").map_err(|e| ScholarFeedError::Config(e.to_string()))?;
        Ok(Self {
            thresholds,
            author_separator,
        })
    }

    /// Split an author string into lower-cased, trimmed names.
    pub fn split_authors(&self, authors: &str) -> Vec<String> {
        self.author_separator
            .split(authors)
            .map(|name| name.trim().to_lowercase())
            .filter(|name| !name.is_empty())
            .collect()
    }

    /// True when some pair of names across the two author strings is similar enough.
    pub fn authors_overlap(&self, a: &str, b: &str) -> bool {
        let left = self.split_authors(a);
        let right = self.split_authors(b);
        left.iter()
            .any(|x| right.iter().any(|y| ratio(x, y) > self.thresholds.author))
    }

    /// Reason `candidate` duplicates `existing`, if it does.
    pub fn duplicate_reason(
        &self,
        candidate: &PublicationEntry,
        existing: &PublicationEntry,
    ) -> Option<DuplicateReason> {
        let t = &self.thresholds;
        let title_sim = ratio(&candidate.title, &existing.title);
        let shared_author = || self.authors_overlap(&candidate.authors, &existing.authors);

        if title_sim > t.title && shared_author() {
            return Some(DuplicateReason::TitleAndAuthor);
        }

        if ratio(&candidate.title, &existing.journal) > t.title_journal
            || ratio(&candidate.journal, &existing.title) > t.title_journal
        {
            return Some(DuplicateReason::TitleMatchesJournal);
        }

        if ratio(&candidate.journal, &existing.journal) > t.journal
            && title_sim > t.loose_title
            && shared_author()
        {
            return Some(DuplicateReason::JournalTitleAndAuthor);
        }

        None
    }

    /// Whether `candidate` duplicates any entry in `accepted`.
    pub fn is_duplicate(
        &self,
        candidate: &PublicationEntry,
        accepted: &[PublicationEntry],
    ) -> bool {
        self.find_duplicate(candidate, accepted).is_some()
    }

    /// First accepted entry `candidate` collides with, in acceptance order.
    pub fn find_duplicate(
        &self,
        candidate: &PublicationEntry,
        accepted: &[PublicationEntry],
    ) -> Option<Rejection> {
        accepted.iter().find_map(|existing| {
            self.duplicate_reason(candidate, existing).map(|reason| Rejection {
                reason,
                existing_title: existing.title.clone(),
            })
        })
    }
}

/// Accumulates accepted entries for one run.
#[derive(Debug)]
pub struct Deduplicator {
    rules: DuplicateRules,
    accepted: Vec<PublicationEntry>,
}

impl Deduplicator {
    pub fn new(thresholds: DedupThresholds) -> Result<Self> {
        Ok(Self {
            rules: DuplicateRules::new(thresholds)?,
            accepted: Vec::new(),
        })
    }

    /// Accept `candidate` unless it duplicates an earlier entry.
    pub fn offer(&mut self, candidate: PublicationEntry) -> std::result::Result<(), Rejection> {
        match self.rules.find_duplicate(&candidate, &self.accepted) {
            Some(rejection) => Err(rejection),
            None => {
                self.accepted.push(candidate);
                Ok(())
            }
        }
    }

    pub fn rules(&self) -> &DuplicateRules {
        &self.rules
    }

    pub fn into_entries(self) -> Vec<PublicationEntry> {
        self.accepted
    }
}
