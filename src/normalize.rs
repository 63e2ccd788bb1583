//! Normalization of raw source records into feed entries.

use crate::adjustments::CitationAdjustments;
use crate::error::{Result, ScholarFeedError};
use crate::source::RawPublication;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const UNKNOWN_AUTHOR: &str = "Unknown Author";
pub const UNKNOWN_JOURNAL: &str = "Preprint/Unknown";
pub const NO_DATE: &str = "n.d.";
pub const UNTITLED: &str = "Untitled";

/// Base URL of Google Scholar profile pages
pub const PROFILE_BASE_URL: &str = "https://scholar.google.com/citations";

/// One publication in the output feed.
///
/// Field names and types are the contract with the site build that reads the
/// JSON file; do not rename them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublicationEntry {
    pub title: String,
    pub authors: String,
    pub journal: String,
    pub year: String,
    pub citations: u64,
    pub link: String,
}

/// Maps raw records to [`PublicationEntry`] values for one author
#[derive(Debug, Clone)]
pub struct Normalizer {
    scholar_id: String,
    adjustments: CitationAdjustments,
    page_range: Regex,
    trailing_number: Regex,
}

impl Normalizer {
    pub fn new(scholar_id: impl Into<String>, adjustments: CitationAdjustments) -> Result<Self> {
        let page_range = Regex::new(r",\s*\d+\s*[-–]\s*\d+\s*$")
            .map_err(|e| ScholarFeedError::Config(e.to_string()))?;
        let trailing_number =
            Regex::new(r",\s*\d+\s*$").map_err(|e| ScholarFeedError::Config(e.to_string()))?;

        Ok(Self {
            scholar_id: scholar_id.into(),
            adjustments,
            page_range,
            trailing_number,
        })
    }

    /// Build the canonical entry for one raw record.
    pub fn normalize(&self, raw: &RawPublication) -> PublicationEntry {
        let title = raw
            .title
            .as_deref()
            .and_then(non_blank)
            .map(title_case)
            .unwrap_or_else(|| UNTITLED.to_string());

        let authors = raw
            .author
            .as_ref()
            .map(|a| a.joined())
            .and_then(|a| non_blank(&a).map(str::to_string))
            .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string());

        let year = raw
            .pub_year
            .as_deref()
            .and_then(non_blank)
            .map(str::to_string)
            .unwrap_or_else(|| NO_DATE.to_string());

        let citations = self.adjustments.apply(&title, raw.num_citations.unwrap_or(0));

        PublicationEntry {
            journal: self.journal_of(raw),
            link: self.link_for(raw.author_pub_id.as_deref()),
            title,
            authors,
            year,
            citations,
        }
    }

    /// Resolve the venue: journal, venue, citation text after the first comma,
    /// publisher; then strip trailing page/issue fragments.
    pub fn journal_of(&self, raw: &RawPublication) -> String {
        let from_citation = raw
            .citation
            .as_deref()
            .and_then(|c| c.split_once(','))
            .map(|(_, rest)| rest);

        let resolved = [
            raw.journal.as_deref(),
            raw.venue.as_deref(),
            from_citation,
            raw.publisher.as_deref(),
        ]
        .into_iter()
        .flatten()
        .find_map(non_blank);

        resolved
            .map(|j| self.clean_journal(j))
            .filter(|j| !j.is_empty())
            .unwrap_or_else(|| UNKNOWN_JOURNAL.to_string())
    }

    /// Remove a trailing `, <num>-<num>` and then a trailing `, <num>`.
    pub fn clean_journal(&self, journal: &str) -> String {
        let without_range = self.page_range.replace(journal.trim(), "");
        let cleaned = self.trailing_number.replace(&without_range, "");
        cleaned.trim().to_string()
    }

    /// Citation deep link when the publication id is known, profile link otherwise.
    pub fn link_for(&self, author_pub_id: Option<&str>) -> String {
        match author_pub_id.and_then(non_blank) {
            Some(pub_id) => format!(
                "{}?view_op=view_citation&hl=en&user={}&citation_for_view={}",
                PROFILE_BASE_URL, self.scholar_id, pub_id
            ),
            None => format!("{}?user={}", PROFILE_BASE_URL, self.scholar_id),
        }
    }
}

/// Upper-case the first letter of every word and lower-case the rest.
///
/// A word starts at any letter not preceded by another letter.
pub fn title_case(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_word = false;

    for c in raw.trim().chars() {
        if c.is_alphabetic() {
            let mapped: Vec<char> = if in_word {
                c.to_lowercase().collect()
            } else {
                c.to_uppercase().collect()
            };
            // multi-char mappings (e.g. 'ß') would not survive a second pass
            match mapped.as_slice() {
                [single] => out.push(*single),
                _ => out.push(c),
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }

    out
}

fn non_blank(s: &str) -> Option<&str> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::AuthorField;

    fn normalizer() -> Normalizer {
        Normalizer::new("AbCdEf123", CitationAdjustments::default()).expect("regexes compile")
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("deep learning for x"), "Deep Learning For X");
        assert_eq!(title_case("IEEE TRANSACTIONS on ai"), "Ieee Transactions On Ai");
        assert_eq!(title_case("  self-supervised learning "), "Self-Supervised Learning");
    }

    #[test]
    fn test_title_case_idempotent() {
        for raw in [
            "deep learning for x",
            "Data privacy preservation with federated learning: a systematic review",
            "straße und ÄPFEL",
            "it's 3d-cnn",
        ] {
            let once = title_case(raw);
            assert_eq!(title_case(&once), once, "not idempotent for {raw:?}");
        }
    }

    #[test]
    fn test_clean_journal() {
        let n = normalizer();
        assert_eq!(n.clean_journal("IEEE Trans., 2019-2020"), "IEEE Trans.");
        assert_eq!(n.clean_journal("Nature, 45"), "Nature");
        assert_eq!(n.clean_journal("Medical Image Analysis"), "Medical Image Analysis");
        // only trailing fragments are removed
        assert_eq!(n.clean_journal("Proc. 12, Vision Workshop"), "Proc. 12, Vision Workshop");
        assert_eq!(n.clean_journal("Nature 45"), "Nature 45");
    }

    #[test]
    fn test_journal_priority() {
        let n = normalizer();
        let mut raw = RawPublication {
            journal: Some("Journal A".into()),
            venue: Some("Venue B".into()),
            citation: Some("Ignored, Citation C".into()),
            publisher: Some("Publisher D".into()),
            ..Default::default()
        };
        assert_eq!(n.journal_of(&raw), "Journal A");
        raw.journal = None;
        assert_eq!(n.journal_of(&raw), "Venue B");
        raw.venue = Some("   ".into());
        assert_eq!(n.journal_of(&raw), "Citation C");
        raw.citation = Some("No comma here".into());
        assert_eq!(n.journal_of(&raw), "Publisher D");
        raw.publisher = None;
        assert_eq!(n.journal_of(&raw), UNKNOWN_JOURNAL);
    }

    #[test]
    fn test_journal_from_citation_is_cleaned() {
        let n = normalizer();
        let raw = RawPublication {
            citation: Some("arXiv preprint, Journal of Imaging, 2021".into()),
            ..Default::default()
        };
        assert_eq!(n.journal_of(&raw), "Journal of Imaging");
    }

    #[test]
    fn test_missing_fields_use_sentinels() {
        let entry = normalizer().normalize(&RawPublication::default());
        assert_eq!(entry.title, UNTITLED);
        assert_eq!(entry.authors, UNKNOWN_AUTHOR);
        assert_eq!(entry.journal, UNKNOWN_JOURNAL);
        assert_eq!(entry.year, NO_DATE);
        assert_eq!(entry.citations, 0);
        assert_eq!(entry.link, "https://scholar.google.com/citations?user=AbCdEf123");

        let blank = RawPublication {
            title: Some(" ".into()),
            author: Some(AuthorField::List(vec![])),
            pub_year: Some("".into()),
            ..Default::default()
        };
        let entry = normalizer().normalize(&blank);
        assert_eq!(entry.title, UNTITLED);
        assert_eq!(entry.authors, UNKNOWN_AUTHOR);
        assert_eq!(entry.year, NO_DATE);
    }

    #[test]
    fn test_normalize_full_record() {
        let raw = RawPublication {
            title: Some("trustworthy AI in healthcare".into()),
            author: Some(AuthorField::List(vec!["M. Mohsin".into(), "B. Co".into()])),
            venue: Some("International Conference on AI, 112-120".into()),
            pub_year: Some("2023".into()),
            num_citations: Some(8),
            author_pub_id: Some("AbCdEf123:u5HHmVD_uO8C".into()),
            ..Default::default()
        };
        let entry = normalizer().normalize(&raw);
        assert_eq!(entry.title, "Trustworthy Ai In Healthcare");
        assert_eq!(entry.authors, "M. Mohsin, B. Co");
        assert_eq!(entry.journal, "International Conference on AI");
        assert_eq!(entry.year, "2023");
        assert_eq!(entry.citations, 8);
        assert_eq!(
            entry.link,
            "https://scholar.google.com/citations?view_op=view_citation&hl=en&user=AbCdEf123&citation_for_view=AbCdEf123:u5HHmVD_uO8C"
        );
    }

    #[test]
    fn test_citation_adjustment_applies_to_title_cased_title() {
        let raw = RawPublication {
            title: Some(
                "Data privacy preservation with federated learning: A systematic review".into(),
            ),
            num_citations: Some(10),
            ..Default::default()
        };
        assert_eq!(normalizer().normalize(&raw).citations, 11);

        let other = RawPublication {
            title: Some("Data privacy in federated learning".into()),
            num_citations: Some(10),
            ..Default::default()
        };
        assert_eq!(normalizer().normalize(&other).citations, 10);
    }

    #[test]
    fn test_entry_json_field_names() {
        let entry = normalizer().normalize(&RawPublication::default());
        let value = serde_json::to_value(&entry).expect("serializable");
        let keys: Vec<&str> = value
            .as_object()
            .expect("object")
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(keys.len(), 6);
        for key in ["title", "authors", "journal", "year", "citations", "link"] {
            assert!(keys.contains(&key), "missing {key}");
        }
        assert!(value["citations"].is_u64());
    }
}
