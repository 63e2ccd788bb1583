//! Raw records and the seam to the external profile source.
//!
//! The [`Fetcher`](crate::fetcher::Fetcher) only talks to a [`PublicationSource`];
//! the live implementation is [`ScholarProfileSource`](crate::gscholar::ScholarProfileSource)
//! and tests plug in an in-memory one.

use crate::error::{Result, ScholarFeedError};
use crate::normalize::UNTITLED;
use serde::{Deserialize, Serialize};
use url::Url;

/// An author profile as resolved by the source
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct AuthorProfile {
    /// Identifier the profile was looked up by
    pub scholar_id: String,
    /// Display name
    pub name: String,
    /// Affiliation line, if the profile shows one
    pub affiliation: Option<String>,
}

/// Author data as the source provides it: one free-text string or a list of names.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum AuthorField {
    Text(String),
    List(Vec<String>),
}

impl AuthorField {
    /// Render as a single display string; lists are joined with ", ".
    pub fn joined(&self) -> String {
        match self {
            AuthorField::Text(text) => text.clone(),
            AuthorField::List(names) => names.join(", "),
        }
    }
}

/// Bibliographic record, partial until it has been filled
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RawPublication {
    pub title: Option<String>,
    pub author: Option<AuthorField>,
    pub journal: Option<String>,
    pub venue: Option<String>,
    /// Free-text citation line, e.g. "Nature 45, 123-130, 2019"
    pub citation: Option<String>,
    pub publisher: Option<String>,
    pub pub_year: Option<String>,
    pub num_citations: Option<u64>,
    /// Per-publication id used for the citation deep link
    pub author_pub_id: Option<String>,
    /// Whether the complete record has been fetched
    #[serde(default)]
    pub filled: bool,
}

impl RawPublication {
    /// Title for log lines, never empty
    pub fn display_title(&self) -> &str {
        self.title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(UNTITLED)
    }

    /// Numeric publication year used for ordering; missing or unparsable years give `None`.
    pub fn year_key(&self) -> Option<i32> {
        self.pub_year.as_deref().and_then(|y| y.trim().parse().ok())
    }
}

/// External profile-data source.
///
/// Each method performs one network-bound operation; retries and pacing are
/// applied by the caller.
#[allow(async_fn_in_trait)]
pub trait PublicationSource {
    /// Send all further requests through `proxy`.
    fn route_through(&mut self, proxy: &Url) -> Result<()> {
        Err(ScholarFeedError::ProxySetup(format!(
            "source cannot route through {}",
            proxy
        )))
    }

    /// Look up the profile; fails with `NotFound` if nothing matches.
    async fn resolve_author(&self, scholar_id: &str) -> Result<AuthorProfile>;

    /// Publications declared on the profile, with partial data.
    async fn list_publications(&self, profile: &AuthorProfile) -> Result<Vec<RawPublication>>;

    /// Fetch the complete record for one publication.
    async fn fill_details(&self, publication: &RawPublication) -> Result<RawPublication>;
}
