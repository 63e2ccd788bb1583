//! # scholarfeed
//!
//! Builds the static publication feed for a personal site from a Google
//! Scholar author profile.
//!
//! ## Modules
//!
//! - [`fetcher`] - Retrying, paced access to a [`source::PublicationSource`]
//! - [`gscholar`] - Google Scholar profile scraping
//! - [`normalize`] - Raw records to feed entries
//! - [`dedupe`] - Near-duplicate detection
//! - [`pipeline`] - One end-to-end run and its exit status
//! - [`output`] - Locating, writing and reading `scholar.json`
//! - [`error`] - Custom error types
//!
//! ## Usage
//!
//! ```rust,no_run
//! use scholarfeed::{config::FeedConfig, cookies::CookieManager, fetcher::Fetcher, gscholar, pipeline};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = FeedConfig::default();
//!     let source = gscholar::ScholarProfileSource::new(None, &CookieManager::default())?;
//!     let mut fetcher = Fetcher::new(source, &config);
//!     let outcome = pipeline::run(&mut fetcher, &config, Path::new("public/scholar.json")).await;
//!     println!("exit code {}", outcome.exit_code());
//!     Ok(())
//! }
//! ```

pub mod adjustments;
pub mod config;
pub mod cookies;
pub mod dedupe;
pub mod error;
pub mod fetcher;
pub mod gscholar;
pub mod normalize;
pub mod output;
pub mod pipeline;
pub mod proxy;
pub mod retry;
pub mod similarity;
pub mod source;

pub use error::{Result, ScholarFeedError};
