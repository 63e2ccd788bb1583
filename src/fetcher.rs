//! Resilient access to a [`PublicationSource`].
//!
//! Wraps every network-bound call in a [`RetryPolicy`], spaces requests out
//! with random pauses, and optionally routes through a proxy set up once
//! before the first call.

use crate::config::FeedConfig;
use crate::error::{Result, ScholarFeedError};
use crate::proxy::ProxyProvider;
use crate::retry::{random_between, RetryPolicy};
use crate::source::{AuthorProfile, PublicationSource, RawPublication};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Random pauses that keep request patterns from tripping abuse detection
#[derive(Debug, Clone, PartialEq)]
pub struct Pacing {
    /// Range for the pause before the very first request
    pub initial_min: Duration,
    pub initial_max: Duration,
    /// Range for the pause between consecutive detail fetches
    pub between_min: Duration,
    pub between_max: Duration,
}

impl Pacing {
    /// No pauses at all
    pub fn none() -> Self {
        Self {
            initial_min: Duration::ZERO,
            initial_max: Duration::ZERO,
            between_min: Duration::ZERO,
            between_max: Duration::ZERO,
        }
    }
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            initial_min: Duration::from_secs(1),
            initial_max: Duration::from_secs(3),
            between_min: Duration::from_secs(1),
            between_max: Duration::from_secs(3),
        }
    }
}

async fn pause(min: Duration, max: Duration) {
    let delay = random_between(min, max);
    if !delay.is_zero() {
        debug!(delay_ms = delay.as_millis() as u64, "Pausing");
        tokio::time::sleep(delay).await;
    }
}

/// Outcome of a best-effort detail fetch
#[derive(Debug, Clone, PartialEq)]
pub enum Filled {
    /// The source's complete record
    Complete(RawPublication),
    /// Detail fetch failed; the listed record as it was
    Listed(RawPublication),
}

impl Filled {
    pub fn is_partial(&self) -> bool {
        matches!(self, Filled::Listed(_))
    }

    pub fn into_record(self) -> RawPublication {
        match self {
            Filled::Complete(record) | Filled::Listed(record) => record,
        }
    }
}

/// Fetcher over one source
pub struct Fetcher<S> {
    source: S,
    proxy: Option<Box<dyn ProxyProvider>>,
    lookup_retry: RetryPolicy,
    detail_retry: RetryPolicy,
    pacing: Pacing,
    started: bool,
    fills: usize,
}

impl<S: PublicationSource> Fetcher<S> {
    pub fn new(source: S, config: &FeedConfig) -> Self {
        Self {
            source,
            proxy: None,
            lookup_retry: config.lookup_retry.clone(),
            detail_retry: config.detail_retry.clone(),
            pacing: config.pacing.clone(),
            started: false,
            fills: 0,
        }
    }

    /// Route requests through `provider`'s proxy, set up before the first call.
    pub fn with_proxy(mut self, provider: Box<dyn ProxyProvider>) -> Self {
        self.proxy = Some(provider);
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Set up the proxy, if any. Failures are logged and the run goes on unproxied.
    ///
    /// Returns whether requests now go through a proxy.
    pub fn setup_proxy(&mut self) -> bool {
        let Some(provider) = self.proxy.take() else {
            return false;
        };

        let routed = provider
            .proxy_url()
            .and_then(|url| self.source.route_through(&url));

        match routed {
            Ok(()) => {
                info!(provider = provider.name(), "Proxy configured");
                true
            }
            Err(e) => {
                warn!(
                    provider = provider.name(),
                    error = %e,
                    "Proxy setup failed, continuing without proxy"
                );
                false
            }
        }
    }

    /// Proxy setup and the initial pause, once per fetcher
    async fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;
        self.setup_proxy();
        pause(self.pacing.initial_min, self.pacing.initial_max).await;
    }

    /// Resolve the author profile under the lookup retry budget.
    pub async fn resolve_author(&mut self, scholar_id: &str) -> Result<AuthorProfile> {
        self.start().await;
        let source = &self.source;
        self.lookup_retry
            .run("resolve_author", move || source.resolve_author(scholar_id))
            .await
    }

    /// List the profile's publications, newest first.
    ///
    /// Records with the same (or no) year keep the source's order; records
    /// without a usable year go last.
    pub async fn list_publications(
        &mut self,
        profile: &AuthorProfile,
    ) -> Result<Vec<RawPublication>> {
        self.start().await;
        let source = &self.source;
        let mut publications = self
            .lookup_retry
            .run("list_publications", move || source.list_publications(profile))
            .await?;

        publications.sort_by(|a, b| b.year_key().cmp(&a.year_key()));
        Ok(publications)
    }

    /// Fetch the complete record under the detail retry budget.
    ///
    /// Errors come back as [`ScholarFeedError::DetailFill`].
    pub async fn fill_details(&mut self, publication: &RawPublication) -> Result<RawPublication> {
        self.start().await;
        if self.fills > 0 {
            pause(self.pacing.between_min, self.pacing.between_max).await;
        }
        self.fills += 1;

        let source = &self.source;
        self.detail_retry
            .run("fill_details", move || source.fill_details(publication))
            .await
            .map_err(|e| match e {
                fill_error @ ScholarFeedError::DetailFill { .. } => fill_error,
                other => ScholarFeedError::DetailFill {
                    title: publication.display_title().to_string(),
                    reason: other.to_string(),
                },
            })
    }

    /// Complete record if it can be had, otherwise the listed one.
    pub async fn fill_or_partial(&mut self, publication: &RawPublication) -> Filled {
        match self.fill_details(publication).await {
            Ok(filled) => Filled::Complete(filled),
            Err(e) => {
                warn!(error = %e, "Detail fetch failed, keeping listed data");
                Filled::Listed(publication.clone())
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::proxy::StaticProxy;
    use crate::source::AuthorField;
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;
    use tokio::time::Instant;
    use url::Url;

    /// In-memory source with scripted failures
    #[derive(Default)]
    pub(crate) struct FakeSource {
        pub profile: Option<AuthorProfile>,
        pub listing: Vec<RawPublication>,
        /// Complete records by publication id
        pub details: HashMap<String, RawPublication>,
        /// Failures to serve before author lookup succeeds
        pub lookup_failures: Cell<u32>,
        /// Failures to serve before each detail fetch succeeds, by publication id
        pub detail_failures: RefCell<HashMap<String, u32>>,
        pub lookup_calls: Cell<u32>,
        pub detail_calls: Cell<u32>,
        pub proxy: Option<Url>,
        pub accepts_proxy: bool,
    }

    impl FakeSource {
        pub(crate) fn with_profile(scholar_id: &str) -> Self {
            Self {
                profile: Some(AuthorProfile {
                    scholar_id: scholar_id.to_string(),
                    name: "M. Mohsin".to_string(),
                    affiliation: None,
                }),
                ..Default::default()
            }
        }
    }

    impl PublicationSource for FakeSource {
        fn route_through(&mut self, proxy: &Url) -> Result<()> {
            if !self.accepts_proxy {
                return Err(ScholarFeedError::ProxySetup("refused".into()));
            }
            self.proxy = Some(proxy.clone());
            Ok(())
        }

        async fn resolve_author(&self, scholar_id: &str) -> Result<AuthorProfile> {
            self.lookup_calls.set(self.lookup_calls.get() + 1);
            if self.lookup_failures.get() > 0 {
                self.lookup_failures.set(self.lookup_failures.get() - 1);
                return Err(ScholarFeedError::Captcha);
            }
            self.profile
                .clone()
                .filter(|p| p.scholar_id == scholar_id)
                .ok_or_else(|| ScholarFeedError::NotFound(scholar_id.to_string()))
        }

        async fn list_publications(&self, _profile: &AuthorProfile) -> Result<Vec<RawPublication>> {
            Ok(self.listing.clone())
        }

        async fn fill_details(&self, publication: &RawPublication) -> Result<RawPublication> {
            self.detail_calls.set(self.detail_calls.get() + 1);
            let id = publication.author_pub_id.clone().unwrap_or_default();
            if let Some(left) = self.detail_failures.borrow_mut().get_mut(&id) {
                if *left > 0 {
                    *left -= 1;
                    return Err(ScholarFeedError::RateLimited(1));
                }
            }
            self.details
                .get(&id)
                .cloned()
                .ok_or_else(|| ScholarFeedError::Parse(format!("no detail for {id}")))
        }
    }

    pub(crate) fn listed(title: &str, year: Option<&str>, pub_id: &str) -> RawPublication {
        RawPublication {
            title: Some(title.to_string()),
            author: Some(AuthorField::Text("M Mohsin".to_string())),
            pub_year: year.map(str::to_string),
            author_pub_id: Some(pub_id.to_string()),
            ..Default::default()
        }
    }

    fn fetcher(source: FakeSource) -> Fetcher<FakeSource> {
        Fetcher::new(source, &FeedConfig::for_author("AbCdEf123").without_delays())
    }

    #[tokio::test]
    async fn test_resolve_author_retries_transient_failures() {
        let source = FakeSource::with_profile("AbCdEf123");
        source.lookup_failures.set(2);
        let mut fetcher = fetcher(source);

        let profile = fetcher.resolve_author("AbCdEf123").await.expect("third attempt succeeds");
        assert_eq!(profile.name, "M. Mohsin");
        assert_eq!(fetcher.source().lookup_calls.get(), 3);
    }

    #[tokio::test]
    async fn test_resolve_author_not_found_after_retries() {
        let mut fetcher = fetcher(FakeSource::default());
        let err = fetcher.resolve_author("missing").await.expect_err("no profile");
        assert!(matches!(err, ScholarFeedError::NotFound(_)));
        assert_eq!(fetcher.source().lookup_calls.get(), 3);
    }

    #[tokio::test]
    async fn test_listing_sorted_by_year_desc_stable() {
        let mut source = FakeSource::with_profile("AbCdEf123");
        source.listing = vec![
            listed("Old", Some("2019"), "a:1"),
            listed("Undated", None, "a:2"),
            listed("New A", Some("2024"), "a:3"),
            listed("Mid", Some("2021"), "a:4"),
            listed("New B", Some("2024"), "a:5"),
        ];
        let mut fetcher = fetcher(source);
        let profile = fetcher.resolve_author("AbCdEf123").await.expect("profile");
        let listing = fetcher.list_publications(&profile).await.expect("listing");

        let titles: Vec<&str> = listing.iter().map(|p| p.display_title()).collect();
        assert_eq!(titles, vec!["New A", "New B", "Mid", "Old", "Undated"]);
    }

    #[tokio::test]
    async fn test_fill_retries_then_falls_back() {
        let mut source = FakeSource::with_profile("AbCdEf123");
        let mut complete = listed("Flaky", Some("2022"), "a:1");
        complete.num_citations = Some(9);
        complete.filled = true;
        source.details.insert("a:1".into(), complete.clone());
        source.detail_failures.borrow_mut().insert("a:1".into(), 1);
        source.detail_failures.borrow_mut().insert("a:2".into(), 5);

        let mut fetcher = fetcher(source);

        // one transient failure fits in the 2-attempt budget
        let filled = fetcher.fill_or_partial(&listed("Flaky", Some("2022"), "a:1")).await;
        assert_eq!(filled, Filled::Complete(complete));

        // two failures exhaust it; the partial record is kept
        let partial = listed("Down", Some("2020"), "a:2");
        let err = fetcher.fill_details(&partial).await.expect_err("budget exhausted");
        assert!(matches!(err, ScholarFeedError::DetailFill { .. }));
        let fallback = fetcher.fill_or_partial(&partial).await;
        assert!(fallback.is_partial());
        assert_eq!(fallback.into_record(), partial);
        assert_eq!(fetcher.source().detail_calls.get(), 2 + 2 + 2);
    }

    #[tokio::test]
    async fn test_proxy_applied_once_before_first_call() {
        let mut source = FakeSource::with_profile("AbCdEf123");
        source.accepts_proxy = true;
        let proxy = StaticProxy::new("http://127.0.0.1:7890");
        let mut fetcher = fetcher(source).with_proxy(Box::new(proxy));

        fetcher.resolve_author("AbCdEf123").await.expect("profile");
        let proxy = fetcher.source().proxy.clone().expect("proxy routed");
        assert_eq!(proxy.port(), Some(7890));
    }

    #[tokio::test]
    async fn test_proxy_failure_is_not_fatal() {
        let source = FakeSource::with_profile("AbCdEf123");
        let mut fetcher = fetcher(source).with_proxy(Box::new(StaticProxy::new("ftp://nowhere")));

        let profile = fetcher.resolve_author("AbCdEf123").await.expect("runs unproxied");
        assert_eq!(profile.scholar_id, "AbCdEf123");
        assert!(fetcher.source().proxy.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacing_before_first_call_and_between_fills() {
        let mut source = FakeSource::with_profile("AbCdEf123");
        let records: Vec<RawPublication> = ["a:1", "a:2", "a:3"]
            .iter()
            .map(|id| listed(id, Some("2024"), id))
            .collect();
        for record in &records {
            let id = record.author_pub_id.clone().unwrap_or_default();
            source.details.insert(id, record.clone());
        }

        let mut config = FeedConfig::for_author("AbCdEf123").without_delays();
        config.pacing = Pacing {
            initial_min: Duration::from_secs(2),
            initial_max: Duration::from_secs(2),
            between_min: Duration::from_secs(5),
            between_max: Duration::from_secs(5),
        };
        let mut fetcher = Fetcher::new(source, &config);
        let within = |elapsed: Duration, secs: u64| {
            elapsed >= Duration::from_secs(secs) && elapsed < Duration::from_secs(secs + 1)
        };

        let started = Instant::now();
        fetcher.resolve_author("AbCdEf123").await.expect("profile");
        assert!(within(started.elapsed(), 2), "initial pause: {:?}", started.elapsed());

        let before_fills = Instant::now();
        fetcher.fill_details(&records[0]).await.expect("first fill");
        assert_eq!(before_fills.elapsed(), Duration::ZERO);

        fetcher.fill_details(&records[1]).await.expect("second fill");
        assert!(within(before_fills.elapsed(), 5));

        let before_third = Instant::now();
        fetcher.fill_details(&records[2]).await.expect("third fill");
        assert!(within(before_third.elapsed(), 5));

        // the initial pause happens once
        let later = Instant::now();
        fetcher.resolve_author("AbCdEf123").await.expect("profile");
        assert_eq!(later.elapsed(), Duration::ZERO);
    }
}
