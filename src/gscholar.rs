//! Google Scholar author-profile scraping.
//!
//! Implements [`PublicationSource`] on top of the public profile pages:
//! the profile listing (`/citations?user=...`) gives partial records, the
//! citation view (`view_op=view_citation`) gives the complete one.

use crate::cookies::{cookie_header, CookieManager};
use crate::error::{Result, ScholarFeedError};
use crate::source::{AuthorField, AuthorProfile, PublicationSource, RawPublication};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Default Google Scholar URL
pub const DEFAULT_SCHOLAR_URL: &str = "https://scholar.google.com";

/// User agent string for requests
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Rows per profile page (the largest page Scholar serves)
const PAGE_SIZE: usize = 100;

/// Upper bound on profile pages walked in one run
const MAX_PROFILE_PAGES: usize = 20;

/// Live profile source
pub struct ScholarProfileSource {
    client: reqwest::Client,
    base_url: String,
    cookie_header: String,
}

impl ScholarProfileSource {
    /// Source for `base_url` (mirror or the default site) using the given cookie file.
    pub fn new(base_url: Option<&str>, cookies: &CookieManager) -> Result<Self> {
        let base_url = base_url
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_SCHOLAR_URL.to_string());

        let cookies = cookies.load();
        if cookies.is_empty() {
            warn!("No cookies loaded. Run 'scholarfeed cookies import <file>' if Scholar serves CAPTCHAs.");
        } else {
            info!("Loaded {} cookies for Google Scholar", cookies.len());
        }

        Ok(Self {
            client: build_http_client(None)?,
            base_url,
            cookie_header: cookie_header(&cookies),
        })
    }

    async fn fetch(&self, url: &Url) -> Result<String> {
        debug!(url = %url, "Fetching page");
        let html = fetch_page_with_cookies(&self.client, url, &self.cookie_header).await?;
        if html.contains("Solving the above CAPTCHA") || html.contains("unusual traffic") {
            warn!(url = %url, "CAPTCHA detected");
            return Err(ScholarFeedError::Captcha);
        }
        Ok(html)
    }
}

impl PublicationSource for ScholarProfileSource {
    fn route_through(&mut self, proxy: &Url) -> Result<()> {
        self.client = build_http_client(Some(proxy.as_str()))?;
        info!(proxy = %proxy, "Routing Scholar requests through proxy");
        Ok(())
    }

    async fn resolve_author(&self, scholar_id: &str) -> Result<AuthorProfile> {
        let url = build_profile_url(&self.base_url, scholar_id, 0)?;
        let html = match self.fetch(&url).await {
            Err(ScholarFeedError::Api { code: 404, .. }) => {
                return Err(ScholarFeedError::NotFound(scholar_id.to_string()))
            }
            other => other?,
        };

        let profile = parse_profile(&html, scholar_id)?
            .ok_or_else(|| ScholarFeedError::NotFound(scholar_id.to_string()))?;
        info!(author = %profile.name, "Resolved author profile");
        Ok(profile)
    }

    async fn list_publications(&self, profile: &AuthorProfile) -> Result<Vec<RawPublication>> {
        let mut publications = Vec::new();

        for page in 0..MAX_PROFILE_PAGES {
            let url = build_profile_url(&self.base_url, &profile.scholar_id, page * PAGE_SIZE)?;
            let html = self.fetch(&url).await?;
            let rows = parse_publication_rows(&html)?;
            let count = rows.len();
            debug!(page = page + 1, count = count, "Parsed profile rows");
            publications.extend(rows);
            if count < PAGE_SIZE {
                break;
            }
        }

        if publications.is_empty() {
            return Err(ScholarFeedError::EmptyResult(format!(
                "no publications listed for {}",
                profile.scholar_id
            )));
        }

        info!(total = publications.len(), "Listed publications");
        Ok(publications)
    }

    async fn fill_details(&self, publication: &RawPublication) -> Result<RawPublication> {
        let pub_id = publication
            .author_pub_id
            .as_deref()
            .ok_or_else(|| ScholarFeedError::DetailFill {
                title: publication.display_title().to_string(),
                reason: "no publication id".to_string(),
            })?;

        let url = build_detail_url(&self.base_url, pub_id)?;
        let html = self.fetch(&url).await?;
        parse_detail_page(&html, publication)
    }
}

/// Build HTTP client with optional proxy
fn build_http_client(proxy: Option<&str>) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(30))
        .cookie_store(true);

    if let Some(proxy_url) = proxy {
        let proxy = reqwest::Proxy::all(proxy_url).map_err(|e| {
            ScholarFeedError::ProxySetup(format!("Invalid proxy URL '{}': {}", proxy_url, e))
        })?;
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|e| ScholarFeedError::Config(format!("Failed to build HTTP client: {}", e)))
}

/// Profile listing URL, `cstart` rows in
fn build_profile_url(base_url: &str, scholar_id: &str, cstart: usize) -> Result<Url> {
    let mut url = Url::parse(&format!("{}/citations", base_url))
        .map_err(|e| ScholarFeedError::Config(format!("Invalid base URL: {}", e)))?;

    url.query_pairs_mut()
        .append_pair("user", scholar_id)
        .append_pair("hl", "en") // Force English locale for consistent parsing
        .append_pair("cstart", &cstart.to_string())
        .append_pair("pagesize", &PAGE_SIZE.to_string())
        .append_pair("sortby", "pubdate");

    Ok(url)
}

/// Citation view URL for one `user:pub` id
fn build_detail_url(base_url: &str, author_pub_id: &str) -> Result<Url> {
    let mut url = Url::parse(&format!("{}/citations", base_url))
        .map_err(|e| ScholarFeedError::Config(format!("Invalid base URL: {}", e)))?;

    url.query_pairs_mut()
        .append_pair("view_op", "view_citation")
        .append_pair("hl", "en")
        .append_pair("citation_for_view", author_pub_id);

    Ok(url)
}

/// Fetch page content using HTTP client with cookies
async fn fetch_page_with_cookies(
    client: &reqwest::Client,
    url: &Url,
    cookie_header: &str,
) -> Result<String> {
    let mut request = client
        .get(url.as_str())
        .header(
            "Accept",
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        )
        .header("Accept-Language", "en-US,en;q=0.9")
        .header("Cache-Control", "no-cache")
        .header("Sec-Fetch-Dest", "document")
        .header("Sec-Fetch-Mode", "navigate")
        .header("Upgrade-Insecure-Requests", "1");

    if !cookie_header.is_empty() {
        request = request.header("Cookie", cookie_header);
    }

    let response = request.send().await?;

    let status = response.status();
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(ScholarFeedError::RateLimited(60));
    }

    if !status.is_success() {
        return Err(ScholarFeedError::Api {
            code: status.as_u16(),
            message: format!("HTTP error: {}", status),
        });
    }

    Ok(response.text().await?)
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| ScholarFeedError::Parse(e.to_string()))
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Profile header; `None` when the page carries no author name.
pub fn parse_profile(html: &str, scholar_id: &str) -> Result<Option<AuthorProfile>> {
    let document = Html::parse_document(html);
    let name_selector = selector("#gsc_prf_in")?;
    let affiliation_selector = selector("#gsc_prf_i .gsc_prf_il")?;

    let Some(name) = document
        .select(&name_selector)
        .next()
        .map(element_text)
        .filter(|n| !n.is_empty())
    else {
        return Ok(None);
    };

    let affiliation = document
        .select(&affiliation_selector)
        .next()
        .map(element_text)
        .filter(|a| !a.is_empty());

    Ok(Some(AuthorProfile {
        scholar_id: scholar_id.to_string(),
        name,
        affiliation,
    }))
}

/// Publication rows of a profile listing page, as partial records.
pub fn parse_publication_rows(html: &str) -> Result<Vec<RawPublication>> {
    let document = Html::parse_document(html);

    let row_selector = selector("tr.gsc_a_tr")?;
    let title_selector = selector("a.gsc_a_at")?;
    let gray_selector = selector("div.gs_gray")?;
    let cites_selector = selector("a.gsc_a_ac")?;
    let year_selector = selector("span.gsc_a_h")?;

    let pub_id_regex = Regex::new(r"citation_for_view=([\w-]+:[\w-]+)")
        .map_err(|e| ScholarFeedError::Parse(e.to_string()))?;

    let mut results = Vec::new();

    for row in document.select(&row_selector) {
        let Some(link) = row.select(&title_selector).next() else {
            continue;
        };

        let title = element_text(link);
        if title.is_empty() {
            continue;
        }

        let href = link
            .value()
            .attr("href")
            .or_else(|| link.value().attr("data-href"))
            .unwrap_or("");
        let author_pub_id = pub_id_regex
            .captures(href)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string());

        let mut gray = row.select(&gray_selector).map(element_text);
        let author = gray
            .next()
            .filter(|a| !a.is_empty())
            .map(AuthorField::Text);
        let citation = gray.next().filter(|c| !c.is_empty());

        let num_citations = row
            .select(&cites_selector)
            .next()
            .and_then(|c| element_text(c).parse().ok());

        let pub_year = row
            .select(&year_selector)
            .next()
            .map(element_text)
            .filter(|y| !y.is_empty());

        results.push(RawPublication {
            title: Some(title),
            author,
            citation,
            pub_year,
            num_citations,
            author_pub_id,
            ..Default::default()
        });
    }

    Ok(results)
}

/// Merge the citation view's fields over `partial`.
pub fn parse_detail_page(html: &str, partial: &RawPublication) -> Result<RawPublication> {
    let document = Html::parse_document(html);

    let title_selector = selector("#gsc_oci_title")?;
    let row_selector = selector("#gsc_oci_table .gs_scl")?;
    let field_selector = selector(".gsc_oci_field")?;
    let value_selector = selector(".gsc_oci_value")?;

    let year_regex =
        Regex::new(r"\b(19|20)\d{2}\b").map_err(|e| ScholarFeedError::Parse(e.to_string()))?;
    let cite_regex =
        Regex::new(r"Cited by\s*(\d+)").map_err(|e| ScholarFeedError::Parse(e.to_string()))?;

    let mut filled = partial.clone();
    let mut seen_fields = 0;

    if let Some(title) = document
        .select(&title_selector)
        .next()
        .map(element_text)
        .filter(|t| !t.is_empty())
    {
        filled.title = Some(title);
    }

    for row in document.select(&row_selector) {
        let (Some(field), Some(value)) = (
            row.select(&field_selector).next().map(element_text),
            row.select(&value_selector).next(),
        ) else {
            continue;
        };
        let text = element_text(value);
        if text.is_empty() {
            continue;
        }
        seen_fields += 1;

        match field.to_lowercase().as_str() {
            "authors" | "inventors" => {
                let names = text
                    .split(',')
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .map(str::to_string)
                    .collect();
                filled.author = Some(AuthorField::List(names));
            }
            "publication date" => {
                if let Some(year) = year_regex.find(&text) {
                    filled.pub_year = Some(year.as_str().to_string());
                }
            }
            "journal" => filled.journal = Some(text),
            "conference" | "book" | "source" => {
                if filled.venue.is_none() {
                    filled.venue = Some(text);
                }
            }
            "publisher" => filled.publisher = Some(text),
            "total citations" => {
                if let Some(count) = cite_regex
                    .captures(&text)
                    .and_then(|caps| caps.get(1))
                    .and_then(|m| m.as_str().parse().ok())
                {
                    filled.num_citations = Some(count);
                }
            }
            _ => {}
        }
    }

    if seen_fields == 0 {
        return Err(ScholarFeedError::Parse(format!(
            "citation view for '{}' has no fields",
            partial.display_title()
        )));
    }

    filled.filled = true;
    Ok(filled)
}
