//! Optional proxy capability.
//!
//! A [`ProxyProvider`] is asked once, before the first request, for the proxy
//! to route through. Failure is never fatal: the fetcher logs it and carries
//! on with a direct connection.

use crate::error::{Result, ScholarFeedError};
use rand::seq::SliceRandom;
use std::path::PathBuf;
use tracing::debug;
use url::Url;

/// Something that can hand out a proxy URL
pub trait ProxyProvider {
    /// Short label for log lines
    fn name(&self) -> &str;

    /// Proxy to use for this run
    fn proxy_url(&self) -> Result<Url>;
}

/// A single, fixed proxy (e.g. `http://127.0.0.1:7890`)
#[derive(Debug, Clone)]
pub struct StaticProxy {
    url: String,
}

impl StaticProxy {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl ProxyProvider for StaticProxy {
    fn name(&self) -> &str {
        "static"
    }

    fn proxy_url(&self) -> Result<Url> {
        parse_proxy(&self.url)
    }
}

/// Picks one proxy at random from a text file of candidates.
///
/// One entry per line, either a full URL or `host:port` (taken as `http://`).
/// Blank lines and lines starting with `#` are skipped.
#[derive(Debug, Clone)]
pub struct ProxyListFile {
    path: PathBuf,
}

impl ProxyListFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// All usable candidates in file order
    pub fn candidates(&self) -> Result<Vec<Url>> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            ScholarFeedError::ProxySetup(format!("Cannot read proxy list {:?}: {}", self.path, e))
        })?;

        let candidates: Vec<Url> = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(|line| match parse_proxy(line) {
                Ok(url) => Some(url),
                Err(e) => {
                    debug!(line = line, error = %e, "Skipping proxy entry");
                    None
                }
            })
            .collect();

        Ok(candidates)
    }
}

impl ProxyProvider for ProxyListFile {
    fn name(&self) -> &str {
        "list"
    }

    fn proxy_url(&self) -> Result<Url> {
        let candidates = self.candidates()?;
        candidates
            .choose(&mut rand::thread_rng())
            .cloned()
            .ok_or_else(|| {
                ScholarFeedError::ProxySetup(format!("No usable proxies in {:?}", self.path))
            })
    }
}

fn parse_proxy(raw: &str) -> Result<Url> {
    let with_scheme = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("http://{}", raw)
    };

    let url = Url::parse(&with_scheme)
        .map_err(|e| ScholarFeedError::ProxySetup(format!("Invalid proxy URL '{}': {}", raw, e)))?;

    match url.scheme() {
        "http" | "https" if url.host().is_some() => Ok(url),
        _ => Err(ScholarFeedError::ProxySetup(format!(
            "Unsupported proxy URL '{}'",
            raw
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_static_proxy() {
        let url = StaticProxy::new("http://127.0.0.1:7890")
            .proxy_url()
            .expect("valid proxy");
        assert_eq!(url.port(), Some(7890));

        let bare = StaticProxy::new("10.0.0.1:3128").proxy_url().expect("host:port");
        assert_eq!(bare.scheme(), "http");

        assert!(StaticProxy::new("ftp://example.com").proxy_url().is_err());
    }

    #[test]
    fn test_proxy_list_file() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "# free proxies")?;
        writeln!(file, "10.0.0.1:3128")?;
        writeln!(file)?;
        writeln!(file, "https://10.0.0.2:1080")?;
        writeln!(file, "not a proxy")?;

        let provider = ProxyListFile::new(file.path());
        let candidates = provider.candidates()?;
        assert_eq!(candidates.len(), 2);

        let picked = provider.proxy_url()?;
        assert!(candidates.contains(&picked));
        Ok(())
    }

    #[test]
    fn test_proxy_list_errors() -> Result<()> {
        let missing = ProxyListFile::new("/nonexistent/proxies.txt");
        assert!(matches!(missing.proxy_url(), Err(ScholarFeedError::ProxySetup(_))));

        let file = NamedTempFile::new()?;
        let empty = ProxyListFile::new(file.path());
        assert!(matches!(empty.proxy_url(), Err(ScholarFeedError::ProxySetup(_))));
        Ok(())
    }
}
