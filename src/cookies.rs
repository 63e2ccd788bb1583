//! Session cookies for Google Scholar requests.
//!
//! Scholar serves CAPTCHA pages to clients without a session much sooner, so
//! cookies exported from a browser are kept in a JSON file and sent along.

use crate::error::{Result, ScholarFeedError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Default cookie file path: `~/.scholarfeed_cookies.json`
fn default_cookie_path() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|p| p.join(".scholarfeed_cookies.json"))
        .ok_or_else(|| ScholarFeedError::Config("Cannot determine home directory".to_string()))
}

/// Cookie entry in the browser-export format
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub http_only: bool,
    #[serde(default)]
    pub expires: Option<f64>,
}

/// Loads and stores the cookie file
pub struct CookieManager {
    path: PathBuf,
}

impl CookieManager {
    /// Manager for the default cookie file
    pub fn new() -> Result<Self> {
        Ok(Self {
            path: default_cookie_path()?,
        })
    }

    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load cookies from file
    ///
    /// Returns empty vec if file doesn't exist or is invalid
    pub fn load(&self) -> Vec<Cookie> {
        if !self.path.exists() {
            debug!("Cookie file not found: {:?}", self.path);
            return Vec::new();
        }

        match std::fs::read_to_string(&self.path) {
            Ok(content) => match serde_json::from_str::<Vec<Cookie>>(&content) {
                Ok(cookies) => {
                    info!("Loaded {} cookies from {:?}", cookies.len(), self.path);
                    cookies
                }
                Err(e) => {
                    warn!("Failed to parse cookies: {}", e);
                    Vec::new()
                }
            },
            Err(e) => {
                warn!("Failed to read cookie file: {}", e);
                Vec::new()
            }
        }
    }

    pub fn save(&self, cookies: &[Cookie]) -> Result<()> {
        let content = serde_json::to_string_pretty(cookies)?;
        std::fs::write(&self.path, content)?;
        info!("Saved {} cookies to {:?}", cookies.len(), self.path);
        Ok(())
    }

    /// Replace the stored cookies with the ones in an exported JSON file
    pub fn import(&self, export: &Path) -> Result<usize> {
        let content = std::fs::read_to_string(export)?;
        let cookies: Vec<Cookie> = serde_json::from_str(&content)?;
        self.save(&cookies)?;
        Ok(cookies.len())
    }

    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
            info!("Cleared cookies at {:?}", self.path);
        }
        Ok(())
    }
}

impl Default for CookieManager {
    fn default() -> Self {
        Self::new().unwrap_or_else(|_| Self {
            path: PathBuf::from(".scholarfeed_cookies.json"),
        })
    }
}

/// `Cookie` header value for the Google domains in `cookies`
pub fn cookie_header(cookies: &[Cookie]) -> String {
    cookies
        .iter()
        .filter(|c| c.domain.contains("google"))
        .map(|c| format!("{}={}", c.name, c.value))
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn cookie(name: &str, domain: &str) -> Cookie {
        Cookie {
            name: name.to_string(),
            value: "value".to_string(),
            domain: domain.to_string(),
            path: "/".to_string(),
            secure: true,
            http_only: false,
            expires: None,
        }
    }

    #[test]
    fn test_load_missing_file() {
        let manager = CookieManager::with_path(PathBuf::from("/nonexistent/path"));
        assert!(manager.load().is_empty());
    }

    #[test]
    fn test_save_and_load() -> Result<()> {
        let temp = NamedTempFile::new()?;
        let manager = CookieManager::with_path(temp.path().to_path_buf());

        manager.save(&[cookie("NID", ".google.com")])?;
        let loaded = manager.load();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].name, "NID");
        Ok(())
    }

    #[test]
    fn test_import_and_clear() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let manager = CookieManager::with_path(dir.path().join("cookies.json"));

        let mut export = NamedTempFile::new()?;
        write!(
            export,
            r#"[{{"name":"NID","value":"abc","domain":".google.com"}},{{"name":"GSP","value":"x","domain":"scholar.google.com"}}]"#
        )?;
        assert_eq!(manager.import(export.path())?, 2);
        assert_eq!(manager.load().len(), 2);

        manager.clear()?;
        assert!(!manager.path().exists());
        Ok(())
    }

    #[test]
    fn test_cookie_header_filters_domains() {
        let header = cookie_header(&[
            cookie("NID", ".google.com"),
            cookie("other", ".example.com"),
            cookie("GSP", "scholar.google.com"),
        ]);
        assert_eq!(header, "NID=value; GSP=value");
    }
}
