//! The JSON artifact read by the site build.
//!
//! Output lands in `../public/scholar.json`, `./public/scholar.json` or
//! `./scholar.json`, whichever `public` directory exists first, so the same
//! command works from the project root or one of its subdirectories.
//! Writes go to a temporary file next to the target and are renamed into
//! place, so readers never see a half-written feed. The renamed file keeps
//! the mode of the feed it replaces, or gets `0644` when there was none.

use crate::config::OUTPUT_FILE_NAME;
use crate::error::{Result, ScholarFeedError};
use crate::normalize::PublicationEntry;
use std::fs::Permissions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Output file location relative to `base` (normally the working directory).
pub fn resolve_output_path(base: &Path) -> PathBuf {
    let candidates = [base.join("..").join("public"), base.join("public")];

    for dir in candidates {
        if dir.is_dir() {
            debug!(dir = ?dir, "Using public directory");
            return dir.join(OUTPUT_FILE_NAME);
        }
    }

    base.join(OUTPUT_FILE_NAME)
}

/// Serialize `entries` as indented JSON and atomically replace `path`.
pub fn write_entries(path: &Path, entries: &[PublicationEntry]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let json = serde_json::to_string_pretty(entries)?;

    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(json.as_bytes())?;
    temp.write_all(b"\n")?;
    temp.flush()?;
    if let Some(permissions) = feed_permissions(path) {
        temp.as_file().set_permissions(permissions)?;
    }
    temp.persist(path).map_err(|e| ScholarFeedError::Io(e.error))?;

    info!(path = ?path, count = entries.len(), "Wrote publication feed");
    Ok(())
}

/// Mode for the feed at `path`: the current file's, else world-readable.
fn feed_permissions(path: &Path) -> Option<Permissions> {
    match std::fs::metadata(path) {
        Ok(meta) => Some(meta.permissions()),
        Err(_) => default_permissions(),
    }
}

#[cfg(unix)]
fn default_permissions() -> Option<Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn default_permissions() -> Option<Permissions> {
    None
}

/// Entries of an existing feed file.
pub fn load_entries(path: &Path) -> Result<Vec<PublicationEntry>> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
