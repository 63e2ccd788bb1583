//! scholarfeed - Google Scholar profile to static JSON feed
//!
//! Fetches one author's publications, drops near-duplicates and writes the
//! `scholar.json` file the site build reads.
//!
//! ## Usage
//!
//! ```bash
//! scholarfeed fetch --author-id qc6CJjYAAAAJ
//! scholarfeed cookies import exported_cookies.json
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use scholarfeed::{
    adjustments::CitationAdjustments,
    config::{FeedConfig, DEFAULT_SCHOLAR_ID},
    cookies::CookieManager,
    fetcher::Fetcher,
    gscholar::ScholarProfileSource,
    output::resolve_output_path,
    pipeline,
    proxy::{ProxyListFile, ProxyProvider, StaticProxy},
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

// ============================================================================
// CLI Definition
// ============================================================================

/// Google Scholar profile to static JSON publication feed
#[derive(Parser)]
#[command(name = "scholarfeed")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the profile and write scholar.json
    Fetch {
        /// Google Scholar author identifier
        #[arg(long, env = "SCHOLARFEED_AUTHOR_ID", default_value = DEFAULT_SCHOLAR_ID)]
        author_id: String,

        /// Output file (default: ../public, ./public or . + scholar.json)
        #[arg(short, long, env = "SCHOLARFEED_OUTPUT")]
        output: Option<PathBuf>,

        /// Proxy URL (e.g., http://127.0.0.1:7890)
        #[arg(long, env = "SCHOLARFEED_PROXY", conflicts_with = "proxy_list")]
        proxy: Option<String>,

        /// File of candidate proxies, one per line; one is picked at random
        #[arg(long)]
        proxy_list: Option<PathBuf>,

        /// Mirror site URL
        #[arg(long)]
        mirror: Option<String>,

        /// JSON file of extra citation corrections: {"<title>": <delta>}
        #[arg(long)]
        adjustments: Option<PathBuf>,

        /// Cookie file (default: ~/.scholarfeed_cookies.json)
        #[arg(long)]
        cookie_file: Option<PathBuf>,
    },

    /// Manage cookies
    Cookies {
        #[command(subcommand)]
        action: CookieAction,
    },
}

#[derive(Subcommand)]
enum CookieAction {
    /// Clear stored cookies
    Clear,
    /// Show cookie file path
    Path,
    /// Import cookies exported from a browser (JSON array)
    Import {
        /// Exported cookie file
        file: PathBuf,
    },
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Fetch {
            author_id,
            output,
            proxy,
            proxy_list,
            mirror,
            adjustments,
            cookie_file,
        } => {
            run_fetch(
                author_id,
                output,
                proxy,
                proxy_list,
                mirror,
                adjustments,
                cookie_file,
            )
            .await
        }
        Commands::Cookies { action } => {
            handle_cookies(action)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

// ============================================================================
// Fetch
// ============================================================================

async fn run_fetch(
    author_id: String,
    output: Option<PathBuf>,
    proxy: Option<String>,
    proxy_list: Option<PathBuf>,
    mirror: Option<String>,
    adjustments_file: Option<PathBuf>,
    cookie_file: Option<PathBuf>,
) -> Result<ExitCode> {
    let mut adjustments = CitationAdjustments::default();
    if let Some(path) = &adjustments_file {
        adjustments
            .merge_file(path)
            .with_context(|| format!("Failed to load adjustments from {}", path.display()))?;
    }

    let config = FeedConfig {
        scholar_id: author_id,
        base_url: mirror,
        output,
        adjustments,
        ..FeedConfig::default()
    };

    let output_path = match &config.output {
        Some(path) => path.clone(),
        None => {
            let cwd = std::env::current_dir().context("Cannot determine working directory")?;
            resolve_output_path(&cwd)
        }
    };
    info!(author = %config.scholar_id, output = ?output_path, "Starting run");

    let cookies = match cookie_file {
        Some(path) => CookieManager::with_path(path),
        None => CookieManager::default(),
    };
    let provider: Option<Box<dyn ProxyProvider>> = match (proxy, proxy_list) {
        (Some(url), _) => Some(Box::new(StaticProxy::new(url))),
        (None, Some(path)) => Some(Box::new(ProxyListFile::new(path))),
        (None, None) => None,
    };

    let setup = || -> scholarfeed::Result<Fetcher<ScholarProfileSource>> {
        let source = ScholarProfileSource::new(config.base_url.as_deref(), &cookies)?;
        let mut fetcher = Fetcher::new(source, &config);
        if let Some(provider) = provider {
            fetcher = fetcher.with_proxy(provider);
        }
        Ok(fetcher)
    };

    let outcome = pipeline::run_with(setup, &config, &output_path).await;
    Ok(ExitCode::from(outcome.exit_code()))
}

// ============================================================================
// Cookie Management
// ============================================================================

fn handle_cookies(action: CookieAction) -> Result<()> {
    let manager = CookieManager::new()?;

    match action {
        CookieAction::Clear => {
            manager.clear()?;
            println!("Cookies cleared.");
        }
        CookieAction::Path => {
            println!("Cookie file: {:?}", manager.path());
        }
        CookieAction::Import { file } => {
            let count = manager
                .import(&file)
                .with_context(|| format!("Failed to import cookies from {}", file.display()))?;
            println!("Saved {} cookies to {:?}", count, manager.path());
        }
    }

    Ok(())
}
