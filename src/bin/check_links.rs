//! CLI binary `check-links`.
//!
//! Scans the site sources for external links, checks each one and writes
//! the findings report. Exits 1 when any link is broken.

use anyhow::{Context, Result};
use clap::Parser;
use siteworks::cli::{bold, green, init_logging, red, CliProgress};
use siteworks::config::{CheckerConfig, SiteConfig, DEFAULT_SITE_URL};
use siteworks::http::ReqwestTransport;
use siteworks::links::{scan_site, ExternalityFilter, LinkChecker, LinkReport};
use siteworks::ProgressCallback;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::info;

/// Check the external links of a Jekyll site and report broken ones.
#[derive(Parser, Debug)]
#[command(
    name = "check-links",
    version,
    about = "Check the external links of a Jekyll site and report broken ones",
    color = clap::ColorChoice::Auto
)]
struct Cli {
    /// Site checkout containing _pages, _posts, _includes and _layouts.
    #[arg(long, env = "SITEWORKS_SITE_ROOT", default_value = ".")]
    root: PathBuf,

    /// Public URL of the site; links to its host are not checked.
    #[arg(long, env = "SITEWORKS_SITE_URL", default_value = DEFAULT_SITE_URL)]
    site_url: String,

    /// Report path. Default: <root>/_data/brokenlinks.json.
    #[arg(short, long, env = "SITEWORKS_REPORT")]
    output: Option<PathBuf>,

    /// Per-request timeout in seconds.
    #[arg(long, env = "SITEWORKS_TIMEOUT", default_value_t = 10)]
    timeout: u64,

    /// Pause between two links in milliseconds.
    #[arg(long, env = "SITEWORKS_REQUEST_DELAY_MS", default_value_t = 500)]
    delay_ms: u64,

    /// Show a progress bar instead of per-link log lines.
    #[arg(long, env = "SITEWORKS_PROGRESS")]
    progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "SITEWORKS_VERBOSE")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let show_progress = cli.progress && !cli.verbose;
    init_logging(cli.verbose, show_progress);

    let mut site = SiteConfig::new(&cli.root);
    site.site_url = cli.site_url.clone();
    if let Some(out) = &cli.output {
        site.report_path = out.clone();
    }

    let config = CheckerConfig {
        timeout: Duration::from_secs(cli.timeout),
        request_delay: Duration::from_millis(cli.delay_ms),
        ..CheckerConfig::default()
    };

    let filter = ExternalityFilter::new(&site.site_url).context("Invalid --site-url")?;
    let mut links = scan_site(&site.root, &filter)
        .with_context(|| format!("Failed to scan {}", site.root.display()))?;

    let transport =
        ReqwestTransport::new(&config.user_agent, config.timeout).context("Failed to build HTTP client")?;
    let checker = LinkChecker::new(transport, config).context("Invalid checker settings")?;

    let progress: ProgressCallback = if show_progress {
        CliProgress::new("links") as ProgressCallback
    } else {
        siteworks::progress::noop()
    };
    info!("Checking {} links...", links.len());
    checker.check_all(links.records_mut(), &progress).await;

    let report = LinkReport::now(links.into_records());
    report
        .write(&site.report_path)
        .with_context(|| format!("Failed to write {}", site.report_path.display()))?;

    eprintln!(
        "{} links checked, {} broken  →  {}",
        bold(&report.total_links.to_string()),
        if report.has_broken() {
            red(&report.broken_links_count.to_string())
        } else {
            green("0")
        },
        site.report_path.display()
    );
    for link in report.broken() {
        eprintln!("  {} {}", red("✗"), link.link_url);
        eprintln!("      in {}", link.source_files.join(", "));
    }

    Ok(if report.has_broken() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
