//! CLI binary `scrape-judges`.
//!
//! Scrapes the court pages, annotates each judge with election data and
//! writes `judges.json` and `judges.yml`.

use anyhow::{Context, Result};
use clap::Parser;
use siteworks::cli::{bold, dim, green, init_logging};
use siteworks::config::{ScraperConfig, DEFAULT_COURTS_BASE_URL};
use siteworks::http::ReqwestTransport;
use siteworks::judges::{elections, scrape_judges, write_data_files, ElectionTable, COURT_PAGES};
use std::path::PathBuf;
use std::time::Duration;

/// Scrape judge profiles from the Bell County court pages.
#[derive(Parser, Debug)]
#[command(
    name = "scrape-judges",
    version,
    about = "Scrape judge profiles from the Bell County court pages",
    color = clap::ColorChoice::Auto
)]
struct Cli {
    /// Court website all page paths are relative to.
    #[arg(long, env = "SITEWORKS_COURTS_URL", default_value = DEFAULT_COURTS_BASE_URL)]
    base_url: String,

    /// Directory receiving judges.json and judges.yml.
    #[arg(long, env = "SITEWORKS_DATA_DIR", default_value = "_data")]
    out_dir: PathBuf,

    /// Do not attach election information.
    #[arg(long)]
    skip_elections: bool,

    /// Pause between court pages in milliseconds.
    #[arg(long, env = "SITEWORKS_SCRAPE_DELAY_MS", default_value_t = 1000)]
    delay_ms: u64,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "SITEWORKS_VERBOSE")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, false);

    let config = ScraperConfig {
        base_url: cli.base_url.clone(),
        request_delay: Duration::from_millis(cli.delay_ms),
        ..ScraperConfig::default()
    };
    let transport =
        ReqwestTransport::new(&config.user_agent, config.timeout).context("Failed to build HTTP client")?;

    let mut judges = scrape_judges(&transport, &config, COURT_PAGES).await;
    if !cli.skip_elections {
        let today = chrono::Local::now().date_naive();
        elections::annotate(&mut judges, &ElectionTable::builtin(), today);
    }

    let (json, yaml) = write_data_files(&judges, &cli.out_dir)
        .with_context(|| format!("Failed to write data files to {}", cli.out_dir.display()))?;

    eprintln!(
        "{} {} judge profiles  →  {}, {}",
        green("✔"),
        bold(&judges.len().to_string()),
        json.display(),
        yaml.display()
    );
    for judge in &judges {
        let next = judge
            .election_info
            .as_ref()
            .and_then(|e| e.next_election)
            .map(|y| format!("next election {y}"))
            .unwrap_or_default();
        eprintln!(
            "  {}: {}  {}",
            judge.court_name,
            judge.judge_name.as_deref().unwrap_or("N/A"),
            dim(&next)
        );
    }
    Ok(())
}
