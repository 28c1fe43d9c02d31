//! CLI binary `scrape-officials`.
//!
//! Scrapes the county's elected-officials table, keeps the justice-related
//! offices and writes `elected-officials.json` and `elected-officials.yml`.

use anyhow::{Context, Result};
use clap::Parser;
use siteworks::cli::{bold, dim, green, init_logging};
use siteworks::config::{ScraperConfig, DEFAULT_COURTS_BASE_URL};
use siteworks::http::ReqwestTransport;
use siteworks::officials::{annotate, scrape_officials, write_data_files, Official, PositionType};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Scrape justice-related elected officials from the county website.
#[derive(Parser, Debug)]
#[command(
    name = "scrape-officials",
    version,
    about = "Scrape justice-related elected officials from the county website",
    color = clap::ColorChoice::Auto
)]
struct Cli {
    /// County website the officials page is relative to.
    #[arg(long, env = "SITEWORKS_COURTS_URL", default_value = DEFAULT_COURTS_BASE_URL)]
    base_url: String,

    /// Directory receiving elected-officials.json and elected-officials.yml.
    #[arg(long, env = "SITEWORKS_DATA_DIR", default_value = "_data")]
    out_dir: PathBuf,

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
        ..ScraperConfig::officials()
    };
    let transport =
        ReqwestTransport::new(&config.user_agent, config.timeout).context("Failed to build HTTP client")?;

    let mut officials = scrape_officials(&transport, &config)
        .await
        .context("Failed to scrape elected officials")?;
    annotate(&mut officials, chrono::Local::now().date_naive());

    let (json, yaml) = write_data_files(&officials, &cli.out_dir)
        .with_context(|| format!("Failed to write data files to {}", cli.out_dir.display()))?;

    eprintln!(
        "{} {} elected officials  →  {}, {}",
        green("✔"),
        bold(&officials.len().to_string()),
        json.display(),
        yaml.display()
    );

    let mut by_position: BTreeMap<PositionType, Vec<&Official>> = BTreeMap::new();
    for official in &officials {
        by_position.entry(official.position_type).or_default().push(official);
    }
    for (position, group) in by_position {
        eprintln!("  {}:", bold(position.label()));
        for official in group {
            let next = official
                .next_election
                .map(|y| format!("next election {y}"))
                .unwrap_or_default();
            eprintln!("    {}: {}  {}", official.title, official.name, dim(&next));
        }
    }
    Ok(())
}
