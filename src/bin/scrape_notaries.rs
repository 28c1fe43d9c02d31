//! CLI binary `scrape-notaries`.
//!
//! Follows the notary directory listing for the county, parses every
//! profile page and writes `notaries.yml`.

use anyhow::{Context, Result};
use clap::Parser;
use siteworks::cli::{bold, dim, green, init_logging};
use siteworks::config::{ScraperConfig, DEFAULT_NOTARY_BASE_URL};
use siteworks::http::ReqwestTransport;
use siteworks::notaries::{scrape_notaries, write_data_file};
use std::path::PathBuf;
use std::time::Duration;

/// Scrape notary profiles from the notary directory.
#[derive(Parser, Debug)]
#[command(
    name = "scrape-notaries",
    version,
    about = "Scrape notary profiles from the notary directory",
    color = clap::ColorChoice::Auto
)]
struct Cli {
    /// Directory site the listing and profile paths are relative to.
    #[arg(long, env = "SITEWORKS_NOTARY_URL", default_value = DEFAULT_NOTARY_BASE_URL)]
    base_url: String,

    /// Directory receiving notaries.yml.
    #[arg(long, env = "SITEWORKS_DATA_DIR", default_value = "_data")]
    out_dir: PathBuf,

    /// Pause between profile pages in milliseconds.
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
        ..ScraperConfig::notaries()
    };
    let transport =
        ReqwestTransport::new(&config.user_agent, config.timeout).context("Failed to build HTTP client")?;

    let notaries = scrape_notaries(&transport, &config)
        .await
        .context("Failed to scrape notary directory")?;
    let path = write_data_file(&notaries, &cli.out_dir)
        .with_context(|| format!("Failed to write data file to {}", cli.out_dir.display()))?;

    eprintln!(
        "{} {} notaries  →  {}",
        green("✔"),
        bold(&notaries.len().to_string()),
        path.display()
    );
    for notary in &notaries {
        eprintln!(
            "  {}  {}",
            notary.name,
            dim(notary.phone.as_deref().unwrap_or("no phone"))
        );
    }
    Ok(())
}
