//! Judge profile scraper for the Bell County court pages.
//!
//! Fetches each court page, extracts the profile with [`parse_judge_profile`],
//! optionally annotates it from an [`ElectionTable`] and writes
//! `judges.json` / `judges.yml` for the site's data directory.

pub mod elections;
pub mod parse;

pub use elections::{election_info_for, next_election_after, ElectionTable};
pub use parse::parse_judge_profile;

use crate::config::ScraperConfig;
use crate::error::ScrapeError;
use crate::http::{fetch_page, page_url, HttpTransport};
use crate::persist::write_json_and_yaml;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::time::sleep;
use tracing::{info, warn};
use url::Url;

/// Address used when a page does not name the courthouse.
pub const DEFAULT_COURT_ADDRESS: &str = "Bell County Justice Center, 1201 Huey Road, Belton, Texas 76513";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CourtType {
    #[serde(rename = "District Court")]
    District,
    #[serde(rename = "County Court at Law")]
    CountyAtLaw,
}

/// A court and the path of its page relative to the base URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CourtPage {
    pub name: &'static str,
    pub court_type: CourtType,
    pub path: &'static str,
}

const fn court(name: &'static str, court_type: CourtType, path: &'static str) -> CourtPage {
    CourtPage {
        name,
        court_type,
        path,
    }
}

/// Every court scraped, district courts first.
pub const COURT_PAGES: &[CourtPage] = &[
    court("27th Judicial District Court", CourtType::District, "county_government/district_courts/27th_district_court/index.php"),
    court("146th Judicial District Court", CourtType::District, "county_government/district_courts/146th_district_court/index.php"),
    court("169th Judicial District Court", CourtType::District, "county_government/district_courts/169th_district_court/index.php"),
    court("264th Judicial District Court", CourtType::District, "county_government/district_courts/264th_district_court/index.php"),
    court("426th Judicial District Court", CourtType::District, "county_government/district_courts/426th_district_court/index.php"),
    court("478th Judicial District Court", CourtType::District, "county_government/district_courts/478th_judicial_district_court/index.php"),
    court("Court at Law 1", CourtType::CountyAtLaw, "county_government/county_courts/court_at_law_1/index.php"),
    court("Court at Law 2", CourtType::CountyAtLaw, "county_government/county_courts/court_at_law_2/index.php"),
    court("Court at Law 3", CourtType::CountyAtLaw, "county_government/county_courts/court_at_law_3/index.php"),
];

/// Election details attached to a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionInfo {
    pub election_year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appointment_year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appointment_date: Option<String>,
    pub next_election: Option<i32>,
    pub term_length_years: u32,
    pub election_notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_until_election: Option<i64>,
}

impl Default for ElectionInfo {
    fn default() -> Self {
        Self {
            election_year: None,
            appointment_year: None,
            appointment_date: None,
            next_election: None,
            term_length_years: elections::TERM_LENGTH_YEARS,
            election_notes: String::new(),
            days_until_election: None,
        }
    }
}

/// Everything known about one court's judge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JudgeProfile {
    pub court_name: String,
    pub court_type: CourtType,
    pub judge_name: Option<String>,
    pub court_coordinator: Option<String>,
    pub coordinator_email: Option<String>,
    pub court_reporter: Option<String>,
    pub phone: Option<String>,
    pub fax: Option<String>,
    pub address: String,
    pub mailing_address: Option<String>,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub election_info: Option<ElectionInfo>,
}

impl JudgeProfile {
    /// Empty profile with the default courthouse address.
    pub fn new(court_name: &str, court_type: CourtType, url: String) -> Self {
        Self {
            court_name: court_name.to_string(),
            court_type,
            judge_name: None,
            court_coordinator: None,
            coordinator_email: None,
            court_reporter: None,
            phone: None,
            fax: None,
            address: DEFAULT_COURT_ADDRESS.to_string(),
            mailing_address: None,
            url,
            election_info: None,
        }
    }
}

/// Absolute URL of a court page.
pub fn court_url(base_url: &str, court: &CourtPage) -> Result<Url, ScrapeError> {
    page_url(base_url, court.path)
}

/// Fetch and parse one court page.
pub async fn scrape_court<T: HttpTransport>(
    transport: &T,
    base_url: &str,
    court: &CourtPage,
) -> Result<Option<JudgeProfile>, ScrapeError> {
    let url = court_url(base_url, court)?;
    let body = fetch_page(transport, url.as_str()).await?;
    Ok(parse_judge_profile(&body, court, url.as_str()))
}

/// Scrape `courts` in order with `request_delay` between pages.
///
/// A page that fails to load or has no article is logged and left out; it
/// never aborts the run.
pub async fn scrape_judges<T: HttpTransport>(
    transport: &T,
    config: &ScraperConfig,
    courts: &[CourtPage],
) -> Vec<JudgeProfile> {
    let mut judges = Vec::new();
    for (i, court) in courts.iter().enumerate() {
        info!("Scraping {}...", court.name);
        match scrape_court(transport, &config.base_url, court).await {
            Ok(Some(profile)) => judges.push(profile),
            Ok(None) => warn!("{}: page has no article, skipping", court.name),
            Err(e) => warn!("{}: {}", court.name, e),
        }
        if i + 1 < courts.len() {
            sleep(config.request_delay).await;
        }
    }
    info!("Scraped {} of {} judge profiles", judges.len(), courts.len());
    judges
}

/// Write `judges.json` and `judges.yml` into `out_dir`. Returns both paths.
pub fn write_data_files(judges: &[JudgeProfile], out_dir: &Path) -> Result<(PathBuf, PathBuf), ScrapeError> {
    write_json_and_yaml(judges, out_dir, "judges")
}
