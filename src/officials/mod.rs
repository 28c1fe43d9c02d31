//! Elected officials scraper for the county's officials page.
//!
//! Only the offices that matter to court users are kept (prosecutors,
//! clerks, sheriff, justices of the peace, constables). The result is
//! written as `elected-officials.json` / `elected-officials.yml`.

pub mod parse;

pub use parse::{parse_date, parse_elected_officials};

use crate::config::ScraperConfig;
use crate::error::ScrapeError;
use crate::http::{fetch_page, page_url, HttpTransport};
use crate::judges::elections::days_until_election;
use crate::persist::write_json_and_yaml;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Officials page relative to the county site.
pub const ELECTED_OFFICIALS_PATH: &str = "about_us/elected_officials/index.php";

/// Every kept office has a four-year term.
pub const TERM_LENGTH_YEARS: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PositionType {
    #[serde(rename = "District Attorney")]
    DistrictAttorney,
    #[serde(rename = "County Attorney")]
    CountyAttorney,
    Sheriff,
    #[serde(rename = "District Clerk")]
    DistrictClerk,
    #[serde(rename = "County Clerk")]
    CountyClerk,
    #[serde(rename = "Justice of the Peace")]
    JusticeOfThePeace,
    Constable,
}

impl PositionType {
    pub fn label(self) -> &'static str {
        match self {
            PositionType::DistrictAttorney => "District Attorney",
            PositionType::CountyAttorney => "County Attorney",
            PositionType::Sheriff => "Sheriff",
            PositionType::DistrictClerk => "District Clerk",
            PositionType::CountyClerk => "County Clerk",
            PositionType::JusticeOfThePeace => "Justice of the Peace",
            PositionType::Constable => "Constable",
        }
    }
}

impl fmt::Display for PositionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One row of the officials table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Official {
    pub title: String,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    /// Date taken office, as printed.
    pub elected_date: String,
    pub elected_year: Option<i32>,
    pub next_election: Option<i32>,
    pub last_election_year: Option<i32>,
    pub position_type: PositionType,
    pub term_length_years: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precinct: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_until_election: Option<i64>,
}

/// Fetch and parse the officials page. Unlike the court scraper there is
/// only one page, so a fetch failure is returned.
pub async fn scrape_officials<T: HttpTransport>(
    transport: &T,
    config: &ScraperConfig,
) -> Result<Vec<Official>, ScrapeError> {
    let url = page_url(&config.base_url, ELECTED_OFFICIALS_PATH)?;
    info!("Scraping elected officials from {}", url);
    let body = fetch_page(transport, url.as_str()).await?;
    let officials = parse_elected_officials(&body);
    info!("Found {} justice-related elected officials", officials.len());
    Ok(officials)
}

/// Fill in `next_election` and `days_until_election` relative to `today`.
/// Officials without a readable office date get neither.
pub fn annotate(officials: &mut [Official], today: NaiveDate) {
    for official in officials.iter_mut() {
        official.next_election = official
            .last_election_year
            .map(|last| parse::next_election(last, today.year()));
        official.days_until_election = official
            .next_election
            .and_then(|year| days_until_election(year, today));
        debug!(
            "{} ({}): next election {:?}",
            official.name, official.title, official.next_election
        );
    }
}

/// Write `elected-officials.json` and `elected-officials.yml` into `out_dir`.
pub fn write_data_files(officials: &[Official], out_dir: &Path) -> Result<(PathBuf, PathBuf), ScrapeError> {
    write_json_and_yaml(officials, out_dir, "elected-officials")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn official(title: &str, date: &str) -> Official {
        let year = parse_date(date);
        Official {
            title: title.into(),
            name: "A. Person".into(),
            phone: None,
            email: None,
            elected_date: date.into(),
            elected_year: year,
            next_election: None,
            last_election_year: year.map(parse::last_election_year),
            position_type: PositionType::Sheriff,
            term_length_years: TERM_LENGTH_YEARS,
            precinct: None,
            place: None,
            days_until_election: None,
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn annotate_counts_days_to_next_november() {
        let mut officials = vec![official("Sheriff", "1/01/25"), official("Sheriff", "")];
        annotate(&mut officials, day(2026, 1, 15));

        assert_eq!(officials[0].next_election, Some(2028));
        assert_eq!(officials[0].days_until_election, Some(1025));
        assert_eq!(officials[1].next_election, None);
        assert_eq!(officials[1].days_until_election, None);
    }

    #[test]
    fn election_day_itself_has_no_countdown() {
        let mut officials = vec![official("Sheriff", "1/01/23")];
        annotate(&mut officials, day(2026, 11, 5));
        assert_eq!(officials[0].next_election, Some(2026));
        assert_eq!(officials[0].days_until_election, None);
    }

    #[test]
    fn serialised_shape() {
        let mut o = official("Peace Justice, Pct. 1", "1/01/23");
        o.position_type = PositionType::JusticeOfThePeace;
        o.precinct = Some(1);
        let v = serde_json::to_value(&o).unwrap();
        assert_eq!(v["position_type"], "Justice of the Peace");
        assert_eq!(v["precinct"], 1);
        assert!(v.get("place").is_none());
        assert!(v.get("days_until_election").is_none());
        assert!(v["next_election"].is_null());
        assert_eq!(PositionType::JusticeOfThePeace.to_string(), "Justice of the Peace");
    }
}
