//! Notary directory scraper.
//!
//! One listing page names every notary near the county; each linked profile
//! page is fetched in turn and parsed with [`parse_notary_profile`]. The
//! result is written as `notaries.yml`.

pub mod parse;

pub use parse::{detail_urls, parse_notary_profile};

use crate::config::ScraperConfig;
use crate::error::ScrapeError;
use crate::http::{fetch_page, page_url, HttpTransport};
use crate::persist::write_yaml;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Listing of notaries within 30 miles of Killeen, relative to the directory site.
pub const NOTARY_LISTING_PATH: &str = "agent/searchdtlbody.asp?id=&PostalCD=76541&Address=&City=&l=&ll=&pfn=01045523001P&bfn=01045523001B&pmc=3&bmc=11&Miles=30&LocType=&StateCD=&PostalState=Texas&PostalCounty=Bell&EstimateCost=0&Lat=31.114961&Lon=-97.723782&Location=&Override=0&type=RSS";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressKind {
    Primary,
    Secondary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotaryAddress {
    #[serde(rename = "type")]
    pub kind: AddressKind,
    pub address: String,
}

/// A notary's public profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notary {
    pub name: String,
    pub location: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub addresses: Vec<NotaryAddress>,
    pub last_updated: Option<String>,
    /// Profile categories and notary-detail rows, keyed in snake case.
    #[serde(flatten)]
    pub details: BTreeMap<String, String>,
}

/// Fetch the listing, then every profile it links to, `request_delay` apart.
///
/// The listing itself must load and link at least one profile; a profile
/// that fails to load or parse is logged and left out.
pub async fn scrape_notaries<T: HttpTransport>(
    transport: &T,
    config: &ScraperConfig,
) -> Result<Vec<Notary>, ScrapeError> {
    let listing_url = page_url(&config.base_url, NOTARY_LISTING_PATH)?;
    info!("Fetching notary listing page...");
    let listing = fetch_page(transport, listing_url.as_str()).await?;

    let agent_base = page_url(&config.base_url, "agent/")?;
    let urls = detail_urls(&listing, &agent_base);
    if urls.is_empty() {
        return Err(ScrapeError::NoResults {
            url: listing_url.to_string(),
        });
    }
    info!("Found {} notaries. Scraping detail pages...", urls.len());

    let mut notaries = Vec::new();
    for (i, url) in urls.iter().enumerate() {
        info!("Scraping {}/{}: {}", i + 1, urls.len(), url);
        match fetch_page(transport, url).await {
            Ok(body) => match parse_notary_profile(&body) {
                Some(notary) => {
                    debug!(
                        "{}: phone {:?}, email {:?}, website {:?}",
                        notary.name, notary.phone, notary.email, notary.website
                    );
                    notaries.push(notary);
                }
                None => warn!("{}: no notary name on page, skipping", url),
            },
            Err(e) => warn!("{}", e),
        }
        if i + 1 < urls.len() {
            sleep(config.request_delay).await;
        }
    }
    info!("Successfully scraped {} notaries", notaries.len());
    Ok(notaries)
}

/// Write `notaries.yml` into `out_dir`.
pub fn write_data_file(notaries: &[Notary], out_dir: &Path) -> Result<PathBuf, ScrapeError> {
    let path = out_dir.join("notaries.yml");
    write_yaml(notaries, &path)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notary() -> Notary {
        let mut details = BTreeMap::new();
        details.insert("commission_expires".to_string(), "05/01/2027".to_string());
        Notary {
            name: "Jane Q. Public".into(),
            location: Some("Killeen, TX".into()),
            phone: Some("(254) 216-2885".into()),
            email: None,
            website: None,
            addresses: vec![NotaryAddress {
                kind: AddressKind::Primary,
                address: "123 Main St".into(),
            }],
            last_updated: None,
            details,
        }
    }

    #[test]
    fn details_flatten_into_the_record() {
        let v = serde_json::to_value(notary()).unwrap();
        assert_eq!(v["commission_expires"], "05/01/2027");
        assert_eq!(v["addresses"][0]["type"], "primary");
        assert!(v.get("details").is_none());
        assert!(v["email"].is_null());
    }

    #[test]
    fn yaml_file_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_data_file(&[notary()], &dir.path().join("_data")).unwrap();
        assert_eq!(path, dir.path().join("_data").join("notaries.yml"));
        let yml = std::fs::read_to_string(path).unwrap();
        assert!(yml.contains("name: Jane Q. Public"));
        assert!(yml.contains("commission_expires: 05/01/2027"));
        assert!(yml.contains("type: primary"));
    }

    #[test]
    fn listing_path_resolves_under_directory_site() {
        let url = page_url(&ScraperConfig::notaries().base_url, NOTARY_LISTING_PATH).unwrap();
        assert!(url.as_str().starts_with("https://www.notaryrotary.com/agent/searchdtlbody.asp?"));
        assert!(url.as_str().contains("PostalCounty=Bell"));
    }
}
