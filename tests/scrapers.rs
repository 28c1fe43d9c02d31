//! Integration tests for the officials and notary scrapers, served by a
//! scripted transport.

use async_trait::async_trait;
use chrono::NaiveDate;
use siteworks::config::ScraperConfig;
use siteworks::http::{page_url, HttpResponse, HttpTransport, TransportError};
use siteworks::notaries::{self, scrape_notaries, NOTARY_LISTING_PATH};
use siteworks::officials::{self, annotate, scrape_officials, Official, PositionType, ELECTED_OFFICIALS_PATH};
use siteworks::ScrapeError;
use std::collections::HashMap;
use std::time::Duration;

const COUNTY: &str = "https://county.example.test";
const DIRECTORY: &str = "https://notaries.example.test";

struct Pages(HashMap<String, (u16, String)>);

#[async_trait]
impl HttpTransport for Pages {
    async fn head(&self, _url: &str) -> Result<HttpResponse, TransportError> {
        Err(TransportError("HEAD not used".into()))
    }
    async fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
        self.0
            .get(url)
            .map(|(status, body)| HttpResponse::new(*status, Some(body.clone())))
            .ok_or_else(|| TransportError(format!("no route to {url}")))
    }
}

fn config(base: &str) -> ScraperConfig {
    ScraperConfig {
        base_url: base.to_string(),
        request_delay: Duration::ZERO,
        ..ScraperConfig::default()
    }
}

const OFFICIALS_PAGE: &str = r#"<html><body><table>
<tr><th>Title</th><th>Name</th><th>Took Office</th><th>Phone</th></tr>
<tr><td>County Attorney</td><td><a href="mailto:ca@county.example.test">Jim Nichols</a></td><td>1/01/21</td><td>254-933-5135</td></tr>
<tr><td>Tax Assessor</td><td>Someone Else</td><td>1/01/21</td><td>254-933-5000</td></tr>
<tr><td>Peace Justice, Pct. 1, Pl. 1</td><td>Ted Duffield</td><td>1/01/23</td><td>254-933-5345</td></tr>
</table></body></html>"#;

#[tokio::test]
async fn officials_are_scraped_annotated_and_written() {
    let mut routes = HashMap::new();
    routes.insert(format!("{COUNTY}/{ELECTED_OFFICIALS_PATH}"), (200, OFFICIALS_PAGE.to_string()));

    let mut found = scrape_officials(&Pages(routes), &config(COUNTY)).await.unwrap();
    let names: Vec<&str> = found.iter().map(|o| o.name.as_str()).collect();
    assert_eq!(names, vec!["Jim Nichols", "Ted Duffield"]);
    assert_eq!(found[0].email.as_deref(), Some("ca@county.example.test"));
    assert_eq!(found[1].position_type, PositionType::JusticeOfThePeace);
    assert_eq!((found[1].precinct, found[1].place), (Some(1), Some(1)));

    annotate(&mut found, NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());
    assert_eq!(found[0].next_election, Some(2028));
    assert_eq!(found[1].next_election, Some(2026));
    assert_eq!(found[1].days_until_election, Some(249));

    let dir = tempfile::tempdir().unwrap();
    let (json, yaml) = officials::write_data_files(&found, &dir.path().join("_data")).unwrap();
    assert!(json.ends_with("_data/elected-officials.json"));
    let back: Vec<Official> = serde_json::from_str(&std::fs::read_to_string(json).unwrap()).unwrap();
    assert_eq!(back, found);
    let yml = std::fs::read_to_string(yaml).unwrap();
    assert!(yml.contains("position_type: Justice of the Peace"));
}

#[tokio::test]
async fn officials_page_failure_is_an_error() {
    let mut routes = HashMap::new();
    routes.insert(format!("{COUNTY}/{ELECTED_OFFICIALS_PATH}"), (503, String::new()));

    let err = scrape_officials(&Pages(routes), &config(COUNTY)).await.unwrap_err();
    assert!(matches!(err, ScrapeError::Fetch { .. }), "got: {err}");
    assert!(err.to_string().contains("503"));
}

fn profile(name: &str, phone: &str) -> String {
    format!(
        "<html><head><title>{name}, Notary Public in Killeen, TX</title></head><body>\
         <table><tr><th>Communications</th></tr>\
         <tr><td>Phone:</td><td>{phone}</td></tr></table>\
         <table><tr><th>Addresses</th></tr>\
         <tr><td>Primary</td><td>1 Elm St</td></tr></table>\
         </body></html>"
    )
}

#[tokio::test]
async fn notaries_follow_listing_and_skip_bad_profiles() {
    let listing_url = page_url(DIRECTORY, NOTARY_LISTING_PATH).unwrap().to_string();
    let listing = r#"<html><body>
<a href="details.asp?ID=1">One</a>
<a href="details.asp?ID=2">Two</a>
<a href="details.asp?ID=3">Three</a>
<a href="details.asp?ID=1">One again</a>
</body></html>"#;

    let mut routes = HashMap::new();
    routes.insert(listing_url, (200, listing.to_string()));
    routes.insert(
        format!("{DIRECTORY}/agent/details.asp?ID=1"),
        (200, profile("Ann Avery", "254-555-0100")),
    );
    // Profile without a name is skipped, ID=3 has no route at all.
    routes.insert(
        format!("{DIRECTORY}/agent/details.asp?ID=2"),
        (200, "<html><body><p>Removed</p></body></html>".to_string()),
    );

    let found = scrape_notaries(&Pages(routes), &config(DIRECTORY)).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "Ann Avery");
    assert_eq!(found[0].location.as_deref(), Some("Killeen, TX"));
    assert_eq!(found[0].phone.as_deref(), Some("254-555-0100"));
    assert_eq!(found[0].addresses.len(), 1);

    let dir = tempfile::tempdir().unwrap();
    let path = notaries::write_data_file(&found, dir.path()).unwrap();
    let yml = std::fs::read_to_string(path).unwrap();
    assert!(yml.contains("name: Ann Avery"));
    assert!(yml.contains("address: 1 Elm St"));
}

#[tokio::test]
async fn empty_notary_listing_is_an_error() {
    let listing_url = page_url(DIRECTORY, NOTARY_LISTING_PATH).unwrap().to_string();
    let mut routes = HashMap::new();
    routes.insert(listing_url, (200, "<html><body>No matches</body></html>".to_string()));

    let err = scrape_notaries(&Pages(routes), &config(DIRECTORY)).await.unwrap_err();
    assert!(matches!(err, ScrapeError::NoResults { .. }), "got: {err}");
}
