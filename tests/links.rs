//! Integration tests for the link/contact pipeline.
//!
//! A scripted transport stands in for the network: responses are keyed by
//! URL so the order of checks does not matter.

use async_trait::async_trait;
use siteworks::config::{CheckerConfig, DEFAULT_SITE_URL};
use siteworks::http::{HttpResponse, HttpTransport, TransportError};
use siteworks::links::{scan_site, ExternalityFilter, LinkChecker, LinkReport, LinkStatus};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

// ── Test helpers ─────────────────────────────────────────────────────────────

#[derive(Clone)]
enum Reply {
    Status(u16),
    Page(u16, &'static str),
    Down,
}

/// HEAD answers from `heads`, GET answers from `gets`; anything else is down.
#[derive(Default)]
struct SiteMap {
    heads: HashMap<&'static str, Reply>,
    gets: HashMap<&'static str, Reply>,
}

fn answer(reply: Option<&Reply>, with_body: bool) -> Result<HttpResponse, TransportError> {
    match reply {
        Some(Reply::Status(s)) => Ok(HttpResponse::new(*s, with_body.then(String::new))),
        Some(Reply::Page(s, body)) => Ok(HttpResponse::new(*s, with_body.then(|| body.to_string()))),
        Some(Reply::Down) | None => Err(TransportError("connection refused".into())),
    }
}

#[async_trait]
impl HttpTransport for SiteMap {
    async fn head(&self, url: &str) -> Result<HttpResponse, TransportError> {
        answer(self.heads.get(url), false)
    }
    async fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
        answer(self.gets.get(url), true)
    }
}

fn fast_config() -> CheckerConfig {
    CheckerConfig {
        retry_delay: Duration::ZERO,
        request_delay: Duration::ZERO,
        ..CheckerConfig::default()
    }
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn site_fixture(root: &Path) {
    write(
        root,
        "_pages/resources.md",
        "Visit [the clerk](https://www.bellcountytx.com/clerk) or [Old](https://old.example.com/gone).\n\
         See [our about page](/about/) and [home](https://www.legalluminary.com/).\n\
         [docs]: https://docs.example.org\n\
         Read [the docs][docs].\n",
    );
    write(
        root,
        "_posts/2024-01-01-update.md",
        r#"<a href="https://OLD.example.com/gone">again</a> and <a href="https://flaky.example.net">flaky</a>"#,
    );
    write(
        root,
        "_includes/footer.html",
        r#"<footer><a href="https://docs.example.org">Docs</a><a href="mailto:x@y.z">mail</a></footer>"#,
    );
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn scan_check_and_report() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    site_fixture(root);

    let filter = ExternalityFilter::new(DEFAULT_SITE_URL).unwrap();
    let mut links = scan_site(root, &filter).unwrap();

    let urls: Vec<_> = links.records().iter().map(|r| r.link_url.clone()).collect();
    assert_eq!(
        urls,
        vec![
            "https://www.bellcountytx.com/clerk",
            "https://old.example.com/gone",
            "https://docs.example.org",
            "https://flaky.example.net",
        ]
    );

    let mut site = SiteMap::default();
    site.heads.insert("https://www.bellcountytx.com/clerk", Reply::Status(405));
    site.gets.insert(
        "https://www.bellcountytx.com/clerk",
        Reply::Page(200, "<p>County Clerk</p><p>Phone: (254) 933-5160</p><p>Email: clerk@bellcounty.texas.gov</p>"),
    );
    site.heads.insert("https://old.example.com/gone", Reply::Status(404));
    site.heads.insert("https://docs.example.org", Reply::Status(200));
    site.heads.insert("https://flaky.example.net", Reply::Down);
    site.gets.insert("https://flaky.example.net", Reply::Down);

    let checker = LinkChecker::new(site, fast_config()).unwrap();
    checker
        .check_all(links.records_mut(), &siteworks::progress::noop())
        .await;

    let report = LinkReport::now(links.into_records());
    assert_eq!(report.total_links, 4);
    assert_eq!(report.broken_links_count, 1);

    let by_url = |u: &str| report.links.iter().find(|l| l.link_url == u).unwrap();

    let clerk = by_url("https://www.bellcountytx.com/clerk");
    assert_eq!(clerk.status(), Some(LinkStatus::Healthy));
    let contact = clerk.check.as_ref().unwrap().contact.as_ref().unwrap();
    assert_eq!(contact.phone.as_deref(), Some("(254) 933-5160"));
    assert_eq!(contact.email.as_deref(), Some("clerk@bellcounty.texas.gov"));

    let gone = by_url("https://old.example.com/gone");
    assert!(gone.is_broken());
    assert_eq!(
        gone.source_files,
        vec!["_pages/resources.md", "_posts/2024-01-01-update.md"]
    );

    let flaky = by_url("https://flaky.example.net");
    assert_eq!(flaky.status(), Some(LinkStatus::Unknown));
    assert_eq!(
        flaky.check.as_ref().unwrap().error_message.as_deref(),
        Some("connection refused")
    );

    let docs = by_url("https://docs.example.org");
    assert_eq!(docs.source_files, vec!["_pages/resources.md", "_includes/footer.html"]);

    // Report file round-trips as JSON with the published field names.
    let out = root.join("_data").join("brokenlinks.json");
    report.write(&out).unwrap();
    let v: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(v["broken_links_count"], 1);
    let clerk_json = v["links"]
        .as_array()
        .unwrap()
        .iter()
        .find(|l| l["link_url"] == "https://www.bellcountytx.com/clerk")
        .unwrap();
    assert_eq!(clerk_json["contact_phone"], "(254) 933-5160");
    assert_eq!(clerk_json["error_404"], false);
    assert_eq!(clerk_json["status_code"], 200);
    let docs_json = v["links"]
        .as_array()
        .unwrap()
        .iter()
        .find(|l| l["link_url"] == "https://docs.example.org")
        .unwrap();
    assert!(docs_json.get("contact_phone").is_none());
}

#[tokio::test]
async fn site_without_sources_reports_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let filter = ExternalityFilter::new(DEFAULT_SITE_URL).unwrap();
    let links = scan_site(dir.path(), &filter).unwrap();
    assert!(links.is_empty());

    let report = LinkReport::now(links.into_records());
    assert_eq!(report.total_links, 0);
    assert!(!report.has_broken());
}

#[test]
fn checker_rejects_invalid_config() {
    let config = CheckerConfig {
        user_agent: String::new(),
        ..CheckerConfig::default()
    };
    assert!(LinkChecker::new(SiteMap::default(), config).is_err());
}
