//! The findings report written to `_data/brokenlinks.json`.

use super::LinkRecord;
use crate::error::LinkCheckError;
use crate::persist::write_atomic;
use chrono::NaiveDateTime;
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// Timestamp format of `last_checked`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Whole-run report. Serialised as one JSON document.
#[derive(Debug, Clone, Serialize)]
pub struct LinkReport {
    pub last_checked: String,
    pub total_links: usize,
    pub broken_links_count: usize,
    pub links: Vec<LinkRecord>,
}

impl LinkReport {
    /// Build the report for checked `links` at local time `now`.
    pub fn new(links: Vec<LinkRecord>, now: NaiveDateTime) -> Self {
        Self {
            last_checked: now.format(TIMESTAMP_FORMAT).to_string(),
            total_links: links.len(),
            broken_links_count: links.iter().filter(|l| l.is_broken()).count(),
            links,
        }
    }

    /// Report stamped with the current local time.
    pub fn now(links: Vec<LinkRecord>) -> Self {
        Self::new(links, chrono::Local::now().naive_local())
    }

    pub fn broken(&self) -> impl Iterator<Item = &LinkRecord> {
        self.links.iter().filter(|l| l.is_broken())
    }

    pub fn has_broken(&self) -> bool {
        self.broken_links_count > 0
    }

    pub fn to_json(&self) -> Result<String, LinkCheckError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Serialise fully, then replace `path` in one rename.
    pub fn write(&self, path: &Path) -> Result<(), LinkCheckError> {
        let json = self.to_json()?;
        write_atomic(path, json.as_bytes()).map_err(|e| LinkCheckError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        info!("Report written to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::links::{CheckResult, ExtractedLink, LinkOrigin, SourceType};
    use chrono::NaiveDate;

    fn checked(url: &str, broken: bool, status: Option<u16>) -> LinkRecord {
        let mut r = LinkRecord::new(
            ExtractedLink {
                url: url.into(),
                text: "t".into(),
                origin: LinkOrigin::Html,
            },
            "_layouts/default.html".into(),
            SourceType::Layout,
        );
        r.check = Some(CheckResult {
            broken,
            status_code: status,
            ..CheckResult::default()
        });
        r
    }

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 4)
            .unwrap()
            .and_hms_opt(5, 6, 7)
            .unwrap()
    }

    #[test]
    fn counts_and_timestamp() {
        let report = LinkReport::new(
            vec![
                checked("https://a.com", false, Some(200)),
                checked("https://b.com", true, Some(404)),
                checked("https://c.com", false, None),
            ],
            at(),
        );
        assert_eq!(report.last_checked, "2026-03-04 05:06:07");
        assert_eq!(report.total_links, 3);
        assert_eq!(report.broken_links_count, 1);
        assert!(report.has_broken());
        assert_eq!(report.broken().count(), 1);
    }

    #[test]
    fn written_report_parses_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("_data").join("brokenlinks.json");
        let report = LinkReport::new(vec![checked("https://b.com", true, Some(404))], at());
        report.write(&path).unwrap();

        let v: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(v["total_links"], 1);
        assert_eq!(v["broken_links_count"], 1);
        assert_eq!(v["links"][0]["link_url"], "https://b.com");
        assert_eq!(v["links"][0]["error_404"], true);
        assert_eq!(v["links"][0]["source_files"][0], "_layouts/default.html");
    }

    #[test]
    fn empty_report_is_clean() {
        let report = LinkReport::new(Vec::new(), at());
        assert!(!report.has_broken());
        assert!(report.to_json().unwrap().contains("\"links\": []"));
    }
}
