//! Link/contact pipeline: find external links in the site sources, check
//! them over HTTP, mine contact details from government pages and write the
//! findings report.
//!
//! ```text
//! _pages/ _posts/ _includes/ _layouts/
//!  │
//!  ├─ scan      walk the four source roots (.md / .html)
//!  ├─ extract   Markdown: inline, reference, raw <a>, parser fallback
//!  ├─ filter    keep links whose host differs from the site host
//!  ├─ dedup     one record per lower-cased URL, all source files kept
//!  ├─ check     HEAD with retries, GET on 405, GET fallback
//!  ├─ contact   phone/email heuristics on selected pages
//!  └─ report    _data/brokenlinks.json, written atomically
//! ```

pub mod checker;
pub mod contact;
pub mod extract;
pub mod filter;
pub mod report;
pub mod scan;

pub use checker::LinkChecker;
pub use contact::extract_contact_info;
pub use extract::extract_links;
pub use filter::ExternalityFilter;
pub use report::LinkReport;
pub use scan::{scan_site, LinkCollection};

use serde::Serialize;
use std::path::Path;

/// Which extraction strategy produced a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkOrigin {
    Markdown,
    MarkdownRef,
    HtmlInMarkdown,
    Html,
}

/// A hyperlink as found in one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedLink {
    pub url: String,
    pub text: String,
    pub origin: LinkOrigin,
}

/// Syntax of a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Markdown,
    Html,
}

impl SourceFormat {
    /// `.md` → Markdown, `.html` → HTML, anything else is not scanned.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "md" => Some(SourceFormat::Markdown),
            "html" => Some(SourceFormat::Html),
            _ => None,
        }
    }
}

/// Role of the directory a source file lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Page,
    Post,
    Include,
    Layout,
}

/// Source directories scanned under the site root, with their roles.
pub const SITE_LAYOUT: &[(&str, SourceType)] = &[
    ("_pages", SourceType::Page),
    ("_posts", SourceType::Post),
    ("_includes", SourceType::Include),
    ("_layouts", SourceType::Layout),
];

/// Terminal classification of a checked link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    Healthy,
    Broken,
    Unknown,
}

/// Phone/email found on a page. Either may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContactInfo {
    #[serde(rename = "contact_phone")]
    pub phone: Option<String>,
    #[serde(rename = "contact_email")]
    pub email: Option<String>,
}

/// Outcome of checking one URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    #[serde(rename = "error_404")]
    pub broken: bool,
    pub status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// `Some` exactly when contact extraction was requested for this URL.
    #[serde(flatten)]
    pub contact: Option<ContactInfo>,
}

impl CheckResult {
    pub fn status(&self) -> LinkStatus {
        if self.broken {
            LinkStatus::Broken
        } else if self.status_code.is_some() {
            LinkStatus::Healthy
        } else {
            LinkStatus::Unknown
        }
    }
}

/// One unique external link across the whole site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkRecord {
    pub link_name: String,
    pub link_url: String,
    /// First file the link was seen in, relative to the site root.
    pub source_file: String,
    pub source_type: SourceType,
    /// Every file the link was seen in, first-seen order, no repeats.
    pub source_files: Vec<String>,
    #[serde(flatten)]
    pub check: Option<CheckResult>,
}

impl LinkRecord {
    pub fn new(link: ExtractedLink, source_file: String, source_type: SourceType) -> Self {
        Self {
            link_name: link.text,
            link_url: link.url,
            source_files: vec![source_file.clone()],
            source_file,
            source_type,
            check: None,
        }
    }

    /// Deduplication key.
    pub fn key(&self) -> String {
        self.link_url.to_lowercase()
    }

    /// `None` until checked.
    pub fn status(&self) -> Option<LinkStatus> {
        self.check.as_ref().map(CheckResult::status)
    }

    pub fn is_broken(&self) -> bool {
        self.check.as_ref().is_some_and(|c| c.broken)
    }
}
