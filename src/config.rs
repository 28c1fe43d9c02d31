//! Configuration types for the three pipelines.
//!
//! Every knob lives in a plain struct with a documented [`Default`], so the
//! binaries only map CLI flags onto fields and the library never reads the
//! environment itself. [`AttributionSpec`] is built through a validating
//! builder because a bad font size or empty text would otherwise only
//! surface deep inside a rendering step.

use crate::error::{AttributionError, LinkCheckError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Attribution text used when none is supplied.
pub const DEFAULT_ATTRIBUTION_TEXT: &str = "Dr. Tara Salman";

/// Rendering DPI used when exploding and re-assembling PDFs.
pub const DEFAULT_PDF_DPI: u32 = 300;

// ── Attribution ──────────────────────────────────────────────────────────

/// What to stamp and where. Immutable for the whole invocation.
///
/// # Example
/// ```rust
/// use siteworks::AttributionSpec;
///
/// let spec = AttributionSpec::builder()
///     .text("Example Author")
///     .font_size(24)
///     .build()
///     .unwrap();
/// assert_eq!(spec.padding, 10);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributionSpec {
    /// Text drawn in the bottom-left corner. Default: `"Dr. Tara Salman"`.
    pub text: String,

    /// Font size in pixels. Default: 20.
    pub font_size: u32,

    /// Distance in pixels between the text box and the left/bottom edges. Default: 10.
    pub padding: u32,

    /// Offset of the white copy relative to the black copy. Default: `(2, 3)`.
    ///
    /// The black copy underneath acts as a drop shadow so the text stays
    /// legible on both light and dark backgrounds.
    pub shadow_offset: (i32, i32),
}

impl Default for AttributionSpec {
    fn default() -> Self {
        Self {
            text: DEFAULT_ATTRIBUTION_TEXT.to_string(),
            font_size: 20,
            padding: 10,
            shadow_offset: (2, 3),
        }
    }
}

impl AttributionSpec {
    /// Create a new builder for `AttributionSpec`.
    pub fn builder() -> AttributionSpecBuilder {
        AttributionSpecBuilder {
            spec: Self::default(),
        }
    }
}

/// Builder for [`AttributionSpec`].
#[derive(Debug)]
pub struct AttributionSpecBuilder {
    spec: AttributionSpec,
}

impl AttributionSpecBuilder {
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.spec.text = text.into();
        self
    }

    pub fn font_size(mut self, size: u32) -> Self {
        self.spec.font_size = size;
        self
    }

    pub fn padding(mut self, padding: u32) -> Self {
        self.spec.padding = padding;
        self
    }

    pub fn shadow_offset(mut self, dx: i32, dy: i32) -> Self {
        self.spec.shadow_offset = (dx, dy);
        self
    }

    /// Build the spec, validating constraints.
    pub fn build(self) -> Result<AttributionSpec, AttributionError> {
        let s = &self.spec;
        if s.text.trim().is_empty() {
            return Err(AttributionError::InvalidConfig(
                "attribution text must not be empty".into(),
            ));
        }
        if s.font_size == 0 || s.font_size > 1000 {
            return Err(AttributionError::InvalidConfig(format!(
                "font size must be 1–1000, got {}",
                s.font_size
            )));
        }
        Ok(self.spec)
    }
}

/// Settings of the ImageMagick backend.
#[derive(Debug, Clone)]
pub struct MagickConfig {
    /// Converter executable. Default: `convert` (ImageMagick 6 / compat shim).
    pub convert_bin: String,

    /// Inspector executable used for dimension logging. Default: `identify`.
    pub identify_bin: String,

    /// Parent directory for scratch directories. `None` → system temp dir.
    pub scratch_root: Option<PathBuf>,

    /// Time limit for a single rotate/stamp/save call. Default: 60 s.
    pub image_timeout: Duration,

    /// Time limit for exploding or assembling a whole PDF. Default: 300 s.
    pub document_timeout: Duration,
}

impl Default for MagickConfig {
    fn default() -> Self {
        Self {
            convert_bin: "convert".to_string(),
            identify_bin: "identify".to_string(),
            scratch_root: None,
            image_timeout: Duration::from_secs(60),
            document_timeout: Duration::from_secs(300),
        }
    }
}

// ── Link checking ────────────────────────────────────────────────────────

/// The public URL of the site whose sources are scanned.
pub const DEFAULT_SITE_URL: &str = "https://www.legalluminary.com";

/// User-Agent sent with every link-check request.
pub const LINK_CHECKER_USER_AGENT: &str =
    "Mozilla/5.0 (compatible; LegalLuminaryLinkChecker/1.0)";

/// URL fragments that mark a page worth mining for contact details.
pub const DEFAULT_CONTACT_DOMAINS: &[&str] = &[
    "county",
    "gov",
    "bellcounty",
    "templetx",
    "beltontexas",
    "killeentexas",
];

/// Behaviour of the HTTP link checker.
#[derive(Debug, Clone)]
pub struct CheckerConfig {
    /// Per-request timeout. Default: 10 s.
    pub timeout: Duration,

    /// Additional HEAD attempts after a transport failure. Default: 2.
    pub max_retries: u32,

    /// Pause between HEAD attempts. Default: 500 ms.
    pub retry_delay: Duration,

    /// Pause between two checked links. Default: 500 ms.
    pub request_delay: Duration,

    /// User-Agent header. Default: [`LINK_CHECKER_USER_AGENT`].
    pub user_agent: String,

    /// Contact extraction is requested for URLs containing any of these.
    pub contact_domains: Vec<String>,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_retries: 2,
            retry_delay: Duration::from_millis(500),
            request_delay: Duration::from_millis(500),
            user_agent: LINK_CHECKER_USER_AGENT.to_string(),
            contact_domains: DEFAULT_CONTACT_DOMAINS
                .iter()
                .map(|d| d.to_string())
                .collect(),
        }
    }
}

impl CheckerConfig {
    /// Reject settings that would make every request fail.
    pub fn validate(&self) -> Result<(), LinkCheckError> {
        if self.timeout.is_zero() {
            return Err(LinkCheckError::InvalidConfig(
                "request timeout must be greater than zero".into(),
            ));
        }
        if self.user_agent.trim().is_empty() {
            return Err(LinkCheckError::InvalidConfig(
                "user agent must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Whether contact details should be mined from `url`.
    pub fn wants_contacts(&self, url: &str) -> bool {
        let lower = url.to_lowercase();
        self.contact_domains.iter().any(|d| lower.contains(d.as_str()))
    }
}

/// Where the site lives and where the report goes.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    /// Site checkout root containing `_pages`, `_posts`, `_includes`, `_layouts`.
    pub root: PathBuf,

    /// Public URL of the site; links to this host are site-local.
    pub site_url: String,

    /// Report destination. Default: `<root>/_data/brokenlinks.json`.
    pub report_path: PathBuf,
}

impl SiteConfig {
    /// Configuration rooted at `root` with the default site URL and report path.
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        Self {
            report_path: root.join("_data").join("brokenlinks.json"),
            root,
            site_url: DEFAULT_SITE_URL.to_string(),
        }
    }
}

// ── Scraping ─────────────────────────────────────────────────────────────

/// Court website all profile paths are relative to.
pub const DEFAULT_COURTS_BASE_URL: &str = "https://www.bellcountytx.com";

/// User-Agent sent when scraping court pages.
pub const JUDGE_SCRAPER_USER_AGENT: &str =
    "Mozilla/5.0 (compatible; LegalLuminaryJudgeScraper/1.0)";

/// User-Agent sent when scraping the elected-officials page.
pub const OFFICIAL_SCRAPER_USER_AGENT: &str =
    "Mozilla/5.0 (compatible; LegalLuminaryOfficialScraper/1.0)";

/// Notary directory the listing and detail pages come from.
pub const DEFAULT_NOTARY_BASE_URL: &str = "https://www.notaryrotary.com";

/// User-Agent sent when scraping the notary directory.
pub const NOTARY_SCRAPER_USER_AGENT: &str =
    "Mozilla/5.0 (compatible; LegalLuminaryNotaryScraper/1.0)";

/// Behaviour of the scrapers. [`Default`] targets the court pages;
/// [`ScraperConfig::officials`] and [`ScraperConfig::notaries`] the other sources.
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    /// Site every scraped path is resolved against.
    pub base_url: String,
    pub user_agent: String,
    pub timeout: Duration,
    /// Pause between two fetched pages. Default: 1 s.
    pub request_delay: Duration,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_COURTS_BASE_URL.to_string(),
            user_agent: JUDGE_SCRAPER_USER_AGENT.to_string(),
            timeout: Duration::from_secs(10),
            request_delay: Duration::from_secs(1),
        }
    }
}

impl ScraperConfig {
    /// Elected-officials page on the county site.
    pub fn officials() -> Self {
        Self {
            user_agent: OFFICIAL_SCRAPER_USER_AGENT.to_string(),
            ..Self::default()
        }
    }

    /// Notary directory listing and profile pages.
    pub fn notaries() -> Self {
        Self {
            base_url: DEFAULT_NOTARY_BASE_URL.to_string(),
            user_agent: NOTARY_SCRAPER_USER_AGENT.to_string(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribution_defaults() {
        let spec = AttributionSpec::default();
        assert_eq!(spec.text, "Dr. Tara Salman");
        assert_eq!(spec.font_size, 20);
        assert_eq!(spec.padding, 10);
        assert_eq!(spec.shadow_offset, (2, 3));
    }

    #[test]
    fn builder_rejects_empty_text() {
        assert!(AttributionSpec::builder().text("   ").build().is_err());
    }

    #[test]
    fn builder_rejects_zero_font_size() {
        assert!(AttributionSpec::builder().font_size(0).build().is_err());
    }

    #[test]
    fn checker_rejects_zero_timeout() {
        let cfg = CheckerConfig {
            timeout: Duration::ZERO,
            ..CheckerConfig::default()
        };
        assert!(cfg.validate().is_err());
        assert!(CheckerConfig::default().validate().is_ok());
    }

    #[test]
    fn contact_domains_match_case_insensitively() {
        let cfg = CheckerConfig::default();
        assert!(cfg.wants_contacts("https://www.BellCountyTX.com/departments"));
        assert!(cfg.wants_contacts("https://www.texas.gov/"));
        assert!(!cfg.wants_contacts("https://example.com/"));
    }

    #[test]
    fn site_defaults_from_root() {
        let site = SiteConfig::new("/srv/site");
        assert_eq!(site.site_url, DEFAULT_SITE_URL);
        assert_eq!(
            site.report_path,
            PathBuf::from("/srv/site/_data/brokenlinks.json")
        );
    }
}
