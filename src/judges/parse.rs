//! Heuristic extraction of judge profile fields from a court page.
//!
//! Court pages are hand-edited CMS content without stable markup, so every
//! field is found by text patterns over the page's `<article>`. Each helper
//! returns `None` on a miss; a page without an article yields no profile.

use super::{CourtPage, JudgeProfile, DEFAULT_COURT_ADDRESS};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

static SEL_ARTICLE: Lazy<Selector> = Lazy::new(|| Selector::parse("article").unwrap());
static SEL_BLOCK: Lazy<Selector> = Lazy::new(|| Selector::parse("p, div").unwrap());
static SEL_MAILTO: Lazy<Selector> = Lazy::new(|| Selector::parse(r#"a[href^="mailto:"]"#).unwrap());

static RE_JUDGE_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)Judge\s*[-–]").unwrap());

static RE_JUDGE_TITLED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:\d+(?:st|nd|rd|th)?\s+Judicial\s+District\s+Judge|County\s+Court\s+at\s+Law\s+\d+\s+Judge|Judge)\s*[-–]\s*([A-Z][a-z]+(?:\s+[A-Z][a-z]+)+)",
    )
    .unwrap()
});

static RE_JUDGE_SIMPLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Judge\s*[-–]\s*([A-Z][a-z]+(?:\s+[A-Z][a-z]+)+)").unwrap());

static RE_COORDINATOR_LABEL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)Court\s+Coordinator").unwrap());
static RE_COORDINATOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)Court\s+Coordinator[:\s]+([A-Z][a-z]+(?:\s+[A-Z][a-z]+)*)").unwrap()
});

static RE_REPORTER_LABEL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)Court\s+Reporter").unwrap());
static RE_REPORTER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)Court\s+Reporter[:\s]+([A-Z][a-z]+(?:\s+[A-Z][a-z]+)*)").unwrap()
});

static RE_EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Z|a-z]{2,}\b").unwrap()
});

static RE_PHONE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)Phone[:\s]*\(?(\d{3})\)?[-.\s]?(\d{3})[-.\s]?(\d{4})").unwrap()
});
static RE_FAX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)Fax[:\s]*\(?(\d{3})\)?[-.\s]?(\d{3})[-.\s]?(\d{4})").unwrap()
});

static RE_ADDRESSES: Lazy<[Regex; 2]> = Lazy::new(|| {
    [
        Regex::new(r"(?i)1201\s+Huey\s+(?:Road|Drive)[^.]*Belton,\s+Texas\s+\d{5}").unwrap(),
        Regex::new(r"(?i)Bell\s+County\s+Justice\s+Center[^.]*1201[^.]*Belton").unwrap(),
    ]
});

static RE_MAILING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)Mailing\s+Address[:\s]+(P\.O\.\s+Box\s+\d+[^.]*Belton[^.]*)").unwrap()
});

/// Parse one court page. `None` when the page has no `<article>`.
pub fn parse_judge_profile(html: &str, court: &CourtPage, url: &str) -> Option<JudgeProfile> {
    let doc = Html::parse_document(html);
    let article = doc.select(&SEL_ARTICLE).next()?;
    let text: String = article.text().collect();

    let mut profile = JudgeProfile::new(court.name, court.court_type, url.to_string());
    profile.judge_name = find_judge_name(article, &text);

    if let Some(block) = labelled_block(article, &RE_COORDINATOR_LABEL) {
        let block_text: String = block.text().collect();
        profile.court_coordinator = coordinator_name(&block_text);
        profile.coordinator_email = block
            .select(&SEL_MAILTO)
            .next()
            .and_then(|a| a.value().attr("href"))
            .map(|href| href.replace("mailto:", "").trim().to_string())
            .or_else(|| RE_EMAIL.find(&block_text).map(|m| m.as_str().to_string()));
    }

    if let Some(block) = labelled_block(article, &RE_REPORTER_LABEL) {
        let block_text: String = block.text().collect();
        profile.court_reporter = reporter_name(&block_text);
    }

    profile.phone = formatted_number(&RE_PHONE, &text);
    profile.fax = formatted_number(&RE_FAX, &text);
    profile.address = RE_ADDRESSES
        .iter()
        .find_map(|re| re.find(&text))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| DEFAULT_COURT_ADDRESS.to_string());
    profile.mailing_address = RE_MAILING
        .captures(&text)
        .map(|caps| caps[1].trim().to_string());

    Some(profile)
}

/// The judge block is the first `p`/`div` mentioning "Judge -"; the whole
/// article text is the last resort.
fn find_judge_name(article: ElementRef<'_>, article_text: &str) -> Option<String> {
    let block_text = article
        .select(&SEL_BLOCK)
        .map(|el| el.text().collect::<String>())
        .find(|t| RE_JUDGE_MARKER.is_match(t));

    block_text
        .and_then(|t| {
            RE_JUDGE_TITLED
                .captures(&t)
                .or_else(|| RE_JUDGE_SIMPLE.captures(&t))
                .map(|caps| caps[1].trim().to_string())
        })
        .or_else(|| {
            RE_JUDGE_TITLED
                .captures(article_text)
                .map(|caps| caps[1].trim().to_string())
        })
}

/// Innermost `p`/`div` around the first text node matching `label`.
fn labelled_block<'a>(article: ElementRef<'a>, label: &Regex) -> Option<ElementRef<'a>> {
    let node = article
        .descendants()
        .find(|n| n.value().as_text().is_some_and(|t| label.is_match(t)))?;
    node.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|el| matches!(el.value().name(), "p" | "div"))
}

/// The name pattern is case-insensitive and runs across whitespace, so the
/// capture is cut at the next label or line break.
fn coordinator_name(block_text: &str) -> Option<String> {
    let caps = RE_COORDINATOR.captures(block_text)?;
    let name = caps[1].split("Court Reporter").next().unwrap_or_default();
    first_line(name)
}

fn reporter_name(block_text: &str) -> Option<String> {
    let caps = RE_REPORTER.captures(block_text)?;
    first_line(&caps[1])
}

fn first_line(s: &str) -> Option<String> {
    let line = s.trim().lines().next().unwrap_or_default().trim();
    (!line.is_empty()).then(|| line.to_string())
}

/// `(AAA) BBB-CCCC` from the first match of a labelled number pattern.
fn formatted_number(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .map(|caps| format!("({}) {}-{}", &caps[1], &caps[2], &caps[3]))
}
