//! Link extraction from Markdown and HTML sources.
//!
//! Markdown sources are mined in four passes whose results are concatenated
//! in order:
//!
//! 1. Inline links `[text](url)`
//! 2. Reference links `[text][id]` / `[text][]` resolved against
//!    `[id]: url "title"` definitions
//! 3. Raw `<a href="…">text</a>` anchors embedded in the Markdown
//! 4. A real HTML parse that adds any anchor whose exact URL was not found
//!    by the passes above
//!
//! Duplicates across passes 1–3 are kept; the corpus-wide deduplication in
//! [`super::scan`] collapses them.

use super::{ExtractedLink, LinkOrigin, SourceFormat};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashMap;

static RE_INLINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").unwrap());

static RE_REF_DEF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*\[([^\]]+)\]:\s*(.+?)(?:\s+"([^"]+)")?\s*$"#).unwrap()
});

static RE_REF_USE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\]]+)\]\[([^\]]*)\]").unwrap());

static RE_ANCHOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<a\s+[^>]*href=["']([^"']+)["'][^>]*>([^<]*)</a>"#).unwrap()
});

static RE_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());

static SEL_ANCHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());

/// Extract every hyperlink from `content`.
pub fn extract_links(content: &str, format: SourceFormat) -> Vec<ExtractedLink> {
    match format {
        SourceFormat::Markdown => extract_markdown(content),
        SourceFormat::Html => parsed_anchors(content, LinkOrigin::Html),
    }
}

fn extract_markdown(content: &str) -> Vec<ExtractedLink> {
    let mut links = inline_links(content);
    links.extend(reference_links(content));
    links.extend(raw_anchors(content));

    for link in parsed_anchors(content, LinkOrigin::HtmlInMarkdown) {
        if !links.iter().any(|l| l.url == link.url) {
            links.push(link);
        }
    }
    links
}

// ── Pass 1: inline links ─────────────────────────────────────────────────

fn inline_links(content: &str) -> Vec<ExtractedLink> {
    RE_INLINE
        .captures_iter(content)
        .filter(|caps| !caps[2].starts_with('['))
        .map(|caps| ExtractedLink {
            url: caps[2].to_string(),
            text: caps[1].to_string(),
            origin: LinkOrigin::Markdown,
        })
        .collect()
}

// ── Pass 2: reference links ──────────────────────────────────────────────

fn reference_links(content: &str) -> Vec<ExtractedLink> {
    let mut refs: HashMap<String, String> = HashMap::new();
    for line in content.split('\n') {
        if let Some(caps) = RE_REF_DEF.captures(line) {
            refs.insert(caps[1].to_lowercase(), caps[2].trim().to_string());
        }
    }
    if refs.is_empty() {
        return Vec::new();
    }

    RE_REF_USE
        .captures_iter(content)
        .filter_map(|caps| {
            let text = &caps[1];
            let id = match &caps[2] {
                "" => text.to_lowercase(),
                id => id.to_lowercase(),
            };
            refs.get(&id).map(|url| ExtractedLink {
                url: url.clone(),
                text: text.to_string(),
                origin: LinkOrigin::MarkdownRef,
            })
        })
        .collect()
}

// ── Pass 3: raw anchors ──────────────────────────────────────────────────

fn raw_anchors(content: &str) -> Vec<ExtractedLink> {
    RE_ANCHOR
        .captures_iter(content)
        .map(|caps| {
            let url = caps[1].to_string();
            let text = RE_TAG.replace_all(caps[2].trim(), "").trim().to_string();
            ExtractedLink {
                text: if text.is_empty() { url.clone() } else { text },
                url,
                origin: LinkOrigin::HtmlInMarkdown,
            }
        })
        .collect()
}

// ── Pass 4 / HTML: parsed anchors ────────────────────────────────────────

fn parsed_anchors(content: &str, origin: LinkOrigin) -> Vec<ExtractedLink> {
    let doc = Html::parse_document(content);
    doc.select(&SEL_ANCHOR)
        .filter_map(|el| {
            let href = el.value().attr("href")?.trim().to_string();
            let text: String = el.text().map(str::trim).collect();
            Some(ExtractedLink {
                text: if text.is_empty() { href.clone() } else { text },
                url: href,
                origin,
            })
        })
        .collect()
}
