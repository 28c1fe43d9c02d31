//! Field extraction for the notary directory.
//!
//! Profile pages are table soup: each section (communications, addresses,
//! notary details) is a `<table>` whose header cell names the section, with
//! `label | value` rows below it. Every helper tolerates missing sections.

use super::{AddressKind, Notary, NotaryAddress};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeMap;
use url::Url;

static SEL_TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("title").unwrap());
static SEL_TH: Lazy<Selector> = Lazy::new(|| Selector::parse("th").unwrap());
static SEL_TD: Lazy<Selector> = Lazy::new(|| Selector::parse("td").unwrap());
static SEL_ROW: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").unwrap());
static SEL_CELL: Lazy<Selector> = Lazy::new(|| Selector::parse("td, th").unwrap());
static SEL_LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());
static SEL_MAILTO: Lazy<Selector> = Lazy::new(|| Selector::parse(r#"a[href^="mailto:"]"#).unwrap());

static RE_TITLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.+?),\s*Notary Public in\s*(.+)").unwrap());
static RE_HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.+?)\s*-\s*(.+)").unwrap());
static RE_PHONE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}").unwrap());
static RE_EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Z|a-z]{2,}\b").unwrap()
});
static RE_DOMAIN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9-]*[a-zA-Z0-9]*\.[a-zA-Z]{2,}").unwrap());
static RE_WEBSITE_LABEL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^Website:\s*").unwrap());
static RE_WEBSITES: Lazy<[Regex; 3]> = Lazy::new(|| {
    [
        Regex::new(r"(?i)Website:\s*([a-zA-Z0-9][a-zA-Z0-9-]*[a-zA-Z0-9]*\.[a-zA-Z]{2,}[^\s]*)").unwrap(),
        Regex::new(r"(?i)Website:\s*([^\s]+\.(?:com|org|net|edu|gov)[^\s]*)").unwrap(),
        Regex::new(r"(?i)(www\.[a-zA-Z0-9][a-zA-Z0-9-]*[a-zA-Z0-9]*\.[a-zA-Z]{2,}[^\s]*)").unwrap(),
    ]
});
static RE_UPDATED: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{1,2}/\d{1,2}/\d{4})").unwrap());

/// Host of the directory itself; links back to it are never a notary's website.
const DIRECTORY_HOST: &str = "notaryrotary.com";

/// Profile categories in the `Category,Details` table and their keys.
const PROFILE_CATEGORIES: &[(&str, &str)] = &[
    ("Experience", "experience"),
    ("Loan Signing Types", "loan_signing_types"),
    ("General Notary Work", "general_notary_work"),
    ("Compliance & Skills", "compliance_skills"),
    ("Equipment", "equipment"),
    ("Additional Services", "additional_services"),
    ("Availability", "availability"),
    ("Professional Standards", "professional_standards"),
    ("Credentials", "credentials"),
    ("Service Area", "service_area"),
];

/// Keys of the fixed [`Notary`] fields; section rows never override them.
const RESERVED_KEYS: &[&str] = &["name", "location", "phone", "email", "website", "addresses", "last_updated"];

pub fn extract_phone(text: &str) -> Option<String> {
    RE_PHONE.find(text).map(|m| m.as_str().to_string())
}

pub fn extract_email(text: &str) -> Option<String> {
    RE_EMAIL.find(text).map(|m| m.as_str().to_string())
}

/// Absolute, de-duplicated profile URLs (`details.asp?ID=…`) linked from a
/// listing page, in page order.
pub fn detail_urls(html: &str, agent_base: &Url) -> Vec<String> {
    let doc = Html::parse_document(html);
    let mut urls: Vec<String> = Vec::new();
    for href in doc.select(&SEL_LINK).filter_map(|a| a.value().attr("href")) {
        if !href.contains("details.asp") {
            continue;
        }
        if let Ok(url) = agent_base.join(href) {
            let url = url.to_string();
            if !urls.contains(&url) {
                urls.push(url);
            }
        }
    }
    urls
}

/// Parse a profile page. `None` when no name can be found.
pub fn parse_notary_profile(html: &str) -> Option<Notary> {
    let doc = Html::parse_document(html);
    let (name, location) = name_and_location(&doc)?;
    let contact = communications(&doc);

    let mut details = profile_details(&doc);
    details.extend(notary_details(&doc));
    details.retain(|k, _| !RESERVED_KEYS.contains(&k.as_str()));

    Some(Notary {
        name,
        location,
        phone: contact.phone,
        email: contact.email,
        website: contact.website,
        addresses: addresses(&doc),
        last_updated: last_updated(&doc),
        details,
    })
}

// ── Helpers ──────────────────────────────────────────────────────────────

/// Raw text of an element, as laid out in the markup.
fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect()
}

/// Text with every text node trimmed and concatenated.
fn stripped(el: ElementRef<'_>) -> String {
    el.text().map(str::trim).collect()
}

/// `el` or its nearest ancestor with one of `names`.
fn closest<'a>(el: ElementRef<'a>, names: &[&str]) -> Option<ElementRef<'a>> {
    std::iter::once(el)
        .chain(el.ancestors().filter_map(ElementRef::wrap))
        .find(|e| names.contains(&e.value().name()))
}

/// Element holding the first text node that contains `needle`, and that text.
fn text_node<'a>(doc: &'a Html, needle: &str) -> Option<(ElementRef<'a>, String)> {
    let node = doc
        .root_element()
        .descendants()
        .find(|n| n.value().as_text().is_some_and(|t| t.contains(needle)))?;
    let text = node.value().as_text()?.to_string();
    let parent = node.parent().and_then(ElementRef::wrap)?;
    Some((parent, text))
}

/// Table whose header cell mentions `label`.
fn section_table<'a>(doc: &'a Html, label: &str) -> Option<ElementRef<'a>> {
    let header = doc.select(&SEL_TH).find(|th| text_of(*th).contains(label))?;
    closest(header, &["table"])
}

/// `(label, value cell)` for every row with at least two cells.
fn labelled_rows<'a>(table: ElementRef<'a>) -> impl Iterator<Item = (String, ElementRef<'a>)> + 'a {
    table.select(&SEL_ROW).filter_map(|row| {
        let cells: Vec<ElementRef<'a>> = row.select(&SEL_CELL).collect();
        (cells.len() >= 2).then(|| (stripped(cells[0]), cells[1]))
    })
}

fn with_scheme(site: &str) -> String {
    if site.starts_with("http") {
        site.to_string()
    } else {
        format!("http://{site}")
    }
}

fn mailto(el: ElementRef<'_>) -> Option<String> {
    el.select(&SEL_MAILTO)
        .filter_map(|a| a.value().attr("href"))
        .map(|href| href.replace("mailto:", "").trim().to_string())
        .next()
}

// ── Sections ─────────────────────────────────────────────────────────────

/// `<title>` reads "Name, Notary Public in City, ST"; otherwise a bare
/// "Name - City" cell is used.
fn name_and_location(doc: &Html) -> Option<(String, Option<String>)> {
    let from_title = doc.select(&SEL_TITLE).next().and_then(|t| {
        let text = text_of(t);
        RE_TITLE
            .captures(text.trim())
            .map(|caps| (caps[1].trim().to_string(), Some(caps[2].trim().to_string())))
    });
    if from_title.is_some() {
        return from_title;
    }

    let header = doc.select(&SEL_TD).find_map(|td| {
        let mut children = td.children();
        let only = children.next()?;
        if children.next().is_some() {
            return None;
        }
        only.value().as_text().filter(|t| t.contains('-')).map(|t| t.to_string())
    })?;
    let caps = RE_HEADER.captures(header.trim())?;
    Some((caps[1].trim().to_string(), Some(caps[2].trim().to_string())))
}

#[derive(Debug, Default)]
struct Contact {
    phone: Option<String>,
    email: Option<String>,
    website: Option<String>,
}

fn communications(doc: &Html) -> Contact {
    let mut c = Contact::default();
    let table = section_table(doc, "Communications").or_else(|| {
        let (parent, _) = text_node(doc, "Communications")?;
        let cell = closest(parent, &["th", "td"])?;
        closest(cell, &["table"])
    });
    let Some(table) = table else {
        return c;
    };

    c.email = table
        .select(&SEL_MAILTO)
        .filter_map(|a| a.value().attr("href"))
        .map(|href| href.replace("mailto:", "").trim().to_string())
        .find(|e| !e.is_empty());

    c.website = table
        .select(&SEL_LINK)
        .filter_map(|a| a.value().attr("href"))
        .map(str::trim)
        .find(|href| {
            (href.starts_with("http://") || href.starts_with("https://")) && !href.contains(DIRECTORY_HOST)
        })
        .map(str::to_string);

    if c.website.is_none() {
        c.website = table
            .select(&SEL_LINK)
            .map(stripped)
            .find(|text| text.contains('.') && !text.starts_with("http") && RE_DOMAIN.is_match(text))
            .map(|text| format!("http://{text}"));
    }

    for (label, cell) in labelled_rows(table) {
        let value = stripped(cell);
        if label.contains("Mobile") || label.contains("Phone") {
            if c.phone.is_none() {
                c.phone = extract_phone(&value);
            }
        } else if label.contains("E-mail") || label.contains("Email") {
            if c.email.is_none() {
                c.email = match cell.select(&SEL_MAILTO).next() {
                    Some(_) => mailto(cell).filter(|e| !e.is_empty()),
                    None => extract_email(&value),
                };
            }
        } else if label.contains("Website") && c.website.is_none() {
            c.website = match cell.select(&SEL_LINK).next().and_then(|a| a.value().attr("href")) {
                Some(href) => {
                    let href = href.trim();
                    (!href.is_empty() && !href.contains(DIRECTORY_HOST)).then(|| with_scheme(href))
                }
                None => {
                    let site = RE_WEBSITE_LABEL.replace(value.trim(), "");
                    let site = site.trim();
                    (site != "null" && site.contains('.')).then(|| with_scheme(site))
                }
            };
        }
    }

    if c.phone.is_none() || c.email.is_none() || c.website.is_none() {
        let text = text_of(table);
        if c.phone.is_none() {
            c.phone = extract_phone(&text);
        }
        if c.email.is_none() {
            c.email = extract_email(&text);
        }
        if c.website.is_none() {
            c.website = RE_WEBSITES.iter().find_map(|re| {
                let caps = re.captures(&text)?;
                let site = caps[1].trim().trim_end_matches('/');
                site.contains('.').then(|| with_scheme(site))
            });
        }
    }
    c
}

/// Primary/secondary addresses; a labelled row starts an address and the
/// rows after it continue it.
fn addresses(doc: &Html) -> Vec<NotaryAddress> {
    let Some(table) = section_table(doc, "Addresses") else {
        return Vec::new();
    };
    let kind_of = |s: &str| {
        if s.contains("Primary") {
            Some(AddressKind::Primary)
        } else if s.contains("Secondary") {
            Some(AddressKind::Secondary)
        } else {
            None
        }
    };
    let is_marker = |s: &str| matches!(s, "Primary" | "Secondary");

    let mut out = Vec::new();
    let mut current: Option<(AddressKind, Vec<String>)> = None;
    let flush = |current: &mut Option<(AddressKind, Vec<String>)>, out: &mut Vec<NotaryAddress>| {
        if let Some((kind, parts)) = current.take() {
            if !parts.is_empty() {
                out.push(NotaryAddress {
                    kind,
                    address: parts.join(" "),
                });
            }
        }
    };

    for row in table.select(&SEL_ROW) {
        let cells: Vec<ElementRef<'_>> = row.select(&SEL_CELL).collect();
        if cells.len() >= 2 {
            let label = stripped(cells[0]);
            let value = stripped(cells[1]);
            if let Some(kind) = kind_of(&label) {
                flush(&mut current, &mut out);
                let mut parts = Vec::new();
                if !value.is_empty() && !is_marker(&value) {
                    parts.push(value);
                }
                current = Some((kind, parts));
            } else if let Some((_, parts)) = current.as_mut() {
                if !value.is_empty() && !is_marker(&value) {
                    parts.push(value);
                }
            }
        } else if let [cell] = cells.as_slice() {
            let text = stripped(*cell);
            if text.is_empty() || is_marker(&text) || text == "Addresses" {
                continue;
            }
            match current.as_mut() {
                Some((_, parts)) => parts.push(text),
                None => {
                    if let Some(kind) = kind_of(&text) {
                        current = Some((kind, Vec::new()));
                    }
                }
            }
        }
    }
    flush(&mut current, &mut out);
    out
}

/// Rows of the "Notary Details" table, keys snake-cased.
fn notary_details(doc: &Html) -> BTreeMap<String, String> {
    let Some(table) = section_table(doc, "Notary Details") else {
        return BTreeMap::new();
    };
    labelled_rows(table)
        .filter_map(|(label, cell)| {
            let key = label.trim_end_matches(':');
            let value = stripped(cell);
            (!key.is_empty() && !value.is_empty())
                .then(|| (key.to_lowercase().replace(' ', "_").replace(':', ""), value))
        })
        .collect()
}

/// The profile table is either `Category,Value` text runs or plain
/// two-cell rows.
fn profile_details(doc: &Html) -> BTreeMap<String, String> {
    let mut details = BTreeMap::new();
    let Some((parent, _)) = text_node(doc, "Category,Details") else {
        return details;
    };
    let Some(table) = closest(parent, &["table"]) else {
        return details;
    };

    let text = text_of(table);
    let mut starts: Vec<(usize, &str, &str)> = PROFILE_CATEGORIES
        .iter()
        .filter_map(|&(label, key)| text.find(&format!("{label},")).map(|pos| (pos, label, key)))
        .collect();
    starts.sort_by_key(|(pos, _, _)| *pos);
    for (i, &(pos, label, key)) in starts.iter().enumerate() {
        let from = pos + label.len() + 1;
        let to = starts.get(i + 1).map_or(text.len(), |next| next.0);
        let value = text.get(from..to).unwrap_or_default().trim();
        if !value.is_empty() {
            details.insert(key.to_string(), value.to_string());
        }
    }

    if details.is_empty() {
        for (category, cell) in labelled_rows(table) {
            let value = stripped(cell);
            if category.is_empty() || value.is_empty() || category == value {
                continue;
            }
            if let Some(&(_, key)) = PROFILE_CATEGORIES.iter().find(|(label, _)| category.contains(label)) {
                details.insert(key.to_string(), value);
            }
        }
    }
    details
}

fn last_updated(doc: &Html) -> Option<String> {
    let (_, text) = text_node(doc, "last updated")?;
    RE_UPDATED.captures(&text).map(|caps| caps[1].to_string())
}
