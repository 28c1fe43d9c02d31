//! Heuristic phone/email mining from an HTML page.

use super::ContactInfo;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;

static RE_PHONE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}").unwrap());

static RE_PHONE_CONTEXT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:phone|call|contact|main|number|tel)[:\s]*(\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4})")
        .unwrap()
});

static RE_EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Z|a-z]{2,}\b").unwrap()
});

/// Email fragments that mark an official address.
const PREFERRED_EMAIL_MARKERS: &[&str] = &["county", "gov", "texas", "bell"];

/// Find a phone number and an email address in the page's visible text.
///
/// A phone number introduced by a label such as "Phone:" or "Call" wins over
/// the first bare number; an email on a county/government domain wins over
/// the first address found.
pub fn extract_contact_info(html: &str) -> ContactInfo {
    let text: String = Html::parse_document(html).root_element().text().collect();
    ContactInfo {
        phone: find_phone(&text),
        email: find_email(&text),
    }
}

/// Exactly ten digits once `( ) - .` and spaces are removed.
fn is_ten_digits(candidate: &str) -> bool {
    candidate
        .chars()
        .filter(|c| !matches!(c, '(' | ')' | '-' | '.' | ' '))
        .count()
        == 10
}

fn find_phone(text: &str) -> Option<String> {
    if let Some(caps) = RE_PHONE_CONTEXT.captures(text) {
        return Some(caps[1].to_string());
    }
    RE_PHONE
        .find_iter(text)
        .map(|m| m.as_str())
        .find(|m| is_ten_digits(m))
        .map(str::to_string)
}

fn find_email(text: &str) -> Option<String> {
    let emails: Vec<&str> = RE_EMAIL.find_iter(text).map(|m| m.as_str()).collect();
    emails
        .iter()
        .find(|e| {
            let lower = e.to_lowercase();
            PREFERRED_EMAIL_MARKERS.iter().any(|m| lower.contains(m))
        })
        .or_else(|| emails.first())
        .map(|e| e.to_string())
}
