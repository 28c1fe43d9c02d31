//! Extraction of justice-related officials from the county's officials table.
//!
//! The page is a single table with one row per office:
//! `title | name (mailto link) | date took office | phone`.

use super::{Official, PositionType};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

static SEL_TABLE: Lazy<Selector> = Lazy::new(|| Selector::parse("table").unwrap());
static SEL_ROW: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").unwrap());
static SEL_CELL: Lazy<Selector> = Lazy::new(|| Selector::parse("td, th").unwrap());
static SEL_MAILTO: Lazy<Selector> = Lazy::new(|| Selector::parse(r#"a[href^="mailto:"]"#).unwrap());

static RE_PRECINCT: Lazy<Regex> = Lazy::new(|| Regex::new(r"Pct\.\s*(\d+)").unwrap());
static RE_PLACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Pl\.\s*(\d+)").unwrap());

/// Title fragments of the offices kept. Everything else in the table is skipped.
pub const JUSTICE_POSITIONS: &[&str] = &[
    "District Attorney",
    "County Attorney",
    "Sheriff",
    "District Clerk",
    "County Clerk",
    "Peace Justice",
    "Constable",
];

/// Year of an `M/DD/YY` or `M/DD/YYYY` date. Two-digit years up to 30 are
/// 20xx, the rest 19xx.
pub fn parse_date(date: &str) -> Option<i32> {
    let year = date.split('/').nth(2)?.trim();
    let n: i32 = year.parse().ok()?;
    if year.len() == 2 {
        Some(if n <= 30 { 2000 + n } else { 1900 + n })
    } else {
        Some(n)
    }
}

/// Office holders take office in January after a November election, so an
/// odd office year means the election was the year before.
pub fn last_election_year(office_year: i32) -> i32 {
    if office_year.rem_euclid(2) == 1 {
        office_year - 1
    } else {
        office_year
    }
}

/// First even year from `current_year` on that is a whole number of
/// four-year terms after `last_election`.
pub fn next_election(last_election: i32, current_year: i32) -> i32 {
    let mut year = current_year + current_year.rem_euclid(2);
    while year < last_election + 4 || (year - last_election).rem_euclid(4) != 0 {
        year += 2;
    }
    year
}

/// Position, precinct and place for a justice-related title.
fn classify(title: &str) -> Option<(PositionType, Option<u32>, Option<u32>)> {
    let number = |re: &Regex| {
        re.captures(title)
            .and_then(|caps| caps[1].parse().ok())
    };
    let position = if title.contains("District Attorney") {
        PositionType::DistrictAttorney
    } else if title.contains("County Attorney") {
        PositionType::CountyAttorney
    } else if title.contains("Sheriff") {
        PositionType::Sheriff
    } else if title.contains("District Clerk") {
        PositionType::DistrictClerk
    } else if title.contains("County Clerk") {
        PositionType::CountyClerk
    } else if title.contains("Justice") {
        return Some((PositionType::JusticeOfThePeace, number(&RE_PRECINCT), number(&RE_PLACE)));
    } else if title.contains("Constable") {
        return Some((PositionType::Constable, number(&RE_PRECINCT), None));
    } else {
        return None;
    };
    Some((position, None, None))
}

/// Text of a cell with every text node trimmed and concatenated.
fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text().map(str::trim).collect()
}

fn parse_row(row: ElementRef<'_>) -> Option<Official> {
    let cells: Vec<ElementRef<'_>> = row.select(&SEL_CELL).collect();
    if cells.len() < 4 {
        return None;
    }
    let title = cell_text(cells[0]);
    let name = cell_text(cells[1]);
    if name.is_empty() || !JUSTICE_POSITIONS.iter().any(|p| title.contains(p)) {
        return None;
    }
    let (position_type, precinct, place) = classify(&title)?;

    let elected_date = cell_text(cells[2]);
    let phone = cell_text(cells[3]);
    let email = cells[1]
        .select(&SEL_MAILTO)
        .next()
        .and_then(|a| a.value().attr("href"))
        .map(|href| href.replace("mailto:", "").trim().to_string());
    let elected_year = parse_date(&elected_date);

    Some(Official {
        title,
        name,
        phone: (!phone.is_empty()).then_some(phone),
        email,
        elected_date,
        elected_year,
        next_election: None,
        last_election_year: elected_year.map(last_election_year),
        position_type,
        term_length_years: super::TERM_LENGTH_YEARS,
        precinct,
        place,
        days_until_election: None,
    })
}

/// Justice-related officials from the first table on the page, header row
/// skipped. Election dates are filled in later by [`super::annotate`].
pub fn parse_elected_officials(html: &str) -> Vec<Official> {
    let doc = Html::parse_document(html);
    let Some(table) = doc.select(&SEL_TABLE).next() else {
        return Vec::new();
    };
    table.select(&SEL_ROW).skip(1).filter_map(parse_row).collect()
}
