//! Election lookup for scraped judges.
//!
//! Texas district and county-court-at-law judges serve four-year terms with
//! general elections in November of even years. The research data below is
//! keyed by the name as it appears on the court pages; lookups fall back to
//! a loose name match because the pages abbreviate and truncate names.

use super::{ElectionInfo, JudgeProfile};
use chrono::NaiveDate;
use tracing::debug;

/// Judicial term length in years.
pub const TERM_LENGTH_YEARS: u32 = 4;

const NO_JUDGE_NOTE: &str = "Judge information not available";
const NOT_FOUND_NOTE: &str = "Election information not found. Texas judges serve 4-year terms with elections in even-numbered years.";

/// Name → election info, in lookup order.
#[derive(Debug, Clone, Default)]
pub struct ElectionTable {
    entries: Vec<(String, ElectionInfo)>,
}

impl ElectionTable {
    pub fn new(entries: Vec<(String, ElectionInfo)>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Exact name first, then the first entry whose lower-cased name contains
    /// or is contained in `name`, or shares its first word.
    pub fn lookup(&self, name: &str) -> Option<&ElectionInfo> {
        if let Some((_, info)) = self.entries.iter().find(|(n, _)| n == name) {
            return Some(info);
        }
        let wanted = name.to_lowercase();
        let wanted_first = wanted.split_whitespace().next();
        self.entries
            .iter()
            .find(|(known, _)| {
                let known = known.to_lowercase();
                known.contains(&wanted)
                    || wanted.contains(&known)
                    || (wanted_first.is_some() && known.split_whitespace().next() == wanted_first)
            })
            .map(|(_, info)| info)
    }

    /// The Bell County research data.
    pub fn builtin() -> Self {
        fn elected(year: i32, next: i32, notes: &str) -> ElectionInfo {
            ElectionInfo {
                election_year: Some(year),
                next_election: Some(next),
                election_notes: notes.to_string(),
                ..ElectionInfo::default()
            }
        }
        fn appointed(year: i32, date: &str, next: i32, notes: &str) -> ElectionInfo {
            ElectionInfo {
                appointment_year: Some(year),
                appointment_date: Some(date.to_string()),
                next_election: Some(next),
                election_notes: notes.to_string(),
                ..ElectionInfo::default()
            }
        }
        fn pending(next: i32) -> ElectionInfo {
            ElectionInfo {
                next_election: Some(next),
                election_notes: format!("Next election scheduled for November {next}"),
                ..ElectionInfo::default()
            }
        }

        let starritt = appointed(
            2021,
            "August 2021",
            2026,
            "Appointed by Governor Greg Abbott in August 2021. First election in 2026",
        );
        let lepak_notes =
            "Appointed by Governor Greg Abbott in June 2018. Re-elected in 2022, next election 2026";
        let motz = elected(2022, 2026, "Elected January 3, 2023. Next election 2026");

        let entries = vec![
            ("Debbie Garrett", elected(2024, 2028, "Elected November 5, 2024")),
            (
                "Mike Russell",
                elected(2024, 2028, "Elected November 5, 2024, took office January 2, 2025"),
            ),
            (
                "Steve Duskie",
                elected(2024, 2028, "Re-elected November 5, 2024. Serving since August 17, 2020"),
            ),
            (
                "Wade Faulkner",
                appointed(
                    2022,
                    "August 18, 2022",
                    2026,
                    "Appointed by Governor Greg Abbott on August 18, 2022. First election in 2026",
                ),
            ),
            ("John Mischtian", elected(2022, 2026, "Re-elected November 8, 2022")),
            ("Rebecca De", pending(2026)),
            ("Rebecca DePena", pending(2026)),
            ("Rebecca DePew", pending(2026)),
            ("Cari Starritt-Burnett", starritt.clone()),
            ("Cari L. Starritt-Burnett", starritt),
            ("Paul LePak", appointed(2018, "June 2018", 2026, lepak_notes)),
            (
                "Paul L. LePak",
                ElectionInfo {
                    election_year: Some(2022),
                    ..appointed(2018, "June 2018", 2026, lepak_notes)
                },
            ),
            ("Paul Motz", motz.clone()),
            ("Paul A. Motz", motz),
        ];
        Self::new(
            entries
                .into_iter()
                .map(|(name, info)| (name.to_string(), info))
                .collect(),
        )
    }
}

/// Election info for a judge, with `days_until_election` relative to `today`.
pub fn election_info_for(name: Option<&str>, table: &ElectionTable, today: NaiveDate) -> ElectionInfo {
    let mut info = match name {
        None => ElectionInfo {
            election_notes: NO_JUDGE_NOTE.to_string(),
            ..ElectionInfo::default()
        },
        Some(name) => match table.lookup(name) {
            Some(found) => found.clone(),
            None => {
                debug!("No election data for {}", name);
                ElectionInfo {
                    election_notes: NOT_FOUND_NOTE.to_string(),
                    ..ElectionInfo::default()
                }
            }
        },
    };
    info.days_until_election = info.next_election.and_then(|year| days_until_election(year, today));
    info
}

/// Days from `today` to 5 November of `year`, if that date is still ahead.
pub fn days_until_election(year: i32, today: NaiveDate) -> Option<i64> {
    let election = NaiveDate::from_ymd_opt(year, 11, 5)?;
    (election > today).then(|| (election - today).num_days())
}

/// Next election year from the last election, or for appointees the next
/// even year that leaves more than two years of service.
pub fn next_election_after(election_year: Option<i32>, appointment_year: Option<i32>) -> Option<i32> {
    if let Some(year) = election_year {
        return Some(year + TERM_LENGTH_YEARS as i32);
    }
    let appointed = appointment_year?;
    let next_even = (appointed.div_euclid(2) + 1) * 2;
    if next_even <= appointed + 2 {
        Some(next_even + 2)
    } else {
        Some(next_even)
    }
}

/// Attach election info to every profile.
pub fn annotate(judges: &mut [JudgeProfile], table: &ElectionTable, today: NaiveDate) {
    for judge in judges.iter_mut() {
        let info = election_info_for(judge.judge_name.as_deref(), table, today);
        match (info.next_election, info.days_until_election) {
            (Some(year), Some(days)) => debug!("{}: next election {} ({} days)", judge.court_name, year, days),
            (Some(year), None) => debug!("{}: next election {} (past due)", judge.court_name, year),
            _ => {}
        }
        judge.election_info = Some(info);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn exact_match() {
        let table = ElectionTable::builtin();
        let info = election_info_for(Some("Debbie Garrett"), &table, day(2025, 1, 1));
        assert_eq!(info.election_year, Some(2024));
        assert_eq!(info.next_election, Some(2028));
        assert_eq!(info.term_length_years, 4);
    }

    #[test]
    fn fuzzy_match_by_containment_and_first_name() {
        let table = ElectionTable::builtin();
        // Contained in a known name.
        let info = table.lookup("Starritt-Burnett").unwrap();
        assert_eq!(info.appointment_year, Some(2021));
        // Shared first name takes the first such entry in table order.
        let info = table.lookup("Paul Unknown").unwrap();
        assert_eq!(info.appointment_date.as_deref(), Some("June 2018"));
        assert_eq!(info.election_year, None);
    }

    #[test]
    fn unknown_and_missing_names() {
        let table = ElectionTable::builtin();
        let today = day(2025, 1, 1);
        let info = election_info_for(Some("Zed Nobody"), &table, today);
        assert_eq!(info.next_election, None);
        assert!(info.election_notes.starts_with("Election information not found"));

        let info = election_info_for(None, &table, today);
        assert_eq!(info.election_notes, "Judge information not available");
        assert_eq!(info.days_until_election, None);
    }

    #[test]
    fn days_until_election_counts_to_november_fifth() {
        assert_eq!(days_until_election(2026, day(2026, 11, 4)), Some(1));
        assert_eq!(days_until_election(2026, day(2026, 11, 5)), None);
        assert_eq!(days_until_election(2026, day(2025, 11, 5)), Some(365));
    }

    #[test]
    fn next_election_arithmetic() {
        assert_eq!(next_election_after(Some(2022), None), Some(2026));
        assert_eq!(next_election_after(None, Some(2022)), Some(2026));
        assert_eq!(next_election_after(None, Some(2021)), Some(2024));
        assert_eq!(next_election_after(None, None), None);
    }

    #[test]
    fn annotate_sets_every_profile() {
        use crate::judges::{CourtType, JudgeProfile};
        let mut judges = vec![JudgeProfile::new("27th", CourtType::District, "u".into())];
        judges[0].judge_name = Some("Mike Russell".into());
        annotate(&mut judges, &ElectionTable::builtin(), day(2026, 1, 1));
        let info = judges[0].election_info.as_ref().unwrap();
        assert_eq!(info.next_election, Some(2028));
        assert!(info.days_until_election.is_some());
    }
}
