//! User-selected filters over a scholarship list.
//!
//! A [`FilterState`] holds five independent selectors. Each one is a closed
//! set of tiers whose `All` variant admits everything, so
//! [`apply_filters`] is simply the conjunction of the five predicates.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;

use crate::coerce::parse_optional_number;
use crate::errors::PortalError;
use crate::models::Scholarship;

const MILLIS_PER_WEEK: f64 = 7.0 * 24.0 * 60.0 * 60.0 * 1000.0;

// ─────────────────────────────────────────────────────────
// Tiers
// ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AmountTier {
    #[default]
    All,
    AtLeast1000,
    AtLeast5000,
    AtLeast10000,
}

impl AmountTier {
    pub fn admits(&self, scholarship: &Scholarship) -> bool {
        match self.threshold() {
            None => true,
            Some(min) => scholarship.amount >= min,
        }
    }

    fn threshold(&self) -> Option<f64> {
        match self {
            Self::All => None,
            Self::AtLeast1000 => Some(1_000.0),
            Self::AtLeast5000 => Some(5_000.0),
            Self::AtLeast10000 => Some(10_000.0),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::AtLeast1000 => "$1000+",
            Self::AtLeast5000 => "$5000+",
            Self::AtLeast10000 => "$10000+",
        }
    }
}

impl FromStr for AmountTier {
    type Err = PortalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "all" => Ok(Self::All),
            "$1000+" | "1000+" => Ok(Self::AtLeast1000),
            "$5000+" | "5000+" => Ok(Self::AtLeast5000),
            "$10000+" | "10000+" => Ok(Self::AtLeast10000),
            other => Err(PortalError::UnknownTier {
                kind: "amount",
                value: other.to_string(),
            }),
        }
    }
}

/// Restricts to one declared major. Unlike eligibility, a scholarship with
/// no major restriction does not match a specific major.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MajorFilter {
    #[default]
    All,
    Only(String),
}

impl MajorFilter {
    pub fn admits(&self, scholarship: &Scholarship) -> bool {
        match self {
            Self::All => true,
            Self::Only(major) => scholarship
                .major_restriction()
                .is_some_and(|m| m.to_lowercase() == major.trim().to_lowercase()),
        }
    }
}

impl FromStr for MajorFilter {
    type Err = PortalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "all" => Ok(Self::All),
            major => Ok(Self::Only(major.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum GpaFilter {
    #[default]
    All,
    AtLeast(f64),
}

impl GpaFilter {
    /// Requires a numeric `min_gpa` at or above the chosen tier.
    pub fn admits(&self, scholarship: &Scholarship) -> bool {
        match self {
            Self::All => true,
            Self::AtLeast(tier) => scholarship.min_gpa_value().is_some_and(|g| g >= *tier),
        }
    }
}

impl FromStr for GpaFilter {
    type Err = PortalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "all" => Ok(Self::All),
            other => parse_optional_number(Some(other))
                .map(Self::AtLeast)
                .ok_or_else(|| PortalError::UnknownTier {
                    kind: "gpa",
                    value: other.to_string(),
                }),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeadlineTier {
    #[default]
    All,
    /// Four weeks or less, including deadlines already past.
    ApproachingSoon,
    FourPlus,
    SixPlus,
    TwelvePlus,
    /// Fifteen weeks or more.
    Farthest,
}

impl DeadlineTier {
    pub fn admits(&self, scholarship: &Scholarship, now: DateTime<Utc>) -> bool {
        let weeks = weeks_until_deadline(scholarship.deadline, now);
        match self {
            Self::All => true,
            Self::ApproachingSoon => weeks <= 4.0,
            Self::FourPlus => weeks >= 4.0,
            Self::SixPlus => weeks >= 6.0,
            Self::TwelvePlus => weeks >= 12.0,
            Self::Farthest => weeks >= 15.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::ApproachingSoon => "approaching-soon",
            Self::FourPlus => "4+",
            Self::SixPlus => "6+",
            Self::TwelvePlus => "12+",
            Self::Farthest => "farthest-deadline",
        }
    }
}

impl FromStr for DeadlineTier {
    type Err = PortalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "all" => Ok(Self::All),
            "approaching-soon" => Ok(Self::ApproachingSoon),
            "4+" => Ok(Self::FourPlus),
            "6+" => Ok(Self::SixPlus),
            "12+" => Ok(Self::TwelvePlus),
            "farthest-deadline" | "15+" => Ok(Self::Farthest),
            other => Err(PortalError::UnknownTier {
                kind: "deadline",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for DeadlineTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for AmountTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────
// Deadline arithmetic
// ─────────────────────────────────────────────────────────

/// Fractional weeks from `now` until midnight UTC of the deadline date.
/// No deadline is infinitely far away.
///
/// Tier comparisons use this value as is and deliberately do not round up,
/// so 3.9 weeks is not "4+ weeks". Only [`display_weeks_until`] rounds.
pub fn weeks_until_deadline(deadline: Option<NaiveDate>, now: DateTime<Utc>) -> f64 {
    match deadline {
        None => f64::INFINITY,
        Some(date) => {
            let due = date.and_time(NaiveTime::MIN).and_utc();
            (due - now).num_milliseconds() as f64 / MILLIS_PER_WEEK
        }
    }
}

/// Whole weeks remaining, rounded up, as shown next to a deadline.
pub fn display_weeks_until(deadline: Option<NaiveDate>, now: DateTime<Utc>) -> Option<i64> {
    deadline.map(|d| weeks_until_deadline(Some(d), now).ceil() as i64)
}

// ─────────────────────────────────────────────────────────
// Filter state
// ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterState {
    pub search: String,
    pub amount: AmountTier,
    pub major: MajorFilter,
    pub gpa: GpaFilter,
    pub deadline: DeadlineTier,
}

impl FilterState {
    pub fn matches_name(&self, scholarship: &Scholarship) -> bool {
        let needle = self.search.trim().to_lowercase();
        needle.is_empty() || scholarship.name.to_lowercase().contains(&needle)
    }

    pub fn matches(&self, scholarship: &Scholarship, now: DateTime<Utc>) -> bool {
        self.matches_name(scholarship)
            && self.amount.admits(scholarship)
            && self.major.admits(scholarship)
            && self.gpa.admits(scholarship)
            && self.deadline.admits(scholarship, now)
    }
}

pub fn apply_filters(
    list: &[Scholarship],
    state: &FilterState,
    now: DateTime<Utc>,
) -> Vec<Scholarship> {
    list.iter()
        .filter(|s| state.matches(s, now))
        .cloned()
        .collect()
}

/// The "best match" highlight: a specific major filter naming this
/// scholarship's major.
pub fn is_best_match(scholarship: &Scholarship, state: &FilterState) -> bool {
    matches!(state.major, MajorFilter::Only(_)) && state.major.admits(scholarship)
}

pub fn saved_only(list: &[Scholarship]) -> Vec<Scholarship> {
    list.iter().filter(|s| s.is_bookmarked).cloned().collect()
}

pub fn unsaved_only(list: &[Scholarship]) -> Vec<Scholarship> {
    list.iter().filter(|s| !s.is_bookmarked).cloned().collect()
}

// ─────────────────────────────────────────────────────────
// Selector options
// ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterOptions {
    pub majors: Vec<String>,
    pub gpa_tiers: Vec<f64>,
}

/// Build the major and GPA selector options from the loaded list.
/// GPA values that do not coerce are left out.
pub fn derive_filter_options(scholarships: &[Scholarship]) -> FilterOptions {
    let mut seen = HashSet::new();
    let majors = scholarships
        .iter()
        .filter_map(Scholarship::major_restriction)
        .filter(|m| seen.insert(m.to_string()))
        .map(String::from)
        .collect();

    let mut gpa_tiers: Vec<f64> = scholarships
        .iter()
        .filter_map(Scholarship::min_gpa_value)
        .collect();
    gpa_tiers.sort_by(f64::total_cmp);
    gpa_tiers.dedup();

    FilterOptions { majors, gpa_tiers }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap()
    }

    fn due_in(id: i64, at: DateTime<Utc>) -> Scholarship {
        Scholarship {
            deadline: Some(at.date_naive()),
            ..Scholarship::sample(id)
        }
    }

    fn midnight(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn tier_strings_parse() {
        assert_eq!("$5000+".parse::<AmountTier>().unwrap(), AmountTier::AtLeast5000);
        assert_eq!("all".parse::<MajorFilter>().unwrap(), MajorFilter::All);
        assert_eq!(
            "Nursing".parse::<MajorFilter>().unwrap(),
            MajorFilter::Only("Nursing".into())
        );
        assert_eq!("3.5".parse::<GpaFilter>().unwrap(), GpaFilter::AtLeast(3.5));
        assert_eq!(
            "farthest-deadline".parse::<DeadlineTier>().unwrap(),
            DeadlineTier::Farthest
        );
        assert!("$2000+".parse::<AmountTier>().is_err());
        assert!("high".parse::<GpaFilter>().is_err());
        assert!("soon".parse::<DeadlineTier>().is_err());
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let s = Scholarship {
            name: "Wildcat Engineering Fund".into(),
            ..Scholarship::sample(1)
        };
        let mut state = FilterState::default();
        assert!(state.matches_name(&s));
        state.search = "ENGINEER".into();
        assert!(state.matches_name(&s));
        state.search = "nursing".into();
        assert!(!state.matches_name(&s));
    }

    #[test]
    fn amount_tiers_are_inclusive() {
        let s = Scholarship {
            amount: 5000.0,
            ..Scholarship::sample(1)
        };
        assert!(AmountTier::All.admits(&s));
        assert!(AmountTier::AtLeast1000.admits(&s));
        assert!(AmountTier::AtLeast5000.admits(&s));
        assert!(!AmountTier::AtLeast10000.admits(&s));
    }

    #[test]
    fn major_filter_requires_declared_major() {
        let open = Scholarship::sample(1);
        let math = Scholarship {
            allowed_major: Some("Mathematics".into()),
            ..Scholarship::sample(2)
        };
        let filter = MajorFilter::Only("mathematics".into());
        assert!(filter.admits(&math));
        assert!(!filter.admits(&open));
        assert!(MajorFilter::All.admits(&open));
    }

    #[test]
    fn gpa_filter_requires_numeric_min_gpa() {
        let with = |raw: Option<&str>| Scholarship {
            min_gpa: raw.map(String::from),
            ..Scholarship::sample(1)
        };
        let tier = GpaFilter::AtLeast(3.0);
        assert!(tier.admits(&with(Some("3.0"))));
        assert!(tier.admits(&with(Some("3.75"))));
        assert!(!tier.admits(&with(Some("2.5"))));
        assert!(!tier.admits(&with(Some("bad"))));
        assert!(!tier.admits(&with(None)));
        assert!(GpaFilter::All.admits(&with(Some("bad"))));
    }

    #[test]
    fn exactly_four_weeks_matches_both_boundary_tiers() {
        let due = midnight(2026, 11, 16);
        let s = due_in(1, due);
        let at = due - Duration::days(28);

        assert_eq!(weeks_until_deadline(s.deadline, at), 4.0);
        assert!(DeadlineTier::ApproachingSoon.admits(&s, at));
        assert!(DeadlineTier::FourPlus.admits(&s, at));
        assert!(!DeadlineTier::SixPlus.admits(&s, at));
    }

    #[test]
    fn just_under_four_weeks_is_only_approaching() {
        let due = midnight(2026, 11, 16);
        let s = due_in(1, due);
        // 3.9 weeks
        let at = due - Duration::minutes(39_312);

        assert!(DeadlineTier::ApproachingSoon.admits(&s, at));
        assert!(!DeadlineTier::FourPlus.admits(&s, at));
        assert_eq!(display_weeks_until(s.deadline, at), Some(4));
    }

    #[test]
    fn missing_deadline_is_infinitely_far() {
        let s = Scholarship::sample(1);
        for tier in [
            DeadlineTier::FourPlus,
            DeadlineTier::SixPlus,
            DeadlineTier::TwelvePlus,
            DeadlineTier::Farthest,
            DeadlineTier::All,
        ] {
            assert!(tier.admits(&s, now()), "{tier}");
        }
        assert!(!DeadlineTier::ApproachingSoon.admits(&s, now()));
        assert_eq!(display_weeks_until(None, now()), None);
    }

    #[test]
    fn past_deadline_counts_as_approaching() {
        let s = due_in(1, now() - Duration::days(3));
        assert!(DeadlineTier::ApproachingSoon.admits(&s, now()));
        assert!(!DeadlineTier::FourPlus.admits(&s, now()));
    }

    fn conjunction_fixture() -> Vec<Scholarship> {
        vec![
            Scholarship {
                name: "STEM Leaders".into(),
                amount: 12_000.0,
                allowed_major: Some("Physics".into()),
                min_gpa: Some("3.5".into()),
                deadline: Some((now() + Duration::weeks(20)).date_naive()),
                ..Scholarship::sample(1)
            },
            Scholarship {
                name: "Community Grant".into(),
                amount: 1_500.0,
                deadline: Some((now() + Duration::days(10)).date_naive()),
                ..Scholarship::sample(2)
            },
            Scholarship {
                name: "Physics Prize".into(),
                amount: 6_000.0,
                allowed_major: Some("physics".into()),
                min_gpa: Some("oops".into()),
                ..Scholarship::sample(3)
            },
        ]
    }

    fn filtered_ids(state: FilterState) -> Vec<i64> {
        apply_filters(&conjunction_fixture(), &state, now())
            .iter()
            .map(|s| s.id)
            .collect()
    }

    #[test]
    fn apply_filters_hand_checked_cases() {
        assert_eq!(
            filtered_ids(FilterState {
                search: "physics".into(),
                gpa: GpaFilter::AtLeast(3.0),
                ..Default::default()
            }),
            Vec::<i64>::new()
        );
        assert_eq!(
            filtered_ids(FilterState {
                major: MajorFilter::Only("PHYSICS".into()),
                ..Default::default()
            }),
            vec![1, 3]
        );
        assert_eq!(
            filtered_ids(FilterState {
                search: "GRANT".into(),
                ..Default::default()
            }),
            vec![2]
        );
        assert_eq!(
            filtered_ids(FilterState {
                gpa: GpaFilter::AtLeast(3.0),
                ..Default::default()
            }),
            vec![1]
        );
        assert_eq!(
            filtered_ids(FilterState {
                deadline: DeadlineTier::ApproachingSoon,
                ..Default::default()
            }),
            vec![2]
        );
        assert_eq!(
            filtered_ids(FilterState {
                deadline: DeadlineTier::Farthest,
                ..Default::default()
            }),
            vec![1, 3]
        );
        assert_eq!(
            filtered_ids(FilterState {
                amount: AmountTier::AtLeast5000,
                deadline: DeadlineTier::ApproachingSoon,
                ..Default::default()
            }),
            Vec::<i64>::new()
        );
        assert_eq!(
            filtered_ids(FilterState {
                amount: AmountTier::AtLeast10000,
                major: MajorFilter::Only("physics".into()),
                gpa: GpaFilter::AtLeast(3.5),
                deadline: DeadlineTier::TwelvePlus,
                search: "stem".into(),
            }),
            vec![1]
        );
    }

    #[test]
    fn apply_filters_is_conjunction_of_predicates() {
        let list = conjunction_fixture();

        let searches = ["", "physics", "grant"];
        let amounts = [AmountTier::All, AmountTier::AtLeast5000, AmountTier::AtLeast10000];
        let majors = [MajorFilter::All, MajorFilter::Only("PHYSICS".into())];
        let gpas = [GpaFilter::All, GpaFilter::AtLeast(3.0)];
        let deadlines = [
            DeadlineTier::All,
            DeadlineTier::ApproachingSoon,
            DeadlineTier::Farthest,
        ];

        for search in searches {
            for amount in amounts {
                for major in &majors {
                    for gpa in gpas {
                        for deadline in deadlines {
                            let state = FilterState {
                                search: search.into(),
                                amount,
                                major: major.clone(),
                                gpa,
                                deadline,
                            };
                            let expected: Vec<i64> = list
                                .iter()
                                .filter(|s| {
                                    state.matches_name(s)
                                        && amount.admits(s)
                                        && major.admits(s)
                                        && gpa.admits(s)
                                        && deadline.admits(s, now())
                                })
                                .map(|s| s.id)
                                .collect();
                            let got: Vec<i64> =
                                apply_filters(&list, &state, now()).iter().map(|s| s.id).collect();
                            assert_eq!(got, expected, "{state:?}");
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn default_state_is_unconstrained() {
        let list = vec![Scholarship::sample(1), Scholarship::sample(2)];
        assert_eq!(apply_filters(&list, &FilterState::default(), now()), list);
    }

    #[test]
    fn options_skip_malformed_gpa_and_dedupe() {
        let gpas = [Some("3.5"), Some("bad"), None, Some("3.5"), Some("2.0")];
        let majors = [Some("Art"), None, Some(""), Some("Art"), Some("Music")];
        let list: Vec<Scholarship> = gpas
            .iter()
            .zip(majors)
            .enumerate()
            .map(|(i, (gpa, major))| Scholarship {
                min_gpa: gpa.map(String::from),
                allowed_major: major.map(String::from),
                ..Scholarship::sample(i as i64)
            })
            .collect();

        let options = derive_filter_options(&list);
        assert_eq!(options.gpa_tiers, vec![2.0, 3.5]);

        let majors: HashSet<&str> = options.majors.iter().map(String::as_str).collect();
        assert_eq!(majors, HashSet::from(["Art", "Music"]));
        assert_eq!(options.majors.len(), 2);
    }

    #[test]
    fn best_match_needs_specific_major() {
        let s = Scholarship {
            allowed_major: Some("History".into()),
            ..Scholarship::sample(1)
        };
        let mut state = FilterState::default();
        assert!(!is_best_match(&s, &state));
        state.major = MajorFilter::Only("history".into());
        assert!(is_best_match(&s, &state));
    }

    #[test]
    fn saved_and_unsaved_partition_the_list() {
        let list = vec![
            Scholarship {
                is_bookmarked: true,
                ..Scholarship::sample(1)
            },
            Scholarship::sample(2),
        ];
        assert_eq!(saved_only(&list)[0].id, 1);
        assert_eq!(unsaved_only(&list)[0].id, 2);
    }
}
