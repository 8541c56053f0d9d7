use std::cmp::Ordering;
use std::str::FromStr;

use crate::errors::PortalError;
use crate::models::Scholarship;

/// Display orderings offered alongside the filters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    /// Soonest deadline first, undated awards last. Matches the backend's
    /// default ordering.
    #[default]
    Deadline,
    AmountDesc,
    Name,
    /// Lowest GPA requirement first; unparseable or absent requirements last.
    MinGpa,
}

impl FromStr for SortKey {
    type Err = PortalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "deadline" => Ok(Self::Deadline),
            "amount" => Ok(Self::AmountDesc),
            "name" => Ok(Self::Name),
            "gpa" => Ok(Self::MinGpa),
            other => Err(PortalError::UnknownTier {
                kind: "sort",
                value: other.to_string(),
            }),
        }
    }
}

/// Stable sort, so ties keep the order the backend sent.
pub fn sort_scholarships(list: &mut [Scholarship], key: SortKey) {
    match key {
        SortKey::Deadline => list.sort_by(|a, b| none_last(a.deadline, b.deadline, |x, y| x.cmp(y))),
        SortKey::AmountDesc => list.sort_by(|a, b| b.amount.total_cmp(&a.amount)),
        SortKey::Name => list.sort_by_key(|s| s.name.to_lowercase()),
        SortKey::MinGpa => list.sort_by(|a, b| {
            none_last(a.min_gpa_value(), b.min_gpa_value(), |x, y| x.total_cmp(y))
        }),
    }
}

fn none_last<T>(a: Option<T>, b: Option<T>, cmp: impl Fn(&T, &T) -> Ordering) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => cmp(&x, &y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
