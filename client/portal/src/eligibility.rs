//! Major/GPA eligibility and availability.
//!
//! Eligibility ignores the viewer's filter choices entirely: it answers
//! "could this student receive the award", not "does the student want to
//! see it". A missing major restriction is a wildcard here, unlike the
//! major *filter* in [`crate::filters`].

use std::collections::HashSet;

use crate::models::{Scholarship, UserEligibility};

/// Whether `user` satisfies the major and GPA restrictions of `scholarship`.
///
/// A `min_gpa` that does not coerce to a number is treated as no constraint.
pub fn is_eligible(scholarship: &Scholarship, user: &UserEligibility) -> bool {
    let major_ok = match scholarship.major_restriction() {
        None => true,
        Some(major) => major.to_lowercase() == user.major.trim().to_lowercase(),
    };
    let gpa_ok = match scholarship.min_gpa_value() {
        None => true,
        Some(min) => user.gpa >= min,
    };
    major_ok && gpa_ok
}

pub fn compute_eligible(scholarships: &[Scholarship], user: &UserEligibility) -> Vec<Scholarship> {
    scholarships
        .iter()
        .filter(|s| is_eligible(s, user))
        .cloned()
        .collect()
}

/// Drop scholarships the user already has an application for.
pub fn compute_available(eligible: &[Scholarship], applied: &HashSet<i64>) -> Vec<Scholarship> {
    eligible
        .iter()
        .filter(|s| !applied.contains(&s.id))
        .cloned()
        .collect()
}
