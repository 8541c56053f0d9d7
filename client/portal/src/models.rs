//! Wire and domain types shared by the engine, the REST client and the
//! local view API.
//!
//! The portal backend is lenient about numeric types: decimals arrive as
//! strings (`"5000.00"`), optional fields arrive as `null` or `""`, and an
//! application's scholarship reference is sometimes a nested object. The
//! deserialisers below absorb those variations so the engine only ever sees
//! one shape.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::coerce::parse_optional_number;

/// One fundable award opportunity as exposed by `GET /scholarships/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scholarship {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(deserialize_with = "de_amount")]
    pub amount: f64,
    /// `None` means the award has no deadline.
    #[serde(default, deserialize_with = "de_optional_date")]
    pub deadline: Option<NaiveDate>,
    #[serde(default)]
    pub donor_id: Option<i64>,
    /// External application instructions, usually a URL.
    #[serde(default)]
    pub apply_info: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub status: Option<String>,
    /// Raw minimum GPA; compare only through [`Scholarship::min_gpa_value`].
    #[serde(default, deserialize_with = "de_optional_text")]
    pub min_gpa: Option<String>,
    /// `None` or empty means any major is accepted.
    #[serde(default)]
    pub allowed_major: Option<String>,
    #[serde(default)]
    pub requires_transcript: Option<bool>,
    #[serde(default)]
    pub requires_recommendation: Option<bool>,
    #[serde(default)]
    pub bookmark_count: Option<u64>,
    #[serde(default)]
    pub is_bookmarked: bool,
}

impl Scholarship {
    pub fn min_gpa_value(&self) -> Option<f64> {
        parse_optional_number(self.min_gpa.as_deref())
    }

    /// The major restriction, if one is actually set.
    pub fn major_restriction(&self) -> Option<&str> {
        self.allowed_major
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
    }
}

#[cfg(test)]
impl Scholarship {
    /// Unrestricted $1,000 award with no deadline.
    pub(crate) fn sample(id: i64) -> Self {
        Scholarship {
            id,
            name: format!("Award {id}"),
            description: String::new(),
            amount: 1000.0,
            deadline: None,
            donor_id: None,
            apply_info: None,
            is_active: true,
            status: None,
            min_gpa: None,
            allowed_major: None,
            requires_transcript: None,
            requires_recommendation: None,
            bookmark_count: None,
            is_bookmarked: false,
        }
    }
}

/// Profile returned by `GET /accounts/me/`. Only the fields the engine
/// consumes are modelled.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub major: Option<String>,
    #[serde(default, deserialize_with = "de_optional_text")]
    pub gpa: Option<String>,
}

/// The viewer's matching profile. Fixed for the lifetime of a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UserEligibility {
    pub id: i64,
    pub major: String,
    pub gpa: f64,
}

impl From<&Profile> for UserEligibility {
    fn from(profile: &Profile) -> Self {
        UserEligibility {
            id: profile.id.unwrap_or(0),
            major: profile.major.clone().unwrap_or_default(),
            gpa: parse_optional_number(profile.gpa.as_deref()).unwrap_or(0.0),
        }
    }
}

/// An existing application, observed only for its scholarship reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: i64,
    /// Either a bare id or the nested scholarship object on the wire.
    #[serde(deserialize_with = "de_scholarship_ref")]
    pub scholarship: i64,
    #[serde(default)]
    pub applicant: Option<i64>,
    #[serde(default)]
    pub submitted_at: Option<String>,
}

/// Body of `POST /scholarships/{id}/bookmark/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookmarkRequest {
    pub saved: bool,
}

// ─────────────────────────────────────────────────────────
// Lenient field decoding
// ─────────────────────────────────────────────────────────

fn default_true() -> bool {
    true
}

fn de_amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    let amount = match &value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_optional_number(Some(s)),
        _ => None,
    };
    match amount {
        Some(a) if a >= 0.0 => Ok(a),
        _ => Err(de::Error::custom(format!(
            "invalid scholarship amount: {value}"
        ))),
    }
}

/// Keeps the textual form so that coercion happens in exactly one place.
fn de_optional_text<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

/// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp. Blank, unreadable or
/// non-string values are treated as "no deadline".
fn de_optional_date<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<NaiveDate>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => parse_deadline(&s),
        _ => None,
    })
}

pub(crate) fn parse_deadline(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().or_else(|| {
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.with_timezone(&Utc).date_naive())
    })
}

fn de_scholarship_ref<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    match &value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Object(map) => map.get("id").and_then(Value::as_i64),
        _ => None,
    }
    .ok_or_else(|| de::Error::custom(format!("invalid scholarship reference: {value}")))
}
