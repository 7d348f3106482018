//! Row Mapper: raw source rows → HubSpot property sets.
//!
//! A fixed column dictionary maps lower-cased, trimmed source labels to
//! target property names (`None` marks a column as deliberately ignored).
//! Two value transforms run after mapping: call-outcome code expansion and
//! date normalization to UTC-midnight epoch milliseconds.
//!
//! Mapping is lenient by design: unknown columns are dropped, empty values
//! are omitted, and a value that fails every transform passes through
//! unchanged. One bad cell never aborts a row.

use chrono::{DateTime, NaiveDate};

use crate::import::{PropertySet, RawRow};

/// Source column label (lower-cased) → target property, or `None` to ignore.
const COLUMN_MAP: &[(&str, Option<&str>)] = &[
    ("slug", None),
    ("url", Some("website")),
    ("website?", Some("website")),
    ("page", Some("facebook_company_page")),
    ("ads", Some("facebook_ads_library")),
    ("rep", Some("last_sales_outreach_by")),
    ("date", Some("last_sales_outreach_date")),
    ("number", Some("phone")),
    ("number2", Some("alternate_phone_number")),
    ("number 2", Some("alternate_phone_number")),
    ("format", Some("phone_number_format")),
    ("notes", Some("last_sales_call_outcome")),
    ("email", Some("email")),
    ("email format", Some("email_format")),
    ("business", Some("name")),
    ("category", Some("industry1")),
    ("state", Some("state")),
    ("city", Some("city")),
    ("postcode", Some("zip")),
    ("apes", Some("pces")),
    ("pces", Some("pces")),
    ("rural flag", Some("rural_indicator")),
    ("rural?", Some("rural_indicator")),
    ("scraped date", None),
    ("scraped", None),
    ("follower count", Some("facebook_followers")),
    ("follower", Some("facebook_followers")),
    ("probability", Some("probability")),
    ("probability answered", None),
];

/// Shorthand call-outcome codes → property option values.
const CALL_OUTCOME_CODES: &[(&str, &str)] = &[
    ("NA", "no_answer"),
    ("NI", "not-interested"),
    ("HU", "hung_up"),
    ("WASTE", "waste"),
    ("DUPE", "dupe"),
    ("IN", "invalid_number"),
    ("OP", "op"),
    ("FU", "follow_up"),
    ("TMW", "too_much_work"),
    ("DNC", "do_not_call"),
];

/// Properties the value transforms apply to.
const OUTCOME_PROPERTY: &str = "last_sales_call_outcome";
const DATE_PROPERTY: &str = "last_sales_outreach_date";

/// Maps one raw row to a property set.
///
/// Pure: no side effects, identical output for identical input. Columns map
/// through [`COLUMN_MAP`]; on duplicate targets the last column wins; empty
/// values are omitted entirely (never set to an empty string).
pub fn map_row(row: &RawRow) -> PropertySet {
    let mut properties = PropertySet::new();

    for (label, value) in &row.columns {
        if value.is_empty() {
            continue;
        }
        let key = label.trim().to_lowercase();
        if let Some((_, target)) = COLUMN_MAP.iter().find(|(name, _)| *name == key) {
            if let Some(target) = target {
                properties.insert(target.to_string(), value.clone());
            }
        }
    }

    apply_transforms(&mut properties);
    properties
}

/// Applies the value transforms to mapped properties in place.
fn apply_transforms(properties: &mut PropertySet) {
    if let Some(value) = properties.get(OUTCOME_PROPERTY) {
        let normalized = normalize_call_outcome(value);
        properties.insert(OUTCOME_PROPERTY.to_string(), normalized);
    }
    if let Some(value) = properties.get(DATE_PROPERTY) {
        let normalized = date_to_midnight_utc_ms(value);
        properties.insert(DATE_PROPERTY.to_string(), normalized);
    }
}

/// Expands a shorthand call-outcome code.
///
/// Codes beginning with `OP` normalize to the literal `op`; recognized codes
/// map through the table; anything else passes through unchanged.
fn normalize_call_outcome(value: &str) -> String {
    let upper = value.to_uppercase().trim().to_string();
    if upper.starts_with("OP") {
        return "op".to_string();
    }
    for (code, expanded) in CALL_OUTCOME_CODES {
        if *code == upper {
            return (*expanded).to_string();
        }
    }
    value.to_string()
}

/// Normalizes a date-like value to the string form of epoch milliseconds at
/// UTC midnight.
///
/// Parsing order: 10–13-digit numeric timestamps (seconds vs. milliseconds
/// by magnitude), day-first `D/M/YYYY` and ISO `YYYY/M/D` after separator
/// normalization (`.`, `-`, space → `/`; two-digit years read as `20YY`),
/// then a generic fallback. Anything unparseable is returned unchanged.
pub fn date_to_midnight_utc_ms(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return value.to_string();
    }
    // Strip trailing dots/spaces left by sloppy data entry.
    let cleaned = trimmed.trim_end_matches(['.', ' ']);

    // Already a seconds or milliseconds timestamp.
    if (10..=13).contains(&cleaned.len()) && cleaned.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(ts) = cleaned.parse::<i64>() {
            let ms = if ts > 9_999_999_999 { ts } else { ts * 1000 };
            if let Some(midnight) = truncate_to_utc_midnight(ms) {
                return midnight.to_string();
            }
        }
    }

    // Uniform separators so dotted and dashed dates parse the same way.
    let normalized: String = cleaned
        .split(['.', '-', ' '])
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("/");

    if let Some(ms) = parse_slash_date(&normalized) {
        return ms.to_string();
    }

    if let Some(ms) = parse_generic_date(cleaned) {
        return ms.to_string();
    }

    value.to_string()
}

/// Parses `D/M/YYYY` (day-first) or `YYYY/M/D` dates.
fn parse_slash_date(normalized: &str) -> Option<i64> {
    let parts: Vec<&str> = normalized.split('/').collect();
    if parts.len() != 3 || !parts.iter().all(|p| p.bytes().all(|b| b.is_ascii_digit())) {
        return None;
    }

    let lens = (parts[0].len(), parts[1].len(), parts[2].len());

    // Day-first: D/M/YYYY with a 2-4 digit year.
    if (1..=2).contains(&lens.0) && (1..=2).contains(&lens.1) && (2..=4).contains(&lens.2) {
        let day: u32 = parts[0].parse().ok()?;
        let month: u32 = parts[1].parse().ok()?;
        let mut year: i32 = parts[2].parse().ok()?;
        if year < 100 {
            year += 2000;
        }
        if let Some(ms) = ymd_midnight_ms(year, month, day) {
            return Some(ms);
        }
    }

    // ISO-like: YYYY/M/D.
    if lens.0 == 4 && lens.1 <= 2 && lens.2 <= 2 {
        let year: i32 = parts[0].parse().ok()?;
        let month: u32 = parts[1].parse().ok()?;
        let day: u32 = parts[2].parse().ok()?;
        if let Some(ms) = ymd_midnight_ms(year, month, day) {
            return Some(ms);
        }
    }

    None
}

/// Last-resort parsing for formats the slash paths do not cover.
fn parse_generic_date(cleaned: &str) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(cleaned) {
        return truncate_to_utc_midnight(dt.timestamp_millis());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(cleaned) {
        return truncate_to_utc_midnight(dt.timestamp_millis());
    }
    for format in ["%B %e, %Y", "%b %e, %Y", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(date) = NaiveDate::parse_from_str(cleaned, format) {
            return date
                .and_hms_opt(0, 0, 0)
                .map(|dt| dt.and_utc().timestamp_millis());
        }
    }
    None
}

/// Epoch milliseconds for midnight UTC on the given calendar date.
fn ymd_midnight_ms(year: i32, month: u32, day: u32) -> Option<i64> {
    NaiveDate::from_ymd_opt(year, month, day)?
        .and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp_millis())
}

/// Truncates an epoch-millisecond instant to midnight UTC of its day.
fn truncate_to_utc_midnight(ms: i64) -> Option<i64> {
    DateTime::from_timestamp_millis(ms)?
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp_millis())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
