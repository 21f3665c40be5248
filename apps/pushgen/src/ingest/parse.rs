//! Cell-level parsing for amounts, dates and identifiers.

use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;

use crate::ingest::quality::WarningKind;

/// A row that failed schema validation. Recovered locally by exclusion.
#[derive(Debug, Clone, Error)]
#[error("{kind}: {detail}")]
pub struct MalformedRow {
    pub kind: WarningKind,
    pub detail: String,
}

impl MalformedRow {
    pub fn new(kind: WarningKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d.%m.%Y", "%d/%m/%Y"];

/// Parses a money cell the way bank exports write them:
/// `"12 345,50"`, `"12\u{a0}345.50 ₸"`, `"KZT -300"`.
///
/// Whitespace is removed and `,` becomes `.`. A currency label before or after
/// the number is dropped; any other character inside the number is an error.
pub fn parse_amount(raw: &str) -> Result<f64, MalformedRow> {
    let is_numeric = |c: char| c.is_ascii_digit() || c == '.' || c == '-';
    let compact: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    let cleaned = compact.trim_matches(|c: char| !is_numeric(c));

    if cleaned.is_empty() || !cleaned.chars().all(is_numeric) {
        return Err(MalformedRow::new(
            WarningKind::InvalidAmount,
            format!("'{}' is not a number", raw.trim()),
        ));
    }

    match cleaned.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(MalformedRow::new(
            WarningKind::InvalidAmount,
            format!("'{}' is not a number", raw.trim()),
        )),
    }
}

/// Parses ISO and day-first date cells, with or without a time part.
/// Fractional seconds and a trailing `Z` are tolerated.
pub fn parse_date(raw: &str) -> Result<NaiveDateTime, MalformedRow> {
    let s = raw.trim().trim_end_matches('Z');
    let s = s.split_once('.').map_or(s, |(head, tail)| {
        // fractional seconds only; day-first dates contain dots too
        if head.len() >= 19 && tail.chars().all(|c| c.is_ascii_digit()) {
            head
        } else {
            s
        }
    });

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            if let Some(dt) = d.and_hms_opt(0, 0, 0) {
                return Ok(dt);
            }
        }
    }

    Err(MalformedRow::new(
        WarningKind::InvalidDate,
        format!("'{}' is not a recognised date", raw.trim()),
    ))
}

/// Parses an optional whole number, tolerating float exports (`"34.0"`).
pub fn parse_count(raw: &str) -> Option<u32> {
    let s = raw.trim();
    let s = s.strip_suffix(".0").unwrap_or(s);
    s.parse().ok()
}

/// Returns the trimmed cell, or `None` if it is blank.
pub fn non_blank(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("nan"))
        .map(str::to_string)
}
