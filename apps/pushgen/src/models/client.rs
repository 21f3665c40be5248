use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque client identifier as it appears in the source files (`17`, `C1`).
///
/// Ordering is natural: two numeric ids compare by value, numeric ids sort
/// before non-numeric ones, everything else compares as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(String);

impl ClientId {
    /// Normalizes a raw cell. Returns `None` for blank cells.
    /// Numeric ids written as floats by spreadsheet exports (`17.0`) collapse to `17`.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
            return None;
        }
        if let Some(int_part) = trimmed.strip_suffix(".0") {
            if !int_part.is_empty() && int_part.chars().all(|c| c.is_ascii_digit()) {
                return Some(Self(int_part.to_string()));
            }
        }
        Some(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn numeric(&self) -> Option<u64> {
        self.0.parse().ok()
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Ord for ClientId {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.numeric(), other.numeric()) {
            (Some(a), Some(b)) => a.cmp(&b).then_with(|| self.0.cmp(&other.0)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for ClientId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Coarse client status. Drives tone-of-voice selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientStatus {
    Student,
    Salary,
    Premium,
    #[default]
    Standard,
}

impl ClientStatus {
    /// Maps free-form status/segment text onto a status bucket.
    pub fn from_raw(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::Standard;
        };
        let s = raw.trim().to_lowercase();
        if s.contains("студент") || s.contains("student") {
            Self::Student
        } else if s.contains("зарплат") || s.contains("salary") {
            Self::Salary
        } else if s.contains("преми") || s.contains("premium") {
            Self::Premium
        } else {
            Self::Standard
        }
    }
}

/// One row of the clients source. Immutable for the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub name: Option<String>,
    /// Raw status/segment text as given (`Студент`, `retail`, ...).
    pub segment: Option<String>,
    pub status: ClientStatus,
    pub age: Option<u32>,
    pub city: Option<String>,
    pub avg_monthly_balance: f64,
}
