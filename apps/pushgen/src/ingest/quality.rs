//! Data-quality accounting for the ingest and aggregation stages.
//!
//! Malformed rows are never fatal: each one is excluded and recorded here so the
//! end-of-run summary can report what was dropped and why.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use tracing::{debug, warn};

use crate::ingest::parse::MalformedRow;

/// Number of individual row warnings surfaced at `warn` level before the rest
/// are only counted.
const WARN_SAMPLE_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Clients,
    Transactions,
    Transfers,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Source::Clients => "clients",
            Source::Transactions => "transactions",
            Source::Transfers => "transfers",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    MissingClientId,
    InvalidAmount,
    InvalidDate,
    InvalidDirection,
    MissingField,
    DuplicateClient,
    /// Row references a client that is not in the clients source.
    OrphanRow,
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WarningKind::MissingClientId => "missing client id",
            WarningKind::InvalidAmount => "invalid amount",
            WarningKind::InvalidDate => "invalid date",
            WarningKind::InvalidDirection => "invalid direction",
            WarningKind::MissingField => "missing field",
            WarningKind::DuplicateClient => "duplicate client",
            WarningKind::OrphanRow => "unknown client",
        })
    }
}

/// Share of rows in a source that carried a parseable date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DateCoverage {
    pub total: usize,
    pub ok: usize,
}

impl DateCoverage {
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.ok as f64 / self.total as f64
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct DataQualityReport {
    counts: BTreeMap<(Source, WarningKind), usize>,
    date_coverage: BTreeMap<Source, DateCoverage>,
    /// Clients with no usable activity; resolved with zero-filled aggregates.
    idle_clients: usize,
}

impl DataQualityReport {
    /// Records an excluded row. `line` is the 1-based line in the source file.
    pub fn record(&mut self, source: Source, line: u64, row: &MalformedRow) {
        let count = self.counts.entry((source, row.kind)).or_insert(0);
        *count += 1;

        if self.total() <= WARN_SAMPLE_LIMIT {
            warn!("{source} line {line}: {row}, row excluded");
        } else {
            debug!("{source} line {line}: {row}, row excluded");
        }
    }

    pub fn record_orphans(&mut self, source: Source, count: usize) {
        if count == 0 {
            return;
        }
        warn!("{source}: {count} rows reference unknown clients, excluded");
        *self.counts.entry((source, WarningKind::OrphanRow)).or_insert(0) += count;
    }

    pub fn record_date_coverage(&mut self, source: Source, coverage: DateCoverage) {
        self.date_coverage.insert(source, coverage);
    }

    pub fn record_idle_clients(&mut self, count: usize) {
        self.idle_clients += count;
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    #[cfg(test)]
    pub fn count(&self, source: Source, kind: WarningKind) -> usize {
        self.counts.get(&(source, kind)).copied().unwrap_or(0)
    }

    pub fn idle_clients(&self) -> usize {
        self.idle_clients
    }

    pub fn date_coverage(&self, source: Source) -> Option<DateCoverage> {
        self.date_coverage.get(&source).copied()
    }

    /// Iterates `(source, kind, count)` in a stable order.
    pub fn breakdown(&self) -> impl Iterator<Item = (Source, WarningKind, usize)> + '_ {
        self.counts.iter().map(|(&(s, k), &n)| (s, k, n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn malformed(kind: WarningKind) -> MalformedRow {
        MalformedRow {
            kind,
            detail: "test".to_string(),
        }
    }

    #[test]
    fn test_counts_accumulate_per_source_and_kind() {
        let mut report = DataQualityReport::default();
        report.record(Source::Transactions, 2, &malformed(WarningKind::InvalidAmount));
        report.record(Source::Transactions, 3, &malformed(WarningKind::InvalidAmount));
        report.record(Source::Transfers, 2, &malformed(WarningKind::InvalidAmount));
        report.record_orphans(Source::Transfers, 4);

        assert_eq!(report.count(Source::Transactions, WarningKind::InvalidAmount), 2);
        assert_eq!(report.count(Source::Transfers, WarningKind::InvalidAmount), 1);
        assert_eq!(report.count(Source::Transfers, WarningKind::OrphanRow), 4);
        assert_eq!(report.total(), 7);
    }

    #[test]
    fn test_zero_orphans_not_recorded() {
        let mut report = DataQualityReport::default();
        report.record_orphans(Source::Transactions, 0);
        assert_eq!(report.breakdown().count(), 0);
    }

    #[test]
    fn test_date_coverage_ratio() {
        assert_eq!(DateCoverage::default().ratio(), 0.0);
        let c = DateCoverage { total: 4, ok: 3 };
        assert!((c.ratio() - 0.75).abs() < f64::EPSILON);
    }
}
