//! Output files. Every file is written to a temp file in the destination
//! directory and atomically persisted, so a failed run never leaves a
//! half-written submission behind.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::errors::PipelineError;
use crate::ingest::quality::{DataQualityReport, Source};
use crate::models::client::ClientId;
use crate::notification::generator::Notification;
use crate::report::metrics::{PushStat, QualitySummary};

pub const SUBMISSION_FILE: &str = "submission.csv";
pub const EXCLUDED_FILE: &str = "excluded.csv";
pub const PUSH_STATS_FILE: &str = "push_stats.csv";
pub const QUALITY_SUMMARY_FILE: &str = "push_quality_summary.json";
pub const DATE_COVERAGE_FILE: &str = "date_coverage.csv";

#[derive(Debug, Serialize)]
struct SubmissionRow<'a> {
    client_code: &'a str,
    push_notification: &'a str,
}

#[derive(Debug, Serialize)]
struct DateCoverageRow {
    table: Source,
    total: usize,
    ok: usize,
    coverage: f64,
}

/// A client left out of the submission by the exclusion policy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExcludedClient {
    pub client_code: ClientId,
    pub reason: String,
}

fn write_error(path: &Path, message: impl ToString) -> PipelineError {
    PipelineError::Write {
        path: path.to_path_buf(),
        message: message.to_string(),
    }
}

/// Writes via `fill` into a temp file next to `path`, then renames it into place.
fn write_atomic<F>(path: &Path, fill: F) -> Result<(), PipelineError>
where
    F: FnOnce(&mut dyn Write) -> Result<(), String>,
{
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir).map_err(|e| write_error(dir, e))?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".pushgen-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| write_error(path, e))?;

    fill(&mut tmp).map_err(|e| write_error(path, e))?;
    tmp.flush().map_err(|e| write_error(path, e))?;
    tmp.persist(path).map_err(|e| write_error(path, e.error))?;
    Ok(())
}

fn write_csv<T: Serialize>(path: &Path, rows: &[T], headers: &[&str]) -> Result<(), PipelineError> {
    write_atomic(path, |out| {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(out);
        writer.write_record(headers).map_err(|e| e.to_string())?;
        for row in rows {
            writer.serialize(row).map_err(|e| e.to_string())?;
        }
        writer.flush().map_err(|e| e.to_string())
    })
}

/// `submission.csv`, sorted by natural client-id order.
pub fn write_submission(out_dir: &Path, notifications: &[Notification]) -> Result<PathBuf, PipelineError> {
    let mut sorted: Vec<&Notification> = notifications.iter().collect();
    sorted.sort_by(|a, b| a.client_id.cmp(&b.client_id));

    let rows: Vec<SubmissionRow> = sorted
        .iter()
        .map(|n| SubmissionRow {
            client_code: n.client_id.as_str(),
            push_notification: &n.text,
        })
        .collect();

    let path = out_dir.join(SUBMISSION_FILE);
    write_csv(&path, &rows, &["client_code", "push_notification"])?;
    info!("Wrote {} rows to {}", rows.len(), path.display());
    Ok(path)
}

/// `excluded.csv`; skipped when nobody was excluded.
pub fn write_excluded(out_dir: &Path, excluded: &[ExcludedClient]) -> Result<Option<PathBuf>, PipelineError> {
    if excluded.is_empty() {
        return Ok(None);
    }
    let mut sorted = excluded.to_vec();
    sorted.sort_by(|a, b| a.client_code.cmp(&b.client_code));

    let path = out_dir.join(EXCLUDED_FILE);
    write_csv(&path, &sorted, &["client_code", "reason"])?;
    info!("Wrote {} excluded clients to {}", sorted.len(), path.display());
    Ok(Some(path))
}

pub fn write_push_stats(out_dir: &Path, stats: &[PushStat]) -> Result<PathBuf, PipelineError> {
    let mut sorted = stats.to_vec();
    sorted.sort_by_key(|s| ClientId::parse(&s.client_code));

    let path = out_dir.join(PUSH_STATS_FILE);
    write_csv(
        &path,
        &sorted,
        &[
            "client_code",
            "product",
            "source",
            "length",
            "has_cta",
            "in_target_range",
            "cta_text",
        ],
    )?;
    Ok(path)
}

/// `date_coverage.csv`: parseable-date share per activity table.
pub fn write_date_coverage(out_dir: &Path, quality: &DataQualityReport) -> Result<PathBuf, PipelineError> {
    let rows: Vec<DateCoverageRow> = [Source::Transactions, Source::Transfers]
        .into_iter()
        .map(|table| {
            let cov = quality.date_coverage(table).unwrap_or_default();
            DateCoverageRow {
                table,
                total: cov.total,
                ok: cov.ok,
                coverage: cov.ratio(),
            }
        })
        .collect();

    let path = out_dir.join(DATE_COVERAGE_FILE);
    write_csv(&path, &rows, &["table", "total", "ok", "coverage"])?;
    Ok(path)
}

pub fn write_quality_summary(out_dir: &Path, summary: &QualitySummary) -> Result<PathBuf, PipelineError> {
    let path = out_dir.join(QUALITY_SUMMARY_FILE);
    write_atomic(&path, |out| {
        serde_json::to_writer_pretty(&mut *out, summary).map_err(|e| e.to_string())?;
        out.write_all(b"\n").map_err(|e| e.to_string())
    })?;
    Ok(path)
}
