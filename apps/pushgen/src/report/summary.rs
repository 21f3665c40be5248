//! Human-readable run summary printed after a completed run.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::ingest::quality::{DataQualityReport, Source};
use crate::notification::generator::NotificationSource;
use crate::report::metrics::QualitySummary;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GenerationCounts {
    pub generated: usize,
    pub template: usize,
    pub fallback: usize,
    pub excluded: usize,
}

impl GenerationCounts {
    pub fn record(&mut self, source: NotificationSource) {
        match source {
            NotificationSource::Generated => self.generated += 1,
            NotificationSource::Template => self.template += 1,
            NotificationSource::Fallback => self.fallback += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.generated + self.template + self.fallback + self.excluded
    }
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub backend: String,
    pub clients: usize,
    pub counts: GenerationCounts,
    pub quality: DataQualityReport,
    pub push_quality: QualitySummary,
    pub outputs: Vec<PathBuf>,
}

fn pct(ratio: f64) -> String {
    format!("{:.1}%", ratio * 100.0)
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = &self.counts;
        writeln!(f, "pushgen run summary (backend: {})", self.backend)?;
        writeln!(f, "  clients:        {}", self.clients)?;
        writeln!(
            f,
            "  notifications:  generated {}, template {}, fallback {}, excluded {}",
            c.generated, c.template, c.fallback, c.excluded
        )?;

        writeln!(f, "  data quality:   {} warnings", self.quality.total())?;
        for (source, kind, count) in self.quality.breakdown() {
            writeln!(f, "    {source} / {kind}: {count}")?;
        }
        if self.quality.idle_clients() > 0 {
            writeln!(
                f,
                "  idle clients:   {} (zero-filled aggregates)",
                self.quality.idle_clients()
            )?;
        }

        let coverage: Vec<String> = [Source::Transactions, Source::Transfers]
            .into_iter()
            .filter_map(|s| {
                self.quality
                    .date_coverage(s)
                    .map(|cov| format!("{s} {}/{} ({})", cov.ok, cov.total, pct(cov.ratio())))
            })
            .collect();
        if !coverage.is_empty() {
            writeln!(f, "  date coverage:  {}", coverage.join(", "))?;
        }

        let q = &self.push_quality;
        writeln!(
            f,
            "  push quality:   avg length {:.1}, in target range {}, with CTA {}, CTA uniqueness {}",
            q.avg_length,
            pct(q.pct_in_range),
            pct(q.pct_has_cta),
            pct(q.unique_cta_ratio)
        )?;
        if !q.top_cta.is_empty() {
            let top: Vec<String> = q
                .top_cta
                .iter()
                .map(|t| format!("{}: {}", t.cta, t.count))
                .collect();
            writeln!(f, "  top CTA:        {}", top.join(", "))?;
        }

        for path in &self.outputs {
            writeln!(f, "  wrote {}", path.display())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::quality::DateCoverage;
    use crate::report::metrics::summarize;

    #[test]
    fn test_counts() {
        let mut counts = GenerationCounts::default();
        counts.record(NotificationSource::Generated);
        counts.record(NotificationSource::Fallback);
        counts.excluded += 1;
        assert_eq!(counts.generated, 1);
        assert_eq!(counts.fallback, 1);
        assert_eq!(counts.total(), 3);
    }

    #[test]
    fn test_display_mentions_every_section() {
        let mut quality = DataQualityReport::default();
        quality.record_orphans(Source::Transfers, 2);
        quality.record_date_coverage(Source::Transactions, DateCoverage { total: 4, ok: 3 });
        quality.record_idle_clients(1);

        let summary = RunSummary {
            backend: "template".to_string(),
            clients: 5,
            counts: GenerationCounts {
                template: 5,
                ..GenerationCounts::default()
            },
            quality,
            push_quality: summarize(&[]),
            outputs: vec![PathBuf::from("output/submission.csv")],
        };
        let text = summary.to_string();
        assert!(text.contains("clients:        5"));
        assert!(text.contains("template 5"));
        assert!(text.contains("2 warnings"));
        assert!(text.contains("3/4 (75.0%)"));
        assert!(text.contains("idle clients:   1"));
        assert!(text.contains("output/submission.csv"));
    }
}
