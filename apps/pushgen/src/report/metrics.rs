//! Push quality metrics: per-message features and an aggregate summary.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::notification::generator::{Notification, NotificationSource};
use crate::notification::postprocess::{char_len, find_cta, TARGET_MIN_CHARS};

const TOP_CTA: usize = 5;

/// One row of `push_stats.csv`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PushStat {
    pub client_code: String,
    pub product: &'static str,
    pub source: NotificationSource,
    pub length: usize,
    pub has_cta: bool,
    pub in_target_range: bool,
    pub cta_text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CtaCount {
    pub cta: String,
    pub count: usize,
}

/// Contents of `push_quality_summary.json`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualitySummary {
    pub count: usize,
    pub avg_length: f64,
    pub pct_in_range: f64,
    pub pct_has_cta: f64,
    /// Distinct CTAs / messages with a CTA.
    pub unique_cta_ratio: f64,
    pub top_cta: Vec<CtaCount>,
}

pub fn push_stats(notifications: &[Notification], max_chars: usize) -> Vec<PushStat> {
    notifications
        .iter()
        .map(|n| {
            let length = char_len(&n.text);
            let cta = find_cta(&n.text);
            PushStat {
                client_code: n.client_id.to_string(),
                product: n.product.id(),
                source: n.source,
                length,
                has_cta: cta.is_some(),
                in_target_range: (TARGET_MIN_CHARS..=max_chars).contains(&length),
                cta_text: cta.map(|c| c.phrase.to_string()).unwrap_or_default(),
            }
        })
        .collect()
}

pub fn summarize(stats: &[PushStat]) -> QualitySummary {
    let n = stats.len();
    if n == 0 {
        return QualitySummary {
            count: 0,
            avg_length: 0.0,
            pct_in_range: 0.0,
            pct_has_cta: 0.0,
            unique_cta_ratio: 0.0,
            top_cta: Vec::new(),
        };
    }

    let share = |hits: usize| hits as f64 / n as f64;
    let mut cta_counts: BTreeMap<&str, usize> = BTreeMap::new();
    for s in stats.iter().filter(|s| !s.cta_text.is_empty()) {
        *cta_counts.entry(&s.cta_text).or_insert(0) += 1;
    }
    let total_cta: usize = cta_counts.values().sum();
    let distinct: BTreeSet<&str> = cta_counts.keys().copied().collect();

    let mut top: Vec<CtaCount> = cta_counts
        .iter()
        .map(|(&cta, &count)| CtaCount {
            cta: cta.to_string(),
            count,
        })
        .collect();
    // BTreeMap order is alphabetical, so a stable sort keeps ties alphabetical
    top.sort_by(|a, b| b.count.cmp(&a.count));
    top.truncate(TOP_CTA);

    QualitySummary {
        count: n,
        avg_length: stats.iter().map(|s| s.length as f64).sum::<f64>() / n as f64,
        pct_in_range: share(stats.iter().filter(|s| s.in_target_range).count()),
        pct_has_cta: share(stats.iter().filter(|s| s.has_cta).count()),
        unique_cta_ratio: if total_cta == 0 {
            0.0
        } else {
            distinct.len() as f64 / total_cta as f64
        },
        top_cta: top,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::client::ClientId;
    use crate::scoring::catalog::Product;

    fn note(id: &str, text: &str) -> Notification {
        Notification {
            client_id: ClientId::parse(id).unwrap(),
            product: Product::TravelCard,
            text: text.to_string(),
            source: NotificationSource::Generated,
        }
    }

    #[test]
    fn test_push_stats_features() {
        let long = format!("{} Оформить карту.", "а".repeat(185));
        let stats = push_stats(&[note("1", &long), note("2", "Без призыва.")], 220);

        assert!(stats[0].has_cta);
        assert!(stats[0].in_target_range);
        assert_eq!(stats[0].cta_text, "Оформить карту");
        assert_eq!(stats[0].product, "travel_card");

        assert!(!stats[1].has_cta);
        assert!(!stats[1].in_target_range);
        assert_eq!(stats[1].cta_text, "");
        assert_eq!(stats[1].length, 12);
    }

    #[test]
    fn test_summary() {
        let stats = push_stats(
            &[
                note("1", "Текст. Оформить карту."),
                note("2", "Текст. Оформить карту."),
                note("3", "Текст. Узнать лимит."),
                note("4", "Текст."),
            ],
            220,
        );
        let summary = summarize(&stats);
        assert_eq!(summary.count, 4);
        assert_eq!(summary.pct_has_cta, 0.75);
        assert!((summary.unique_cta_ratio - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(summary.top_cta[0].cta, "Оформить карту");
        assert_eq!(summary.top_cta[0].count, 2);
        assert_eq!(summary.top_cta.len(), 2);
    }

    #[test]
    fn test_summary_empty() {
        let summary = summarize(&[]);
        assert_eq!(summary.count, 0);
        assert!(summary.top_cta.is_empty());
    }
}
