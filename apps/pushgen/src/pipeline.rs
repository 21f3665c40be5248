//! Batch pipeline: Loader → Aggregator → Scorer → Selector → Generator → Writer.
//!
//! Clients are processed one by one in source order. Nothing is written until
//! every client has an outcome, so fatal errors leave the output directory
//! untouched.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::errors::PipelineError;
use crate::features::aggregator::aggregate;
use crate::ingest::quality::Source;
use crate::ingest::{load_dataset, Dataset};
use crate::notification::facts::MessageFacts;
use crate::notification::generator::{Notification, NotificationGenerator, Outcome};
use crate::report::metrics::{push_stats, summarize};
use crate::report::summary::{GenerationCounts, RunSummary};
use crate::report::writer::{
    write_date_coverage, write_excluded, write_push_stats, write_quality_summary, write_submission,
    ExcludedClient,
};
use crate::scoring::scorer::BenefitScorer;
use crate::scoring::selector::select;

pub struct Pipeline {
    scorer: Arc<dyn BenefitScorer>,
    generator: NotificationGenerator,
    max_chars: usize,
}

impl Pipeline {
    pub fn new(scorer: Arc<dyn BenefitScorer>, generator: NotificationGenerator, max_chars: usize) -> Self {
        Self {
            scorer,
            generator,
            max_chars,
        }
    }

    pub async fn run(&self, data_dir: &Path, out_dir: &Path) -> Result<RunSummary, PipelineError> {
        let Dataset {
            clients,
            transactions,
            transfers,
            mut quality,
        } = load_dataset(data_dir)?;

        let aggregation = aggregate(&clients, &transactions, &transfers);
        quality.record_orphans(Source::Transactions, aggregation.orphan_transactions);
        quality.record_orphans(Source::Transfers, aggregation.orphan_transfers);
        quality.record_idle_clients(aggregation.idle_clients);

        info!(
            "Generating notifications for {} clients with the {} backend",
            clients.len(),
            self.generator.backend_name()
        );

        let mut notifications: Vec<Notification> = Vec::with_capacity(clients.len());
        let mut excluded: Vec<ExcludedClient> = Vec::new();
        let mut counts = GenerationCounts::default();

        for (client, profile) in clients.iter().zip(&aggregation.profiles) {
            let Some(selected) = select(self.scorer.score(profile)) else {
                excluded.push(ExcludedClient {
                    client_code: client.id.clone(),
                    reason: "no products scored".to_string(),
                });
                counts.excluded += 1;
                continue;
            };

            debug!(
                client = %client.id,
                product = selected.product().id(),
                "Selected {}",
                selected.explain()
            );

            let facts = MessageFacts::build(client, profile, &selected);
            let outcome = self
                .generator
                .notify(&facts)
                .await
                .map_err(|source| PipelineError::Generation {
                    client_id: client.id.to_string(),
                    source,
                })?;

            match outcome {
                Outcome::Delivered(notification) => {
                    counts.record(notification.source);
                    notifications.push(notification);
                }
                Outcome::Excluded {
                    client_id, reason, ..
                } => {
                    counts.excluded += 1;
                    excluded.push(ExcludedClient {
                        client_code: client_id,
                        reason,
                    });
                }
            }
        }

        debug_assert_eq!(notifications.len() + excluded.len(), clients.len());
        info!(
            "Processed {} clients: {} generated, {} template, {} fallback, {} excluded",
            counts.total(),
            counts.generated,
            counts.template,
            counts.fallback,
            counts.excluded
        );

        let stats = push_stats(&notifications, self.max_chars);
        let push_quality = summarize(&stats);

        let mut outputs: Vec<PathBuf> = vec![write_submission(out_dir, &notifications)?];
        outputs.extend(write_excluded(out_dir, &excluded)?);
        outputs.push(write_push_stats(out_dir, &stats)?);
        outputs.push(write_date_coverage(out_dir, &quality)?);
        outputs.push(write_quality_summary(out_dir, &push_quality)?);

        Ok(RunSummary {
            backend: self.generator.backend_name().to_string(),
            clients: clients.len(),
            counts,
            quality,
            push_quality,
            outputs,
        })
    }
}
