// src/pipeline/crawl.rs

//! Listing crawl pipeline.

use std::sync::Arc;

use chrono::Utc;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::models::{CandidateId, Config, DropReason, RunSummary};
use crate::services::{Harvest, ListingHarvester, Transport};
use crate::storage::{ListingSink, LocalStorage};

/// Runs a full-refresh crawl of a set of ids into a sink.
pub struct CrawlOrchestrator {
    harvester: ListingHarvester,
}

impl CrawlOrchestrator {
    pub fn new(harvester: ListingHarvester) -> Self {
        Self { harvester }
    }

    /// Crawl `ids` into `sink`.
    ///
    /// The sink is reset before the first fetch and committed after the last
    /// result; failures of either are returned. Per-listing failures are
    /// counted in the summary only.
    pub async fn run(
        &self,
        mut ids: Vec<CandidateId>,
        sink: &dyn ListingSink,
    ) -> Result<RunSummary> {
        ids.sort_unstable();
        ids.dedup();
        let total = ids.len();

        sink.reset().await?;
        log::info!(
            "Crawling {} listings ({} in flight)",
            total,
            self.harvester.max_concurrent()
        );

        let mut summary = RunSummary::default();
        let mut results = std::pin::pin!(self.harvester.harvest(ids));
        while let Some((id, harvest)) = results.next().await {
            match harvest {
                Harvest::Listing(record) => match sink.write(&record).await {
                    Ok(()) => summary.succeeded += 1,
                    Err(e) => {
                        log::warn!("Listing {} not stored: {}", id, e);
                        summary.record_drop(DropReason::WriteFailed);
                    }
                },
                Harvest::Dropped(reason) => {
                    log::debug!("Listing {} dropped: {}", id, reason);
                    summary.record_drop(reason);
                }
            }
        }

        summary.not_admitted = total - summary.processed();
        if summary.not_admitted > 0 {
            log::warn!(
                "Crawl cancelled, {} listings never fetched",
                summary.not_admitted
            );
        }

        sink.commit().await?;
        Ok(summary)
    }
}

/// Run the listing crawler.
///
/// Crawls `ids`, or the saved id list when `None`, into the storage's
/// listings artifact.
pub async fn run_crawl(
    config: &Config,
    storage: &LocalStorage,
    transport: Arc<dyn Transport>,
    cancel: CancellationToken,
    ids: Option<Vec<CandidateId>>,
) -> Result<RunSummary> {
    let start_time = Utc::now();

    let ids = match ids {
        Some(ids) => ids,
        None => storage.load_ids().await?,
    };
    log::info!("Loaded {} ids", ids.len());

    let harvester = ListingHarvester::from_config(config, transport)?
        .with_failure_delay(config.crawler.failure_delay())
        .with_cancellation(cancel);
    let summary = CrawlOrchestrator::new(harvester).run(ids, storage).await?;

    log::info!(
        "Crawl finished in {}s: {}",
        (Utc::now() - start_time).num_seconds(),
        summary
    );
    Ok(summary)
}
