//! Discovery of live listing identifiers.

use futures::StreamExt;

use crate::models::{CandidateId, RunSummary};
use crate::services::harvest::{Harvest, ListingHarvester};

const PROGRESS_EVERY: usize = 1000;

/// Identifiers confirmed by a probe run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeReport {
    /// Ascending, without duplicates
    pub valid: Vec<CandidateId>,
    pub summary: RunSummary,
}

/// Probes a candidate space through the crawl's own harvester.
///
/// A candidate is valid only when its page is fetched and a record can be
/// extracted from it.
pub struct IdentifierProber {
    harvester: ListingHarvester,
}

impl IdentifierProber {
    pub fn new(harvester: ListingHarvester) -> Self {
        Self { harvester }
    }

    pub async fn probe(&self, candidates: impl IntoIterator<Item = CandidateId>) -> ProbeReport {
        let candidates: Vec<CandidateId> = candidates.into_iter().collect();
        let total = candidates.len();
        log::info!(
            "Probing {} candidates ({} in flight)",
            total,
            self.harvester.max_concurrent()
        );

        let mut report = ProbeReport::default();
        let mut results = std::pin::pin!(self.harvester.harvest(candidates));
        while let Some((id, harvest)) = results.next().await {
            match harvest {
                Harvest::Listing(_) => {
                    report.summary.succeeded += 1;
                    report.valid.push(id);
                }
                Harvest::Dropped(reason) => report.summary.record_drop(reason),
            }

            let done = report.summary.processed();
            if done % PROGRESS_EVERY == 0 {
                log::info!(
                    "Probed {}/{} candidates, {} valid so far",
                    done,
                    total,
                    report.valid.len()
                );
            }
        }

        report.summary.not_admitted = total - report.summary.processed();
        report.valid.sort_unstable();
        report.valid.dedup();

        log::info!("Probe finished: {}", report.summary);
        report
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::services::testing::{MockTransport, Reply, test_harvester};

    #[tokio::test(start_paused = true)]
    async fn test_only_extractable_pages_are_valid() {
        let transport = Arc::new(MockTransport::new(|id, _| match id % 4 {
            0 => Reply::page(200, "<h1>Олимпиада</h1>"),
            1 => Reply::page(404, ""),
            2 => Reply::page(200, "<div>no heading</div>"),
            _ => Reply::Fail,
        }));
        let prober = IdentifierProber::new(test_harvester(transport, 8));

        let report = prober.probe(0..20).await;

        assert_eq!(report.valid, [0, 4, 8, 12, 16]);
        assert_eq!(report.summary.succeeded, 5);
        assert_eq!(report.summary.not_found, 5);
        assert_eq!(report.summary.unparseable, 5);
        assert_eq!(report.summary.exhausted, 5);
        assert_eq!(report.summary.not_admitted, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_valid_ids_sorted_and_unique() {
        let transport = Arc::new(
            MockTransport::new(|_, _| Reply::page(200, "<h1>t</h1>"))
                .with_latency(std::time::Duration::from_millis(10)),
        );
        let prober = IdentifierProber::new(test_harvester(transport, 10));

        let report = prober.probe(vec![9, 3, 7, 3, 1]).await;

        assert_eq!(report.valid, [1, 3, 7, 9]);
        assert_eq!(report.summary.succeeded, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_candidate_space() {
        let transport = Arc::new(MockTransport::new(|_, _| Reply::page(200, "<h1>t</h1>")));
        let prober = IdentifierProber::new(test_harvester(transport.clone(), 2));

        let report = prober.probe(std::iter::empty()).await;

        assert!(report.valid.is_empty());
        assert_eq!(transport.call_count(), 0);
    }
}
