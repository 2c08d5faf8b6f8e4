//! Bounded fetch + extract over a set of listing identifiers.
//!
//! Probing and crawling both go through [`ListingHarvester`], so they share
//! one retry policy and one admission limit. At most `max_concurrent`
//! identifiers are between admission and the end of extraction at any time.

use std::sync::Arc;
use std::time::Duration;

use futures::future;
use futures::stream::{self, Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::Result;
use crate::models::{CandidateId, Config, DropReason, FetchOutcome, ListingRecord, RawDocument};
use crate::services::extractor::ListingExtractor;
use crate::services::fetcher::{RetryPolicy, RetryingFetcher, Transport};
use crate::utils::listing_url;

/// Result of processing one identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Harvest {
    Listing(ListingRecord),
    Dropped(DropReason),
}

/// Fetches and extracts listings behind an admission gate.
pub struct ListingHarvester {
    fetcher: RetryingFetcher,
    extractor: ListingExtractor,
    base_url: Url,
    max_concurrent: usize,
    failure_delay: Duration,
    cancel: CancellationToken,
}

impl ListingHarvester {
    pub fn new(
        fetcher: RetryingFetcher,
        extractor: ListingExtractor,
        base_url: Url,
        max_concurrent: usize,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            base_url,
            max_concurrent: max_concurrent.max(1),
            failure_delay: Duration::ZERO,
            cancel: CancellationToken::new(),
        }
    }

    /// Build a harvester with the configured retry policy and admission limit.
    pub fn from_config(config: &Config, transport: Arc<dyn Transport>) -> Result<Self> {
        Ok(Self::new(
            RetryingFetcher::new(transport, RetryPolicy::from_config(&config.crawler)),
            ListingExtractor::from_config(config)?,
            config.crawler.listing_base()?,
            config.crawler.max_concurrent,
        ))
    }

    /// Keep the admission slot for `delay` after a failed fetch.
    pub fn with_failure_delay(mut self, delay: Duration) -> Self {
        self.failure_delay = delay;
        self
    }

    /// Stop admitting identifiers once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Fetch and extract a single listing.
    pub async fn harvest_one(&self, id: CandidateId) -> Harvest {
        let url = listing_url(&self.base_url, id);

        let reason = match self.fetcher.fetch(&url).await {
            FetchOutcome::Success(html) => {
                let document = RawDocument { id, html };
                return match self.extractor.extract(&document) {
                    Some(record) => Harvest::Listing(record),
                    None => Harvest::Dropped(DropReason::Unparseable),
                };
            }
            FetchOutcome::NotFound { status } => {
                log::debug!("Listing {} absent (HTTP {})", id, status);
                DropReason::NotFound
            }
            FetchOutcome::ExhaustedRetries { attempts } => {
                log::warn!("Listing {} dropped after {} attempts", id, attempts);
                DropReason::ExhaustedRetries
            }
            FetchOutcome::TransientFailure(cause) => {
                log::warn!("Listing {} dropped: {}", id, cause);
                DropReason::ExhaustedRetries
            }
        };

        if !self.failure_delay.is_zero() {
            tokio::time::sleep(self.failure_delay).await;
        }
        Harvest::Dropped(reason)
    }

    /// Harvest `ids` with at most `max_concurrent` in flight, yielding results
    /// in completion order.
    ///
    /// Identifiers not yet admitted when the cancellation token fires are
    /// never fetched; admitted ones run to completion.
    pub fn harvest<I>(&self, ids: I) -> impl Stream<Item = (CandidateId, Harvest)> + '_
    where
        I: IntoIterator<Item = CandidateId>,
        I::IntoIter: 'static,
    {
        let cancel = self.cancel.clone();
        stream::iter(ids)
            .take_while(move |_| future::ready(!cancel.is_cancelled()))
            .map(move |id| async move { (id, self.harvest_one(id).await) })
            .buffer_unordered(self.max_concurrent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{MockTransport, Reply, test_harvester as harvester};

    #[tokio::test(start_paused = true)]
    async fn test_harvest_one_outcomes() {
        let transport = Arc::new(MockTransport::new(|id, _| match id {
            1 => Reply::page(200, "<h1>Олимпиада</h1>"),
            2 => Reply::page(200, "<p>no title</p>"),
            3 => Reply::page(404, ""),
            _ => Reply::Fail,
        }));
        let harvester = harvester(transport.clone(), 4);

        match harvester.harvest_one(1).await {
            Harvest::Listing(record) => assert_eq!(record.id, 1),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(
            harvester.harvest_one(2).await,
            Harvest::Dropped(DropReason::Unparseable)
        );
        assert_eq!(
            harvester.harvest_one(3).await,
            Harvest::Dropped(DropReason::NotFound)
        );
        assert_eq!(
            harvester.harvest_one(4).await,
            Harvest::Dropped(DropReason::ExhaustedRetries)
        );
        assert_eq!(transport.calls_for(4), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_never_exceeds_limit() {
        let transport = Arc::new(
            MockTransport::new(|id, _| {
                if id % 3 == 0 {
                    Reply::page(404, "")
                } else {
                    Reply::page(200, "<h1>t</h1>")
                }
            })
            .with_latency(Duration::from_millis(50)),
        );
        let harvester = harvester(transport.clone(), 5);

        let results: Vec<_> = harvester.harvest(0..40).collect().await;

        assert_eq!(results.len(), 40);
        assert_eq!(transport.call_count(), 40);
        assert!(transport.peak_in_flight() <= 5);
        assert_eq!(transport.peak_in_flight(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_delay_holds_the_slot() {
        let transport = Arc::new(MockTransport::new(|_, _| Reply::page(404, "")));
        let harvester =
            harvester(transport.clone(), 1).with_failure_delay(Duration::from_secs(1));

        let started = tokio::time::Instant::now();
        let results: Vec<_> = harvester.harvest(0..3).collect().await;

        assert_eq!(results.len(), 3);
        assert!(started.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_before_start_admits_nothing() {
        let transport = Arc::new(MockTransport::new(|_, _| Reply::page(200, "<h1>t</h1>")));
        let token = CancellationToken::new();
        token.cancel();
        let harvester = harvester(transport.clone(), 3).with_cancellation(token);

        let results: Vec<_> = harvester.harvest(0..10).collect().await;

        assert!(results.is_empty());
        assert_eq!(transport.call_count(), 0);
    }
}
