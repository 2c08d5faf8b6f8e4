//! Scripted transport for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{CandidateId, SiteSelectors};
use crate::services::adapter::OlimpiadaAdapter;
use crate::services::dates::DateNormalizer;
use crate::services::extractor::ListingExtractor;
use crate::services::fetcher::{Page, RetryPolicy, RetryingFetcher, Transport};
use crate::services::harvest::ListingHarvester;

/// What the mock does for one call.
pub(crate) enum Reply {
    Page(u16, String),
    /// Connection-level failure
    Fail,
    /// Never answers; only the fetcher's timeout ends it
    Hang,
}

impl Reply {
    pub(crate) fn page(status: u16, body: &str) -> Self {
        Reply::Page(status, body.to_string())
    }
}

type Script = Box<dyn Fn(CandidateId, usize) -> Reply + Send + Sync>;

/// Answers by listing id and per-URL call number, recording every call.
pub(crate) struct MockTransport {
    script: Script,
    latency: Duration,
    calls: Mutex<Vec<(String, Instant)>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MockTransport {
    pub(crate) fn new(
        script: impl Fn(CandidateId, usize) -> Reply + Send + Sync + 'static,
    ) -> Self {
        Self {
            script: Box::new(script),
            latency: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub(crate) fn calls_for(&self, id: CandidateId) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(url, _)| id_of(url) == id)
            .count()
    }

    pub(crate) fn call_instants(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().iter().map(|(_, at)| *at).collect()
    }

    /// Highest number of simultaneous calls observed.
    pub(crate) fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

fn id_of(url: &str) -> CandidateId {
    url.rsplit('/').next().and_then(|s| s.parse().ok()).unwrap_or(u32::MAX)
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(&self, url: &str) -> Result<Page> {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            let call = calls.iter().filter(|(u, _)| u == url).count();
            calls.push((url.to_string(), Instant::now()));
            call
        };
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(current, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        match (self.script)(id_of(url), call) {
            Reply::Page(status, body) => Ok(Page { status, body }),
            Reply::Fail => Err(AppError::fetch(url, "connection reset by peer")),
            Reply::Hang => std::future::pending().await,
        }
    }
}

/// Harvester over `transport` with two retries and a December 2024 date anchor.
pub(crate) fn test_harvester(
    transport: Arc<MockTransport>,
    max_concurrent: usize,
) -> ListingHarvester {
    let policy = RetryPolicy {
        max_retries: 2,
        ..RetryPolicy::default()
    };
    ListingHarvester::new(
        RetryingFetcher::new(transport, policy),
        ListingExtractor::new(
            Box::new(OlimpiadaAdapter::new(&SiteSelectors::default()).unwrap()),
            DateNormalizer::new(2024, 12),
            SiteSelectors::default().read_more_artifacts,
        ),
        Url::parse("https://olimpiada.ru/activity/").unwrap(),
        max_concurrent,
    )
}
