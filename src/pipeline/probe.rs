// src/pipeline/probe.rs

//! Identifier discovery pipeline.

use std::ops::Range;
use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::error::{AppError, Result};
use crate::models::{CandidateId, Config};
use crate::services::{IdentifierProber, ListingHarvester, ProbeReport, Transport};
use crate::storage::LocalStorage;

/// Probe `range` and replace the saved id list with the ids found.
///
/// A cancelled probe leaves the previous id list untouched.
pub async fn run_probe(
    config: &Config,
    storage: &LocalStorage,
    transport: Arc<dyn Transport>,
    cancel: CancellationToken,
    range: Range<CandidateId>,
) -> Result<ProbeReport> {
    if range.is_empty() {
        return Err(AppError::config(format!(
            "Empty probe range {}..{}",
            range.start, range.end
        )));
    }
    let start_time = Utc::now();

    let harvester = ListingHarvester::from_config(config, transport)?
        .with_failure_delay(config.probe.failure_delay())
        .with_cancellation(cancel.clone());
    let report = IdentifierProber::new(harvester).probe(range).await;

    if cancel.is_cancelled() {
        log::warn!(
            "Probe cancelled, keeping the previous id list at {}",
            storage.ids_path().display()
        );
    } else {
        storage.save_ids(&report.valid).await?;
    }

    log::info!(
        "Probe finished in {}s: {} valid ids",
        (Utc::now() - start_time).num_seconds(),
        report.valid.len()
    );
    Ok(report)
}
