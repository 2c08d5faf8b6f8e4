//! Per-attempt, per-listing and per-run outcomes.

use std::fmt;

use serde::Serialize;

/// Result of fetching one URL.
///
/// A single attempt produces `Success`, `NotFound` or `TransientFailure`;
/// [`crate::services::RetryingFetcher::fetch`] turns repeated transient
/// failures into `ExhaustedRetries`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Success(String),
    /// Non-2xx status; final, never retried
    NotFound { status: u16 },
    TransientFailure(String),
    ExhaustedRetries { attempts: u32 },
}

/// Why a listing was dropped from a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    NotFound,
    ExhaustedRetries,
    /// Page fetched but a required field was missing
    Unparseable,
    /// The sink refused the record
    WriteFailed,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            DropReason::NotFound => "not found",
            DropReason::ExhaustedRetries => "retries exhausted",
            DropReason::Unparseable => "unparseable",
            DropReason::WriteFailed => "write failed",
        };
        f.write_str(text)
    }
}

/// Aggregate counts of a crawl or probe run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub succeeded: usize,
    pub not_found: usize,
    pub exhausted: usize,
    pub unparseable: usize,
    pub write_failed: usize,
    /// Identifiers never admitted because the run was cancelled
    pub not_admitted: usize,
}

impl RunSummary {
    pub fn record_drop(&mut self, reason: DropReason) {
        match reason {
            DropReason::NotFound => self.not_found += 1,
            DropReason::ExhaustedRetries => self.exhausted += 1,
            DropReason::Unparseable => self.unparseable += 1,
            DropReason::WriteFailed => self.write_failed += 1,
        }
    }

    /// Identifiers that were admitted but produced no record.
    pub fn failed(&self) -> usize {
        self.not_found + self.exhausted + self.unparseable + self.write_failed
    }

    pub fn processed(&self) -> usize {
        self.succeeded + self.failed()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} succeeded, {} dropped (not found: {}, retries exhausted: {}, unparseable: {}, write failed: {})",
            self.succeeded,
            self.failed(),
            self.not_found,
            self.exhausted,
            self.unparseable,
            self.write_failed
        )?;
        if self.not_admitted > 0 {
            write!(f, ", {} not admitted", self.not_admitted)?;
        }
        Ok(())
    }
}
