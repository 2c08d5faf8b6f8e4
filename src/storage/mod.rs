//! Storage for probe and crawl results.
//!
//! ## Directory Structure
//!
//! ```text
//! storage/
//! ├── config.toml           # Crawler configuration
//! ├── ids.txt               # Probe output: live ids, ascending, one per line
//! └── olympiads.json        # Crawl output: listings keyed by id
//! ```

pub mod local;
pub mod memory;

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{CandidateId, ListingEntry, ListingRecord};

// Re-export for convenience
pub use local::LocalStorage;
pub use memory::MemorySink;

/// Listings keyed by id, in ascending id order.
pub type Listings = BTreeMap<CandidateId, ListingEntry>;

/// Destination of a crawl run.
///
/// A run calls `reset` once, `write` once per extracted record (from a single
/// task), then `commit`. Writing the same id twice keeps the later record.
#[async_trait]
pub trait ListingSink: Send + Sync {
    /// Discard everything stored by previous runs.
    async fn reset(&self) -> Result<()>;

    /// Store one record, replacing any record with the same id.
    async fn write(&self, record: &ListingRecord) -> Result<()>;

    /// Persist everything written so far; returns the number of listings held.
    async fn commit(&self) -> Result<usize>;
}
