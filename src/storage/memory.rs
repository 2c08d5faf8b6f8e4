//! In-memory sink.

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::Result;
use crate::models::{ListingEntry, ListingRecord};
use crate::storage::{ListingSink, Listings};

/// Keeps listings in memory, for callers that consume records directly.
#[derive(Default)]
pub struct MemorySink {
    listings: Mutex<Listings>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the listings held.
    pub async fn listings(&self) -> Listings {
        self.listings.lock().await.clone()
    }
}

#[async_trait]
impl ListingSink for MemorySink {
    async fn reset(&self) -> Result<()> {
        self.listings.lock().await.clear();
        Ok(())
    }

    async fn write(&self, record: &ListingRecord) -> Result<()> {
        self.listings
            .lock()
            .await
            .insert(record.id, ListingEntry::from(record));
        Ok(())
    }

    async fn commit(&self) -> Result<usize> {
        Ok(self.listings.lock().await.len())
    }
}
