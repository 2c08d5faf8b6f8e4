//! Service layer for the listing crawler.
//!
//! This module contains the business logic for:
//! - Stage date normalization (`DateNormalizer`)
//! - Page field selection and extraction (`OlimpiadaAdapter`, `ListingExtractor`)
//! - Fetching with bounded retries (`RetryingFetcher`)
//! - Bounded fetch + extract fan-out (`ListingHarvester`)
//! - Identifier discovery (`IdentifierProber`)

mod adapter;
mod dates;
mod extractor;
mod fetcher;
mod harvest;
mod prober;

#[cfg(test)]
pub(crate) mod testing;

pub use adapter::{OlimpiadaAdapter, RawFields, SiteAdapter};
pub use dates::{DateNormalizer, month_number};
pub use extractor::{ListingExtractor, parse_grades, split_subjects};
pub use fetcher::{HttpTransport, Page, RetryPolicy, RetryingFetcher, Transport};
pub use harvest::{Harvest, ListingHarvester};
pub use prober::{IdentifierProber, ProbeReport};
