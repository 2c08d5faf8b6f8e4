// src/models/mod.rs

//! Domain models for the crawler application.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod listing;
mod outcome;

// Re-export all public types
pub use config::{
    Config, CrawlerConfig, DatesConfig, PathsConfig, ProbeConfig, SiteSelectors,
};
pub use listing::{
    CandidateId, ListingEntry, ListingRecord, RawDocument, StageDates, StageSchedule, Timetable,
};
pub use outcome::{DropReason, FetchOutcome, RunSummary};
