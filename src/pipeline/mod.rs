//! Pipeline entry points for crawler operations.
//!
//! - `run_probe`: Discover live listing ids and save them
//! - `run_crawl`: Fetch every listing on the id list into the artifact

pub mod crawl;
pub mod probe;

pub use crawl::{CrawlOrchestrator, run_crawl};
pub use probe::run_probe;
