//! Application configuration structures.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::CandidateId;

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// HTTP, retry and admission settings shared by probe and crawl
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Candidate space for identifier probing
    #[serde(default)]
    pub probe: ProbeConfig,

    /// Year inference settings for stage dates
    #[serde(default)]
    pub dates: DatesConfig,

    /// Output file names, relative to the storage directory
    #[serde(default)]
    pub paths: PathsConfig,

    /// Selectors of the listing page adapter
    #[serde(default)]
    pub site: SiteSelectors,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        self.crawler.listing_base()?;
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        if self.crawler.max_concurrent == 0 {
            return Err(AppError::validation("crawler.max_concurrent must be > 0"));
        }
        if self.crawler.checkpoint_every == 0 {
            return Err(AppError::validation(
                "crawler.checkpoint_every must be > 0",
            ));
        }
        if self.probe.start >= self.probe.end {
            return Err(AppError::validation(format!(
                "probe range {}..{} is empty",
                self.probe.start, self.probe.end
            )));
        }
        if self.paths.ids_file.trim().is_empty() || self.paths.output_file.trim().is_empty() {
            return Err(AppError::validation("paths must not be empty"));
        }
        self.site.validate()
    }
}

/// HTTP client, retry and admission settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// Listing URL prefix; the identifier is appended to it
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Per-attempt timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Retries after the first attempt for transient failures
    #[serde(default = "defaults::max_retries")]
    pub max_retries: u32,

    /// Backoff unit; attempt `n` waits `backoff_base_ms * 2^n`
    #[serde(default = "defaults::backoff_base")]
    pub backoff_base_ms: u64,

    /// Maximum fetch+extract tasks in flight
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,

    /// Time a task keeps its slot after a failed fetch during a crawl
    #[serde(default)]
    pub failure_delay_ms: u64,

    /// Snapshot the artifact to disk after this many writes
    #[serde(default = "defaults::checkpoint_every")]
    pub checkpoint_every: usize,
}

impl CrawlerConfig {
    /// Parse `base_url`, forcing a trailing slash so identifiers join as the
    /// last path segment.
    pub fn listing_base(&self) -> Result<Url> {
        let mut base = Url::parse(&self.base_url)?;
        if base.cannot_be_a_base() || base.host_str().is_none() {
            return Err(AppError::config(format!(
                "crawler.base_url '{}' has no host",
                self.base_url
            )));
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(base)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    pub fn failure_delay(&self) -> Duration {
        Duration::from_millis(self.failure_delay_ms)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            max_retries: defaults::max_retries(),
            backoff_base_ms: defaults::backoff_base(),
            max_concurrent: defaults::max_concurrent(),
            failure_delay_ms: 0,
            checkpoint_every: defaults::checkpoint_every(),
        }
    }
}

/// Identifier probing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// First candidate (inclusive)
    #[serde(default)]
    pub start: CandidateId,

    /// Last candidate (exclusive)
    #[serde(default = "defaults::probe_end")]
    pub end: CandidateId,

    /// Time a probe task keeps its slot after a failed fetch
    #[serde(default = "defaults::probe_failure_delay")]
    pub failure_delay_ms: u64,
}

impl ProbeConfig {
    pub fn failure_delay(&self) -> Duration {
        Duration::from_millis(self.failure_delay_ms)
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            start: 0,
            end: defaults::probe_end(),
            failure_delay_ms: defaults::probe_failure_delay(),
        }
    }
}

/// Stage date year inference.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DatesConfig {
    /// Overrides the current year as the inference anchor
    #[serde(default)]
    pub reference_year: Option<i32>,
}

/// Output file names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "defaults::ids_file")]
    pub ids_file: String,

    #[serde(default = "defaults::output_file")]
    pub output_file: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            ids_file: defaults::ids_file(),
            output_file: defaults::output_file(),
        }
    }
}

/// CSS selectors and text artifacts of the listing page layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteSelectors {
    /// Listing title (first match)
    #[serde(default = "defaults::title")]
    pub title: String,

    #[serde(default = "defaults::rating")]
    pub rating: String,

    /// Container holding the subject tags
    #[serde(default = "defaults::subjects")]
    pub subjects: String,

    /// Paragraphs that make up the description
    #[serde(default = "defaults::description")]
    pub description: String,

    /// Span holding the grade range text
    #[serde(default = "defaults::grades")]
    pub grades: String,

    /// Region searched for the schedule table and event info
    #[serde(default = "defaults::schedule_scope")]
    pub schedule_scope: String,

    #[serde(default = "defaults::schedule_body")]
    pub schedule_body: String,

    #[serde(default = "defaults::schedule_row")]
    pub schedule_row: String,

    #[serde(default = "defaults::schedule_cell")]
    pub schedule_cell: String,

    /// Class prefix of the free-text fallback span
    #[serde(default = "defaults::event_info_class_prefix")]
    pub event_info_class_prefix: String,

    /// Truncation markers replaced by a full stop in descriptions
    #[serde(default = "defaults::read_more_artifacts")]
    pub read_more_artifacts: Vec<String>,
}

impl SiteSelectors {
    /// All CSS selector strings, labelled for error messages.
    pub fn css(&self) -> [(&'static str, &str); 9] {
        [
            ("site.title", &self.title),
            ("site.rating", &self.rating),
            ("site.subjects", &self.subjects),
            ("site.description", &self.description),
            ("site.grades", &self.grades),
            ("site.schedule_scope", &self.schedule_scope),
            ("site.schedule_body", &self.schedule_body),
            ("site.schedule_row", &self.schedule_row),
            ("site.schedule_cell", &self.schedule_cell),
        ]
    }

    fn validate(&self) -> Result<()> {
        for (name, css) in self.css() {
            scraper::Selector::parse(css)
                .map_err(|e| AppError::selector(css, format!("{name}: {e:?}")))?;
        }
        if self.event_info_class_prefix.trim().is_empty() {
            return Err(AppError::validation(
                "site.event_info_class_prefix is empty",
            ));
        }
        Ok(())
    }
}

impl Default for SiteSelectors {
    fn default() -> Self {
        Self {
            title: defaults::title(),
            rating: defaults::rating(),
            subjects: defaults::subjects(),
            description: defaults::description(),
            grades: defaults::grades(),
            schedule_scope: defaults::schedule_scope(),
            schedule_body: defaults::schedule_body(),
            schedule_row: defaults::schedule_row(),
            schedule_cell: defaults::schedule_cell(),
            event_info_class_prefix: defaults::event_info_class_prefix(),
            read_more_artifacts: defaults::read_more_artifacts(),
        }
    }
}

mod defaults {
    use crate::models::CandidateId;

    // Crawler defaults
    pub fn base_url() -> String {
        "https://olimpiada.ru/activity/".into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; olymp-crawler/0.1)".into()
    }
    pub fn timeout() -> u64 {
        10
    }
    pub fn max_retries() -> u32 {
        10
    }
    pub fn backoff_base() -> u64 {
        1000
    }
    pub fn max_concurrent() -> usize {
        50
    }
    pub fn checkpoint_every() -> usize {
        100
    }

    // Probe defaults
    pub fn probe_end() -> CandidateId {
        100_000
    }
    pub fn probe_failure_delay() -> u64 {
        1000
    }

    // Path defaults
    pub fn ids_file() -> String {
        "ids.txt".into()
    }
    pub fn output_file() -> String {
        "olympiads.json".into()
    }

    // Site adapter defaults
    pub fn title() -> String {
        "h1".into()
    }
    pub fn rating() -> String {
        "span.rating".into()
    }
    pub fn subjects() -> String {
        "div.subject_tags_full".into()
    }
    pub fn description() -> String {
        "div.info.block_with_margin_bottom p".into()
    }
    pub fn grades() -> String {
        "span.classes_types_a".into()
    }
    pub fn schedule_scope() -> String {
        "div.left".into()
    }
    pub fn schedule_body() -> String {
        "tbody".into()
    }
    pub fn schedule_row() -> String {
        "tr".into()
    }
    pub fn schedule_cell() -> String {
        "td, th".into()
    }
    pub fn event_info_class_prefix() -> String {
        "events-info".into()
    }
    pub fn read_more_artifacts() -> Vec<String> {
        vec!["...\nЕще\n".into()]
    }
}
