//! Listing field extraction.
//!
//! Normalizes the text selected by a [`SiteAdapter`] into a [`ListingRecord`].
//! Only the title is required; every other field degrades to `None`.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::Result;
use crate::models::{Config, ListingRecord, RawDocument, Timetable};
use crate::services::adapter::{OlimpiadaAdapter, RawFields, SiteAdapter};
use crate::services::dates::DateNormalizer;

/// A run of Cyrillic capitals followed by non-capitals: one subject tag.
static SUBJECT_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[А-ЯЁ]+[^А-ЯЁ]+").expect("subject tag pattern is valid"));

static GRADE_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+)\s*[–—-]\s*(\d+)").expect("grade range pattern is valid")
});

/// Turns fetched pages into listing records.
pub struct ListingExtractor {
    adapter: Box<dyn SiteAdapter>,
    normalizer: DateNormalizer,
    read_more_artifacts: Vec<String>,
}

impl ListingExtractor {
    pub fn new(
        adapter: Box<dyn SiteAdapter>,
        normalizer: DateNormalizer,
        read_more_artifacts: Vec<String>,
    ) -> Self {
        Self {
            adapter,
            normalizer,
            read_more_artifacts,
        }
    }

    /// Build the olimpiada.ru extractor from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            Box::new(OlimpiadaAdapter::new(&config.site)?),
            DateNormalizer::from_config(&config.dates),
            config.site.read_more_artifacts.clone(),
        ))
    }

    /// Extract a record, or `None` when the page has no title.
    pub fn extract(&self, document: &RawDocument) -> Option<ListingRecord> {
        let fields = self.adapter.parse_document(&document.html);
        self.build_record(document, fields)
    }

    fn build_record(&self, document: &RawDocument, fields: RawFields) -> Option<ListingRecord> {
        let title = fields
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        let Some(title) = title else {
            log::debug!("Listing {} has no title, dropping", document.id);
            return None;
        };

        let timetable = match (fields.stage_table, fields.event_info) {
            (Some(table), _) => Some(Timetable::Schedule(
                self.normalizer.parse_stage_table(&table),
            )),
            (None, Some(info)) => Some(Timetable::Unparsed(info)),
            (None, None) => None,
        };

        Some(ListingRecord {
            id: document.id,
            title,
            rating: fields.rating.map(|r| r.trim().to_string()),
            classes: fields.subjects.as_deref().map(split_subjects),
            description: fields
                .description
                .map(|paragraphs| self.join_description(&paragraphs)),
            grades: fields.grades.as_deref().and_then(parse_grades),
            timetable,
        })
    }

    fn join_description(&self, paragraphs: &[String]) -> String {
        let mut description = paragraphs.join(" ");
        for artifact in &self.read_more_artifacts {
            description = description.replace(artifact, ".");
        }
        description
    }
}

/// Split run-together subject tags ("МатематикаФизика") into separate tags.
pub fn split_subjects(text: &str) -> Vec<String> {
    let text = text.replace('\n', "").replace('\u{a0}', " ");
    SUBJECT_TAG
        .find_iter(&text)
        .map(|m| m.as_str().trim().to_string())
        .filter(|tag| !tag.is_empty())
        .collect()
}

/// Expand the first "N–M" range into every grade from N to M inclusive.
pub fn parse_grades(text: &str) -> Option<Vec<u8>> {
    let caps = GRADE_RANGE.captures(text)?;
    let start: u8 = caps[1].parse().ok()?;
    let end: u8 = caps[2].parse().ok()?;
    if start > end {
        return None;
    }
    Some((start..=end).collect())
}
