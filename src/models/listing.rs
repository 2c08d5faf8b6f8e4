//! Listing record data structures.

use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Identifier of one listing page on the remote site.
pub type CandidateId = u32;

/// Fetched page body together with the identifier it came from.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub id: CandidateId,
    pub html: String,
}

/// Dates of one competition stage: a single day or a start/end pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<NaiveDate>", into = "Vec<NaiveDate>")]
pub enum StageDates {
    Single(NaiveDate),
    Range(NaiveDate, NaiveDate),
}

impl StageDates {
    pub fn start(&self) -> NaiveDate {
        match *self {
            StageDates::Single(start) | StageDates::Range(start, _) => start,
        }
    }

    pub fn end(&self) -> Option<NaiveDate> {
        match *self {
            StageDates::Single(_) => None,
            StageDates::Range(_, end) => Some(end),
        }
    }
}

impl TryFrom<Vec<NaiveDate>> for StageDates {
    type Error = String;

    fn try_from(dates: Vec<NaiveDate>) -> Result<Self, Self::Error> {
        match dates.as_slice() {
            [start] => Ok(StageDates::Single(*start)),
            [start, end] => Ok(StageDates::Range(*start, *end)),
            other => Err(format!("stage must have 1 or 2 dates, got {}", other.len())),
        }
    }
}

impl From<StageDates> for Vec<NaiveDate> {
    fn from(dates: StageDates) -> Self {
        match dates {
            StageDates::Single(start) => vec![start],
            StageDates::Range(start, end) => vec![start, end],
        }
    }
}

/// Stage name to dates, in page order.
pub type StageSchedule = IndexMap<String, StageDates>;

/// Stage timetable of a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Timetable {
    /// Parsed stage table
    Schedule(StageSchedule),
    /// Free-text event info, kept verbatim when the page has no stage table
    Unparsed(String),
}

/// A fully extracted listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingRecord {
    pub id: CandidateId,
    pub title: String,
    pub rating: Option<String>,
    pub classes: Option<Vec<String>>,
    pub description: Option<String>,
    pub grades: Option<Vec<u8>>,
    pub timetable: Option<Timetable>,
}

/// Artifact form of a listing, keyed by its identifier in the output file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingEntry {
    pub title: String,
    pub rating: Option<String>,
    pub classes: Option<Vec<String>>,
    pub description: Option<String>,
    pub grades: Option<Vec<u8>>,
    pub timetable: Option<Timetable>,
}

impl From<&ListingRecord> for ListingEntry {
    fn from(record: &ListingRecord) -> Self {
        Self {
            title: record.title.clone(),
            rating: record.rating.clone(),
            classes: record.classes.clone(),
            description: record.description.clone(),
            grades: record.grades.clone(),
            timetable: record.timetable.clone(),
        }
    }
}

impl ListingEntry {
    /// Attach an identifier, turning the entry back into a record.
    pub fn into_record(self, id: CandidateId) -> ListingRecord {
        ListingRecord {
            id,
            title: self.title,
            rating: self.rating,
            classes: self.classes,
            description: self.description,
            grades: self.grades,
            timetable: self.timetable,
        }
    }
}
