//! Stage table date normalization.
//!
//! Turns the flattened text of a listing's stage table, one stage per row
//! (`"Отбор 14 ноя...20 ноя"`, `"Финал 3 дек"`), into a [`StageSchedule`].
//!
//! ## Year inference
//!
//! Rows carry day and month only. Years are inferred against a reference
//! year `Y` and the present month `P`:
//!
//! - range: the start year is `Y` when the start month is `<=` the end month,
//!   otherwise `Y - 1`; the end year is always `Y`;
//! - single date: `Y` when the month is `<= P`, otherwise `Y - 1`.
//!
//! The rule is known to misplace dates around New Year. A range whose start
//! and end share a month but whose start day is later (`"20 ноя...14 ноя"`)
//! keeps both dates in `Y`, so its start falls after its end.

use std::sync::LazyLock;

use chrono::{Datelike, Local, NaiveDate};
use regex::Regex;

use crate::models::{DatesConfig, StageDates, StageSchedule};

static RANGE_ROW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([\w\s\d-]+)\s(\d{1,2})\s?([а-я]{3})?\s*(?:\.\.\.|…)\s*(\d{1,2})\s([а-я]{3})$")
        .expect("range row pattern is valid")
});

static SINGLE_ROW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([\w\s\d-]+)\s(\d{1,2})\s([а-я]{3})$").expect("single row pattern is valid")
});

static ROW_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n|[^\S\n]{3,}").expect("row separator pattern is valid"));

/// Month abbreviations as printed on listing pages.
const MONTHS: [(&str, u32); 13] = [
    ("янв", 1),
    ("фев", 2),
    ("мар", 3),
    ("апр", 4),
    ("май", 5),
    ("мая", 5),
    ("июн", 6),
    ("июл", 7),
    ("авг", 8),
    ("сен", 9),
    ("окт", 10),
    ("ноя", 11),
    ("дек", 12),
];

/// Map a three-letter month abbreviation to its number.
pub fn month_number(abbrev: &str) -> Option<u32> {
    MONTHS
        .iter()
        .find(|(name, _)| *name == abbrev)
        .map(|(_, number)| *number)
}

/// Parses stage rows into calendar dates relative to a fixed reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateNormalizer {
    reference_year: i32,
    present_month: u32,
}

impl DateNormalizer {
    /// Create a normalizer anchored at `reference_year`, treating
    /// `present_month` (1-12) as the current month.
    pub fn new(reference_year: i32, present_month: u32) -> Self {
        Self {
            reference_year,
            present_month,
        }
    }

    /// Anchor at the local clock.
    pub fn today() -> Self {
        let now = Local::now();
        Self::new(now.year(), now.month())
    }

    /// Anchor at the local clock, honouring a configured reference year.
    pub fn from_config(config: &DatesConfig) -> Self {
        let today = Self::today();
        match config.reference_year {
            Some(year) => Self::new(year, today.present_month),
            None => today,
        }
    }

    pub fn reference_year(&self) -> i32 {
        self.reference_year
    }

    /// Parse a flattened stage table.
    ///
    /// Rows are separated by newlines or by runs of three or more spaces.
    /// Rows that do not describe a stage date are skipped. A repeated stage
    /// name keeps its first position and takes the later dates.
    pub fn parse_stage_table(&self, raw: &str) -> StageSchedule {
        let text = raw.replace('\u{a0}', " ");
        let mut schedule = StageSchedule::new();

        for row in ROW_SEPARATOR.split(&text) {
            let row = row.split_whitespace().collect::<Vec<_>>().join(" ");
            if row.is_empty() {
                continue;
            }
            match self.parse_row(&row) {
                Some((stage, dates)) => {
                    schedule.insert(stage, dates);
                }
                None => log::debug!("Skipping stage row without a usable date: {row:?}"),
            }
        }

        schedule
    }

    /// Parse one whitespace-normalized row.
    pub fn parse_row(&self, row: &str) -> Option<(String, StageDates)> {
        if let Some(caps) = RANGE_ROW.captures(row) {
            let stage = caps[1].trim().to_string();
            let start_day: u32 = caps[2].parse().ok()?;
            let end_day: u32 = caps[4].parse().ok()?;
            let end_month = month_number(&caps[5])?;
            let start_month = match caps.get(3) {
                Some(m) => month_number(m.as_str())?,
                None => end_month,
            };

            let start_year = if start_month <= end_month {
                self.reference_year
            } else {
                self.reference_year - 1
            };
            let start = NaiveDate::from_ymd_opt(start_year, start_month, start_day)?;
            let end = NaiveDate::from_ymd_opt(self.reference_year, end_month, end_day)?;
            return Some((stage, StageDates::Range(start, end)));
        }

        let caps = SINGLE_ROW.captures(row)?;
        let stage = caps[1].trim().to_string();
        let day: u32 = caps[2].parse().ok()?;
        let month = month_number(&caps[3])?;
        let year = if month <= self.present_month {
            self.reference_year
        } else {
            self.reference_year - 1
        };
        let date = NaiveDate::from_ymd_opt(year, month, day)?;
        Some((stage, StageDates::Single(date)))
    }
}
