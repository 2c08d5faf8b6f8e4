//! Listing page adapter.
//!
//! Everything that knows the site's DOM layout lives here. The adapter only
//! selects text; turning that text into typed fields is the extractor's job,
//! so a layout change touches this file and the `[site]` config alone.

use scraper::{ElementRef, Html, Selector};

use crate::error::{AppError, Result};
use crate::models::SiteSelectors;

/// Text selected from one listing page, before normalization.
///
/// Each field is `None` when its node is absent from the page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFields {
    pub title: Option<String>,
    pub rating: Option<String>,
    /// Text of the subject tag container
    pub subjects: Option<String>,
    /// Texts of the description paragraphs
    pub description: Option<Vec<String>>,
    /// Text holding the grade range
    pub grades: Option<String>,
    /// Stage table flattened to one row per line
    pub stage_table: Option<String>,
    /// Free-text event info shown instead of a stage table
    pub event_info: Option<String>,
}

/// Site-specific DOM selection.
pub trait SiteAdapter: Send + Sync {
    fn parse_document(&self, html: &str) -> RawFields;
}

/// Adapter for olimpiada.ru activity pages.
pub struct OlimpiadaAdapter {
    title: Selector,
    rating: Selector,
    subjects: Selector,
    description: Selector,
    grades: Selector,
    schedule_scope: Selector,
    schedule_body: Selector,
    schedule_row: Selector,
    schedule_cell: Selector,
    classed_span: Selector,
    event_info_prefix: String,
}

impl OlimpiadaAdapter {
    /// Compile the configured selectors.
    pub fn new(selectors: &SiteSelectors) -> Result<Self> {
        Ok(Self {
            title: Self::parse_selector(&selectors.title)?,
            rating: Self::parse_selector(&selectors.rating)?,
            subjects: Self::parse_selector(&selectors.subjects)?,
            description: Self::parse_selector(&selectors.description)?,
            grades: Self::parse_selector(&selectors.grades)?,
            schedule_scope: Self::parse_selector(&selectors.schedule_scope)?,
            schedule_body: Self::parse_selector(&selectors.schedule_body)?,
            schedule_row: Self::parse_selector(&selectors.schedule_row)?,
            schedule_cell: Self::parse_selector(&selectors.schedule_cell)?,
            classed_span: Self::parse_selector("span[class]")?,
            event_info_prefix: selectors.event_info_class_prefix.clone(),
        })
    }

    fn parse_selector(s: &str) -> Result<Selector> {
        Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
    }

    fn first_text(document: &Html, selector: &Selector) -> Option<String> {
        document.select(selector).next().map(element_text)
    }

    fn description(&self, document: &Html) -> Option<Vec<String>> {
        let paragraphs: Vec<String> = document.select(&self.description).map(element_text).collect();
        (!paragraphs.is_empty()).then_some(paragraphs)
    }

    fn stage_table(&self, scope: ElementRef<'_>) -> Option<String> {
        let body = scope.select(&self.schedule_body).next()?;
        let rows: Vec<String> = body
            .select(&self.schedule_row)
            .map(|row| {
                let cells: Vec<String> = row
                    .select(&self.schedule_cell)
                    .map(|cell| collapse_whitespace(&element_text(cell)))
                    .filter(|text| !text.is_empty())
                    .collect();
                if cells.is_empty() {
                    collapse_whitespace(&element_text(row))
                } else {
                    cells.join(" ")
                }
            })
            .filter(|row| !row.is_empty())
            .collect();
        Some(rows.join("\n"))
    }

    fn event_info(&self, scope: ElementRef<'_>) -> Option<String> {
        scope
            .select(&self.classed_span)
            .find(|span| {
                span.value()
                    .classes()
                    .any(|class| class.starts_with(&self.event_info_prefix))
            })
            .map(|span| element_text(span).trim().to_string())
    }
}

impl SiteAdapter for OlimpiadaAdapter {
    fn parse_document(&self, html: &str) -> RawFields {
        let document = Html::parse_document(html);
        let scope = document.select(&self.schedule_scope).next();

        RawFields {
            title: Self::first_text(&document, &self.title),
            rating: Self::first_text(&document, &self.rating),
            subjects: Self::first_text(&document, &self.subjects),
            description: self.description(&document),
            grades: Self::first_text(&document, &self.grades),
            stage_table: scope.and_then(|scope| self.stage_table(scope)),
            event_info: scope.and_then(|scope| self.event_info(scope)),
        }
    }
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter() -> OlimpiadaAdapter {
        OlimpiadaAdapter::new(&SiteSelectors::default()).unwrap()
    }

    #[test]
    fn test_invalid_selector_is_rejected() {
        let selectors = SiteSelectors {
            title: "[[invalid".to_string(),
            ..SiteSelectors::default()
        };
        assert!(OlimpiadaAdapter::new(&selectors).is_err());
    }

    #[test]
    fn test_stage_rows_are_flattened_per_row() {
        let html = r#"
            <div class="left"><table><tbody>
                <tr><td><a href="/e/1">Отбор</a></td><td>14&nbsp;ноя...20 ноя</td></tr>
                <tr><td>Финал</td>
                    <td>3 дек</td></tr>
            </tbody></table></div>
        "#;
        let fields = adapter().parse_document(html);
        assert_eq!(
            fields.stage_table.as_deref(),
            Some("Отбор 14 ноя...20 ноя\nФинал 3 дек")
        );
        assert_eq!(fields.event_info, None);
    }

    #[test]
    fn test_event_info_matches_class_prefix() {
        let html = r#"
            <div class="left">
                <span class="other">x</span>
                <span class="events-info-block small"> Даты уточняются </span>
            </div>
        "#;
        let fields = adapter().parse_document(html);
        assert_eq!(fields.stage_table, None);
        assert_eq!(fields.event_info.as_deref(), Some("Даты уточняются"));
    }

    #[test]
    fn test_schedule_outside_scope_is_ignored() {
        let html = r#"<table><tbody><tr><td>Финал 3 дек</td></tr></tbody></table>"#;
        let fields = adapter().parse_document(html);
        assert_eq!(fields.stage_table, None);
    }

    #[test]
    fn test_missing_nodes_are_none() {
        let fields = adapter().parse_document("<html><body><p>empty</p></body></html>");
        assert_eq!(fields, RawFields::default());
    }
}
