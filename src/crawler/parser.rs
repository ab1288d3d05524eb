//! Page parsers for search-result pages
//!
//! The crawler only relies on the [`PageParser`] trait. [`ListingParser`] is
//! the default implementation for listing-card search pages:
//! - Pagination links come from the `Search results pagination` nav bar
//! - Each `card-container` div yields one record

use crate::record::RawRecord;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

/// Errors raised when a page lacks the expected structure
#[derive(Debug, Clone, Error)]
pub enum ParseError {
    #[error("Expected element not found: {0}")]
    MissingElement(&'static str),

    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },
}

/// A pagination link as found on the page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationLink {
    /// Visible link text, e.g. "2"
    pub label: String,
    /// Raw href attribute, possibly relative
    pub href: String,
}

/// Site-specific extraction of pagination links and result cards
///
/// Implementations must be pure: they see only the page body and keep no
/// state between calls, so one parser can be shared by every worker.
pub trait PageParser: Send + Sync {
    /// Extracts the links of the pagination control
    ///
    /// Fails when the page has no pagination control at all.
    fn extract_pagination(&self, content: &str) -> Result<Vec<PaginationLink>, ParseError>;

    /// Extracts one raw record per result card
    ///
    /// A page without cards yields an empty list, not an error.
    fn extract_records(&self, content: &str) -> Result<Vec<RawRecord>, ParseError>;
}

const PAGINATION_NAV: &str = "nav[aria-label='Search results pagination']";
const CARD: &str = "div[data-testid='card-container']";
const CARD_TITLE: &str = "div[data-testid='listing-card-title']";
const CARD_SUBTITLE: &str = "div[data-testid='listing-card-subtitle']";
const CARD_PRICE: &str = "span div span";

/// Parser for listing-card search pages
pub struct ListingParser {
    pagination: Selector,
    anchor: Selector,
    card: Selector,
    title: Selector,
    subtitle: Selector,
    price: Selector,
}

impl ListingParser {
    pub fn new() -> Result<Self, ParseError> {
        Ok(Self {
            pagination: compile(PAGINATION_NAV)?,
            anchor: compile("a")?,
            card: compile(CARD)?,
            title: compile(CARD_TITLE)?,
            subtitle: compile(CARD_SUBTITLE)?,
            price: compile(CARD_PRICE)?,
        })
    }

    fn parse_card(&self, card: ElementRef<'_>) -> RawRecord {
        let subtitles: Vec<String> = card.select(&self.subtitle).map(element_text).collect();

        RawRecord {
            name: subtitles.first().cloned().unwrap_or_default(),
            description: card
                .select(&self.title)
                .next()
                .map(element_text)
                .unwrap_or_default(),
            dates: subtitles.last().cloned().unwrap_or_default(),
            price: card
                .select(&self.price)
                .next()
                .map(element_text)
                .unwrap_or_default(),
            href: card
                .select(&self.anchor)
                .find_map(|a| a.value().attr("href"))
                .unwrap_or_default()
                .to_string(),
        }
    }
}

impl PageParser for ListingParser {
    fn extract_pagination(&self, content: &str) -> Result<Vec<PaginationLink>, ParseError> {
        let document = Html::parse_document(content);

        let nav = document
            .select(&self.pagination)
            .next()
            .ok_or(ParseError::MissingElement(PAGINATION_NAV))?;

        let links = nav
            .select(&self.anchor)
            .filter_map(|a| {
                a.value().attr("href").map(|href| PaginationLink {
                    label: element_text(a),
                    href: href.to_string(),
                })
            })
            .collect();

        Ok(links)
    }

    fn extract_records(&self, content: &str) -> Result<Vec<RawRecord>, ParseError> {
        let document = Html::parse_document(content);
        Ok(document
            .select(&self.card)
            .map(|card| self.parse_card(card))
            .collect())
    }
}

fn compile(selector: &str) -> Result<Selector, ParseError> {
    Selector::parse(selector).map_err(|e| ParseError::Selector {
        selector: selector.to_string(),
        message: e.to_string(),
    })
}

/// Concatenated text of an element, trimmed
fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}
