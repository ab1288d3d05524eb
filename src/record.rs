//! Listing records and their normalization
//!
//! A parser emits [`RawRecord`]s exactly as found on the page. Before a record
//! reaches the storage pipeline it is turned into a [`Record`]: every field is
//! trimmed, empty fields are replaced with a `"No <field>"` sentinel and the
//! card link is resolved to an absolute URL.

use crate::url::resolve_href;
use serde::Serialize;
use url::Url;

/// Column order of every sink
pub const COLUMNS: [&str; 5] = ["name", "description", "dates", "price", "url"];

/// Fields of a result card as extracted by a page parser
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    pub name: String,
    pub description: String,
    pub dates: String,
    pub price: String,
    pub href: String,
}

/// A normalized listing record
///
/// Fields are private so a `Record` can only be produced by
/// [`Record::normalize`]; `name` is the natural key used for deduplication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    name: String,
    description: String,
    dates: String,
    price: String,
    url: String,
}

impl Record {
    /// Normalizes a raw card into a storable record
    ///
    /// # Arguments
    ///
    /// * `raw` - Fields as extracted by the parser
    /// * `base` - Base URL used to resolve a relative card link
    pub fn normalize(raw: RawRecord, base: &Url) -> Self {
        let url = resolve_href(base, &raw.href)
            .map(|u| u.to_string())
            .unwrap_or_default();

        Self {
            name: clean_field("name", &raw.name),
            description: clean_field("description", &raw.description),
            dates: clean_field("dates", &raw.dates),
            price: clean_field("price", &raw.price),
            url: clean_field("url", &url),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn dates(&self) -> &str {
        &self.dates
    }

    pub fn price(&self) -> &str {
        &self.price
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Natural key used to detect duplicates
    pub fn key(&self) -> &str {
        &self.name
    }

    /// Field values in [`COLUMNS`] order
    pub fn values(&self) -> [&str; 5] {
        [
            &self.name,
            &self.description,
            &self.dates,
            &self.price,
            &self.url,
        ]
    }
}

/// Trims a value, falling back to the `"No <field>"` sentinel when empty
fn clean_field(field: &str, value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        format!("No {}", field)
    } else {
        trimmed.to_string()
    }
}
