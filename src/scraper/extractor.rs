use std::fmt;

use scraper::{ElementRef, Html, Node, Selector};
use thiserror::Error;
use url::Url;

use crate::app::{PagefeedError, Result};
use crate::domain::Item;
use crate::normalizer::DatePattern;
use crate::scraper::ExtractionConfig;

/// Elements whose boundaries separate words in rendered text
const BREAKING_TAGS: &[&str] = &[
    "br", "p", "div", "li", "td", "th", "tr", "dt", "dd", "h1", "h2", "h3", "h4", "h5", "h6",
];

/// Which part of a row a query was looking for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Title,
    Href,
    Date,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::Title => "title",
            Field::Href => "href",
            Field::Date => "date",
        };
        f.write_str(name)
    }
}

/// Why a row was dropped. Never fatal to the run.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RowError {
    #[error("{field} selector matched {len} nodes, index {index} is out of range")]
    Index { field: Field, index: usize, len: usize },

    #[error("no title text")]
    MissingTitle,

    #[error("no usable href")]
    MissingHref,

    #[error("no matching date row")]
    MissingDateRow,

    #[error("unparseable date {0:?}")]
    UnparseableDate(String),

    #[error("cannot resolve href {href:?}: {source}")]
    Url {
        href: String,
        source: url::ParseError,
    },
}

/// Ordered nodes matched by a sub-selector inside one row.
pub struct NodeMatches<'a> {
    field: Field,
    nodes: Vec<ElementRef<'a>>,
}

impl<'a> NodeMatches<'a> {
    fn select(row: ElementRef<'a>, selector: &Selector, field: Field) -> Self {
        Self {
            field,
            nodes: row.select(selector).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Bounds-checked access to the n-th (0-based) match
    pub fn nth(&self, index: usize) -> std::result::Result<ElementRef<'a>, RowError> {
        self.nodes.get(index).copied().ok_or(RowError::Index {
            field: self.field,
            index,
            len: self.nodes.len(),
        })
    }
}

/// Compiled form of an [`ExtractionConfig`].
pub struct ItemExtractor {
    title_root: Selector,
    date_root: Option<Selector>,
    title: Option<Selector>,
    title_index: usize,
    href: Option<Selector>,
    href_index: usize,
    date: Option<Selector>,
    date_index: usize,
    anchor: Selector,
    date_pattern: DatePattern,
    base_url: Url,
}

impl ItemExtractor {
    pub fn new(config: &ExtractionConfig) -> Result<Self> {
        let base_url = config
            .base_url
            .clone()
            .ok_or_else(|| PagefeedError::Config("extraction base_url is not set".into()))?;

        let date_root = if config.shares_rows() {
            None
        } else {
            Some(parse_selector(config.date_root())?)
        };

        Ok(Self {
            title_root: parse_selector(&config.title_root)?,
            date_root,
            title: parse_optional_selector(&config.title_selector)?,
            title_index: config.title_index,
            href: parse_optional_selector(&config.href_selector)?,
            href_index: config.href_index,
            date: parse_optional_selector(&config.date_selector)?,
            date_index: config.date_index,
            anchor: parse_selector("a[href]")?,
            date_pattern: DatePattern::new(&config.date_format, &config.date_regex)?,
            base_url,
        })
    }

    /// Extract items from a rendered page, in document order.
    ///
    /// Rows that do not yield a title, a link and a parseable date are
    /// skipped; an empty result is not an error.
    pub fn extract(&self, document: &Html) -> Vec<Item> {
        let rows: Vec<ElementRef<'_>> = document.select(&self.title_root).collect();
        let date_rows: Option<Vec<ElementRef<'_>>> = self
            .date_root
            .as_ref()
            .map(|selector| document.select(selector).collect());

        if let Some(ref date_rows) = date_rows {
            if date_rows.len() != rows.len() {
                tracing::debug!(
                    "Row count mismatch: {} title rows, {} date rows",
                    rows.len(),
                    date_rows.len()
                );
            }
        }

        let mut items = Vec::new();
        for (i, row) in rows.iter().enumerate() {
            let date_row = match date_rows {
                Some(ref date_rows) => date_rows.get(i).copied(),
                None => Some(*row),
            };

            let result = date_row
                .ok_or(RowError::MissingDateRow)
                .and_then(|date_row| self.extract_row(*row, date_row));

            match result {
                Ok(item) => items.push(item),
                Err(e) => tracing::debug!("Skipping row {}: {}", i, e),
            }
        }

        tracing::info!("Extracted {} items from {} rows", items.len(), rows.len());
        items
    }

    fn extract_row(
        &self,
        row: ElementRef<'_>,
        date_row: ElementRef<'_>,
    ) -> std::result::Result<Item, RowError> {
        let title_node = match self.title {
            Some(ref selector) => {
                NodeMatches::select(row, selector, Field::Title).nth(self.title_index)?
            }
            None => row,
        };
        let title = element_text(title_node);
        if title.is_empty() {
            return Err(RowError::MissingTitle);
        }

        let href = self.href_of(row)?;
        let url = self.resolve(&href)?;

        let date_node = match self.date {
            Some(ref selector) => {
                NodeMatches::select(date_row, selector, Field::Date).nth(self.date_index)?
            }
            None => date_row,
        };
        let raw_date = element_text(date_node);
        let published_at = self
            .date_pattern
            .normalize(&raw_date)
            .ok_or(RowError::UnparseableDate(raw_date))?;

        Ok(Item::new(title, url, published_at))
    }

    fn href_of(&self, row: ElementRef<'_>) -> std::result::Result<String, RowError> {
        let node = match self.href {
            Some(ref selector) => {
                NodeMatches::select(row, selector, Field::Href).nth(self.href_index)?
            }
            None if row.value().attr("href").is_some() => row,
            None => row.select(&self.anchor).next().ok_or(RowError::MissingHref)?,
        };

        let href = node.value().attr("href").map(str::trim).unwrap_or_default();
        if href.is_empty() || href.starts_with('#') || href.to_ascii_lowercase().starts_with("javascript:") {
            return Err(RowError::MissingHref);
        }
        Ok(href.to_string())
    }

    fn resolve(&self, href: &str) -> std::result::Result<String, RowError> {
        self.base_url
            .join(href)
            .map(String::from)
            .map_err(|source| RowError::Url {
                href: href.to_string(),
                source,
            })
    }
}

/// Compile `config` and extract items from `document`.
pub fn extract_items(document: &Html, config: &ExtractionConfig) -> Result<Vec<Item>> {
    Ok(ItemExtractor::new(config)?.extract(document))
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| PagefeedError::Selector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

fn parse_optional_selector(selector: &str) -> Result<Option<Selector>> {
    let selector = selector.trim();
    if selector.is_empty() {
        return Ok(None);
    }
    parse_selector(selector).map(Some)
}

/// Rendered-ish text of an element: block and cell boundaries become spaces,
/// whitespace runs collapse.
fn element_text(element: ElementRef<'_>) -> String {
    let mut text = String::new();
    for node in element.descendants() {
        match node.value() {
            Node::Text(t) => text.push_str(t),
            Node::Element(e) if BREAKING_TAGS.contains(&e.name()) => text.push(' '),
            _ => {}
        }
    }
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
