//! Browser driving and listing extraction.
//!
//! # Architecture
//!
//! ```text
//! ChromeSession (navigate) → PopupSequencer → ChromeSession (snapshot) → ItemExtractor → Vec<Item>
//! ```
//!
//! Only [`ChromeSession`] talks to a real browser. The runner drives pages
//! through the [`ListingPage`] and [`PopupTarget`] traits, and extraction
//! works on a parsed HTML snapshot, so all of it runs without Chromium in
//! tests.
//!
//! # Usage
//!
//! ```rust,ignore
//! use pagefeed::scraper::{ChromeSession, ItemExtractor, ListingPage, LoadState, PopupSequencer};
//!
//! let session = ChromeSession::launch(site.browser.clone()).await?;
//! session.navigate(site.url.as_str()).await?;
//! PopupSequencer::from_config(&site.popup).run(&session).await;
//! session.wait_for_load_state(LoadState::Load).await?;
//! let html = session.content().await?;
//! session.close().await;
//!
//! let items = ItemExtractor::new(&site.extraction)?.extract(&scraper::Html::parse_document(&html));
//! ```

mod chrome;
mod config;
mod extractor;
mod page;
mod popup;

pub use chrome::ChromeSession;
pub use config::{ExtractionConfig, PopupConfig, ScraperConfig};
pub use extractor::{extract_items, Field, ItemExtractor, NodeMatches, RowError};
pub use page::{ListingPage, LoadState};
pub use popup::{dismiss_in_order, PopupSequencer, PopupStep, PopupTarget, SequenceState};
