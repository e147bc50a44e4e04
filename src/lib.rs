//! # Pagefeed
//!
//! Turns listing pages that publish no feed into RSS 2.0 files.
//!
//! ## Architecture
//!
//! One engine, many sites. Each site is a TOML file; a run is a pipeline:
//!
//! ```text
//! Browser → Popup Sequencer → Item Extractor (+ Date Normalizer) → Feed Synthesizer
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! # Validate a site config
//! pagefeed check sites/example.toml
//!
//! # Render the page and update rss_output/example.xml
//! pagefeed run sites/example.toml
//!
//! # Try selectors against a saved page
//! pagefeed extract sites/example.toml --html page.html
//! ```
//!
//! ## Modules
//!
//! - [`app`]: Error types and the per-site runner
//! - [`cli`]: Command-line interface definitions
//! - [`config`]: Site configuration
//! - [`domain`]: Items and feed documents
//! - [`normalizer`]: Date normalization
//! - [`scraper`]: Browser session, popup dismissal and row extraction
//! - [`store`]: RSS file persistence

/// Error types and the site runner.
///
/// [`run_site`](app::run_site) drives one site end to end and always closes
/// the browser before returning.
pub mod app;

/// Command-line interface using clap.
///
/// - `run <site.toml>` - Render the page and update the feed
/// - `extract <site.toml> --html <file>` - Offline extraction
/// - `check <site.toml>` - Validate a config
pub mod cli;

/// Per-site configuration loaded from TOML.
pub mod config;

/// Core domain models.
///
/// - [`Item`](domain::Item): Extracted entry with a SHA256 guid
/// - [`FeedDocument`](domain::FeedDocument): Feed snapshot with merge rules
pub mod domain;

/// Free-form date text to calendar dates.
pub mod normalizer;

/// Headless Chrome via chromiumoxide, popup dismissal and listing extraction.
///
/// - [`ChromeSession`](scraper::ChromeSession): Browser with a single page
/// - [`PopupSequencer`](scraper::PopupSequencer): Ordered, fail-open dismissal
/// - [`ItemExtractor`](scraper::ItemExtractor): Selector + index row extraction
pub mod scraper;

/// RSS file persistence.
///
/// - [`Store`](store::Store): Load/replace transaction over a feed snapshot
/// - [`RssFileStore`](store::RssFileStore): RSS 2.0 file with atomic replace
/// - [`write_feed`](store::write_feed): Merge items into a feed file
pub mod store;
