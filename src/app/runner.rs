use std::path::{Path, PathBuf};

use scraper::Html;

use crate::app::{PagefeedError, Result};
use crate::config::SiteConfig;
use crate::domain::Item;
use crate::scraper::{
    ChromeSession, ItemExtractor, ListingPage, LoadState, PopupSequencer, SequenceState,
};
use crate::store::FeedWriter;

/// Outcome of one site run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub output: PathBuf,
    /// Items extracted from the page
    pub extracted: usize,
    /// Entries new to the feed
    pub added: usize,
    pub total: usize,
    /// `None` when no popup steps were configured
    pub popups: Option<SequenceState>,
}

/// Run the full pipeline for one site: render the listing page, clear its
/// popups, extract rows and merge them into the feed file.
///
/// The browser is closed on every exit path before an error propagates.
pub async fn run_site(config: &SiteConfig, output: Option<&Path>) -> Result<RunSummary> {
    // Compile selectors and the date pattern before paying for a browser
    let extractor = ItemExtractor::new(&config.extraction)?;
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config.output_path());

    tracing::info!("Rendering {}", config.url);
    let session = ChromeSession::launch(config.browser.clone()).await?;
    run_on_page(session, &extractor, config, &output).await
}

/// Rendered HTML of a listing page and how its popups went
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub html: String,
    /// `None` when no popup steps were configured
    pub popups: Option<SequenceState>,
}

/// Navigate, clear popups and take the page's HTML. `page` is closed on
/// every path, including errors.
pub async fn render_page<P: ListingPage>(page: P, config: &SiteConfig) -> Result<Snapshot> {
    let rendered = async {
        page.navigate(config.url.as_str()).await?;
        page.wait_for_load_state(LoadState::DomContentLoaded).await?;
        if let Some(landed) = page.current_url().await {
            tracing::info!("Landed on {}", landed);
        }

        let popups = if config.popup.is_active() {
            Some(PopupSequencer::from_config(&config.popup).run(&page).await)
        } else {
            None
        };

        page.wait_for_load_state(LoadState::Load).await?;
        let html = page.content().await?;
        Ok::<_, PagefeedError>(Snapshot { html, popups })
    }
    .await;

    page.close().await;
    rendered
}

async fn run_on_page<P: ListingPage>(
    page: P,
    extractor: &ItemExtractor,
    config: &SiteConfig,
    output: &Path,
) -> Result<RunSummary> {
    let snapshot = render_page(page, config).await?;
    let items = extractor.extract(&Html::parse_document(&snapshot.html));
    let mut summary = write_items(&items, config, output)?;
    summary.popups = snapshot.popups;
    Ok(summary)
}

/// Extract from an already rendered HTML snapshot and merge into `output`.
pub fn publish_snapshot(html: &str, config: &SiteConfig, output: &Path) -> Result<RunSummary> {
    let extractor = ItemExtractor::new(&config.extraction)?;
    let items = extractor.extract(&Html::parse_document(html));
    write_items(&items, config, output)
}

fn write_items(items: &[Item], config: &SiteConfig, output: &Path) -> Result<RunSummary> {
    if items.is_empty() {
        tracing::warn!(
            "No items extracted from {}; check the selectors in the site config",
            config.url
        );
    }

    let summary = FeedWriter::new(&config.feed_title, config.url.as_str())
        .with_description(config.feed_description.clone())
        .with_language(config.language.clone())
        .with_offset(config.utc_offset())
        .write(items, output)?;

    Ok(RunSummary {
        output: summary.path,
        extracted: items.len(),
        added: summary.added,
        total: summary.total,
        popups: None,
    })
}
