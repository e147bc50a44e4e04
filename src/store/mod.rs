pub mod rss;

use std::path::{Path, PathBuf};

use chrono::{FixedOffset, Offset, Utc};

use crate::app::Result;
use crate::domain::{FeedChannel, FeedDocument, Item};

pub use rss::RssFileStore;

/// Snapshot storage for a feed document.
///
/// A write is one transaction: load the current snapshot, compute the next
/// one, replace the stored copy in a single step.
pub trait Store {
    /// Current snapshot, carrying `channel` as its metadata
    fn load(&self, channel: &FeedChannel) -> Result<FeedDocument>;
    /// Replace the stored snapshot wholesale
    fn replace(&self, document: &FeedDocument) -> Result<()>;
}

/// Outcome of merging items into a feed file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteSummary {
    pub path: PathBuf,
    /// Entries that were not in the feed before
    pub added: usize,
    pub total: usize,
}

/// Merges extracted items into an RSS file.
#[derive(Debug, Clone)]
pub struct FeedWriter {
    channel: FeedChannel,
    offset: FixedOffset,
}

impl FeedWriter {
    pub fn new(feed_title: &str, source_url: &str) -> Self {
        Self {
            channel: FeedChannel::new(feed_title, source_url),
            offset: Utc.fix(),
        }
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        if let Some(description) = description {
            self.channel.description = description;
        }
        self
    }

    pub fn with_language(mut self, language: Option<String>) -> Self {
        self.channel.language = language;
        self
    }

    /// Offset publication dates are written in
    pub fn with_offset(mut self, offset: FixedOffset) -> Self {
        self.offset = offset;
        self
    }

    pub fn channel(&self) -> &FeedChannel {
        &self.channel
    }

    /// Merge `items` into the feed at `output_path`, creating it if needed.
    pub fn write(&self, items: &[Item], output_path: &Path) -> Result<WriteSummary> {
        let store = RssFileStore::new(output_path, self.offset);
        self.write_to(&store, items).map(|(added, total)| WriteSummary {
            path: output_path.to_path_buf(),
            added,
            total,
        })
    }

    fn write_to<S: Store>(&self, store: &S, items: &[Item]) -> Result<(usize, usize)> {
        let mut document = store.load(&self.channel)?;
        let added = document.merge(items);
        store.replace(&document)?;

        tracing::info!(
            "Feed {:?}: {} new entries, {} total",
            self.channel.title,
            added,
            document.entries.len()
        );
        Ok((added, document.entries.len()))
    }
}

/// Merge `items` into the RSS 2.0 feed at `output_path`.
///
/// Existing entries are kept; items already present by `(title, url)` are
/// not added again. Fails only when the file cannot be written.
pub fn write_feed(
    items: &[Item],
    output_path: &Path,
    source_url: &str,
    feed_title: &str,
) -> Result<WriteSummary> {
    FeedWriter::new(feed_title, source_url).write(items, output_path)
}
