use std::collections::HashSet;

use chrono::NaiveDate;
use url::Url;

use crate::domain::Item;

/// Channel-level metadata of a generated feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedChannel {
    pub title: String,
    pub link: String,
    pub description: String,
    pub language: Option<String>,
}

impl FeedChannel {
    pub fn new(title: impl Into<String>, link: impl Into<String>) -> Self {
        let title = title.into();
        Self {
            description: title.clone(),
            title,
            link: link.into(),
            language: None,
        }
    }
}

/// One `<item>` of a feed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    pub title: String,
    pub link: String,
    pub guid: String,
    /// Entries loaded from a pre-existing file may carry no date
    pub published: Option<NaiveDate>,
}

impl FeedEntry {
    pub fn key(&self) -> (&str, &str) {
        (&self.title, &self.link)
    }
}

impl From<&Item> for FeedEntry {
    fn from(item: &Item) -> Self {
        let link = canonical_link(&item.url);
        Self {
            guid: Item::generate_guid(&item.title, &link),
            title: item.title.clone(),
            link,
            published: Some(item.published_at),
        }
    }
}

/// Serialized form of `raw` as a parsed URL (percent-encoded path, lowercase
/// host), matching what a feed reader hands back on reload. Unparseable
/// links are kept verbatim.
pub fn canonical_link(raw: &str) -> String {
    Url::parse(raw)
        .map(String::from)
        .unwrap_or_else(|_| raw.to_string())
}

/// In-memory snapshot of a feed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedDocument {
    pub channel: FeedChannel,
    pub entries: Vec<FeedEntry>,
}

impl FeedDocument {
    pub fn new(channel: FeedChannel) -> Self {
        Self {
            channel,
            entries: Vec::new(),
        }
    }

    /// Merge extracted items into the document.
    ///
    /// Items whose `(title, url)` key is already present are skipped, so the
    /// first-seen entry (and its date) wins. Afterwards entries are ordered
    /// newest first; the sort is stable, undated entries go last.
    ///
    /// Returns the number of entries added.
    pub fn merge(&mut self, items: &[Item]) -> usize {
        let mut seen: HashSet<(String, String)> = self
            .entries
            .iter()
            .map(|e| owned_key(e.key()))
            .collect();

        let mut added = 0;
        for item in items {
            let entry = FeedEntry::from(item);
            if !seen.insert(owned_key(entry.key())) {
                continue;
            }
            self.entries.push(entry);
            added += 1;
        }

        self.sort_newest_first();
        added
    }

    fn sort_newest_first(&mut self) {
        // Option<NaiveDate> orders None first; reversing puts it last.
        self.entries
            .sort_by(|a, b| b.published.cmp(&a.published));
    }
}

fn owned_key((title, link): (&str, &str)) -> (String, String) {
    (title.to_string(), link.to_string())
}
