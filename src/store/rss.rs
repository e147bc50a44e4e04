use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::FixedOffset;
use feed_rs::parser;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use tempfile::NamedTempFile;

use crate::app::{PagefeedError, Result};
use crate::domain::{canonical_link, FeedChannel, FeedDocument, FeedEntry};
use crate::store::Store;

/// RSS 2.0 file on disk, replaced wholesale on every write.
#[derive(Debug, Clone)]
pub struct RssFileStore {
    path: PathBuf,
    offset: FixedOffset,
}

impl RssFileStore {
    /// `offset` is the zone publication dates are written in and read back from
    pub fn new(path: impl Into<PathBuf>, offset: FixedOffset) -> Self {
        Self {
            path: path.into(),
            offset,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parse_entries(&self, body: &[u8]) -> Vec<FeedEntry> {
        let feed = match parser::parse(body) {
            Ok(feed) => feed,
            Err(e) => {
                tracing::warn!(
                    "Existing feed at {} is unreadable, starting fresh: {}",
                    self.path.display(),
                    e
                );
                return Vec::new();
            }
        };

        feed.entries
            .into_iter()
            .filter_map(|entry| {
                let title = entry.title.map(|t| t.content)?;
                let link = entry.links.first().map(|l| canonical_link(&l.href))?;
                let published = entry
                    .published
                    .or(entry.updated)
                    .map(|dt| dt.with_timezone(&self.offset).date_naive());

                Some(FeedEntry {
                    title,
                    link,
                    guid: entry.id,
                    published,
                })
            })
            .collect()
    }
}

impl Store for RssFileStore {
    fn load(&self, channel: &FeedChannel) -> Result<FeedDocument> {
        let mut document = FeedDocument::new(channel.clone());
        if !self.path.exists() {
            return Ok(document);
        }

        let body = fs::read(&self.path)?;
        document.entries = self.parse_entries(&body);
        tracing::debug!(
            "Loaded {} existing entries from {}",
            document.entries.len(),
            self.path.display()
        );
        Ok(document)
    }

    fn replace(&self, document: &FeedDocument) -> Result<()> {
        let xml = render(document, self.offset)?;
        write_atomic(&self.path, &xml)
    }
}

/// Serialize a document as RSS 2.0.
///
/// No build timestamps are emitted, so equal documents render to equal bytes.
pub fn render(document: &FeedDocument, offset: FixedOffset) -> Result<Vec<u8>> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    write_event(&mut writer, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut rss_start = BytesStart::new("rss");
    rss_start.push_attribute(("version", "2.0"));
    write_event(&mut writer, Event::Start(rss_start))?;
    write_event(&mut writer, Event::Start(BytesStart::new("channel")))?;

    let channel = &document.channel;
    write_text_element(&mut writer, "title", &channel.title)?;
    write_text_element(&mut writer, "link", &channel.link)?;
    write_text_element(&mut writer, "description", &channel.description)?;
    if let Some(ref language) = channel.language {
        write_text_element(&mut writer, "language", language)?;
    }

    for entry in &document.entries {
        write_event(&mut writer, Event::Start(BytesStart::new("item")))?;
        write_text_element(&mut writer, "title", &entry.title)?;
        write_text_element(&mut writer, "link", &entry.link)?;

        let mut guid = BytesStart::new("guid");
        guid.push_attribute(("isPermaLink", "false"));
        write_event(&mut writer, Event::Start(guid))?;
        write_event(&mut writer, Event::Text(BytesText::new(&sanitize_text(&entry.guid))))?;
        write_event(&mut writer, Event::End(BytesEnd::new("guid")))?;

        if let Some(pub_date) = entry.published.and_then(|date| format_pub_date(date, offset)) {
            write_text_element(&mut writer, "pubDate", &pub_date)?;
        }
        write_event(&mut writer, Event::End(BytesEnd::new("item")))?;
    }

    write_event(&mut writer, Event::End(BytesEnd::new("channel")))?;
    write_event(&mut writer, Event::End(BytesEnd::new("rss")))?;

    let mut out = writer.into_inner();
    out.push(b'\n');
    Ok(out)
}

/// RFC 2822 date at midnight of `date` in `offset`
fn format_pub_date(date: chrono::NaiveDate, offset: FixedOffset) -> Option<String> {
    date.and_hms_opt(0, 0, 0)?
        .and_local_timezone(offset)
        .single()
        .map(|dt| dt.to_rfc2822())
}

fn write_event<W: Write>(writer: &mut Writer<W>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| PagefeedError::FeedWrite(e.to_string()))
}

fn write_text_element<W: Write>(writer: &mut Writer<W>, name: &str, text: &str) -> Result<()> {
    write_event(writer, Event::Start(BytesStart::new(name)))?;
    write_event(writer, Event::Text(BytesText::new(&sanitize_text(text))))?;
    write_event(writer, Event::End(BytesEnd::new(name)))
}

/// Strip control characters XML 1.0 does not allow (tab, LF and CR stay).
fn sanitize_text(input: &str) -> String {
    input
        .chars()
        .filter(|&c| matches!(c, '\t' | '\n' | '\r') || c >= '\u{20}')
        .collect()
}

/// Write to a temp file next to `path`, then rename over it.
fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
