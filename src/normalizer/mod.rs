//! Date normalisation for listing rows.
//!
//! Listing pages print dates in whatever shape the site likes ("Aug 14, 2024",
//! "2024/08/14", "２０２４年８月１４日"). Each site pairs a regex that finds the
//! date inside the cell text with a chrono format. The regex's capture groups
//! are dropped into the format's `%` fields in order, so the format can spell
//! separators differently from the page. Month names are always read as
//! English, whatever the host locale.

use chrono::NaiveDate;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::app::Result;

const MONTHS: [(&str, u32); 24] = [
    ("jan", 1),
    ("january", 1),
    ("feb", 2),
    ("february", 2),
    ("mar", 3),
    ("march", 3),
    ("apr", 4),
    ("april", 4),
    ("may", 5),
    ("jun", 6),
    ("june", 6),
    ("jul", 7),
    ("july", 7),
    ("aug", 8),
    ("august", 8),
    ("sep", 9),
    ("sept", 9),
    ("september", 9),
    ("oct", 10),
    ("october", 10),
    ("nov", 11),
    ("november", 11),
    ("dec", 12),
    ("december", 12),
];

/// How a regex match becomes a date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    /// `year`, `month` and `day` named groups
    Named,
    /// Group *i* fills the *i*-th `%` field of the format
    Groups,
    /// No groups: the whole match is parsed against the format
    WholeMatch,
}

/// A compiled format/regex pair.
#[derive(Debug, Clone)]
pub struct DatePattern {
    format: String,
    regex: Regex,
    layout: Layout,
}

impl DatePattern {
    pub fn new(format: &str, regex: &str) -> Result<Self> {
        let regex = Regex::new(regex)?;
        let names: Vec<&str> = regex.capture_names().flatten().collect();
        let layout = if ["year", "month", "day"]
            .iter()
            .all(|group| names.contains(group))
        {
            Layout::Named
        } else if regex.captures_len() > 1 {
            Layout::Groups
        } else {
            Layout::WholeMatch
        };

        Ok(Self {
            format: format.to_string(),
            regex,
            layout,
        })
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    /// Find and parse a date inside `raw`.
    ///
    /// Returns `None` when the regex does not match or the match is not a
    /// real calendar date.
    pub fn normalize(&self, raw: &str) -> Option<NaiveDate> {
        let text = clean_text(raw);
        let caps = self.regex.captures(&text)?;

        let assembled = match self.layout {
            Layout::Named => {
                let year = parse_year(caps.name("year")?.as_str())?;
                let month = parse_month(caps.name("month")?.as_str())?;
                let day = caps.name("day")?.as_str().parse().ok()?;
                return NaiveDate::from_ymd_opt(year, month, day);
            }
            Layout::Groups => {
                reassemble(&self.format, caps.iter().skip(1).map(|g| g.map(|m| m.as_str())))?
            }
            Layout::WholeMatch => collapse_whitespace(caps.get(0)?.as_str()),
        };

        NaiveDate::parse_from_str(&assembled, &self.format).ok()
    }
}

/// Rebuild `format` with each `%` field replaced by the next group.
///
/// `%%` stays a literal. A field without a matching group yields `None`.
fn reassemble<'a>(
    format: &str,
    mut groups: impl Iterator<Item = Option<&'a str>>,
) -> Option<String> {
    let mut out = String::with_capacity(format.len() + 8);
    let mut chars = format.chars();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            '%' => out.push('%'),
            // padding modifiers (%-d, %_m, %0e) take one more spec char
            '-' | '_' | '0' => {
                chars.next()?;
                out.push_str(groups.next().flatten()?);
            }
            _ => out.push_str(groups.next().flatten()?),
        }
    }

    Some(out)
}

/// One-shot form of [`DatePattern::normalize`].
///
/// An invalid regex is logged and treated as "no match".
pub fn normalize(raw: &str, format: &str, regex: &str) -> Option<NaiveDate> {
    match DatePattern::new(format, regex) {
        Ok(pattern) => pattern.normalize(raw),
        Err(e) => {
            tracing::warn!("Ignoring date pattern {:?}: {}", regex, e);
            None
        }
    }
}

/// NFKC-fold (full-width digits and punctuation to ASCII) and collapse whitespace.
fn clean_text(raw: &str) -> String {
    let folded: String = raw.nfkc().collect();
    collapse_whitespace(&folded)
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn parse_year(s: &str) -> Option<i32> {
    let year: i32 = s.parse().ok()?;
    match s.len() {
        1 | 2 => Some(2000 + year),
        _ => Some(year),
    }
}

fn parse_month(s: &str) -> Option<u32> {
    if let Ok(n) = s.parse::<u32>() {
        return (1..=12).contains(&n).then_some(n);
    }
    let name = s.trim_end_matches('.').to_ascii_lowercase();
    MONTHS
        .iter()
        .find(|(candidate, _)| *candidate == name)
        .map(|(_, month)| *month)
}
