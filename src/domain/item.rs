use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One article row pulled off a listing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub title: String,
    /// Always absolute; relative hrefs are resolved at extraction time.
    pub url: String,
    pub published_at: NaiveDate,
}

impl Item {
    pub fn new(title: impl Into<String>, url: impl Into<String>, published_at: NaiveDate) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            published_at,
        }
    }

    pub fn guid(&self) -> String {
        Self::generate_guid(&self.title, &self.url)
    }

    /// Generate a deterministic guid from title and url
    pub fn generate_guid(title: &str, url: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(title.as_bytes());
        hasher.update([0u8]);
        hasher.update(url.as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_guid_deterministic() {
        let a = Item::new("Title", "https://example.com/a", date(2024, 1, 5));
        let b = Item::new("Title", "https://example.com/a", date(2024, 3, 1));
        assert_eq!(a.guid(), b.guid());
    }

    #[test]
    fn test_guid_different_inputs() {
        let id1 = Item::generate_guid("Title", "https://example.com/a");
        let id2 = Item::generate_guid("Title", "https://example.com/b");
        let id3 = Item::generate_guid("Other", "https://example.com/a");
        assert_ne!(id1, id2);
        assert_ne!(id1, id3);
    }

    #[test]
    fn test_guid_separates_fields() {
        let id1 = Item::generate_guid("ab", "c");
        let id2 = Item::generate_guid("a", "bc");
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_guid_is_hex_sha256() {
        let id = Item::generate_guid("Title", "https://example.com/a");
        assert_eq!(id.len(), 64);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_guid_ignores_date() {
        let a = Item::new("Title", "https://example.com/a", date(2024, 1, 5));
        let b = Item::new("Title", "https://example.com/a", date(2023, 12, 31));
        assert_eq!(a.guid(), b.guid());
        assert_ne!(a, b);
    }
}
