use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Configuration for the headless browser
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// Whether to run the browser in headless mode (default: true)
    pub headless: bool,

    /// Navigation and load-state timeout in seconds (default: 240)
    pub navigation_timeout_secs: u64,

    /// User agent string to use
    pub user_agent: Option<String>,

    /// Browser locale, e.g. "ja-JP"
    pub locale: Option<String>,

    /// Accept-Language header value
    pub accept_language: Option<String>,

    /// Viewport width in pixels (default: 1366)
    pub window_width: u32,

    /// Viewport height in pixels (default: 900)
    pub window_height: u32,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            headless: true,
            navigation_timeout_secs: 240,
            user_agent: Some(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                    .to_string(),
            ),
            locale: None,
            accept_language: None,
            window_width: 1366,
            window_height: 900,
        }
    }
}

impl ScraperConfig {
    /// Get the navigation timeout as a Duration
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }
}

/// Selectors and date pattern describing one listing page.
///
/// Row selectors address the repeating element of the listing; the
/// `*_selector` fields are evaluated inside a row, and `*_index` picks the
/// n-th (0-based) match when a sub-selector hits several nodes. An empty
/// sub-selector means the row element itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Selector for the rows carrying the title and link
    pub title_root: String,

    /// Selector for the rows carrying the date (default: `title_root`)
    #[serde(default)]
    pub date_root: Option<String>,

    #[serde(default)]
    pub title_selector: String,

    #[serde(default)]
    pub title_index: usize,

    #[serde(default)]
    pub href_selector: String,

    #[serde(default)]
    pub href_index: usize,

    #[serde(default)]
    pub date_selector: String,

    #[serde(default)]
    pub date_index: usize,

    /// chrono format applied to the regex match, e.g. `%b %d, %Y`
    pub date_format: String,

    /// Regex locating the date inside the date cell text
    pub date_regex: String,

    /// Base for resolving relative links (default: the site URL)
    #[serde(default)]
    pub base_url: Option<Url>,
}

impl ExtractionConfig {
    /// Selector for date rows, falling back to the title rows
    pub fn date_root(&self) -> &str {
        self.date_root.as_deref().unwrap_or(&self.title_root)
    }

    /// Whether titles and dates come from the same row elements
    pub fn shares_rows(&self) -> bool {
        self.date_root() == self.title_root
    }
}

/// Ordered popup dismissal settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PopupConfig {
    /// Whether popup dismissal runs at all (default: true)
    pub enabled: bool,

    /// Exact button labels, clicked top to bottom
    pub buttons: Vec<String>,

    /// How long to wait for each button in milliseconds (default: 12000)
    pub button_timeout_ms: u64,

    /// Pause after each successful click in milliseconds (default: 500)
    pub wait_between_ms: u64,
}

impl Default for PopupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            buttons: Vec::new(),
            button_timeout_ms: 12_000,
            wait_between_ms: 500,
        }
    }
}

impl PopupConfig {
    pub fn button_timeout(&self) -> Duration {
        Duration::from_millis(self.button_timeout_ms)
    }

    pub fn wait_between(&self) -> Duration {
        Duration::from_millis(self.wait_between_ms)
    }

    /// Whether there is anything to dismiss
    pub fn is_active(&self) -> bool {
        self.enabled && !self.buttons.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_scraper_config_values() {
        let config = ScraperConfig::default();
        assert!(config.headless);
        assert_eq!(config.navigation_timeout_secs, 240);
        assert_eq!(config.window_width, 1366);
        assert_eq!(config.window_height, 900);
        assert!(config.user_agent.is_some());
        assert_eq!(config.navigation_timeout(), Duration::from_secs(240));
    }

    #[test]
    fn test_extraction_config_defaults() {
        let config: ExtractionConfig = toml::from_str(
            r#"
title_root = "ul.news > li"
date_format = "%Y.%m.%d"
date_regex = '\d{4}\.\d{2}\.\d{2}'
"#,
        )
        .unwrap();

        assert_eq!(config.title_selector, "");
        assert_eq!(config.href_selector, "");
        assert_eq!(config.title_index, 0);
        assert_eq!(config.date_root(), "ul.news > li");
        assert!(config.shares_rows());
        assert!(config.base_url.is_none());
    }

    #[test]
    fn test_extraction_config_separate_date_rows() {
        let config: ExtractionConfig = toml::from_str(
            r#"
title_root = "dd"
date_root = "dt"
date_format = "%Y.%m.%d"
date_regex = '\d{4}\.\d{2}\.\d{2}'
"#,
        )
        .unwrap();

        assert_eq!(config.date_root(), "dt");
        assert!(!config.shares_rows());
    }

    #[test]
    fn test_extraction_config_requires_date_pattern() {
        let result: Result<ExtractionConfig, _> = toml::from_str(r#"title_root = "li""#);
        assert!(result.is_err());
    }

    #[test]
    fn test_popup_defaults() {
        let config = PopupConfig::default();
        assert!(config.enabled);
        assert!(!config.is_active());
        assert_eq!(config.button_timeout(), Duration::from_millis(12_000));
        assert_eq!(config.wait_between(), Duration::from_millis(500));
    }

    #[test]
    fn test_popup_disabled_is_inactive() {
        let config = PopupConfig {
            enabled: false,
            buttons: vec!["はい".into()],
            ..Default::default()
        };
        assert!(!config.is_active());
    }
}
