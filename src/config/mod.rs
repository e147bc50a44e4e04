//! Per-site configuration.
//!
//! One TOML file describes one listing page: where it lives, how to clear its
//! popups, which selectors address its rows and how its dates are written.
//! The same engine runs every site; nothing site-specific lives in code.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{FixedOffset, Offset, Utc};
use serde::Deserialize;
use url::Url;

use crate::scraper::{ExtractionConfig, PopupConfig, ScraperConfig};

/// Configuration for one site.
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Listing page to navigate to; also the feed's channel link
    pub url: Url,

    pub feed_title: String,

    #[serde(default)]
    pub feed_description: Option<String>,

    /// Channel language, e.g. "ja"
    #[serde(default)]
    pub language: Option<String>,

    /// Feed file path (default: `rss_output/<file stem>.xml`)
    #[serde(default)]
    pub output: Option<PathBuf>,

    /// Offset used when writing publication dates (default: 0, i.e. UTC)
    #[serde(default)]
    pub utc_offset_minutes: i32,

    pub extraction: ExtractionConfig,

    #[serde(default)]
    pub popup: PopupConfig,

    #[serde(default)]
    pub browser: ScraperConfig,
}

impl SiteConfig {
    /// Load a site file. The output path defaults to the file stem under
    /// `rss_output/`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        let mut config = Self::from_toml(&content).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;

        if config.output.is_none() {
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "feed".to_string());
            config.output = Some(default_output_path(&stem));
        }

        Ok(config)
    }

    /// Parse configuration text.
    ///
    /// The extraction base URL falls back to the site URL.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let mut config: SiteConfig = toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: PathBuf::new(),
            source: e,
        })?;

        if config.feed_title.trim().is_empty() {
            return Err(ConfigError::Invalid("feed_title must not be empty".into()));
        }
        if config.extraction.title_root.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "extraction.title_root must not be empty".into(),
            ));
        }
        if offset_from_minutes(config.utc_offset_minutes).is_none() {
            return Err(ConfigError::Invalid(format!(
                "utc_offset_minutes out of range: {}",
                config.utc_offset_minutes
            )));
        }

        if config.extraction.base_url.is_none() {
            config.extraction.base_url = Some(config.url.clone());
        }

        Ok(config)
    }

    /// Feed file path, `rss_output/feed.xml` when nothing else was set
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| default_output_path("feed"))
    }

    pub fn utc_offset(&self) -> FixedOffset {
        offset_from_minutes(self.utc_offset_minutes).unwrap_or_else(|| Utc.fix())
    }
}

fn offset_from_minutes(minutes: i32) -> Option<FixedOffset> {
    minutes.checked_mul(60).and_then(FixedOffset::east_opt)
}

fn default_output_path(name: &str) -> PathBuf {
    Path::new("rss_output").join(format!("{}.xml", name))
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const SITE: &str = r#"
url = "https://www.example.co.jp/medical/info/topics"
feed_title = "Example Pharma (medical)"
language = "ja"
utc_offset_minutes = 540

[extraction]
title_root = "table.topics tbody tr:nth-of-type(n+2)"
href_selector = "a"
date_selector = "td"
date_format = "%b/%d %Y"
date_regex = '([A-Za-z]{3})/(\d{1,2})\s+(\d{4})'

[popup]
buttons = ["はい"]
button_timeout_ms = 12000

[browser]
locale = "ja-JP"
accept_language = "ja,en;q=0.8"
"#;

    #[test]
    fn test_full_site_config() {
        let config = SiteConfig::from_toml(SITE).expect("site config should parse");

        assert_eq!(config.feed_title, "Example Pharma (medical)");
        assert_eq!(config.language.as_deref(), Some("ja"));
        assert_eq!(config.extraction.href_selector, "a");
        assert_eq!(config.extraction.title_selector, "");
        assert_eq!(config.popup.buttons, vec!["はい"]);
        assert_eq!(config.popup.wait_between(), Duration::from_millis(500));
        assert_eq!(config.browser.locale.as_deref(), Some("ja-JP"));
        assert!(config.browser.headless);
        assert_eq!(config.utc_offset().local_minus_utc(), 9 * 3600);
    }

    #[test]
    fn test_base_url_defaults_to_site_url() {
        let config = SiteConfig::from_toml(SITE).unwrap();
        assert_eq!(config.extraction.base_url.as_ref(), Some(&config.url));
    }

    #[test]
    fn test_explicit_base_url_kept() {
        let content = SITE.replace(
            "[extraction]\n",
            "[extraction]\nbase_url = \"https://cdn.example.co.jp/\"\n",
        );
        let config = SiteConfig::from_toml(&content).unwrap();
        assert_eq!(
            config.extraction.base_url.unwrap().as_str(),
            "https://cdn.example.co.jp/"
        );
    }

    #[test]
    fn test_sections_default() {
        let content = r#"
url = "https://example.com/news"
feed_title = "News"

[extraction]
title_root = "li"
date_format = "%Y-%m-%d"
date_regex = '\d{4}-\d{2}-\d{2}'
"#;
        let config = SiteConfig::from_toml(content).unwrap();
        assert!(config.popup.buttons.is_empty());
        assert_eq!(config.browser.navigation_timeout_secs, 240);
        assert_eq!(config.utc_offset_minutes, 0);
        assert!(config.output.is_none());
        assert_eq!(config.output_path(), PathBuf::from("rss_output/feed.xml"));
    }

    #[test]
    fn test_missing_url_is_parse_error() {
        let content = SITE.replace("url = \"https://www.example.co.jp/medical/info/topics\"\n", "");
        assert!(matches!(
            SiteConfig::from_toml(&content),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_empty_title_rejected() {
        let content = SITE.replace("Example Pharma (medical)", " ");
        assert!(matches!(
            SiteConfig::from_toml(&content),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_offset_out_of_range_rejected() {
        let content = SITE.replace("utc_offset_minutes = 540", "utc_offset_minutes = 100000");
        assert!(matches!(
            SiteConfig::from_toml(&content),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_offset_overflowing_seconds_rejected() {
        for minutes in ["100000000", "-100000000", "2147483647"] {
            let content = SITE.replace(
                "utc_offset_minutes = 540",
                &format!("utc_offset_minutes = {}", minutes),
            );
            assert!(matches!(
                SiteConfig::from_toml(&content),
                Err(ConfigError::Invalid(_))
            ));
        }
    }

    #[test]
    fn test_negative_offset() {
        let content = SITE.replace("utc_offset_minutes = 540", "utc_offset_minutes = -300");
        let config = SiteConfig::from_toml(&content).unwrap();
        assert_eq!(config.utc_offset().local_minus_utc(), -5 * 3600);
    }

    #[test]
    fn test_load_derives_output_from_file_stem() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("npi-medical.toml");
        fs::write(&path, SITE).unwrap();

        let config = SiteConfig::load(&path).unwrap();
        assert_eq!(
            config.output_path(),
            PathBuf::from("rss_output/npi-medical.xml")
        );
    }

    #[test]
    fn test_load_reports_path_on_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        fs::write(&path, "url = ").unwrap();

        match SiteConfig::load(&path) {
            Err(ConfigError::Parse { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = SiteConfig::load(&dir.path().join("absent.toml"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
