use std::time::{Duration, Instant};

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetLocaleOverrideParams;
use chromiumoxide::cdp::browser_protocol::network::{Headers, SetExtraHttpHeadersParams};
use chromiumoxide::error::CdpError;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::page::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;

use crate::app::{PagefeedError, Result};
use crate::scraper::config::ScraperConfig;
use crate::scraper::page::{ListingPage, LoadState};
use crate::scraper::popup::PopupTarget;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// A headless Chromium with a single page, driven serially.
///
/// Call [`ListingPage::close`] on every exit path; the browser process is
/// not reaped otherwise.
pub struct ChromeSession {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    config: ScraperConfig,
}

impl ChromeSession {
    /// Launch the browser and open a blank page
    pub async fn launch(config: ScraperConfig) -> Result<Self> {
        let mut builder = BrowserConfig::builder()
            .arg("--no-sandbox")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-software-rasterizer")
            .window_size(config.window_width, config.window_height)
            .viewport(page_viewport(&config))
            // CDP requests, navigation included, are otherwise cut off at 30s
            .request_timeout(config.navigation_timeout());

        if let Some(ref locale) = config.locale {
            builder = builder.arg(format!("--lang={}", locale));
        }
        if let Some(ref languages) = config.accept_language {
            builder = builder.arg(format!("--accept-lang={}", languages));
        }
        if !config.headless {
            builder = builder.with_head();
        }

        let browser_config = builder
            .build()
            .map_err(|e| PagefeedError::Browser(format!("Failed to build browser config: {}", e)))?;

        let (browser, mut handler) = Browser::launch(browser_config).await.map_err(|e| {
            PagefeedError::Browser(format!(
                "Failed to launch browser: {}. Is Chrome or Chromium installed and in PATH?",
                e
            ))
        })?;

        let handler = tokio::spawn(async move {
            while let Some(_event) = handler.next().await {}
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                let session_error = PagefeedError::Browser(format!("Failed to create page: {}", e));
                Self::shutdown(browser, handler).await;
                return Err(session_error);
            }
        };

        let session = Self {
            browser,
            page,
            handler,
            config,
        };

        if let Err(e) = session.prepare_page().await {
            session.close().await;
            return Err(e);
        }

        Ok(session)
    }

    /// User agent, locale and Accept-Language for every request the page makes
    async fn prepare_page(&self) -> Result<()> {
        if let Some(ref ua) = self.config.user_agent {
            self.page
                .set_user_agent(ua)
                .await
                .map_err(|e| PagefeedError::Browser(format!("Failed to set user agent: {}", e)))?;
        }

        if let Some(ref locale) = self.config.locale {
            let params = SetLocaleOverrideParams::builder()
                .locale(icu_locale(locale))
                .build();
            self.page
                .execute(params)
                .await
                .map_err(|e| PagefeedError::Browser(format!("Failed to set locale: {}", e)))?;
        }

        if let Some(headers) = extra_headers(&self.config) {
            self.page
                .execute(SetExtraHttpHeadersParams::new(Headers::new(headers)))
                .await
                .map_err(|e| PagefeedError::Browser(format!("Failed to set headers: {}", e)))?;
        }

        Ok(())
    }

    async fn shutdown(mut browser: Browser, handler: JoinHandle<()>) {
        if let Err(e) = browser.close().await {
            tracing::debug!("Failed to close browser: {}", e);
        }
        if let Err(e) = browser.wait().await {
            tracing::debug!("Failed to wait for browser exit: {}", e);
        }
        handler.abort();
    }

    async fn evaluate<T: serde::de::DeserializeOwned>(&self, script: &str) -> Result<T> {
        self.page
            .evaluate(script)
            .await
            .map_err(|e| PagefeedError::Browser(format!("Script execution failed: {}", e)))?
            .into_value()
            .map_err(|e| PagefeedError::Browser(format!("Failed to parse result: {:?}", e)))
    }
}

#[async_trait]
impl ListingPage for ChromeSession {
    /// Bounded by the navigation timeout; there is no retry.
    async fn navigate(&self, url: &str) -> Result<()> {
        let timeout = self.config.navigation_timeout();
        let outcome = tokio::time::timeout(timeout, self.page.goto(url))
            .await
            .ok()
            .map(|result| result.map(|_| ()));
        navigation_result(url, timeout, outcome)
    }

    /// Poll `document.readyState` until `state` is reached
    async fn wait_for_load_state(&self, state: LoadState) -> Result<()> {
        let timeout = self.config.navigation_timeout();
        let start = Instant::now();

        loop {
            match self.evaluate::<String>("document.readyState").await {
                Ok(ready_state) if state.reached(&ready_state) => return Ok(()),
                Ok(_) => {}
                Err(e) if is_context_lost(&e) => {}
                Err(e) => return Err(e),
            }

            if start.elapsed() > timeout {
                return Err(PagefeedError::LoadStateTimeout {
                    url: self.current_url().await.unwrap_or_default(),
                    state: state.name(),
                    timeout,
                });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn current_url(&self) -> Option<String> {
        self.page.url().await.ok().flatten()
    }

    async fn content(&self) -> Result<String> {
        self.page
            .content()
            .await
            .map_err(|e| PagefeedError::Browser(format!("Failed to read page content: {}", e)))
    }

    /// Close the browser and reap its process
    async fn close(self) {
        let Self {
            browser,
            page,
            handler,
            ..
        } = self;

        if let Err(e) = page.close().await {
            tracing::debug!("Failed to close page: {}", e);
        }
        Self::shutdown(browser, handler).await;
    }
}

#[async_trait]
impl PopupTarget for ChromeSession {
    async fn click_exact_text(&self, label: &str, timeout: Duration) -> Result<bool> {
        let script = click_script(label)?;
        let start = Instant::now();

        loop {
            match self.evaluate::<bool>(&script).await {
                Ok(true) => return Ok(true),
                Ok(false) => {}
                Err(e) if is_context_lost(&e) => {}
                Err(e) => return Err(e),
            }

            if start.elapsed() > timeout {
                return Ok(false);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

/// JavaScript that clicks the first visible element whose text is exactly `label`.
///
/// Button-like elements are preferred; otherwise the innermost matching
/// element wins.
fn click_script(label: &str) -> Result<String> {
    let label = serde_json::to_string(label)
        .map_err(|e| PagefeedError::Browser(format!("Failed to encode label: {}", e)))?;

    Ok(format!(
        r#"
        ((label) => {{
            const visible = (el) => {{
                const rect = el.getBoundingClientRect();
                const style = window.getComputedStyle(el);
                return rect.width > 0 && rect.height > 0
                    && style.visibility !== 'hidden' && style.display !== 'none';
            }};
            const textOf = (el) => (el.tagName === 'INPUT' ? el.value : el.innerText || el.textContent || '').trim();
            const matches = (selector) => Array.from(document.querySelectorAll(selector))
                .filter((el) => textOf(el) === label && visible(el));

            const buttons = matches('button, [role="button"], input[type="button"], input[type="submit"], a');
            const fallback = matches('label, span, div, p, li');
            const target = buttons[0] || fallback[fallback.length - 1];
            if (!target) {{
                return false;
            }}
            target.click();
            return true;
        }})({label})
        "#
    ))
}

/// Map a navigation outcome to the run's error kinds.
///
/// `None` means our own deadline fired first. The browser's request timeout
/// is set to the same value and reports [`CdpError::Timeout`] instead.
fn navigation_result(
    url: &str,
    timeout: Duration,
    outcome: Option<std::result::Result<(), CdpError>>,
) -> Result<()> {
    match outcome {
        None | Some(Err(CdpError::Timeout)) => Err(PagefeedError::NavigationTimeout {
            url: url.to_string(),
            timeout,
        }),
        Some(Err(e)) => Err(PagefeedError::Browser(format!("Navigation failed: {}", e))),
        Some(Ok(())) => Ok(()),
    }
}

/// Emulated viewport; without it the page is laid out at 800x600 whatever
/// the window size
fn page_viewport(config: &ScraperConfig) -> Viewport {
    Viewport {
        width: config.window_width,
        height: config.window_height,
        ..Default::default()
    }
}

/// "ja-JP" → "ja_JP", the ICU form the emulation domain expects
fn icu_locale(locale: &str) -> String {
    locale.replace('-', "_")
}

fn extra_headers(config: &ScraperConfig) -> Option<serde_json::Value> {
    config
        .accept_language
        .as_ref()
        .map(|languages| serde_json::json!({ "Accept-Language": languages }))
}

fn is_context_lost(error: &PagefeedError) -> bool {
    let PagefeedError::Browser(message) = error else {
        return false;
    };
    message.contains("Cannot find context") || message.contains("Execution context was destroyed")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigation_timeouts_from_either_side() {
        let timeout = Duration::from_secs(240);
        for outcome in [None, Some(Err(CdpError::Timeout))] {
            match navigation_result("https://example.com/", timeout, outcome) {
                Err(PagefeedError::NavigationTimeout { url, timeout: t }) => {
                    assert_eq!(url, "https://example.com/");
                    assert_eq!(t, timeout);
                }
                other => panic!("expected navigation timeout, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_navigation_other_failures() {
        let timeout = Duration::from_secs(1);
        assert!(navigation_result("https://example.com/", timeout, Some(Ok(()))).is_ok());
        assert!(matches!(
            navigation_result("https://example.com/", timeout, Some(Err(CdpError::NoResponse))),
            Err(PagefeedError::Browser(_))
        ));
    }

    #[test]
    fn test_viewport_follows_window_size() {
        let viewport = page_viewport(&ScraperConfig::default());
        assert_eq!((viewport.width, viewport.height), (1366, 900));
        assert!(!viewport.emulating_mobile);
    }

    #[test]
    fn test_icu_locale() {
        assert_eq!(icu_locale("ja-JP"), "ja_JP");
        assert_eq!(icu_locale("en"), "en");
    }

    #[test]
    fn test_extra_headers_carry_accept_language() {
        let mut config = ScraperConfig::default();
        assert_eq!(extra_headers(&config), None);

        config.accept_language = Some("ja,en;q=0.8".into());
        assert_eq!(
            extra_headers(&config),
            Some(serde_json::json!({ "Accept-Language": "ja,en;q=0.8" }))
        );
    }

    #[test]
    fn test_click_script_embeds_label_as_json() {
        let script = click_script("はい").unwrap();
        assert!(script.contains(r#"})("はい")"#));

        let quoted = click_script(r#"Say "yes"')"#).unwrap();
        assert!(quoted.contains(r#"("Say \"yes\"')")"#));
    }

    #[test]
    fn test_context_loss_detection() {
        assert!(is_context_lost(&PagefeedError::Browser(
            "Script execution failed: Execution context was destroyed".into()
        )));
        assert!(!is_context_lost(&PagefeedError::Browser("target closed".into())));
        assert!(!is_context_lost(&PagefeedError::Config(
            "Execution context was destroyed".into()
        )));
    }
}
