use async_trait::async_trait;

use crate::app::Result;
use crate::scraper::popup::PopupTarget;

/// Document readiness levels that can be waited for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    /// `document.readyState` is past "loading"
    DomContentLoaded,
    /// `document.readyState` is "complete"
    Load,
}

impl LoadState {
    pub(crate) fn name(self) -> &'static str {
        match self {
            LoadState::DomContentLoaded => "domcontentloaded",
            LoadState::Load => "load",
        }
    }

    pub(crate) fn reached(self, ready_state: &str) -> bool {
        match self {
            LoadState::DomContentLoaded => ready_state != "loading",
            LoadState::Load => ready_state == "complete",
        }
    }
}

/// A live page a listing is rendered in.
///
/// The runner only talks to this trait; [`ChromeSession`](super::ChromeSession)
/// is the real implementation.
#[async_trait]
pub trait ListingPage: PopupTarget + Sized {
    /// Navigate to `url`. Exceeding the navigation timeout is fatal.
    async fn navigate(&self, url: &str) -> Result<()>;

    async fn wait_for_load_state(&self, state: LoadState) -> Result<()>;

    /// URL the page ended up on after redirects
    async fn current_url(&self) -> Option<String>;

    /// Serialized DOM of the rendered page
    async fn content(&self) -> Result<String>;

    /// Release the page and whatever hosts it
    async fn close(self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_state_reached() {
        assert!(!LoadState::DomContentLoaded.reached("loading"));
        assert!(LoadState::DomContentLoaded.reached("interactive"));
        assert!(LoadState::DomContentLoaded.reached("complete"));
        assert!(!LoadState::Load.reached("interactive"));
        assert!(LoadState::Load.reached("complete"));
    }
}
