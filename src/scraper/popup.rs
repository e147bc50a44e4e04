//! Ordered, best-effort popup dismissal.
//!
//! Consent and age-confirmation interstitials are cleared by clicking buttons
//! with known labels, one after another. A missing button is not an error:
//! the sequence is abandoned and the run carries on with whatever the page
//! currently shows.

use std::time::Duration;

use async_trait::async_trait;

use crate::app::Result;
use crate::scraper::PopupConfig;

/// Page capable of clicking an element by its exact visible text.
#[async_trait]
pub trait PopupTarget: Send + Sync {
    /// Wait up to `timeout` for a visible clickable element whose text is
    /// exactly `label`, and click it.
    ///
    /// Returns `Ok(false)` when no such element appeared in time.
    async fn click_exact_text(&self, label: &str, timeout: Duration) -> Result<bool>;

    /// Let the page settle after a dismissal
    async fn settle(&self, pause: Duration) {
        tokio::time::sleep(pause).await;
    }
}

/// One configured dismissal step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopupStep {
    pub label: String,
    /// 1-based position in the sequence
    pub index: usize,
    pub timeout: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceState {
    /// Steps remain; `next` is the 0-based position of the next one
    Pending { next: usize },
    /// Every step was dismissed (or there were none)
    Settled,
    /// The 1-based step that could not be dismissed; later steps were skipped
    Abandoned { step: usize },
}

/// Drives popup steps in order, abandoning on the first miss.
#[derive(Debug, Clone)]
pub struct PopupSequencer {
    steps: Vec<PopupStep>,
    pause: Duration,
    state: SequenceState,
}

impl PopupSequencer {
    pub fn new(steps: Vec<PopupStep>, pause: Duration) -> Self {
        let state = if steps.is_empty() {
            SequenceState::Settled
        } else {
            SequenceState::Pending { next: 0 }
        };
        Self {
            steps,
            pause,
            state,
        }
    }

    /// Build the sequence from configuration; a disabled config yields no steps.
    pub fn from_config(config: &PopupConfig) -> Self {
        if !config.enabled {
            return Self::new(Vec::new(), config.wait_between());
        }

        let steps = config
            .buttons
            .iter()
            .enumerate()
            .map(|(i, label)| PopupStep {
                label: label.clone(),
                index: i + 1,
                timeout: config.button_timeout(),
            })
            .collect();

        Self::new(steps, config.wait_between())
    }

    pub fn state(&self) -> SequenceState {
        self.state
    }

    pub fn steps(&self) -> &[PopupStep] {
        &self.steps
    }

    /// Advance by one step. Returns the new state.
    pub async fn step<P: PopupTarget + ?Sized>(&mut self, page: &P) -> SequenceState {
        let SequenceState::Pending { next } = self.state else {
            return self.state;
        };

        let step = &self.steps[next];
        if dismiss_in_order(page, &step.label, step.index, step.timeout).await {
            page.settle(self.pause).await;
            self.state = if next + 1 < self.steps.len() {
                SequenceState::Pending { next: next + 1 }
            } else {
                SequenceState::Settled
            };
        } else {
            let skipped = self.steps.len() - next - 1;
            if skipped > 0 {
                tracing::info!("Abandoning {} remaining popup step(s)", skipped);
            }
            self.state = SequenceState::Abandoned { step: step.index };
        }

        self.state
    }

    /// Run until settled or abandoned.
    pub async fn run<P: PopupTarget + ?Sized>(mut self, page: &P) -> SequenceState {
        while let SequenceState::Pending { .. } = self.state {
            self.step(page).await;
        }
        self.state
    }
}

/// Click the button labelled exactly `label`, tolerating its absence.
///
/// Returns whether the popup was handled. Failures are logged, never raised.
pub async fn dismiss_in_order<P: PopupTarget + ?Sized>(
    page: &P,
    label: &str,
    step_index: usize,
    timeout: Duration,
) -> bool {
    match page.click_exact_text(label, timeout).await {
        Ok(true) => {
            tracing::info!("Popup step {}: clicked {:?}", step_index, label);
            true
        }
        Ok(false) => {
            tracing::warn!(
                "Popup step {}: {:?} not found within {}ms",
                step_index,
                label,
                timeout.as_millis()
            );
            false
        }
        Err(e) => {
            tracing::warn!("Popup step {}: clicking {:?} failed: {}", step_index, label, e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::PagefeedError;
    use std::sync::Mutex;

    /// Page where only `present` labels can be clicked
    struct FakePage {
        present: Vec<&'static str>,
        broken: bool,
        attempts: Mutex<Vec<String>>,
        pauses: Mutex<Vec<Duration>>,
    }

    impl FakePage {
        fn with(present: &[&'static str]) -> Self {
            Self {
                present: present.to_vec(),
                broken: false,
                attempts: Mutex::new(Vec::new()),
                pauses: Mutex::new(Vec::new()),
            }
        }

        fn attempts(&self) -> Vec<String> {
            self.attempts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PopupTarget for FakePage {
        async fn click_exact_text(&self, label: &str, _timeout: Duration) -> Result<bool> {
            self.attempts.lock().unwrap().push(label.to_string());
            if self.broken {
                return Err(PagefeedError::Browser("target closed".into()));
            }
            Ok(self.present.iter().any(|p| *p == label))
        }

        async fn settle(&self, pause: Duration) {
            self.pauses.lock().unwrap().push(pause);
        }
    }

    fn config(buttons: &[&str]) -> PopupConfig {
        PopupConfig {
            buttons: buttons.iter().map(|b| b.to_string()).collect(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_all_steps_dismissed() {
        let page = FakePage::with(&["はい", "同意"]);
        let state = PopupSequencer::from_config(&config(&["はい", "同意"]))
            .run(&page)
            .await;

        assert_eq!(state, SequenceState::Settled);
        assert_eq!(page.attempts(), vec!["はい", "同意"]);
        assert_eq!(page.pauses.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_first_step_missing_abandons_rest() {
        let page = FakePage::with(&["同意"]);
        let state = PopupSequencer::from_config(&config(&["はい", "同意"]))
            .run(&page)
            .await;

        assert_eq!(state, SequenceState::Abandoned { step: 1 });
        assert_eq!(page.attempts(), vec!["はい"]);
        assert!(page.pauses.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_second_step_missing() {
        let page = FakePage::with(&["OK"]);
        let state = PopupSequencer::from_config(&config(&["OK", "Accept", "Close"]))
            .run(&page)
            .await;

        assert_eq!(state, SequenceState::Abandoned { step: 2 });
        assert_eq!(page.attempts(), vec!["OK", "Accept"]);
    }

    #[tokio::test]
    async fn test_browser_error_is_not_raised() {
        let mut page = FakePage::with(&["はい"]);
        page.broken = true;
        assert!(!dismiss_in_order(&page, "はい", 1, Duration::from_millis(10)).await);
    }

    #[tokio::test]
    async fn test_stepwise_transitions() {
        let page = FakePage::with(&["A", "B"]);
        let mut sequencer = PopupSequencer::from_config(&config(&["A", "B"]));

        assert_eq!(sequencer.state(), SequenceState::Pending { next: 0 });
        assert_eq!(sequencer.step(&page).await, SequenceState::Pending { next: 1 });
        assert_eq!(sequencer.step(&page).await, SequenceState::Settled);
        // Terminal states do not touch the page again
        assert_eq!(sequencer.step(&page).await, SequenceState::Settled);
        assert_eq!(page.attempts().len(), 2);
    }

    #[test]
    fn test_disabled_config_is_settled() {
        let config = PopupConfig {
            enabled: false,
            ..config(&["はい"])
        };
        let sequencer = PopupSequencer::from_config(&config);
        assert_eq!(sequencer.state(), SequenceState::Settled);
        assert!(sequencer.steps().is_empty());

        let page = FakePage::with(&["はい"]);
        let state = tokio_test::block_on(sequencer.run(&page));
        assert_eq!(state, SequenceState::Settled);
        assert!(page.attempts().is_empty());
    }

    #[test]
    fn test_steps_are_numbered_from_one() {
        let sequencer = PopupSequencer::from_config(&config(&["はい", "同意"]));
        let steps = sequencer.steps();
        assert_eq!(steps[0].index, 1);
        assert_eq!(steps[1].index, 2);
        assert_eq!(steps[1].label, "同意");
        assert_eq!(steps[0].timeout, Duration::from_millis(12_000));
    }
}
