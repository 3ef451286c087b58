//! Wake phrase gate
//!
//! Matches recognized text against the configured wake phrases and enforces
//! a debounce window between accepted wakes. Matches inside the window are
//! dropped, not queued.

use std::time::{Duration, Instant};

use bruno_config::WakeSettings;

/// Characters trimmed from both ends of a stripped command
const TRIM_CHARS: &[char] = &[' ', ',', '.', '?', '!'];

/// Debounce memory
///
/// Starts at "never"; only moves forward on an accepted wake.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WakeState {
    pub last_wake: Option<Instant>,
}

impl WakeState {
    /// Whether a wake at `now` falls outside the debounce window
    pub fn is_armed(&self, now: Instant, debounce: Duration) -> bool {
        match self.last_wake {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= debounce,
        }
    }
}

/// Wake gate configuration
#[derive(Debug, Clone)]
pub struct WakeConfig {
    /// Ordered wake phrases; stripping removes them in this order
    pub phrases: Vec<String>,
    pub debounce: Duration,
    /// Residual words needed for an inline command
    pub min_inline_words: usize,
}

impl Default for WakeConfig {
    fn default() -> Self {
        Self::from(&WakeSettings::default())
    }
}

impl From<&WakeSettings> for WakeConfig {
    fn from(settings: &WakeSettings) -> Self {
        Self {
            phrases: settings.phrases.clone(),
            debounce: settings.debounce(),
            min_inline_words: settings.min_inline_words,
        }
    }
}

/// Result of offering text to the gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeOutcome {
    /// No wake phrase in the text
    NoMatch,
    /// Phrase present but inside the debounce window
    Debounced { since_last: Duration },
    /// Wake accepted; state updated
    Accepted,
}

/// Wake phrase matcher with debounce
#[derive(Debug, Clone)]
pub struct WakeGate {
    phrases: Vec<String>,
    debounce: Duration,
    min_inline_words: usize,
    state: WakeState,
}

impl WakeGate {
    pub fn new(config: WakeConfig) -> Self {
        let phrases = config
            .phrases
            .iter()
            .map(|p| p.trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();

        Self {
            phrases,
            debounce: config.debounce,
            min_inline_words: config.min_inline_words,
            state: WakeState::default(),
        }
    }

    pub fn from_settings(settings: &WakeSettings) -> Self {
        Self::new(WakeConfig::from(settings))
    }

    pub fn state(&self) -> &WakeState {
        &self.state
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    /// Whether the case-folded text contains any wake phrase
    pub fn contains_wake(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        self.phrases.iter().any(|p| text.contains(p.as_str()))
    }

    /// Offer text to the gate at `now`
    pub fn evaluate(&mut self, text: &str, now: Instant) -> WakeOutcome {
        if !self.contains_wake(text) {
            return WakeOutcome::NoMatch;
        }

        if !self.state.is_armed(now, self.debounce) {
            let since_last = self
                .state
                .last_wake
                .map(|last| now.saturating_duration_since(last))
                .unwrap_or_default();
            tracing::debug!(?since_last, "Wake ignored inside debounce window");
            return WakeOutcome::Debounced { since_last };
        }

        self.state.last_wake = Some(now);
        WakeOutcome::Accepted
    }

    /// True iff a wake phrase matched and the debounce window has elapsed
    pub fn check(&mut self, text: &str, now: Instant) -> bool {
        self.evaluate(text, now) == WakeOutcome::Accepted
    }

    /// Remove every wake phrase and trim surrounding punctuation
    ///
    /// Output is lowercase with single spaces between words.
    pub fn strip_wake(&self, text: &str) -> String {
        let mut stripped = text.to_lowercase();
        for phrase in &self.phrases {
            stripped = stripped.replace(phrase.as_str(), "");
        }

        stripped
            .trim_matches(|c: char| TRIM_CHARS.contains(&c) || c.is_whitespace())
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Command spoken in the same utterance as the wake phrase, if long enough
    pub fn inline_command(&self, text: &str) -> Option<String> {
        let command = self.strip_wake(text);
        if command.split_whitespace().count() >= self.min_inline_words {
            Some(command)
        } else {
            None
        }
    }
}
