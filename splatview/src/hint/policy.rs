//! Hint timing variants.

use std::time::Duration;

use crate::config::{DEFAULT_HINT_FADE_MS, DEFAULT_HINT_VISIBLE_MS};

/// How long the hint stays on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HintPolicy {
    /// Visible for `visible_for`, then fades over `fade`, then removed.
    FixedDuration { visible_for: Duration, fade: Duration },
    /// Visible until the first qualifying gesture, then fades over `fade`.
    UntilInteraction { fade: Duration },
}

impl HintPolicy {
    /// Fixed-duration policy with the default timings.
    pub fn fixed() -> Self {
        HintPolicy::FixedDuration {
            visible_for: Duration::from_millis(DEFAULT_HINT_VISIBLE_MS),
            fade: Duration::from_millis(DEFAULT_HINT_FADE_MS),
        }
    }

    /// Interaction-terminated policy with the default fade.
    pub fn until_interaction() -> Self {
        HintPolicy::UntilInteraction {
            fade: Duration::from_millis(DEFAULT_HINT_FADE_MS),
        }
    }

    /// Fade transition length.
    pub fn fade(&self) -> Duration {
        match self {
            HintPolicy::FixedDuration { fade, .. } | HintPolicy::UntilInteraction { fade } => *fade,
        }
    }

    /// Time at which the fade starts on its own, if the variant has one.
    pub fn visible_for(&self) -> Option<Duration> {
        match self {
            HintPolicy::FixedDuration { visible_for, .. } => Some(*visible_for),
            HintPolicy::UntilInteraction { .. } => None,
        }
    }

    /// True when a gesture retires the hint.
    pub fn ends_on_interaction(&self) -> bool {
        matches!(self, HintPolicy::UntilInteraction { .. })
    }
}

impl Default for HintPolicy {
    fn default() -> Self {
        Self::fixed()
    }
}
