//! Policy evaluation.

use super::signal::EnvironmentSignal;
use std::fmt;
use tracing::debug;

/// Why the heavy resource was not acquired.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FallbackReason {
    /// Nothing prevents acquisition.
    #[default]
    None,
    /// The user prefers reduced motion.
    ReducedMotion,
    /// The user is on a constrained connection.
    SaveData,
}

impl FallbackReason {
    /// Text for the badge shown over the pinned poster.
    ///
    /// Returns `None` when no badge should be shown.
    pub fn badge_label(&self) -> Option<&'static str> {
        match self {
            FallbackReason::None => None,
            FallbackReason::ReducedMotion => Some("Reduced motion mode"),
            FallbackReason::SaveData => Some("Data saver enabled"),
        }
    }
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FallbackReason::None => "none",
            FallbackReason::ReducedMotion => "reduced-motion",
            FallbackReason::SaveData => "save-data",
        };
        f.write_str(s)
    }
}

/// Result of evaluating the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyDecision {
    pub should_acquire_heavy_resource: bool,
    pub reason: FallbackReason,
}

impl PolicyDecision {
    /// A decision that permits acquisition.
    pub const PERMIT: PolicyDecision = PolicyDecision {
        should_acquire_heavy_resource: true,
        reason: FallbackReason::None,
    };

    fn forbid(reason: FallbackReason) -> Self {
        Self {
            should_acquire_heavy_resource: false,
            reason,
        }
    }
}

/// Acquisition policy over a signal snapshot.
///
/// Holds the most recent snapshot so the host can re-evaluate when its
/// subscription reports a change.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentPolicy {
    signal: EnvironmentSignal,
}

impl EnvironmentPolicy {
    pub fn new(signal: EnvironmentSignal) -> Self {
        Self { signal }
    }

    /// Current snapshot.
    pub fn signal(&self) -> EnvironmentSignal {
        self.signal
    }

    /// Replaces the snapshot, returning true if the decision changed.
    pub fn update(&mut self, signal: EnvironmentSignal) -> bool {
        let before = self.evaluate();
        self.signal = signal;
        let after = self.evaluate();

        if before != after {
            debug!(
                reduced_motion = signal.reduced_motion,
                save_data = signal.save_data,
                reason = %after.reason,
                "Acquisition policy changed"
            );
        }
        before != after
    }

    /// Evaluates the current snapshot.
    pub fn evaluate(&self) -> PolicyDecision {
        Self::decide(self.signal)
    }

    /// Pure decision function. Reduced motion wins over save-data.
    pub fn decide(signal: EnvironmentSignal) -> PolicyDecision {
        if signal.reduced_motion {
            PolicyDecision::forbid(FallbackReason::ReducedMotion)
        } else if signal.save_data {
            PolicyDecision::forbid(FallbackReason::SaveData)
        } else {
            PolicyDecision::PERMIT
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permits_when_no_signal_set() {
        let decision = EnvironmentPolicy::decide(EnvironmentSignal::new(false, false));
        assert_eq!(decision, PolicyDecision::PERMIT);
        assert!(decision.reason.badge_label().is_none());
    }

    #[test]
    fn test_reduced_motion_forbids() {
        let decision = EnvironmentPolicy::decide(EnvironmentSignal::new(true, false));
        assert!(!decision.should_acquire_heavy_resource);
        assert_eq!(decision.reason, FallbackReason::ReducedMotion);
    }

    #[test]
    fn test_save_data_forbids() {
        let decision = EnvironmentPolicy::decide(EnvironmentSignal::new(false, true));
        assert!(!decision.should_acquire_heavy_resource);
        assert_eq!(decision.reason, FallbackReason::SaveData);
    }

    #[test]
    fn test_reduced_motion_takes_precedence() {
        let decision = EnvironmentPolicy::decide(EnvironmentSignal::new(true, true));
        assert_eq!(decision.reason, FallbackReason::ReducedMotion);
    }

    #[test]
    fn test_update_reports_decision_change() {
        let mut policy = EnvironmentPolicy::default();
        assert!(!policy.update(EnvironmentSignal::new(false, false)));
        assert!(policy.update(EnvironmentSignal::new(true, false)));
        // Still forbidden, reason unchanged
        assert!(!policy.update(EnvironmentSignal::new(true, false)));
        // Still forbidden but for a different reason
        assert!(policy.update(EnvironmentSignal::new(false, true)));
        assert_eq!(policy.evaluate().reason, FallbackReason::SaveData);
    }

    #[test]
    fn test_badge_labels() {
        assert_eq!(
            FallbackReason::ReducedMotion.badge_label(),
            Some("Reduced motion mode")
        );
        assert_eq!(FallbackReason::SaveData.badge_label(), Some("Data saver enabled"));
    }
}
