//! Viewer state machine.
//!
//! Pure transition logic: [`ViewerStateMachine::apply`] takes a [`Trigger`]
//! and returns the [`Effect`]s the host must carry out. Timers, sessions and
//! the hint are owned by the host; the machine only decides.
//!
//! ```text
//! Poster --[mounted, policy permits]--> Loading      (Acquire, ArmWatchdog)
//! Poster --[mounted, policy forbids]--> Poster       (ShowBadge)
//! Loading --[session ready]-----------> Ready        (ActivateHint, StartAutoRotate)
//! Loading --[session failed]----------> Error        (Dispose)
//! Loading --[watchdog expired]--------> Error        (Dispose)
//! any --[unmounted]-------------------> Poster       (Dispose)
//! ```
//!
//! `Ready` and `Error` are terminal for an asset: late session signals and
//! watchdog expiries are ignored there.

use std::fmt;
use tokio::sync::watch;
use tracing::{info, trace};

use crate::policy::{FallbackReason, PolicyDecision};
use crate::session::ViewerErrorKind;

/// Observable state of a mounted viewer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ViewerState {
    /// Poster image only. Initial state, and terminal when policy forbids 3D.
    #[default]
    Poster,
    /// Session acquiring; poster still visible.
    Loading,
    /// Model on screen.
    Ready,
    /// Acquisition failed or timed out; poster shown indefinitely.
    Error,
}

impl fmt::Display for ViewerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewerState::Poster => f.write_str("poster"),
            ViewerState::Loading => f.write_str("loading"),
            ViewerState::Ready => f.write_str("ready"),
            ViewerState::Error => f.write_str("error"),
        }
    }
}

/// Input to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Host mounted with the policy decision evaluated at mount time.
    Mounted(PolicyDecision),
    SessionReady,
    SessionFailed(ViewerErrorKind),
    WatchdogExpired,
    /// Host unmounted or the asset changed.
    Unmounted,
}

/// Work the host performs after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Acquire,
    ArmWatchdog,
    CancelWatchdog,
    Dispose,
    ShowBadge(FallbackReason),
    ActivateHint,
    DeactivateHint,
    StartAutoRotate,
    EmitReady,
    EmitError(ViewerErrorKind),
}

/// Transition table for one mount.
#[derive(Debug)]
pub struct ViewerStateMachine {
    state_tx: watch::Sender<ViewerState>,
}

impl ViewerStateMachine {
    pub fn new() -> Self {
        let (state_tx, _) = watch::channel(ViewerState::Poster);
        Self { state_tx }
    }

    pub fn state(&self) -> ViewerState {
        *self.state_tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewerState> {
        self.state_tx.subscribe()
    }

    /// Applies a trigger and returns the effects to perform, in order.
    ///
    /// Triggers that do not apply to the current state are ignored and
    /// produce no effects.
    pub fn apply(&mut self, trigger: Trigger) -> Vec<Effect> {
        let from = self.state();

        let (to, effects) = match (from, trigger) {
            (ViewerState::Poster, Trigger::Mounted(decision)) => {
                if decision.should_acquire_heavy_resource {
                    (
                        ViewerState::Loading,
                        vec![Effect::Acquire, Effect::ArmWatchdog],
                    )
                } else {
                    (ViewerState::Poster, vec![Effect::ShowBadge(decision.reason)])
                }
            }
            (ViewerState::Loading, Trigger::SessionReady) => (
                ViewerState::Ready,
                vec![
                    Effect::CancelWatchdog,
                    Effect::ActivateHint,
                    Effect::StartAutoRotate,
                    Effect::EmitReady,
                ],
            ),
            (ViewerState::Loading, Trigger::SessionFailed(kind)) => (
                ViewerState::Error,
                vec![Effect::CancelWatchdog, Effect::Dispose, Effect::EmitError(kind)],
            ),
            (ViewerState::Loading, Trigger::WatchdogExpired) => (
                ViewerState::Error,
                vec![
                    Effect::CancelWatchdog,
                    Effect::Dispose,
                    Effect::EmitError(ViewerErrorKind::AcquisitionTimeout),
                ],
            ),
            (ViewerState::Loading, Trigger::Unmounted) => (
                ViewerState::Poster,
                vec![Effect::CancelWatchdog, Effect::Dispose],
            ),
            (ViewerState::Ready, Trigger::Unmounted) => (
                ViewerState::Poster,
                vec![Effect::DeactivateHint, Effect::Dispose],
            ),
            (ViewerState::Poster | ViewerState::Error, Trigger::Unmounted) => {
                (ViewerState::Poster, vec![Effect::Dispose])
            }
            (state, trigger) => {
                trace!(%state, ?trigger, "Trigger ignored");
                return Vec::new();
            }
        };

        if from != to {
            info!(from = %from, to = %to, ?trigger, "Viewer state transition");
            self.state_tx.send_replace(to);
        }
        effects
    }
}

impl Default for ViewerStateMachine {
    fn default() -> Self {
        Self::new()
    }
}
