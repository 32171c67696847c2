//! Hint lifecycle task.

use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{broadcast, watch};
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::HintPolicy;
use crate::surface::{MountSurface, PointerInput};

/// Visibility of the hint overlay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HintState {
    pub visible: bool,
    pub fading: bool,
}

impl HintState {
    pub const HIDDEN: HintState = HintState {
        visible: false,
        fading: false,
    };
    pub const VISIBLE: HintState = HintState {
        visible: true,
        fading: false,
    };
    pub const FADING: HintState = HintState {
        visible: true,
        fading: true,
    };
}

/// Something that can stop ambient rotation.
pub trait AutoRotationControl: Send + Sync {
    fn stop_auto_rotation(&self);
}

struct HintShared {
    state_tx: watch::Sender<HintState>,
    /// Token of the running activation. State updates from a task are only
    /// published while this lock is held and the task's token is live.
    active: Mutex<Option<CancellationToken>>,
}

impl HintShared {
    fn publish(&self, token: &CancellationToken, state: HintState) -> bool {
        let _active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if token.is_cancelled() {
            return false;
        }
        self.state_tx.send_replace(state);
        true
    }

    /// Clears the slot when a task finishes on its own.
    fn finish(&self, token: &CancellationToken) {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        // A live token is still the one in the slot
        if !token.is_cancelled() {
            active.take();
            token.cancel();
            trace!("Hint task finished");
        }
    }
}

/// Shows the interaction hint for one ready viewer at a time.
pub struct InteractionHintController {
    policy: HintPolicy,
    shared: Arc<HintShared>,
}

impl InteractionHintController {
    pub fn new(policy: HintPolicy) -> Self {
        let (state_tx, _) = watch::channel(HintState::HIDDEN);
        Self {
            policy,
            shared: Arc::new(HintShared {
                state_tx,
                active: Mutex::new(None),
            }),
        }
    }

    pub fn policy(&self) -> HintPolicy {
        self.policy
    }

    /// Shows the hint and starts listening for gestures on `surface`.
    ///
    /// Any previous activation is cancelled first. Must be called from within
    /// a tokio runtime.
    pub fn activate(&self, surface: &MountSurface, rotation: Arc<dyn AutoRotationControl>) {
        // Subscribe before returning so no gesture after activation is missed
        let input = surface.subscribe_input();
        let token = CancellationToken::new();

        {
            let mut active = self
                .shared
                .active
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if let Some(previous) = active.replace(token.clone()) {
                previous.cancel();
            }
            self.shared.state_tx.send_replace(HintState::VISIBLE);
        }

        debug!(surface = %surface.id(), policy = ?self.policy, "Hint activated");

        let task = HintTask {
            policy: self.policy,
            shared: Arc::clone(&self.shared),
            token,
            rotation,
        };
        tokio::spawn(task.run(input));
    }

    /// Hides the hint and releases its timers and listeners.
    ///
    /// Safe to call when not active.
    pub fn deactivate(&self) {
        let mut active = self
            .shared
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(token) = active.take() {
            token.cancel();
            debug!("Hint deactivated");
        }
        self.shared.state_tx.send_replace(HintState::HIDDEN);
    }

    /// True while a hint task is running for the current activation.
    pub fn is_active(&self) -> bool {
        self.shared
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub fn state(&self) -> HintState {
        *self.shared.state_tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<HintState> {
        self.shared.state_tx.subscribe()
    }
}

impl Drop for InteractionHintController {
    fn drop(&mut self) {
        self.deactivate();
    }
}

struct HintTask {
    policy: HintPolicy,
    shared: Arc<HintShared>,
    token: CancellationToken,
    rotation: Arc<dyn AutoRotationControl>,
}

impl HintTask {
    async fn run(self, mut input: broadcast::Receiver<PointerInput>) {
        let started = Instant::now();
        let mut fade_at = self.policy.visible_for().map(|d| started + d);
        let mut hide_at: Option<Instant> = None;
        let mut hidden = false;
        let mut rotation_stopped = false;
        let mut input_open = true;

        loop {
            tokio::select! {
                biased;

                _ = self.token.cancelled() => break,

                _ = wait_until(hide_at), if hide_at.is_some() => {
                    hide_at = None;
                    hidden = true;
                    if !self.shared.publish(&self.token, HintState::HIDDEN) {
                        break;
                    }
                    trace!(elapsed_ms = started.elapsed().as_millis() as u64, "Hint removed");
                    if rotation_stopped || !input_open {
                        break;
                    }
                }

                _ = wait_until(fade_at), if fade_at.is_some() => {
                    fade_at = None;
                    hide_at = Some(Instant::now() + self.policy.fade());
                    if !self.shared.publish(&self.token, HintState::FADING) {
                        break;
                    }
                    trace!(elapsed_ms = started.elapsed().as_millis() as u64, "Hint fading");
                }

                received = input.recv(), if input_open => match received {
                    Ok(event) if event.is_qualifying_gesture() => {
                        if !rotation_stopped {
                            rotation_stopped = true;
                            debug!(?event, "First gesture, stopping auto-rotation");
                            self.rotation.stop_auto_rotation();
                        }
                        // Once fading has begun further gestures change nothing
                        if self.policy.ends_on_interaction() && hide_at.is_none() && !hidden {
                            hide_at = Some(Instant::now() + self.policy.fade());
                            if !self.shared.publish(&self.token, HintState::FADING) {
                                break;
                            }
                            let elapsed_ms = started.elapsed().as_millis() as u64;
                            trace!(elapsed_ms, "Hint fading");
                        }
                        if hidden {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        trace!(skipped, "Hint input lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        input_open = false;
                        if hidden {
                            break;
                        }
                    }
                },
            }
        }
        self.shared.finish(&self.token);
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}
