//! Composition root for one mounted viewer.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::state::{Effect, Trigger, ViewerState, ViewerStateMachine};
use crate::asset::MountConfig;
use crate::config::ViewerConfig;
use crate::engine::RenderBackend;
use crate::hint::{AutoRotationControl, HintState, InteractionHintController};
use crate::policy::{
    EnvironmentPolicy, EnvironmentSignal, EnvironmentSource, FallbackReason, PolicyDecision,
};
use crate::session::{ResourceSession, SessionEvent, SessionHandle, ViewerErrorKind};
use crate::surface::MountSurface;

/// Capacity of the viewer event broadcast channel.
const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Notifications for the page that mounted the viewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewerEvent {
    /// The model is on screen.
    Ready { url: String },
    /// The viewer gave up; the poster stays.
    Error { url: String, kind: ViewerErrorKind },
}

/// What the page should show in place of the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PosterView {
    pub url: String,
    /// Load the image eagerly (above-the-fold hero).
    pub priority: bool,
    /// Label explaining why 3D is off, if the policy pinned the poster.
    pub badge: Option<&'static str>,
}

/// State of the current mount.
struct Mount {
    config: MountConfig,
    surface: MountSurface,
    /// Scopes the driver task and the rotation window timer.
    cancel: CancellationToken,
    session_tx: mpsc::UnboundedSender<SessionEvent>,
    handle: Option<SessionHandle>,
    watchdog: Option<Instant>,
    reason: FallbackReason,
}

struct HostInner {
    machine: ViewerStateMachine,
    policy: EnvironmentPolicy,
    mount: Option<Mount>,
}

struct HostShared {
    config: ViewerConfig,
    sessions: Arc<ResourceSession>,
    hint: InteractionHintController,
    events_tx: broadcast::Sender<ViewerEvent>,
    inner: Mutex<HostInner>,
}

impl HostShared {
    fn lock(&self) -> MutexGuard<'_, HostInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Applies a trigger and performs its effects while the lock is held.
    fn dispatch(self: &Arc<Self>, inner: &mut HostInner, trigger: Trigger) {
        let effects = inner.machine.apply(trigger);
        for effect in effects {
            self.perform(inner, effect);
        }
    }

    fn perform(self: &Arc<Self>, inner: &mut HostInner, effect: Effect) {
        let reduced_motion = inner.policy.signal().reduced_motion;
        let Some(mount) = inner.mount.as_mut() else {
            return;
        };
        let url = mount.config.asset.url().to_string();

        match effect {
            Effect::Acquire => {
                let handle = self.sessions.acquire(
                    &mount.surface,
                    mount.config.asset.clone(),
                    mount.session_tx.clone(),
                );
                mount.handle = Some(handle);
            }
            Effect::ArmWatchdog => {
                mount.watchdog = Some(Instant::now() + self.config.watchdog_timeout);
                let timeout_ms = self.config.watchdog_timeout.as_millis() as u64;
                debug!(url = %url, timeout_ms, "Watchdog armed");
            }
            Effect::CancelWatchdog => {
                mount.watchdog = None;
            }
            Effect::Dispose => {
                if let Some(handle) = mount.handle.as_ref() {
                    self.sessions.dispose(handle);
                }
            }
            Effect::ShowBadge(reason) => {
                mount.reason = reason;
                info!(url = %url, reason = %reason, "3D disabled by environment policy");
            }
            Effect::ActivateHint => {
                if let Some(handle) = mount.handle.clone() {
                    let rotation = self.config.rotation_for(mount.config.asset.kind());
                    let control = Arc::new(SessionRotation {
                        sessions: Arc::clone(&self.sessions),
                        handle,
                        speed: rotation.speed,
                    });
                    self.hint.activate(&mount.surface, control);
                }
            }
            Effect::DeactivateHint => self.hint.deactivate(),
            Effect::StartAutoRotate => {
                if !mount.config.auto_rotate || reduced_motion {
                    return;
                }
                let Some(handle) = mount.handle.clone() else {
                    return;
                };
                let rotation = self.config.rotation_for(mount.config.asset.kind());
                self.sessions.set_auto_rotation(&handle, true, rotation.speed);

                let sessions = Arc::clone(&self.sessions);
                let cancel = mount.cancel.clone();
                tokio::spawn(async move {
                    tokio::select! {
                        _ = cancel.cancelled() => {}
                        _ = tokio::time::sleep(rotation.window) => {
                            debug!(session = %handle.id(), "Auto-rotate window elapsed");
                            sessions.set_auto_rotation(&handle, false, rotation.speed);
                        }
                    }
                });
            }
            Effect::EmitReady => {
                // No subscribers is fine
                let _ = self.events_tx.send(ViewerEvent::Ready { url });
            }
            Effect::EmitError(kind) => {
                let _ = self.events_tx.send(ViewerEvent::Error { url, kind });
            }
        }
    }

    /// Tears down the current mount, if any.
    fn unmount(self: &Arc<Self>, inner: &mut HostInner) {
        if inner.mount.is_none() {
            return;
        }
        self.dispatch(inner, Trigger::Unmounted);
        if let Some(mount) = inner.mount.take() {
            mount.cancel.cancel();
            debug!(url = %mount.config.asset.url(), surface = %mount.surface.id(), "Unmounted");
        }
    }
}

/// Stops ambient rotation of one session on the first gesture.
struct SessionRotation {
    sessions: Arc<ResourceSession>,
    handle: SessionHandle,
    speed: f32,
}

impl AutoRotationControl for SessionRotation {
    fn stop_auto_rotation(&self) {
        self.sessions
            .set_auto_rotation(&self.handle, false, self.speed);
    }
}

/// Hosts one progressive viewer: poster first, 3D when the environment
/// allows, poster again on failure.
///
/// # Example
///
/// ```no_run
/// use splatview::asset::MountConfig;
/// use splatview::config::ViewerConfig;
/// use splatview::engine::SimulatedBackend;
/// use splatview::policy::SharedEnvironment;
/// use splatview::surface::{MountSurface, SurfaceSize};
/// use splatview::viewer::ViewerHost;
/// use std::sync::Arc;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let host = ViewerHost::new(
///     Arc::new(SimulatedBackend::default()),
///     Arc::new(SharedEnvironment::default()),
///     ViewerConfig::default(),
/// );
/// let mut events = host.subscribe();
///
/// let surface = MountSurface::new("hero", SurfaceSize::new(1280, 720));
/// host.render(MountConfig::from_url("/models/fern.ply", "/posters/fern.webp")?, surface);
///
/// let event = events.recv().await?;
/// println!("{:?}", event);
/// host.teardown();
/// # Ok(())
/// # }
/// ```
pub struct ViewerHost {
    shared: Arc<HostShared>,
    environment: Arc<dyn EnvironmentSource>,
}

impl ViewerHost {
    pub fn new(
        backend: Arc<dyn RenderBackend>,
        environment: Arc<dyn EnvironmentSource>,
        config: ViewerConfig,
    ) -> Self {
        let sessions = Arc::new(ResourceSession::new(
            backend,
            config.render.clone(),
            config.frame_interval,
        ));
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let policy = EnvironmentPolicy::new(environment.snapshot());

        Self {
            shared: Arc::new(HostShared {
                hint: InteractionHintController::new(config.hint),
                config,
                sessions,
                events_tx,
                inner: Mutex::new(HostInner {
                    machine: ViewerStateMachine::new(),
                    policy,
                    mount: None,
                }),
            }),
            environment,
        }
    }

    /// Mounts `mount` into `surface`.
    ///
    /// Re-rendering the same asset into the same surface is a no-op. Any
    /// other change tears the current mount down completely before the new
    /// one starts. Must be called from within a tokio runtime.
    pub fn render(&self, mount: MountConfig, surface: MountSurface) {
        let shared = &self.shared;
        let mut inner = shared.lock();

        if let Some(current) = inner.mount.as_ref() {
            if current.config.asset.same_identity(&mount.asset)
                && current.surface.id() == surface.id()
            {
                debug!(url = %mount.asset.url(), "Same asset re-rendered, keeping session");
                return;
            }
        }
        shared.unmount(&mut inner);

        // Environment is sampled fresh for every mount
        let env_rx = self.environment.subscribe();
        let signal = *env_rx.borrow();
        inner.policy = EnvironmentPolicy::new(signal);
        let decision = inner.policy.evaluate();

        let (session_tx, session_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        info!(
            url = %mount.asset.url(),
            surface = %surface.id(),
            permitted = decision.should_acquire_heavy_resource,
            "Mounting viewer"
        );
        inner.mount = Some(Mount {
            config: mount,
            surface,
            cancel: cancel.clone(),
            session_tx,
            handle: None,
            watchdog: None,
            reason: FallbackReason::None,
        });

        shared.dispatch(&mut inner, Trigger::Mounted(decision));

        if inner.machine.state() == ViewerState::Loading {
            let driver = Driver {
                shared: Arc::clone(shared),
                cancel,
                session_rx,
                env_rx,
            };
            tokio::spawn(driver.run());
        }
    }

    /// Unmounts the viewer. Safe in any state, any number of times.
    pub fn teardown(&self) {
        let mut inner = self.shared.lock();
        self.shared.unmount(&mut inner);
    }

    pub fn state(&self) -> ViewerState {
        self.shared.lock().machine.state()
    }

    /// Subscribes to state transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<ViewerState> {
        self.shared.lock().machine.subscribe()
    }

    /// Subscribes to ready and error notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<ViewerEvent> {
        self.shared.events_tx.subscribe()
    }

    pub fn hint_state(&self) -> HintState {
        self.shared.hint.state()
    }

    pub fn subscribe_hint(&self) -> watch::Receiver<HintState> {
        self.shared.hint.subscribe()
    }

    /// Policy decision for the current mount.
    pub fn policy(&self) -> Option<PolicyDecision> {
        let inner = self.shared.lock();
        inner.mount.as_ref().map(|_| inner.policy.evaluate())
    }

    /// Environment signal the current mount last observed.
    pub fn environment_signal(&self) -> EnvironmentSignal {
        self.shared.lock().policy.signal()
    }

    /// Badge shown over the poster when policy pinned it.
    pub fn badge(&self) -> Option<&'static str> {
        let inner = self.shared.lock();
        inner.mount.as_ref().and_then(|m| m.reason.badge_label())
    }

    /// The poster to show, or `None` while the model is on screen or nothing
    /// is mounted.
    pub fn poster(&self) -> Option<PosterView> {
        let inner = self.shared.lock();
        if inner.machine.state() == ViewerState::Ready {
            return None;
        }
        inner.mount.as_ref().map(|m| PosterView {
            url: m.config.asset.poster_url().to_string(),
            priority: m.config.priority,
            badge: m.reason.badge_label(),
        })
    }

    /// Session of the current mount, if one was acquired.
    pub fn session(&self) -> Option<SessionHandle> {
        let inner = self.shared.lock();
        inner.mount.as_ref().and_then(|m| m.handle.clone())
    }

    /// Resource owner, for callers that forward layout changes themselves.
    pub fn sessions(&self) -> &ResourceSession {
        &self.shared.sessions
    }
}

impl Drop for ViewerHost {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Background task of one mount: session outcomes, watchdog, environment.
struct Driver {
    shared: Arc<HostShared>,
    cancel: CancellationToken,
    session_rx: mpsc::UnboundedReceiver<SessionEvent>,
    env_rx: watch::Receiver<EnvironmentSignal>,
}

impl Driver {
    async fn run(mut self) {
        let mut env_open = true;

        loop {
            let watchdog = {
                let inner = self.shared.lock();
                inner.mount.as_ref().and_then(|m| m.watchdog)
            };

            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => break,

                event = self.session_rx.recv() => match event {
                    Some(event) => self.on_session_event(event),
                    None => break,
                },

                _ = wait_until(watchdog), if watchdog.is_some() => self.on_watchdog(),

                changed = self.env_rx.changed(), if env_open => match changed {
                    Ok(()) => {
                        let signal = *self.env_rx.borrow_and_update();
                        self.on_environment(signal);
                    }
                    Err(_) => env_open = false,
                },
            }
        }
    }

    fn on_session_event(&self, event: SessionEvent) {
        let mut inner = self.shared.lock();
        if self.cancel.is_cancelled() {
            return;
        }
        let current = inner.mount.as_ref().and_then(|m| m.handle.clone());
        let Some(handle) = current.filter(|h| h.id() == event.session()) else {
            debug!(session = %event.session(), "Event from a replaced session ignored");
            return;
        };
        if handle.is_disposed() {
            return;
        }

        let trigger = match event {
            SessionEvent::Ready { .. } => Trigger::SessionReady,
            SessionEvent::Failed { error, .. } => Trigger::SessionFailed(error.kind()),
        };
        self.shared.dispatch(&mut inner, trigger);
    }

    fn on_watchdog(&self) {
        let mut inner = self.shared.lock();
        if self.cancel.is_cancelled() || inner.machine.state() != ViewerState::Loading {
            return;
        }
        if let Some(mount) = inner.mount.as_ref() {
            warn!(
                url = %mount.config.asset.url(),
                timeout_ms = self.shared.config.watchdog_timeout.as_millis() as u64,
                "Viewer did not become ready in time"
            );
        }
        self.shared.dispatch(&mut inner, Trigger::WatchdogExpired);
    }

    fn on_environment(&self, signal: EnvironmentSignal) {
        let mut inner = self.shared.lock();
        if self.cancel.is_cancelled() {
            return;
        }
        // Only the next mount acts on a changed decision
        inner.policy.update(signal);

        if signal.reduced_motion && inner.machine.state() == ViewerState::Ready {
            if let Some(mount) = inner.mount.as_ref() {
                if let Some(handle) = mount.handle.as_ref() {
                    let rotation = self.shared.config.rotation_for(mount.config.asset.kind());
                    info!(session = %handle.id(), "Reduced motion enabled, stopping auto-rotation");
                    self.shared
                        .sessions
                        .set_auto_rotation(handle, false, rotation.speed);
                }
            }
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}
