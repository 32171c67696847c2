//! Acquisition and ownership of rendering contexts.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use super::error::SessionError;
use super::handle::{dispose_context, SessionHandle, SessionId, SessionShared};
use crate::asset::AssetRef;
use crate::config::RenderConfig;
use crate::engine::{ContextParams, RenderBackend};
use crate::surface::{MountSurface, SurfaceSize};

/// Shortest frame tick. A zero period would stall the frame loop.
const MIN_FRAME_INTERVAL: Duration = Duration::from_millis(1);

/// Outcome of an acquisition, delivered at most once per session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Ready { session: SessionId },
    Failed { session: SessionId, error: SessionError },
}

impl SessionEvent {
    pub fn session(&self) -> SessionId {
        match self {
            SessionEvent::Ready { session } | SessionEvent::Failed { session, .. } => *session,
        }
    }
}

/// Owns at most one live session for a mount.
pub struct ResourceSession {
    backend: Arc<dyn RenderBackend>,
    render: RenderConfig,
    frame_interval: Duration,
    current: Mutex<Option<SessionHandle>>,
}

impl ResourceSession {
    pub fn new(
        backend: Arc<dyn RenderBackend>,
        render: RenderConfig,
        frame_interval: Duration,
    ) -> Self {
        if frame_interval < MIN_FRAME_INTERVAL {
            warn!(
                requested_ms = frame_interval.as_millis() as u64,
                "Frame interval too short, using 1ms"
            );
        }
        Self {
            backend,
            render,
            frame_interval: frame_interval.max(MIN_FRAME_INTERVAL),
            current: Mutex::new(None),
        }
    }

    /// Starts acquiring `asset` into `surface`.
    ///
    /// Any session this owner still holds is disposed before the new one
    /// starts. The outcome arrives on `events`. Must be called from within a
    /// tokio runtime.
    pub fn acquire(
        &self,
        surface: &MountSurface,
        asset: AssetRef,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> SessionHandle {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = current.take() {
            if previous.shared.dispose() {
                debug!(session = %previous.id(), "Disposed previous session before acquire");
            }
        }

        let handle = SessionHandle::new(asset, surface.clone());
        info!(
            session = %handle.id(),
            url = %handle.asset().url(),
            kind = %handle.asset().kind(),
            backend = self.backend.name(),
            "Acquiring"
        );

        let acquisition = Acquisition {
            backend: Arc::clone(&self.backend),
            render: self.render.clone(),
            frame_interval: self.frame_interval,
            shared: Arc::clone(&handle.shared),
            events,
        };
        tokio::spawn(acquisition.run());

        *current = Some(handle.clone());
        handle
    }

    /// Disposes `handle`. Idempotent; safe in any status.
    pub fn dispose(&self, handle: &SessionHandle) {
        if handle.shared.dispose() {
            debug!(session = %handle.id(), "Session disposed");
        }

        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if current.as_ref().map(SessionHandle::id) == Some(handle.id()) {
            *current = None;
        }
    }

    /// Forwards a layout size to the context. No-op unless `Ready` and non-zero.
    pub fn notify_resize(&self, handle: &SessionHandle, width: u32, height: u32) {
        let size = SurfaceSize::new(width, height);
        if handle.shared.apply_resize(size) {
            debug!(session = %handle.id(), size = %size, "Resized");
        }
    }

    /// Toggles ambient rotation. No-op unless `Ready`.
    pub fn set_auto_rotation(&self, handle: &SessionHandle, enabled: bool, speed: f32) {
        if handle
            .shared
            .with_context(|context| context.set_auto_rotate(enabled, speed))
            .is_some()
        {
            debug!(session = %handle.id(), enabled, speed, "Auto-rotation updated");
        }
    }

    /// The session this owner currently holds, if any.
    pub fn current(&self) -> Option<SessionHandle> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// One acquisition task, from surface measurement to the end of the frame loop.
struct Acquisition {
    backend: Arc<dyn RenderBackend>,
    render: RenderConfig,
    frame_interval: Duration,
    shared: Arc<SessionShared>,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl Acquisition {
    async fn run(self) {
        let shared = Arc::clone(&self.shared);
        let started = Instant::now();

        let mut size_rx = shared.surface.subscribe_size();
        let size = *size_rx.borrow_and_update();
        if !size.is_renderable() {
            self.fail(SessionError::SurfaceNotMeasured { size });
            return;
        }

        let params = ContextParams {
            size,
            kind: shared.asset.kind(),
            render: self.render.clone(),
        };

        // Phase 1: load the engine and create a context
        let created = tokio::select! {
            biased;
            _ = shared.cancel.cancelled() => {
                debug!(session = %shared.id, "Cancelled during context creation");
                return;
            }
            result = self.backend.create_context(params) => result,
        };
        let mut context = match created {
            Ok(context) => context,
            Err(e) => {
                self.fail(SessionError::ContextCreation(e));
                return;
            }
        };
        debug!(
            session = %shared.id,
            context = %context.label(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Context created"
        );

        // Phase 2: stream the scene in
        let load = context.load_scene(&shared.asset);
        if let Err(context) = shared.install(context) {
            drop(load);
            debug!(session = %shared.id, "Disposed before context was installed, releasing");
            dispose_context(shared.id, context);
            return;
        }

        let loaded = tokio::select! {
            biased;
            _ = shared.cancel.cancelled() => {
                debug!(session = %shared.id, "Cancelled during scene load");
                return;
            }
            result = load => result,
        };
        if let Err(e) = loaded {
            self.fail(SessionError::AssetLoad(e));
            return;
        }

        let latest = *size_rx.borrow_and_update();
        if !shared.settle_ready(latest, &self.events) {
            return;
        }
        info!(
            session = %shared.id,
            url = %shared.asset.url(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Session ready"
        );

        self.frame_loop(size_rx).await;
    }

    async fn frame_loop(&self, mut size_rx: watch::Receiver<SurfaceSize>) {
        let shared = &self.shared;
        let mut ticker = tokio::time::interval(self.frame_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut size_open = true;
        let mut frames: u64 = 0;

        loop {
            tokio::select! {
                biased;
                _ = shared.cancel.cancelled() => break,
                changed = size_rx.changed(), if size_open => {
                    if changed.is_err() {
                        size_open = false;
                        continue;
                    }
                    let size = *size_rx.borrow_and_update();
                    if shared.apply_resize(size) {
                        debug!(session = %shared.id, size = %size, "Resized");
                    }
                }
                _ = ticker.tick() => {
                    if shared.with_context(|context| context.render_frame()).is_some() {
                        frames += 1;
                        trace!(session = %shared.id, frame = frames, "Frame rendered");
                    }
                }
            }
        }

        debug!(session = %shared.id, frames, "Frame loop stopped");
    }

    fn fail(&self, error: SessionError) {
        if self.shared.settle_failed(&error, &self.events) {
            warn!(
                session = %self.shared.id,
                url = %self.shared.asset.url(),
                kind = %error.kind(),
                error = %error,
                "Acquisition failed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::AssetKind;
    use crate::engine::{
        BackendJournal, BackendOp, LoadBehavior, SimulatedBackend, SimulatedConfig, TeardownFault,
    };
    use crate::session::{SessionStatus, ViewerErrorKind};

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    fn setup(config: SimulatedConfig) -> (ResourceSession, Arc<BackendJournal>, MountSurface) {
        let backend = SimulatedBackend::new(config);
        let journal = backend.journal();
        let session = ResourceSession::new(
            Arc::new(backend),
            RenderConfig::default(),
            Duration::from_millis(16),
        );
        let surface = MountSurface::new("card", SurfaceSize::new(640, 480));
        (session, journal, surface)
    }

    fn asset(url: &str) -> AssetRef {
        AssetRef::new(url, AssetKind::PointCloud, "poster.webp").unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_reaches_ready() {
        let (session, journal, surface) = setup(SimulatedConfig::default());
        let (tx, mut rx) = mpsc::unbounded_channel();

        let handle = session.acquire(&surface, asset("a.ply"), tx);
        assert_eq!(handle.status(), SessionStatus::Loading);

        assert_eq!(handle.settled().await, SessionStatus::Ready);
        assert_eq!(rx.recv().await, Some(SessionEvent::Ready { session: handle.id() }));
        assert_eq!(journal.live_contexts(), 1);
        assert_eq!(surface.attached_nodes(), 1);

        tokio::time::sleep(Duration::from_millis(160)).await;
        assert!(journal.frames_rendered() >= 9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispose_during_load_releases_once() {
        let (session, journal, surface) = setup(SimulatedConfig::default());
        let (tx, mut rx) = mpsc::unbounded_channel();

        let handle = session.acquire(&surface, asset("a.ply"), tx);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(journal.created(), 1);

        session.dispose(&handle);
        session.dispose(&handle);
        assert_eq!(handle.status(), SessionStatus::Disposed);
        assert!(session.current().is_none());

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(journal.live_contexts(), 0);
        assert_eq!(journal.released(), 1);
        assert_eq!(journal.double_releases(), 0);
        assert_eq!(surface.attached_nodes(), 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispose_before_context_created() {
        let (session, journal, surface) = setup(SimulatedConfig::default());
        let (tx, mut rx) = mpsc::unbounded_channel();

        let handle = session.acquire(&surface, asset("a.ply"), tx);
        session.dispose(&handle);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(journal.created(), 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_size_surface_fails() {
        let (session, journal, surface) = setup(SimulatedConfig::default());
        surface.set_size(0, 0);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let handle = session.acquire(&surface, asset("a.ply"), tx);
        assert_eq!(
            handle.settled().await,
            SessionStatus::Failed(ViewerErrorKind::ContextCreationFailed)
        );
        match rx.recv().await {
            Some(SessionEvent::Failed { error, .. }) => {
                assert!(matches!(error, SessionError::SurfaceNotMeasured { .. }))
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(journal.created(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_failure_releases_context() {
        let config = SimulatedConfig::default()
            .with_load(LoadBehavior::fail_after(Duration::from_millis(200)));
        let (session, journal, surface) = setup(config);
        let (tx, _rx) = mpsc::unbounded_channel();

        let handle = session.acquire(&surface, asset("a.ply"), tx);
        assert_eq!(
            handle.settled().await,
            SessionStatus::Failed(ViewerErrorKind::AssetLoadFailed)
        );
        assert_eq!(journal.live_contexts(), 0);
        assert_eq!(surface.attached_nodes(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resize_only_applies_when_ready() {
        let (session, journal, surface) = setup(SimulatedConfig::default());
        let (tx, _rx) = mpsc::unbounded_channel();

        let handle = session.acquire(&surface, asset("a.ply"), tx);
        session.notify_resize(&handle, 800, 600);
        handle.settled().await;

        session.notify_resize(&handle, 0, 600);
        session.notify_resize(&handle, 1024, 768);

        let resizes: Vec<SurfaceSize> = journal
            .ops()
            .into_iter()
            .filter_map(|op| match op {
                BackendOp::Resized { size, .. } => Some(size),
                _ => None,
            })
            .collect();
        // One resize at Ready for the measured size, one explicit
        assert_eq!(
            resizes,
            vec![SurfaceSize::new(640, 480), SurfaceSize::new(1024, 768)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_surface_changes_reach_context() {
        let (session, journal, surface) = setup(SimulatedConfig::default());
        let (tx, _rx) = mpsc::unbounded_channel();

        let handle = session.acquire(&surface, asset("a.ply"), tx);
        handle.settled().await;

        surface.set_size(0, 0);
        settle().await;
        surface.set_size(300, 200);
        settle().await;

        let last_resize = journal.ops().into_iter().rev().find_map(|op| match op {
            BackendOp::Resized { size, .. } => Some(size),
            _ => None,
        });
        assert_eq!(last_resize, Some(SurfaceSize::new(300, 200)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_frame_interval_still_renders() {
        let backend = SimulatedBackend::new(SimulatedConfig::default());
        let journal = backend.journal();
        let session =
            ResourceSession::new(Arc::new(backend), RenderConfig::default(), Duration::ZERO);
        let surface = MountSurface::new("card", SurfaceSize::new(640, 480));
        let (tx, _rx) = mpsc::unbounded_channel();

        let handle = session.acquire(&surface, asset("a.ply"), tx);
        assert_eq!(handle.settled().await, SessionStatus::Ready);
        tokio::time::sleep(Duration::from_millis(50)).await;
        settle().await;

        assert!(journal.frames_rendered() > 0);
        assert_eq!(surface.size_listeners(), 1);

        surface.set_size(300, 200);
        settle().await;
        let last_resize = journal.ops().into_iter().rev().find_map(|op| match op {
            BackendOp::Resized { size, .. } => Some(size),
            _ => None,
        });
        assert_eq!(last_resize, Some(SurfaceSize::new(300, 200)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_rotation_noop_while_loading() {
        let (session, journal, surface) = setup(SimulatedConfig::default());
        let (tx, _rx) = mpsc::unbounded_channel();

        let handle = session.acquire(&surface, asset("a.ply"), tx);
        session.set_auto_rotation(&handle, true, 0.5);
        assert_eq!(journal.last_auto_rotate(), None);

        handle.settled().await;
        session.set_auto_rotation(&handle, true, 0.5);
        assert_eq!(journal.last_auto_rotate(), Some(true));
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_disposes_previous_first() {
        let (session, journal, surface) = setup(SimulatedConfig::default());
        let (tx, _rx) = mpsc::unbounded_channel();

        let first = session.acquire(&surface, asset("a.ply"), tx.clone());
        first.settled().await;
        let second = session.acquire(&surface, asset("b.ply"), tx);

        assert!(first.is_disposed());
        assert_eq!(second.settled().await, SessionStatus::Ready);
        assert_eq!(journal.live_contexts(), 1);
        assert_eq!(surface.attached_nodes(), 1);
        assert_eq!(session.current().map(|h| h.id()), Some(second.id()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_panic_is_swallowed() {
        let config = SimulatedConfig::default().with_teardown_fault(TeardownFault::Panic);
        let (session, journal, surface) = setup(config);
        let (tx, _rx) = mpsc::unbounded_channel();

        let handle = session.acquire(&surface, asset("a.ply"), tx);
        handle.settled().await;

        session.dispose(&handle);
        assert_eq!(handle.status(), SessionStatus::Disposed);
        assert_eq!(journal.live_contexts(), 0);
        assert_eq!(surface.attached_nodes(), 0);
    }
}
