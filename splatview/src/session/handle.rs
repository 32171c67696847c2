//! Session handles and the state they share with the acquisition task.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::error::{SessionError, ViewerErrorKind};
use super::resource::SessionEvent;
use crate::asset::AssetRef;
use crate::engine::RenderContext;
use crate::surface::{AttachmentId, MountSurface, NodeKind, SurfaceSize};

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

impl SessionId {
    fn next() -> Self {
        Self(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Lifecycle status of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Context creation or scene load in flight.
    Loading,
    /// Scene on screen, frame loop running.
    Ready,
    /// Acquisition failed. Native resources already released.
    Failed(ViewerErrorKind),
    /// Disposed by the owner. Terminal.
    Disposed,
}

impl SessionStatus {
    /// True once acquisition has produced an outcome or been abandoned.
    pub fn is_settled(&self) -> bool {
        !matches!(self, SessionStatus::Loading)
    }
}

/// Native resources owned by one session.
#[derive(Default)]
struct NativeResources {
    context: Option<Box<dyn RenderContext>>,
    canvas: Option<AttachmentId>,
}

/// State shared between a handle and its acquisition task.
pub(super) struct SessionShared {
    pub(super) id: SessionId,
    pub(super) asset: AssetRef,
    pub(super) surface: MountSurface,
    pub(super) cancel: CancellationToken,
    status_tx: watch::Sender<SessionStatus>,
    /// Every outcome is published while holding this lock, after checking
    /// `cancel`. `dispose` cancels under the same lock.
    native: Mutex<NativeResources>,
}

impl SessionShared {
    fn lock_native(&self) -> std::sync::MutexGuard<'_, NativeResources> {
        self.native.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_status(&self, status: SessionStatus) {
        self.status_tx.send_replace(status);
    }

    /// Takes ownership of a freshly created context and attaches its canvas.
    ///
    /// Hands the context back if the session was disposed meanwhile.
    pub(super) fn install(
        &self,
        context: Box<dyn RenderContext>,
    ) -> Result<(), Box<dyn RenderContext>> {
        let mut native = self.lock_native();
        if self.cancel.is_cancelled() {
            return Err(context);
        }
        native.canvas = Some(self.surface.attach(NodeKind::Canvas));
        native.context = Some(context);
        Ok(())
    }

    /// Publishes `Ready` unless disposed. Applies the latest measured `size`
    /// first.
    pub(super) fn settle_ready(
        &self,
        size: SurfaceSize,
        events: &mpsc::UnboundedSender<SessionEvent>,
    ) -> bool {
        let mut native = self.lock_native();
        if self.cancel.is_cancelled() {
            return false;
        }
        if size.is_renderable() {
            if let Some(context) = native.context.as_mut() {
                context.resize(size);
            }
        }
        self.set_status(SessionStatus::Ready);
        // Receiver gone means the owner stopped listening; nothing to report to
        let _ = events.send(SessionEvent::Ready { session: self.id });
        true
    }

    /// Releases native resources and publishes `Failed` unless disposed.
    pub(super) fn settle_failed(
        &self,
        error: &SessionError,
        events: &mpsc::UnboundedSender<SessionEvent>,
    ) -> bool {
        let mut native = self.lock_native();
        if self.cancel.is_cancelled() {
            return false;
        }
        self.release(&mut native);
        self.set_status(SessionStatus::Failed(error.kind()));
        let _ = events.send(SessionEvent::Failed {
            session: self.id,
            error: error.clone(),
        });
        true
    }

    /// Cancels the session and releases everything it holds.
    ///
    /// Returns false if the session was already disposed.
    pub(super) fn dispose(&self) -> bool {
        let mut native = self.lock_native();
        if self.cancel.is_cancelled() {
            return false;
        }
        self.cancel.cancel();
        self.set_status(SessionStatus::Disposed);
        self.release(&mut native);
        true
    }

    /// Runs `f` against the context while the session is `Ready`.
    pub(super) fn with_context<R>(&self, f: impl FnOnce(&mut dyn RenderContext) -> R) -> Option<R> {
        let mut native = self.lock_native();
        if self.cancel.is_cancelled() || *self.status_tx.borrow() != SessionStatus::Ready {
            return None;
        }
        native.context.as_mut().map(|context| f(context.as_mut()))
    }

    /// Forwards a resize to the context. Zero-area sizes are ignored.
    pub(super) fn apply_resize(&self, size: SurfaceSize) -> bool {
        if !size.is_renderable() {
            return false;
        }
        self.with_context(|context| context.resize(size)).is_some()
    }

    fn release(&self, native: &mut NativeResources) {
        if let Some(canvas) = native.canvas.take() {
            self.surface.detach(canvas);
        }
        if let Some(context) = native.context.take() {
            dispose_context(self.id, context);
        }
    }
}

/// Disposes a context, swallowing engine errors and panics.
pub(super) fn dispose_context(session: SessionId, mut context: Box<dyn RenderContext>) {
    let label = context.label();
    let outcome = catch_unwind(AssertUnwindSafe(move || {
        let result = context.dispose();
        drop(context);
        result
    }));

    match outcome {
        Ok(Ok(())) => debug!(session = %session, context = %label, "Context released"),
        Ok(Err(e)) => {
            debug!(session = %session, context = %label, error = %e, "Engine teardown failed")
        }
        Err(_) => debug!(session = %session, context = %label, "Engine teardown panicked"),
    }
}

/// Opaque token for one acquisition.
///
/// Cheap to clone. Dropping a handle does not dispose the session; call
/// [`super::ResourceSession::dispose`].
#[derive(Clone)]
pub struct SessionHandle {
    pub(super) shared: Arc<SessionShared>,
}

impl SessionHandle {
    pub(super) fn new(asset: AssetRef, surface: MountSurface) -> Self {
        let (status_tx, _) = watch::channel(SessionStatus::Loading);
        Self {
            shared: Arc::new(SessionShared {
                id: SessionId::next(),
                asset,
                surface,
                cancel: CancellationToken::new(),
                status_tx,
                native: Mutex::new(NativeResources::default()),
            }),
        }
    }

    pub fn id(&self) -> SessionId {
        self.shared.id
    }

    pub fn asset(&self) -> &AssetRef {
        &self.shared.asset
    }

    pub fn status(&self) -> SessionStatus {
        *self.shared.status_tx.borrow()
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.cancel.is_cancelled()
    }

    /// Waits until the session leaves `Loading`.
    pub async fn settled(&self) -> SessionStatus {
        let mut rx = self.shared.status_tx.subscribe();
        let status = match rx.wait_for(SessionStatus::is_settled).await {
            Ok(status) => *status,
            Err(_) => self.status(),
        };
        status
    }
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle")
            .field("id", &self.shared.id)
            .field("url", &self.shared.asset.url())
            .field("status", &self.status())
            .finish()
    }
}
