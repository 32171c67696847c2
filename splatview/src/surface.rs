//! Mount surfaces: the rectangular page regions a viewer is bound to.
//!
//! A [`MountSurface`] stands in for the container element the page hands to a
//! viewer. It carries three things the lifecycle cares about:
//!
//! - its measured size, published on a `watch` channel because the page
//!   layout can resize it at any time (including to zero during transitions)
//! - pointer and touch input, published on a `broadcast` channel
//! - the nodes a session attached to it (the canvas), so teardown can be
//!   verified to leave nothing behind
//!
//! The surface is cheap to clone; all clones refer to the same region.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{broadcast, watch};
use tracing::trace;

/// Capacity of the input broadcast channel.
const INPUT_CHANNEL_CAPACITY: usize = 64;

static NEXT_SURFACE_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a mount surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceId(u64);

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "surface-{}", self.0)
    }
}

/// Measured size of a surface in CSS pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// A surface with no area cannot host a rendering context.
    pub fn is_renderable(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Width over height, or `None` for a zero-area size.
    pub fn aspect_ratio(&self) -> Option<f32> {
        self.is_renderable()
            .then(|| self.width as f32 / self.height as f32)
    }
}

impl fmt::Display for SurfaceSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Pointer and touch input delivered to a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerInput {
    /// Pointer pressed. `buttons` is the pressed-button bitmask.
    PointerDown { buttons: u16 },
    /// Pointer moved. `buttons` is zero for a hover.
    PointerMove { buttons: u16 },
    PointerUp,
    /// Click or tap without movement.
    Click,
    TouchStart,
    TouchMove,
    TouchEnd,
}

impl PointerInput {
    /// Returns true for a drag: a move with a held button, or any touch move.
    pub fn is_qualifying_gesture(&self) -> bool {
        match self {
            PointerInput::PointerMove { buttons } => *buttons > 0,
            PointerInput::TouchMove => true,
            _ => false,
        }
    }
}

/// Identifier of a node attached to a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttachmentId(u64);

/// Kind of node attached to a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Rendering canvas created by a session.
    Canvas,
}

struct SurfaceInner {
    id: SurfaceId,
    label: String,
    size_tx: watch::Sender<SurfaceSize>,
    input_tx: broadcast::Sender<PointerInput>,
    attachments: Mutex<HashMap<AttachmentId, NodeKind>>,
    next_attachment: AtomicU64,
}

/// A page region a viewer can be mounted into.
#[derive(Clone)]
pub struct MountSurface {
    inner: Arc<SurfaceInner>,
}

impl MountSurface {
    /// Creates a surface with the given initial measured size.
    pub fn new(label: impl Into<String>, size: SurfaceSize) -> Self {
        let (size_tx, _) = watch::channel(size);
        let (input_tx, _) = broadcast::channel(INPUT_CHANNEL_CAPACITY);

        Self {
            inner: Arc::new(SurfaceInner {
                id: SurfaceId(NEXT_SURFACE_ID.fetch_add(1, Ordering::Relaxed)),
                label: label.into(),
                size_tx,
                input_tx,
                attachments: Mutex::new(HashMap::new()),
                next_attachment: AtomicU64::new(1),
            }),
        }
    }

    pub fn id(&self) -> SurfaceId {
        self.inner.id
    }

    pub fn label(&self) -> &str {
        &self.inner.label
    }

    /// Current measured size.
    pub fn size(&self) -> SurfaceSize {
        *self.inner.size_tx.borrow()
    }

    /// Records a new layout size. Called by whoever owns the page layout.
    pub fn set_size(&self, width: u32, height: u32) {
        let size = SurfaceSize::new(width, height);
        self.inner.size_tx.send_if_modified(|current| {
            if *current == size {
                return false;
            }
            *current = size;
            true
        });
    }

    /// Subscribes to size changes.
    pub fn subscribe_size(&self) -> watch::Receiver<SurfaceSize> {
        self.inner.size_tx.subscribe()
    }

    /// Number of live size subscriptions.
    pub fn size_listeners(&self) -> usize {
        self.inner.size_tx.receiver_count()
    }

    /// Delivers an input event, returning how many listeners received it.
    pub fn dispatch_input(&self, input: PointerInput) -> usize {
        trace!(surface = %self.inner.id, ?input, "Input dispatched");
        // No listeners is fine: nothing is interested in input right now
        self.inner.input_tx.send(input).unwrap_or(0)
    }

    /// Subscribes to input events.
    pub fn subscribe_input(&self) -> broadcast::Receiver<PointerInput> {
        self.inner.input_tx.subscribe()
    }

    /// Number of live input subscriptions.
    pub fn input_listeners(&self) -> usize {
        self.inner.input_tx.receiver_count()
    }

    /// Attaches a node to the surface.
    pub fn attach(&self, kind: NodeKind) -> AttachmentId {
        let id = AttachmentId(self.inner.next_attachment.fetch_add(1, Ordering::Relaxed));
        self.inner
            .attachments
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, kind);
        id
    }

    /// Removes a previously attached node. Returns false if it was not attached.
    pub fn detach(&self, id: AttachmentId) -> bool {
        self.inner
            .attachments
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .is_some()
    }

    /// Number of nodes currently attached.
    pub fn attached_nodes(&self) -> usize {
        self.inner
            .attachments
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl fmt::Debug for MountSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MountSurface")
            .field("id", &self.inner.id)
            .field("label", &self.inner.label)
            .field("size", &self.size())
            .finish_non_exhaustive()
    }
}
