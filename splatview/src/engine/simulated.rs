//! GPU-free rendering backend.
//!
//! `SimulatedBackend` behaves like a real engine from the lifecycle's point of
//! view: module loading and scene streaming take (virtual) time, either can
//! fail, and every context holds "native" resources that must be released
//! exactly once. Nothing is drawn; instead every native operation is appended
//! to a shared [`BackendJournal`].
//!
//! Latencies use `tokio::time`, so tests running with a paused clock get
//! deterministic timing.

use super::error::BackendError;
use super::traits::{BoxFuture, ContextParams, RenderBackend, RenderContext};
use crate::asset::AssetRef;
use crate::surface::SurfaceSize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, trace};

/// How a scene load settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Succeed,
    /// Fails with [`BackendError::Network`].
    NetworkError,
    /// Fails with [`BackendError::Decode`].
    DecodeError,
    /// Never settles.
    Hang,
}

/// Latency and outcome of a scene load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadBehavior {
    pub latency: Duration,
    pub outcome: LoadOutcome,
}

impl LoadBehavior {
    pub fn succeed_after(latency: Duration) -> Self {
        Self {
            latency,
            outcome: LoadOutcome::Succeed,
        }
    }

    pub fn fail_after(latency: Duration) -> Self {
        Self {
            latency,
            outcome: LoadOutcome::NetworkError,
        }
    }

    pub fn hang() -> Self {
        Self {
            latency: Duration::ZERO,
            outcome: LoadOutcome::Hang,
        }
    }
}

/// Fault injected into context teardown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TeardownFault {
    #[default]
    None,
    /// `dispose` releases resources but reports an error.
    Error,
    /// `dispose` releases resources and then panics.
    Panic,
}

/// Configuration for [`SimulatedBackend`].
#[derive(Debug, Clone)]
pub struct SimulatedConfig {
    /// Time to "load the engine module" and build a context.
    pub create_latency: Duration,
    /// Fail context creation as if no GPU surface were available.
    pub fail_context: bool,
    /// Default scene load behaviour.
    pub load: LoadBehavior,
    /// Per-URL overrides of the scene load behaviour.
    pub load_overrides: HashMap<String, LoadBehavior>,
    pub teardown_fault: TeardownFault,
}

impl Default for SimulatedConfig {
    fn default() -> Self {
        Self {
            create_latency: Duration::from_millis(50),
            fail_context: false,
            load: LoadBehavior::succeed_after(Duration::from_millis(400)),
            load_overrides: HashMap::new(),
            teardown_fault: TeardownFault::None,
        }
    }
}

impl SimulatedConfig {
    pub fn with_create_latency(mut self, latency: Duration) -> Self {
        self.create_latency = latency;
        self
    }

    pub fn with_load(mut self, load: LoadBehavior) -> Self {
        self.load = load;
        self
    }

    pub fn with_load_for(mut self, url: impl Into<String>, load: LoadBehavior) -> Self {
        self.load_overrides.insert(url.into(), load);
        self
    }

    pub fn with_context_failure(mut self) -> Self {
        self.fail_context = true;
        self
    }

    pub fn with_teardown_fault(mut self, fault: TeardownFault) -> Self {
        self.teardown_fault = fault;
        self
    }

    fn load_for(&self, url: &str) -> LoadBehavior {
        self.load_overrides.get(url).copied().unwrap_or(self.load)
    }
}

/// One native operation recorded by the simulated engine.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendOp {
    ContextCreated { context: u64, size: SurfaceSize },
    SceneLoadStarted { context: u64, url: String },
    SceneLoaded { context: u64, url: String },
    Resized { context: u64, size: SurfaceSize },
    AutoRotate { context: u64, enabled: bool },
    ContextDisposed { context: u64 },
    /// Context dropped without `dispose`; resources freed by `Drop`.
    ContextDropped { context: u64 },
}

/// Shared record of native operations and resource counters.
#[derive(Debug, Default)]
pub struct BackendJournal {
    ops: Mutex<Vec<BackendOp>>,
    created: AtomicUsize,
    released: AtomicUsize,
    double_releases: AtomicUsize,
    frames: AtomicU64,
}

impl BackendJournal {
    fn record(&self, op: BackendOp) {
        trace!(?op, "Simulated backend op");
        self.ops
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(op);
    }

    /// Snapshot of all recorded operations in order.
    pub fn ops(&self) -> Vec<BackendOp> {
        self.ops
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Contexts constructed so far.
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// Contexts whose native resources were released.
    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    /// Contexts currently holding native resources.
    pub fn live_contexts(&self) -> usize {
        self.created().saturating_sub(self.released())
    }

    /// Times `dispose` was called on an already-released context.
    pub fn double_releases(&self) -> usize {
        self.double_releases.load(Ordering::SeqCst)
    }

    /// Frames rendered across all contexts.
    pub fn frames_rendered(&self) -> u64 {
        self.frames.load(Ordering::SeqCst)
    }

    /// Most recent auto-rotation state applied to any context.
    pub fn last_auto_rotate(&self) -> Option<bool> {
        self.ops().into_iter().rev().find_map(|op| match op {
            BackendOp::AutoRotate { enabled, .. } => Some(enabled),
            _ => None,
        })
    }
}

/// Rendering backend that simulates an engine without a GPU.
#[derive(Debug)]
pub struct SimulatedBackend {
    config: SimulatedConfig,
    journal: Arc<BackendJournal>,
    next_context: Arc<AtomicU64>,
}

impl SimulatedBackend {
    pub fn new(config: SimulatedConfig) -> Self {
        Self {
            config,
            journal: Arc::new(BackendJournal::default()),
            next_context: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Shared journal of native operations.
    pub fn journal(&self) -> Arc<BackendJournal> {
        Arc::clone(&self.journal)
    }
}

impl Default for SimulatedBackend {
    fn default() -> Self {
        Self::new(SimulatedConfig::default())
    }
}

impl RenderBackend for SimulatedBackend {
    fn name(&self) -> &str {
        "simulated"
    }

    fn create_context(
        &self,
        params: ContextParams,
    ) -> BoxFuture<Result<Box<dyn RenderContext>, BackendError>> {
        let config = self.config.clone();
        let journal = Arc::clone(&self.journal);
        let next_context = Arc::clone(&self.next_context);

        Box::pin(async move {
            tokio::time::sleep(config.create_latency).await;

            if config.fail_context {
                return Err(BackendError::Unsupported(
                    "no compatible GPU surface".to_string(),
                ));
            }

            // Native resources only exist once the future resolves
            let id = next_context.fetch_add(1, Ordering::Relaxed);
            journal.created.fetch_add(1, Ordering::SeqCst);
            journal.record(BackendOp::ContextCreated {
                context: id,
                size: params.size,
            });
            debug!(
                context = id,
                size = %params.size,
                kind = %params.kind,
                "Simulated context created"
            );

            let context: Box<dyn RenderContext> = Box::new(SimulatedContext {
                id,
                config,
                journal,
                released: false,
                auto_rotate: false,
                speed: 0.0,
                yaw: 0.0,
            });
            Ok(context)
        })
    }
}

/// Context produced by [`SimulatedBackend`].
struct SimulatedContext {
    id: u64,
    config: SimulatedConfig,
    journal: Arc<BackendJournal>,
    released: bool,
    auto_rotate: bool,
    speed: f32,
    yaw: f32,
}

impl SimulatedContext {
    fn release(&mut self) {
        self.released = true;
        self.journal.released.fetch_add(1, Ordering::SeqCst);
    }
}

impl RenderContext for SimulatedContext {
    fn label(&self) -> String {
        format!("simulated-{}", self.id)
    }

    fn load_scene(&mut self, asset: &AssetRef) -> BoxFuture<Result<(), BackendError>> {
        let behavior = self.config.load_for(asset.url());
        let journal = Arc::clone(&self.journal);
        let context = self.id;
        let url = asset.url().to_string();

        journal.record(BackendOp::SceneLoadStarted {
            context,
            url: url.clone(),
        });

        Box::pin(async move {
            if behavior.outcome == LoadOutcome::Hang {
                std::future::pending::<()>().await;
            }
            tokio::time::sleep(behavior.latency).await;

            match behavior.outcome {
                LoadOutcome::Succeed | LoadOutcome::Hang => {
                    journal.record(BackendOp::SceneLoaded { context, url });
                    Ok(())
                }
                LoadOutcome::NetworkError => {
                    Err(BackendError::Network(format!("GET {} failed", url)))
                }
                LoadOutcome::DecodeError => {
                    Err(BackendError::Decode(format!("{} is not a valid scene", url)))
                }
            }
        })
    }

    fn resize(&mut self, size: SurfaceSize) {
        self.journal.record(BackendOp::Resized {
            context: self.id,
            size,
        });
    }

    fn set_auto_rotate(&mut self, enabled: bool, speed: f32) {
        self.auto_rotate = enabled;
        self.speed = speed;
        self.journal.record(BackendOp::AutoRotate {
            context: self.id,
            enabled,
        });
    }

    fn render_frame(&mut self) {
        if self.auto_rotate {
            self.yaw = (self.yaw + self.speed) % 360.0;
        }
        self.journal.frames.fetch_add(1, Ordering::Relaxed);
    }

    fn dispose(&mut self) -> Result<(), BackendError> {
        if self.released {
            self.journal.double_releases.fetch_add(1, Ordering::SeqCst);
            return Err(BackendError::Disposed);
        }

        self.release();
        self.journal
            .record(BackendOp::ContextDisposed { context: self.id });

        match self.config.teardown_fault {
            TeardownFault::None => Ok(()),
            TeardownFault::Error => Err(BackendError::Teardown(format!(
                "lost GPU device while releasing context {}",
                self.id
            ))),
            TeardownFault::Panic => panic!("simulated engine panicked during teardown"),
        }
    }
}

impl Drop for SimulatedContext {
    fn drop(&mut self) {
        if !self.released {
            self.release();
            self.journal
                .record(BackendOp::ContextDropped { context: self.id });
        }
    }
}
