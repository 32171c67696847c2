//! Integration tests for the viewer lifecycle.
//!
//! These tests drive a `ViewerHost` end to end against the simulated engine:
//! - Policy gate (reduced motion, save data)
//! - Acquisition outcomes (ready, load failure, context failure, watchdog)
//! - Teardown at every point of the lifecycle
//! - Asset replacement ordering
//! - Auto-rotation window and motion preference
//!
//! All tests run on a paused clock so timer behaviour is exact.
//!
//! Run with: `cargo test --test viewer_lifecycle_integration`

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::{self, error::TryRecvError};

use splatview::asset::MountConfig;
use splatview::config::ViewerConfig;
use splatview::engine::{
    BackendJournal, BackendOp, LoadBehavior, SimulatedBackend, SimulatedConfig, TeardownFault,
};
use splatview::policy::{EnvironmentSignal, SharedEnvironment};
use splatview::session::{SessionStatus, ViewerErrorKind};
use splatview::surface::{MountSurface, SurfaceSize};
use splatview::viewer::{ViewerEvent, ViewerHost, ViewerState};

// ============================================================================
// Test Helpers
// ============================================================================

/// A host wired to a simulated engine and an in-process environment.
struct Harness {
    host: ViewerHost,
    environment: Arc<SharedEnvironment>,
    journal: Arc<BackendJournal>,
    surface: MountSurface,
    events: broadcast::Receiver<ViewerEvent>,
}

impl Harness {
    fn new(backend: SimulatedConfig, signal: EnvironmentSignal) -> Self {
        let backend = SimulatedBackend::new(backend);
        let journal = backend.journal();
        let environment = Arc::new(SharedEnvironment::new(signal));
        let host = ViewerHost::new(
            Arc::new(backend),
            environment.clone(),
            ViewerConfig::default(),
        );
        let events = host.subscribe();

        Self {
            host,
            environment,
            journal,
            surface: MountSurface::new("product-card", SurfaceSize::new(800, 600)),
            events,
        }
    }

    fn default() -> Self {
        Self::new(SimulatedConfig::default(), EnvironmentSignal::default())
    }

    fn render(&self, url: &str) {
        let mount = MountConfig::from_url(url, "/posters/product.webp").unwrap();
        self.host.render(mount, self.surface.clone());
    }

    fn no_more_events(&mut self) -> bool {
        matches!(self.events.try_recv(), Err(TryRecvError::Empty))
    }
}

/// Let spawned tasks run without advancing the clock.
async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

async fn advance(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
    settle().await;
}

fn context_ids(ops: &[BackendOp]) -> (Vec<u64>, Vec<u64>) {
    let created = ops
        .iter()
        .filter_map(|op| match op {
            BackendOp::ContextCreated { context, .. } => Some(*context),
            _ => None,
        })
        .collect();
    let disposed = ops
        .iter()
        .filter_map(|op| match op {
            BackendOp::ContextDisposed { context } => Some(*context),
            _ => None,
        })
        .collect();
    (created, disposed)
}

// ============================================================================
// Policy Gate
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_reduced_motion_never_acquires() {
    let mut h = Harness::new(SimulatedConfig::default(), EnvironmentSignal::new(true, false));

    h.render("/models/fern.ply");
    advance(20_000).await;

    assert_eq!(h.host.state(), ViewerState::Poster);
    assert!(h.host.session().is_none());
    assert_eq!(h.journal.created(), 0);
    assert_eq!(h.host.badge(), Some("Reduced motion mode"));
    assert!(h.no_more_events());
}

#[tokio::test(start_paused = true)]
async fn test_reduced_motion_wins_over_save_data() {
    let mut h = Harness::new(SimulatedConfig::default(), EnvironmentSignal::new(true, true));

    h.render("/models/fern.ply");
    advance(20_000).await;

    assert_eq!(h.host.state(), ViewerState::Poster);
    assert!(h.host.session().is_none());
    assert_eq!(h.journal.created(), 0);
    assert_eq!(h.host.badge(), Some("Reduced motion mode"));
    assert!(h.no_more_events());
}

#[tokio::test(start_paused = true)]
async fn test_policy_flip_during_mount_does_not_acquire() {
    let h = Harness::new(SimulatedConfig::default(), EnvironmentSignal::new(false, true));

    h.render("/models/fern.ply");
    assert_eq!(h.host.badge(), Some("Data saver enabled"));

    h.environment.set_connection(Default::default());
    advance(1_000).await;

    assert_eq!(h.host.state(), ViewerState::Poster);
    assert_eq!(h.journal.created(), 0);

    // The next mount samples the environment afresh
    h.render("/models/monstera.glb");
    advance(1_000).await;
    assert_eq!(h.host.state(), ViewerState::Ready);
    assert_eq!(h.host.badge(), None);
}

// ============================================================================
// Acquisition Outcomes
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_successful_load_reaches_ready() {
    let mut h = Harness::default();

    h.render("/models/fern.ply");
    assert_eq!(h.host.state(), ViewerState::Loading);

    let event = h.events.recv().await.unwrap();
    assert_eq!(
        event,
        ViewerEvent::Ready {
            url: "/models/fern.ply".to_string()
        }
    );
    assert_eq!(h.host.state(), ViewerState::Ready);
    assert_eq!(h.surface.attached_nodes(), 1);
    assert_eq!(h.journal.live_contexts(), 1);

    advance(100).await;
    assert!(h.journal.frames_rendered() > 0);
}

#[tokio::test(start_paused = true)]
async fn test_load_failure_shows_poster() {
    let config =
        SimulatedConfig::default().with_load(LoadBehavior::fail_after(Duration::from_millis(300)));
    let mut h = Harness::new(config, EnvironmentSignal::default());

    h.render("/models/fern.ply");
    let event = h.events.recv().await.unwrap();

    assert_eq!(
        event,
        ViewerEvent::Error {
            url: "/models/fern.ply".to_string(),
            kind: ViewerErrorKind::AssetLoadFailed
        }
    );
    assert_eq!(h.host.state(), ViewerState::Error);
    assert!(h.host.poster().is_some());
    assert_eq!(h.journal.live_contexts(), 0);
    assert_eq!(h.surface.attached_nodes(), 0);

    // No automatic retry
    advance(30_000).await;
    assert_eq!(h.journal.created(), 1);
    assert_eq!(h.host.state(), ViewerState::Error);
}

#[tokio::test(start_paused = true)]
async fn test_context_failure_reports_kind() {
    let mut h = Harness::new(
        SimulatedConfig::default().with_context_failure(),
        EnvironmentSignal::default(),
    );

    h.render("/models/fern.ply");
    let event = h.events.recv().await.unwrap();

    assert!(matches!(
        event,
        ViewerEvent::Error {
            kind: ViewerErrorKind::ContextCreationFailed,
            ..
        }
    ));
    assert_eq!(h.surface.attached_nodes(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_unmeasured_surface_fails_context_creation() {
    let mut h = Harness::default();
    h.surface.set_size(0, 0);

    h.render("/models/fern.ply");
    let event = h.events.recv().await.unwrap();

    assert!(matches!(
        event,
        ViewerEvent::Error {
            kind: ViewerErrorKind::ContextCreationFailed,
            ..
        }
    ));
    assert_eq!(h.journal.created(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_watchdog_fires_at_deadline_and_late_success_is_discarded() {
    // Context at 50 ms, scene at 8500 ms
    let config = SimulatedConfig::default()
        .with_load(LoadBehavior::succeed_after(Duration::from_millis(8_450)));
    let mut h = Harness::new(config, EnvironmentSignal::default());

    h.render("/models/fern.ply");

    advance(7_990).await;
    assert_eq!(h.host.state(), ViewerState::Loading);

    advance(20).await;
    assert_eq!(h.host.state(), ViewerState::Error);
    assert_eq!(
        h.events.try_recv().unwrap(),
        ViewerEvent::Error {
            url: "/models/fern.ply".to_string(),
            kind: ViewerErrorKind::AcquisitionTimeout
        }
    );

    advance(1_000).await;
    assert_eq!(h.host.state(), ViewerState::Error);
    assert!(h.no_more_events());
    assert!(!h
        .journal
        .ops()
        .iter()
        .any(|op| matches!(op, BackendOp::SceneLoaded { .. })));
    assert_eq!(h.journal.live_contexts(), 0);
    assert_eq!(h.surface.attached_nodes(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_hanging_load_times_out() {
    let config = SimulatedConfig::default().with_load(LoadBehavior::hang());
    let mut h = Harness::new(config, EnvironmentSignal::default());

    h.render("/models/fern.ply");
    let event = h.events.recv().await.unwrap();

    assert!(matches!(
        event,
        ViewerEvent::Error {
            kind: ViewerErrorKind::AcquisitionTimeout,
            ..
        }
    ));
    assert_eq!(h.host.session().unwrap().status(), SessionStatus::Disposed);
}

// ============================================================================
// Teardown
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_immediate_teardown_leaves_nothing() {
    let mut h = Harness::default();

    h.render("/models/fern.ply");
    h.host.teardown();
    advance(10_000).await;

    assert!(h.no_more_events());
    assert_eq!(h.journal.created(), 0);
    assert_eq!(h.surface.attached_nodes(), 0);
    assert_eq!(h.host.state(), ViewerState::Poster);
}

#[tokio::test(start_paused = true)]
async fn test_teardown_mid_load_releases_context_once() {
    let mut h = Harness::default();

    h.render("/models/fern.ply");
    advance(200).await;
    assert_eq!(h.journal.created(), 1);

    for _ in 0..5 {
        h.host.teardown();
    }
    advance(10_000).await;

    assert!(h.no_more_events());
    assert_eq!(h.journal.released(), 1);
    assert_eq!(h.journal.double_releases(), 0);
    assert_eq!(h.surface.attached_nodes(), 0);
    assert_eq!(h.surface.input_listeners(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_teardown_after_ready_stops_frames_and_hint() {
    let mut h = Harness::default();

    h.render("/models/fern.ply");
    h.events.recv().await.unwrap();
    advance(100).await;

    h.host.teardown();
    settle().await;
    let frames = h.journal.frames_rendered();
    advance(1_000).await;

    assert_eq!(h.journal.frames_rendered(), frames);
    assert!(!h.host.hint_state().visible);
    assert_eq!(h.surface.input_listeners(), 0);
    assert_eq!(h.surface.size_listeners(), 0);
    assert_eq!(h.journal.live_contexts(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_teardown_errors_are_swallowed() {
    for fault in [TeardownFault::Error, TeardownFault::Panic] {
        let mut h = Harness::new(
            SimulatedConfig::default().with_teardown_fault(fault),
            EnvironmentSignal::default(),
        );

        h.render("/models/fern.ply");
        h.events.recv().await.unwrap();

        h.host.teardown();
        h.host.teardown();

        assert_eq!(h.host.state(), ViewerState::Poster);
        assert_eq!(h.journal.live_contexts(), 0);
        assert_eq!(h.surface.attached_nodes(), 0);
    }
}

// ============================================================================
// Resize
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_resize_while_loading_is_applied_at_ready() {
    let mut h = Harness::default();

    h.render("/models/fern.ply");
    advance(100).await;
    h.surface.set_size(1024, 768);
    h.surface.set_size(0, 0);
    h.surface.set_size(1200, 900);
    settle().await;

    assert!(!h
        .journal
        .ops()
        .iter()
        .any(|op| matches!(op, BackendOp::Resized { .. })));

    h.events.recv().await.unwrap();
    let resized: Vec<SurfaceSize> = h
        .journal
        .ops()
        .into_iter()
        .filter_map(|op| match op {
            BackendOp::Resized { size, .. } => Some(size),
            _ => None,
        })
        .collect();
    assert_eq!(resized, vec![SurfaceSize::new(1200, 900)]);
}

#[tokio::test(start_paused = true)]
async fn test_resize_in_error_state_is_ignored() {
    let config =
        SimulatedConfig::default().with_load(LoadBehavior::fail_after(Duration::from_millis(100)));
    let mut h = Harness::new(config, EnvironmentSignal::default());

    h.render("/models/fern.ply");
    h.events.recv().await.unwrap();

    h.surface.set_size(300, 300);
    if let Some(handle) = h.host.session() {
        h.host.sessions().notify_resize(&handle, 300, 300);
    }
    advance(100).await;

    assert_eq!(h.host.state(), ViewerState::Error);
    assert!(!h
        .journal
        .ops()
        .iter()
        .any(|op| matches!(op, BackendOp::Resized { .. })));
}

// ============================================================================
// Asset Replacement
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_asset_change_disposes_before_next_acquire() {
    let mut h = Harness::default();

    h.render("/models/a.ply");
    h.events.recv().await.unwrap();
    let first = h.host.session().unwrap();

    h.render("/models/b.ply");
    assert!(first.is_disposed());

    let event = h.events.recv().await.unwrap();
    assert_eq!(
        event,
        ViewerEvent::Ready {
            url: "/models/b.ply".to_string()
        }
    );
    advance(20_000).await;
    assert!(h.no_more_events());

    let ops = h.journal.ops();
    let (created, disposed) = context_ids(&ops);
    assert_eq!(created.len(), 2);
    assert_eq!(disposed, vec![created[0]]);

    let first_disposed = ops
        .iter()
        .position(|op| *op == BackendOp::ContextDisposed { context: created[0] });
    let second_created = ops.iter().position(
        |op| matches!(op, BackendOp::ContextCreated { context, .. } if *context == created[1]),
    );
    assert!(first_disposed < second_created);
    assert_eq!(h.journal.live_contexts(), 1);
    assert_eq!(h.surface.attached_nodes(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_asset_change_mid_load_reports_only_new_asset() {
    let config = SimulatedConfig::default()
        .with_load_for("/models/a.ply", LoadBehavior::succeed_after(Duration::from_millis(2_000)));
    let mut h = Harness::new(config, EnvironmentSignal::default());

    h.render("/models/a.ply");
    advance(500).await;
    h.render("/models/b.ply");

    let event = h.events.recv().await.unwrap();
    assert_eq!(
        event,
        ViewerEvent::Ready {
            url: "/models/b.ply".to_string()
        }
    );
    advance(5_000).await;
    assert!(h.no_more_events());
    assert_eq!(h.journal.live_contexts(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_same_asset_rerender_keeps_session() {
    let mut h = Harness::default();

    h.render("/models/a.ply");
    h.events.recv().await.unwrap();
    h.render("/models/a.ply");
    advance(1_000).await;

    assert_eq!(h.journal.created(), 1);
    assert_eq!(h.host.state(), ViewerState::Ready);
    assert!(h.no_more_events());
}

// ============================================================================
// Auto-rotation
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_point_cloud_rotation_stops_after_window() {
    let mut h = Harness::default();

    h.render("/models/fern.ply");
    h.events.recv().await.unwrap();
    settle().await;
    assert_eq!(h.journal.last_auto_rotate(), Some(true));

    advance(4_990).await;
    assert_eq!(h.journal.last_auto_rotate(), Some(true));

    advance(20).await;
    assert_eq!(h.journal.last_auto_rotate(), Some(false));
}

#[tokio::test(start_paused = true)]
async fn test_mesh_rotation_window_is_shorter() {
    let mut h = Harness::default();

    h.render("/models/monstera.glb");
    h.events.recv().await.unwrap();
    settle().await;

    advance(3_010).await;
    assert_eq!(h.journal.last_auto_rotate(), Some(false));
}

#[tokio::test(start_paused = true)]
async fn test_reduced_motion_switch_while_ready_stops_rotation() {
    let mut h = Harness::default();

    h.render("/models/fern.ply");
    h.events.recv().await.unwrap();
    settle().await;
    assert_eq!(h.journal.last_auto_rotate(), Some(true));

    h.environment.set_reduced_motion(true);
    advance(1).await;

    assert_eq!(h.journal.last_auto_rotate(), Some(false));
    assert_eq!(h.host.state(), ViewerState::Ready);
    assert_eq!(h.journal.live_contexts(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_rotation_off_when_mount_does_not_request_it() {
    let mut h = Harness::default();

    let mount = MountConfig::from_url("/models/fern.ply", "/posters/fern.webp")
        .unwrap()
        .with_auto_rotate(false);
    h.host.render(mount, h.surface.clone());
    h.events.recv().await.unwrap();
    advance(10_000).await;

    assert_eq!(h.journal.last_auto_rotate(), None);
}
