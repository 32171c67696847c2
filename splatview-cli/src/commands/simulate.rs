//! `splatview simulate` - scripted viewer run against the simulated engine.
//!
//! Mounts one viewer, replays the scripted inputs (drags, resizes, a reduced
//! motion switch) at their offsets, and prints each state, hint and event
//! change with its offset from mount. Time runs in real time.

use clap::{Args, ValueEnum};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};

use splatview::asset::{AssetError, AssetKind, AssetRef, ModelFormat, MountConfig};
use splatview::config::ViewerConfig;
use splatview::engine::{LoadBehavior, SimulatedBackend, SimulatedConfig};
use splatview::hint::{HintPolicy, HintState};
use splatview::policy::{EnvironmentSignal, SharedEnvironment};
use splatview::surface::{MountSurface, PointerInput, SurfaceSize};
use splatview::viewer::{ViewerEvent, ViewerHost};

use crate::error::CliError;
use crate::runner::CliRunner;

/// Hint variant override.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum HintModeArg {
    /// Visible for a fixed interval
    Fixed,
    /// Visible until the first drag
    Interaction,
}

/// A surface size change at an offset, written `WxH@MS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeStep {
    pub size: SurfaceSize,
    pub at_ms: u64,
}

impl FromStr for ResizeStep {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (size, at) = s
            .split_once('@')
            .ok_or_else(|| format!("expected WxH@MS, got '{}'", s))?;
        let at_ms = at
            .trim()
            .parse()
            .map_err(|_| format!("invalid offset '{}'", at))?;
        Ok(Self {
            size: parse_size(size)?,
            at_ms,
        })
    }
}

fn parse_size(s: &str) -> Result<SurfaceSize, String> {
    let (w, h) = s
        .trim()
        .split_once('x')
        .ok_or_else(|| format!("expected WxH, got '{}'", s))?;
    let width = w.parse().map_err(|_| format!("invalid width '{}'", w))?;
    let height = h.parse().map_err(|_| format!("invalid height '{}'", h))?;
    Ok(SurfaceSize::new(width, height))
}

/// Arguments for `splatview simulate`.
#[derive(Debug, Args)]
pub struct SimulateArgs {
    /// Model URL; the kind is inferred from the extension unless --kind is given
    #[arg(long)]
    pub url: String,

    /// Poster image URL
    #[arg(long, default_value = "poster.webp")]
    pub poster: String,

    /// Asset kind override (point-cloud or mesh)
    #[arg(long)]
    pub kind: Option<String>,

    /// Simulate a user who prefers reduced motion
    #[arg(long)]
    pub reduced_motion: bool,

    /// Simulate a data-saver connection
    #[arg(long)]
    pub save_data: bool,

    /// Switch reduced motion on at this offset
    #[arg(long, value_name = "MS")]
    pub reduced_motion_at_ms: Option<u64>,

    /// Scene load latency
    #[arg(long, default_value_t = 400, value_name = "MS")]
    pub load_ms: u64,

    /// Make the scene load fail
    #[arg(long, conflicts_with_all = ["fail_context", "hang"])]
    pub fail_load: bool,

    /// Make context creation fail
    #[arg(long, conflicts_with = "hang")]
    pub fail_context: bool,

    /// Make the scene load never settle
    #[arg(long)]
    pub hang: bool,

    /// Disable ambient rotation
    #[arg(long)]
    pub no_auto_rotate: bool,

    /// Initial surface size
    #[arg(long, default_value = "1280x720", value_parser = parse_size, value_name = "WxH")]
    pub size: SurfaceSize,

    /// Drag on the surface at this offset
    #[arg(long, value_name = "MS")]
    pub drag_at_ms: Option<u64>,

    /// Resize the surface (repeatable)
    #[arg(long, value_name = "WxH@MS")]
    pub resize: Vec<ResizeStep>,

    /// How long to run before unmounting
    #[arg(long, default_value_t = 10_000, value_name = "MS")]
    pub run_ms: u64,

    /// Hint variant (overrides the config file)
    #[arg(long, value_enum)]
    pub hint: Option<HintModeArg>,

    /// Config file (default: ~/.splatview/config.ini)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Debug logging, mirrored to stdout
    #[arg(long)]
    pub debug: bool,
}

/// Scripted input at an offset from mount.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Action {
    Drag,
    Resize(SurfaceSize),
    ReducedMotion,
}

impl SimulateArgs {
    fn mount_config(&self) -> Result<MountConfig, CliError> {
        let kind = match &self.kind {
            Some(kind) => kind.parse::<AssetKind>()?,
            None => ModelFormat::from_url(&self.url)
                .map(|format| format.kind())
                .ok_or_else(|| AssetError::UnknownFormat(self.url.clone()))?,
        };
        let asset = AssetRef::new(self.url.clone(), kind, self.poster.clone())?;
        Ok(MountConfig::new(asset).with_auto_rotate(!self.no_auto_rotate))
    }

    fn backend_config(&self) -> SimulatedConfig {
        let latency = Duration::from_millis(self.load_ms);
        let config = SimulatedConfig::default();
        if self.fail_context {
            config.with_context_failure()
        } else if self.fail_load {
            config.with_load(LoadBehavior::fail_after(latency))
        } else if self.hang {
            config.with_load(LoadBehavior::hang())
        } else {
            config.with_load(LoadBehavior::succeed_after(latency))
        }
    }

    fn viewer_config(&self, base: ViewerConfig) -> ViewerConfig {
        let fade = base.hint.fade();
        match self.hint {
            Some(HintModeArg::Fixed) => base.with_hint_policy(HintPolicy::fixed()),
            Some(HintModeArg::Interaction) => {
                base.with_hint_policy(HintPolicy::UntilInteraction { fade })
            }
            None => base,
        }
    }

    /// Scripted actions ordered by offset.
    fn timeline(&self) -> Vec<(u64, Action)> {
        let mut actions: Vec<(u64, Action)> = self
            .resize
            .iter()
            .map(|step| (step.at_ms, Action::Resize(step.size)))
            .collect();
        if let Some(at) = self.drag_at_ms {
            actions.push((at, Action::Drag));
        }
        if let Some(at) = self.reduced_motion_at_ms {
            actions.push((at, Action::ReducedMotion));
        }
        actions.sort_by_key(|(at, _)| *at);
        actions
    }
}

/// Run the simulate command.
pub fn run(args: SimulateArgs) -> Result<(), CliError> {
    if args.run_ms == 0 {
        return Err(CliError::InvalidArgument("--run-ms must be greater than zero".into()));
    }

    let runner = CliRunner::new(args.config.as_deref(), args.debug)?;
    runner.log_startup("simulate");

    let mount = args.mount_config()?;
    let viewer_config = args.viewer_config(runner.config().viewer_config());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;

    runtime.block_on(simulate(&args, mount, viewer_config));
    Ok(())
}

async fn simulate(args: &SimulateArgs, mount: MountConfig, viewer_config: ViewerConfig) {
    let backend = SimulatedBackend::new(args.backend_config());
    let journal = backend.journal();
    let environment = Arc::new(SharedEnvironment::new(EnvironmentSignal::new(
        args.reduced_motion,
        args.save_data,
    )));
    let host = ViewerHost::new(Arc::new(backend), environment.clone(), viewer_config);
    let surface = MountSurface::new("simulate", args.size);

    let mut states = host.subscribe_state();
    let mut hints = host.subscribe_hint();
    let mut events = host.subscribe();

    let started = Instant::now();
    let stamp = move || format!("[{:>6} ms]", started.elapsed().as_millis());

    println!("{} mount {} into {} ({})", stamp(), mount.asset, surface.id(), args.size);
    host.render(mount, surface.clone());
    println!("{} state: {}", stamp(), host.state());
    let _ = states.borrow_and_update();
    if let Some(poster) = host.poster() {
        match poster.badge {
            Some(badge) => println!("{} poster: {} [{}]", stamp(), poster.url, badge),
            None => println!("{} poster: {}", stamp(), poster.url),
        }
    }

    let mut timeline = args.timeline().into_iter().peekable();
    let deadline = started + Duration::from_millis(args.run_ms);
    let mut events_open = true;

    loop {
        let next_action = timeline.peek().map(|(at, _)| started + Duration::from_millis(*at));

        tokio::select! {
            _ = sleep_until(deadline) => break,

            _ = wait_until(next_action), if next_action.is_some() => {
                if let Some((_, action)) = timeline.next() {
                    match action {
                        Action::Drag => {
                            println!("{} input: drag", stamp());
                            surface.dispatch_input(PointerInput::PointerDown { buttons: 1 });
                            surface.dispatch_input(PointerInput::PointerMove { buttons: 1 });
                            surface.dispatch_input(PointerInput::PointerUp);
                        }
                        Action::Resize(size) => {
                            println!("{} input: resize to {}", stamp(), size);
                            surface.set_size(size.width, size.height);
                        }
                        Action::ReducedMotion => {
                            println!("{} input: reduced motion on", stamp());
                            environment.set_reduced_motion(true);
                        }
                    }
                }
            }

            Ok(()) = states.changed() => {
                let state = *states.borrow_and_update();
                println!("{} state: {}", stamp(), state);
            }

            Ok(()) = hints.changed() => {
                let hint = *hints.borrow_and_update();
                println!("{} hint: {}", stamp(), describe_hint(hint));
            }

            received = events.recv(), if events_open => match received {
                Ok(ViewerEvent::Ready { url }) => println!("{} ready: {}", stamp(), url),
                Ok(ViewerEvent::Error { url, kind }) => {
                    println!("{} error: {} ({})", stamp(), url, kind)
                }
                Err(_) => events_open = false,
            },
        }
    }

    host.teardown();
    println!("{} unmounted", stamp());
    println!();
    println!("Contexts created:  {}", journal.created());
    println!("Contexts released: {}", journal.released());
    println!("Frames rendered:   {}", journal.frames_rendered());
    println!("Canvas nodes left: {}", surface.attached_nodes());
}

fn describe_hint(hint: HintState) -> &'static str {
    match (hint.visible, hint.fading) {
        (false, _) => "hidden",
        (true, false) => "visible",
        (true, true) => "fading",
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: SimulateArgs,
    }

    fn parse(argv: &[&str]) -> SimulateArgs {
        let mut full = vec!["splatview"];
        full.extend_from_slice(argv);
        TestCli::parse_from(full).args
    }

    #[test]
    fn test_resize_step_parse() {
        let step: ResizeStep = "800x600@1500".parse().unwrap();
        assert_eq!(step.size, SurfaceSize::new(800, 600));
        assert_eq!(step.at_ms, 1500);

        assert!("800x600".parse::<ResizeStep>().is_err());
        assert!("800@10".parse::<ResizeStep>().is_err());
        assert!("axb@10".parse::<ResizeStep>().is_err());
    }

    #[test]
    fn test_timeline_is_ordered() {
        let args = parse(&[
            "--url",
            "a.ply",
            "--resize",
            "0x0@3000",
            "--drag-at-ms",
            "2000",
            "--resize",
            "640x480@1000",
        ]);

        let offsets: Vec<u64> = args.timeline().iter().map(|(at, _)| *at).collect();
        assert_eq!(offsets, vec![1000, 2000, 3000]);
    }

    #[test]
    fn test_kind_inferred_from_url() {
        let args = parse(&["--url", "/m/pot.glb"]);
        assert_eq!(args.mount_config().unwrap().asset.kind(), AssetKind::Mesh);

        let args = parse(&["--url", "/m/pot.bin", "--kind", "splat"]);
        assert_eq!(
            args.mount_config().unwrap().asset.kind(),
            AssetKind::PointCloud
        );

        let args = parse(&["--url", "/m/pot.bin"]);
        assert!(args.mount_config().is_err());
    }

    #[test]
    fn test_conflicting_failure_flags_rejected() {
        let result =
            TestCli::try_parse_from(["splatview", "--url", "a.ply", "--fail-load", "--hang"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_interaction_hint_override_keeps_fade() {
        let args = parse(&["--url", "a.ply", "--hint", "interaction"]);
        let config = args.viewer_config(ViewerConfig::default());
        assert!(config.hint.ends_on_interaction());
        assert_eq!(config.hint.fade(), Duration::from_millis(1_000));
    }
}
