//! splatview - Progressive 3D viewer lifecycle
//!
//! Shows a poster image first, upgrades to an interactive 3D model when the
//! environment allows it, and falls back to the poster when loading fails or
//! takes too long. The rendering engine is external; this crate owns the
//! lifecycle around it.
//!
//! # High-Level API
//!
//! [`viewer::ViewerHost`] is the composition root:
//!
//! ```ignore
//! use splatview::viewer::ViewerHost;
//!
//! let host = ViewerHost::new(backend, environment, ViewerConfig::default());
//! host.render(MountConfig::from_url("/models/fern.ply", "/posters/fern.webp")?, surface);
//! // ... later, when the page unmounts the viewer
//! host.teardown();
//! ```
//!
//! # Modules
//!
//! - [`policy`] - reduced-motion / save-data gate
//! - [`session`] - engine context ownership and disposal
//! - [`viewer`] - state machine and host
//! - [`hint`] - interaction hint overlay
//! - [`engine`] - engine contract and a simulated engine
//! - [`surface`], [`asset`] - mount targets and asset descriptors

pub mod asset;
pub mod config;
pub mod engine;
pub mod hint;
pub mod logging;
pub mod policy;
pub mod session;
pub mod surface;
pub mod viewer;

/// Version of the splatview library and CLI.
///
/// Defined in the workspace `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
