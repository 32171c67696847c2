//! Integration contract with the external 3D rendering engine.
//!
//! The engine itself (splat sorting, shading, mesh decoding) is not part of
//! this crate. This module defines the seam the viewer lifecycle talks to:
//!
//! - [`RenderBackend`] - loads the engine module and constructs a
//!   [`RenderContext`] for a sized surface (phase 1 of acquisition)
//! - [`RenderContext`] - one live rendering context: streams a scene in
//!   (phase 2), resizes, rotates, renders frames, and releases its native
//!   resources on `dispose`
//!
//! [`SimulatedBackend`] implements the contract without a GPU. It records a
//! journal of every native operation so tests and the CLI can check that
//! contexts are created and released exactly once.

mod error;
mod simulated;
mod traits;

pub use error::BackendError;
pub use simulated::{
    BackendJournal, BackendOp, LoadBehavior, LoadOutcome, SimulatedBackend, SimulatedConfig,
    TeardownFault,
};
pub use traits::{BoxFuture, ContextParams, RenderBackend, RenderContext};
