//! Resource sessions: ownership of one engine instance per mount.
//!
//! A [`ResourceSession`] turns an asset and a mount surface into a live
//! rendering context, and guarantees the context is released exactly once no
//! matter when the caller gives up on it.
//!
//! # Acquisition
//!
//! ```text
//!   acquire() ──► spawn ──► measure surface ──► create_context ──► load_scene
//!       │                        │ zero            │ Err               │ Err
//!       ▼                        ▼                 ▼                   ▼
//!  SessionHandle             Failed(ContextCreationFailed)    Failed(AssetLoadFailed)
//!   (Loading)                                                         │ Ok
//!                                                                     ▼
//!                                                          Ready ──► frame loop
//! ```
//!
//! Completion is reported on an `mpsc` channel as [`SessionEvent`]s.
//!
//! # Disposal
//!
//! Every handle carries a `CancellationToken`. [`ResourceSession::dispose`]
//! cancels it and releases native resources under the same lock the
//! acquisition task takes before it publishes an outcome, so a disposed handle
//! never reports `Ready` or `Failed`. Disposal is synchronous, idempotent, and
//! swallows engine teardown errors and panics.

mod error;
mod handle;
mod resource;

pub use error::{SessionError, ViewerErrorKind};
pub use handle::{SessionHandle, SessionId, SessionStatus};
pub use resource::{ResourceSession, SessionEvent};
