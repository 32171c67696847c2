//! Progressive viewer lifecycle.
//!
//! A [`ViewerHost`] binds one asset to one mount surface and walks it through
//! the [`ViewerState`] machine:
//!
//! ```text
//!                        ┌───────────────────────────────┐
//!  render() ──► policy ──┤ forbids: Poster + badge       │
//!                        │ permits: Loading ──► Ready ───┼──► hint, auto-rotate
//!                        │              │                │
//!                        │              └──► Error ──────┼──► poster stays
//!                        └───────────────────────────────┘
//!                              (watchdog, load failure)
//! ```
//!
//! The host owns the collaborators:
//!
//! - [`crate::policy::EnvironmentPolicy`] decides at mount whether 3D may load
//! - [`crate::session::ResourceSession`] owns the engine context
//! - [`crate::hint::InteractionHintController`] shows the hint on `Ready`
//!
//! A background driver task per mount feeds session outcomes, the loading
//! watchdog, and live environment changes into the state machine. All
//! transitions and their effects run under one lock, so whichever of a
//! session outcome and the watchdog reaches the machine first wins.

mod host;
mod state;

pub use host::{PosterView, ViewerEvent, ViewerHost};
pub use state::{Effect, Trigger, ViewerState, ViewerStateMachine};
