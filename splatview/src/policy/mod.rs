//! Environment-aware acquisition policy.
//!
//! Decides whether a viewer may acquire the heavy 3D resource at all, based on
//! the user's ambient preferences:
//!
//! - **Reduced motion**: the user asked the platform to minimise animation.
//!   Live; may flip while a page is open.
//! - **Save data**: the user is on a constrained connection (explicit
//!   save-data hint or a 2G-class effective connection). Sampled at mount.
//!
//! # Architecture
//!
//! ```text
//! EnvironmentSource ──snapshot()──▶ EnvironmentSignal ──▶ EnvironmentPolicy::evaluate()
//!        │                                                        │
//!        └──subscribe()──▶ watch::Receiver                        ▼
//!                                                          PolicyDecision
//!                                                  { should_acquire, reason }
//! ```
//!
//! The policy gates *acquisition* only. A decision that changes after a session
//! has been acquired never tears the session down.

mod evaluate;
mod signal;
mod source;

pub use evaluate::{EnvironmentPolicy, FallbackReason, PolicyDecision};
pub use signal::{ConnectionHint, EffectiveConnectionType, EnvironmentSignal};
pub use source::{EnvironmentSource, SharedEnvironment};
