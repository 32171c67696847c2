//! Interaction hint overlay.
//!
//! When a viewer becomes ready it shows a short "drag to rotate" hint. The
//! [`InteractionHintController`] owns the hint's visibility timeline and the
//! input subscription that retires it:
//!
//! ```text
//!  FixedDuration                     UntilInteraction
//!  ─────────────                     ────────────────
//!  t=0     visible                   t=0     visible
//!  t=2500  fading                    drag    fading      (first qualifying gesture)
//!  t=3500  hidden                    +1000   hidden
//! ```
//!
//! Independently of the variant, the first qualifying gesture (a drag with a
//! held button, or a touch move) stops ambient rotation through
//! [`AutoRotationControl`]. Hovers, taps and clicks never qualify.

mod controller;
mod policy;

pub use controller::{AutoRotationControl, HintState, InteractionHintController};
pub use policy::HintPolicy;
