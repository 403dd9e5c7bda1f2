//! Fixed-timestep frame loop: simulation at a fixed rate, rendering once per
//! frame, with an explicit catch-up policy for slow frames.

pub mod clock;
pub mod frame_loop;

pub use clock::{Clock, ManualClock, SystemClock};
pub use frame_loop::{CatchUpPolicy, DEFAULT_MAX_CATCH_UP, DEFAULT_PERIOD, FrameLoop};
