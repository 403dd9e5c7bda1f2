//! Flint application shim: window creation, keyboard/resize tracking, and the
//! fixed-update/variable-render loop, with drawing delegated to caller hooks.

pub mod error;
pub mod gpu;
pub mod scheduler;

pub use error::{AppError, CallbackError, InitError};
pub use gpu::{GpuContext, GpuError, Renderer, SurfaceError};
pub use scheduler::{HookError, Phase, Scheduler};
