//! Error taxonomy for the scheduler: initialization failures are fatal and
//! surfaced before the loop starts; callback failures propagate out of `run`
//! after resources are released. Nothing is retried or masked.

use crate::gpu::GpuError;
use crate::scheduler::Phase;

/// The window or GPU context could not be created; the loop never starts.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    /// Failed to create the winit event loop.
    #[error("failed to create event loop: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    /// Failed to create the native window.
    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),

    /// GPU device or surface initialization failed.
    #[error("GPU initialization failed: {0}")]
    Gpu(#[from] GpuError),
}

/// An update/render/key hook returned an error. Propagated to the `run`
/// caller once the current iteration has finished.
#[derive(Debug, thiserror::Error)]
#[error("{hook} hook failed: {source}")]
pub struct CallbackError {
    /// Which hook failed: `"update"`, `"render"`, or `"key"`.
    pub hook: &'static str,
    /// The error the hook returned.
    #[source]
    pub source: Box<dyn std::error::Error + Send + Sync>,
}

impl CallbackError {
    pub(crate) fn new(
        hook: &'static str,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self { hook, source }
    }
}

/// Umbrella error returned by [`Scheduler`](crate::Scheduler) operations.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Initialization failed before the loop started.
    #[error(transparent)]
    Init(#[from] InitError),

    /// A caller-supplied hook failed during the loop.
    #[error(transparent)]
    Callback(#[from] CallbackError),

    /// An operation was called in a lifecycle phase that does not allow it.
    #[error("{op} is not valid while the scheduler is {phase:?}")]
    InvalidPhase {
        /// The rejected operation.
        op: &'static str,
        /// The phase the scheduler was in.
        phase: Phase,
    },

    /// The event loop terminated abnormally.
    #[error("event loop terminated abnormally: {0}")]
    EventLoop(#[source] winit::error::EventLoopError),

    /// The GPU ran out of memory while presenting.
    #[error("GPU out of memory")]
    OutOfMemory,
}
