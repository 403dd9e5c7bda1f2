//! The frame scheduler: owns the run loop, the caller-supplied hooks, and the
//! window/GPU resources.
//!
//! A scheduler is single-use and moves through `Created -> Configured ->
//! Running -> Stopped`. Hooks are installed before [`run`](Scheduler::run);
//! replacing them mid-loop is not supported and is rejected by the phase
//! check. Each loop iteration clears the frame, advances the fixed-update
//! accumulator, invokes the render hook exactly once, presents, and then
//! processes pending input events. Termination (close request or a hook
//! error) takes effect after the current iteration completes, never mid-step.
//!
//! Everything runs on the thread that called `run`; hooks that block stall
//! the whole loop. The pressed-key set is mutated only during event
//! processing on that same thread.

use std::cell::RefCell;
use std::collections::HashSet;
use std::sync::Arc;

use flint_config::{Config, TimingConfig};
use flint_frame::{CatchUpPolicy, FrameLoop, SystemClock};
use flint_input::{KeyAction, PressedKeys};
use tracing::{error, info, warn};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::PhysicalKey;
use winit::window::{Window, WindowAttributes, WindowId};

use crate::error::{AppError, CallbackError, InitError};
use crate::gpu::{GpuContext, Renderer, SurfaceError, init_gpu_blocking};

/// Error type hooks may return; wrapped into [`CallbackError`] on failure.
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

/// Update hook: runs at the fixed simulation rate.
pub type UpdateFn = Box<dyn FnMut() -> Result<(), HookError>>;
/// Render hook: runs exactly once per frame with the renderer handle.
pub type RenderFn = Box<dyn FnMut(&mut Renderer<'_>) -> Result<(), HookError>>;
/// Key hook: runs for every non-repeat press/release event.
pub type KeyFn = Box<dyn FnMut(PhysicalKey, KeyAction) -> Result<(), HookError>>;

/// Scheduler lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Constructed; default no-op hooks installed.
    Created,
    /// Caller hooks installed; ready to run.
    Configured,
    /// Inside `run`.
    Running,
    /// `run` returned. No transition back to `Running` exists.
    Stopped,
}

/// Default deep-slate clear color.
const DEFAULT_CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.06,
    g: 0.06,
    b: 0.09,
    a: 1.0,
};

struct Hooks {
    update: UpdateFn,
    render: RenderFn,
    key: KeyFn,
}

impl Default for Hooks {
    fn default() -> Self {
        Self {
            update: Box::new(|| Ok(())),
            render: Box::new(|_| Ok(())),
            key: Box::new(|_, _| Ok(())),
        }
    }
}

/// Owns the real-time loop: fixed-rate updates, one render per frame, and the
/// window/GPU resources behind them.
pub struct Scheduler {
    config: Config,
    phase: Phase,
    hooks: Hooks,
    frame_loop: FrameLoop,
    clock: SystemClock,
    pressed: PressedKeys,
    width: u32,
    height: u32,
    clear_color: wgpu::Color,
    window: Option<Arc<Window>>,
    gpu: Option<GpuContext>,
    pending_error: Option<AppError>,
}

impl Scheduler {
    /// Creates a scheduler from a configuration. Safe to run unconfigured:
    /// the default hooks do nothing.
    pub fn new(config: Config) -> Self {
        let policy = policy_from_timing(&config.timing);
        let frame_loop = FrameLoop::from_hz(config.timing.update_hz, policy);
        let width = config.window.width.max(1);
        let height = config.window.height.max(1);
        Self {
            config,
            phase: Phase::Created,
            hooks: Hooks::default(),
            frame_loop,
            clock: SystemClock::new(),
            pressed: PressedKeys::new(),
            width,
            height,
            clear_color: DEFAULT_CLEAR_COLOR,
            window: None,
            gpu: None,
            pending_error: None,
        }
    }

    /// Replaces the default no-op hooks. Valid before [`run`](Self::run)
    /// only; rejected once the scheduler is running or stopped.
    pub fn configure(
        &mut self,
        update: impl FnMut() -> Result<(), HookError> + 'static,
        render: impl FnMut(&mut Renderer<'_>) -> Result<(), HookError> + 'static,
        on_key: impl FnMut(PhysicalKey, KeyAction) -> Result<(), HookError> + 'static,
    ) -> Result<(), AppError> {
        match self.phase {
            Phase::Created | Phase::Configured => {
                self.hooks = Hooks {
                    update: Box::new(update),
                    render: Box::new(render),
                    key: Box::new(on_key),
                };
                self.phase = Phase::Configured;
                Ok(())
            }
            phase => Err(AppError::InvalidPhase {
                op: "configure",
                phase,
            }),
        }
    }

    /// Sets the color the frame is cleared to each iteration. Takes effect
    /// from the next frame; intended to be called before `run`.
    pub fn set_clear_color(&mut self, color: wgpu::Color) {
        self.clear_color = color;
    }

    /// Runs the loop, blocking until the window close is requested or a hook
    /// fails. Window and GPU initialization failures are fatal and returned
    /// before any iteration runs; hook failures are returned after the
    /// current iteration finishes. Resources stay alive until
    /// [`shutdown`](Self::shutdown) so read accessors remain valid.
    pub fn run(&mut self) -> Result<(), AppError> {
        if matches!(self.phase, Phase::Running | Phase::Stopped) {
            return Err(AppError::InvalidPhase {
                op: "run",
                phase: self.phase,
            });
        }

        let event_loop = EventLoop::new().map_err(InitError::EventLoop)?;
        self.phase = Phase::Running;
        let result = event_loop.run_app(self);
        self.phase = Phase::Stopped;

        if let Some(err) = self.pending_error.take() {
            // Failures win over the loop's own exit status.
            return Err(err);
        }
        result.map_err(AppError::EventLoop)
    }

    /// Releases the window and GPU resources. Valid after `run` returns;
    /// calling before `run`, or a second time, is a logged no-op.
    pub fn shutdown(&mut self) -> Result<(), AppError> {
        if self.phase != Phase::Stopped {
            warn!("shutdown called before run completed; nothing to release");
            return Ok(());
        }
        if self.gpu.is_none() && self.window.is_none() {
            warn!("shutdown called twice; resources already released");
            return Ok(());
        }
        self.gpu = None;
        self.window = None;
        info!("window and GPU resources released");
        Ok(())
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Current surface width in physical pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Current surface height in physical pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Duration of the most recent render hook invocation, in milliseconds.
    pub fn last_render_ms(&self) -> f64 {
        self.frame_loop.last_render_ms()
    }

    /// Total fixed updates executed.
    pub fn update_count(&self) -> u64 {
        self.frame_loop.update_count()
    }

    /// Total frames rendered.
    pub fn frame_count(&self) -> u64 {
        self.frame_loop.frame_count()
    }

    /// Snapshot of the currently held keys.
    pub fn pressed_keys(&self) -> HashSet<PhysicalKey> {
        self.pressed.snapshot()
    }

    /// Record new surface dimensions and reconfigure the GPU surface.
    /// New dimensions are visible through the accessors (and the renderer
    /// handle) before the next render hook runs.
    fn apply_resize(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
        if let Some(gpu) = self.gpu.as_mut() {
            gpu.resize(self.width, self.height);
        }
    }

    /// Dimensions the next renderer handle will carry. Resize events are
    /// folded in during event processing, before the frame is drawn.
    fn renderer_extent(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Fold a key event into the pressed set and forward it to the key hook.
    fn apply_key(&mut self, key: PhysicalKey, action: KeyAction) {
        self.pressed.apply(key, action);
        if let Err(e) = (self.hooks.key)(key, action) {
            let err = CallbackError::new("key", e);
            error!("{err}");
            self.pending_error = Some(err.into());
        }
    }

    /// One loop iteration: clear, fixed updates, render, present.
    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        if self.pending_error.is_some() {
            return;
        }
        let Some(gpu) = self.gpu.as_ref() else {
            return;
        };

        let surface_texture = match gpu.acquire() {
            Ok(texture) => texture,
            Err(err) => {
                self.handle_surface_error(err, event_loop);
                return;
            }
        };
        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        // Clear the target before any simulation work runs.
        gpu.clear(&view, self.clear_color);

        let (width, height) = self.renderer_extent();
        let update_hook = &mut self.hooks.update;
        let render_hook = &mut self.hooks.render;
        let device = &gpu.device;
        let queue = &gpu.queue;
        let format = gpu.surface_format;
        let failure: RefCell<Option<CallbackError>> = RefCell::new(None);

        self.frame_loop.tick(
            &self.clock,
            || {
                if failure.borrow().is_some() {
                    return;
                }
                if let Err(e) = update_hook() {
                    *failure.borrow_mut() = Some(CallbackError::new("update", e));
                }
            },
            || {
                if failure.borrow().is_some() {
                    return;
                }
                let mut renderer = Renderer {
                    device,
                    queue,
                    target: &view,
                    format,
                    width,
                    height,
                };
                if let Err(e) = render_hook(&mut renderer) {
                    *failure.borrow_mut() = Some(CallbackError::new("render", e));
                }
            },
        );

        surface_texture.present();

        if self.config.debug.show_frame_time && self.frame_loop.frame_count().is_multiple_of(120) {
            info!(
                "render {:.2}ms ({} updates, {} frames)",
                self.frame_loop.last_render_ms(),
                self.frame_loop.update_count(),
                self.frame_loop.frame_count(),
            );
        }

        if let Some(err) = failure.into_inner() {
            error!("{err}");
            self.pending_error = Some(err.into());
            event_loop.exit();
        }
    }

    fn handle_surface_error(&mut self, err: SurfaceError, event_loop: &ActiveEventLoop) {
        match err {
            SurfaceError::Lost => {
                let (w, h) = (self.width, self.height);
                if let Some(gpu) = self.gpu.as_mut() {
                    gpu.resize(w, h);
                }
            }
            SurfaceError::OutOfMemory => {
                error!("GPU out of memory");
                self.pending_error = Some(AppError::OutOfMemory);
                event_loop.exit();
            }
            SurfaceError::Timeout => {
                warn!("Surface timeout, skipping frame");
            }
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl ApplicationHandler for Scheduler {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attrs = window_attributes_from_config(&self.config);
        let window = match event_loop.create_window(attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                error!("Window creation failed: {e}");
                self.pending_error = Some(InitError::Window(e).into());
                event_loop.exit();
                return;
            }
        };

        let size = window.inner_size();
        self.width = size.width.max(1);
        self.height = size.height.max(1);

        match init_gpu_blocking(window.clone(), self.config.window.vsync) {
            Ok(gpu) => self.gpu = Some(gpu),
            Err(e) => {
                error!("GPU initialization failed: {e}");
                self.pending_error = Some(InitError::Gpu(e).into());
                event_loop.exit();
                return;
            }
        }

        info!(
            "Window created: {}x{} \"{}\"",
            self.width, self.height, self.config.window.title
        );
        window.request_redraw();
        self.window = Some(window);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested, shutting down");
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                self.apply_resize(new_size.width, new_size.height);
            }
            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(window) = &self.window {
                    let new_inner = window.inner_size();
                    self.apply_resize(new_inner.width, new_inner.height);
                }
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if !event.repeat {
                    self.apply_key(event.physical_key, KeyAction::from(event.state));
                    if self.pending_error.is_some() {
                        event_loop.exit();
                    }
                }
            }
            WindowEvent::Focused(false) => {
                // Release events are not delivered while unfocused.
                self.pressed.clear();
            }
            WindowEvent::RedrawRequested => {
                self.redraw(event_loop);
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }
}

/// Returns [`WindowAttributes`] based on the given configuration.
pub fn window_attributes_from_config(config: &Config) -> WindowAttributes {
    WindowAttributes::default()
        .with_title(config.window.title.clone())
        .with_inner_size(LogicalSize::new(
            config.window.width as f64,
            config.window.height as f64,
        ))
}

/// Maps the timing config onto a catch-up policy: a zero cap selects the
/// single-update behavior, anything else caps catch-up at that many steps.
fn policy_from_timing(timing: &TimingConfig) -> CatchUpPolicy {
    if timing.max_catch_up_steps == 0 {
        CatchUpPolicy::Single
    } else {
        CatchUpPolicy::Capped {
            max_steps: timing.max_catch_up_steps,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::keyboard::KeyCode;

    fn key(code: KeyCode) -> PhysicalKey {
        PhysicalKey::Code(code)
    }

    #[test]
    fn test_new_scheduler_is_created_phase() {
        let s = Scheduler::default();
        assert_eq!(s.phase(), Phase::Created);
        assert_eq!(s.width(), 1280);
        assert_eq!(s.height(), 720);
        assert_eq!(s.update_count(), 0);
        assert_eq!(s.frame_count(), 0);
        assert!(s.pressed_keys().is_empty());
    }

    #[test]
    fn test_configure_transitions_to_configured() {
        let mut s = Scheduler::default();
        s.configure(|| Ok(()), |_| Ok(()), |_, _| Ok(())).unwrap();
        assert_eq!(s.phase(), Phase::Configured);
        // Reconfiguring before run is allowed.
        s.configure(|| Ok(()), |_| Ok(()), |_, _| Ok(())).unwrap();
        assert_eq!(s.phase(), Phase::Configured);
    }

    #[test]
    fn test_configure_rejected_while_running_or_stopped() {
        for phase in [Phase::Running, Phase::Stopped] {
            let mut s = Scheduler::default();
            s.phase = phase;
            let err = s
                .configure(|| Ok(()), |_| Ok(()), |_, _| Ok(()))
                .unwrap_err();
            assert!(matches!(
                err,
                AppError::InvalidPhase {
                    op: "configure",
                    ..
                }
            ));
        }
    }

    #[test]
    fn test_run_rejected_after_stopped() {
        let mut s = Scheduler::default();
        s.phase = Phase::Stopped;
        let err = s.run().unwrap_err();
        assert!(matches!(err, AppError::InvalidPhase { op: "run", .. }));
    }

    #[test]
    fn test_shutdown_before_run_is_noop() {
        let mut s = Scheduler::default();
        assert!(s.shutdown().is_ok());
        assert_eq!(s.phase(), Phase::Created);
    }

    #[test]
    fn test_shutdown_twice_is_noop() {
        let mut s = Scheduler::default();
        s.phase = Phase::Stopped;
        assert!(s.shutdown().is_ok());
        assert!(s.shutdown().is_ok());
    }

    #[test]
    fn test_default_hooks_are_safe() {
        let mut s = Scheduler::default();
        assert!((s.hooks.update)().is_ok());
        assert!((s.hooks.key)(key(KeyCode::KeyA), KeyAction::Pressed).is_ok());
    }

    #[test]
    fn test_resize_updates_accessors() {
        let mut s = Scheduler::default();
        s.apply_resize(800, 600);
        assert_eq!(s.width(), 800);
        assert_eq!(s.height(), 600);
    }

    #[test]
    fn test_resize_visible_before_next_render() {
        let mut s = Scheduler::default();
        s.apply_resize(800, 600);
        // The snapshot the next renderer handle is built from already
        // carries the new dimensions.
        assert_eq!(s.renderer_extent(), (800, 600));
        s.apply_resize(0, 0);
        assert_eq!(s.renderer_extent(), (1, 1));
    }

    #[test]
    fn test_resize_clamps_zero() {
        let mut s = Scheduler::default();
        s.apply_resize(0, 0);
        assert_eq!(s.width(), 1);
        assert_eq!(s.height(), 1);
    }

    #[test]
    fn test_key_events_update_pressed_set_and_hook() {
        use std::rc::Rc;

        let seen: Rc<RefCell<Vec<(PhysicalKey, KeyAction)>>> = Rc::new(RefCell::new(Vec::new()));
        let seen_hook = seen.clone();

        let mut s = Scheduler::default();
        s.configure(
            || Ok(()),
            |_| Ok(()),
            move |k, a| {
                seen_hook.borrow_mut().push((k, a));
                Ok(())
            },
        )
        .unwrap();

        s.apply_key(key(KeyCode::KeyA), KeyAction::Pressed);
        s.apply_key(key(KeyCode::KeyB), KeyAction::Pressed);
        s.apply_key(key(KeyCode::KeyA), KeyAction::Released);

        assert_eq!(
            s.pressed_keys(),
            HashSet::from([key(KeyCode::KeyB)])
        );
        assert_eq!(seen.borrow().len(), 3);
        assert_eq!(
            seen.borrow()[2],
            (key(KeyCode::KeyA), KeyAction::Released)
        );
    }

    #[test]
    fn test_key_hook_error_is_stashed() {
        let mut s = Scheduler::default();
        s.configure(
            || Ok(()),
            |_| Ok(()),
            |_, _| Err("key handler broke".into()),
        )
        .unwrap();

        s.apply_key(key(KeyCode::Space), KeyAction::Pressed);
        assert!(matches!(
            s.pending_error,
            Some(AppError::Callback(ref e)) if e.hook == "key"
        ));
        // The pressed set still reflects the event.
        assert!(s.pressed_keys().contains(&key(KeyCode::Space)));
    }

    #[test]
    fn test_policy_from_timing() {
        let mut timing = TimingConfig::default();
        assert_eq!(
            policy_from_timing(&timing),
            CatchUpPolicy::Capped { max_steps: 4 }
        );
        timing.max_catch_up_steps = 0;
        assert_eq!(policy_from_timing(&timing), CatchUpPolicy::Single);
    }

    #[test]
    fn test_scheduler_honors_timing_config() {
        let mut config = Config::default();
        config.timing.update_hz = 120;
        let s = Scheduler::new(config);
        assert!((s.frame_loop.period() - 1.0 / 120.0).abs() < 1e-12);
    }
}
