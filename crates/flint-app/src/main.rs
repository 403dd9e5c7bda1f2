//! Demo binary: opens a Flint window, clears it each frame, and logs loop
//! activity.
//!
//! Configuration is loaded from `config.ron` and can be overridden via CLI
//! flags, e.g. `cargo run -p flint-app -- --width 1920 --height 1080`.

use std::cell::Cell;
use std::path::PathBuf;
use std::rc::Rc;

use clap::Parser;
use flint_app::{Renderer, Scheduler};
use flint_config::{CliArgs, Config};
use tracing::info;

fn main() {
    let args = CliArgs::parse();

    let config_dir = args.config.clone().unwrap_or_else(default_config_dir);
    let mut config = match Config::load_or_create(&config_dir) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config, using defaults: {e}");
            Config::default()
        }
    };
    config.apply_cli_overrides(&args);

    flint_log::init_logging(
        Some(&config_dir.join("logs")),
        cfg!(debug_assertions),
        Some(&config),
    );

    let update_hz = config.timing.update_hz.max(1);
    let mut scheduler = Scheduler::new(config);

    // Simulated time, advanced by the update hook and read by the render
    // hook to cycle the clear color. Both hooks run on the loop thread.
    let sim_time = Rc::new(Cell::new(0.0f64));
    let sim_time_update = sim_time.clone();
    let period = 1.0 / f64::from(update_hz);

    let mut ticks: u64 = 0;
    let configured = scheduler.configure(
        move || {
            ticks += 1;
            sim_time_update.set(sim_time_update.get() + period);
            // Once a simulated second.
            if ticks.is_multiple_of(u64::from(update_hz)) {
                info!("simulated {ticks} ticks");
            }
            Ok(())
        },
        move |renderer| {
            draw_cycling_clear(renderer, sim_time.get());
            Ok(())
        },
        |key, action| {
            info!("key {key:?} {action:?}");
            Ok(())
        },
    );
    if let Err(e) = configured {
        eprintln!("Failed to configure scheduler: {e}");
        std::process::exit(1);
    }

    if let Err(e) = scheduler.run() {
        eprintln!("Scheduler failed: {e}");
        let _ = scheduler.shutdown();
        std::process::exit(1);
    }

    info!(
        "Loop finished: {} updates, {} frames, last render {:.2}ms",
        scheduler.update_count(),
        scheduler.frame_count(),
        scheduler.last_render_ms(),
    );

    if let Err(e) = scheduler.shutdown() {
        eprintln!("Shutdown failed: {e}");
        std::process::exit(1);
    }
}

/// Overwrites the frame with a clear color that cycles slowly with simulated
/// time, so fixed-update progress is visible on screen.
fn draw_cycling_clear(renderer: &mut Renderer<'_>, t: f64) {
    let color = wgpu::Color {
        r: 0.5 + 0.4 * (0.3 * t).sin(),
        g: 0.5 + 0.4 * (0.3 * t + 2.1).sin(),
        b: 0.5 + 0.4 * (0.3 * t + 4.2).sin(),
        a: 1.0,
    };
    let mut encoder = renderer
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("demo-clear"),
        });
    {
        let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("demo-clear-pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: renderer.target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(color),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
    }
    renderer.queue.submit(std::iter::once(encoder.finish()));
}

/// OS-appropriate config directory, falling back to the working directory.
fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("flint")
}
