//! Splat Desktop — demo window for the Splat sprite renderer.
//!
//! Uses `winit` 0.30 for windowing, `splat-core` for the scene and
//! `splat-render` to draw the active canvas every frame.

mod state;

use log::{error, info};
use std::sync::Arc;
use winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    event::{ElementState, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{Key, NamedKey},
    window::{Window, WindowAttributes, WindowId},
};

use splat_render::context::GpuContext;
use state::AppState;

const WINDOW_WIDTH: u32 = 640;
const WINDOW_HEIGHT: u32 = 480;

/// Winit 0.30 application handler.
struct App {
    window: Option<Arc<Window>>,
    state: Option<AppState>,
    frame_count: u64,
}

impl App {
    fn new() -> Self {
        Self {
            window: None,
            state: None,
            frame_count: 0,
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attrs = WindowAttributes::default()
            .with_title("Splat")
            .with_inner_size(LogicalSize::new(WINDOW_WIDTH, WINDOW_HEIGHT))
            .with_min_inner_size(LogicalSize::new(160, 120));

        let window = match event_loop.create_window(attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                error!("Failed to create window: {e}");
                event_loop.exit();
                return;
            }
        };

        let size = window.inner_size();
        let gpu = match pollster::block_on(GpuContext::new_with_surface(
            window.clone(),
            size.width.max(1),
            size.height.max(1),
        )) {
            Ok(gpu) => gpu,
            Err(e) => {
                error!("Failed to initialize GPU: {e}");
                event_loop.exit();
                return;
            }
        };

        let mut app_state = AppState::new(gpu);
        if let Err(e) = app_state.load_demo_scene() {
            error!("Failed to build demo scene: {e}");
            event_loop.exit();
            return;
        }

        info!(
            "Splat Desktop initialized: {}×{}, GPU: {:?}",
            size.width,
            size.height,
            app_state.gpu.adapter.get_info().name
        );

        window.request_redraw();
        self.state = Some(app_state);
        self.window = Some(window);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let (Some(window), Some(state)) = (self.window.as_ref(), self.state.as_mut()) else {
            return;
        };

        match event {
            // ── Close / Escape ──────────────────────────────────
            WindowEvent::CloseRequested => {
                info!("Window closed after {} frames", self.frame_count);
                event_loop.exit();
            }
            WindowEvent::KeyboardInput { event, .. }
                if event.state == ElementState::Pressed
                    && event.logical_key == Key::Named(NamedKey::Escape) =>
            {
                info!("Escape pressed after {} frames", self.frame_count);
                event_loop.exit();
            }

            // ── Resize ──────────────────────────────────────────
            WindowEvent::Resized(new_size) => {
                state.resize(new_size.width, new_size.height);
                window.request_redraw();
            }

            // ── Redraw ──────────────────────────────────────────
            WindowEvent::RedrawRequested => {
                match state.render_frame() {
                    Ok(stats) => {
                        self.frame_count += 1;
                        if self.frame_count % 300 == 0 {
                            info!(
                                "Frame {}: {} drawn, {} culled, {} batch(es), {} overlay",
                                self.frame_count, stats.drawn, stats.culled, stats.batches, stats.overlay
                            );
                        }
                    }
                    Err(splat_render::RenderError::Surface(
                        wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated,
                    )) => {
                        let size = window.inner_size();
                        state.resize(size.width, size.height);
                    }
                    Err(e) => {
                        error!("Render error: {e}");
                    }
                }
                // Continuous redraws drive the animation.
                window.request_redraw();
            }

            _ => {}
        }
    }
}

fn main() {
    env_logger::init();

    info!("Starting Splat Desktop...");

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            error!("Failed to create event loop: {e}");
            return;
        }
    };
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new();
    if let Err(e) = event_loop.run_app(&mut app) {
        error!("Event loop error: {e}");
    }
}
