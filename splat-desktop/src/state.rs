//! Application state — owns the scene, the GPU context and the renderer.
//!
//! The demo builds one canvas with a scrolling tiled floor, a row of
//! mirrored sprites, a spinning sprite, a clipped sprite and a debug
//! overlay, then animates view position and angle from the scene clock.

use log::debug;

use splat_core::{
    CanvasId, Flags, InstanceId, PixelSurface, Point, Rect, Scene, SplatError, TexRegion,
};
use splat_render::context::GpuContext;
use splat_render::{FrameStats, RenderError, Renderer, RendererConfig};

/// Offscreen resolution; the present pass scales it to the window.
const VIEWPORT_WIDTH: u32 = 320;
const VIEWPORT_HEIGHT: u32 = 240;

const TILE_SIZE: u32 = 16;
const FLOOR_COLUMNS: i32 = 40;
const FLOOR_ROWS: i32 = 10;

/// Degrees per second for the spinning sprite.
const SPIN_RATE: f32 = 90.0;
/// Horizontal pan amplitude in pixels, and the period in milliseconds.
const PAN_AMPLITUDE: f32 = 160.0;
const PAN_PERIOD_MS: u64 = 8_000;
/// A debug marker is dropped every `MARKER_INTERVAL_MS` and lives for
/// `MARKER_TTL_MS`.
const MARKER_INTERVAL_MS: u64 = 1_000;
const MARKER_TTL_MS: u32 = 600;

const RED: [f32; 4] = [1.0, 0.2, 0.2, 1.0];
const GREEN: [f32; 4] = [0.2, 1.0, 0.3, 0.5];

/// Handles the frame loop animates.
struct DemoScene {
    canvas: CanvasId,
    spinner: InstanceId,
    last_marker: u64,
}

/// Owns the scene and its render pipeline.
pub struct AppState {
    pub gpu: GpuContext,
    pub renderer: Renderer,
    pub scene: Scene,
    demo: Option<DemoScene>,
}

impl AppState {
    pub fn new(gpu: GpuContext) -> Self {
        let renderer = Renderer::with_config(
            &gpu,
            RendererConfig {
                viewport_width: VIEWPORT_WIDTH,
                viewport_height: VIEWPORT_HEIGHT,
            },
        );

        Self {
            gpu,
            renderer,
            scene: Scene::new(),
            demo: None,
        }
    }

    /// Populate the scene with the demo canvas and make it active.
    pub fn load_demo_scene(&mut self) -> Result<(), SplatError> {
        let scene = &mut self.scene;
        let canvas = scene.create_canvas();
        scene.set_clear_color(canvas, 0.08, 0.08, 0.12, 1.0)?;
        scene.set_active_canvas(Some(canvas))?;

        // ── Images ──────────────────────────────────────────────
        let checker = checkerboard(TILE_SIZE * 2, TILE_SIZE, [90, 90, 110, 255], [60, 60, 75, 255]);
        let arrow = arrow_sprite(TILE_SIZE * 2);

        let mut uploader = self.renderer.uploader(&self.gpu);
        let floor_image = scene.create_image(
            canvas,
            &PixelSurface::rgba(TILE_SIZE * 2, TILE_SIZE * 2, &checker),
            &mut uploader,
        )?;
        let arrow_image = scene.create_image(
            canvas,
            &PixelSurface::rgba(TILE_SIZE * 2, TILE_SIZE * 2, &arrow),
            &mut uploader,
        )?;

        // ── Layers (bottom → top) ───────────────────────────────
        let floor = scene.create_layer(canvas, None)?;
        let sprites = scene.create_layer(canvas, None)?;
        scene.move_layer_to_top(sprites)?;

        // ── Floor: relative tiles, culled as the view pans ──────
        let tile = TILE_SIZE as i32;
        let sheet = (TILE_SIZE * 2, TILE_SIZE * 2);
        let light = TexRegion::from_pixels(Rect::new(0, 0, tile, tile), sheet.0, sheet.1);
        let dark = TexRegion::from_pixels(Rect::new(tile, 0, tile, tile), sheet.0, sheet.1);
        for row in 0..FLOOR_ROWS {
            for column in 0..FLOOR_COLUMNS {
                scene.create_instance(
                    floor_image,
                    floor,
                    column * tile - 160,
                    row * tile + 80,
                    if (row + column) % 2 == 0 { light } else { dark },
                    Flags::RELATIVE.bits(),
                )?;
            }
        }

        // ── Mirrored arrows, fixed to the screen ────────────────
        let mirrors = [
            Flags::empty(),
            Flags::MIRROR_X,
            Flags::MIRROR_Y,
            Flags::MIRROR_DIAG,
            Flags::MIRROR_X | Flags::MIRROR_DIAG,
        ];
        for (i, flags) in mirrors.iter().enumerate() {
            let arrow = scene.create_instance(
                arrow_image,
                sprites,
                16 + i as i32 * 40,
                16,
                TexRegion::FULL,
                flags.bits(),
            )?;
            scene.set_instance_color(arrow, [1.0, 1.0 - i as f32 * 0.15, 1.0, 1.0])?;
        }

        // ── Spinner and a clipped, scaled arrow ─────────────────
        let spinner = scene.create_instance(
            arrow_image,
            sprites,
            240,
            16,
            TexRegion::FULL,
            Flags::ROTATE.bits(),
        )?;
        scene.set_instance_scale(spinner, 1.5, 1.5)?;

        let clipped = scene.create_instance(arrow_image, sprites, 16, 200, TexRegion::FULL, 0)?;
        scene.set_instance_scale(clipped, 4.0, 1.0)?;
        scene.set_instance_clip(clipped, Some(Rect::new(16, 200, 64, 32)))?;

        scene.draw_debug_rect(
            canvas,
            Rect::new(8, 8, 304, 56),
            GREEN,
            1,
            0,
            u32::MAX,
        )?;

        debug!(
            "demo scene: {} instances on {:?}",
            scene.instance_count(),
            canvas
        );
        self.demo = Some(DemoScene {
            canvas,
            spinner,
            last_marker: 0,
        });
        Ok(())
    }

    /// Advance the animation from the scene clock.
    fn animate(&mut self) -> Result<(), SplatError> {
        let Some(demo) = self.demo.as_mut() else {
            return Ok(());
        };
        let scene = &mut self.scene;
        let now = scene.now_ms();

        let phase = (now % PAN_PERIOD_MS) as f32 / PAN_PERIOD_MS as f32;
        let pan = (phase * std::f32::consts::TAU).sin() * PAN_AMPLITUDE;
        scene.set_view_position(demo.canvas, pan as i32, 0)?;

        let angle = (now as f32 / 1000.0 * SPIN_RATE) % 360.0;
        scene.set_instance_angle(demo.spinner, angle)?;

        if now >= demo.last_marker + MARKER_INTERVAL_MS {
            demo.last_marker = now;
            let x = (now / MARKER_INTERVAL_MS % 8) as i32 * 40;
            scene.draw_debug_line(
                demo.canvas,
                Point::new(x, 80),
                Point::new(x + 40, 240),
                RED,
                2,
                Flags::RELATIVE.bits(),
                MARKER_TTL_MS,
            )?;
        }
        Ok(())
    }

    /// Animate and render the active canvas.
    pub fn render_frame(&mut self) -> Result<FrameStats, RenderError> {
        self.animate()?;
        self.renderer.render_active(&self.gpu, &mut self.scene)
    }

    /// Handle window resize.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.gpu.resize(width, height);
    }
}

/// RGBA8 checkerboard of `size`×`size` pixels with `cell`-pixel squares.
fn checkerboard(size: u32, cell: u32, light: [u8; 4], dark: [u8; 4]) -> Vec<u8> {
    let mut pixels = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let texel = if (x / cell + y / cell) % 2 == 0 { light } else { dark };
            pixels.extend_from_slice(&texel);
        }
    }
    pixels
}

/// Right-pointing white arrow on a transparent background, so mirroring
/// and rotation are visible.
fn arrow_sprite(size: u32) -> Vec<u8> {
    let mut pixels = vec![0u8; (size * size * 4) as usize];
    let half = size as i32 / 2;
    for y in 0..size as i32 {
        for x in 0..size as i32 {
            let shaft = (y - half).abs() <= size as i32 / 8 && x < half;
            let head = x >= half && (y - half).abs() <= size as i32 - 1 - x;
            if shaft || head {
                let i = ((y as u32 * size + x as u32) * 4) as usize;
                pixels[i..i + 4].copy_from_slice(&[255, 255, 255, 255]);
            }
        }
    }
    pixels
}

// ===================================================================
// Tests
// ===================================================================
