//! High-level renderer: composes a canvas into a frame, draws it into the
//! fixed-size offscreen target, then presents that target to the window
//! (or to a caller-supplied texture).
//!
//! Every GPU stage runs inside a wgpu validation/out-of-memory error
//! scope.  A captured error aborts the render with the stage name as the
//! call site; the frame is then unusable but nothing panics.

use log::{debug, trace};
use thiserror::Error;
use wgpu::{
    Color, CommandEncoderDescriptor, Device, ErrorFilter, Extent3d, LoadOp, Operations,
    RenderPassColorAttachment, RenderPassDescriptor, StoreOp, Texture, TextureDescriptor,
    TextureDimension, TextureFormat, TextureUsages, TextureView, TextureViewDescriptor,
};

use splat_core::error::{raise, record};
use splat_core::{CanvasId, Scene, SplatError};

use crate::context::GpuContext;
use crate::frame::{self, Frame, FrameStats};
use crate::pipelines::{DebugPipeline, PresentPipeline, SpritePipeline};
use crate::textures::{GpuUploader, TextureCache};
use crate::vertex::{CameraUniform, PresentUniform};

/// Format of the offscreen scene target.
pub const OFFSCREEN_FORMAT: TextureFormat = TextureFormat::Rgba8Unorm;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),
    #[error("No surface configured (headless mode)")]
    NoSurface,
    #[error("driver failure in {site}: {message}")]
    Driver { site: &'static str, message: String },
    #[error(transparent)]
    Scene(#[from] SplatError),
}

impl From<RenderError> for SplatError {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::Surface(e) => SplatError::DriverFailure {
                site: "surface",
                message: e.to_string(),
            },
            RenderError::NoSurface => SplatError::DriverFailure {
                site: "surface",
                message: "no surface configured".into(),
            },
            RenderError::Driver { site, message } => SplatError::DriverFailure { site, message },
            RenderError::Scene(e) => e,
        }
    }
}

/// Renderer settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RendererConfig {
    /// Offscreen resolution the scene is drawn at, independent of the
    /// window size.
    pub viewport_width: u32,
    pub viewport_height: u32,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            viewport_width: 640,
            viewport_height: 480,
        }
    }
}

impl RendererConfig {
    pub fn viewport(&self) -> (u32, u32) {
        (self.viewport_width, self.viewport_height)
    }
}

struct Offscreen {
    _texture: Texture,
    view: TextureView,
    bind_group: wgpu::BindGroup,
    size: (u32, u32),
}

/// Renders scene canvases through the offscreen → present pipeline.
///
/// # Usage
///
/// ```ignore
/// let mut renderer = Renderer::new(&gpu);
/// let image = scene.create_image(canvas, &surface, &mut renderer.uploader(&gpu))?;
/// // ... build layers and instances ...
/// let stats = renderer.render(&gpu, &mut scene, canvas)?;
/// ```
pub struct Renderer {
    config: RendererConfig,
    textures: TextureCache,
    sprite: SpritePipeline,
    debug: DebugPipeline,
    present: PresentPipeline,
    offscreen: Option<Offscreen>,
    last_stats: FrameStats,
}

impl Renderer {
    /// Create a renderer with the default 640×480 viewport.
    pub fn new(gpu: &GpuContext) -> Self {
        Self::with_config(gpu, RendererConfig::default())
    }

    pub fn with_config(gpu: &GpuContext, config: RendererConfig) -> Self {
        let textures = TextureCache::new(&gpu.device);
        let sprite = SpritePipeline::new(&gpu.device, OFFSCREEN_FORMAT, textures.layout());
        let debug = DebugPipeline::new(&gpu.device, OFFSCREEN_FORMAT);
        let present = PresentPipeline::new(&gpu.device, &gpu.queue, gpu.surface_format);
        debug!(
            "renderer ready, viewport {}×{}",
            config.viewport_width, config.viewport_height
        );

        Self {
            config,
            textures,
            sprite,
            debug,
            present,
            offscreen: None,
            last_stats: FrameStats::default(),
        }
    }

    pub fn config(&self) -> RendererConfig {
        self.config
    }

    /// Change the offscreen resolution; the target is recreated on the next
    /// render.
    pub fn set_viewport(&mut self, width: u32, height: u32) -> Result<(), SplatError> {
        if width == 0 || height == 0 {
            return Err(raise(SplatError::bad_parameter(
                "set_viewport",
                format!("viewport {width}×{height} has no area"),
            )));
        }
        self.config.viewport_width = width;
        self.config.viewport_height = height;
        Ok(())
    }

    /// Texture uploader bound to this renderer's cache, for
    /// `Scene::create_image` and friends.
    pub fn uploader<'a>(&'a mut self, gpu: &'a GpuContext) -> GpuUploader<'a> {
        GpuUploader::new(&gpu.device, &gpu.queue, &mut self.textures)
    }

    pub fn textures(&self) -> &TextureCache {
        &self.textures
    }

    /// Stats of the most recent successful render.
    pub fn last_stats(&self) -> FrameStats {
        self.last_stats
    }

    /// Render `canvas` and present it to the window surface.
    pub fn render(
        &mut self,
        gpu: &GpuContext,
        scene: &mut Scene,
        canvas: CanvasId,
    ) -> Result<FrameStats, RenderError> {
        let result = self.render_to_surface(gpu, scene, canvas);
        if let Err(err) = &result {
            record(err);
        }
        result
    }

    /// [`render`](Self::render) for the scene's active canvas.
    pub fn render_active(&mut self, gpu: &GpuContext, scene: &mut Scene) -> Result<FrameStats, RenderError> {
        let canvas = scene.active_canvas()?;
        self.render(gpu, scene, canvas)
    }

    fn render_to_surface(
        &mut self,
        gpu: &GpuContext,
        scene: &mut Scene,
        canvas: CanvasId,
    ) -> Result<FrameStats, RenderError> {
        let surface = gpu.surface.as_ref().ok_or(RenderError::NoSurface)?;
        let output = surface.get_current_texture()?;
        let view = output.texture.create_view(&TextureViewDescriptor::default());

        let stats = self.draw(gpu, scene, canvas, &view, gpu.surface_format, gpu.surface_size())?;
        output.present();
        Ok(stats)
    }

    /// Render `canvas` into `target` (headless mode).  Runs the same passes
    /// as [`render`](Self::render); the present pass writes `target`.
    pub fn render_to_texture(
        &mut self,
        gpu: &GpuContext,
        scene: &mut Scene,
        canvas: CanvasId,
        target: &TextureView,
        format: TextureFormat,
        size: (u32, u32),
    ) -> Result<FrameStats, RenderError> {
        let result = self.draw(gpu, scene, canvas, target, format, size);
        if let Err(err) = &result {
            record(err);
        }
        result
    }

    fn draw(
        &mut self,
        gpu: &GpuContext,
        scene: &mut Scene,
        canvas: CanvasId,
        target: &TextureView,
        format: TextureFormat,
        target_size: (u32, u32),
    ) -> Result<FrameStats, RenderError> {
        let device = &gpu.device;
        let viewport = self.config.viewport();
        let post_process = scene.canvas(canvas)?.post_process().map(str::to_owned);

        // ── Frame composition (CPU) ─────────────────────────────
        let frame = frame::compose(scene, canvas, viewport)?;

        // ── Pipelines and targets ───────────────────────────────
        if self.present.is_stale(format, post_process.as_deref()) {
            let built = scoped(device, "post-process shader", || {
                self.present.rebuild(device, format, post_process.as_deref())
            });
            if let Err(err) = built {
                self.present
                    .rebuild_fallback(device, format, post_process.as_deref());
                return Err(err);
            }
        }
        if self.offscreen.as_ref().map(|o| o.size) != Some(viewport) {
            let offscreen = scoped(device, "offscreen target", || {
                create_offscreen(device, &self.present, viewport)
            })?;
            self.offscreen = Some(offscreen);
        }
        let Some(offscreen) = self.offscreen.as_ref() else {
            return Err(RenderError::Driver {
                site: "offscreen target",
                message: "target missing after creation".into(),
            });
        };

        // ── Uploads ─────────────────────────────────────────────
        let camera = CameraUniform::orthographic(
            viewport.0 as f32,
            viewport.1 as f32,
            frame.scale[0],
            frame.scale[1],
        );
        let (sprite, debug_pipeline) = (&mut self.sprite, &mut self.debug);
        scoped(device, "scene upload", || {
            sprite.upload(device, &gpu.queue, &frame.sprites, &camera);
            debug_pipeline.upload(device, &gpu.queue, &frame.overlay, &camera);
            self.present
                .upload_sizes(&gpu.queue, &PresentUniform::new(viewport, target_size));
        })?;

        // ── Passes ──────────────────────────────────────────────
        let mut encoder = device.create_command_encoder(&CommandEncoderDescriptor {
            label: Some("splat_frame_encoder"),
        });
        scoped(device, "scene pass", || {
            self.encode_scene(&mut encoder, &frame, &offscreen.view, viewport)
        })?;
        scoped(device, "present pass", || {
            let mut pass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("splat_present_pass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Clear(Color::BLACK),
                        store: StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            self.present.draw(&mut pass, &offscreen.bind_group);
        })?;
        scoped(device, "submit", || {
            gpu.queue.submit(std::iter::once(encoder.finish()));
        })?;

        trace!("rendered {canvas:?}: {:?}", frame.stats);
        self.last_stats = frame.stats;
        Ok(frame.stats)
    }

    fn encode_scene(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        frame: &Frame,
        view: &TextureView,
        viewport: (u32, u32),
    ) {
        let [r, g, b, a] = frame.clear_color;
        let mut pass = encoder.begin_render_pass(&RenderPassDescriptor {
            label: Some("splat_scene_pass"),
            color_attachments: &[Some(RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: Operations {
                    load: LoadOp::Clear(Color {
                        r: r as f64,
                        g: g as f64,
                        b: b as f64,
                        a: a as f64,
                    }),
                    store: StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        self.sprite
            .draw(&mut pass, &frame.batches, &self.textures, frame.filter, viewport);
        self.debug.draw(&mut pass);
    }
}

/// Run `f` inside validation and out-of-memory error scopes, turning a
/// captured error into `RenderError::Driver` tagged with `site`.
fn scoped<T>(device: &Device, site: &'static str, f: impl FnOnce() -> T) -> Result<T, RenderError> {
    device.push_error_scope(ErrorFilter::OutOfMemory);
    device.push_error_scope(ErrorFilter::Validation);
    let value = f();
    let validation = pollster::block_on(device.pop_error_scope());
    let out_of_memory = pollster::block_on(device.pop_error_scope());

    match validation.or(out_of_memory) {
        Some(err) => Err(RenderError::Driver {
            site,
            message: err.to_string(),
        }),
        None => Ok(value),
    }
}

fn create_offscreen(device: &Device, present: &PresentPipeline, size: (u32, u32)) -> Offscreen {
    debug!("creating {}×{} offscreen target", size.0, size.1);
    let texture = device.create_texture(&TextureDescriptor {
        label: Some("splat_offscreen"),
        size: Extent3d {
            width: size.0,
            height: size.1,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: TextureDimension::D2,
        format: OFFSCREEN_FORMAT,
        usage: TextureUsages::RENDER_ATTACHMENT | TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    });
    let view = texture.create_view(&TextureViewDescriptor::default());
    let bind_group = present.source_bind_group(device, &view);

    Offscreen {
        _texture: texture,
        view,
        bind_group,
        size,
    }
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use splat_core::{
        last_error, clear_last_error, Flags, ManualClock, PixelSurface, Point, TexRegion,
    };

    const TARGET_FORMAT: TextureFormat = TextureFormat::Rgba8Unorm;

    fn target(gpu: &GpuContext, size: (u32, u32)) -> (Texture, TextureView) {
        let texture = gpu.device.create_texture(&TextureDescriptor {
            label: Some("test_target"),
            size: Extent3d {
                width: size.0,
                height: size.1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format: TARGET_FORMAT,
            usage: TextureUsages::RENDER_ATTACHMENT | TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&TextureViewDescriptor::default());
        (texture, view)
    }

    #[test]
    fn test_default_config() {
        let config = RendererConfig::default();
        assert_eq!(config.viewport(), (640, 480));
    }

    #[test]
    fn test_render_error_converts_to_driver_failure() {
        let err: SplatError = RenderError::Driver {
            site: "scene pass",
            message: "boom".into(),
        }
        .into();
        assert_eq!(
            err,
            SplatError::DriverFailure {
                site: "scene pass",
                message: "boom".into()
            }
        );

        let err: SplatError = RenderError::Scene(SplatError::NoActiveCanvas).into();
        assert_eq!(err, SplatError::NoActiveCanvas);
    }

    #[test]
    fn test_render_headless_without_surface() {
        let Ok(gpu) = pollster::block_on(GpuContext::new_headless()) else {
            return; // no adapter
        };
        let mut renderer = Renderer::new(&gpu);
        let mut scene = Scene::new();
        let canvas = scene.create_canvas();

        clear_last_error();
        let err = renderer.render(&gpu, &mut scene, canvas).unwrap_err();
        assert!(matches!(err, RenderError::NoSurface));
        assert!(last_error().is_some());
    }

    #[test]
    fn test_render_active_requires_canvas() {
        let Ok(gpu) = pollster::block_on(GpuContext::new_headless()) else {
            return;
        };
        let mut renderer = Renderer::new(&gpu);
        let mut scene = Scene::new();
        let err = renderer.render_active(&gpu, &mut scene).unwrap_err();
        assert!(matches!(err, RenderError::Scene(SplatError::NoActiveCanvas)));
    }

    #[test]
    fn test_render_to_texture() {
        let Ok(gpu) = pollster::block_on(GpuContext::new_headless()) else {
            return;
        };
        let mut renderer = Renderer::with_config(
            &gpu,
            RendererConfig {
                viewport_width: 64,
                viewport_height: 48,
            },
        );

        let clock = ManualClock::new(0);
        let mut scene = Scene::with_clock(clock.clone());
        let canvas = scene.create_canvas();
        let layer = scene.create_layer(canvas, None).unwrap();
        let pixels = vec![0xFF; 8 * 8 * 4];
        let image = scene
            .create_image(canvas, &PixelSurface::rgba(8, 8, &pixels), &mut renderer.uploader(&gpu))
            .unwrap();
        scene
            .create_instance(image, layer, 4, 4, TexRegion::FULL, Flags::MIRROR_X.bits())
            .unwrap();
        let clipped = scene
            .create_instance(image, layer, 20, 4, TexRegion::FULL, 0)
            .unwrap();
        scene
            .set_instance_clip(clipped, Some(splat_core::Rect::new(20, 4, 4, 4)))
            .unwrap();
        scene
            .draw_debug_line(canvas, Point::new(0, 0), Point::new(10, 10), [1.0; 4], 1, 0, 100)
            .unwrap();

        let (_texture, view) = target(&gpu, (128, 96));
        let stats = renderer
            .render_to_texture(&gpu, &mut scene, canvas, &view, TARGET_FORMAT, (128, 96))
            .unwrap();
        assert_eq!(stats.drawn, 2);
        assert_eq!(stats.batches, 2);
        assert_eq!(stats.overlay, 1);
        assert_eq!(renderer.last_stats(), stats);

        clock.set(100);
        let stats = renderer
            .render_to_texture(&gpu, &mut scene, canvas, &view, TARGET_FORMAT, (128, 96))
            .unwrap();
        assert_eq!(stats.overlay, 0);
        assert_eq!(stats.expired, 1);
    }

    #[test]
    fn test_broken_post_process_reports_driver_failure() {
        let Ok(gpu) = pollster::block_on(GpuContext::new_headless()) else {
            return;
        };
        let mut renderer = Renderer::new(&gpu);
        let mut scene = Scene::new();
        let canvas = scene.create_canvas();
        scene
            .set_post_process(canvas, Some("this is not wgsl".into()))
            .unwrap();

        let (_texture, view) = target(&gpu, (64, 64));
        let err = renderer
            .render_to_texture(&gpu, &mut scene, canvas, &view, TARGET_FORMAT, (64, 64))
            .unwrap_err();
        assert!(matches!(
            err,
            RenderError::Driver {
                site: "post-process shader",
                ..
            }
        ));

        // The pass-through fallback keeps later frames drawable.
        assert!(renderer
            .render_to_texture(&gpu, &mut scene, canvas, &view, TARGET_FORMAT, (64, 64))
            .is_ok());
    }

    #[test]
    fn test_set_viewport_rejects_zero() {
        let Ok(gpu) = pollster::block_on(GpuContext::new_headless()) else {
            return;
        };
        let mut renderer = Renderer::new(&gpu);
        assert!(renderer.set_viewport(0, 10).is_err());
        renderer.set_viewport(320, 240).unwrap();
        assert_eq!(renderer.config().viewport(), (320, 240));
    }
}
