//! `Scene` — the aggregate root owning every canvas, layer, image and
//! instance.
//!
//! All mutation goes through here so ownership invariants hold in one
//! place:
//!
//! - a layer belongs to exactly one canvas and sits in that canvas's stack;
//! - an instance sits in exactly one layer's instance list;
//! - an instance's image belongs to the same canvas as its layer;
//! - an image cannot be destroyed while instances reference it.
//!
//! Failing operations record their message via [`crate::error::raise`].

use log::debug;

use crate::canvas::{clamp_color, Canvas, FilterMode};
use crate::clock::{Clock, SystemClock};
use crate::debug::{DebugLine, DebugRect, Rgba};
use crate::error::{raise, SplatError};
use crate::flags::Flags;
use crate::geometry::{Point, Rect};
use crate::handle::{Arena, CanvasId, ImageId, InstanceId, LayerId};
use crate::instance::{Image, Instance, TexRegion};
use crate::layer::Layer;
use crate::surface::{PixelSurface, TextureUploader};

pub struct Scene {
    canvases: Arena<CanvasId, Canvas>,
    layers: Arena<LayerId, Layer>,
    images: Arena<ImageId, Image>,
    instances: Arena<InstanceId, Instance>,
    active: Option<CanvasId>,
    clock: Box<dyn Clock>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    /// Scene driven by the system clock.
    pub fn new() -> Self {
        Self::with_clock(SystemClock::new())
    }

    pub fn with_clock(clock: impl Clock + 'static) -> Self {
        Self {
            canvases: Arena::new(),
            layers: Arena::new(),
            images: Arena::new(),
            instances: Arena::new(),
            active: None,
            clock: Box::new(clock),
        }
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    // ───────────────────── Lookups ────────────────────────────────

    pub fn canvas(&self, id: CanvasId) -> Result<&Canvas, SplatError> {
        self.canvases
            .get(id)
            .ok_or_else(|| raise(SplatError::not_found("canvas", "canvas")))
    }

    pub fn layer(&self, id: LayerId) -> Result<&Layer, SplatError> {
        self.layers
            .get(id)
            .ok_or_else(|| raise(SplatError::not_found("layer", "layer")))
    }

    pub fn image(&self, id: ImageId) -> Result<&Image, SplatError> {
        self.images
            .get(id)
            .ok_or_else(|| raise(SplatError::not_found("image", "image")))
    }

    pub fn instance(&self, id: InstanceId) -> Result<&Instance, SplatError> {
        self.instances
            .get(id)
            .ok_or_else(|| raise(SplatError::not_found("instance", "instance")))
    }

    pub fn canvas_count(&self) -> usize {
        self.canvases.len()
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    fn canvas_mut(&mut self, op: &'static str, id: CanvasId) -> Result<&mut Canvas, SplatError> {
        self.canvases
            .get_mut(id)
            .ok_or_else(|| raise(SplatError::not_found(op, "canvas")))
    }

    fn layer_in(&self, op: &'static str, id: LayerId) -> Result<&Layer, SplatError> {
        self.layers
            .get(id)
            .ok_or_else(|| raise(SplatError::not_found(op, "layer")))
    }

    fn image_in(&self, op: &'static str, id: ImageId) -> Result<&Image, SplatError> {
        self.images
            .get(id)
            .ok_or_else(|| raise(SplatError::not_found(op, "image")))
    }

    fn instance_mut(
        &mut self,
        op: &'static str,
        id: InstanceId,
    ) -> Result<&mut Instance, SplatError> {
        self.instances
            .get_mut(id)
            .ok_or_else(|| raise(SplatError::not_found(op, "instance")))
    }

    /// Canvas owning the layer an instance sits in.
    fn instance_canvas(&self, op: &'static str, id: InstanceId) -> Result<CanvasId, SplatError> {
        let instance = self
            .instances
            .get(id)
            .ok_or_else(|| raise(SplatError::not_found(op, "instance")))?;
        Ok(self.layer_in(op, instance.layer)?.canvas)
    }

    // ───────────────────── Canvases ───────────────────────────────

    pub fn create_canvas(&mut self) -> CanvasId {
        let id = self.canvases.insert(Canvas::new());
        debug!("created {id:?}");
        id
    }

    /// Destroy a canvas with all of its layers, instances and images.
    pub fn destroy_canvas(
        &mut self,
        id: CanvasId,
        uploader: &mut dyn TextureUploader,
    ) -> Result<(), SplatError> {
        let canvas = self
            .canvases
            .remove(id)
            .ok_or_else(|| raise(SplatError::not_found("destroy_canvas", "canvas")))?;

        for layer_id in canvas.layers.as_slice() {
            if let Some(layer) = self.layers.remove(*layer_id) {
                for instance in layer.instances {
                    self.instances.remove(instance);
                }
            }
        }

        let owned: Vec<ImageId> = self
            .images
            .iter()
            .filter(|(_, image)| image.canvas == id)
            .map(|(image_id, _)| image_id)
            .collect();
        for image_id in owned {
            if let Some(image) = self.images.remove(image_id) {
                uploader.release(image.texture);
            }
        }

        if self.active == Some(id) {
            self.active = None;
        }
        debug!("destroyed {id:?}");
        Ok(())
    }

    /// Select the canvas used by calls that take no explicit canvas.
    pub fn set_active_canvas(&mut self, id: Option<CanvasId>) -> Result<(), SplatError> {
        if let Some(id) = id {
            if !self.canvases.contains(id) {
                return Err(raise(SplatError::not_found("set_active_canvas", "canvas")));
            }
        }
        self.active = id;
        Ok(())
    }

    pub fn active_canvas(&self) -> Result<CanvasId, SplatError> {
        self.active
            .filter(|id| self.canvases.contains(*id))
            .ok_or_else(|| raise(SplatError::NoActiveCanvas))
    }

    pub fn set_clear_color(
        &mut self,
        canvas: CanvasId,
        r: f32,
        g: f32,
        b: f32,
        a: f32,
    ) -> Result<(), SplatError> {
        self.canvas_mut("set_clear_color", canvas)?
            .set_clear_color([r, g, b, a]);
        Ok(())
    }

    pub fn view_position(&self, canvas: CanvasId) -> Result<Point, SplatError> {
        Ok(self.canvas(canvas)?.view_origin)
    }

    pub fn set_view_position(&mut self, canvas: CanvasId, x: i32, y: i32) -> Result<(), SplatError> {
        self.canvas_mut("set_view_position", canvas)?.view_origin = Point::new(x, y);
        Ok(())
    }

    pub fn view_scale(&self, canvas: CanvasId) -> Result<[f32; 2], SplatError> {
        Ok(self.canvas(canvas)?.scale)
    }

    /// Values below [`MIN_VIEW_SCALE`](crate::canvas::MIN_VIEW_SCALE) are
    /// clamped up to it.
    pub fn set_view_scale(&mut self, canvas: CanvasId, x: f32, y: f32) -> Result<(), SplatError> {
        self.canvas_mut("set_view_scale", canvas)?.set_scale(x, y);
        Ok(())
    }

    pub fn set_filter_mode(&mut self, canvas: CanvasId, filter: FilterMode) -> Result<(), SplatError> {
        self.canvas_mut("set_filter_mode", canvas)?.filter = filter;
        Ok(())
    }

    /// Install (or remove) the WGSL fragment shader run by the present pass.
    pub fn set_post_process(
        &mut self,
        canvas: CanvasId,
        source: Option<String>,
    ) -> Result<(), SplatError> {
        self.canvas_mut("set_post_process", canvas)?.post_process = source;
        Ok(())
    }

    // ───────────────────── Images ─────────────────────────────────

    pub fn create_image(
        &mut self,
        canvas: CanvasId,
        surface: &PixelSurface<'_>,
        uploader: &mut dyn TextureUploader,
    ) -> Result<ImageId, SplatError> {
        const OP: &str = "create_image";
        if !self.canvases.contains(canvas) {
            return Err(raise(SplatError::not_found(OP, "canvas")));
        }
        surface.validate(OP).map_err(raise)?;
        let texture = uploader.upload(surface).map_err(raise)?;

        let id = self.images.insert(Image {
            canvas,
            texture,
            width: surface.width,
            height: surface.height,
        });
        debug!("created {id:?} ({}×{}) on {canvas:?}", surface.width, surface.height);
        Ok(id)
    }

    /// Re-upload pixels; instances of the image pick up the new extents.
    pub fn update_image(
        &mut self,
        id: ImageId,
        surface: &PixelSurface<'_>,
        uploader: &mut dyn TextureUploader,
    ) -> Result<(), SplatError> {
        const OP: &str = "update_image";
        let texture = self.image_in(OP, id)?.texture;
        surface.validate(OP).map_err(raise)?;
        uploader.update(texture, surface).map_err(raise)?;

        let size = (surface.width, surface.height);
        if let Some(image) = self.images.get_mut(id) {
            image.width = size.0;
            image.height = size.1;
        }
        for (_, instance) in self.instances.iter_mut() {
            if instance.image == id {
                let region = instance.region;
                instance.set_image(id, size, region);
            }
        }
        Ok(())
    }

    /// Destroy an image.  Fails with `BadParameter` while any instance still
    /// references it: destroy those instances first.
    pub fn destroy_image(
        &mut self,
        id: ImageId,
        uploader: &mut dyn TextureUploader,
    ) -> Result<(), SplatError> {
        const OP: &str = "destroy_image";
        self.image_in(OP, id)?;

        let users = self
            .instances
            .iter()
            .filter(|(_, instance)| instance.image == id)
            .count();
        if users > 0 {
            return Err(raise(SplatError::bad_parameter(
                OP,
                format!("image is still referenced by {users} instance(s)"),
            )));
        }

        if let Some(image) = self.images.remove(id) {
            uploader.release(image.texture);
        }
        debug!("destroyed {id:?}");
        Ok(())
    }

    pub fn image_size(&self, id: ImageId) -> Result<(u32, u32), SplatError> {
        Ok(self.image(id)?.size())
    }

    // ───────────────────── Layers ─────────────────────────────────

    /// Create a layer directly below `below`, or at the bottom of the stack.
    pub fn create_layer(
        &mut self,
        canvas: CanvasId,
        below: Option<LayerId>,
    ) -> Result<LayerId, SplatError> {
        const OP: &str = "create_layer";
        if !self.canvases.contains(canvas) {
            return Err(raise(SplatError::not_found(OP, "canvas")));
        }
        if let Some(upper) = below {
            if self.layer_in(OP, upper)?.canvas != canvas {
                return Err(raise(SplatError::CrossCanvas { op: OP }));
            }
        }

        let id = self.layers.insert(Layer::new(canvas));
        let stack = &mut self.canvas_mut(OP, canvas)?.layers;
        match below {
            None => stack.push_bottom(id),
            Some(upper) => {
                if !stack.insert_below(id, upper) {
                    self.layers.remove(id);
                    return Err(raise(SplatError::not_found(OP, "layer")));
                }
            }
        }
        debug!("created {id:?} on {canvas:?}");
        Ok(id)
    }

    /// Destroy a layer and every instance in it.
    pub fn destroy_layer(&mut self, id: LayerId) -> Result<(), SplatError> {
        let layer = self
            .layers
            .remove(id)
            .ok_or_else(|| raise(SplatError::not_found("destroy_layer", "layer")))?;

        for instance in &layer.instances {
            self.instances.remove(*instance);
        }
        if let Some(canvas) = self.canvases.get_mut(layer.canvas) {
            canvas.layers.remove(id);
        }
        debug!("destroyed {id:?} with {} instance(s)", layer.instances.len());
        Ok(())
    }

    /// Place `layer` immediately above `other` in paint order, or at the
    /// bottom when `other` is `None`.  Already being directly above `other`
    /// is a successful no-op.
    pub fn move_layer(&mut self, layer: LayerId, other: Option<LayerId>) -> Result<(), SplatError> {
        const OP: &str = "move_layer";
        if other == Some(layer) {
            return Err(raise(SplatError::bad_parameter(
                OP,
                "cannot move a layer relative to itself",
            )));
        }

        let canvas = self.layer_in(OP, layer)?.canvas;
        if let Some(other) = other {
            if self.layer_in(OP, other)?.canvas != canvas {
                return Err(raise(SplatError::CrossCanvas { op: OP }));
            }
        }

        if !self.canvas_mut(OP, canvas)?.layers.move_above(layer, other) {
            return Err(raise(SplatError::not_found(OP, "layer")));
        }
        Ok(())
    }

    pub fn move_layer_to_top(&mut self, layer: LayerId) -> Result<(), SplatError> {
        const OP: &str = "move_layer_to_top";
        let canvas = self.layer_in(OP, layer)?.canvas;
        if !self.canvas_mut(OP, canvas)?.layers.move_to_top(layer) {
            return Err(raise(SplatError::not_found(OP, "layer")));
        }
        Ok(())
    }

    /// Layers of `canvas`, bottom first.
    pub fn layer_order(&self, canvas: CanvasId) -> Result<&[LayerId], SplatError> {
        Ok(self.canvas(canvas)?.layers.as_slice())
    }

    // ───────────────────── Instances ──────────────────────────────

    pub fn create_instance(
        &mut self,
        image: ImageId,
        layer: LayerId,
        x: i32,
        y: i32,
        region: TexRegion,
        flags: u32,
    ) -> Result<InstanceId, SplatError> {
        const OP: &str = "create_instance";
        let flags = Flags::from_wire(OP, flags).map_err(raise)?;
        region.validate(OP).map_err(raise)?;

        let img = self.image_in(OP, image)?;
        let image_size = img.size();
        if self.layer_in(OP, layer)?.canvas != img.canvas {
            return Err(raise(SplatError::CrossCanvas { op: OP }));
        }

        let id = self.instances.insert(Instance::new(
            image,
            image_size,
            layer,
            Point::new(x, y),
            region,
            flags,
        ));
        if let Some(layer) = self.layers.get_mut(layer) {
            layer.instances.push(id);
        }
        Ok(id)
    }

    pub fn destroy_instance(&mut self, id: InstanceId) -> Result<(), SplatError> {
        let instance = self
            .instances
            .remove(id)
            .ok_or_else(|| raise(SplatError::not_found("destroy_instance", "instance")))?;
        if let Some(layer) = self.layers.get_mut(instance.layer) {
            layer.remove_instance(id);
        }
        Ok(())
    }

    pub fn set_instance_position(&mut self, id: InstanceId, x: i32, y: i32) -> Result<(), SplatError> {
        self.instance_mut("set_instance_position", id)?.position = Point::new(x, y);
        Ok(())
    }

    pub fn instance_position(&self, id: InstanceId) -> Result<Point, SplatError> {
        Ok(self.instance(id)?.position)
    }

    /// Move an instance to another layer of the same canvas.
    pub fn set_instance_layer(&mut self, id: InstanceId, layer: LayerId) -> Result<(), SplatError> {
        const OP: &str = "set_instance_layer";
        let current = self
            .instances
            .get(id)
            .ok_or_else(|| raise(SplatError::not_found(OP, "instance")))?
            .layer;
        if current == layer {
            return Ok(());
        }

        let from_canvas = self.layer_in(OP, current)?.canvas;
        if self.layer_in(OP, layer)?.canvas != from_canvas {
            return Err(raise(SplatError::CrossCanvas { op: OP }));
        }

        if let Some(old) = self.layers.get_mut(current) {
            old.remove_instance(id);
        }
        if let Some(new) = self.layers.get_mut(layer) {
            new.instances.push(id);
        }
        self.instance_mut(OP, id)?.layer = layer;
        Ok(())
    }

    pub fn instance_layer(&self, id: InstanceId) -> Result<LayerId, SplatError> {
        Ok(self.instance(id)?.layer)
    }

    /// Point an instance at a (possibly new) image region.
    ///
    /// `image: None` keeps the current image.  `region: None` selects the
    /// full image.
    pub fn set_instance_image(
        &mut self,
        id: InstanceId,
        image: Option<ImageId>,
        region: Option<TexRegion>,
    ) -> Result<(), SplatError> {
        const OP: &str = "set_instance_image";
        let canvas = self.instance_canvas(OP, id)?;
        let image = match image {
            Some(image) => image,
            None => self.instance(id)?.image,
        };
        let region = region.unwrap_or(TexRegion::FULL);
        region.validate(OP).map_err(raise)?;

        let img = self.image_in(OP, image)?;
        if img.canvas != canvas {
            return Err(raise(SplatError::CrossCanvas { op: OP }));
        }
        let size = img.size();

        self.instance_mut(OP, id)?.set_image(image, size, region);
        Ok(())
    }

    /// Both factors must be finite and positive; mirroring is done with
    /// the `MIRROR_*` flags.
    pub fn set_instance_scale(&mut self, id: InstanceId, x: f32, y: f32) -> Result<(), SplatError> {
        const OP: &str = "set_instance_scale";
        if !(x.is_finite() && y.is_finite() && x > 0.0 && y > 0.0) {
            return Err(raise(SplatError::bad_parameter(
                OP,
                format!("scale ({x}, {y}) must be finite and positive"),
            )));
        }
        self.instance_mut(OP, id)?.scale = [x, y];
        Ok(())
    }

    /// Rotation in degrees; only drawn while the `ROTATE` flag is set.
    pub fn set_instance_angle(&mut self, id: InstanceId, degrees: f32) -> Result<(), SplatError> {
        const OP: &str = "set_instance_angle";
        if !degrees.is_finite() {
            return Err(raise(SplatError::bad_parameter(OP, "angle must be finite")));
        }
        self.instance_mut(OP, id)?.angle = degrees;
        Ok(())
    }

    pub fn set_instance_color(&mut self, id: InstanceId, color: Rgba) -> Result<(), SplatError> {
        self.instance_mut("set_instance_color", id)?.color = clamp_color(color);
        Ok(())
    }

    /// Set or clear the clip rect (canvas coordinates).  An empty rect
    /// clears it.  The `STATIC` flag tracks whether a clip is set.
    pub fn set_instance_clip(&mut self, id: InstanceId, clip: Option<Rect>) -> Result<(), SplatError> {
        const OP: &str = "set_instance_clip";
        if let Some(rect) = clip {
            if rect.w < 0 || rect.h < 0 {
                return Err(raise(SplatError::bad_parameter(
                    OP,
                    format!("negative clip extent {}×{}", rect.w, rect.h),
                )));
            }
        }
        let clip = clip.filter(|rect| !rect.is_empty());

        let instance = self.instance_mut(OP, id)?;
        instance.clip = clip;
        instance.flags.set(Flags::STATIC, clip.is_some());
        Ok(())
    }

    /// Replace the flag word.  `STATIC` is derived from the clip rect and
    /// ignored here.
    pub fn set_instance_flags(&mut self, id: InstanceId, flags: u32) -> Result<(), SplatError> {
        const OP: &str = "set_instance_flags";
        let mut flags = Flags::from_wire(OP, flags).map_err(raise)?;
        let instance = self.instance_mut(OP, id)?;
        flags.set(Flags::STATIC, instance.clip.is_some());
        instance.flags = flags;
        Ok(())
    }

    pub fn set_instance_visible(&mut self, id: InstanceId, visible: bool) -> Result<(), SplatError> {
        self.instance_mut("set_instance_visible", id)?
            .flags
            .set(Flags::HIDDEN, !visible);
        Ok(())
    }

    // ───────────────────── Debug overlay ──────────────────────────

    /// Queue a debug rect that draws until `ttl_ms` from now.
    ///
    /// Honours `FILLED` and `RELATIVE` in `flags`.
    pub fn draw_debug_rect(
        &mut self,
        canvas: CanvasId,
        rect: Rect,
        color: Rgba,
        width: u32,
        flags: u32,
        ttl_ms: u32,
    ) -> Result<(), SplatError> {
        const OP: &str = "draw_debug_rect";
        let flags = Flags::from_wire(OP, flags).map_err(raise)?;
        if width == 0 {
            return Err(raise(SplatError::bad_parameter(OP, "line width must be at least 1")));
        }
        if rect.w < 0 || rect.h < 0 {
            return Err(raise(SplatError::bad_parameter(
                OP,
                format!("negative rect extent {}×{}", rect.w, rect.h),
            )));
        }

        let expiry = self.now_ms() + ttl_ms as u64;
        self.canvas_mut(OP, canvas)?.debug.insert_rect(DebugRect {
            rect,
            color: clamp_color(color),
            width,
            filled: flags.contains(Flags::FILLED),
            relative: flags.contains(Flags::RELATIVE),
            expiry,
        });
        Ok(())
    }

    /// Queue a debug line that draws until `ttl_ms` from now.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_debug_line(
        &mut self,
        canvas: CanvasId,
        start: Point,
        end: Point,
        color: Rgba,
        width: u32,
        flags: u32,
        ttl_ms: u32,
    ) -> Result<(), SplatError> {
        const OP: &str = "draw_debug_line";
        let flags = Flags::from_wire(OP, flags).map_err(raise)?;
        if width == 0 {
            return Err(raise(SplatError::bad_parameter(OP, "line width must be at least 1")));
        }

        let expiry = self.now_ms() + ttl_ms as u64;
        self.canvas_mut(OP, canvas)?.debug.insert_line(DebugLine {
            start,
            end,
            color: clamp_color(color),
            width,
            relative: flags.contains(Flags::RELATIVE),
            expiry,
        });
        Ok(())
    }

    /// Drop the canvas's debug primitives with `expiry <= now`.
    pub fn sweep_expired(&mut self, canvas: CanvasId, now: u64) -> Result<usize, SplatError> {
        Ok(self.canvas_mut("sweep_expired", canvas)?.debug.sweep_expired(now))
    }
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::surface::HeadlessUploader;

    const PIXELS: [u8; 64 * 32 * 4] = [255; 64 * 32 * 4];

    struct Fixture {
        scene: Scene,
        uploader: HeadlessUploader,
        clock: ManualClock,
        canvas: CanvasId,
    }

    fn fixture() -> Fixture {
        let clock = ManualClock::new(1000);
        let mut scene = Scene::with_clock(clock.clone());
        let canvas = scene.create_canvas();
        Fixture {
            scene,
            uploader: HeadlessUploader::new(),
            clock,
            canvas,
        }
    }

    impl Fixture {
        fn image(&mut self) -> ImageId {
            let surface = PixelSurface::rgba(64, 32, &PIXELS);
            self.scene
                .create_image(self.canvas, &surface, &mut self.uploader)
                .unwrap()
        }
    }

    #[test]
    fn test_new_layer_goes_to_bottom() {
        let mut f = fixture();
        let a = f.scene.create_layer(f.canvas, None).unwrap();
        let b = f.scene.create_layer(f.canvas, None).unwrap();
        let c = f.scene.create_layer(f.canvas, Some(a)).unwrap();
        assert_eq!(f.scene.layer_order(f.canvas).unwrap(), &[b, c, a]);
    }

    #[test]
    fn test_move_layer_relative_to_itself_fails() {
        let mut f = fixture();
        let a = f.scene.create_layer(f.canvas, None).unwrap();
        let err = f.scene.move_layer(a, Some(a)).unwrap_err();
        assert!(matches!(err, SplatError::BadParameter { .. }));
    }

    #[test]
    fn test_move_layer_across_canvases_fails() {
        let mut f = fixture();
        let other = f.scene.create_canvas();
        let a = f.scene.create_layer(f.canvas, None).unwrap();
        let b = f.scene.create_layer(f.canvas, None).unwrap();
        let x = f.scene.create_layer(other, None).unwrap();

        let err = f.scene.move_layer(a, Some(x)).unwrap_err();
        assert_eq!(err, SplatError::CrossCanvas { op: "move_layer" });
        assert_eq!(f.scene.layer_order(f.canvas).unwrap(), &[b, a]);
        assert_eq!(f.scene.layer_order(other).unwrap(), &[x]);
    }

    #[test]
    fn test_instance_uses_region_size() {
        let mut f = fixture();
        let image = f.image();
        let layer = f.scene.create_layer(f.canvas, None).unwrap();
        let inst = f
            .scene
            .create_instance(image, layer, 5, 6, TexRegion::new(0.0, 0.0, 0.5, 1.0), 0)
            .unwrap();
        assert_eq!(f.scene.instance(inst).unwrap().size(), [32.0, 32.0]);
        assert_eq!(f.scene.layer(layer).unwrap().instances(), &[inst]);
    }

    #[test]
    fn test_instance_scale_must_be_positive() {
        let mut f = fixture();
        let image = f.image();
        let layer = f.scene.create_layer(f.canvas, None).unwrap();
        let inst = f
            .scene
            .create_instance(image, layer, 0, 0, TexRegion::FULL, 0)
            .unwrap();

        for (x, y) in [(-1.0, 1.0), (1.0, 0.0), (f32::NAN, 1.0), (1.0, f32::INFINITY)] {
            let err = f.scene.set_instance_scale(inst, x, y).unwrap_err();
            assert!(matches!(err, SplatError::BadParameter { .. }), "({x}, {y})");
        }
        assert_eq!(f.scene.instance(inst).unwrap().scale(), [1.0, 1.0]);

        f.scene.set_instance_scale(inst, 0.5, 2.0).unwrap();
        assert_eq!(f.scene.instance(inst).unwrap().size(), [32.0, 64.0]);
    }

    #[test]
    fn test_instance_rejects_unknown_flags_and_bad_region() {
        let mut f = fixture();
        let image = f.image();
        let layer = f.scene.create_layer(f.canvas, None).unwrap();
        assert!(f
            .scene
            .create_instance(image, layer, 0, 0, TexRegion::FULL, 0x1000)
            .is_err());
        assert!(f
            .scene
            .create_instance(image, layer, 0, 0, TexRegion::new(0.0, 0.0, 2.0, 1.0), 0)
            .is_err());
        assert_eq!(f.scene.instance_count(), 0);
    }

    #[test]
    fn test_set_instance_layer_moves_membership() {
        let mut f = fixture();
        let image = f.image();
        let a = f.scene.create_layer(f.canvas, None).unwrap();
        let b = f.scene.create_layer(f.canvas, None).unwrap();
        let inst = f
            .scene
            .create_instance(image, a, 0, 0, TexRegion::FULL, 0)
            .unwrap();

        f.scene.set_instance_layer(inst, b).unwrap();
        assert!(f.scene.layer(a).unwrap().instances().is_empty());
        assert_eq!(f.scene.layer(b).unwrap().instances(), &[inst]);
        assert_eq!(f.scene.instance_layer(inst).unwrap(), b);
    }

    #[test]
    fn test_destroy_layer_cascades() {
        let mut f = fixture();
        let image = f.image();
        let layer = f.scene.create_layer(f.canvas, None).unwrap();
        let inst = f
            .scene
            .create_instance(image, layer, 0, 0, TexRegion::FULL, 0)
            .unwrap();

        f.scene.destroy_layer(layer).unwrap();
        assert!(f.scene.instance(inst).is_err());
        assert!(f.scene.layer_order(f.canvas).unwrap().is_empty());
    }

    #[test]
    fn test_destroy_referenced_image_fails() {
        let mut f = fixture();
        let image = f.image();
        let layer = f.scene.create_layer(f.canvas, None).unwrap();
        let inst = f
            .scene
            .create_instance(image, layer, 0, 0, TexRegion::FULL, 0)
            .unwrap();

        let err = f.scene.destroy_image(image, &mut f.uploader).unwrap_err();
        assert!(matches!(err, SplatError::BadParameter { .. }));

        f.scene.destroy_instance(inst).unwrap();
        f.scene.destroy_image(image, &mut f.uploader).unwrap();
        assert!(f.uploader.live().is_empty());
    }

    #[test]
    fn test_destroy_canvas_releases_everything() {
        let mut f = fixture();
        let image = f.image();
        let layer = f.scene.create_layer(f.canvas, None).unwrap();
        f.scene
            .create_instance(image, layer, 0, 0, TexRegion::FULL, 0)
            .unwrap();
        f.scene.set_active_canvas(Some(f.canvas)).unwrap();

        f.scene.destroy_canvas(f.canvas, &mut f.uploader).unwrap();
        assert_eq!(f.scene.instance_count(), 0);
        assert!(f.uploader.live().is_empty());
        assert_eq!(f.scene.active_canvas(), Err(SplatError::NoActiveCanvas));
    }

    #[test]
    fn test_clip_toggles_static_flag() {
        let mut f = fixture();
        let image = f.image();
        let layer = f.scene.create_layer(f.canvas, None).unwrap();
        let inst = f
            .scene
            .create_instance(image, layer, 0, 0, TexRegion::FULL, 0)
            .unwrap();

        f.scene
            .set_instance_clip(inst, Some(Rect::new(0, 0, 10, 10)))
            .unwrap();
        assert!(f.scene.instance(inst).unwrap().flags().contains(Flags::STATIC));

        // Flag writes cannot desynchronise STATIC from the clip.
        f.scene.set_instance_flags(inst, Flags::MIRROR_X.bits()).unwrap();
        let flags = f.scene.instance(inst).unwrap().flags();
        assert_eq!(flags, Flags::MIRROR_X | Flags::STATIC);

        f.scene.set_instance_clip(inst, None).unwrap();
        assert!(!f.scene.instance(inst).unwrap().flags().contains(Flags::STATIC));
    }

    #[test]
    fn test_debug_expiry_uses_scene_clock() {
        let mut f = fixture();
        f.scene
            .draw_debug_line(f.canvas, Point::new(0, 0), Point::new(10, 0), [1.0; 4], 1, 0, 500)
            .unwrap();

        let canvas = f.scene.canvas(f.canvas).unwrap();
        assert_eq!(canvas.debug().live_lines(1499).count(), 1);
        assert_eq!(canvas.debug().live_lines(1500).count(), 0);

        f.clock.set(1500);
        let now = f.scene.now_ms();
        assert_eq!(f.scene.sweep_expired(f.canvas, now).unwrap(), 1);
    }

    #[test]
    fn test_debug_width_zero_rejected() {
        let mut f = fixture();
        let err = f
            .scene
            .draw_debug_rect(f.canvas, Rect::new(0, 0, 4, 4), [1.0; 4], 0, 0, 100)
            .unwrap_err();
        assert!(matches!(err, SplatError::BadParameter { .. }));
    }

    #[test]
    fn test_update_image_resizes_instances() {
        let mut f = fixture();
        let image = f.image();
        let layer = f.scene.create_layer(f.canvas, None).unwrap();
        let inst = f
            .scene
            .create_instance(image, layer, 0, 0, TexRegion::FULL, 0)
            .unwrap();

        let small = [0u8; 16 * 16 * 4];
        f.scene
            .update_image(image, &PixelSurface::rgba(16, 16, &small), &mut f.uploader)
            .unwrap();
        assert_eq!(f.scene.image_size(image).unwrap(), (16, 16));
        assert_eq!(f.scene.instance(inst).unwrap().size(), [16.0, 16.0]);
    }
}
