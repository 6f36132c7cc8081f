//! Images and the instances that place them.

use crate::debug::Rgba;
use crate::error::SplatError;
use crate::flags::Flags;
use crate::geometry::{scaled_extent, Bounds, Point, Rect};
use crate::handle::{CanvasId, ImageId, LayerId};
use crate::surface::TextureId;

/// An uploaded texture and its pixel extents.
#[derive(Clone, Debug, PartialEq)]
pub struct Image {
    pub(crate) canvas: CanvasId,
    pub(crate) texture: TextureId,
    pub(crate) width: u32,
    pub(crate) height: u32,
}

impl Image {
    pub fn canvas(&self) -> CanvasId {
        self.canvas
    }

    pub fn texture(&self) -> TextureId {
        self.texture
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Normalized source region `(s1, t1)–(s2, t2)` of an image.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TexRegion {
    pub s1: f32,
    pub t1: f32,
    pub s2: f32,
    pub t2: f32,
}

impl TexRegion {
    pub const FULL: TexRegion = TexRegion {
        s1: 0.0,
        t1: 0.0,
        s2: 1.0,
        t2: 1.0,
    };

    pub const fn new(s1: f32, t1: f32, s2: f32, t2: f32) -> Self {
        Self { s1, t1, s2, t2 }
    }

    /// Region covering a pixel rect of an image of the given size.
    pub fn from_pixels(rect: Rect, width: u32, height: u32) -> Self {
        let (w, h) = (width.max(1) as f32, height.max(1) as f32);
        Self {
            s1: rect.x as f32 / w,
            t1: rect.y as f32 / h,
            s2: (rect.x + rect.w) as f32 / w,
            t2: (rect.y + rect.h) as f32 / h,
        }
    }

    pub fn validate(&self, op: &'static str) -> Result<(), SplatError> {
        let all = [self.s1, self.t1, self.s2, self.t2];
        if all.iter().all(|c| (0.0..=1.0).contains(c)) {
            Ok(())
        } else {
            Err(SplatError::bad_parameter(
                op,
                format!("texture region {all:?} outside [0, 1]"),
            ))
        }
    }
}

/// A placed, drawable reference to a region of an image.
#[derive(Clone, Debug, PartialEq)]
pub struct Instance {
    pub(crate) image: ImageId,
    pub(crate) layer: LayerId,
    pub(crate) position: Point,
    pub(crate) region: TexRegion,
    /// Unscaled size in pixels: image extents × region extents.
    pub(crate) base_size: [f32; 2],
    pub(crate) scale: [f32; 2],
    pub(crate) angle: f32,
    pub(crate) color: Rgba,
    pub(crate) flags: Flags,
    pub(crate) clip: Option<Rect>,
}

impl Instance {
    pub(crate) fn new(
        image: ImageId,
        image_size: (u32, u32),
        layer: LayerId,
        position: Point,
        region: TexRegion,
        flags: Flags,
    ) -> Self {
        Self {
            image,
            layer,
            position,
            region,
            base_size: region_size(region, image_size),
            scale: [1.0, 1.0],
            angle: 0.0,
            color: [1.0, 1.0, 1.0, 1.0],
            flags,
            clip: None,
        }
    }

    pub(crate) fn set_image(&mut self, image: ImageId, image_size: (u32, u32), region: TexRegion) {
        self.image = image;
        self.region = region;
        self.base_size = region_size(region, image_size);
    }

    pub fn image(&self) -> ImageId {
        self.image
    }

    pub fn layer(&self) -> LayerId {
        self.layer
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn region(&self) -> TexRegion {
        self.region
    }

    pub fn scale(&self) -> [f32; 2] {
        self.scale
    }

    pub fn angle(&self) -> f32 {
        self.angle
    }

    pub fn color(&self) -> Rgba {
        self.color
    }

    pub fn flags(&self) -> Flags {
        self.flags
    }

    pub fn clip(&self) -> Option<Rect> {
        self.clip
    }

    pub fn is_visible(&self) -> bool {
        !self.flags.contains(Flags::HIDDEN)
    }

    /// Size in pixels with the instance scale applied.
    pub fn size(&self) -> [f32; 2] {
        let r = self.placement();
        [r.w, r.h]
    }

    /// Absolute placement rect (position plus scaled size).
    pub fn placement(&self) -> Bounds {
        scaled_extent(
            Bounds::new(
                self.position.x as f32,
                self.position.y as f32,
                self.base_size[0],
                self.base_size[1],
            ),
            self.scale,
        )
    }
}

fn region_size(region: TexRegion, (width, height): (u32, u32)) -> [f32; 2] {
    [
        width as f32 * (region.s2 - region.s1).abs(),
        height as f32 * (region.t2 - region.t1).abs(),
    ]
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::Key;

    fn instance(region: TexRegion) -> Instance {
        Instance::new(
            ImageId::from_parts(0, 0),
            (64, 32),
            LayerId::from_parts(0, 0),
            Point::new(3, 4),
            region,
            Flags::empty(),
        )
    }

    #[test]
    fn test_half_width_region_size() {
        let inst = instance(TexRegion::new(0.0, 0.0, 0.5, 1.0));
        assert_eq!(inst.size(), [32.0, 32.0]);
    }

    #[test]
    fn test_scale_applies_to_size_not_origin() {
        let mut inst = instance(TexRegion::FULL);
        inst.scale = [2.0, 0.5];
        assert_eq!(inst.placement(), Bounds::new(3.0, 4.0, 128.0, 16.0));
    }

    #[test]
    fn test_region_validation() {
        assert!(TexRegion::FULL.validate("t").is_ok());
        assert!(TexRegion::new(0.0, 0.0, 1.5, 1.0).validate("t").is_err());
        assert!(TexRegion::new(f32::NAN, 0.0, 1.0, 1.0).validate("t").is_err());
    }

    #[test]
    fn test_region_from_pixels() {
        let r = TexRegion::from_pixels(Rect::new(16, 8, 16, 8), 64, 32);
        assert_eq!(r, TexRegion::new(0.25, 0.25, 0.5, 0.5));
    }

    #[test]
    fn test_defaults() {
        let inst = instance(TexRegion::FULL);
        assert_eq!(inst.color(), [1.0; 4]);
        assert_eq!(inst.scale(), [1.0, 1.0]);
        assert!(inst.is_visible());
        assert!(inst.clip().is_none());
    }
}
