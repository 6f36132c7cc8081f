//! Decoded pixel surfaces and the texture-upload seam.
//!
//! The state model never touches a GPU.  Image creation hands the surface
//! to a [`TextureUploader`], which returns an opaque [`TextureId`] that the
//! render backend later resolves.

use crate::error::SplatError;

/// Opaque handle issued by a [`TextureUploader`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u32);

/// Component order of a true-color surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelLayout {
    Rgb,
    Bgr,
    Rgba,
    Bgra,
}

impl PixelLayout {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelLayout::Rgb | PixelLayout::Bgr => 3,
            PixelLayout::Rgba | PixelLayout::Bgra => 4,
        }
    }
}

/// A borrowed, already-decoded image.
#[derive(Clone, Copy, Debug)]
pub struct PixelSurface<'a> {
    pub width: u32,
    pub height: u32,
    /// Bytes per row, including padding.
    pub pitch: u32,
    pub bytes_per_pixel: u8,
    /// Mask selecting the red component of a pixel read as a little-endian
    /// integer.  `0x000000FF` means red comes first in memory.
    pub red_mask: u32,
    pub pixels: &'a [u8],
}

impl<'a> PixelSurface<'a> {
    /// Tightly packed RGBA8 surface.
    pub fn rgba(width: u32, height: u32, pixels: &'a [u8]) -> Self {
        Self {
            width,
            height,
            pitch: width * 4,
            bytes_per_pixel: 4,
            red_mask: 0x0000_00FF,
            pixels,
        }
    }

    pub fn layout(&self) -> Result<PixelLayout, SplatError> {
        let red_first = self.red_mask == 0x0000_00FF;
        match (self.bytes_per_pixel, red_first) {
            (4, true) => Ok(PixelLayout::Rgba),
            (4, false) => Ok(PixelLayout::Bgra),
            (3, true) => Ok(PixelLayout::Rgb),
            (3, false) => Ok(PixelLayout::Bgr),
            (bytes_per_pixel, _) => Err(SplatError::UnsupportedFormat { bytes_per_pixel }),
        }
    }

    /// Check format, dimensions and buffer length.
    pub fn validate(&self, op: &'static str) -> Result<PixelLayout, SplatError> {
        let layout = self.layout()?;
        if self.width == 0 || self.height == 0 {
            return Err(SplatError::bad_parameter(op, "surface has zero extent"));
        }
        let row = self.width as usize * layout.bytes_per_pixel();
        if (self.pitch as usize) < row {
            return Err(SplatError::bad_parameter(
                op,
                format!("pitch {} shorter than row of {row} bytes", self.pitch),
            ));
        }
        let needed = self.pitch as usize * (self.height as usize - 1) + row;
        if self.pixels.len() < needed {
            return Err(SplatError::bad_parameter(
                op,
                format!("{} bytes of pixel data, need {needed}", self.pixels.len()),
            ));
        }
        Ok(layout)
    }

    /// Repack into tightly packed RGBA8, the only layout GPUs reliably
    /// accept.  Three-channel surfaces get opaque alpha.
    pub fn to_rgba8(&self) -> Result<Vec<u8>, SplatError> {
        let layout = self.validate("to_rgba8")?;
        let bpp = layout.bytes_per_pixel();
        let mut out = Vec::with_capacity(self.width as usize * self.height as usize * 4);

        for row in 0..self.height as usize {
            let start = row * self.pitch as usize;
            let line = &self.pixels[start..start + self.width as usize * bpp];
            for px in line.chunks_exact(bpp) {
                let rgba = match layout {
                    PixelLayout::Rgba => [px[0], px[1], px[2], px[3]],
                    PixelLayout::Bgra => [px[2], px[1], px[0], px[3]],
                    PixelLayout::Rgb => [px[0], px[1], px[2], 0xFF],
                    PixelLayout::Bgr => [px[2], px[1], px[0], 0xFF],
                };
                out.extend_from_slice(&rgba);
            }
        }
        Ok(out)
    }
}

/// Turns pixel surfaces into backend textures.
pub trait TextureUploader {
    fn upload(&mut self, surface: &PixelSurface<'_>) -> Result<TextureId, SplatError>;
    fn update(&mut self, texture: TextureId, surface: &PixelSurface<'_>) -> Result<(), SplatError>;
    fn release(&mut self, texture: TextureId);
}

/// Uploader that validates surfaces and issues ids without a GPU.
///
/// Useful for tests, benchmarks and tooling that only needs the state model.
#[derive(Debug, Default)]
pub struct HeadlessUploader {
    next: u32,
    live: Vec<TextureId>,
}

impl HeadlessUploader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Textures issued and not yet released.
    pub fn live(&self) -> &[TextureId] {
        &self.live
    }
}

impl TextureUploader for HeadlessUploader {
    fn upload(&mut self, surface: &PixelSurface<'_>) -> Result<TextureId, SplatError> {
        surface.validate("upload")?;
        let id = TextureId(self.next);
        self.next += 1;
        self.live.push(id);
        Ok(id)
    }

    fn update(&mut self, texture: TextureId, surface: &PixelSurface<'_>) -> Result<(), SplatError> {
        surface.validate("update")?;
        if !self.live.contains(&texture) {
            return Err(SplatError::not_found("update", "texture"));
        }
        Ok(())
    }

    fn release(&mut self, texture: TextureId) {
        self.live.retain(|t| *t != texture);
    }
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn surface(bpp: u8, red_mask: u32, pixels: &[u8]) -> PixelSurface<'_> {
        PixelSurface {
            width: 2,
            height: 1,
            pitch: 2 * bpp as u32,
            bytes_per_pixel: bpp,
            red_mask,
            pixels,
        }
    }

    #[test]
    fn test_layout_selection() {
        let px = [0u8; 8];
        assert_eq!(surface(4, 0xFF, &px).layout().unwrap(), PixelLayout::Rgba);
        assert_eq!(surface(4, 0xFF_0000, &px).layout().unwrap(), PixelLayout::Bgra);
        assert_eq!(surface(3, 0xFF, &px).layout().unwrap(), PixelLayout::Rgb);
        assert_eq!(surface(3, 0xFF_0000, &px).layout().unwrap(), PixelLayout::Bgr);
    }

    #[test]
    fn test_paletted_surface_unsupported() {
        let px = [0u8; 2];
        assert_eq!(
            surface(1, 0, &px).layout(),
            Err(SplatError::UnsupportedFormat { bytes_per_pixel: 1 })
        );
    }

    #[test]
    fn test_short_buffer_rejected() {
        let px = [0u8; 7];
        assert!(matches!(
            surface(4, 0xFF, &px).validate("test"),
            Err(SplatError::BadParameter { .. })
        ));
    }

    #[test]
    fn test_bgr_to_rgba8() {
        let px = [1, 2, 3, 4, 5, 6];
        let out = surface(3, 0xFF_0000, &px).to_rgba8().unwrap();
        assert_eq!(out, vec![3, 2, 1, 255, 6, 5, 4, 255]);
    }

    #[test]
    fn test_pitch_padding_skipped() {
        // 1×2 RGBA with 4 bytes of row padding.
        let px = [9, 9, 9, 9, 0, 0, 0, 0, 7, 7, 7, 7];
        let s = PixelSurface {
            width: 1,
            height: 2,
            pitch: 8,
            bytes_per_pixel: 4,
            red_mask: 0xFF,
            pixels: &px,
        };
        assert_eq!(s.to_rgba8().unwrap(), vec![9, 9, 9, 9, 7, 7, 7, 7]);
    }

    #[test]
    fn test_headless_uploader_tracks_live() {
        let px = [0u8; 8];
        let mut up = HeadlessUploader::new();
        let a = up.upload(&PixelSurface::rgba(2, 1, &px)).unwrap();
        let b = up.upload(&PixelSurface::rgba(2, 1, &px)).unwrap();
        assert_ne!(a, b);
        up.release(a);
        assert_eq!(up.live(), &[b]);
        assert!(up.update(a, &PixelSurface::rgba(2, 1, &px)).is_err());
    }
}
