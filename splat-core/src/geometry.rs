//! Stateless geometry helpers: rects, the mirror/rotate matrix, and
//! scissor mapping.

use glam::{Mat4, Vec3};

use crate::flags::{Flags, Mirror, SpriteTransform};

/// Integer point in canvas space (y grows downward).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Integer rect with a top-left origin.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    pub fn is_empty(&self) -> bool {
        self.w <= 0 || self.h <= 0
    }
}

/// Floating-point rect, used for placement and culling.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Bounds {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Bounds {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn is_empty(&self) -> bool {
        !(self.w > 0.0 && self.h > 0.0)
    }

    /// Strict overlap test; empty rects never intersect.
    pub fn intersects(&self, other: &Bounds) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        self.x < other.x + other.w
            && other.x < self.x + self.w
            && self.y < other.y + other.h
            && other.y < self.y + self.h
    }
}

/// Scale a rect's extents; the origin is left alone (translation is
/// applied separately).
pub fn scaled_extent(rect: Bounds, scale: [f32; 2]) -> Bounds {
    Bounds {
        w: rect.w * scale[0],
        h: rect.h * scale[1],
        ..rect
    }
}

impl SpriteTransform {
    /// Column-major matrix for a `width × height` quad whose local origin is
    /// its top-left corner.
    ///
    /// Composition order: centre → mirror → rotation → un-centre.  Swapping
    /// mirror and rotation changes the output for combined cases.
    pub fn matrix(&self, width: f32, height: f32) -> Mat4 {
        let half = Vec3::new(width / 2.0, height / 2.0, 0.0);
        let flip_x = Mat4::from_scale(Vec3::new(-1.0, 1.0, 1.0));
        let flip_y = Mat4::from_scale(Vec3::new(1.0, -1.0, 1.0));

        let mut m = Mat4::from_translation(half);

        match self.mirror {
            Mirror::None => {}
            Mirror::Axes { x, y } => {
                if x {
                    m *= flip_x;
                }
                if y {
                    m *= flip_y;
                }
            }
            Mirror::Diagonal { x, y } => {
                m *= Mat4::from_rotation_z((-90.0f32).to_radians());
                if x {
                    m *= flip_y;
                }
                if !y {
                    m *= flip_x;
                }
            }
        }

        if let Some(angle) = self.rotation {
            m *= Mat4::from_rotation_z(angle.to_radians());
        }

        m * Mat4::from_translation(-half)
    }
}

/// Flag-driven entry point: identity unless a mirror/rotate bit is set.
pub fn mirror_rotate_matrix(flags: Flags, angle: f32, width: f32, height: f32) -> Mat4 {
    SpriteTransform::decode(flags, angle)
        .map(|t| t.matrix(width, height))
        .unwrap_or(Mat4::IDENTITY)
}

/// Scissor box in device coordinates (bottom-left origin).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ScissorRect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl ScissorRect {
    /// Convert to a top-left-origin box clamped to the target, as
    /// `[x, y, w, h]`.  `None` when nothing of the box lies on the target.
    pub fn to_top_left(&self, target_width: u32, target_height: u32) -> Option<[u32; 4]> {
        let (tw, th) = (target_width as i64, target_height as i64);
        let top = th - (self.y as i64 + self.h as i64);

        let x0 = (self.x as i64).clamp(0, tw);
        let y0 = top.clamp(0, th);
        let x1 = (self.x as i64 + self.w as i64).clamp(0, tw);
        let y1 = (top + self.h as i64).clamp(0, th);

        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some([x0 as u32, y0 as u32, (x1 - x0) as u32, (y1 - y0) as u32])
    }
}

/// Map a top-left-origin clip rect into bottom-left device scissor
/// coordinates, applying the canvas scale only when it is not (1, 1).
///
/// A scaled box is rounded outward so a clip never shrinks to nothing just
/// because the scale is small.  Arithmetic is done in `i64` and the result
/// saturates to the `i32` range.
pub fn map_scissor(clip: Rect, canvas_scale: [f32; 2], target_height: u32) -> ScissorRect {
    let height = target_height as i64;
    let (x, y) = (clip.x as i64, clip.y as i64);
    let (right, bottom) = (x + clip.w as i64, y + clip.h as i64);

    let (x0, x1, y0, y1) = if canvas_scale == [1.0, 1.0] {
        (x, right, y, bottom)
    } else {
        let [sx, sy] = canvas_scale.map(f64::from);
        let lo = |v: i64, s: f64| (v as f64 * s).floor() as i64;
        let hi = |v: i64, s: f64| (v as f64 * s).ceil() as i64;
        (lo(x, sx), hi(right, sx), lo(y, sy), hi(bottom, sy))
    };

    ScissorRect {
        x: saturate(x0),
        y: saturate(height - y1),
        w: saturate(x1 - x0),
        h: saturate(y1 - y0),
    }
}

fn saturate(v: i64) -> i32 {
    v.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(m: Mat4, x: f32, y: f32) -> (f32, f32) {
        let p = m.transform_point3(Vec3::new(x, y, 0.0));
        (p.x, p.y)
    }

    fn assert_close(actual: (f32, f32), expected: (f32, f32)) {
        assert!(
            (actual.0 - expected.0).abs() < 1e-4 && (actual.1 - expected.1).abs() < 1e-4,
            "expected {expected:?}, got {actual:?}"
        );
    }

    #[test]
    fn test_scaled_extent_keeps_origin() {
        let r = scaled_extent(Bounds::new(5.0, 6.0, 10.0, 20.0), [2.0, 0.5]);
        assert_eq!(r, Bounds::new(5.0, 6.0, 20.0, 10.0));
    }

    #[test]
    fn test_intersects() {
        let view = Bounds::new(0.0, 0.0, 100.0, 100.0);
        assert!(Bounds::new(90.0, 90.0, 20.0, 20.0).intersects(&view));
        assert!(!Bounds::new(100.0, 0.0, 10.0, 10.0).intersects(&view));
        assert!(!Bounds::new(-10.0, -10.0, 10.0, 10.0).intersects(&view));
        assert!(!Bounds::new(10.0, 10.0, 0.0, 10.0).intersects(&view));
    }

    #[test]
    fn test_identity_without_flags() {
        let m = mirror_rotate_matrix(Flags::RELATIVE, 90.0, 10.0, 10.0);
        assert_eq!(m, Mat4::IDENTITY);
    }

    #[test]
    fn test_mirror_x() {
        let m = mirror_rotate_matrix(Flags::MIRROR_X, 0.0, 10.0, 4.0);
        assert_close(apply(m, 0.0, 0.0), (10.0, 0.0));
        assert_close(apply(m, 10.0, 4.0), (0.0, 4.0));
    }

    #[test]
    fn test_mirror_y() {
        let m = mirror_rotate_matrix(Flags::MIRROR_Y, 0.0, 10.0, 4.0);
        assert_close(apply(m, 0.0, 0.0), (0.0, 4.0));
    }

    #[test]
    fn test_diagonal_is_transpose_for_square() {
        let m = mirror_rotate_matrix(Flags::MIRROR_DIAG, 0.0, 2.0, 2.0);
        assert_close(apply(m, 0.0, 0.0), (0.0, 0.0));
        assert_close(apply(m, 2.0, 0.0), (0.0, 2.0));
        assert_close(apply(m, 0.0, 2.0), (2.0, 0.0));
    }

    #[test]
    fn test_diagonal_with_both_flips() {
        // Diagonal + X + Y: -90° turn then Y flip only.
        let m = mirror_rotate_matrix(
            Flags::MIRROR_DIAG | Flags::MIRROR_X | Flags::MIRROR_Y,
            0.0,
            2.0,
            2.0,
        );
        // (0,0) -> centre (-1,-1) -> flip y (-1,1) -> rot -90 (1,1) -> (2,2)
        assert_close(apply(m, 0.0, 0.0), (2.0, 2.0));
    }

    #[test]
    fn test_rotate_180() {
        let m = mirror_rotate_matrix(Flags::ROTATE, 180.0, 10.0, 4.0);
        assert_close(apply(m, 0.0, 0.0), (10.0, 4.0));
    }

    #[test]
    fn test_mirror_then_rotate_order() {
        let m = mirror_rotate_matrix(Flags::MIRROR_X | Flags::ROTATE, 90.0, 2.0, 2.0);
        // Mirror applied outside the rotation keeps (0,0) fixed; the
        // swapped order would land on (2,2).
        assert_close(apply(m, 0.0, 0.0), (0.0, 0.0));
        assert_close(apply(m, 2.0, 0.0), (0.0, 2.0));
    }

    #[test]
    fn test_map_scissor_unscaled() {
        let s = map_scissor(Rect::new(10, 20, 30, 40), [1.0, 1.0], 480);
        assert_eq!(s, ScissorRect { x: 10, y: 420, w: 30, h: 40 });
    }

    #[test]
    fn test_map_scissor_scaled() {
        let s = map_scissor(Rect::new(10, 20, 30, 40), [2.0, 2.0], 480);
        assert_eq!(s, ScissorRect { x: 20, y: 360, w: 60, h: 80 });
    }

    #[test]
    fn test_map_scissor_rounds_outward_at_tiny_scale() {
        let s = map_scissor(Rect::new(0, 0, 50, 50), [0.01, 0.01], 100);
        assert_eq!(s, ScissorRect { x: 0, y: 99, w: 1, h: 1 });
        assert_eq!(s.to_top_left(100, 100), Some([0, 0, 1, 1]));
    }

    #[test]
    fn test_map_scissor_extreme_clip_saturates() {
        let s = map_scissor(Rect::new(0, i32::MAX - 5, 10, 10), [1.0, 1.0], 100);
        assert_eq!(s.h, 10);
        assert_eq!(s.y, 100 - (i32::MAX - 5) - 10);
        assert_eq!(s.to_top_left(100, 100), None);

        let s = map_scissor(Rect::new(i32::MAX, i32::MIN, i32::MAX, i32::MAX), [3.0, 3.0], 100);
        assert_eq!(s.x, i32::MAX);
        assert_eq!(s.to_top_left(100, 100), None);
    }

    #[test]
    fn test_scissor_to_top_left_round_trip() {
        let s = map_scissor(Rect::new(10, 20, 30, 40), [1.0, 1.0], 480);
        assert_eq!(s.to_top_left(640, 480), Some([10, 20, 30, 40]));
    }

    #[test]
    fn test_scissor_clamped_and_rejected() {
        let s = map_scissor(Rect::new(-10, -10, 30, 30), [1.0, 1.0], 100);
        assert_eq!(s.to_top_left(100, 100), Some([0, 0, 20, 20]));

        let off = map_scissor(Rect::new(200, 0, 10, 10), [1.0, 1.0], 100);
        assert_eq!(off.to_top_left(100, 100), None);
    }
}
