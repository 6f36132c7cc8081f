//! Wire-level flag bits and their decoded transform form.

use bitflags::bitflags;

use crate::error::SplatError;

bitflags! {
    /// Flag word accepted by instance and debug-draw calls.
    ///
    /// The bit values are a stable contract with bindings.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Flags: u32 {
        const MIRROR_X = 0x0001;
        const MIRROR_Y = 0x0002;
        const MIRROR_DIAG = 0x0004;
        /// Placement is relative to the canvas view origin (and culled).
        const RELATIVE = 0x0008;
        const ROTATE = 0x0010;
        /// Set while the instance has a clip rect.
        const STATIC = 0x0020;
        /// Debug rects only: fill instead of outline.
        const FILLED = 0x0040;
        const HIDDEN = 0x0080;
    }
}

impl Flags {
    /// Any bit that requires the mirror/rotate matrix.
    pub const IMAGE_MOD: Flags = Flags::MIRROR_X
        .union(Flags::MIRROR_Y)
        .union(Flags::MIRROR_DIAG)
        .union(Flags::ROTATE);

    /// Decode a raw flag word, rejecting unknown bits.
    pub fn from_wire(op: &'static str, bits: u32) -> Result<Self, SplatError> {
        Flags::from_bits(bits).ok_or_else(|| {
            SplatError::bad_parameter(op, format!("unknown flag bits {bits:#06x}"))
        })
    }
}

/// How the quad is mirrored before rotation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mirror {
    None,
    /// Independent axis flips.
    Axes { x: bool, y: bool },
    /// Swap across the main diagonal (-90° turn), then the conditional
    /// flips: X when `x` is set, Y when `y` is *not* set.
    Diagonal { x: bool, y: bool },
}

/// Decoded mirror/rotate state of an instance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpriteTransform {
    pub mirror: Mirror,
    /// Rotation in degrees about the quad centre.
    pub rotation: Option<f32>,
}

impl SpriteTransform {
    /// `None` when no mirror/rotate bit is set, so callers can skip the
    /// matrix entirely.
    pub fn decode(flags: Flags, angle: f32) -> Option<Self> {
        if !flags.intersects(Flags::IMAGE_MOD) {
            return None;
        }

        let x = flags.contains(Flags::MIRROR_X);
        let y = flags.contains(Flags::MIRROR_Y);
        let mirror = if flags.contains(Flags::MIRROR_DIAG) {
            Mirror::Diagonal { x, y }
        } else if x || y {
            Mirror::Axes { x, y }
        } else {
            Mirror::None
        };

        let rotation = flags.contains(Flags::ROTATE).then_some(angle);

        Some(Self { mirror, rotation })
    }
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_values() {
        assert_eq!(Flags::MIRROR_X.bits(), 0x01);
        assert_eq!(Flags::MIRROR_Y.bits(), 0x02);
        assert_eq!(Flags::MIRROR_DIAG.bits(), 0x04);
        assert_eq!(Flags::RELATIVE.bits(), 0x08);
        assert_eq!(Flags::ROTATE.bits(), 0x10);
        assert_eq!(Flags::STATIC.bits(), 0x20);
        assert_eq!(Flags::FILLED.bits(), 0x40);
        assert_eq!(Flags::HIDDEN.bits(), 0x80);
    }

    #[test]
    fn test_unknown_bits_rejected() {
        assert!(Flags::from_wire("test", 0x0100).is_err());
        assert_eq!(
            Flags::from_wire("test", 0x0009).unwrap(),
            Flags::MIRROR_X | Flags::RELATIVE
        );
    }

    #[test]
    fn test_decode_fast_path() {
        assert_eq!(SpriteTransform::decode(Flags::RELATIVE | Flags::STATIC, 45.0), None);
        assert_eq!(SpriteTransform::decode(Flags::empty(), 45.0), None);
    }

    #[test]
    fn test_decode_variants() {
        let t = SpriteTransform::decode(Flags::MIRROR_X, 0.0).unwrap();
        assert_eq!(t.mirror, Mirror::Axes { x: true, y: false });
        assert_eq!(t.rotation, None);

        let t = SpriteTransform::decode(Flags::MIRROR_DIAG | Flags::MIRROR_Y, 0.0).unwrap();
        assert_eq!(t.mirror, Mirror::Diagonal { x: false, y: true });

        let t = SpriteTransform::decode(Flags::ROTATE, 30.0).unwrap();
        assert_eq!(t.mirror, Mirror::None);
        assert_eq!(t.rotation, Some(30.0));
    }
}
