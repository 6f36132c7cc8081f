//! wgpu render pipelines, one per pass.
//!
//! - [`sprite`] — textured quads into the offscreen target
//! - [`debug`] — untextured overlay triangles into the offscreen target
//! - [`present`] — full-screen blit (with optional post-process) to the
//!   final target

pub mod debug;
pub mod present;
pub mod sprite;

pub use debug::DebugPipeline;
pub use present::PresentPipeline;
pub use sprite::SpritePipeline;

use wgpu::{
    BindGroupLayout, BindGroupLayoutDescriptor, BindGroupLayoutEntry, BindingType,
    BufferBindingType, Device, FrontFace, PolygonMode, PrimitiveState, PrimitiveTopology,
    ShaderStages,
};

/// Layout for a single uniform buffer at binding 0.
pub(crate) fn uniform_bind_group_layout(
    device: &Device,
    label: &str,
    visibility: ShaderStages,
) -> BindGroupLayout {
    device.create_bind_group_layout(&BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[BindGroupLayoutEntry {
            binding: 0,
            visibility,
            ty: BindingType::Buffer {
                ty: BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
    })
}

/// Triangle lists, no face culling (mirrored quads wind the other way).
pub(crate) fn primitive_state() -> PrimitiveState {
    PrimitiveState {
        topology: PrimitiveTopology::TriangleList,
        strip_index_format: None,
        front_face: FrontFace::Ccw,
        cull_mode: None,
        polygon_mode: PolygonMode::Fill,
        unclipped_depth: false,
        conservative: false,
    }
}

/// Next buffer size able to hold `needed` bytes, never below `minimum`.
pub(crate) fn grown_capacity(needed: u64, minimum: u64) -> u64 {
    needed.max(minimum).next_power_of_two()
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grown_capacity() {
        assert_eq!(grown_capacity(10, 1024), 1024);
        assert_eq!(grown_capacity(1025, 1024), 2048);
        assert_eq!(grown_capacity(36 * 6, 256), 256);
    }
}
