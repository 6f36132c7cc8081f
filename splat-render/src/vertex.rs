//! GPU vertex and uniform data types for the Splat renderer.
//!
//! All types derive `bytemuck::Pod` + `Zeroable` for zero-copy upload
//! to GPU buffers.

use bytemuck::{Pod, Zeroable};
use wgpu::{BufferAddress, VertexAttribute, VertexBufferLayout, VertexFormat, VertexStepMode};

/// Largest layer depth the projection keeps inside wgpu's clip range.
pub const DEPTH_RANGE: f32 = 65_536.0;

// ───────────────────────────────────────────────────────────────────
// Sprite vertex
// ───────────────────────────────────────────────────────────────────

/// One corner of a sprite quad.  Six per instance (two triangles).
///
/// 36 bytes: position(3) + texcoord(2) + color(4).
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct SpriteVertex {
    /// Canvas pixels; `z` is the layer depth.
    pub position: [f32; 3],
    pub tex_coords: [f32; 2],
    /// Tint multiplied into the texel.
    pub color: [f32; 4],
}

impl SpriteVertex {
    pub fn layout() -> VertexBufferLayout<'static> {
        static ATTRS: &[VertexAttribute] = &[
            // location(0) = position
            VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: VertexFormat::Float32x3,
            },
            // location(1) = tex_coords
            VertexAttribute {
                offset: 12,
                shader_location: 1,
                format: VertexFormat::Float32x2,
            },
            // location(2) = color
            VertexAttribute {
                offset: 20,
                shader_location: 2,
                format: VertexFormat::Float32x4,
            },
        ];
        VertexBufferLayout {
            array_stride: std::mem::size_of::<SpriteVertex>() as BufferAddress,
            step_mode: VertexStepMode::Vertex,
            attributes: ATTRS,
        }
    }
}

// ───────────────────────────────────────────────────────────────────
// Overlay vertex
// ───────────────────────────────────────────────────────────────────

/// Untextured vertex for debug rects and lines.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct DebugVertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
}

impl DebugVertex {
    pub fn layout() -> VertexBufferLayout<'static> {
        static ATTRS: &[VertexAttribute] = &[
            // location(0) = position
            VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: VertexFormat::Float32x3,
            },
            // location(1) = color
            VertexAttribute {
                offset: 12,
                shader_location: 1,
                format: VertexFormat::Float32x4,
            },
        ];
        VertexBufferLayout {
            array_stride: std::mem::size_of::<DebugVertex>() as BufferAddress,
            step_mode: VertexStepMode::Vertex,
            attributes: ATTRS,
        }
    }
}

// ───────────────────────────────────────────────────────────────────
// Present quad
// ───────────────────────────────────────────────────────────────────

/// Full-screen quad vertex for the present pass.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct PresentVertex {
    /// Clip-space position.
    pub position: [f32; 2],
    pub tex_coords: [f32; 2],
}

impl PresentVertex {
    /// Covers the whole target.  wgpu render targets are stored top row
    /// first, so the offscreen image needs no vertical flip.
    pub const VERTICES: [PresentVertex; 4] = [
        PresentVertex { position: [-1.0, 1.0], tex_coords: [0.0, 0.0] },  // top-left
        PresentVertex { position: [1.0, 1.0], tex_coords: [1.0, 0.0] },   // top-right
        PresentVertex { position: [-1.0, -1.0], tex_coords: [0.0, 1.0] }, // bottom-left
        PresentVertex { position: [1.0, -1.0], tex_coords: [1.0, 1.0] },  // bottom-right
    ];

    pub const INDICES: [u16; 6] = [0, 1, 2, 2, 1, 3];

    pub fn layout() -> VertexBufferLayout<'static> {
        static ATTRS: &[VertexAttribute] = &[
            // location(0) = position
            VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: VertexFormat::Float32x2,
            },
            // location(1) = tex_coords
            VertexAttribute {
                offset: 8,
                shader_location: 1,
                format: VertexFormat::Float32x2,
            },
        ];
        VertexBufferLayout {
            array_stride: std::mem::size_of::<PresentVertex>() as BufferAddress,
            step_mode: VertexStepMode::Vertex,
            attributes: ATTRS,
        }
    }
}

// ───────────────────────────────────────────────────────────────────
// Uniforms
// ───────────────────────────────────────────────────────────────────

/// Projection uniform sent to the GPU once per frame.
///
/// 64 bytes, one uniform buffer.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct CameraUniform {
    /// 4×4 orthographic projection matrix (column-major).
    pub view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    /// Orthographic projection for a `width × height` viewport with the
    /// canvas scale applied about the top-left corner.
    ///
    /// Maps (0,0) to top-left and (width/scale_x, height/scale_y) to
    /// bottom-right; Y grows downward.  Depth `z` maps to
    /// `1 - z / DEPTH_RANGE`, so layer 0 sits at the far plane.
    pub fn orthographic(width: f32, height: f32, scale_x: f32, scale_y: f32) -> Self {
        let sx = 2.0 * scale_x / width;
        let sy = -2.0 * scale_y / height; // flip Y for top-left origin
        let sz = -1.0 / DEPTH_RANGE;

        Self {
            view_proj: [
                [sx,   0.0,  0.0, 0.0],
                [0.0,  sy,   0.0, 0.0],
                [0.0,  0.0,  sz,  0.0],
                [-1.0, 1.0,  1.0, 1.0],
            ],
        }
    }
}

/// Sizes handed to the present (post-process) shader.
///
/// `input_size` is the offscreen viewport, `texture_size` the offscreen
/// texture (equal here) and `output_size` the final target.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct PresentUniform {
    pub input_size: [f32; 2],
    pub texture_size: [f32; 2],
    pub output_size: [f32; 2],
    pub _pad: [f32; 2],
}

impl PresentUniform {
    pub fn new(viewport: (u32, u32), output: (u32, u32)) -> Self {
        let input = [viewport.0 as f32, viewport.1 as f32];
        Self {
            input_size: input,
            texture_size: input,
            output_size: [output.0 as f32, output.1 as f32],
            _pad: [0.0; 2],
        }
    }
}

// ===================================================================
// Tests
// ===================================================================
