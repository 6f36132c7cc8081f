//! Present pipeline — blits the offscreen image to the final target.
//!
//! Nearest-neighbour sampling, blending disabled.  The fragment stage is
//! either the pass-through in `present.wgsl` or a canvas post-process
//! shader; both are appended to the shared `present_common.wgsl` and see
//! the same bindings and size uniforms.

use log::debug;
use wgpu::{
    BindGroup, BindGroupDescriptor, BindGroupEntry, BindGroupLayout, BindingResource, Buffer,
    BufferDescriptor, BufferUsages, ColorTargetState, ColorWrites, Device, FragmentState,
    IndexFormat, MultisampleState, PipelineCompilationOptions, PipelineLayout,
    PipelineLayoutDescriptor, Queue, RenderPass, RenderPipeline, RenderPipelineDescriptor,
    Sampler, ShaderModuleDescriptor, ShaderStages, TextureFormat, TextureView, VertexState,
};

use splat_core::FilterMode;

use super::{primitive_state, uniform_bind_group_layout};
use crate::textures::{create_sampler, texture_bind_group_layout};
use crate::vertex::{PresentUniform, PresentVertex};

const COMMON_SOURCE: &str = include_str!("../shaders/present_common.wgsl");
const PASS_THROUGH_SOURCE: &str = include_str!("../shaders/present.wgsl");

/// Full WGSL module for a fragment stage (`None` = pass-through).
pub fn shader_source(fragment: Option<&str>) -> String {
    format!("{COMMON_SOURCE}\n{}", fragment.unwrap_or(PASS_THROUGH_SOURCE))
}

pub struct PresentPipeline {
    source_layout: BindGroupLayout,
    pipeline_layout: PipelineLayout,
    pipeline: RenderPipeline,
    /// Target format and fragment source the pipeline was built for.
    format: TextureFormat,
    fragment: Option<String>,

    sampler: Sampler,
    vertex_buffer: Buffer,
    index_buffer: Buffer,
    sizes_buffer: Buffer,
    sizes_bind_group: BindGroup,
}

impl PresentPipeline {
    pub fn new(device: &Device, queue: &Queue, target_format: TextureFormat) -> Self {
        let source_layout = texture_bind_group_layout(device, "present_source_bgl");
        let sizes_bgl = uniform_bind_group_layout(device, "present_sizes_bgl", ShaderStages::FRAGMENT);

        let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("present_pipeline_layout"),
            bind_group_layouts: &[&source_layout, &sizes_bgl],
            push_constant_ranges: &[],
        });
        let pipeline = Self::create_pipeline(device, &pipeline_layout, target_format, None);

        let vertex_buffer = device.create_buffer(&BufferDescriptor {
            label: Some("present_vb"),
            size: std::mem::size_of::<[PresentVertex; 4]>() as u64,
            usage: BufferUsages::VERTEX | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let index_buffer = device.create_buffer(&BufferDescriptor {
            label: Some("present_ib"),
            size: std::mem::size_of::<[u16; 6]>() as u64,
            usage: BufferUsages::INDEX | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        queue.write_buffer(&vertex_buffer, 0, bytemuck::cast_slice(&PresentVertex::VERTICES));
        queue.write_buffer(&index_buffer, 0, bytemuck::cast_slice(&PresentVertex::INDICES));

        let sizes_buffer = device.create_buffer(&BufferDescriptor {
            label: Some("present_sizes_ub"),
            size: std::mem::size_of::<PresentUniform>() as u64,
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let sizes_bind_group = device.create_bind_group(&BindGroupDescriptor {
            label: Some("present_sizes_bg"),
            layout: &sizes_bgl,
            entries: &[BindGroupEntry {
                binding: 0,
                resource: sizes_buffer.as_entire_binding(),
            }],
        });

        Self {
            source_layout,
            pipeline_layout,
            pipeline,
            format: target_format,
            fragment: None,
            sampler: create_sampler(device, FilterMode::Nearest),
            vertex_buffer,
            index_buffer,
            sizes_buffer,
            sizes_bind_group,
        }
    }

    fn create_pipeline(
        device: &Device,
        layout: &PipelineLayout,
        format: TextureFormat,
        fragment: Option<&str>,
    ) -> RenderPipeline {
        let shader = device.create_shader_module(ShaderModuleDescriptor {
            label: Some("present_shader"),
            source: wgpu::ShaderSource::Wgsl(shader_source(fragment).into()),
        });

        device.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some("present_pipeline"),
            layout: Some(layout),
            vertex: VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: PipelineCompilationOptions::default(),
                buffers: &[PresentVertex::layout()],
            },
            fragment: Some(FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: PipelineCompilationOptions::default(),
                targets: &[Some(ColorTargetState {
                    format,
                    blend: None,
                    write_mask: ColorWrites::ALL,
                })],
            }),
            primitive: primitive_state(),
            depth_stencil: None,
            multisample: MultisampleState::default(),
            multiview: None,
            cache: None,
        })
    }

    /// Whether [`rebuild`](Self::rebuild) is needed for this target and
    /// fragment source.
    pub fn is_stale(&self, format: TextureFormat, fragment: Option<&str>) -> bool {
        self.format != format || self.fragment.as_deref() != fragment
    }

    /// Recreate the pipeline for a new target format or fragment source.
    pub fn rebuild(&mut self, device: &Device, format: TextureFormat, fragment: Option<&str>) {
        debug!(
            "building present pipeline for {format:?} ({})",
            if fragment.is_some() { "post-process" } else { "pass-through" }
        );
        self.pipeline = Self::create_pipeline(device, &self.pipeline_layout, format, fragment);
        self.format = format;
        self.fragment = fragment.map(str::to_owned);
    }

    /// Fall back to the pass-through stage while remembering `fragment`
    /// as the current source, so a broken shader is not rebuilt every frame.
    pub fn rebuild_fallback(&mut self, device: &Device, format: TextureFormat, fragment: Option<&str>) {
        self.pipeline = Self::create_pipeline(device, &self.pipeline_layout, format, None);
        self.format = format;
        self.fragment = fragment.map(str::to_owned);
    }

    /// Bind group reading `view` through the nearest sampler.
    pub fn source_bind_group(&self, device: &Device, view: &TextureView) -> BindGroup {
        device.create_bind_group(&BindGroupDescriptor {
            label: Some("present_source_bg"),
            layout: &self.source_layout,
            entries: &[
                BindGroupEntry {
                    binding: 0,
                    resource: BindingResource::TextureView(view),
                },
                BindGroupEntry {
                    binding: 1,
                    resource: BindingResource::Sampler(&self.sampler),
                },
            ],
        })
    }

    pub fn upload_sizes(&self, queue: &Queue, sizes: &PresentUniform) {
        queue.write_buffer(&self.sizes_buffer, 0, bytemuck::bytes_of(sizes));
    }

    pub fn draw(&self, pass: &mut RenderPass<'_>, source: &BindGroup) {
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, source, &[]);
        pass.set_bind_group(1, &self.sizes_bind_group, &[]);
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), IndexFormat::Uint16);
        pass.draw_indexed(0..6, 0, 0..1);
    }
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shader_source_appends_fragment() {
        let source = shader_source(None);
        assert!(source.contains("fn vs_main"));
        assert!(source.contains("fn fs_main"));

        let custom = "@fragment fn fs_main(in: PresentOut) -> @location(0) vec4<f32> { return vec4<f32>(sizes.output_size, 0.0, 1.0); }";
        let source = shader_source(Some(custom));
        assert!(source.ends_with(custom));
        assert!(!source.contains("Pass-through present"));
    }
}
