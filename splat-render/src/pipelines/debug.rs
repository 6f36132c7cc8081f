//! Debug overlay pipeline — flat-coloured triangles drawn over the scene.

use wgpu::{
    BindGroup, BindGroupDescriptor, BindGroupEntry, BlendState, Buffer, BufferDescriptor,
    BufferUsages, ColorTargetState, ColorWrites, Device, FragmentState, MultisampleState,
    PipelineCompilationOptions, PipelineLayoutDescriptor, Queue, RenderPass, RenderPipeline,
    RenderPipelineDescriptor, ShaderModuleDescriptor, ShaderStages, TextureFormat, VertexState,
};

use super::{grown_capacity, primitive_state, uniform_bind_group_layout};
use crate::vertex::{CameraUniform, DebugVertex};

const INITIAL_VERTEX_BYTES: u64 = 256 * 6 * std::mem::size_of::<DebugVertex>() as u64;

pub struct DebugPipeline {
    pipeline: RenderPipeline,
    vertex_buffer: Buffer,
    vertex_capacity: u64,
    vertex_count: u32,
    camera_buffer: Buffer,
    camera_bind_group: BindGroup,
}

impl DebugPipeline {
    pub fn new(device: &Device, target_format: TextureFormat) -> Self {
        let shader = device.create_shader_module(ShaderModuleDescriptor {
            label: Some("debug_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/debug.wgsl").into()),
        });

        let camera_bgl = uniform_bind_group_layout(device, "debug_camera_bgl", ShaderStages::VERTEX);
        let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("debug_pipeline_layout"),
            bind_group_layouts: &[&camera_bgl],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some("debug_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: PipelineCompilationOptions::default(),
                buffers: &[DebugVertex::layout()],
            },
            fragment: Some(FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: PipelineCompilationOptions::default(),
                targets: &[Some(ColorTargetState {
                    format: target_format,
                    blend: Some(BlendState::ALPHA_BLENDING),
                    write_mask: ColorWrites::ALL,
                })],
            }),
            primitive: primitive_state(),
            depth_stencil: None,
            multisample: MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let vertex_buffer = Self::create_vertex_buffer(device, INITIAL_VERTEX_BYTES);
        let camera_buffer = device.create_buffer(&BufferDescriptor {
            label: Some("debug_camera_ub"),
            size: std::mem::size_of::<CameraUniform>() as u64,
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let camera_bind_group = device.create_bind_group(&BindGroupDescriptor {
            label: Some("debug_camera_bg"),
            layout: &camera_bgl,
            entries: &[BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        Self {
            pipeline,
            vertex_buffer,
            vertex_capacity: INITIAL_VERTEX_BYTES,
            vertex_count: 0,
            camera_buffer,
            camera_bind_group,
        }
    }

    fn create_vertex_buffer(device: &Device, size: u64) -> Buffer {
        device.create_buffer(&BufferDescriptor {
            label: Some("debug_vb"),
            size,
            usage: BufferUsages::VERTEX | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    pub fn upload(&mut self, device: &Device, queue: &Queue, vertices: &[DebugVertex], camera: &CameraUniform) {
        queue.write_buffer(&self.camera_buffer, 0, bytemuck::bytes_of(camera));

        self.vertex_count = vertices.len() as u32;
        if vertices.is_empty() {
            return;
        }

        let bytes: &[u8] = bytemuck::cast_slice(vertices);
        if bytes.len() as u64 > self.vertex_capacity {
            self.vertex_capacity = grown_capacity(bytes.len() as u64, INITIAL_VERTEX_BYTES);
            self.vertex_buffer = Self::create_vertex_buffer(device, self.vertex_capacity);
        }
        queue.write_buffer(&self.vertex_buffer, 0, bytes);
    }

    /// Single draw call for every overlay primitive.
    pub fn draw(&self, pass: &mut RenderPass<'_>) {
        if self.vertex_count == 0 {
            return;
        }

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.camera_bind_group, &[]);
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.draw(0..self.vertex_count, 0..1);
    }
}
