//! Sprite render pipeline — batched textured quads.
//!
//! The frame's vertices are uploaded once; each batch is then one
//! `draw` call with its own texture bind group and scissor.

use log::warn;
use wgpu::{
    BindGroup, BindGroupDescriptor, BindGroupEntry, BindGroupLayout, BlendState, Buffer,
    BufferDescriptor, BufferUsages, ColorTargetState, ColorWrites, Device, FragmentState,
    MultisampleState, PipelineCompilationOptions, PipelineLayoutDescriptor, Queue, RenderPass,
    RenderPipeline, RenderPipelineDescriptor, ShaderModuleDescriptor, ShaderStages,
    TextureFormat, VertexState,
};

use splat_core::FilterMode;

use super::{grown_capacity, primitive_state, uniform_bind_group_layout};
use crate::frame::SpriteBatch;
use crate::textures::TextureCache;
use crate::vertex::{CameraUniform, SpriteVertex};

/// Initial vertex buffer size: 1 024 quads.
const INITIAL_VERTEX_BYTES: u64 = 1024 * 6 * std::mem::size_of::<SpriteVertex>() as u64;

/// Owns the wgpu pipeline, vertex buffer and camera uniform for sprites.
pub struct SpritePipeline {
    pipeline: RenderPipeline,

    vertex_buffer: Buffer,
    vertex_capacity: u64,
    vertex_count: u32,

    camera_buffer: Buffer,
    camera_bind_group: BindGroup,
}

impl SpritePipeline {
    /// `texture_layout` is the cache's layout, bound as group 1.
    pub fn new(device: &Device, target_format: TextureFormat, texture_layout: &BindGroupLayout) -> Self {
        // ── Shader ──────────────────────────────────────────────
        let shader = device.create_shader_module(ShaderModuleDescriptor {
            label: Some("sprite_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/sprite.wgsl").into()),
        });

        // ── Layouts ─────────────────────────────────────────────
        let camera_bgl = uniform_bind_group_layout(device, "sprite_camera_bgl", ShaderStages::VERTEX);
        let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("sprite_pipeline_layout"),
            bind_group_layouts: &[&camera_bgl, texture_layout],
            push_constant_ranges: &[],
        });

        // ── Render pipeline ─────────────────────────────────────
        let pipeline = device.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some("sprite_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: PipelineCompilationOptions::default(),
                buffers: &[SpriteVertex::layout()],
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

        // ── Buffers ─────────────────────────────────────────────
        let vertex_buffer = Self::create_vertex_buffer(device, INITIAL_VERTEX_BYTES);

        let camera_buffer = device.create_buffer(&BufferDescriptor {
            label: Some("sprite_camera_ub"),
            size: std::mem::size_of::<CameraUniform>() as u64,
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let camera_bind_group = device.create_bind_group(&BindGroupDescriptor {
            label: Some("sprite_camera_bg"),
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
            label: Some("sprite_vb"),
            size,
            usage: BufferUsages::VERTEX | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    // ───────────────────── Upload ─────────────────────────────────

    /// Upload this frame's vertices and camera, growing the buffer when
    /// the frame outgrows it.
    pub fn upload(&mut self, device: &Device, queue: &Queue, vertices: &[SpriteVertex], camera: &CameraUniform) {
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

    // ───────────────────── Draw ───────────────────────────────────

    /// One draw call per batch.  Batches whose texture has vanished from
    /// the cache are skipped.
    pub fn draw(
        &self,
        pass: &mut RenderPass<'_>,
        batches: &[SpriteBatch],
        textures: &TextureCache,
        filter: FilterMode,
        target_size: (u32, u32),
    ) {
        if self.vertex_count == 0 {
            return;
        }

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.camera_bind_group, &[]);
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));

        for batch in batches {
            let Some(bind_group) = textures.bind_group(batch.texture, filter) else {
                warn!("{:?} missing from the texture cache, batch skipped", batch.texture);
                continue;
            };
            pass.set_bind_group(1, bind_group, &[]);

            let [x, y, w, h] = batch.scissor.unwrap_or([0, 0, target_size.0, target_size.1]);
            pass.set_scissor_rect(x, y, w, h);
            pass.draw(batch.vertices.clone(), 0..1);
        }

        pass.set_scissor_rect(0, 0, target_size.0, target_size.1);
    }
}
