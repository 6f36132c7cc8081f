//! GPU texture cache and the wgpu-backed [`TextureUploader`].
//!
//! Images are repacked to RGBA8 on upload.  Each cached texture carries one
//! bind group per sampler so a canvas can switch filter mode without
//! touching the texture.

use std::collections::HashMap;

use log::debug;
use wgpu::{
    AddressMode, BindGroup, BindGroupDescriptor, BindGroupEntry, BindGroupLayout,
    BindGroupLayoutDescriptor, BindGroupLayoutEntry, BindingResource, BindingType, Device,
    Extent3d, Queue, Sampler, SamplerBindingType, SamplerDescriptor, ShaderStages, Texture,
    TextureDescriptor, TextureDimension, TextureFormat, TextureSampleType, TextureUsages,
    TextureViewDimension,
};

use splat_core::{FilterMode, PixelSurface, SplatError, TextureId, TextureUploader};

/// Format every sprite texture is stored in.
pub const SPRITE_TEXTURE_FORMAT: TextureFormat = TextureFormat::Rgba8Unorm;

/// Layout shared by sprite textures and the present pass input:
/// binding 0 = texture, binding 1 = sampler.
pub fn texture_bind_group_layout(device: &Device, label: &str) -> BindGroupLayout {
    device.create_bind_group_layout(&BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[
            BindGroupLayoutEntry {
                binding: 0,
                visibility: ShaderStages::FRAGMENT,
                ty: BindingType::Texture {
                    sample_type: TextureSampleType::Float { filterable: true },
                    view_dimension: TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
            BindGroupLayoutEntry {
                binding: 1,
                visibility: ShaderStages::FRAGMENT,
                ty: BindingType::Sampler(SamplerBindingType::Filtering),
                count: None,
            },
        ],
    })
}

pub fn create_sampler(device: &Device, filter: FilterMode) -> Sampler {
    let (label, mode) = match filter {
        FilterMode::Nearest => ("splat_nearest_sampler", wgpu::FilterMode::Nearest),
        FilterMode::Linear => ("splat_linear_sampler", wgpu::FilterMode::Linear),
    };
    device.create_sampler(&SamplerDescriptor {
        label: Some(label),
        address_mode_u: AddressMode::ClampToEdge,
        address_mode_v: AddressMode::ClampToEdge,
        mag_filter: mode,
        min_filter: mode,
        ..Default::default()
    })
}

struct GpuTexture {
    texture: Texture,
    width: u32,
    height: u32,
    nearest: BindGroup,
    linear: BindGroup,
}

/// Live sprite textures keyed by the id handed to the scene.
pub struct TextureCache {
    layout: BindGroupLayout,
    nearest: Sampler,
    linear: Sampler,
    textures: HashMap<TextureId, GpuTexture>,
    next_id: u32,
}

impl TextureCache {
    pub fn new(device: &Device) -> Self {
        Self {
            layout: texture_bind_group_layout(device, "sprite_texture_bgl"),
            nearest: create_sampler(device, FilterMode::Nearest),
            linear: create_sampler(device, FilterMode::Linear),
            textures: HashMap::new(),
            next_id: 0,
        }
    }

    /// Layout the sprite pipeline binds textures with (group 1).
    pub fn layout(&self) -> &BindGroupLayout {
        &self.layout
    }

    pub fn bind_group(&self, id: TextureId, filter: FilterMode) -> Option<&BindGroup> {
        self.textures.get(&id).map(|t| match filter {
            FilterMode::Nearest => &t.nearest,
            FilterMode::Linear => &t.linear,
        })
    }

    pub fn size(&self, id: TextureId) -> Option<(u32, u32)> {
        self.textures.get(&id).map(|t| (t.width, t.height))
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    fn create(&self, device: &Device, width: u32, height: u32) -> GpuTexture {
        let texture = device.create_texture(&TextureDescriptor {
            label: Some("splat_sprite_texture"),
            size: Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format: SPRITE_TEXTURE_FORMAT,
            usage: TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let bind = |sampler: &Sampler| {
            device.create_bind_group(&BindGroupDescriptor {
                label: Some("splat_sprite_bg"),
                layout: &self.layout,
                entries: &[
                    BindGroupEntry {
                        binding: 0,
                        resource: BindingResource::TextureView(&view),
                    },
                    BindGroupEntry {
                        binding: 1,
                        resource: BindingResource::Sampler(sampler),
                    },
                ],
            })
        };
        let nearest = bind(&self.nearest);
        let linear = bind(&self.linear);

        GpuTexture {
            texture,
            width,
            height,
            nearest,
            linear,
        }
    }
}

fn write_pixels(queue: &Queue, texture: &Texture, width: u32, height: u32, rgba: &[u8]) {
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        rgba,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(width * 4), // RGBA = 4 bytes per pixel
            rows_per_image: Some(height),
        },
        Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
}

/// Uploads images into a [`TextureCache`] on a live device.
///
/// Obtained from [`Renderer::uploader`](crate::Renderer::uploader).
pub struct GpuUploader<'a> {
    device: &'a Device,
    queue: &'a Queue,
    cache: &'a mut TextureCache,
}

impl<'a> GpuUploader<'a> {
    pub fn new(device: &'a Device, queue: &'a Queue, cache: &'a mut TextureCache) -> Self {
        Self {
            device,
            queue,
            cache,
        }
    }

    fn check_extent(&self, op: &'static str, surface: &PixelSurface<'_>) -> Result<Vec<u8>, SplatError> {
        surface.validate(op)?;
        let max = self.device.limits().max_texture_dimension_2d;
        if surface.width > max || surface.height > max {
            return Err(SplatError::bad_parameter(
                op,
                format!(
                    "{}×{} exceeds the device texture limit of {max}",
                    surface.width, surface.height
                ),
            ));
        }
        surface.to_rgba8()
    }
}

impl TextureUploader for GpuUploader<'_> {
    fn upload(&mut self, surface: &PixelSurface<'_>) -> Result<TextureId, SplatError> {
        let rgba = self.check_extent("upload", surface)?;
        let gpu = self.cache.create(self.device, surface.width, surface.height);
        write_pixels(self.queue, &gpu.texture, surface.width, surface.height, &rgba);

        let id = TextureId(self.cache.next_id);
        self.cache.next_id = self.cache.next_id.wrapping_add(1);
        self.cache.textures.insert(id, gpu);
        debug!("uploaded {id:?} ({}×{})", surface.width, surface.height);
        Ok(id)
    }

    fn update(&mut self, texture: TextureId, surface: &PixelSurface<'_>) -> Result<(), SplatError> {
        let rgba = self.check_extent("update", surface)?;
        let same_size = match self.cache.textures.get(&texture) {
            Some(t) => t.width == surface.width && t.height == surface.height,
            None => return Err(SplatError::not_found("update", "texture")),
        };

        if !same_size {
            let gpu = self.cache.create(self.device, surface.width, surface.height);
            self.cache.textures.insert(texture, gpu);
            debug!("recreated {texture:?} at {}×{}", surface.width, surface.height);
        }
        if let Some(gpu) = self.cache.textures.get(&texture) {
            write_pixels(self.queue, &gpu.texture, surface.width, surface.height, &rgba);
        }
        Ok(())
    }

    fn release(&mut self, texture: TextureId) {
        if self.cache.textures.remove(&texture).is_some() {
            debug!("released {texture:?}");
        }
    }
}

// ===================================================================
// Tests
// ===================================================================
