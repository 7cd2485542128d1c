//! # textel-wgpu
//!
//! WGPU rendering backend for `textel` labels.
//!
//! The [`TextRenderer`] is the shared context: it owns the pipeline, the
//! font registry, the rasterizer, and the LRU-bounded atlas cache (with its
//! GPU textures). [`Label`] instances hold per-call state and their own
//! instance buffers; `update` runs layout and atlas growth, `draw` issues
//! one instanced draw per batched string.

mod instance;
mod label;

pub use instance::{
    char_buffer_layout, size_buffer_layout, AtlasUniforms, LabelUniforms, StringUniforms,
    STRING_UNIFORM_STRIDE,
};
pub use label::Label;

// Re-export the core types appearing in this crate's public API.
pub use textel::{
    Align, AtlasKey, Baseline, Color, CoordinateOrigin, DataRange, FontSpec, GlyphRasterizer,
    LabelOptions, Viewport,
};

use textel::font::FontMetrics;
use textel::{FontRegistry, GlyphAtlas, LruCache};

/// Construction-time renderer configuration.
#[derive(Clone, Copy, Debug)]
pub struct RendererConfig {
    /// Vertical convention of positions, viewports, and offsets.
    pub origin: CoordinateOrigin,
    /// Maximum number of live glyph atlases (distinct font/size pairs).
    pub atlas_capacity: usize,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            origin: CoordinateOrigin::BottomLeft,
            atlas_capacity: 64,
        }
    }
}

/// One cached atlas: the grid model plus its GPU texture, geometry
/// uniforms, and bind group.
pub(crate) struct AtlasEntry {
    pub(crate) atlas: GlyphAtlas,
    pub(crate) texture: wgpu::Texture,
    pub(crate) uniforms: wgpu::Buffer,
    pub(crate) bind_group: wgpu::BindGroup,
}

/// Shared text rendering context for one device.
pub struct TextRenderer {
    pub(crate) pipeline: wgpu::RenderPipeline,
    pub(crate) uniform_layout: wgpu::BindGroupLayout,
    pub(crate) atlas_layout: wgpu::BindGroupLayout,
    pub(crate) sampler: wgpu::Sampler,
    pub(crate) origin: CoordinateOrigin,
    pub(crate) target_size: [f32; 2],
    pub(crate) registry: FontRegistry,
    pub(crate) rasterizer: Box<dyn GlyphRasterizer>,
    pub(crate) atlases: LruCache<AtlasKey, AtlasEntry>,
}

impl TextRenderer {
    /// Create a renderer with the default configuration (bottom-left
    /// origin, 64 cached atlases).
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        rasterizer: Box<dyn GlyphRasterizer>,
    ) -> Self {
        Self::with_config(device, surface_format, rasterizer, RendererConfig::default())
    }

    pub fn with_config(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        rasterizer: Box<dyn GlyphRasterizer>,
        config: RendererConfig,
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Textel Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/text.wgsl").into()),
        });

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Textel Uniform Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                // Per-string slice, selected with a dynamic offset.
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: true,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let atlas_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Textel Atlas Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                // Grid geometry, rewritten on every repack.
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Textel Atlas Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            // Cells are sampled at their native size; nearest keeps edges
            // crisp and avoids bleeding between neighboring cells.
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Textel Pipeline Layout"),
            bind_group_layouts: &[&uniform_layout, &atlas_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Textel Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[char_buffer_layout(), size_buffer_layout()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState {
                        color: wgpu::BlendComponent {
                            src_factor: wgpu::BlendFactor::SrcAlpha,
                            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
                            operation: wgpu::BlendOperation::Add,
                        },
                        alpha: wgpu::BlendComponent {
                            src_factor: wgpu::BlendFactor::OneMinusDstAlpha,
                            dst_factor: wgpu::BlendFactor::One,
                            operation: wgpu::BlendOperation::Add,
                        },
                    }),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Self {
            pipeline,
            uniform_layout,
            atlas_layout,
            sampler,
            origin: config.origin,
            target_size: [1.0, 1.0],
            registry: FontRegistry::new(),
            rasterizer,
            atlases: LruCache::new(config.atlas_capacity),
        }
    }

    /// Record the render target size; labels use it for default viewports
    /// and clip-space conversion. Call on surface resize.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.target_size = [width.max(1) as f32, height.max(1) as f32];
    }

    pub fn origin(&self) -> CoordinateOrigin {
        self.origin
    }

    /// Number of live atlases.
    pub fn atlas_count(&self) -> usize {
        self.atlases.len()
    }

    pub fn registry(&self) -> &FontRegistry {
        &self.registry
    }

    /// Make sure an atlas entry exists for `key`, evicting the
    /// least-recently-used one when the cache is full. Eviction destroys
    /// the evicted texture before the entry is dropped.
    pub(crate) fn ensure_atlas(
        &mut self,
        device: &wgpu::Device,
        key: &AtlasKey,
        metrics: &FontMetrics,
    ) {
        if self.atlases.get_mut(key).is_some() {
            return;
        }

        let atlas = GlyphAtlas::new(key.size_px, metrics);
        let uniforms = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Textel Atlas Uniforms"),
            size: std::mem::size_of::<AtlasUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let (texture, bind_group) =
            create_atlas_texture(device, &self.atlas_layout, &self.sampler, &uniforms, 1, 1);

        if let Some((old_key, old)) = self.atlases.insert(
            key.clone(),
            AtlasEntry {
                atlas,
                texture,
                uniforms,
                bind_group,
            },
        ) {
            log::debug!(
                "evicting glyph atlas {:?} at {}px",
                old_key.signature.family_list(),
                old_key.size_px
            );
            old.texture.destroy();
            old.uniforms.destroy();
        }
    }

    /// Re-rasterize and upload the atlas for `key` if characters were added
    /// since the last upload. The full character list is rendered into one
    /// bitmap that replaces the texture contents.
    pub(crate) fn repack_atlas(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        key: &AtlasKey,
    ) {
        let Some(entry) = self.atlases.get_mut(key) else {
            return;
        };
        if !entry.atlas.needs_repack() {
            return;
        }

        let (width, height) = entry.atlas.repack();
        entry.atlas.mark_packed();
        if width == 0 || height == 0 {
            return;
        }

        // Degrade to blank cells rather than leaving the texture out of
        // sync with the recomputed grid geometry.
        let bitmap = match self.rasterizer.rasterize(
            &key.signature,
            key.size_px,
            entry.atlas.chars(),
            entry.atlas.cols(),
            entry.atlas.step(),
        ) {
            Ok(bitmap) => bitmap,
            Err(err) => {
                log::warn!("atlas rasterization failed: {err}");
                textel::GlyphBitmap::blank(width, height)
            }
        };

        if entry.texture.width() != width || entry.texture.height() != height {
            entry.texture.destroy();
            let (texture, bind_group) = create_atlas_texture(
                device,
                &self.atlas_layout,
                &self.sampler,
                &entry.uniforms,
                width,
                height,
            );
            entry.texture = texture;
            entry.bind_group = bind_group;
        }

        queue.write_buffer(
            &entry.uniforms,
            0,
            bytemuck::bytes_of(&AtlasUniforms {
                dim: [entry.atlas.cols() as f32, entry.atlas.rows() as f32],
                size: [width as f32, height as f32],
                step: entry.atlas.step() as f32,
                _pad: [0.0; 3],
            }),
        );

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &entry.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &bitmap.pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(bitmap.width),
                rows_per_image: Some(bitmap.height),
            },
            wgpu::Extent3d {
                width: bitmap.width,
                height: bitmap.height,
                depth_or_array_layers: 1,
            },
        );
    }
}

fn create_atlas_texture(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    uniforms: &wgpu::Buffer,
    width: u32,
    height: u32,
) -> (wgpu::Texture, wgpu::BindGroup) {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Textel Glyph Atlas"),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::R8Unorm,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Textel Atlas Bind Group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: uniforms.as_entire_binding(),
            },
        ],
    });

    (texture, bind_group)
}
