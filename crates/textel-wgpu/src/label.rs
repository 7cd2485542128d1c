//! Label instances: per-call state, packed instance buffers, and the
//! update/draw orchestration.
//!
//! A label holds one or more strings that share a font, color, and
//! alignment. `update` is where all the work happens: option merging, font
//! and atlas resolution, layout, buffer upload, and atlas repacks. `draw`
//! only binds state and issues one instanced draw per string.

use textel::font::{FontId, FontSignature};
use textel::{
    align_offset, baseline_offset, layout, Align, AtlasKey, Baseline, Color, CoordinateOrigin,
    Direction, FontSpec, LabelOptions, Viewport,
};

use crate::instance::{LabelUniforms, StringUniforms, STRING_UNIFORM_STRIDE};
use crate::TextRenderer;

const INITIAL_CHAR_CAPACITY: usize = 64;
const INITIAL_STRING_CAPACITY: usize = 4;

/// One string's slice of the shared instance buffers.
#[derive(Clone, Copy, Debug)]
struct BatchItem {
    start: u32,
    count: u32,
}

/// A text label: one or more positioned strings drawn with a shared font
/// and style.
///
/// Owns its GPU instance buffers; call [`Label::destroy`] (or drop the
/// label) to release them.
pub struct Label {
    texts: Vec<String>,
    positions: Vec<[f32; 2]>,
    font_spec: FontSpec,
    font_id: Option<FontId>,
    atlas_key: Option<AtlasKey>,
    font_size: f32,
    color: Color,
    opacity: f32,
    align: Align,
    baseline: Baseline,
    direction: Direction,
    kerning: bool,
    scale: Option<[f32; 2]>,
    translate: Option<[f32; 2]>,
    viewport: Option<Viewport>,
    offset: [f32; 2],

    // Derived layout state, all in em units.
    text_widths: Vec<f32>,
    align_offsets: Vec<f32>,
    baseline_off: f32,
    batch: Vec<BatchItem>,
    count: u32,

    char_buffer: wgpu::Buffer,
    size_buffer: wgpu::Buffer,
    char_capacity: usize,
    label_uniforms: wgpu::Buffer,
    string_uniforms: wgpu::Buffer,
    string_capacity: usize,
    uniform_bind_group: wgpu::BindGroup,
    destroyed: bool,
}

impl Label {
    pub fn new(renderer: &TextRenderer, device: &wgpu::Device) -> Self {
        let (char_buffer, size_buffer) = create_instance_buffers(device, INITIAL_CHAR_CAPACITY);

        let label_uniforms = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Textel Label Uniforms"),
            size: std::mem::size_of::<LabelUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let string_uniforms = create_string_uniform_buffer(device, INITIAL_STRING_CAPACITY);
        let uniform_bind_group = create_uniform_bind_group(
            device,
            &renderer.uniform_layout,
            &label_uniforms,
            &string_uniforms,
        );

        let font_spec = FontSpec::default();
        let font_size = font_spec.size_px;

        Self {
            texts: Vec::new(),
            positions: vec![[0.0, 0.0]],
            font_spec,
            font_id: None,
            atlas_key: None,
            font_size,
            color: Color::BLACK,
            opacity: 1.0,
            align: Align::Start,
            baseline: Baseline::Alphabetic,
            direction: Direction::Ltr,
            kerning: true,
            scale: None,
            translate: None,
            viewport: None,
            offset: [0.0, 0.0],
            text_widths: Vec::new(),
            align_offsets: Vec::new(),
            baseline_off: 0.0,
            batch: Vec::new(),
            count: 0,
            char_buffer,
            size_buffer,
            char_capacity: INITIAL_CHAR_CAPACITY,
            label_uniforms,
            string_uniforms,
            string_capacity: INITIAL_STRING_CAPACITY,
            uniform_bind_group,
            destroyed: false,
        }
    }

    /// Merge `options` into the label state and recompute whatever they
    /// touched: layout when text/font/kerning changed, alignment offsets
    /// when only the alignment changed, uniforms always.
    ///
    /// Never fails; bad inputs degrade to defaults.
    pub fn update(
        &mut self,
        renderer: &mut TextRenderer,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        options: impl Into<LabelOptions>,
    ) {
        if self.destroyed {
            log::warn!("update on a destroyed label ignored");
            return;
        }
        let options = options.into();

        let mut needs_layout = false;
        let mut align_changed = false;
        let mut font_changed = false;
        let mut size_changed = false;

        if let Some(opacity) = options.opacity {
            self.opacity = opacity;
        }
        if let Some(color) = options.color {
            self.color = color;
        }

        if let Some(viewport) = options.viewport {
            // Stored bottom-left anchored; convert once here.
            self.viewport = Some(match renderer.origin {
                CoordinateOrigin::TopLeft => viewport.flip_y(renderer.target_size[1]),
                CoordinateOrigin::BottomLeft => viewport,
            });
        }

        if let Some(kerning) = options.kerning {
            if kerning != self.kerning {
                self.kerning = kerning;
                needs_layout = true;
            }
        }

        if let Some(mut offset) = options.offset {
            if renderer.origin == CoordinateOrigin::BottomLeft {
                offset[1] = -offset[1];
            }
            self.offset = offset;
        }

        if let Some(direction) = options.direction {
            self.direction = direction;
        }

        if let Some(positions) = options.positions {
            if !positions.is_empty() {
                self.positions = positions;
            }
        }

        if let Some(range) = options.range {
            self.scale = Some(range.scale());
            self.translate = Some(range.translate());
        }
        if let Some(scale) = options.scale {
            self.scale = Some(scale);
        }
        if let Some(translate) = options.translate {
            self.translate = Some(translate);
        }

        if let Some(font) = options.font {
            if FontSignature::new(&font) != FontSignature::new(&self.font_spec) {
                font_changed = true;
            }
            self.font_spec = font;
            // The size embedded in `font` applies unless `font_size` is
            // also supplied, which wins.
            if options.font_size.is_none() && self.font_spec.size_px != self.font_size {
                self.font_size = self.font_spec.size_px;
                size_changed = true;
            }
        }
        if let Some(size) = options.font_size {
            if size != self.font_size {
                self.font_size = size;
                size_changed = true;
            }
        }

        if font_changed || self.font_id.is_none() {
            self.font_id = Some(
                renderer
                    .registry
                    .resolve(&self.font_spec, renderer.rasterizer.as_mut()),
            );
            needs_layout = true;
        }
        let font_id = self.font_id.expect("font resolved above");

        if font_changed || size_changed || self.atlas_key.is_none() {
            self.atlas_key = Some(AtlasKey::new(
                FontSignature::new(&self.font_spec),
                self.font_size,
            ));
            // A fresh atlas has no slots yet; re-run layout to assign them.
            needs_layout = true;
        }
        // Resolve the atlas every update: this recreates entries the LRU
        // evicted while this label still referenced them.
        {
            let key = self.atlas_key.clone().expect("atlas key set above");
            let metrics = *renderer.registry.entry(font_id).metrics();
            renderer.ensure_atlas(device, &key, &metrics);
        }

        if let Some(texts) = options.texts {
            self.texts = texts;
            needs_layout = true;
        }

        if let Some(align) = options.align {
            if align != self.align {
                self.align = align;
                align_changed = true;
            }
        }
        if let Some(baseline) = options.baseline {
            self.baseline = baseline;
        }

        if needs_layout {
            self.relayout(renderer, device, queue, font_id);
            align_changed = true;
        }

        if align_changed {
            self.align_offsets = self
                .text_widths
                .iter()
                .map(|&width| align_offset(self.align, width))
                .collect();
        }

        self.baseline_off = baseline_offset(
            self.baseline,
            renderer.registry.entry(font_id).metrics(),
            renderer.origin,
        );

        if let Some(key) = self.atlas_key.clone() {
            renderer.repack_atlas(device, queue, &key);
        }

        self.write_uniforms(renderer, queue);
    }

    /// Re-run layout for every string and upload the packed buffers.
    fn relayout(
        &mut self,
        renderer: &mut TextRenderer,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        font_id: FontId,
    ) {
        let key = self.atlas_key.clone().expect("atlas resolved before layout");
        let Some(entry) = renderer.atlases.get_mut(&key) else {
            return;
        };

        let mut char_ids: Vec<u32> = Vec::new();
        let mut size_data: Vec<f32> = Vec::new();
        let mut batch = Vec::with_capacity(self.texts.len());
        let mut widths = Vec::with_capacity(self.texts.len());

        for text in &self.texts {
            let run = layout(
                text,
                &mut renderer.registry,
                font_id,
                &mut entry.atlas,
                self.kerning,
                renderer.rasterizer.as_mut(),
            );
            batch.push(BatchItem {
                start: char_ids.len() as u32,
                count: run.len() as u32,
            });
            widths.push(run.width);
            char_ids.extend_from_slice(&run.char_ids);
            size_data.extend_from_slice(&run.size_data);
        }

        self.count = char_ids.len() as u32;
        self.batch = batch;
        self.text_widths = widths;

        if char_ids.len() > self.char_capacity {
            self.char_capacity = (char_ids.len() * 2).next_power_of_two();
            self.char_buffer.destroy();
            self.size_buffer.destroy();
            let (char_buffer, size_buffer) = create_instance_buffers(device, self.char_capacity);
            self.char_buffer = char_buffer;
            self.size_buffer = size_buffer;
        }
        if !char_ids.is_empty() {
            queue.write_buffer(&self.char_buffer, 0, bytemuck::cast_slice(&char_ids));
            queue.write_buffer(&self.size_buffer, 0, bytemuck::cast_slice(&size_data));
        }

        if self.batch.len() > self.string_capacity {
            self.string_capacity = (self.batch.len() * 2).next_power_of_two();
            self.string_uniforms.destroy();
            self.string_uniforms = create_string_uniform_buffer(device, self.string_capacity);
            self.uniform_bind_group = create_uniform_bind_group(
                device,
                &renderer.uniform_layout,
                &self.label_uniforms,
                &self.string_uniforms,
            );
        }
    }

    fn write_uniforms(&self, renderer: &TextRenderer, queue: &wgpu::Queue) {
        let viewport = self.viewport.unwrap_or(Viewport::new(
            0.0,
            0.0,
            renderer.target_size[0],
            renderer.target_size[1],
        ));
        let scale = self
            .scale
            .unwrap_or([1.0 / viewport.width, 1.0 / viewport.height]);
        let translate = self.translate.unwrap_or([0.0, 0.0]);

        let uniforms = LabelUniforms {
            viewport: viewport.to_array(),
            color: self.color.with_opacity(self.opacity).to_array(),
            scale,
            translate,
            offset: self.offset,
            target_size: renderer.target_size,
            em: self.font_size,
            baseline_offset: self.baseline_off,
            y_flip: if renderer.origin.y_down() { 1.0 } else { 0.0 },
            _pad: 0.0,
        };
        queue.write_buffer(&self.label_uniforms, 0, bytemuck::bytes_of(&uniforms));

        for (i, _) in self.batch.iter().enumerate() {
            let position = self
                .positions
                .get(i)
                .or(self.positions.last())
                .copied()
                .unwrap_or([0.0, 0.0]);
            let string = StringUniforms {
                position,
                align_offset: self.align_offsets.get(i).copied().unwrap_or(0.0),
                _pad: 0.0,
            };
            queue.write_buffer(
                &self.string_uniforms,
                i as u64 * STRING_UNIFORM_STRIDE,
                bytemuck::bytes_of(&string),
            );
        }
    }

    /// Record draw calls for every non-empty string in the batch.
    ///
    /// A label whose atlas was evicted since its last update draws nothing;
    /// the next [`Label::update`] re-resolves the atlas.
    pub fn draw(&self, renderer: &TextRenderer, pass: &mut wgpu::RenderPass<'_>) {
        if self.destroyed || self.count == 0 {
            return;
        }
        let Some(key) = &self.atlas_key else {
            return;
        };
        let Some(entry) = renderer.atlases.peek(key) else {
            log::warn!("glyph atlas was evicted; update the label before drawing");
            return;
        };
        if entry.atlas.is_empty() {
            return;
        }

        pass.set_pipeline(&renderer.pipeline);
        pass.set_bind_group(1, &entry.bind_group, &[]);
        pass.set_vertex_buffer(0, self.char_buffer.slice(..));
        pass.set_vertex_buffer(1, self.size_buffer.slice(..));

        for (i, item) in self.batch.iter().enumerate() {
            if item.count == 0 {
                continue;
            }
            let offset = (i as u64 * STRING_UNIFORM_STRIDE) as u32;
            pass.set_bind_group(0, &self.uniform_bind_group, &[offset]);
            pass.draw(0..4, item.start..item.start + item.count);
        }
    }

    /// Total advance width of string `i` in em units; multiply by the font
    /// size for pixels.
    pub fn text_width(&self, i: usize) -> Option<f32> {
        self.text_widths.get(i).copied()
    }

    pub fn font_size(&self) -> f32 {
        self.font_size
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Release the GPU buffers owned by this label. Safe to call more than
    /// once; the label ignores updates afterwards.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.char_buffer.destroy();
        self.size_buffer.destroy();
        self.label_uniforms.destroy();
        self.string_uniforms.destroy();
    }
}

impl Drop for Label {
    fn drop(&mut self) {
        self.destroy();
    }
}

fn create_instance_buffers(device: &wgpu::Device, chars: usize) -> (wgpu::Buffer, wgpu::Buffer) {
    let char_buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Textel Char Buffer"),
        size: (chars * std::mem::size_of::<u32>()) as u64,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let size_buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Textel Size Buffer"),
        size: (chars * std::mem::size_of::<f32>() * 2) as u64,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    (char_buffer, size_buffer)
}

fn create_string_uniform_buffer(device: &wgpu::Device, strings: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Textel String Uniforms"),
        size: strings as u64 * STRING_UNIFORM_STRIDE,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn create_uniform_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    label_uniforms: &wgpu::Buffer,
    string_uniforms: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Textel Uniform Bind Group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: label_uniforms.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: string_uniforms,
                    offset: 0,
                    size: wgpu::BufferSize::new(std::mem::size_of::<StringUniforms>() as u64),
                }),
            },
        ],
    })
}
