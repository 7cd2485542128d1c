//! GPU-facing data layouts: per-character instance attributes and the
//! uniform blocks consumed by `shaders/text.wgsl`.
//!
//! Each character is one instance, fed from two instance-stepped vertex
//! buffers: atlas slot ids in one, interleaved (width, center offset) pairs
//! in em units in the other. Keeping them separate lets a re-layout touch
//! only the buffer that changed.

use bytemuck::{Pod, Zeroable};

/// Vertex buffer layout for the per-character atlas slot buffer
/// (`u32` per instance, shader location 0).
pub const fn char_buffer_layout() -> wgpu::VertexBufferLayout<'static> {
    const ATTRIBUTES: &[wgpu::VertexAttribute] = &[wgpu::VertexAttribute {
        offset: 0,
        shader_location: 0,
        format: wgpu::VertexFormat::Uint32,
    }];

    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<u32>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: ATTRIBUTES,
    }
}

/// Vertex buffer layout for the per-character size buffer: interleaved
/// `(advance width, center offset)` in em units (shader location 1).
pub const fn size_buffer_layout() -> wgpu::VertexBufferLayout<'static> {
    const ATTRIBUTES: &[wgpu::VertexAttribute] = &[wgpu::VertexAttribute {
        offset: 0,
        shader_location: 1,
        format: wgpu::VertexFormat::Float32x2,
    }];

    wgpu::VertexBufferLayout {
        array_stride: (std::mem::size_of::<f32>() * 2) as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: ATTRIBUTES,
    }
}

/// Per-label uniform block, shared by every string in the label's batch.
///
/// Field order matches the WGSL struct; `viewport` is in pixels with a
/// bottom-left origin (converted at update time when the renderer uses a
/// top-left convention).
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct LabelUniforms {
    /// Viewport rectangle in px: x, y, width, height.
    pub viewport: [f32; 4],
    /// RGBA color with opacity folded into alpha.
    pub color: [f32; 4],
    pub scale: [f32; 2],
    pub translate: [f32; 2],
    /// Extra pixel offset applied after alignment, sign-adjusted for the
    /// coordinate origin.
    pub offset: [f32; 2],
    /// Render target size in px.
    pub target_size: [f32; 2],
    /// Target font size in px; scales the em-unit instance data.
    pub em: f32,
    /// Baseline offset in em units, sign already resolved.
    pub baseline_offset: f32,
    /// 1.0 flips Y for top-left-origin coordinates, 0.0 leaves it.
    pub y_flip: f32,
    pub _pad: f32,
}

/// Per-atlas uniform block, bound alongside the atlas texture and rewritten
/// on every repack. Labels sharing an atlas always see its current grid
/// geometry, even when another label grew it.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct AtlasUniforms {
    /// Grid dimensions: columns, rows.
    pub dim: [f32; 2],
    /// Texture size in px.
    pub size: [f32; 2],
    /// Cell size in px.
    pub step: f32,
    pub _pad: [f32; 3],
}

/// Per-string uniform slice, bound with a dynamic offset.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct StringUniforms {
    pub position: [f32; 2],
    /// Alignment offset in em units for this string.
    pub align_offset: f32,
    pub _pad: f32,
}

/// Dynamic-offset stride for [`StringUniforms`] slices.
///
/// 256 is the largest `min_uniform_buffer_offset_alignment` WebGPU allows,
/// so a fixed stride is valid on every adapter.
pub const STRING_UNIFORM_STRIDE: u64 = 256;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_blocks_match_wgsl_layout() {
        // Must stay in sync with the structs in text.wgsl.
        assert_eq!(std::mem::size_of::<LabelUniforms>(), 80);
        assert_eq!(std::mem::size_of::<AtlasUniforms>(), 32);
        assert_eq!(std::mem::size_of::<StringUniforms>(), 16);
    }

    #[test]
    fn instance_strides() {
        assert_eq!(char_buffer_layout().array_stride, 4);
        assert_eq!(size_buffer_layout().array_stride, 8);
    }
}
