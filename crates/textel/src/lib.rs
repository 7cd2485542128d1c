//! Backend-agnostic glyph-atlas construction and text layout for `textel`.
//!
//! # Design goals
//! - **Backend-agnostic**: no `wgpu`, no renderer-specific types.
//! - **Cache-friendly**: font measurements and atlas slots are computed once
//!   and shared by every label that uses the same font.
//! - **Cheap per-frame**: layout produces compact per-character buffers in em
//!   units, so a font-size change never forces a re-layout.
//!
//! # Structure
//! - [`font`]: font signatures, metrics, and the width/kerning registry
//! - [`atlas`]: the glyph atlas grid model (slots, packing geometry)
//! - [`cache`]: the LRU cache bounding the number of live atlases
//! - [`layout`]: the per-character layout pass and align/baseline offsets
//! - [`options`]: update-boundary option normalization (aliases, colors,
//!   ranges, viewports)
//! - [`raster`]: the [`raster::GlyphRasterizer`] trait every measurement and
//!   rasterization backend implements
//!
//! The `cosmic` feature provides a rasterizer implementation backed by
//! `cosmic-text`. Renderer backends (see the `textel-wgpu` crate) own the
//! registry, the atlas cache, and the GPU resources; this crate never touches
//! the GPU.

pub mod atlas;
pub mod cache;
pub mod font;
pub mod layout;
pub mod options;
pub mod raster;

#[cfg(feature = "cosmic")]
pub mod cosmic;

pub use atlas::{AtlasKey, GlyphAtlas, MAX_ATLAS_SIZE};
pub use cache::LruCache;
pub use font::{
    FontId, FontMetrics, FontRegistry, FontSignature, FontSpec, FontStretch, FontStyle,
    FontVariant, BASE_FONT_SIZE,
};
pub use layout::{
    align_offset, baseline_offset, layout, Align, Baseline, CoordinateOrigin, TextRun,
};
pub use options::{Color, DataRange, Direction, LabelOptions, Viewport};
pub use raster::{GlyphBitmap, GlyphRasterizer, RasterError};

#[cfg(feature = "cosmic")]
pub use cosmic::CosmicRasterizer;
