//! The measurement/rasterization boundary.
//!
//! Everything the core needs from a font stack goes through
//! [`GlyphRasterizer`]: advance measurement, kerning detection, vertical
//! metrics, and rendering a character list into an atlas grid bitmap. The
//! `cosmic` feature ships an implementation backed by `cosmic-text`;
//! renderer backends may bring their own.

use std::collections::HashMap;

use crate::font::{FontMetrics, FontSignature};

/// Errors surfaced by a rasterizer implementation.
///
/// These stop at the registry/atlas boundary: callers degrade (default
/// metrics, zero widths, blank cells) instead of propagating them out of an
/// update.
#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    #[error("no font face matches `{family}`")]
    NoFace { family: String },
    #[error("no glyph for {ch:?}")]
    MissingGlyph { ch: char },
}

/// A single-channel coverage bitmap holding a grid of glyph cells.
///
/// Cell `i` occupies the square at `(i % cols, i / cols) * step`; the glyph
/// is centered in its cell. Rows are tightly packed, `len == width * height`.
#[derive(Clone, Debug, PartialEq)]
pub struct GlyphBitmap {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl GlyphBitmap {
    /// An all-transparent bitmap of the given dimensions.
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; (width * height) as usize],
        }
    }
}

/// Measurement and rasterization services backing the font registry and the
/// glyph atlas.
pub trait GlyphRasterizer {
    /// Advance width of `ch` in pixels at [`crate::font::BASE_FONT_SIZE`].
    fn measure(&mut self, signature: &FontSignature, ch: char) -> Result<f32, RasterError>;

    /// Kerning adjustments for the given ordered pairs, in per-mille of em.
    /// Pairs with no adjustment may be omitted from the result.
    fn kern(
        &mut self,
        signature: &FontSignature,
        pairs: &[(char, char)],
    ) -> HashMap<(char, char), f32>;

    /// Vertical metrics of the face, in em units measured downward from the
    /// line top.
    fn metrics(&mut self, signature: &FontSignature) -> Result<FontMetrics, RasterError>;

    /// Render `chars` at `size_px` into a `cols`-wide grid of `step`-sized
    /// cells, each glyph centered in its cell. The bitmap dimensions are
    /// `cols * step` by `ceil(len / cols) * step`. Characters without a
    /// glyph produce blank cells.
    fn rasterize(
        &mut self,
        signature: &FontSignature,
        size_px: u32,
        chars: &[char],
        cols: u32,
        step: u32,
    ) -> Result<GlyphBitmap, RasterError>;
}

#[cfg(test)]
pub(crate) mod testing {
    //! Table-driven rasterizer used by the core tests.

    use super::*;
    use crate::font::BASE_FONT_SIZE;

    /// Rasterizer with fixed em-relative widths and explicit kerning pairs.
    /// Counts measurement calls so tests can assert cache behavior.
    #[derive(Debug, Default)]
    pub(crate) struct TableRasterizer {
        widths: HashMap<char, f32>,
        kerning: HashMap<(char, char), f32>,
        metrics: Option<FontMetrics>,
        measure_calls: usize,
        kern_pairs_queried: Vec<(char, char)>,
    }

    impl TableRasterizer {
        /// Width for `ch` in em units at any size.
        pub(crate) fn with_width(mut self, ch: char, em: f32) -> Self {
            self.widths.insert(ch, em);
            self
        }

        /// Kerning for the ordered pair in per-mille of em.
        pub(crate) fn with_kern(mut self, prev: char, next: char, per_mille: f32) -> Self {
            self.kerning.insert((prev, next), per_mille);
            self
        }

        pub(crate) fn with_metrics(mut self, metrics: FontMetrics) -> Self {
            self.metrics = Some(metrics);
            self
        }

        pub(crate) fn measure_calls(&self) -> usize {
            self.measure_calls
        }

        pub(crate) fn kern_pairs_queried(&self) -> &[(char, char)] {
            &self.kern_pairs_queried
        }
    }

    impl GlyphRasterizer for TableRasterizer {
        fn measure(&mut self, _signature: &FontSignature, ch: char) -> Result<f32, RasterError> {
            self.measure_calls += 1;
            match self.widths.get(&ch) {
                Some(&em) => Ok(em * BASE_FONT_SIZE),
                None => Err(RasterError::MissingGlyph { ch }),
            }
        }

        fn kern(
            &mut self,
            _signature: &FontSignature,
            pairs: &[(char, char)],
        ) -> HashMap<(char, char), f32> {
            self.kern_pairs_queried.extend_from_slice(pairs);
            pairs
                .iter()
                .filter_map(|pair| self.kerning.get(pair).map(|&k| (*pair, k)))
                .collect()
        }

        fn metrics(&mut self, _signature: &FontSignature) -> Result<FontMetrics, RasterError> {
            Ok(self.metrics.unwrap_or_default())
        }

        fn rasterize(
            &mut self,
            _signature: &FontSignature,
            _size_px: u32,
            chars: &[char],
            cols: u32,
            step: u32,
        ) -> Result<GlyphBitmap, RasterError> {
            let rows = (chars.len() as u32).div_ceil(cols.max(1));
            Ok(GlyphBitmap::blank(cols * step, rows * step))
        }
    }
}
