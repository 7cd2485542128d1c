//! `cosmic-text` implementation of the rasterizer boundary.
//!
//! Widths come from shaping a one-character line; kerning is detected by
//! measuring a pair against the sum of its halves; vertical metrics are
//! probed from rasterized reference glyphs. Atlas grids are filled by
//! blitting each glyph's coverage mask centered into its cell.
//!
//! This is intentionally conservative: single-line shaping only, coverage
//! masks only (no color glyphs), and the first family of the preference
//! list wins (cosmic-text's own fallback handles the rest).

use std::collections::HashMap;

use cosmic_text::{
    Attrs, Buffer, Family, FontSystem, Metrics, Shaping, Stretch, Style, SwashCache, SwashContent,
    Weight,
};

use crate::font::{FontMetrics, FontSignature, FontStretch, FontStyle, BASE_FONT_SIZE};
use crate::raster::{GlyphBitmap, GlyphRasterizer, RasterError};

/// Line-box factor used for shaping buffers and metric probes.
const LINE_HEIGHT_FACTOR: f32 = 1.2;

// Ignore differential-measurement noise below this, in px at the
// reference size.
const KERN_EPSILON_PX: f32 = 0.01;

/// Rasterizer backed by `cosmic-text` and its swash cache.
pub struct CosmicRasterizer {
    font_system: FontSystem,
    swash_cache: SwashCache,
}

impl CosmicRasterizer {
    /// Create a rasterizer over the system font database.
    pub fn new() -> Self {
        Self {
            font_system: FontSystem::new(),
            swash_cache: SwashCache::new(),
        }
    }

    /// Register additional font bytes (e.g. bundled fonts).
    pub fn load_font_data(&mut self, data: Vec<u8>) {
        self.font_system.db_mut().load_font_data(data);
    }

    /// Access the underlying `FontSystem` for further customization.
    pub fn font_system_mut(&mut self) -> &mut FontSystem {
        &mut self.font_system
    }

    fn shape(&mut self, signature: &FontSignature, text: &str, size_px: f32) -> Buffer {
        let metrics = Metrics::new(size_px, size_px * LINE_HEIGHT_FACTOR);
        let mut buffer = Buffer::new(&mut self.font_system, metrics);
        buffer.set_size(
            &mut self.font_system,
            Some(f32::MAX),
            Some(metrics.line_height),
        );
        let attrs = attrs_for(signature);
        buffer.set_text(&mut self.font_system, text, &attrs, Shaping::Advanced, None);
        buffer.shape_until_scroll(&mut self.font_system, false);
        buffer
    }

    /// Shaped line width in px, `None` when nothing could be shaped.
    fn line_width(&mut self, signature: &FontSignature, text: &str, size_px: f32) -> Option<f32> {
        let buffer = self.shape(signature, text, size_px);
        let run = buffer.layout_runs().next()?;
        Some(run.line_w)
    }
}

impl Default for CosmicRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

fn attrs_for(signature: &FontSignature) -> Attrs<'_> {
    let family = signature
        .family_list()
        .first()
        .map(String::as_str)
        .unwrap_or("sans-serif");

    let family = match family {
        "sans-serif" => Family::SansSerif,
        "serif" => Family::Serif,
        "monospace" => Family::Monospace,
        "cursive" => Family::Cursive,
        "fantasy" => Family::Fantasy,
        name => Family::Name(name),
    };

    let style = match signature.style() {
        FontStyle::Normal => Style::Normal,
        FontStyle::Italic => Style::Italic,
        FontStyle::Oblique => Style::Oblique,
    };

    let stretch = match signature.stretch() {
        FontStretch::UltraCondensed => Stretch::UltraCondensed,
        FontStretch::ExtraCondensed => Stretch::ExtraCondensed,
        FontStretch::Condensed => Stretch::Condensed,
        FontStretch::SemiCondensed => Stretch::SemiCondensed,
        FontStretch::Normal => Stretch::Normal,
        FontStretch::SemiExpanded => Stretch::SemiExpanded,
        FontStretch::Expanded => Stretch::Expanded,
        FontStretch::ExtraExpanded => Stretch::ExtraExpanded,
        FontStretch::UltraExpanded => Stretch::UltraExpanded,
    };

    Attrs::new()
        .family(family)
        .weight(Weight(signature.weight()))
        .style(style)
        .stretch(stretch)
}

impl GlyphRasterizer for CosmicRasterizer {
    fn measure(&mut self, signature: &FontSignature, ch: char) -> Result<f32, RasterError> {
        let mut buf = [0u8; 4];
        let text = ch.encode_utf8(&mut buf);
        self.line_width(signature, text, BASE_FONT_SIZE)
            .ok_or(RasterError::MissingGlyph { ch })
    }

    fn kern(
        &mut self,
        signature: &FontSignature,
        pairs: &[(char, char)],
    ) -> HashMap<(char, char), f32> {
        let mut singles: HashMap<char, f32> = HashMap::new();
        let mut out = HashMap::new();

        for &(a, b) in pairs {
            if !singles.contains_key(&a) {
                let mut buf = [0u8; 4];
                let width = self
                    .line_width(signature, a.encode_utf8(&mut buf), BASE_FONT_SIZE)
                    .unwrap_or(0.0);
                singles.insert(a, width);
            }
            if !singles.contains_key(&b) {
                let mut buf = [0u8; 4];
                let width = self
                    .line_width(signature, b.encode_utf8(&mut buf), BASE_FONT_SIZE)
                    .unwrap_or(0.0);
                singles.insert(b, width);
            }

            let pair_width = self
                .line_width(signature, &format!("{a}{b}"), BASE_FONT_SIZE)
                .unwrap_or(0.0);
            let adjust = pair_width - (singles[&a] + singles[&b]);
            if adjust.abs() > KERN_EPSILON_PX {
                out.insert((a, b), adjust / BASE_FONT_SIZE * 1000.0);
            }
        }

        out
    }

    fn metrics(&mut self, signature: &FontSignature) -> Result<FontMetrics, RasterError> {
        // Probe glyphs: 'H' for the cap line, 'x' for the x-height, 'g' for
        // the descender.
        let buffer = self.shape(signature, "Hxg", BASE_FONT_SIZE);
        let Some(run) = buffer.layout_runs().next() else {
            return Err(RasterError::NoFace {
                family: signature.family_list().join(", "),
            });
        };

        let baseline_px = (run.line_y - run.line_top).max(0.0);
        let bottom_px = run.line_height;

        // Proportional fallbacks, overridden by what the probes actually
        // rasterize to.
        let mut cap_px = baseline_px * 0.72;
        let mut x_height_px = baseline_px * 0.52;
        let mut descender_px = bottom_px - baseline_px;

        let text = "Hxg";
        for glyph in run.glyphs.iter() {
            let physical = glyph.physical((0.0, 0.0), 1.0);
            let Some(image) = self
                .swash_cache
                .get_image(&mut self.font_system, physical.cache_key)
                .clone()
            else {
                continue;
            };
            let top = image.placement.top as f32;
            let below = image.placement.height as f32 - image.placement.top as f32;
            match &text[glyph.start..glyph.end] {
                "H" => cap_px = top,
                "x" => x_height_px = top,
                "g" => descender_px = below,
                _ => {}
            }
        }

        let em = BASE_FONT_SIZE;
        let baseline = baseline_px / em;
        Ok(FontMetrics {
            top: 0.0,
            ascent: (baseline_px - cap_px).max(0.0) / em,
            median: (baseline_px - x_height_px * 0.5) / em,
            baseline,
            descent: (baseline_px + descender_px) / em,
            bottom: bottom_px / em,
        })
    }

    fn rasterize(
        &mut self,
        signature: &FontSignature,
        size_px: u32,
        chars: &[char],
        cols: u32,
        step: u32,
    ) -> Result<GlyphBitmap, RasterError> {
        let cols = cols.max(1);
        let rows = (chars.len() as u32).div_ceil(cols);
        let mut bitmap = GlyphBitmap::blank(cols * step, rows * step);
        if chars.is_empty() {
            return Ok(bitmap);
        }

        let metrics = GlyphRasterizer::metrics(self, signature)?;
        let size = size_px as f32;
        let half_step = step as f32 * 0.5;

        for (i, &ch) in chars.iter().enumerate() {
            let mut buf = [0u8; 4];
            let text = ch.encode_utf8(&mut buf);
            let buffer = self.shape(signature, text, size);
            let Some(run) = buffer.layout_runs().next() else {
                continue;
            };

            let col = i as u32 % cols;
            let row = i as u32 / cols;

            // Em box centered vertically in the cell, advance centered
            // horizontally: the draw samples whole cells around character
            // centers.
            let pen_x = (col * step) as f32 + half_step - run.line_w * 0.5;
            let box_top = (row * step) as f32 + half_step - metrics.bottom * size * 0.5;
            let baseline_y = box_top + metrics.baseline * size;

            for glyph in run.glyphs.iter() {
                let physical = glyph.physical((0.0, 0.0), 1.0);
                let Some(image) = self
                    .swash_cache
                    .get_image(&mut self.font_system, physical.cache_key)
                    .clone()
                else {
                    continue;
                };
                if image.content != SwashContent::Mask {
                    continue;
                }

                let width = image.placement.width as usize;
                if width == 0 {
                    continue;
                }
                let origin_x =
                    (pen_x + physical.x as f32).round() as i64 + image.placement.left as i64;
                let origin_y =
                    (baseline_y + physical.y as f32).round() as i64 - image.placement.top as i64;

                for (row_idx, row_pixels) in image.data.chunks_exact(width).enumerate() {
                    let y = origin_y + row_idx as i64;
                    if y < 0 || y >= bitmap.height as i64 {
                        continue;
                    }
                    for (col_idx, &coverage) in row_pixels.iter().enumerate() {
                        if coverage == 0 {
                            continue;
                        }
                        let x = origin_x + col_idx as i64;
                        if x < 0 || x >= bitmap.width as i64 {
                            continue;
                        }
                        let dst =
                            &mut bitmap.pixels[(y as u32 * bitmap.width + x as u32) as usize];
                        *dst = (*dst).max(coverage);
                    }
                }
            }
        }

        Ok(bitmap)
    }
}
