//! The per-character layout pass and anchor-offset helpers.
//!
//! Layout works entirely in em units: advance widths come from the font
//! registry em-normalized, offsets accumulate in em, and kerning adjustments
//! (stored in per-mille of em) contribute `value * 1e-3`. Scaling by the
//! target font size happens where the buffers are consumed, so a size change
//! never forces a re-layout and kerning is always scaled by the size
//! actually drawn.

use crate::atlas::GlyphAtlas;
use crate::font::{FontId, FontMetrics, FontRegistry};
use crate::raster::GlyphRasterizer;

/// Horizontal placement of a string against its anchor position.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Align {
    /// Anchor at the string start.
    #[default]
    Start,
    /// Anchor at the string center.
    Center,
    /// Anchor at the string end.
    End,
    /// Literal offset in em units, used verbatim.
    Offset(f32),
}

impl Align {
    /// Parse an alignment keyword. Accepts the usual spellings.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "left" | "start" => Some(Self::Start),
            "center" | "centre" | "middle" => Some(Self::Center),
            "right" | "end" => Some(Self::End),
            _ => None,
        }
    }
}

/// Vertical placement of a string's baseline against its anchor position.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Baseline {
    Top,
    Middle,
    #[default]
    Alphabetic,
    Bottom,
    /// Literal offset in em units relative to the alphabetic baseline.
    Offset(f32),
}

impl Baseline {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "top" | "hanging" => Some(Self::Top),
            "middle" | "center" | "centre" => Some(Self::Middle),
            "alphabetic" | "baseline" => Some(Self::Alphabetic),
            "bottom" | "ideographic" => Some(Self::Bottom),
            _ => None,
        }
    }
}

/// Vertical convention of the consuming coordinate system, fixed once at
/// renderer construction and applied to every vertical offset (baseline,
/// pixel offsets, viewport origin).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CoordinateOrigin {
    /// Y grows upward from the bottom-left (GPU clip-space convention).
    #[default]
    BottomLeft,
    /// Y grows downward from the top-left (2D canvas convention).
    TopLeft,
}

impl CoordinateOrigin {
    pub fn y_down(self) -> bool {
        matches!(self, Self::TopLeft)
    }
}

/// Packed per-character layout of one string.
///
/// `size_data` interleaves `(advance width, center offset)` pairs in em
/// units; `char_ids` holds the atlas slot per character. Instanced draws
/// consume both directly.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TextRun {
    pub char_ids: Vec<u32>,
    pub size_data: Vec<f32>,
    /// Total advance width of the string in em units.
    pub width: f32,
}

impl TextRun {
    pub fn len(&self) -> usize {
        self.char_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.char_ids.is_empty()
    }

    /// Advance width of character `i` in em units.
    pub fn char_width(&self, i: usize) -> f32 {
        self.size_data[i * 2]
    }

    /// Center offset of character `i` from the string start, in em units.
    pub fn char_offset(&self, i: usize) -> f32 {
        self.size_data[i * 2 + 1]
    }
}

/// Lay out `text` against the font's width and kerning tables.
///
/// One left-to-right pass: every character gets an atlas slot (assigned here
/// for unseen characters) and a measured width (measured here for unseen
/// characters, kerning pairs included when `kerning` is set). The offset of
/// character `i` is the position of its *center*:
///
/// ```text
/// offset[0] = width[0] / 2
/// offset[i] = offset[i-1] + width[i-1]/2 + width[i]/2 + kern(i-1, i) * 1e-3
/// ```
///
/// Unmeasurable characters keep width `0.0` and still occupy a slot; layout
/// never fails.
pub fn layout(
    text: &str,
    registry: &mut FontRegistry,
    font: FontId,
    atlas: &mut GlyphAtlas,
    kerning: bool,
    raster: &mut dyn GlyphRasterizer,
) -> TextRun {
    let chars: Vec<char> = text.chars().collect();
    let count = chars.len();

    let mut run = TextRun {
        char_ids: Vec::with_capacity(count),
        size_data: vec![0.0; count * 2],
        width: 0.0,
    };

    for (i, &ch) in chars.iter().enumerate() {
        atlas.ensure_char(ch);
        let width = registry.ensure_char(font, ch, kerning, raster);

        // Slot was just ensured above.
        run.char_ids.push(atlas.slot(ch).unwrap_or(0));
        run.size_data[i * 2] = width;

        if i == 0 {
            run.size_data[1] = width * 0.5;
        } else {
            let prev_width = run.size_data[i * 2 - 2];
            let prev_offset = run.size_data[i * 2 - 1];
            let mut offset = prev_offset + prev_width * 0.5 + width * 0.5;

            if kerning {
                if let Some(kern) = registry.entry(font).kern(chars[i - 1], ch) {
                    offset += kern * 1e-3;
                }
            }

            run.size_data[i * 2 + 1] = offset;
        }
    }

    if count > 0 {
        run.width = run.char_offset(count - 1) + run.char_width(count - 1) * 0.5;
    }

    run
}

/// Horizontal offset applied to every character for the given alignment, in
/// the same units as `text_width`.
pub fn align_offset(align: Align, text_width: f32) -> f32 {
    match align {
        Align::Start => 0.0,
        Align::End => -text_width,
        Align::Center => -text_width * 0.5,
        Align::Offset(value) => value,
    }
}

/// Vertical offset of the string anchor in em units.
///
/// The base puts the cell center on the requested line of the font's
/// vertical metrics; [`CoordinateOrigin`] decides the sign once for the
/// whole renderer.
pub fn baseline_offset(baseline: Baseline, metrics: &FontMetrics, origin: CoordinateOrigin) -> f32 {
    let mut base = metrics.bottom * 0.5;
    base += match baseline {
        Baseline::Top => -metrics.top,
        Baseline::Middle => -metrics.median,
        Baseline::Alphabetic => -metrics.baseline,
        Baseline::Bottom => -metrics.bottom,
        Baseline::Offset(value) => value - metrics.baseline,
    };
    if origin.y_down() {
        base
    } else {
        -base
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::{FontRegistry, FontSpec};
    use crate::raster::testing::TableRasterizer;

    fn fixture(raster: &mut TableRasterizer) -> (FontRegistry, FontId, GlyphAtlas) {
        let mut registry = FontRegistry::new();
        let font = registry.resolve(&FontSpec::default(), raster);
        let atlas = GlyphAtlas::new(64, registry.entry(font).metrics());
        (registry, font, atlas)
    }

    #[test]
    fn two_char_layout_without_kerning() {
        let mut raster = TableRasterizer::default()
            .with_width('A', 10.0)
            .with_width('B', 8.0);
        let (mut registry, font, mut atlas) = fixture(&mut raster);

        let run = layout("AB", &mut registry, font, &mut atlas, false, &mut raster);
        assert_eq!(run.size_data, vec![10.0, 5.0, 8.0, 14.0]);
        assert_eq!(run.width, 18.0);
        assert_eq!(run.char_ids, vec![0, 1]);
    }

    #[test]
    fn kerning_shifts_the_following_char() {
        let mut raster = TableRasterizer::default()
            .with_width('A', 0.5)
            .with_width('B', 0.4)
            .with_kern('A', 'B', -50.0);
        let (mut registry, font, mut atlas) = fixture(&mut raster);

        let run = layout("AB", &mut registry, font, &mut atlas, true, &mut raster);

        // offset[1] = offset[0] + w0/2 + w1/2 + kern * 1e-3
        let expected = 0.25 + 0.25 + 0.2 + (-50.0 * 1e-3);
        assert!((run.char_offset(1) - expected).abs() < 1e-6);
        assert!((run.width - (expected + 0.2)).abs() < 1e-6);
    }

    #[test]
    fn kerning_disabled_ignores_pairs() {
        let mut raster = TableRasterizer::default()
            .with_width('A', 0.5)
            .with_width('B', 0.4)
            .with_kern('A', 'B', -50.0);
        let (mut registry, font, mut atlas) = fixture(&mut raster);

        let run = layout("AB", &mut registry, font, &mut atlas, false, &mut raster);
        assert!((run.char_offset(1) - 0.7).abs() < 1e-6);
    }

    #[test]
    fn offset_recurrence_holds_for_longer_text() {
        let mut raster = TableRasterizer::default()
            .with_width('a', 0.45)
            .with_width('b', 0.5)
            .with_width('c', 0.4);
        let (mut registry, font, mut atlas) = fixture(&mut raster);

        let run = layout("abcab", &mut registry, font, &mut atlas, false, &mut raster);
        for i in 1..run.len() {
            let delta = run.char_offset(i) - run.char_offset(i - 1);
            let expected = run.char_width(i - 1) * 0.5 + run.char_width(i) * 0.5;
            assert!((delta - expected).abs() < 1e-6, "char {i}");
        }
        let last = run.len() - 1;
        assert!((run.width - (run.char_offset(last) + run.char_width(last) * 0.5)).abs() < 1e-6);
    }

    #[test]
    fn empty_text_has_zero_width() {
        let mut raster = TableRasterizer::default();
        let (mut registry, font, mut atlas) = fixture(&mut raster);

        let run = layout("", &mut registry, font, &mut atlas, true, &mut raster);
        assert!(run.is_empty());
        assert_eq!(run.width, 0.0);
        assert!(atlas.is_empty());
        assert!(!atlas.needs_repack());
    }

    #[test]
    fn unmeasurable_chars_keep_layout_going() {
        let mut raster = TableRasterizer::default().with_width('a', 0.5);
        let (mut registry, font, mut atlas) = fixture(&mut raster);

        // '\u{7f}' has no width in the table; it still gets a slot.
        let run = layout("a\u{7f}a", &mut registry, font, &mut atlas, false, &mut raster);
        assert_eq!(run.len(), 3);
        assert_eq!(run.char_width(1), 0.0);
        assert!((run.char_offset(2) - 0.75).abs() < 1e-6);
        assert_eq!(atlas.len(), 2);
    }

    #[test]
    fn repeated_chars_reuse_slots() {
        let mut raster = TableRasterizer::default().with_width('a', 0.5).with_width('b', 0.5);
        let (mut registry, font, mut atlas) = fixture(&mut raster);

        let run = layout("abba", &mut registry, font, &mut atlas, false, &mut raster);
        assert_eq!(run.char_ids, vec![0, 1, 1, 0]);
        assert_eq!(atlas.len(), 2);
    }

    #[test]
    fn alignment_keywords_parse() {
        assert_eq!(Align::from_name("centre"), Some(Align::Center));
        assert_eq!(Align::from_name("right"), Some(Align::End));
        assert_eq!(Align::from_name("left"), Some(Align::Start));
        assert_eq!(Baseline::from_name("hanging"), Some(Baseline::Top));
        assert_eq!(Baseline::from_name("ideographic"), Some(Baseline::Bottom));
        assert_eq!(Align::from_name("justify"), None);
    }

    #[test]
    fn align_offsets() {
        assert_eq!(align_offset(Align::Start, 18.0), 0.0);
        assert_eq!(align_offset(Align::End, 18.0), -18.0);
        assert_eq!(align_offset(Align::Center, 18.0), -9.0);
        assert_eq!(align_offset(Align::Offset(2.5), 18.0), 2.5);
    }

    #[test]
    fn baseline_offset_signs_follow_origin() {
        let metrics = FontMetrics::default();
        let down = baseline_offset(Baseline::Alphabetic, &metrics, CoordinateOrigin::TopLeft);
        let up = baseline_offset(Baseline::Alphabetic, &metrics, CoordinateOrigin::BottomLeft);
        assert_eq!(down, -up);
        assert!((down - (metrics.bottom * 0.5 - metrics.baseline)).abs() < 1e-6);
    }

    #[test]
    fn numeric_baseline_is_relative_to_alphabetic() {
        let metrics = FontMetrics::default();
        let at_zero = baseline_offset(Baseline::Offset(0.0), &metrics, CoordinateOrigin::TopLeft);
        let alphabetic =
            baseline_offset(Baseline::Alphabetic, &metrics, CoordinateOrigin::TopLeft);
        assert!((at_zero - alphabetic).abs() < 1e-6);

        let shifted = baseline_offset(Baseline::Offset(0.25), &metrics, CoordinateOrigin::TopLeft);
        assert!((shifted - at_zero - 0.25).abs() < 1e-6);
    }
}
