//! Update-boundary option normalization.
//!
//! The update surface accepts many spellings per logical option (see
//! [`OPTION_ALIASES`]); everything past this module works with canonical
//! fields only. Ranges, viewports, and colors are normalized here too, so
//! the layout and rendering code never sees a raw user value.

use crate::font::FontSpec;
use crate::layout::{Align, Baseline};

/// RGBA color with premultiplied-friendly float components in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Self = Self::rgba(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Self = Self::rgba(1.0, 1.0, 1.0, 1.0);

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self::rgba(r, g, b, 1.0)
    }

    /// Fold an opacity factor into the alpha channel.
    pub fn with_opacity(self, opacity: f32) -> Self {
        Self {
            a: self.a * opacity.clamp(0.0, 1.0),
            ..self
        }
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

/// A pixel rectangle, top-left anchored in its own coordinate convention.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.x, self.y, self.width, self.height]
    }

    /// Convert a rectangle given in a top-down coordinate system into the
    /// bottom-up convention, given the full target height.
    pub fn flip_y(self, target_height: f32) -> Self {
        Self {
            y: target_height - self.y - self.height,
            ..self
        }
    }
}

/// A data-space rectangle `[x0, y0, x1, y1]`, convertible into the
/// scale/translate pair that maps data coordinates into the unit square.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DataRange {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl DataRange {
    pub const fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn scale(&self) -> [f32; 2] {
        [1.0 / (self.x1 - self.x0), 1.0 / (self.y1 - self.y0)]
    }

    pub fn translate(&self) -> [f32; 2] {
        [-self.x0, -self.y0]
    }
}

/// Text direction. Stored as part of the label state; right-to-left shaping
/// is not implemented.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Direction {
    #[default]
    Ltr,
    Rtl,
}

/// One update payload for a label. Unset fields leave the current label
/// state untouched, so callers send only what changed.
#[derive(Clone, Debug, Default)]
pub struct LabelOptions {
    /// One or more strings sharing this label's font and style.
    pub texts: Option<Vec<String>>,
    pub font: Option<FontSpec>,
    /// Overrides the size embedded in `font` when both are supplied.
    pub font_size: Option<f32>,
    pub align: Option<Align>,
    pub baseline: Option<Baseline>,
    pub direction: Option<Direction>,
    pub color: Option<Color>,
    pub kerning: Option<bool>,
    /// Data-space rectangle; sets `scale` and `translate` together.
    pub range: Option<DataRange>,
    pub viewport: Option<Viewport>,
    pub scale: Option<[f32; 2]>,
    pub translate: Option<[f32; 2]>,
    pub opacity: Option<f32>,
    /// Extra pixel offset applied after alignment.
    pub offset: Option<[f32; 2]>,
    /// Anchor positions, one per string (a single entry is shared).
    pub positions: Option<Vec<[f32; 2]>>,
}

impl LabelOptions {
    /// Options updating only the text, the most common call.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            texts: Some(vec![text.into()]),
            ..Self::default()
        }
    }

    /// Options updating a batch of strings.
    pub fn batch(texts: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            texts: Some(texts.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    pub fn with_font(mut self, font: FontSpec) -> Self {
        self.font = Some(font);
        self
    }

    pub fn with_font_size(mut self, size_px: f32) -> Self {
        self.font_size = Some(size_px);
        self
    }

    pub fn with_align(mut self, align: Align) -> Self {
        self.align = Some(align);
        self
    }

    pub fn with_baseline(mut self, baseline: Baseline) -> Self {
        self.baseline = Some(baseline);
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    pub fn with_kerning(mut self, kerning: bool) -> Self {
        self.kerning = Some(kerning);
        self
    }

    pub fn with_position(mut self, position: [f32; 2]) -> Self {
        self.positions = Some(vec![position]);
        self
    }

    pub fn with_positions(mut self, positions: Vec<[f32; 2]>) -> Self {
        self.positions = Some(positions);
        self
    }

    pub fn with_range(mut self, range: DataRange) -> Self {
        self.range = Some(range);
        self
    }

    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = Some(viewport);
        self
    }

    pub fn with_offset(mut self, offset: [f32; 2]) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = Some(opacity);
        self
    }
}

impl From<&str> for LabelOptions {
    fn from(text: &str) -> Self {
        Self::text(text)
    }
}

/// Accepted spellings for each logical option, applied once at the update
/// boundary. The first entry of each list is the canonical name.
pub const OPTION_ALIASES: &[(&str, &[&str])] = &[
    (
        "font",
        &[
            "font", "fontFace", "fontface", "typeface", "cssFont", "css-font", "family",
            "fontFamily",
        ],
    ),
    ("fontSize", &["fontSize", "fontsize", "size", "font-size"]),
    ("text", &["text", "value", "symbols"]),
    ("align", &["align", "alignment", "textAlign"]),
    ("baseline", &["baseline", "textBaseline", "textbaseline"]),
    ("direction", &["dir", "direction", "textDirection"]),
    (
        "color",
        &[
            "color",
            "colour",
            "fill",
            "fill-color",
            "fillColor",
            "textColor",
            "textcolor",
        ],
    ),
    ("kerning", &["kerning", "kern"]),
    ("range", &["range", "dataBox"]),
    (
        "viewport",
        &["viewport", "vp", "viewBox", "viewbox", "viewPort"],
    ),
    (
        "opacity",
        &[
            "opacity",
            "alpha",
            "transparency",
            "visible",
            "visibility",
            "opaque",
        ],
    ),
    (
        "offset",
        &["offset", "padding", "shift", "indent", "indentation"],
    ),
    ("position", &["position", "pos"]),
];

/// Resolve a user-supplied option name to its canonical field name.
pub fn canonical_option(name: &str) -> Option<&'static str> {
    OPTION_ALIASES
        .iter()
        .find(|(_, aliases)| aliases.contains(&name))
        .map(|&(canonical, _)| canonical)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_resolve_to_canonical_names() {
        assert_eq!(canonical_option("typeface"), Some("font"));
        assert_eq!(canonical_option("font-size"), Some("fontSize"));
        assert_eq!(canonical_option("symbols"), Some("text"));
        assert_eq!(canonical_option("colour"), Some("color"));
        assert_eq!(canonical_option("dataBox"), Some("range"));
        assert_eq!(canonical_option("padding"), Some("offset"));
        assert_eq!(canonical_option("vp"), Some("viewport"));
        assert_eq!(canonical_option("no-such-option"), None);
    }

    #[test]
    fn canonical_names_resolve_to_themselves() {
        for (canonical, _) in OPTION_ALIASES {
            assert_eq!(canonical_option(canonical), Some(*canonical));
        }
    }

    #[test]
    fn range_converts_to_scale_and_translate() {
        let range = DataRange::new(10.0, 20.0, 30.0, 120.0);
        assert_eq!(range.scale(), [1.0 / 20.0, 1.0 / 100.0]);
        assert_eq!(range.translate(), [-10.0, -20.0]);
    }

    #[test]
    fn opacity_folds_into_alpha() {
        let color = Color::rgba(1.0, 0.5, 0.0, 0.8).with_opacity(0.5);
        assert!((color.a - 0.4).abs() < 1e-6);
        // Clamped, never amplifying.
        assert_eq!(Color::BLACK.with_opacity(2.0).a, 1.0);
    }

    #[test]
    fn viewport_flip_converts_top_down_rects() {
        let vp = Viewport::new(10.0, 20.0, 100.0, 50.0).flip_y(300.0);
        assert_eq!(vp.y, 230.0);
        assert_eq!(vp.x, 10.0);
    }
}
