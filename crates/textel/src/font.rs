//! Font signatures, metrics, and the process-wide measurement registry.
//!
//! A [`FontSignature`] identifies a typeface independent of size: advance
//! widths and kerning are stored in em-relative units, so every label using
//! the same face shares one [`FontEntry`] regardless of its font size.
//!
//! Entries are growth-only. Characters and kerning pairs are added as they
//! are first seen and never removed; real-world label alphabets are small
//! enough that bounding these tables is not worth the bookkeeping (the atlas
//! cache, which owns GPU memory, is the bounded one).

use std::collections::HashMap;

use crate::raster::GlyphRasterizer;

/// Reference rasterization size in pixels. Widths are measured at this size
/// and stored divided by it, making them reusable at any target font size.
pub const BASE_FONT_SIZE: f32 = 64.0;

/// Font style.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FontStyle {
    #[default]
    Normal,
    Italic,
    Oblique,
}

/// Font width class.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FontStretch {
    UltraCondensed,
    ExtraCondensed,
    Condensed,
    SemiCondensed,
    #[default]
    Normal,
    SemiExpanded,
    Expanded,
    ExtraExpanded,
    UltraExpanded,
}

/// Font variant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FontVariant {
    #[default]
    Normal,
    SmallCaps,
}

/// User-facing structured font description: a family preference list plus
/// style fields and the target size in pixels.
///
/// There is no CSS shorthand parsing here. An empty family list falls back
/// to `sans-serif`.
#[derive(Clone, Debug, PartialEq)]
pub struct FontSpec {
    pub family: Vec<String>,
    /// Weight class, 100..=900.
    pub weight: u16,
    pub style: FontStyle,
    pub stretch: FontStretch,
    pub variant: FontVariant,
    /// Target size in pixels.
    pub size_px: f32,
}

impl Default for FontSpec {
    fn default() -> Self {
        Self {
            family: vec!["sans-serif".to_string()],
            weight: 400,
            style: FontStyle::Normal,
            stretch: FontStretch::Normal,
            variant: FontVariant::Normal,
            size_px: 16.0,
        }
    }
}

impl FontSpec {
    /// Convenience constructor from a single family name.
    pub fn family(name: impl Into<String>) -> Self {
        Self {
            family: vec![name.into()],
            ..Self::default()
        }
    }

    pub fn with_size(mut self, size_px: f32) -> Self {
        self.size_px = size_px;
        self
    }

    pub fn with_weight(mut self, weight: u16) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_style(mut self, style: FontStyle) -> Self {
        self.style = style;
        self
    }
}

/// Canonical, size-independent registry key derived from a [`FontSpec`].
///
/// Family names are trimmed, inner whitespace collapsed, and lowercased, so
/// two specs that differ only in formatting hash to the same signature and
/// share one registry entry.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FontSignature {
    family: Vec<String>,
    weight: u16,
    style: FontStyle,
    stretch: FontStretch,
    variant: FontVariant,
}

impl FontSignature {
    pub fn new(spec: &FontSpec) -> Self {
        let mut family: Vec<String> = spec
            .family
            .iter()
            .map(|name| normalize_family(name))
            .filter(|name| !name.is_empty())
            .collect();
        if family.is_empty() {
            log::warn!("font spec has no usable family names, falling back to sans-serif");
            family.push("sans-serif".to_string());
        }
        Self {
            family,
            weight: spec.weight,
            style: spec.style,
            stretch: spec.stretch,
            variant: spec.variant,
        }
    }

    /// Normalized family preference list, most specific first.
    pub fn family_list(&self) -> &[String] {
        &self.family
    }

    pub fn weight(&self) -> u16 {
        self.weight
    }

    pub fn style(&self) -> FontStyle {
        self.style
    }

    pub fn stretch(&self) -> FontStretch {
        self.stretch
    }

    pub fn variant(&self) -> FontVariant {
        self.variant
    }
}

fn normalize_family(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Vertical metrics of a face in em units, measured downward from the top of
/// the line box. `top` is always `0.0`; `bottom` is the line-box height and
/// drives the atlas cell size.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FontMetrics {
    pub top: f32,
    /// Ascender line.
    pub ascent: f32,
    /// Midline of the lowercase x-height, used for `middle` baselines.
    pub median: f32,
    /// Alphabetic baseline.
    pub baseline: f32,
    /// Descender line.
    pub descent: f32,
    /// Bottom of the line box.
    pub bottom: f32,
}

impl Default for FontMetrics {
    // Platform-default-ish metrics used when a face cannot be measured.
    fn default() -> Self {
        Self {
            top: 0.0,
            ascent: 0.05,
            median: 0.55,
            baseline: 0.92,
            descent: 1.15,
            bottom: 1.2,
        }
    }
}

/// Identifier of a registry entry. Copyable, stable for the registry's
/// lifetime, cheap to store on labels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FontId(usize);

/// Measurement state shared by every label that references the same face:
/// em-relative advance widths, kerning pairs in per-mille of em, and
/// vertical metrics.
#[derive(Clone, Debug)]
pub struct FontEntry {
    signature: FontSignature,
    widths: HashMap<char, f32>,
    kerning: HashMap<(char, char), f32>,
    metrics: FontMetrics,
}

impl FontEntry {
    /// Advance width of `ch` in em units, if measured.
    pub fn width(&self, ch: char) -> Option<f32> {
        self.widths.get(&ch).copied()
    }

    /// Kerning adjustment for the ordered pair, in per-mille of em.
    pub fn kern(&self, prev: char, next: char) -> Option<f32> {
        self.kerning.get(&(prev, next)).copied()
    }

    pub fn metrics(&self) -> &FontMetrics {
        &self.metrics
    }

    pub fn signature(&self) -> &FontSignature {
        &self.signature
    }

    /// Number of characters with a measured width.
    pub fn known_chars(&self) -> usize {
        self.widths.len()
    }
}

/// Cache of per-face measurement state, keyed by canonical signature.
///
/// The registry is an explicitly constructed service: renderer contexts own
/// one and pass it where needed. [`FontRegistry::resolve`] is idempotent;
/// equivalent specs always map to the same [`FontId`].
#[derive(Debug, Default)]
pub struct FontRegistry {
    entries: Vec<FontEntry>,
    by_signature: HashMap<FontSignature, FontId>,
}

impl FontRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `spec` to a registry entry, creating it on first sight.
    ///
    /// Metrics are queried once per face. A face the rasterizer cannot
    /// measure gets default metrics; resolution never fails.
    pub fn resolve(&mut self, spec: &FontSpec, raster: &mut dyn GlyphRasterizer) -> FontId {
        let signature = FontSignature::new(spec);
        if let Some(&id) = self.by_signature.get(&signature) {
            return id;
        }

        let metrics = match raster.metrics(&signature) {
            Ok(metrics) => metrics,
            Err(err) => {
                log::warn!(
                    "no metrics for font {:?}: {err}, using defaults",
                    signature.family_list()
                );
                FontMetrics::default()
            }
        };

        let id = FontId(self.entries.len());
        self.entries.push(FontEntry {
            signature: signature.clone(),
            widths: HashMap::new(),
            kerning: HashMap::new(),
            metrics,
        });
        self.by_signature.insert(signature, id);
        id
    }

    pub fn entry(&self, id: FontId) -> &FontEntry {
        &self.entries[id.0]
    }

    /// Ensure `ch` has a measured width, returning it in em units.
    ///
    /// New characters are measured at [`BASE_FONT_SIZE`] and stored
    /// em-normalized. When `kerning` is set, [`Self::ensure_kerning`] runs
    /// for the new character. A character the rasterizer cannot measure
    /// gets width `0.0` and still participates in layout.
    pub fn ensure_char(
        &mut self,
        id: FontId,
        ch: char,
        kerning: bool,
        raster: &mut dyn GlyphRasterizer,
    ) -> f32 {
        let entry = &mut self.entries[id.0];
        if let Some(&width) = entry.widths.get(&ch) {
            return width;
        }

        let width = match raster.measure(&entry.signature, ch) {
            Ok(px) => px / BASE_FONT_SIZE,
            Err(err) => {
                log::warn!("cannot measure {ch:?}: {err}, using zero width");
                0.0
            }
        };
        entry.widths.insert(ch, width);

        if kerning {
            self.ensure_kerning(id, ch, raster);
        }

        width
    }

    /// Measure kerning for `ch` against every known character of the entry
    /// (both orders, self-pair included) and merge the adjustments into the
    /// kerning table. O(known) per new character; character sets per font
    /// are small enough that this stays cheap.
    pub fn ensure_kerning(&mut self, id: FontId, ch: char, raster: &mut dyn GlyphRasterizer) {
        let entry = &mut self.entries[id.0];
        let pairs: Vec<(char, char)> = entry
            .widths
            .keys()
            .flat_map(|&base| [(base, ch), (ch, base)])
            .collect();
        let measured = raster.kern(&entry.signature, &pairs);
        entry.kerning.extend(measured);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::testing::TableRasterizer;

    #[test]
    fn signature_normalizes_family_formatting() {
        let a = FontSignature::new(&FontSpec::family("  Fira   Sans "));
        let b = FontSignature::new(&FontSpec::family("fira sans"));
        assert_eq!(a, b);
    }

    #[test]
    fn signature_is_size_independent() {
        let a = FontSignature::new(&FontSpec::family("serif").with_size(12.0));
        let b = FontSignature::new(&FontSpec::family("serif").with_size(48.0));
        assert_eq!(a, b);
    }

    #[test]
    fn empty_family_falls_back() {
        let spec = FontSpec {
            family: vec!["   ".to_string()],
            ..FontSpec::default()
        };
        let sig = FontSignature::new(&spec);
        assert_eq!(sig.family_list(), ["sans-serif"]);
    }

    #[test]
    fn resolve_is_idempotent_across_formatting() {
        let mut raster = TableRasterizer::default();
        let mut registry = FontRegistry::new();

        let a = registry.resolve(&FontSpec::family("Fira  Sans"), &mut raster);
        let b = registry.resolve(&FontSpec::family(" fira sans"), &mut raster);
        assert_eq!(a, b);

        // Metric computed once per distinct character across both handles.
        registry.ensure_char(a, 'A', false, &mut raster);
        registry.ensure_char(b, 'A', false, &mut raster);
        assert_eq!(raster.measure_calls(), 1);
    }

    #[test]
    fn unmeasurable_char_gets_zero_width() {
        let mut raster = TableRasterizer::default();
        let mut registry = FontRegistry::new();
        let id = registry.resolve(&FontSpec::default(), &mut raster);

        // TableRasterizer has no width for '\u{7f}'.
        let width = registry.ensure_char(id, '\u{7f}', false, &mut raster);
        assert_eq!(width, 0.0);
        assert_eq!(registry.entry(id).width('\u{7f}'), Some(0.0));
    }

    #[test]
    fn kerning_pairs_cover_known_chars_and_self() {
        let mut raster = TableRasterizer::default().with_kern('A', 'B', -50.0);
        let mut registry = FontRegistry::new();
        let id = registry.resolve(&FontSpec::default(), &mut raster);

        registry.ensure_char(id, 'A', true, &mut raster);
        registry.ensure_char(id, 'B', true, &mut raster);

        let entry = registry.entry(id);
        assert_eq!(entry.kern('A', 'B'), Some(-50.0));
        assert_eq!(entry.kern('B', 'A'), None);

        // Adding 'B' queried (A,B), (B,A), (B,B); adding 'A' queried (A,A).
        let queried = raster.kern_pairs_queried();
        assert!(queried.contains(&('A', 'A')));
        assert!(queried.contains(&('B', 'B')));
        assert!(queried.contains(&('A', 'B')));
        assert!(queried.contains(&('B', 'A')));
    }
}
