//! The glyph atlas grid model.
//!
//! An atlas assigns each distinct character of a (font, size) pair a slot in
//! a fixed-step texture grid. Slots are handed out in first-seen order and
//! never move while the atlas lives, so packed layout buffers stay valid
//! across atlas growth. Geometry is re-derived from scratch on every growth:
//! a row-major grid is trivially deterministic, and growth only happens when
//! a new character appears, never per frame.
//!
//! The GPU texture itself lives with the renderer backend; this model only
//! answers which cell a character occupies and how large the backing texture
//! must be.

use std::collections::HashMap;

use crate::font::{FontMetrics, FontSignature};

/// Largest atlas dimension the packer targets. The column count is capped so
/// `cols * step <= MAX_ATLAS_SIZE`; the height is allowed to exceed it when a
/// single font needs more cells than one square can hold, which trades a
/// potentially oversized texture for never failing outright.
pub const MAX_ATLAS_SIZE: u32 = 1024;

/// Key identifying one atlas: a font signature rasterized at an integer
/// pixel size. Labels with equal keys share an atlas.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AtlasKey {
    pub signature: FontSignature,
    pub size_px: u32,
}

impl AtlasKey {
    pub fn new(signature: FontSignature, size_px: f32) -> Self {
        Self {
            signature,
            size_px: size_px.round().max(1.0) as u32,
        }
    }
}

/// CPU-side model of one glyph atlas grid.
#[derive(Clone, Debug)]
pub struct GlyphAtlas {
    chars: Vec<char>,
    ids: HashMap<char, u32>,
    step: u32,
    cols: u32,
    rows: u32,
    width: u32,
    height: u32,
    size_px: u32,
    pending: usize,
}

impl GlyphAtlas {
    /// Create an empty atlas for `size_px`, with the cell size derived from
    /// the font's line-box height. The step is rounded up to an even pixel
    /// count so cell centers land on the pixel grid.
    pub fn new(size_px: u32, metrics: &FontMetrics) -> Self {
        let step = ((size_px as f32 * metrics.bottom * 0.5).ceil() as u32 * 2).max(2);
        Self {
            chars: Vec::new(),
            ids: HashMap::new(),
            step,
            cols: 0,
            rows: 0,
            width: 0,
            height: 0,
            size_px,
            pending: 0,
        }
    }

    /// Slot index of `ch`, if assigned.
    pub fn slot(&self, ch: char) -> Option<u32> {
        self.ids.get(&ch).copied()
    }

    /// Characters in slot order.
    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Cell size in pixels.
    pub fn step(&self) -> u32 {
        self.step
    }

    pub fn cols(&self) -> u32 {
        self.cols
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    /// Backing texture width in pixels (after the last [`Self::repack`]).
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Backing texture height in pixels (after the last [`Self::repack`]).
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Rasterization size in pixels.
    pub fn size_px(&self) -> u32 {
        self.size_px
    }

    /// Column and row of a slot index.
    pub fn cell(&self, slot: u32) -> (u32, u32) {
        (slot % self.cols.max(1), slot / self.cols.max(1))
    }

    /// Assign a slot to `ch` if it doesn't have one yet. Returns `true` when
    /// the character is new. Slot indices are insertion-ordered and never
    /// reassigned.
    pub fn ensure_char(&mut self, ch: char) -> bool {
        if self.ids.contains_key(&ch) {
            return false;
        }
        let slot = self.chars.len() as u32;
        self.ids.insert(ch, slot);
        self.chars.push(ch);
        self.pending += 1;
        true
    }

    /// True when characters were added since the last [`Self::mark_packed`]
    /// and the backing texture contents are stale.
    pub fn needs_repack(&self) -> bool {
        self.pending > 0
    }

    /// Recompute the grid geometry for the current character count and
    /// return the `(width, height)` the backing texture must have.
    ///
    /// The caller rasterizes the full character list into one bitmap (see
    /// [`crate::raster::GlyphRasterizer::rasterize`]), replaces the texture
    /// contents, then calls [`Self::mark_packed`].
    pub fn repack(&mut self) -> (u32, u32) {
        let count = self.chars.len() as u32;
        if count == 0 {
            self.cols = 0;
            self.rows = 0;
            self.width = 0;
            self.height = 0;
            return (0, 0);
        }

        let max_cols = (MAX_ATLAS_SIZE / self.step).max(1);
        self.cols = max_cols.min(count);
        self.rows = count.div_ceil(self.cols);
        self.width = self.cols * self.step;
        self.height = self.rows * self.step;

        if self.height > MAX_ATLAS_SIZE {
            log::debug!(
                "atlas height {}px exceeds the {}px cap ({} chars at step {})",
                self.height,
                MAX_ATLAS_SIZE,
                count,
                self.step
            );
        }

        (self.width, self.height)
    }

    /// Clear the pending counter once the texture upload completed.
    pub fn mark_packed(&mut self) {
        self.pending = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atlas_with_step(step: u32) -> GlyphAtlas {
        // step = ceil(size * bottom * 0.5) * 2 with bottom = 1.0.
        let metrics = FontMetrics {
            bottom: 1.0,
            ..FontMetrics::default()
        };
        let atlas = GlyphAtlas::new(step, &metrics);
        assert_eq!(atlas.step(), step);
        atlas
    }

    #[test]
    fn grid_geometry_for_twenty_chars() {
        let mut atlas = atlas_with_step(64);
        for i in 0..20u32 {
            atlas.ensure_char(char::from_u32('a' as u32 + i).unwrap());
        }
        let (width, height) = atlas.repack();
        assert_eq!(atlas.cols(), 16);
        assert_eq!(atlas.rows(), 2);
        assert_eq!(width, 1024);
        assert_eq!(height, 128);

        // Slot 17 wraps to the second row.
        assert_eq!(atlas.cell(17), (1, 1));
        assert_eq!(atlas.cell(15), (15, 0));
    }

    #[test]
    fn small_char_counts_stay_one_row() {
        let mut atlas = atlas_with_step(64);
        for ch in "abc".chars() {
            atlas.ensure_char(ch);
        }
        atlas.repack();
        assert_eq!(atlas.cols(), 3);
        assert_eq!(atlas.rows(), 1);
        assert_eq!(atlas.width(), 192);
    }

    #[test]
    fn slots_are_stable_across_growth() {
        let mut atlas = atlas_with_step(64);
        for ch in "hello".chars() {
            atlas.ensure_char(ch);
        }
        atlas.repack();
        atlas.mark_packed();
        let h = atlas.slot('h').unwrap();
        let o = atlas.slot('o').unwrap();

        for ch in "world".chars() {
            atlas.ensure_char(ch);
        }
        atlas.repack();
        assert_eq!(atlas.slot('h'), Some(h));
        assert_eq!(atlas.slot('o'), Some(o));
        // 'o' kept the slot it got from "hello"; only new chars appended.
        assert_eq!(atlas.len(), 7);
    }

    #[test]
    fn ensure_char_reports_new_only_once() {
        let mut atlas = atlas_with_step(64);
        assert!(atlas.ensure_char('x'));
        assert!(!atlas.ensure_char('x'));
        assert!(atlas.needs_repack());
        atlas.repack();
        atlas.mark_packed();
        assert!(!atlas.needs_repack());
    }

    #[test]
    fn empty_atlas_repacks_to_nothing() {
        let mut atlas = atlas_with_step(64);
        assert_eq!(atlas.repack(), (0, 0));
        assert!(atlas.is_empty());
        assert!(!atlas.needs_repack());
    }

    #[test]
    fn atlas_cache_evicts_least_recently_used_key() {
        use crate::cache::LruCache;
        use crate::font::FontSpec;

        let sig = |name: &str| FontSignature::new(&FontSpec::family(name));
        let metrics = FontMetrics::default();
        let mut cache: LruCache<AtlasKey, GlyphAtlas> = LruCache::new(2);

        let a = AtlasKey::new(sig("alpha"), 16.0);
        let b = AtlasKey::new(sig("beta"), 16.0);
        // Same face at another size is a distinct atlas.
        let c = AtlasKey::new(sig("alpha"), 32.0);

        cache.insert(a.clone(), GlyphAtlas::new(16, &metrics));
        cache.insert(b.clone(), GlyphAtlas::new(16, &metrics));
        cache.get_mut(&a);

        let evicted = cache.insert(c.clone(), GlyphAtlas::new(32, &metrics));
        assert_eq!(evicted.map(|(key, _)| key), Some(b));
        assert!(cache.contains(&a));
        assert!(cache.contains(&c));
    }

    #[test]
    fn height_grows_past_cap_instead_of_failing() {
        let mut atlas = atlas_with_step(512);
        // 2 columns fit in 1024; 5 chars need 3 rows -> 1536 px tall.
        for ch in "abcde".chars() {
            atlas.ensure_char(ch);
        }
        let (width, height) = atlas.repack();
        assert_eq!(width, 1024);
        assert_eq!(height, 1536);
        assert!(height > MAX_ATLAS_SIZE);
    }
}
