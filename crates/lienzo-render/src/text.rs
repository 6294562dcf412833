//! Text shaping and the glyph atlas.
//!
//! A [`Font`] pairs the raw font bytes (shaped with rustybuzz, the same
//! buffer → guess-properties → shape flow as HarfBuzz) with a fontdue
//! rasterizer and a per-font texture atlas. Glyphs are rasterized on first
//! use and packed left-to-right, top-to-bottom into a 2-channel
//! (luminance + alpha) texture; the Latin-1 range is pre-cached at load so
//! ordinary UI text never stalls on rasterization.
//!
//! The atlas only ever grows downward: when a glyph doesn't fit the current
//! row it starts a new one, and when it doesn't fit vertically the texture's
//! height doubles. Resizes preserve content, so cached UV rectangles stay
//! valid forever.
//!
//! [`TextSystem::calculate_text_box`] runs the same shaping pass but sums
//! advances only — it never touches the atlas or the GPU.

use std::collections::HashMap;
use std::sync::Arc;

use lienzo_core::{Color, Handle, HandleList};
use rustybuzz::UnicodeBuffer;

use crate::renderer::{Renderer, Texture};

/// Atlas texture width; height starts small and doubles on demand.
const ATLAS_WIDTH: u32 = 4096;

/// Padding between packed glyphs, both axes.
const ATLAS_PADDING: u32 = 4;

/// A cached glyph: its atlas rectangle and layout metrics in pixels.
#[derive(Debug, Clone, Copy)]
struct Glyph {
    s0: u32,
    t0: u32,
    s1: u32,
    t1: u32,
    x_advance: f32,
    y_advance: f32,
    x_bearing: f32,
    y_bearing: f32,
}

/// Row-packing state of an atlas. Pure bookkeeping; the texture itself is
/// owned by the renderer.
#[derive(Debug)]
struct AtlasPacker {
    width: u32,
    height: u32,
    cursor_x: u32,
    cursor_y: u32,
    line_height: u32,
    padding: u32,
}

/// Where a glyph landed, and whether the texture must grow first.
#[derive(Debug, PartialEq, Eq)]
struct AtlasSlot {
    x: u32,
    y: u32,
    /// New atlas height to resize to before uploading, if any.
    grow_to: Option<u32>,
}

impl AtlasPacker {
    fn new(width: u32, height: u32, padding: u32) -> Self {
        Self {
            width,
            height,
            cursor_x: padding,
            cursor_y: padding,
            line_height: 0,
            padding,
        }
    }

    /// Reserve room for a `w`×`h` rectangle.
    ///
    /// Returns `None` only if the rectangle can never fit (wider than the
    /// atlas itself).
    fn allocate(&mut self, w: u32, h: u32) -> Option<AtlasSlot> {
        if w + 2 * self.padding > self.width {
            return None;
        }

        // Wrap to the next row when the glyph overruns the right edge.
        if self.cursor_x + w + self.padding > self.width {
            self.cursor_x = self.padding;
            self.cursor_y += self.line_height + self.padding;
            self.line_height = 0;
        }

        // Double the height until the row fits.
        let mut grow_to = None;
        while self.cursor_y + h + self.padding > self.height {
            self.height *= 2;
            grow_to = Some(self.height);
        }

        let slot = AtlasSlot {
            x: self.cursor_x,
            y: self.cursor_y,
            grow_to,
        };

        self.cursor_x += w + self.padding;
        self.line_height = self.line_height.max(h);

        Some(slot)
    }
}

/// A loaded font: shaper input, rasterizer, atlas, glyph cache.
pub struct Font {
    /// Raw TTF/OTF bytes; rustybuzz parses lazily per shaping run.
    data: Arc<Vec<u8>>,
    raster: fontdue::Font,
    /// Font units → pixels at the loaded point size.
    scale: f32,
    /// Line height (ascent − descent) in pixels.
    height: f32,
    atlas_texture: Handle<Texture>,
    packer: AtlasPacker,
    glyphs: HashMap<u16, Glyph>,
    size_px: f32,
}

/// Font table and glyph-vertex generation.
pub struct TextSystem {
    fonts: HandleList<Font>,
    vertex_buffer: Vec<f32>,
}

impl TextSystem {
    /// Create an empty font table.
    pub fn new() -> Self {
        tracing::info!("text system initialized");

        Self {
            fonts: HandleList::new(),
            vertex_buffer: Vec::new(),
        }
    }

    /// Load a font file at a point size (in pixels).
    pub fn load_font(
        &mut self,
        renderer: &mut Renderer,
        path: impl AsRef<std::path::Path>,
        size: f32,
    ) -> Option<Handle<Font>> {
        let path = path.as_ref();

        let data = match std::fs::read(path) {
            Ok(data) => data,
            Err(error) => {
                tracing::warn!(file = %path.display(), %error, "can't read font file");
                return None;
            }
        };

        self.load_font_from_bytes(renderer, &path.display().to_string(), data, size)
    }

    /// Load a font from raw bytes.
    pub fn load_font_from_bytes(
        &mut self,
        renderer: &mut Renderer,
        name: &str,
        data: Vec<u8>,
        size: f32,
    ) -> Option<Handle<Font>> {
        let face = rustybuzz::Face::from_slice(&data, 0)?;
        let units_per_em = face.units_per_em() as f32;
        drop(face);

        let raster = match fontdue::Font::from_bytes(
            data.as_slice(),
            fontdue::FontSettings {
                scale: size,
                ..fontdue::FontSettings::default()
            },
        ) {
            Ok(raster) => raster,
            Err(error) => {
                tracing::warn!(font = name, error, "can't parse font");
                return None;
            }
        };

        let height = raster
            .horizontal_line_metrics(size)
            .map_or(size, |metrics| metrics.ascent - metrics.descent);

        // Start the atlas tall enough for a few rows at this size.
        let mut atlas_height: u32 = 16;
        while (atlas_height as f32) < size * 4.0 {
            atlas_height *= 2;
        }

        let atlas_texture = renderer.create_texture(ATLAS_WIDTH, atlas_height, 2)?;
        renderer.set_texture_smooth(atlas_texture, true);

        let font = Font {
            data: Arc::new(data),
            raster,
            scale: size / units_per_em,
            height,
            atlas_texture,
            packer: AtlasPacker::new(ATLAS_WIDTH, atlas_height, ATLAS_PADDING),
            glyphs: HashMap::new(),
            size_px: size,
        };

        let handle = self.fonts.add(font)?;
        self.prerender_latin(renderer, handle);

        tracing::info!(font = name, size, "font loaded");
        Some(handle)
    }

    /// Destroy a font and its atlas texture.
    pub fn destroy_font(&mut self, renderer: &mut Renderer, handle: Handle<Font>) {
        if let Some(font) = self.fonts.remove(handle) {
            renderer.destroy_texture(font.atlas_texture);
        }
    }

    /// Line height of a font in pixels.
    pub fn font_height(&self, handle: Handle<Font>) -> Option<f32> {
        self.fonts.get(handle).map(|font| font.height)
    }

    /// The atlas texture behind a font. Diagnostic.
    pub fn font_atlas(&self, handle: Handle<Font>) -> Option<Handle<Texture>> {
        self.fonts.get(handle).map(|font| font.atlas_texture)
    }

    /// Number of glyphs a font has cached. Diagnostic.
    pub fn cached_glyphs(&self, handle: Handle<Font>) -> usize {
        self.fonts.get(handle).map_or(0, |font| font.glyphs.len())
    }

    /// Destroy every font. Called on teardown.
    pub fn shutdown(&mut self, renderer: &mut Renderer) {
        let handles: Vec<_> = self.fonts.iter().map(|(handle, _)| handle).collect();

        for handle in handles {
            self.destroy_font(renderer, handle);
        }
    }

    /// Shape and draw a string with its baseline-relative origin at
    /// `(x, y)`.
    pub fn draw_text(
        &mut self,
        renderer: &mut Renderer,
        handle: Handle<Font>,
        x: f32,
        y: f32,
        color: Color,
        text: &str,
    ) {
        let buffer = &mut self.vertex_buffer;
        buffer.clear();

        let Some(font) = self.fonts.get_mut(handle) else {
            return;
        };

        let Some(face) = rustybuzz::Face::from_slice(&font.data, 0) else {
            return;
        };

        let mut unicode = UnicodeBuffer::new();
        unicode.push_str(text);
        unicode.guess_segment_properties();

        let shaped = rustybuzz::shape(&face, &[], unicode);

        let mut pen_x = x;
        let mut pen_y = y;
        let atlas_texture = font.atlas_texture;

        for (info, position) in shaped.glyph_infos().iter().zip(shaped.glyph_positions()) {
            let glyph_id = info.glyph_id as u16;

            let glyph = match font.glyphs.get(&glyph_id) {
                Some(glyph) => *glyph,
                None => {
                    let x_advance = position.x_advance as f32 * font.scale;
                    let y_advance = position.y_advance as f32 * font.scale;

                    match cache_glyph(
                        renderer,
                        &font.raster,
                        &mut font.packer,
                        atlas_texture,
                        font.size_px,
                        glyph_id,
                        x_advance,
                        y_advance,
                    ) {
                        Some(glyph) => {
                            font.glyphs.insert(glyph_id, glyph);
                            glyph
                        }
                        None => continue,
                    }
                }
            };

            emit_glyph(
                buffer,
                &glyph,
                font.packer.width as f32,
                font.packer.height as f32,
                font.height,
                pen_x,
                pen_y,
            );

            pen_x += glyph.x_advance;
            pen_y += glyph.y_advance;
        }

        renderer.draw_font(atlas_texture, color, buffer);
    }

    /// Width and height a string would occupy, without touching the atlas.
    pub fn calculate_text_box(&self, handle: Handle<Font>, text: &str) -> Option<(f32, f32)> {
        let font = self.fonts.get(handle)?;
        let face = rustybuzz::Face::from_slice(&font.data, 0)?;

        let mut unicode = UnicodeBuffer::new();
        unicode.push_str(text);
        unicode.guess_segment_properties();

        let shaped = rustybuzz::shape(&face, &[], unicode);

        let mut width = 0.0;
        let mut height = font.height;

        for position in shaped.glyph_positions() {
            width += position.x_advance as f32 * font.scale;
            height += position.y_advance as f32 * font.scale;
        }

        Some((width, height))
    }

    /// Rasterize the Latin-1 range up front.
    fn prerender_latin(&mut self, renderer: &mut Renderer, handle: Handle<Font>) {
        let Some(font) = self.fonts.get_mut(handle) else {
            return;
        };

        let Some(face) = rustybuzz::Face::from_slice(&font.data, 0) else {
            return;
        };

        // Collect ids and advances first; `face` borrows the font data and
        // must be gone before the cache mutates the atlas.
        let mut pending = Vec::new();

        for codepoint in 0x20u32..=0xFF {
            let Some(ch) = char::from_u32(codepoint) else {
                continue;
            };

            if let Some(glyph_id) = face.glyph_index(ch) {
                let advance = face
                    .glyph_hor_advance(glyph_id)
                    .map_or(0.0, |units| f32::from(units) * font.scale);
                pending.push((glyph_id.0, advance));
            }
        }

        drop(face);

        for (glyph_id, advance) in pending {
            if font.glyphs.contains_key(&glyph_id) {
                continue;
            }

            if let Some(glyph) = cache_glyph(
                renderer,
                &font.raster,
                &mut font.packer,
                font.atlas_texture,
                font.size_px,
                glyph_id,
                advance,
                0.0,
            ) {
                font.glyphs.insert(glyph_id, glyph);
            }
        }
    }
}

impl Default for TextSystem {
    fn default() -> Self {
        Self::new()
    }
}

/// Rasterize one glyph into the atlas and return its cache entry.
#[allow(clippy::too_many_arguments)]
fn cache_glyph(
    renderer: &mut Renderer,
    raster: &fontdue::Font,
    packer: &mut AtlasPacker,
    atlas_texture: Handle<Texture>,
    size_px: f32,
    glyph_id: u16,
    x_advance: f32,
    y_advance: f32,
) -> Option<Glyph> {
    let (metrics, coverage) = raster.rasterize_indexed(glyph_id, size_px);

    let w = metrics.width as u32;
    let h = metrics.height as u32;

    let slot = packer.allocate(w, h)?;

    if let Some(new_height) = slot.grow_to {
        tracing::debug!(glyph_id, new_height, "growing font atlas");
        renderer.resize_texture(atlas_texture, ATLAS_WIDTH, new_height);
    }

    if w > 0 && h > 0 {
        // Luminance+alpha pairs: full white shaped by the coverage alpha.
        let mut pixels = Vec::with_capacity(coverage.len() * 2);
        for alpha in &coverage {
            pixels.push(255);
            pixels.push(*alpha);
        }

        renderer.update_texture(atlas_texture, slot.x, slot.y, w, h, &pixels);
    }

    Some(Glyph {
        s0: slot.x,
        t0: slot.y,
        s1: slot.x + w,
        t1: slot.y + h,
        x_advance,
        y_advance,
        x_bearing: metrics.xmin as f32,
        y_bearing: metrics.ymin as f32 + metrics.height as f32,
    })
}

/// Append the two triangles of one glyph quad.
fn emit_glyph(
    buffer: &mut Vec<f32>,
    glyph: &Glyph,
    atlas_width: f32,
    atlas_height: f32,
    font_height: f32,
    pen_x: f32,
    pen_y: f32,
) {
    if glyph.s1 == glyph.s0 || glyph.t1 == glyph.t0 {
        return; // invisible glyph (space)
    }

    let x0 = pen_x + glyph.x_bearing;
    let y0 = pen_y - glyph.y_bearing + font_height;
    let x1 = x0 + (glyph.s1 - glyph.s0) as f32;
    let y1 = y0 + (glyph.t1 - glyph.t0) as f32;

    let aw = atlas_width;
    let ah = atlas_height;

    let s0 = glyph.s0 as f32 / aw;
    let t0 = glyph.t0 as f32 / ah;
    let s1 = glyph.s1 as f32 / aw;
    let t1 = glyph.t1 as f32 / ah;

    buffer.extend_from_slice(&[
        x0, y0, s0, t0, //
        x1, y0, s1, t0, //
        x1, y1, s1, t1, //
        x1, y1, s1, t1, //
        x0, y1, s0, t1, //
        x0, y0, s0, t0,
    ]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packer_walks_left_to_right() {
        let mut packer = AtlasPacker::new(64, 64, 4);

        let a = packer.allocate(10, 12).unwrap();
        let b = packer.allocate(10, 8).unwrap();

        assert_eq!((a.x, a.y), (4, 4));
        assert_eq!((b.x, b.y), (18, 4));
        assert_eq!(packer.line_height, 12);
    }

    #[test]
    fn test_packer_wraps_to_next_row() {
        let mut packer = AtlasPacker::new(64, 64, 4);

        packer.allocate(40, 10).unwrap();
        let wrapped = packer.allocate(30, 10).unwrap();

        // New row starts below the tallest glyph of the previous one.
        assert_eq!((wrapped.x, wrapped.y), (4, 18));
        assert_eq!(packer.line_height, 10);
    }

    #[test]
    fn test_packer_grows_by_doubling() {
        let mut packer = AtlasPacker::new(64, 16, 4);

        let a = packer.allocate(8, 8).unwrap();
        assert_eq!(a.grow_to, None);

        // Next row won't fit in 16 rows of height.
        packer.allocate(50, 8).unwrap();
        let grown = packer.allocate(50, 8).unwrap();

        assert_eq!(grown.grow_to, Some(32));
        assert_eq!(packer.height, 32);

        // Cursor positions from before the growth keep their meaning.
        assert_eq!((a.x, a.y), (4, 4));
    }

    #[test]
    fn test_packer_rejects_impossible_rectangles() {
        let mut packer = AtlasPacker::new(64, 64, 4);
        assert!(packer.allocate(100, 8).is_none());
    }

    #[test]
    fn test_packer_grows_repeatedly_for_tall_glyphs() {
        let mut packer = AtlasPacker::new(64, 16, 4);
        let slot = packer.allocate(8, 100).unwrap();

        assert_eq!(slot.grow_to, Some(128));
    }

    #[test]
    fn test_bogus_font_bytes_are_rejected() {
        let soft = crate::soft::SoftBackend::new(8, 8);
        let mut renderer = Renderer::new(Box::new(soft), 8, 8);
        let mut text = TextSystem::new();

        let result =
            text.load_font_from_bytes(&mut renderer, "junk.ttf", vec![0u8; 64], 16.0);
        assert!(result.is_none());
    }

    #[test]
    fn test_glyph_emission() {
        let mut buffer = Vec::new();

        // Empty quad (a space): nothing emitted.
        let space = Glyph {
            s0: 4,
            t0: 4,
            s1: 4,
            t1: 4,
            x_advance: 5.0,
            y_advance: 0.0,
            x_bearing: 0.0,
            y_bearing: 0.0,
        };
        emit_glyph(&mut buffer, &space, 64.0, 64.0, 16.0, 0.0, 0.0);
        assert!(buffer.is_empty());

        // A real 8x8 glyph emits six 4-float vertices.
        let glyph = Glyph {
            s0: 4,
            t0: 4,
            s1: 12,
            t1: 12,
            x_advance: 9.0,
            y_advance: 0.0,
            x_bearing: 1.0,
            y_bearing: 8.0,
        };
        emit_glyph(&mut buffer, &glyph, 64.0, 64.0, 16.0, 10.0, 20.0);

        assert_eq!(buffer.len(), 24);
        // First vertex: pen + bearing, baseline math applied.
        assert_eq!(buffer[0], 11.0); // 10 + x_bearing
        assert_eq!(buffer[1], 28.0); // 20 - y_bearing + font_height
        // UVs normalized to the atlas.
        assert_eq!(buffer[2], 4.0 / 64.0);
        assert_eq!(buffer[3], 4.0 / 64.0);
    }
}
