//! Text measurement and stamping for the in-process backend.
//!
//! A [`TextRenderer`] turns a string into a coverage mask whose size is the
//! ink bounding box of the rendered text. Outline fonts come from the system
//! font database; glyph outlines are flattened to line segments and filled
//! with a non-zero winding scanline rasteriser at 4×4 supersampling. When no
//! font is available the built-in bitmap face is scaled to the font size.

use super::bitmap_font::{self, GLYPH_HEIGHT, GLYPH_WIDTH};
use crate::config::AttributionSpec;
use crate::error::AttributionError;
use image::{Rgb, RgbImage};
use tracing::{debug, warn};

/// Families tried in order before falling back to any installed face.
const PREFERRED_FAMILIES: &[&str] = &["DejaVu Sans", "Helvetica", "Arial", "Liberation Sans"];

const SUBSAMPLES: usize = 4;
const CURVE_STEPS: usize = 8;

/// Greyscale ink coverage of rendered text, cropped to the ink bounding box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextMask {
    pub width: u32,
    pub height: u32,
    coverage: Vec<u8>,
}

impl TextMask {
    fn empty() -> Self {
        Self {
            width: 0,
            height: 0,
            coverage: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Coverage at (`x`, `y`), 0 = none, 255 = full ink.
    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.coverage[(y * self.width + x) as usize]
    }
}

/// A parsed outline font kept as owned bytes.
#[derive(Debug, Clone)]
pub struct OutlineFont {
    family: String,
    data: Vec<u8>,
    index: u32,
}

/// Source of glyph shapes for stamping.
#[derive(Debug, Clone)]
pub enum TextRenderer {
    Outline(OutlineFont),
    Bitmap,
}

impl TextRenderer {
    /// Resolve a face from the system font database, else the built-in face.
    pub fn from_system_fonts() -> Self {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();

        let families: Vec<fontdb::Family<'_>> = PREFERRED_FAMILIES
            .iter()
            .map(|&name| fontdb::Family::Name(name))
            .chain(std::iter::once(fontdb::Family::SansSerif))
            .collect();
        let query = fontdb::Query {
            families: &families,
            weight: fontdb::Weight::NORMAL,
            stretch: fontdb::Stretch::Normal,
            style: fontdb::Style::Normal,
        };

        let id = db.query(&query).or_else(|| db.faces().next().map(|f| f.id));
        let Some(id) = id else {
            warn!("No system fonts found, using built-in bitmap font");
            return TextRenderer::Bitmap;
        };

        let family = db
            .face(id)
            .and_then(|f| f.families.first().map(|(name, _)| name.clone()))
            .unwrap_or_else(|| "unknown".to_string());

        match db.with_face_data(id, |data, index| (data.to_vec(), index)) {
            Some((data, index)) => match Self::from_font_data(family.clone(), data, index) {
                Ok(r) => {
                    debug!("Attribution font: {}", family);
                    r
                }
                Err(e) => {
                    warn!("{}; using built-in bitmap font", e);
                    TextRenderer::Bitmap
                }
            },
            None => {
                warn!("Font '{}' could not be read, using built-in bitmap font", family);
                TextRenderer::Bitmap
            }
        }
    }

    /// Use the given font file bytes.
    pub fn from_font_data(
        family: impl Into<String>,
        data: Vec<u8>,
        index: u32,
    ) -> Result<Self, AttributionError> {
        let family = family.into();
        ttf_parser::Face::parse(&data, index)
            .map_err(|e| AttributionError::Font(format!("cannot parse '{family}': {e}")))?;
        Ok(TextRenderer::Outline(OutlineFont {
            family,
            data,
            index,
        }))
    }

    /// Human-readable face name for logs.
    pub fn family(&self) -> &str {
        match self {
            TextRenderer::Outline(f) => &f.family,
            TextRenderer::Bitmap => "built-in 5x7",
        }
    }

    /// Render `text` at `size` pixels per em.
    pub fn render(&self, text: &str, size: u32) -> TextMask {
        match self {
            TextRenderer::Outline(font) => render_outline(font, text, size as f32),
            TextRenderer::Bitmap => render_bitmap(text, size),
        }
    }
}

/// Stamp the attribution onto a copy of `img`.
///
/// The ink box is anchored at `(padding, height - text_height - padding)`;
/// black is drawn there and white at the anchor plus the shadow offset.
/// Text that does not fit is clipped.
pub fn stamp(img: &RgbImage, spec: &AttributionSpec, renderer: &TextRenderer) -> RgbImage {
    let mut out = img.clone();
    let mask = renderer.render(&spec.text, spec.font_size);
    if mask.is_empty() {
        return out;
    }

    let x = spec.padding as i64;
    let y = img.height() as i64 - mask.height as i64 - spec.padding as i64;
    let (dx, dy) = spec.shadow_offset;

    debug!(
        "Stamping '{}' ({}x{} px) at ({}, {}) on {}x{}",
        spec.text,
        mask.width,
        mask.height,
        x,
        y,
        img.width(),
        img.height()
    );

    blit(&mut out, &mask, x, y, Rgb([0, 0, 0]));
    blit(&mut out, &mask, x + dx as i64, y + dy as i64, Rgb([255, 255, 255]));
    out
}

fn blit(img: &mut RgbImage, mask: &TextMask, ox: i64, oy: i64, color: Rgb<u8>) {
    let (w, h) = (img.width() as i64, img.height() as i64);
    for my in 0..mask.height {
        let y = oy + my as i64;
        if y < 0 || y >= h {
            continue;
        }
        for mx in 0..mask.width {
            let x = ox + mx as i64;
            if x < 0 || x >= w {
                continue;
            }
            let a = mask.get(mx, my) as u32;
            if a == 0 {
                continue;
            }
            let px = img.get_pixel_mut(x as u32, y as u32);
            for c in 0..3 {
                px[c] = ((px[c] as u32 * (255 - a) + color[c] as u32 * a + 127) / 255) as u8;
            }
        }
    }
}

// ── Bitmap face ──────────────────────────────────────────────────────────

fn render_bitmap(text: &str, size: u32) -> TextMask {
    let scale = (size / (GLYPH_HEIGHT + 1)).max(1);
    let advance = (GLYPH_WIDTH + 1) * scale;
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return TextMask::empty();
    }

    let full_w = advance * chars.len() as u32;
    let full_h = GLYPH_HEIGHT * scale;
    let mut cov = vec![0u8; (full_w * full_h) as usize];
    for (i, &c) in chars.iter().enumerate() {
        let x0 = i as u32 * advance;
        for col in 0..GLYPH_WIDTH {
            for row in 0..GLYPH_HEIGHT {
                if !bitmap_font::is_set(c, col, row) {
                    continue;
                }
                for sy in 0..scale {
                    for sx in 0..scale {
                        let x = x0 + col * scale + sx;
                        let y = row * scale + sy;
                        cov[(y * full_w + x) as usize] = 255;
                    }
                }
            }
        }
    }
    crop(full_w, full_h, cov)
}

/// Crop a coverage buffer to its non-zero bounding box.
fn crop(w: u32, h: u32, cov: Vec<u8>) -> TextMask {
    let mut min_x = u32::MAX;
    let mut min_y = u32::MAX;
    let mut max_x = 0;
    let mut max_y = 0;
    for y in 0..h {
        for x in 0..w {
            if cov[(y * w + x) as usize] != 0 {
                min_x = min_x.min(x);
                min_y = min_y.min(y);
                max_x = max_x.max(x);
                max_y = max_y.max(y);
            }
        }
    }
    if min_x == u32::MAX {
        return TextMask::empty();
    }
    let cw = max_x - min_x + 1;
    let ch = max_y - min_y + 1;
    let mut coverage = Vec::with_capacity((cw * ch) as usize);
    for y in min_y..=max_y {
        let row = (y * w) as usize;
        coverage.extend_from_slice(&cov[row + min_x as usize..=row + max_x as usize]);
    }
    TextMask {
        width: cw,
        height: ch,
        coverage,
    }
}

// ── Outline face ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct Segment {
    x0: f32,
    y0: f32,
    x1: f32,
    y1: f32,
}

/// Flattens glyph outlines into pixel-space line segments.
struct SegmentCollector {
    segments: Vec<Segment>,
    origin_x: f32,
    baseline: f32,
    scale: f32,
    start: (f32, f32),
    last: (f32, f32),
}

impl SegmentCollector {
    fn map(&self, x: f32, y: f32) -> (f32, f32) {
        (self.origin_x + x * self.scale, self.baseline - y * self.scale)
    }

    fn push_line(&mut self, to: (f32, f32)) {
        let from = self.last;
        if from != to {
            self.segments.push(Segment {
                x0: from.0,
                y0: from.1,
                x1: to.0,
                y1: to.1,
            });
        }
        self.last = to;
    }
}

impl ttf_parser::OutlineBuilder for SegmentCollector {
    fn move_to(&mut self, x: f32, y: f32) {
        let p = self.map(x, y);
        self.start = p;
        self.last = p;
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let p = self.map(x, y);
        self.push_line(p);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let p0 = self.last;
        let c = self.map(x1, y1);
        let p = self.map(x, y);
        for i in 1..=CURVE_STEPS {
            let t = i as f32 / CURVE_STEPS as f32;
            let mt = 1.0 - t;
            let px = mt * mt * p0.0 + 2.0 * mt * t * c.0 + t * t * p.0;
            let py = mt * mt * p0.1 + 2.0 * mt * t * c.1 + t * t * p.1;
            self.push_line((px, py));
        }
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let p0 = self.last;
        let c1 = self.map(x1, y1);
        let c2 = self.map(x2, y2);
        let p = self.map(x, y);
        for i in 1..=CURVE_STEPS {
            let t = i as f32 / CURVE_STEPS as f32;
            let mt = 1.0 - t;
            let a = mt * mt * mt;
            let b = 3.0 * mt * mt * t;
            let c = 3.0 * mt * t * t;
            let d = t * t * t;
            let px = a * p0.0 + b * c1.0 + c * c2.0 + d * p.0;
            let py = a * p0.1 + b * c1.1 + c * c2.1 + d * p.1;
            self.push_line((px, py));
        }
    }

    fn close(&mut self) {
        let start = self.start;
        self.push_line(start);
    }
}

fn render_outline(font: &OutlineFont, text: &str, size: f32) -> TextMask {
    let Ok(face) = ttf_parser::Face::parse(&font.data, font.index) else {
        return render_bitmap(text, size as u32);
    };
    let scale = size / face.units_per_em() as f32;

    let mut collector = SegmentCollector {
        segments: Vec::new(),
        origin_x: 0.0,
        baseline: face.ascender() as f32 * scale,
        scale,
        start: (0.0, 0.0),
        last: (0.0, 0.0),
    };

    let mut pen = 0.0f32;
    for c in text.chars() {
        let gid = face.glyph_index(c).unwrap_or(ttf_parser::GlyphId(0));
        collector.origin_x = pen;
        face.outline_glyph(gid, &mut collector);
        pen += face.glyph_hor_advance(gid).unwrap_or(0) as f32 * scale;
    }

    fill_segments(&collector.segments)
}

/// Non-zero winding scanline fill, cropped to the ink box.
fn fill_segments(segments: &[Segment]) -> TextMask {
    if segments.is_empty() {
        return TextMask::empty();
    }

    let (mut min_x, mut min_y) = (f32::MAX, f32::MAX);
    let (mut max_x, mut max_y) = (f32::MIN, f32::MIN);
    for s in segments {
        min_x = min_x.min(s.x0.min(s.x1));
        max_x = max_x.max(s.x0.max(s.x1));
        min_y = min_y.min(s.y0.min(s.y1));
        max_y = max_y.max(s.y0.max(s.y1));
    }
    let ox = min_x.floor();
    let oy = min_y.floor();
    let w = (max_x.ceil() - ox).max(1.0) as usize;
    let h = (max_y.ceil() - oy).max(1.0) as usize;

    let sub = SUBSAMPLES as f32;
    let mut acc = vec![0u16; w * h];
    let mut crossings: Vec<(f32, i32)> = Vec::new();

    for row in 0..h * SUBSAMPLES {
        let sy = oy + (row as f32 + 0.5) / sub;
        crossings.clear();
        for s in segments {
            if s.y0 == s.y1 {
                continue;
            }
            let (lo, hi) = if s.y0 < s.y1 { (s.y0, s.y1) } else { (s.y1, s.y0) };
            if sy < lo || sy >= hi {
                continue;
            }
            let x = s.x0 + (sy - s.y0) * (s.x1 - s.x0) / (s.y1 - s.y0);
            let dir = if s.y1 > s.y0 { 1 } else { -1 };
            crossings.push((x - ox, dir));
        }
        crossings.sort_by(|a, b| a.0.total_cmp(&b.0));

        let py = row / SUBSAMPLES;
        let mut winding = 0;
        for pair in crossings.windows(2) {
            winding += pair[0].1;
            if winding == 0 {
                continue;
            }
            let start = (pair[0].0 * sub - 0.5).ceil().max(0.0) as usize;
            let end = ((pair[1].0 * sub - 0.5).ceil().max(0.0) as usize).min(w * SUBSAMPLES);
            for i in start..end {
                acc[py * w + i / SUBSAMPLES] += 1;
            }
        }
    }

    let max = (SUBSAMPLES * SUBSAMPLES) as u32;
    let cov: Vec<u8> = acc
        .into_iter()
        .map(|a| ((a as u32).min(max) * 255 / max) as u8)
        .collect();
    crop(w as u32, h as u32, cov)
}
