use ab_glyph::{Font, FontArc, GlyphId, ScaleFont, point};
use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

use super::PlacedRaster;
use crate::io::CoreError;

/// First baseline sits this many font sizes below the text origin.
const FIRST_BASELINE: f32 = 1.2;
/// Distance between consecutive baselines, in font sizes.
const LINE_ADVANCE: f32 = 1.3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TextAlignment {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextStyle {
    pub size: f32,
    pub color: Rgba<u8>,
    pub alignment: TextAlignment,
    pub underline: bool,
    pub strikethrough: bool,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            size: 24.0,
            color: Rgba([0, 0, 0, 255]),
            alignment: TextAlignment::Left,
            underline: false,
            strikethrough: false,
        }
    }
}

/// Parse TrueType/OpenType bytes.
pub fn load_font(bytes: Vec<u8>) -> Result<FontArc, CoreError> {
    FontArc::try_from_vec(bytes).map_err(|e| CoreError::Font(e.to_string()))
}

/// Lay out one line left-aligned at x = 0; returns glyphs and advance width.
fn layout_line(font: &FontArc, text: &str, size: f32) -> (Vec<(GlyphId, f32)>, f32) {
    let scaled = font.as_scaled(size);
    let mut glyphs = Vec::with_capacity(text.len());
    let mut cursor_x = 0.0f32;
    let mut last: Option<GlyphId> = None;
    for ch in text.chars() {
        let id = font.glyph_id(ch);
        if let Some(prev) = last {
            cursor_x += scaled.kern(prev, id);
        }
        glyphs.push((id, cursor_x));
        cursor_x += scaled.h_advance(id);
        last = Some(id);
    }
    (glyphs, cursor_x)
}

fn align_offset(alignment: TextAlignment, line_w: f32) -> f32 {
    match alignment {
        TextAlignment::Left => 0.0,
        TextAlignment::Center => -line_w * 0.5,
        TextAlignment::Right => -line_w,
    }
}

/// Rasterize (possibly multi-line) text whose top-left anchor is `origin`.
///
/// The result is clipped to a `canvas_w`x`canvas_h` canvas; `None` when nothing
/// visible was produced.
pub fn rasterize_text(
    font: &FontArc,
    text: &str,
    style: &TextStyle,
    origin: (f32, f32),
    canvas_w: u32,
    canvas_h: u32,
) -> Option<PlacedRaster> {
    let size = style.size.max(1.0);
    let (ox, oy) = origin;
    let w = canvas_w as usize;
    let h = canvas_h as usize;
    if w == 0 || h == 0 {
        return None;
    }

    // Full-canvas coverage; cropped to the touched box at the end.
    let mut coverage = vec![0.0f32; w * h];
    let mut touched: Option<(usize, usize, usize, usize)> = None;
    let mut mark = |x: i64, y: i64, cov: f32, coverage: &mut Vec<f32>| {
        if x < 0 || y < 0 || x as usize >= w || y as usize >= h || cov <= 0.001 {
            return;
        }
        let (x, y) = (x as usize, y as usize);
        let idx = y * w + x;
        coverage[idx] = coverage[idx].max(cov.min(1.0));
        touched = Some(match touched {
            None => (x, y, x, y),
            Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
        });
    };

    for (line_idx, line) in text.split('\n').enumerate() {
        let baseline = oy + size * FIRST_BASELINE + line_idx as f32 * size * LINE_ADVANCE;
        let (glyphs, line_w) = layout_line(font, line, size);
        let start_x = ox + align_offset(style.alignment, line_w);

        for (id, gx) in glyphs {
            let glyph = id.with_scale_and_position(size, point(start_x + gx, baseline));
            if let Some(outlined) = font.outline_glyph(glyph) {
                let bounds = outlined.px_bounds();
                outlined.draw(|px, py, cov| {
                    let x = bounds.min.x as i64 + px as i64;
                    let y = bounds.min.y as i64 + py as i64;
                    mark(x, y, cov, &mut coverage);
                });
            }
        }

        if line_w < 0.1 {
            continue;
        }
        let thickness = (size * 0.06).max(1.0);
        let mut decorations = Vec::new();
        if style.underline {
            decorations.push(baseline + size * 0.1);
        }
        if style.strikethrough {
            decorations.push(baseline - size * 0.3);
        }
        for line_y in decorations {
            let y0 = (line_y - thickness * 0.5).floor() as i64;
            let y1 = (line_y + thickness * 0.5).ceil() as i64;
            let x0 = start_x.floor() as i64;
            let x1 = (start_x + line_w).ceil() as i64;
            for y in y0..y1 {
                for x in x0..x1 {
                    mark(x, y, 1.0, &mut coverage);
                }
            }
        }
    }

    let (x0, y0, x1, y1) = touched?;
    let buf_w = (x1 - x0 + 1) as u32;
    let buf_h = (y1 - y0 + 1) as u32;
    let color = style.color;
    let pixels = RgbaImage::from_fn(buf_w, buf_h, |bx, by| {
        let cov = coverage[(y0 + by as usize) * w + x0 + bx as usize];
        if cov > 0.001 {
            let a = (color[3] as f32 * cov).round().min(255.0) as u8;
            Rgba([color[0], color[1], color[2], a])
        } else {
            Rgba([0, 0, 0, 0])
        }
    });
    Some(PlacedRaster { pixels, x: x0 as i64, y: y0 as i64 })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SYSTEM_FONT: &str = "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf";

    #[test]
    fn test_invalid_font_bytes() {
        let err = load_font(vec![1, 2, 3, 4]).unwrap_err();
        assert!(matches!(err, CoreError::Font(_)));
    }

    #[test]
    #[ignore = "needs DejaVuSans at /usr/share/fonts/truetype/dejavu"]
    fn test_text_lands_below_origin() {
        let bytes = std::fs::read(SYSTEM_FONT).unwrap();
        let font = load_font(bytes).unwrap();
        let style = TextStyle { size: 20.0, ..TextStyle::default() };
        let r = rasterize_text(&font, "Hi\nHi", &style, (10.0, 10.0), 200, 200).unwrap();
        assert!(r.x >= 10);
        assert!(r.y >= 10);
        // Two lines: second baseline is 26px below the first.
        assert!(r.pixels.height() > 26);
        assert!(r.pixels.pixels().any(|p| p[3] > 200));
    }

    #[test]
    #[ignore = "needs DejaVuSans at /usr/share/fonts/truetype/dejavu"]
    fn test_empty_text_is_none() {
        let bytes = std::fs::read(SYSTEM_FONT).unwrap();
        let font = load_font(bytes).unwrap();
        assert!(rasterize_text(&font, "", &TextStyle::default(), (0.0, 0.0), 50, 50).is_none());
    }
}
