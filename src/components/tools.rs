use egui::{Pos2, Rect, pos2};
use image::{Rgba, RgbaImage};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::canvas::blend_over;
use crate::components::selection::{SelectionClip, SelectionKind};

// ============================================================================
// TOOL KIND
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ToolKind {
    #[default]
    Brush,
    Eraser,
    Fill,
    Eyedropper,
    Line,
    Rectangle,
    Circle,
    RectSelect,
    EllipseSelect,
    Lasso,
    SelectionMove,
    Text,
    Gradient,
    MagicWand,
}

impl ToolKind {
    pub fn all() -> &'static [ToolKind] {
        &[
            ToolKind::Brush,
            ToolKind::Eraser,
            ToolKind::Fill,
            ToolKind::Eyedropper,
            ToolKind::Line,
            ToolKind::Rectangle,
            ToolKind::Circle,
            ToolKind::RectSelect,
            ToolKind::EllipseSelect,
            ToolKind::Lasso,
            ToolKind::SelectionMove,
            ToolKind::Text,
            ToolKind::Gradient,
            ToolKind::MagicWand,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::Brush => "Brush",
            ToolKind::Eraser => "Eraser",
            ToolKind::Fill => "Fill",
            ToolKind::Eyedropper => "Eyedropper",
            ToolKind::Line => "Line",
            ToolKind::Rectangle => "Rectangle",
            ToolKind::Circle => "Circle",
            ToolKind::RectSelect => "Rectangle Select",
            ToolKind::EllipseSelect => "Ellipse Select",
            ToolKind::Lasso => "Lasso",
            ToolKind::SelectionMove => "Move Selection",
            ToolKind::Text => "Text",
            ToolKind::Gradient => "Gradient",
            ToolKind::MagicWand => "Magic Wand",
        }
    }

    /// Selection kind driven by this tool, if it is a selection tool.
    pub fn selection_kind(&self) -> Option<SelectionKind> {
        match self {
            ToolKind::RectSelect | ToolKind::SelectionMove => Some(SelectionKind::Rectangle),
            ToolKind::EllipseSelect => Some(SelectionKind::Ellipse),
            ToolKind::Lasso => Some(SelectionKind::Lasso),
            _ => None,
        }
    }

    /// Tools that commit a primitive on release.
    pub fn is_shape(&self) -> bool {
        matches!(self, ToolKind::Line | ToolKind::Rectangle | ToolKind::Circle)
    }
}

// ============================================================================
// FLOOD FILL / MAGIC WAND
// ============================================================================

/// Max per-channel difference; two fully transparent pixels always match.
#[inline(always)]
fn matches(p: [u8; 4], target: [u8; 4], tolerance: u8) -> bool {
    if p[3] == 0 && target[3] == 0 {
        return true;
    }
    (0..4).all(|c| p[c].abs_diff(target[c]) <= tolerance)
}

/// 4-connected scanline fill over `surface`, comparing against the seed pixel.
/// Returns a `width*height` mask (255 = matched) and the matched bounding box
/// `(min_x, min_y, max_x, max_y)`, inclusive.
pub fn flood_mask(surface: &RgbaImage, x: u32, y: u32, tolerance: u8) -> (Vec<u8>, Option<(u32, u32, u32, u32)>) {
    let (w, h) = surface.dimensions();
    let wu = w as usize;
    let mut mask = vec![0u8; wu * h as usize];
    if x >= w || y >= h {
        return (mask, None);
    }

    let raw = surface.as_raw();
    let pix = |idx: usize| -> [u8; 4] {
        let o = idx * 4;
        [raw[o], raw[o + 1], raw[o + 2], raw[o + 3]]
    };
    let target = surface.get_pixel(x, y).0;
    let fits = |mask: &[u8], idx: usize| mask[idx] == 0 && matches(pix(idx), target, tolerance);

    let (mut min_x, mut min_y, mut max_x, mut max_y) = (x, y, x, y);
    let mut stack: Vec<(u32, u32)> = Vec::with_capacity(256);
    stack.push((x, y));

    while let Some((sx, sy)) = stack.pop() {
        let row = sy as usize * wu;
        if !fits(&mask, row + sx as usize) {
            continue;
        }
        // Widen to the full run on this row.
        let mut left = sx;
        while left > 0 && fits(&mask, row + left as usize - 1) {
            left -= 1;
        }
        let mut right = sx;
        while right + 1 < w && fits(&mask, row + right as usize + 1) {
            right += 1;
        }
        for i in left..=right {
            mask[row + i as usize] = 255;
        }
        min_x = min_x.min(left);
        max_x = max_x.max(right);
        min_y = min_y.min(sy);
        max_y = max_y.max(sy);

        // Seed one point per run in the rows above and below.
        for ny in [sy.checked_sub(1), (sy + 1 < h).then_some(sy + 1)].into_iter().flatten() {
            let nrow = ny as usize * wu;
            let mut in_run = false;
            for i in left..=right {
                let ok = fits(&mask, nrow + i as usize);
                if ok && !in_run {
                    stack.push((i, ny));
                }
                in_run = ok;
            }
        }
    }
    (mask, Some((min_x, min_y, max_x, max_y)))
}

/// Replace the contiguous region exactly matching the pixel at `(x, y)` with
/// `color`.  Returns the filled bounding box, or `None` when nothing changed
/// (seed off-canvas, or the region is already `color`).
pub fn flood_fill(surface: &mut RgbaImage, x: u32, y: u32, color: Rgba<u8>) -> Option<(u32, u32, u32, u32)> {
    if x >= surface.width() || y >= surface.height() {
        return None;
    }
    if *surface.get_pixel(x, y) == color {
        return None;
    }
    let (mask, bbox) = flood_mask(surface, x, y, 0);
    let (_, y0, _, y1) = bbox?;
    let wu = surface.width() as usize;
    let row_bytes = wu * 4;
    surface
        .as_mut()
        .par_chunks_mut(row_bytes)
        .enumerate()
        .skip(y0 as usize)
        .take((y1 - y0 + 1) as usize)
        .for_each(|(row, buf)| {
            let m = &mask[row * wu..(row + 1) * wu];
            for (i, &hit) in m.iter().enumerate() {
                if hit != 0 {
                    buf[i * 4..i * 4 + 4].copy_from_slice(&color.0);
                }
            }
        });
    bbox
}

/// Minimal rectangle around every pixel 4-connected to the seed and within
/// `tolerance` of it.  Pixels are not modified.
pub fn magic_wand(surface: &RgbaImage, x: u32, y: u32, tolerance: u8) -> Option<Rect> {
    let (_, bbox) = flood_mask(surface, x, y, tolerance);
    let (x0, y0, x1, y1) = bbox?;
    Some(Rect::from_min_max(
        pos2(x0 as f32, y0 as f32),
        pos2((x1 + 1) as f32, (y1 + 1) as f32),
    ))
}

/// Pixel under a canvas point, or `None` outside the surface.
pub fn pick_color(surface: &RgbaImage, p: Pos2) -> Option<Rgba<u8>> {
    if p.x < 0.0 || p.y < 0.0 {
        return None;
    }
    let (x, y) = (p.x.floor() as u32, p.y.floor() as u32);
    (x < surface.width() && y < surface.height()).then(|| *surface.get_pixel(x, y))
}

// ============================================================================
// GRADIENT
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GradientStyle {
    #[default]
    Linear,
    /// Radius is the drag distance.
    Radial,
    /// Mirror-tiled linear ramp.
    Reflected,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GradientStop {
    /// 0.0 = start, 1.0 = end.
    pub position: f32,
    pub color: Rgba<u8>,
}

impl GradientStop {
    pub fn new(position: f32, color: Rgba<u8>) -> Self {
        Self { position: position.clamp(0.0, 1.0), color }
    }
}

/// Stops sorted by position plus a 256-entry lookup table.
#[derive(Clone, Debug)]
pub struct Gradient {
    pub style: GradientStyle,
    stops: Vec<GradientStop>,
    lut: Vec<[u8; 4]>,
}

impl Gradient {
    /// Fewer than two stops falls back to `primary -> secondary`.
    pub fn new(style: GradientStyle, stops: Vec<GradientStop>, primary: Rgba<u8>, secondary: Rgba<u8>) -> Self {
        let mut stops = if stops.len() < 2 {
            vec![GradientStop::new(0.0, primary), GradientStop::new(1.0, secondary)]
        } else {
            stops
        };
        stops.sort_by(|a, b| a.position.total_cmp(&b.position));
        let mut g = Self { style, stops, lut: Vec::new() };
        g.rebuild_lut();
        g
    }

    pub fn two_color(style: GradientStyle, primary: Rgba<u8>, secondary: Rgba<u8>) -> Self {
        Self::new(style, Vec::new(), primary, secondary)
    }

    pub fn stops(&self) -> &[GradientStop] {
        &self.stops
    }

    fn rebuild_lut(&mut self) {
        let stops = &self.stops;
        let first = stops[0];
        let last = stops[stops.len() - 1];
        self.lut = (0..256)
            .map(|i| {
                let t = i as f32 / 255.0;
                if t <= first.position {
                    return first.color.0;
                }
                if t >= last.position {
                    return last.color.0;
                }
                let j = stops
                    .windows(2)
                    .position(|w| w[0].position <= t && w[1].position >= t)
                    .unwrap_or(0);
                let (l, r) = (stops[j], stops[j + 1]);
                let span = r.position - l.position;
                let local = if span > 0.0 { (t - l.position) / span } else { 0.0 };
                let mut out = [0u8; 4];
                for c in 0..4 {
                    out[c] = (l.color[c] as f32 * (1.0 - local) + r.color[c] as f32 * local).round() as u8;
                }
                out
            })
            .collect();
    }

    #[inline(always)]
    pub fn sample(&self, t: f32) -> Rgba<u8> {
        let idx = (t.clamp(0.0, 1.0) * 255.0).round() as usize;
        Rgba(self.lut[idx])
    }

    /// Gradient parameter for canvas point `p` given the drag `a -> b`.
    #[inline(always)]
    pub fn compute_t(&self, p: Pos2, a: Pos2, b: Pos2) -> f32 {
        let d = b - a;
        let len_sq = d.length_sq();
        if len_sq < 1e-6 {
            return 0.0;
        }
        match self.style {
            GradientStyle::Linear => ((p - a).dot(d) / len_sq).clamp(0.0, 1.0),
            GradientStyle::Reflected => {
                let t = ((p - a).dot(d) / len_sq).rem_euclid(2.0);
                if t > 1.0 { 2.0 - t } else { t }
            }
            GradientStyle::Radial => ((p - a).length() / len_sq.sqrt()).clamp(0.0, 1.0),
        }
    }

    /// Source-over the gradient onto `surface`, restricted to `clip` when
    /// given, otherwise covering the whole surface.
    pub fn render(&self, surface: &mut RgbaImage, a: Pos2, b: Pos2, clip: Option<&SelectionClip>) {
        let (w, h) = surface.dimensions();
        let area = clip.map_or(Rect::from_min_max(Pos2::ZERO, pos2(w as f32, h as f32)), |c| c.bounds());
        let Some((x0, y0, x1, y1)) = crate::ops::transform::pixel_bounds(area, w, h) else {
            return;
        };
        let row_bytes = w as usize * 4;
        surface
            .as_mut()
            .par_chunks_mut(row_bytes)
            .enumerate()
            .skip(y0 as usize)
            .take((y1 - y0) as usize)
            .for_each(|(y, row)| {
                for x in x0..x1 {
                    if clip.is_some_and(|c| !c.contains_pixel(x, y as u32)) {
                        continue;
                    }
                    let p = pos2(x as f32 + 0.5, y as f32 + 0.5);
                    let top = self.sample(self.compute_t(p, a, b));
                    let o = x as usize * 4;
                    let base = Rgba([row[o], row[o + 1], row[o + 2], row[o + 3]]);
                    row[o..o + 4].copy_from_slice(&blend_over(base, top).0);
                }
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

    #[test]
    fn test_flood_fill_blank_canvas() {
        let mut img = RgbaImage::new(100, 100);
        assert_eq!(flood_fill(&mut img, 50, 50, RED), Some((0, 0, 99, 99)));
        assert!(img.pixels().all(|p| *p == RED));
    }

    #[test]
    fn test_flood_fill_idempotent() {
        let mut img = RgbaImage::from_pixel(20, 20, RED);
        let before = img.clone();
        assert_eq!(flood_fill(&mut img, 5, 5, RED), None);
        assert_eq!(img, before);
    }

    #[test]
    fn test_flood_fill_stops_at_walls() {
        // Vertical wall at x = 10 splits the canvas.
        let mut img = RgbaImage::from_pixel(20, 10, WHITE);
        for y in 0..10 {
            img.put_pixel(10, y, BLACK);
        }
        flood_fill(&mut img, 2, 2, RED);
        assert_eq!(*img.get_pixel(9, 9), RED);
        assert_eq!(*img.get_pixel(10, 5), BLACK);
        assert_eq!(*img.get_pixel(11, 0), WHITE);
    }

    #[test]
    fn test_flood_fill_is_exact_match() {
        let mut img = RgbaImage::from_pixel(10, 1, WHITE);
        img.put_pixel(5, 0, Rgba([254, 255, 255, 255]));
        flood_fill(&mut img, 0, 0, RED);
        assert_eq!(*img.get_pixel(4, 0), RED);
        assert_eq!(*img.get_pixel(6, 0), WHITE);
    }

    #[test]
    fn test_flood_fill_out_of_bounds() {
        let mut img = RgbaImage::new(10, 10);
        assert_eq!(flood_fill(&mut img, 10, 0, RED), None);
    }

    #[test]
    fn test_magic_wand_minimal_rect_and_connectivity() {
        // Two red blocks; only the one touching the seed counts.
        let mut img = RgbaImage::from_pixel(50, 50, WHITE);
        for y in 10..20 {
            for x in 5..25 {
                img.put_pixel(x, y, Rgba([250, 10, 5, 255]));
            }
        }
        for y in 30..40 {
            for x in 30..40 {
                img.put_pixel(x, y, RED);
            }
        }
        let rect = magic_wand(&img, 12, 12, 32).unwrap();
        assert_eq!(rect, Rect::from_min_max(pos2(5.0, 10.0), pos2(25.0, 20.0)));

        // Every tolerance match inside the box is reachable from the seed.
        let (mask, _) = flood_mask(&img, 12, 12, 32);
        let seed = img.get_pixel(12, 12).0;
        for y in 10..20u32 {
            for x in 5..25u32 {
                if matches(img.get_pixel(x, y).0, seed, 32) {
                    assert_eq!(mask[(y * 50 + x) as usize], 255);
                }
            }
        }
        assert_eq!(mask[(35 * 50 + 35) as usize], 0);
    }

    #[test]
    fn test_magic_wand_leaves_pixels() {
        let img = RgbaImage::from_pixel(10, 10, RED);
        let before = img.clone();
        assert!(magic_wand(&img, 0, 0, 32).is_some());
        assert_eq!(img, before);
        assert!(magic_wand(&img, 99, 0, 32).is_none());
    }

    #[test]
    fn test_pick_color() {
        let mut img = RgbaImage::new(4, 4);
        img.put_pixel(2, 3, RED);
        assert_eq!(pick_color(&img, pos2(2.7, 3.1)), Some(RED));
        assert_eq!(pick_color(&img, pos2(-0.5, 1.0)), None);
        assert_eq!(pick_color(&img, pos2(4.0, 1.0)), None);
    }

    #[test]
    fn test_gradient_lut_and_styles() {
        let g = Gradient::two_color(GradientStyle::Linear, BLACK, WHITE);
        assert_eq!(g.sample(0.0), BLACK);
        assert_eq!(g.sample(1.0), WHITE);
        assert_eq!(g.sample(0.5)[0], 128);

        let (a, b) = (pos2(0.0, 0.0), pos2(10.0, 0.0));
        assert_eq!(g.compute_t(pos2(-5.0, 0.0), a, b), 0.0);
        assert_eq!(g.compute_t(pos2(15.0, 0.0), a, b), 1.0);

        let r = Gradient::two_color(GradientStyle::Reflected, BLACK, WHITE);
        assert!((r.compute_t(pos2(15.0, 0.0), a, b) - 0.5).abs() < 1e-5);

        let rad = Gradient::two_color(GradientStyle::Radial, BLACK, WHITE);
        assert!((rad.compute_t(pos2(0.0, 5.0), a, b) - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_gradient_stops_are_sorted() {
        let g = Gradient::new(
            GradientStyle::Linear,
            vec![GradientStop::new(1.0, WHITE), GradientStop::new(0.0, RED), GradientStop::new(0.5, BLACK)],
            BLACK,
            WHITE,
        );
        assert_eq!(g.stops()[0].color, RED);
        assert_eq!(g.stops()[1].color, BLACK);
        assert_eq!(g.sample(0.0), RED);
        assert_eq!(g.sample(1.0), WHITE);
    }

    #[test]
    fn test_gradient_render_clipped() {
        let mut img = RgbaImage::new(20, 20);
        let g = Gradient::two_color(GradientStyle::Linear, BLACK, WHITE);
        let clip = SelectionClip::Rect(Rect::from_min_max(pos2(0.0, 0.0), pos2(10.0, 10.0)));
        g.render(&mut img, pos2(0.0, 0.0), pos2(20.0, 0.0), Some(&clip));
        assert_eq!(img.get_pixel(5, 5)[3], 255);
        assert_eq!(img.get_pixel(15, 15)[3], 0);

        let mut full = RgbaImage::new(20, 20);
        g.render(&mut full, pos2(0.0, 0.0), pos2(20.0, 0.0), None);
        assert!(full.pixels().all(|p| p[3] == 255));
        assert!(full.get_pixel(0, 0)[0] < full.get_pixel(19, 0)[0]);
    }
}
