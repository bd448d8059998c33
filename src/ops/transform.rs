// ============================================================================
// TRANSFORM OPERATIONS - region copy, clear, and rotate/scale blits
// ============================================================================

use egui::Rect;
use image::{Rgba, RgbaImage};
use rayon::prelude::*;

use crate::canvas::{BlendMode, blend_image_onto, blend_over, copy_region};

/// Integer pixel rectangle `[x0, x1) x [y0, y1)` of `rect` clipped to a `w`x`h` surface.
pub fn pixel_bounds(rect: Rect, w: u32, h: u32) -> Option<(u32, u32, u32, u32)> {
    let x0 = rect.min.x.floor().max(0.0) as i64;
    let y0 = rect.min.y.floor().max(0.0) as i64;
    let x1 = (rect.max.x.ceil() as i64).min(w as i64);
    let y1 = (rect.max.y.ceil() as i64).min(h as i64);
    if x0 >= x1 || y0 >= y1 {
        return None;
    }
    Some((x0 as u32, y0 as u32, x1 as u32, y1 as u32))
}

/// Copy the pixels under `rect` into a new image the size of `rect`.
/// Parts of `rect` that fall outside `src` come back transparent.
pub fn extract_region(src: &RgbaImage, rect: Rect) -> Option<RgbaImage> {
    let x = rect.min.x.floor() as i64;
    let y = rect.min.y.floor() as i64;
    let w = rect.width().round() as i64;
    let h = rect.height().round() as i64;
    if w <= 0 || h <= 0 {
        return None;
    }
    let mut out = RgbaImage::new(w as u32, h as u32);
    copy_region(src, &mut out, -x, -y);
    Some(out)
}

/// Set every pixel under `rect` to `color` (no blending).
pub fn fill_rect(img: &mut RgbaImage, rect: Rect, color: Rgba<u8>) {
    let Some((x0, y0, x1, y1)) = pixel_bounds(rect, img.width(), img.height()) else {
        return;
    };
    let row_bytes = img.width() as usize * 4;
    img.as_mut()
        .par_chunks_mut(row_bytes)
        .enumerate()
        .skip(y0 as usize)
        .take((y1 - y0) as usize)
        .for_each(|(_, row)| {
            for x in x0..x1 {
                let o = x as usize * 4;
                row[o..o + 4].copy_from_slice(&color.0);
            }
        });
}

/// Draw `content` stretched to fill `bounds` and rotated by `rotation_deg`
/// about the centre of `bounds`, composited source-over onto `dest`.
pub fn draw_transformed(dest: &mut RgbaImage, content: &RgbaImage, bounds: Rect, rotation_deg: f32) {
    let (cw, ch) = content.dimensions();
    if cw == 0 || ch == 0 || bounds.width() <= 0.0 || bounds.height() <= 0.0 {
        return;
    }

    // Unrotated, unscaled, integer-aligned: plain blit.
    let aligned = bounds.min.x.fract() == 0.0 && bounds.min.y.fract() == 0.0;
    if rotation_deg.rem_euclid(360.0) == 0.0
        && aligned
        && bounds.width() == cw as f32
        && bounds.height() == ch as f32
    {
        blend_image_onto(
            dest,
            content,
            bounds.min.x as i64,
            bounds.min.y as i64,
            BlendMode::Normal,
            1.0,
        );
        return;
    }

    let center = bounds.center();
    let (sin, cos) = rotation_deg.to_radians().sin_cos();
    let half_w = bounds.width() * 0.5;
    let half_h = bounds.height() * 0.5;
    let scale_x = cw as f32 / bounds.width();
    let scale_y = ch as f32 / bounds.height();

    // Axis-aligned box around the rotated rectangle.
    let ex = half_w * cos.abs() + half_h * sin.abs();
    let ey = half_w * sin.abs() + half_h * cos.abs();
    let cover = Rect::from_center_size(center, egui::vec2(ex * 2.0 + 2.0, ey * 2.0 + 2.0));
    let Some((x0, y0, x1, y1)) = pixel_bounds(cover, dest.width(), dest.height()) else {
        return;
    };

    let row_bytes = dest.width() as usize * 4;
    dest.as_mut()
        .par_chunks_mut(row_bytes)
        .enumerate()
        .skip(y0 as usize)
        .take((y1 - y0) as usize)
        .for_each(|(y, row)| {
            let py = y as f32 + 0.5 - center.y;
            for x in x0..x1 {
                let px = x as f32 + 0.5 - center.x;
                // Inverse rotation back into the unrotated bounds frame.
                let u = px * cos + py * sin + half_w;
                let v = -px * sin + py * cos + half_h;
                if u < 0.0 || v < 0.0 || u > bounds.width() || v > bounds.height() {
                    continue;
                }
                let sample = bilinear_sample(content, u * scale_x - 0.5, v * scale_y - 0.5);
                if sample[3] == 0 {
                    continue;
                }
                let o = x as usize * 4;
                let base = Rgba([row[o], row[o + 1], row[o + 2], row[o + 3]]);
                row[o..o + 4].copy_from_slice(&blend_over(base, sample).0);
            }
        });
}

/// Bilinear interpolation sampling; samples are clamped to the image edge.
pub fn bilinear_sample(img: &RgbaImage, x: f32, y: f32) -> Rgba<u8> {
    let max_x = img.width() as f32 - 1.0;
    let max_y = img.height() as f32 - 1.0;
    let x = x.clamp(0.0, max_x);
    let y = y.clamp(0.0, max_y);
    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(img.width() - 1);
    let y1 = (y0 + 1).min(img.height() - 1);
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let sample = |sx: u32, sy: u32| -> [f32; 4] {
        let p = img.get_pixel(sx, sy);
        [p[0] as f32, p[1] as f32, p[2] as f32, p[3] as f32]
    };

    let tl = sample(x0, y0);
    let tr = sample(x1, y0);
    let bl = sample(x0, y1);
    let br = sample(x1, y1);

    let lerp = |a: f32, b: f32, t: f32| a + (b - a) * t;
    let mut out = [0u8; 4];
    for c in 0..4 {
        let top = lerp(tl[c], tr[c], fx);
        let bot = lerp(bl[c], br[c], fx);
        out[c] = lerp(top, bot, fy).round().clamp(0.0, 255.0) as u8;
    }
    Rgba(out)
}
