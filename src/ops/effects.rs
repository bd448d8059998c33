// ============================================================================
// LAYER EFFECTS - drop shadow, outer glow, bevel
// ============================================================================
//
// Effects never touch the layer's own pixels.  They are rendered into a
// separate buffer that the compositor draws underneath the layer.

use image::{Rgba, RgbaImage};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::canvas::blend_over;

/// Alpha at or below which a pixel counts as empty for edge detection.
const EDGE_ALPHA: u8 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DropShadow {
    pub color: [u8; 4],
    pub offset_x: f32,
    pub offset_y: f32,
    pub blur: f32,
}

impl Default for DropShadow {
    fn default() -> Self {
        Self { color: [0, 0, 0, 128], offset_x: 5.0, offset_y: 5.0, blur: 5.0 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct OuterGlow {
    pub color: [u8; 4],
    pub size: f32,
}

impl Default for OuterGlow {
    fn default() -> Self {
        Self { color: [255, 255, 0, 128], size: 10.0 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BevelStyle {
    #[default]
    Emboss,
    Engrave,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bevel {
    pub style: BevelStyle,
    pub depth: f32,
}

impl Default for Bevel {
    fn default() -> Self {
        Self { style: BevelStyle::Emboss, depth: 5.0 }
    }
}

/// Per-layer effect set.  `None` means the effect is disabled.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerEffects {
    pub drop_shadow: Option<DropShadow>,
    pub outer_glow: Option<OuterGlow>,
    pub bevel: Option<Bevel>,
}

impl LayerEffects {
    pub fn is_empty(&self) -> bool {
        self.drop_shadow.is_none() && self.outer_glow.is_none() && self.bevel.is_none()
    }
}

/// Build the buffer drawn beneath a layer, or `None` when no effect is enabled.
/// Order: shadow, glow, bevel.
pub fn render_under_effects(pixels: &RgbaImage, effects: &LayerEffects) -> Option<RgbaImage> {
    if effects.is_empty() {
        return None;
    }
    let (w, h) = pixels.dimensions();
    let mut out = RgbaImage::new(w, h);

    if let Some(shadow) = &effects.drop_shadow {
        let alpha = offset_alpha(pixels, shadow.offset_x.round() as i32, shadow.offset_y.round() as i32);
        let alpha = box_blur_alpha(&alpha, w, h, shadow.blur);
        tint_onto(&mut out, &alpha, shadow.color, 1.0);
    }

    if let Some(glow) = &effects.outer_glow {
        let alpha = offset_alpha(pixels, 0, 0);
        let alpha = box_blur_alpha(&alpha, w, h, glow.size);
        // A plain blur halves the edge; boost so the halo reads at full strength.
        tint_onto(&mut out, &alpha, glow.color, 2.0);
    }

    if let Some(bevel) = &effects.bevel {
        let overlay = render_bevel(pixels, bevel);
        for (dst, src) in out.pixels_mut().zip(overlay.pixels()) {
            if src[3] != 0 {
                *dst = blend_over(*dst, *src);
            }
        }
    }

    Some(out)
}

/// Highlight/shade pixels along the top-left and bottom-right edges of opaque content.
pub fn render_bevel(pixels: &RgbaImage, bevel: &Bevel) -> RgbaImage {
    let (w, h) = pixels.dimensions();
    let depth = bevel.depth.round().max(1.0) as i64;
    let light = Rgba([255, 255, 255, 180]);
    let dark = Rgba([0, 0, 0, 180]);
    let (highlight, shade) = match bevel.style {
        BevelStyle::Emboss => (light, dark),
        BevelStyle::Engrave => (dark, light),
    };

    let solid = |x: i64, y: i64| -> bool {
        x >= 0
            && y >= 0
            && x < w as i64
            && y < h as i64
            && pixels.get_pixel(x as u32, y as u32)[3] > EDGE_ALPHA
    };

    let mut out = RgbaImage::new(w, h);
    let stride = w as usize * 4;
    out.as_mut()
        .par_chunks_mut(stride)
        .enumerate()
        .for_each(|(y, row)| {
            let y = y as i64;
            for x in 0..w as i64 {
                if pixels.get_pixel(x as u32, y as u32)[3] < EDGE_ALPHA {
                    continue;
                }
                let open_top_left = (1..=depth).any(|k| !solid(x - k, y - k));
                let open_bottom_right = (1..=depth).any(|k| !solid(x + k, y + k));
                let mut px = Rgba([0, 0, 0, 0]);
                if open_top_left {
                    px = blend_over(px, highlight);
                }
                if open_bottom_right {
                    px = blend_over(px, shade);
                }
                let o = x as usize * 4;
                row[o..o + 4].copy_from_slice(&px.0);
            }
        });
    out
}

/// Alpha channel of `pixels` shifted by (`dx`, `dy`).
fn offset_alpha(pixels: &RgbaImage, dx: i32, dy: i32) -> Vec<f32> {
    let (w, h) = pixels.dimensions();
    let (wi, hi) = (w as i32, h as i32);
    let raw = pixels.as_raw();
    let mut alpha = vec![0.0f32; (w * h) as usize];
    alpha
        .par_chunks_mut(w as usize)
        .enumerate()
        .for_each(|(y, row)| {
            let sy = y as i32 - dy;
            if sy < 0 || sy >= hi {
                return;
            }
            for x in 0..wi {
                let sx = x - dx;
                if sx >= 0 && sx < wi {
                    row[x as usize] = raw[(sy as usize * w as usize + sx as usize) * 4 + 3] as f32;
                }
            }
        });
    alpha
}

/// Separable box blur of a single-channel buffer; edges clamp.
fn box_blur_alpha(src: &[f32], w: u32, h: u32, radius: f32) -> Vec<f32> {
    if radius < 0.5 || w == 0 || h == 0 {
        return src.to_vec();
    }
    let w = w as usize;
    let h = h as usize;
    let r = radius.ceil() as i32;
    let inv_k = 1.0 / (2 * r + 1) as f32;

    let mut h_buf = vec![0.0f32; w * h];
    h_buf
        .par_chunks_mut(w)
        .enumerate()
        .for_each(|(y, row_out)| {
            let row = &src[y * w..(y + 1) * w];
            for (x, out) in row_out.iter_mut().enumerate() {
                let mut sum = 0.0;
                for k in -r..=r {
                    let sx = (x as i32 + k).clamp(0, w as i32 - 1) as usize;
                    sum += row[sx];
                }
                *out = sum * inv_k;
            }
        });

    let mut v_buf = vec![0.0f32; w * h];
    v_buf
        .par_chunks_mut(w)
        .enumerate()
        .for_each(|(y, row_out)| {
            for (x, out) in row_out.iter_mut().enumerate() {
                let mut sum = 0.0;
                for k in -r..=r {
                    let sy = (y as i32 + k).clamp(0, h as i32 - 1) as usize;
                    sum += h_buf[sy * w + x];
                }
                *out = sum * inv_k;
            }
        });
    v_buf
}

/// Source-over a solid colour onto `out`, using `alpha` (0..255) as coverage.
fn tint_onto(out: &mut RgbaImage, alpha: &[f32], color: [u8; 4], gain: f32) {
    let color_a = color[3] as f32 / 255.0;
    for (px, &a) in out.pixels_mut().zip(alpha.iter()) {
        let cov = (a / 255.0 * gain).min(1.0) * color_a;
        if cov <= 0.0 {
            continue;
        }
        let top = Rgba([color[0], color[1], color[2], (cov * 255.0).round() as u8]);
        *px = blend_over(*px, top);
    }
}
