use egui::{Pos2, Rect};
use image::{Rgba, RgbaImage};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::PlacedRaster;

/// Outlined primitives produced by the drag-to-define shape tools.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShapeKind {
    Line,
    Rectangle,
    /// Ellipse inscribed in the drag rectangle.
    Ellipse,
}

// ============================================================================
// SDF functions - return signed distance (negative = inside)
// ============================================================================

#[inline]
fn sdf_box(px: f32, py: f32, hx: f32, hy: f32) -> f32 {
    let dx = px.abs() - hx;
    let dy = py.abs() - hy;
    let outside = (dx.max(0.0) * dx.max(0.0) + dy.max(0.0) * dy.max(0.0)).sqrt();
    let inside = dx.max(dy).min(0.0);
    outside + inside
}

/// Approximate ellipse SDF: distance in normalised circle space, rescaled by
/// the local gradient.
#[inline]
fn sdf_ellipse(px: f32, py: f32, rx: f32, ry: f32) -> f32 {
    let rx = rx.max(1e-3);
    let ry = ry.max(1e-3);
    let nx = px / rx;
    let ny = py / ry;
    let len = (nx * nx + ny * ny).sqrt();
    if len < 1e-8 {
        return -rx.min(ry);
    }
    let scale = (rx * rx * ny * ny + ry * ry * nx * nx).sqrt() / (rx * ry * len);
    (len - 1.0) / scale
}

#[inline]
fn sdf_line_segment(px: f32, py: f32, ax: f32, ay: f32, bx: f32, by: f32) -> f32 {
    let dx = bx - ax;
    let dy = by - ay;
    let len_sq = dx * dx + dy * dy;
    let t = if len_sq > 1e-8 {
        (((px - ax) * dx + (py - ay) * dy) / len_sq).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let cx = ax + t * dx;
    let cy = ay + t * dy;
    ((px - cx) * (px - cx) + (py - cy) * (py - cy)).sqrt()
}

#[inline]
fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Distance from the outline of `kind` (always >= 0 on the stroke centreline).
fn outline_distance(kind: ShapeKind, px: f32, py: f32, a: Pos2, b: Pos2) -> f32 {
    match kind {
        ShapeKind::Line => sdf_line_segment(px, py, a.x, a.y, b.x, b.y),
        ShapeKind::Rectangle | ShapeKind::Ellipse => {
            let r = Rect::from_two_pos(a, b);
            let c = r.center();
            let (hx, hy) = (r.width() * 0.5, r.height() * 0.5);
            let d = if kind == ShapeKind::Rectangle {
                sdf_box(px - c.x, py - c.y, hx, hy)
            } else {
                sdf_ellipse(px - c.x, py - c.y, hx, hy)
            };
            d.abs()
        }
    }
}

/// Antialiased outline of `kind` between drag anchors `a` and `b`.
///
/// Returns `None` when the shape lies completely off a `canvas_w`x`canvas_h` canvas.
pub fn rasterize_outline(
    kind: ShapeKind,
    a: Pos2,
    b: Pos2,
    width: f32,
    color: Rgba<u8>,
    canvas_w: u32,
    canvas_h: u32,
) -> Option<PlacedRaster> {
    let half = width.max(0.5) * 0.5;
    let pad = half + 2.0;
    let min_x = a.x.min(b.x) - pad;
    let min_y = a.y.min(b.y) - pad;
    let max_x = a.x.max(b.x) + pad;
    let max_y = a.y.max(b.y) + pad;

    let x0 = (min_x.floor() as i64).max(0);
    let y0 = (min_y.floor() as i64).max(0);
    let x1 = (max_x.ceil() as i64).min(canvas_w as i64);
    let y1 = (max_y.ceil() as i64).min(canvas_h as i64);
    if x0 >= x1 || y0 >= y1 {
        return None;
    }
    let buf_w = (x1 - x0) as u32;
    let buf_h = (y1 - y0) as u32;
    let mut pixels = RgbaImage::new(buf_w, buf_h);
    let row_bytes = buf_w as usize * 4;

    pixels
        .as_mut()
        .par_chunks_mut(row_bytes)
        .enumerate()
        .for_each(|(row, row_buf)| {
            let py = (y0 + row as i64) as f32 + 0.5;
            for col in 0..buf_w as usize {
                let px = (x0 + col as i64) as f32 + 0.5;
                let band = outline_distance(kind, px, py, a, b) - half;
                let coverage = smoothstep(0.5, -0.5, band);
                if coverage > 0.001 {
                    let idx = col * 4;
                    row_buf[idx] = color[0];
                    row_buf[idx + 1] = color[1];
                    row_buf[idx + 2] = color[2];
                    row_buf[idx + 3] = (color[3] as f32 * coverage).round().min(255.0) as u8;
                }
            }
        });

    Some(PlacedRaster { pixels, x: x0, y: y0 })
}
