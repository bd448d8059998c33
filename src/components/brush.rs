// ============================================================================
// BRUSH ENGINE - stamp interpolation and per-kind rendering
// ============================================================================

use egui::{Pos2, pos2, vec2};
use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::canvas::{TRANSPARENT, blend_over};
use crate::components::selection::SelectionClip;
use crate::config::EditorConfig;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BrushKind {
    #[default]
    Round,
    Watercolor,
    Oil,
    Textured,
    Pixel,
    Drops,
}

impl BrushKind {
    pub fn all() -> &'static [BrushKind] {
        &[
            BrushKind::Round,
            BrushKind::Watercolor,
            BrushKind::Oil,
            BrushKind::Textured,
            BrushKind::Pixel,
            BrushKind::Drops,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            BrushKind::Round => "Round",
            BrushKind::Watercolor => "Watercolor",
            BrushKind::Oil => "Oil",
            BrushKind::Textured => "Textured",
            BrushKind::Pixel => "Pixel",
            BrushKind::Drops => "Drops",
        }
    }
}

const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);
const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Paint settings shared by the brush, eraser and shape tools.
#[derive(Clone, Debug, PartialEq)]
pub struct BrushSettings {
    /// Diameter in canvas pixels, 1..=100.
    pub size: f32,
    /// 0 = fully feathered edge, 100 = hard edge.
    pub hardness: f32,
    pub primary: Rgba<u8>,
    pub secondary: Rgba<u8>,
    pub kind: BrushKind,
    /// Drop radius as a fraction of the brush size, 0.05..=1.
    pub drop_size: f32,
    pub drop_count: u32,
}

impl Default for BrushSettings {
    fn default() -> Self {
        Self {
            size: 30.0,
            hardness: 0.0,
            primary: BLUE,
            secondary: WHITE,
            kind: BrushKind::Round,
            drop_size: 0.3,
            drop_count: 2,
        }
    }
}

impl BrushSettings {
    pub fn set_size(&mut self, size: f32) {
        self.size = size.clamp(1.0, 100.0);
    }

    pub fn set_hardness(&mut self, hardness: f32) {
        self.hardness = hardness.clamp(0.0, 100.0);
    }

    pub fn set_drop_size(&mut self, drop_size: f32) {
        self.drop_size = drop_size.clamp(0.05, 1.0);
    }

    pub fn set_drop_count(&mut self, count: u32) {
        self.drop_count = count.clamp(1, 20);
    }

    pub fn preset_soft_round(&mut self) {
        self.kind = BrushKind::Round;
        self.size = 10.0;
        self.hardness = 30.0;
    }

    pub fn preset_hard_round(&mut self) {
        self.kind = BrushKind::Round;
        self.size = 8.0;
        self.hardness = 100.0;
    }

    pub fn preset_default(&mut self) {
        self.kind = BrushKind::Round;
        self.size = 5.0;
        self.hardness = 100.0;
    }

    /// Back to a small hard round brush, blue on white.
    pub fn reset(&mut self) {
        self.preset_default();
        self.primary = BLUE;
        self.secondary = WHITE;
    }

    pub fn swap_colors(&mut self) {
        std::mem::swap(&mut self.primary, &mut self.secondary);
    }
}

/// Smoothstep falloff for a round dab.  `hardness` is 0..1.
fn compute_brush_alpha(dist: f32, radius: f32, hardness: f32) -> f32 {
    let remapped_hardness = 0.02 + hardness * 0.98;
    let safe_hardness = remapped_hardness.clamp(0.0, 0.99);

    // Tiny brushes get at least 1.5px of antialiasing outside the nominal radius.
    let (effective_radius, fade_width) = if radius < 3.0 {
        let aa_extend = 1.5;
        (radius + aa_extend, aa_extend + radius * (1.0 - safe_hardness))
    } else {
        (radius, (radius * (1.0 - safe_hardness)).max(1.0))
    };
    let solid_radius = effective_radius - fade_width;

    if dist <= solid_radius {
        return 1.0;
    } else if dist >= effective_radius {
        return 0.0;
    }
    let t = (dist - solid_radius) / fade_width;
    let x = 1.0 - t;
    x * x * (3.0 - 2.0 * x)
}

/// Deterministic positional hash used in place of an RNG.
fn stamp_hash(x: f32, y: f32, counter: u32) -> u32 {
    let ix = (x * 100.0) as u32;
    let iy = (y * 100.0) as u32;
    let mut h = ix
        .wrapping_mul(374761393)
        .wrapping_add(iy.wrapping_mul(668265263))
        .wrapping_add(counter.wrapping_mul(1013904223));
    h ^= h >> 13;
    h = h.wrapping_mul(1274126177);
    h ^= h >> 16;
    h
}

/// Stream of `[0, 1)` values for one stamp.
struct StampRandom {
    x: f32,
    y: f32,
    seed: u32,
}

impl StampRandom {
    fn next(&mut self) -> f32 {
        self.seed = self.seed.wrapping_add(1);
        (stamp_hash(self.x, self.y, self.seed) >> 8) as f32 / (1u32 << 24) as f32
    }
}

/// Source-over a circle whose per-pixel alpha factor comes from `falloff(dist)`.
/// Pixels outside `clip` are left alone.
fn fill_circle(
    surface: &mut RgbaImage,
    center: Pos2,
    radius: f32,
    color: Rgba<u8>,
    clip: Option<&SelectionClip>,
    falloff: impl Fn(f32) -> f32,
) {
    if radius <= 0.0 {
        return;
    }
    let (w, h) = surface.dimensions();
    let x0 = (center.x - radius - 1.0).floor().max(0.0) as u32;
    let y0 = (center.y - radius - 1.0).floor().max(0.0) as u32;
    let x1 = ((center.x + radius + 1.0).ceil().max(0.0) as u32).min(w);
    let y1 = ((center.y + radius + 1.0).ceil().max(0.0) as u32).min(h);
    for y in y0..y1 {
        for x in x0..x1 {
            if clip.is_some_and(|c| !c.contains_pixel(x, y)) {
                continue;
            }
            let d = pos2(x as f32 + 0.5, y as f32 + 0.5).distance(center);
            let f = falloff(d);
            if f <= 0.0 {
                continue;
            }
            let a = (color[3] as f32 * f.min(1.0)).round() as u8;
            if a == 0 {
                continue;
            }
            let top = Rgba([color[0], color[1], color[2], a]);
            let px = surface.get_pixel_mut(x, y);
            *px = blend_over(*px, top);
        }
    }
}

/// One-pixel antialiased disc edge.
fn disc(radius: f32) -> impl Fn(f32) -> f32 {
    move |d| (radius + 0.5 - d).clamp(0.0, 1.0)
}

/// Stroke renderer.  Holds only per-stroke scratch state: the surface as it was
/// when the stroke began, the max coverage reached per pixel, and the stamp
/// counter feeding the scatter hash.
pub struct BrushEngine {
    step_divisor: f32,
    special_spacing: f32,
    stamp_counter: u32,
    stroke_base: Option<RgbaImage>,
    coverage: Vec<u8>,
}

impl Default for BrushEngine {
    fn default() -> Self {
        Self::new(4.0, 0.3)
    }
}

impl BrushEngine {
    pub fn new(step_divisor: f32, special_spacing: f32) -> Self {
        Self {
            step_divisor: step_divisor.max(0.5),
            special_spacing: special_spacing.max(0.01),
            stamp_counter: 0,
            stroke_base: None,
            coverage: Vec::new(),
        }
    }

    pub fn from_config(config: &EditorConfig) -> Self {
        Self::new(config.brush_step_divisor, config.special_brush_spacing)
    }

    /// Start a new stroke over `surface`; coverage restarts at zero.
    pub fn begin_stroke(&mut self, surface: &RgbaImage) {
        self.stroke_base = Some(surface.clone());
        self.coverage.clear();
        self.coverage.resize((surface.width() * surface.height()) as usize, 0);
    }

    pub fn end_stroke(&mut self) {
        self.stroke_base = None;
        self.coverage = Vec::new();
    }

    pub fn in_stroke(&self) -> bool {
        self.stroke_base.is_some()
    }

    /// Paint the segment `from -> to`, synthesizing intermediate stamps so the
    /// stroke has no gaps.
    #[allow(clippy::too_many_arguments)]
    pub fn stroke_segment(
        &mut self,
        surface: &mut RgbaImage,
        from: Pos2,
        to: Pos2,
        settings: &BrushSettings,
        color: Rgba<u8>,
        eraser: bool,
        clip: Option<&SelectionClip>,
    ) {
        let size = settings.size.max(1.0);
        let dist = from.distance(to);

        if eraser || settings.kind == BrushKind::Round {
            let step = size / self.step_divisor;
            if dist > step {
                let steps = (dist / step).ceil() as u32;
                for i in 1..=steps {
                    let p = from.lerp(to, i as f32 / steps as f32);
                    self.stamp_round(surface, p, settings, color, eraser, clip);
                }
            } else {
                self.stamp_round(surface, from, settings, color, eraser, clip);
                self.stamp_round(surface, to, settings, color, eraser, clip);
            }
            return;
        }

        let steps = ((dist / (size * self.special_spacing)) as u32).max(1);
        let mut prev = from;
        for i in 0..=steps {
            let p = from.lerp(to, i as f32 / steps as f32);
            if clip.is_some_and(|c| !c.contains(p)) {
                prev = p;
                continue;
            }
            self.stamp_special(surface, prev, p, settings, color, clip);
            prev = p;
        }
    }

    /// Single dab at `p` (click without drag).
    pub fn dab(
        &mut self,
        surface: &mut RgbaImage,
        p: Pos2,
        settings: &BrushSettings,
        color: Rgba<u8>,
        eraser: bool,
        clip: Option<&SelectionClip>,
    ) {
        if eraser || settings.kind == BrushKind::Round {
            self.stamp_round(surface, p, settings, color, eraser, clip);
        } else if clip.is_none_or(|c| c.contains(p)) {
            self.stamp_special(surface, p, p, settings, color, clip);
        }
    }

    fn ensure_stroke(&mut self, surface: &RgbaImage) {
        let stale = match &self.stroke_base {
            Some(base) => base.dimensions() != surface.dimensions(),
            None => true,
        };
        if stale {
            self.begin_stroke(surface);
        }
    }

    /// Round / eraser dab: raise per-pixel coverage, then recompute the
    /// affected pixels from the stroke base so overlapping dabs never stack.
    fn stamp_round(
        &mut self,
        surface: &mut RgbaImage,
        p: Pos2,
        settings: &BrushSettings,
        color: Rgba<u8>,
        eraser: bool,
        clip: Option<&SelectionClip>,
    ) {
        self.ensure_stroke(surface);
        let Some(base) = self.stroke_base.as_ref() else { return };
        let (w, h) = surface.dimensions();
        let radius = settings.size.max(1.0) * 0.5;
        let hardness = settings.hardness / 100.0;
        let reach = radius + 2.0;

        let x0 = (p.x - reach).floor().max(0.0) as u32;
        let y0 = (p.y - reach).floor().max(0.0) as u32;
        let x1 = ((p.x + reach).ceil().max(0.0) as u32).min(w);
        let y1 = ((p.y + reach).ceil().max(0.0) as u32).min(h);

        for y in y0..y1 {
            for x in x0..x1 {
                if clip.is_some_and(|c| !c.contains_pixel(x, y)) {
                    continue;
                }
                let d = pos2(x as f32 + 0.5, y as f32 + 0.5).distance(p);
                let cov = (compute_brush_alpha(d, radius, hardness) * 255.0).round() as u8;
                let idx = (y * w + x) as usize;
                if cov <= self.coverage[idx] {
                    continue;
                }
                self.coverage[idx] = cov;
                let under = *base.get_pixel(x, y);
                let out = if eraser {
                    let a = (under[3] as u32 * (255 - cov as u32) / 255) as u8;
                    if a == 0 { TRANSPARENT } else { Rgba([under[0], under[1], under[2], a]) }
                } else {
                    let a = (color[3] as u32 * cov as u32 / 255) as u8;
                    blend_over(under, Rgba([color[0], color[1], color[2], a]))
                };
                surface.put_pixel(x, y, out);
            }
        }
    }

    /// One stamp of a textured kind.  Stamps straddling the selection edge are
    /// cut per pixel.
    fn stamp_special(
        &mut self,
        surface: &mut RgbaImage,
        prev: Pos2,
        p: Pos2,
        settings: &BrushSettings,
        color: Rgba<u8>,
        clip: Option<&SelectionClip>,
    ) {
        let size = settings.size.max(1.0);
        self.stamp_counter = self.stamp_counter.wrapping_add(1);
        let mut rng = StampRandom { x: p.x, y: p.y, seed: self.stamp_counter.wrapping_mul(64) };

        match settings.kind {
            BrushKind::Round => {}
            BrushKind::Watercolor => {
                let radius = size * 0.6;
                let peak = (settings.hardness / 100.0 * 0.6).max(0.15);
                fill_circle(surface, p, radius, color, clip, |d| peak * (1.0 - d / radius).max(0.0));
            }
            BrushKind::Oil => {
                let dir = p - prev;
                let dir = if dir.length() > 1e-3 { dir.normalized() } else { vec2(1.0, 0.0) };
                let perp = vec2(-dir.y, dir.x);
                let half_width = size / 6.0;
                for i in 0..5 {
                    let offset = (i as f32 - 2.5) * size / 4.0;
                    let alpha = (1.0 - offset.abs() / size * 0.5).clamp(0.0, 1.0);
                    let a = prev + perp * offset;
                    let b = p + perp * offset;
                    fill_capsule(surface, a, b, half_width, color, alpha, clip);
                }
            }
            BrushKind::Textured => {
                for _ in 0..10 {
                    let angle = rng.next() * std::f32::consts::TAU;
                    let dist = rng.next() * size;
                    let r = rng.next() * 3.0 + 1.0;
                    let c = p + vec2(angle.cos(), angle.sin()) * dist;
                    fill_circle(surface, c, r, color, clip, disc(r));
                }
            }
            BrushKind::Pixel => {
                let side = size.round().max(1.0) as i64;
                let x0 = (p.x - size * 0.5).round() as i64;
                let y0 = (p.y - size * 0.5).round() as i64;
                let (w, h) = (surface.width() as i64, surface.height() as i64);
                for y in y0.max(0)..(y0 + side).min(h) {
                    for x in x0.max(0)..(x0 + side).min(w) {
                        if clip.is_some_and(|c| !c.contains_pixel(x as u32, y as u32)) {
                            continue;
                        }
                        let px = surface.get_pixel_mut(x as u32, y as u32);
                        *px = blend_over(*px, color);
                    }
                }
            }
            BrushKind::Drops => {
                for _ in 0..settings.drop_count.max(1) {
                    let angle = rng.next() * std::f32::consts::TAU;
                    let dist = rng.next() * size * 0.8;
                    let r = rng.next() * size * settings.drop_size + size * 0.1;
                    let alpha = 0.5 + rng.next() * 0.5;
                    let c = p + vec2(angle.cos(), angle.sin()) * dist;
                    let edge = disc(r);
                    fill_circle(surface, c, r, color, clip, move |d| edge(d) * alpha);
                }
            }
        }
    }
}

/// Source-over a hard-edged thick segment.
fn fill_capsule(
    surface: &mut RgbaImage,
    a: Pos2,
    b: Pos2,
    radius: f32,
    color: Rgba<u8>,
    alpha: f32,
    clip: Option<&SelectionClip>,
) {
    let (w, h) = surface.dimensions();
    let x0 = (a.x.min(b.x) - radius - 1.0).floor().max(0.0) as u32;
    let y0 = (a.y.min(b.y) - radius - 1.0).floor().max(0.0) as u32;
    let x1 = ((a.x.max(b.x) + radius + 1.0).ceil().max(0.0) as u32).min(w);
    let y1 = ((a.y.max(b.y) + radius + 1.0).ceil().max(0.0) as u32).min(h);
    let ab = b - a;
    let len_sq = ab.length_sq();
    for y in y0..y1 {
        for x in x0..x1 {
            if clip.is_some_and(|c| !c.contains_pixel(x, y)) {
                continue;
            }
            let q = pos2(x as f32 + 0.5, y as f32 + 0.5);
            let t = if len_sq > 1e-6 { ((q - a).dot(ab) / len_sq).clamp(0.0, 1.0) } else { 0.0 };
            let d = q.distance(a + ab * t);
            let f = (radius + 0.5 - d).clamp(0.0, 1.0) * alpha;
            let av = (color[3] as f32 * f).round() as u8;
            if av == 0 {
                continue;
            }
            let px = surface.get_pixel_mut(x, y);
            *px = blend_over(*px, Rgba([color[0], color[1], color[2], av]));
        }
    }
}
