use image::{Rgba, RgbaImage};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ops::effects::{self, LayerEffects};

pub const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

// ============================================================================
// BLEND MODES
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BlendMode {
    #[default]
    Normal,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
}

impl BlendMode {
    pub fn all() -> &'static [BlendMode] {
        &[
            BlendMode::Normal,
            BlendMode::Multiply,
            BlendMode::Screen,
            BlendMode::Overlay,
            BlendMode::Darken,
            BlendMode::Lighten,
            BlendMode::ColorDodge,
            BlendMode::ColorBurn,
            BlendMode::HardLight,
            BlendMode::SoftLight,
            BlendMode::Difference,
            BlendMode::Exclusion,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            BlendMode::Normal => "Normal",
            BlendMode::Multiply => "Multiply",
            BlendMode::Screen => "Screen",
            BlendMode::Overlay => "Overlay",
            BlendMode::Darken => "Darken",
            BlendMode::Lighten => "Lighten",
            BlendMode::ColorDodge => "Color Dodge",
            BlendMode::ColorBurn => "Color Burn",
            BlendMode::HardLight => "Hard Light",
            BlendMode::SoftLight => "Soft Light",
            BlendMode::Difference => "Difference",
            BlendMode::Exclusion => "Exclusion",
        }
    }
}

/// Source-over composite of `top` onto `base` with a separable blend mode.
/// Both pixels are straight (non-premultiplied) alpha.
pub fn blend_pixel(base: Rgba<u8>, top: Rgba<u8>, mode: BlendMode, opacity: f32) -> Rgba<u8> {
    if top[3] == 0 || opacity <= 0.0 {
        return base;
    }
    if mode == BlendMode::Normal && opacity >= 1.0 && top[3] == 255 {
        return top;
    }

    let opacity = opacity.clamp(0.0, 1.0);

    let base_r = base[0] as f32 / 255.0;
    let base_g = base[1] as f32 / 255.0;
    let base_b = base[2] as f32 / 255.0;
    let base_a = base[3] as f32 / 255.0;

    let top_r = top[0] as f32 / 255.0;
    let top_g = top[1] as f32 / 255.0;
    let top_b = top[2] as f32 / 255.0;
    let top_a = (top[3] as f32 / 255.0) * opacity;

    let (r, g, b) = match mode {
        BlendMode::Normal => (top_r, top_g, top_b),
        BlendMode::Multiply => (base_r * top_r, base_g * top_g, base_b * top_b),
        BlendMode::Screen => (
            1.0 - (1.0 - base_r) * (1.0 - top_r),
            1.0 - (1.0 - base_g) * (1.0 - top_g),
            1.0 - (1.0 - base_b) * (1.0 - top_b),
        ),
        BlendMode::Overlay => (
            overlay_channel(base_r, top_r),
            overlay_channel(base_g, top_g),
            overlay_channel(base_b, top_b),
        ),
        BlendMode::Darken => (base_r.min(top_r), base_g.min(top_g), base_b.min(top_b)),
        BlendMode::Lighten => (base_r.max(top_r), base_g.max(top_g), base_b.max(top_b)),
        BlendMode::ColorDodge => (
            color_dodge_channel(base_r, top_r),
            color_dodge_channel(base_g, top_g),
            color_dodge_channel(base_b, top_b),
        ),
        BlendMode::ColorBurn => (
            color_burn_channel(base_r, top_r),
            color_burn_channel(base_g, top_g),
            color_burn_channel(base_b, top_b),
        ),
        // Hard light is overlay with the operands swapped.
        BlendMode::HardLight => (
            overlay_channel(top_r, base_r),
            overlay_channel(top_g, base_g),
            overlay_channel(top_b, base_b),
        ),
        BlendMode::SoftLight => (
            soft_light_channel(base_r, top_r),
            soft_light_channel(base_g, top_g),
            soft_light_channel(base_b, top_b),
        ),
        BlendMode::Difference => (
            (base_r - top_r).abs(),
            (base_g - top_g).abs(),
            (base_b - top_b).abs(),
        ),
        BlendMode::Exclusion => (
            base_r + top_r - 2.0 * base_r * top_r,
            base_g + top_g - 2.0 * base_g * top_g,
            base_b + top_b - 2.0 * base_b * top_b,
        ),
    };

    // Where the backdrop is transparent the blend result degenerates to the source colour.
    let (r, g, b) = (
        top_r + (r - top_r) * base_a,
        top_g + (g - top_g) * base_a,
        top_b + (b - top_b) * base_a,
    );

    let out_a = top_a + base_a * (1.0 - top_a);
    if out_a <= 0.0 {
        return TRANSPARENT;
    }

    let out_r = (r * top_a + base_r * base_a * (1.0 - top_a)) / out_a;
    let out_g = (g * top_a + base_g * base_a * (1.0 - top_a)) / out_a;
    let out_b = (b * top_a + base_b * base_a * (1.0 - top_a)) / out_a;

    Rgba([
        (out_r * 255.0).round().clamp(0.0, 255.0) as u8,
        (out_g * 255.0).round().clamp(0.0, 255.0) as u8,
        (out_b * 255.0).round().clamp(0.0, 255.0) as u8,
        (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
    ])
}

/// Plain source-over at full opacity.
#[inline]
pub fn blend_over(base: Rgba<u8>, top: Rgba<u8>) -> Rgba<u8> {
    blend_pixel(base, top, BlendMode::Normal, 1.0)
}

fn overlay_channel(base: f32, top: f32) -> f32 {
    if base < 0.5 {
        2.0 * base * top
    } else {
        1.0 - 2.0 * (1.0 - base) * (1.0 - top)
    }
}

fn color_burn_channel(base: f32, top: f32) -> f32 {
    if base >= 1.0 {
        1.0
    } else if top <= 0.0 {
        0.0
    } else {
        (1.0 - (1.0 - base) / top).max(0.0)
    }
}

fn color_dodge_channel(base: f32, top: f32) -> f32 {
    if base <= 0.0 {
        0.0
    } else if top >= 1.0 {
        1.0
    } else {
        (base / (1.0 - top)).min(1.0)
    }
}

/// W3C Soft Light formula.
fn soft_light_channel(base: f32, top: f32) -> f32 {
    if top <= 0.5 {
        base - (1.0 - 2.0 * top) * base * (1.0 - base)
    } else {
        let d = if base <= 0.25 {
            ((16.0 * base - 12.0) * base + 4.0) * base
        } else {
            base.sqrt()
        };
        base + (2.0 * top - 1.0) * (d - base)
    }
}

/// Blend a whole source image onto `dest` at (`dx`, `dy`).  Rows run in parallel.
pub fn blend_image_onto(
    dest: &mut RgbaImage,
    src: &RgbaImage,
    dx: i64,
    dy: i64,
    mode: BlendMode,
    opacity: f32,
) {
    if opacity <= 0.0 {
        return;
    }
    let dw = dest.width() as i64;
    let dh = dest.height() as i64;
    let sw = src.width() as i64;
    let sh = src.height() as i64;

    let x0 = dx.max(0);
    let x1 = (dx + sw).min(dw);
    let y0 = dy.max(0);
    let y1 = (dy + sh).min(dh);
    if x0 >= x1 || y0 >= y1 {
        return;
    }

    let row_bytes = dw as usize * 4;
    let src_raw = src.as_raw();
    let src_row_bytes = sw as usize * 4;

    dest.as_mut()
        .par_chunks_mut(row_bytes)
        .enumerate()
        .skip(y0 as usize)
        .take((y1 - y0) as usize)
        .for_each(|(y, row)| {
            let sy = (y as i64 - dy) as usize;
            let src_row = &src_raw[sy * src_row_bytes..(sy + 1) * src_row_bytes];
            for x in x0..x1 {
                let sx = (x - dx) as usize;
                let so = sx * 4;
                let top = Rgba([src_row[so], src_row[so + 1], src_row[so + 2], src_row[so + 3]]);
                if top[3] == 0 {
                    continue;
                }
                let o = x as usize * 4;
                let base = Rgba([row[o], row[o + 1], row[o + 2], row[o + 3]]);
                let out = blend_pixel(base, top, mode, opacity);
                row[o..o + 4].copy_from_slice(&out.0);
            }
        });
}

// ============================================================================
// LAYER
// ============================================================================

#[derive(Clone, Debug)]
pub struct Layer {
    /// Identity survives renames and reordering; copies made by `duplicate` get a fresh one.
    pub id: Uuid,
    pub name: String,
    pub visible: bool,
    pub opacity: f32,
    pub blend_mode: BlendMode,
    pub locked: bool,
    pub effects: LayerEffects,
    pub pixels: RgbaImage,
}

impl Layer {
    /// A fully transparent layer.
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            visible: true,
            opacity: 1.0,
            blend_mode: BlendMode::Normal,
            locked: false,
            effects: LayerEffects::default(),
            pixels: RgbaImage::from_pixel(width.max(1), height.max(1), TRANSPARENT),
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn clear(&mut self) {
        self.pixels.as_mut().fill(0);
    }

    /// Reallocate at the new size keeping the overlap anchored at (0,0);
    /// anything new is transparent.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 || (width, height) == self.pixels.dimensions() {
            return;
        }
        let mut next = RgbaImage::from_pixel(width, height, TRANSPARENT);
        copy_region(&self.pixels, &mut next, 0, 0);
        self.pixels = next;
    }

    /// Deep copy with a new identity and a " Copy" suffix.
    pub fn duplicate(&self) -> Self {
        let mut copy = self.clone();
        copy.id = Uuid::new_v4();
        copy.name = format!("{} Copy", self.name);
        copy
    }

    pub fn set_opacity(&mut self, opacity: f32) {
        self.opacity = opacity.clamp(0.0, 1.0);
    }

    /// Draw this layer onto `dest`: effects first, then the layer's own pixels.
    pub fn draw_onto(&self, dest: &mut RgbaImage) {
        if !self.visible || self.opacity <= 0.0 {
            return;
        }
        if let Some(under) = effects::render_under_effects(&self.pixels, &self.effects) {
            blend_image_onto(dest, &under, 0, 0, BlendMode::Normal, self.opacity);
        }
        blend_image_onto(dest, &self.pixels, 0, 0, self.blend_mode, self.opacity);
    }
}

/// Straight copy (no blending) of `src` into `dest` at (`dx`, `dy`), clipped.
pub fn copy_region(src: &RgbaImage, dest: &mut RgbaImage, dx: i64, dy: i64) {
    let x0 = dx.max(0);
    let y0 = dy.max(0);
    let x1 = (dx + src.width() as i64).min(dest.width() as i64);
    let y1 = (dy + src.height() as i64).min(dest.height() as i64);
    if x0 >= x1 || y0 >= y1 {
        return;
    }
    let dw = dest.width() as usize;
    let sw = src.width() as usize;
    let span = (x1 - x0) as usize * 4;
    let src_raw = src.as_raw();
    let dest_raw: &mut [u8] = dest.as_mut();
    for y in y0..y1 {
        let sy = (y - dy) as usize;
        let s = (sy * sw + (x0 - dx) as usize) * 4;
        let d = (y as usize * dw + x0 as usize) * 4;
        dest_raw[d..d + span].copy_from_slice(&src_raw[s..s + span]);
    }
}

// ============================================================================
// LAYER STACK
// ============================================================================

/// Lightweight description of a layer for UI panels.  Serializable so a
/// shell can hand it across its own process or IPC boundary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayerInfo {
    pub id: Uuid,
    pub name: String,
    pub visible: bool,
    pub opacity: f32,
    pub blend_mode: BlendMode,
    pub locked: bool,
}

/// Bottom-to-top ordered layers sharing one canvas size.  Never empty.
#[derive(Clone, Debug)]
pub struct LayerStack {
    layers: Vec<Layer>,
    active: usize,
    width: u32,
    height: u32,
}

impl LayerStack {
    pub fn new(width: u32, height: u32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            layers: vec![Layer::new("Background", width, height)],
            active: 0,
            width,
            height,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer(&self, index: usize) -> Option<&Layer> {
        self.layers.get(index)
    }

    pub fn layer_mut(&mut self, index: usize) -> Option<&mut Layer> {
        self.layers.get_mut(index)
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn active(&self) -> &Layer {
        &self.layers[self.active]
    }

    pub fn active_mut(&mut self) -> &mut Layer {
        &mut self.layers[self.active]
    }

    pub fn set_active(&mut self, index: usize) -> bool {
        if index >= self.layers.len() || index == self.active {
            return false;
        }
        self.active = index;
        true
    }

    /// Append a blank layer on top and make it active.  Returns its index.
    pub fn create_layer(&mut self, name: &str) -> usize {
        let name = if name.trim().is_empty() { "New Layer" } else { name };
        self.layers.push(Layer::new(name, self.width, self.height));
        self.active = self.layers.len() - 1;
        self.active
    }

    /// Insert a deep copy directly above `index` and make it active.
    pub fn duplicate_layer(&mut self, index: usize) -> bool {
        let Some(src) = self.layers.get(index) else { return false };
        let copy = src.duplicate();
        self.layers.insert(index + 1, copy);
        self.active = index + 1;
        true
    }

    /// Remove a layer.  The last remaining layer can never be removed.
    pub fn remove_layer(&mut self, index: usize) -> bool {
        if index >= self.layers.len() || self.layers.len() <= 1 {
            return false;
        }
        self.layers.remove(index);
        let count = self.layers.len();
        if index == self.active {
            self.active = index.min(count - 1);
        } else if index < self.active {
            self.active -= 1;
        }
        true
    }

    /// Swap with the layer below (`index - 1`).
    pub fn move_up(&mut self, index: usize) -> bool {
        if index == 0 || index >= self.layers.len() {
            return false;
        }
        self.swap(index, index - 1);
        true
    }

    /// Swap with the layer above (`index + 1`).
    pub fn move_down(&mut self, index: usize) -> bool {
        if index + 1 >= self.layers.len() {
            return false;
        }
        self.swap(index, index + 1);
        true
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.layers.swap(a, b);
        if self.active == a {
            self.active = b;
        } else if self.active == b {
            self.active = a;
        }
    }

    /// Draw `top` onto `bottom`, then drop `top`.
    pub fn merge_layers(&mut self, bottom: usize, top: usize) -> bool {
        let count = self.layers.len();
        if bottom >= count || top >= count || bottom == top {
            return false;
        }
        let top_layer = self.layers[top].clone();
        top_layer.draw_onto(&mut self.layers[bottom].pixels);
        self.remove_layer(top)
    }

    /// Flatten every visible layer onto the lowest visible one.
    pub fn merge_all_visible(&mut self) -> bool {
        let visible: Vec<usize> = (0..self.layers.len())
            .filter(|&i| self.layers[i].visible)
            .collect();
        if visible.len() <= 1 {
            return false;
        }
        let base = visible[0];
        let base_id = self.layers[base].id;
        let active_id = self.layers[self.active].id;

        let mut merged = self.layers[base].pixels.clone();
        for &i in &visible[1..] {
            self.layers[i].draw_onto(&mut merged);
        }
        self.layers[base].pixels = merged;

        self.layers.retain(|l| l.id == base_id || !l.visible);

        self.active = self
            .layers
            .iter()
            .position(|l| l.id == active_id)
            .or_else(|| self.layers.iter().position(|l| l.id == base_id))
            .unwrap_or(0);
        true
    }

    /// Resize every layer at once.  Zero sizes are rejected.
    pub fn resize_all(&mut self, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 || (width, height) == (self.width, self.height) {
            return false;
        }
        for layer in &mut self.layers {
            layer.resize(width, height);
        }
        self.width = width;
        self.height = height;
        true
    }

    pub fn clear_all(&mut self) {
        for layer in &mut self.layers {
            layer.clear();
        }
    }

    /// Composite all layers onto a fresh transparent surface.
    pub fn composite(&self) -> RgbaImage {
        let mut out = RgbaImage::from_pixel(self.width, self.height, TRANSPARENT);
        self.composite_into(&mut out);
        out
    }

    /// Composite bottom-to-top onto an existing surface of canvas size.
    pub fn composite_into(&self, target: &mut RgbaImage) {
        if target.dimensions() != (self.width, self.height) {
            return;
        }
        for layer in &self.layers {
            layer.draw_onto(target);
        }
    }

    pub fn layer_infos(&self) -> Vec<LayerInfo> {
        self.layers
            .iter()
            .map(|l| LayerInfo {
                id: l.id,
                name: l.name.clone(),
                visible: l.visible,
                opacity: l.opacity,
                blend_mode: l.blend_mode,
                locked: l.locked,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::de::DeserializeOwned;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);

    fn filled(stack: &mut LayerStack, index: usize, color: Rgba<u8>) {
        let layer = stack.layer_mut(index).unwrap();
        for p in layer.pixels.pixels_mut() {
            *p = color;
        }
    }

    #[test]
    fn test_new_stack_has_background() {
        let stack = LayerStack::new(10, 10);
        assert_eq!(stack.len(), 1);
        assert_eq!(stack.active().name, "Background");
        assert!(stack.active().pixels.pixels().all(|p| p[3] == 0));
    }

    #[test]
    fn test_remove_last_layer_is_noop() {
        let mut stack = LayerStack::new(10, 10);
        assert!(!stack.remove_layer(0));
        assert_eq!(stack.len(), 1);
        assert!(!stack.remove_layer(7));
    }

    #[test]
    fn test_remove_active_picks_min_index() {
        let mut stack = LayerStack::new(10, 10);
        stack.create_layer("a");
        stack.create_layer("b");
        assert_eq!(stack.active_index(), 2);
        assert!(stack.remove_layer(2));
        assert_eq!(stack.active_index(), 1);
        stack.set_active(0);
        assert!(stack.remove_layer(0));
        assert_eq!(stack.active_index(), 0);
        assert_eq!(stack.active().name, "a");
    }

    #[test]
    fn test_create_layer_matches_size_and_activates() {
        let mut stack = LayerStack::new(30, 20);
        let idx = stack.create_layer("");
        assert_eq!(idx, 1);
        assert_eq!(stack.active().name, "New Layer");
        assert_eq!(stack.active().pixels.dimensions(), (30, 20));
    }

    #[test]
    fn test_move_boundaries_and_active_follows() {
        let mut stack = LayerStack::new(4, 4);
        stack.create_layer("top");
        assert!(!stack.move_up(0));
        assert!(!stack.move_down(1));
        assert!(stack.move_up(1));
        assert_eq!(stack.layer(0).unwrap().name, "top");
        assert_eq!(stack.active().name, "top");
    }

    #[test]
    fn test_duplicate_is_deep_copy() {
        let mut stack = LayerStack::new(4, 4);
        filled(&mut stack, 0, RED);
        assert!(stack.duplicate_layer(0));
        assert_eq!(stack.active().name, "Background Copy");
        assert_ne!(stack.layer(0).unwrap().id, stack.layer(1).unwrap().id);
        stack.active_mut().pixels.put_pixel(0, 0, BLUE);
        assert_eq!(*stack.layer(0).unwrap().pixels.get_pixel(0, 0), RED);
    }

    #[test]
    fn test_merge_all_visible_keeps_hidden() {
        let mut stack = LayerStack::new(4, 4);
        stack.create_layer("hidden");
        stack.layer_mut(1).unwrap().visible = false;
        stack.create_layer("paint");
        filled(&mut stack, 2, BLUE);
        assert!(stack.merge_all_visible());
        assert_eq!(stack.len(), 2);
        assert_eq!(*stack.layer(0).unwrap().pixels.get_pixel(1, 1), BLUE);
        assert_eq!(stack.layer(1).unwrap().name, "hidden");
        assert!(stack.active_index() < stack.len());
    }

    #[test]
    fn test_merge_single_visible_is_noop() {
        let mut stack = LayerStack::new(4, 4);
        stack.create_layer("x");
        stack.layer_mut(1).unwrap().visible = false;
        assert!(!stack.merge_all_visible());
        assert_eq!(stack.len(), 2);
    }

    #[test]
    fn test_merge_layers_respects_opacity() {
        let mut stack = LayerStack::new(2, 2);
        filled(&mut stack, 0, Rgba([0, 0, 0, 255]));
        stack.create_layer("white");
        filled(&mut stack, 1, Rgba([255, 255, 255, 255]));
        stack.layer_mut(1).unwrap().set_opacity(0.5);
        assert!(stack.merge_layers(0, 1));
        let p = stack.layer(0).unwrap().pixels.get_pixel(0, 0);
        assert!((p[0] as i32 - 128).abs() <= 1);
        assert_eq!(p[3], 255);
    }

    #[test]
    fn test_resize_keeps_origin_content() {
        let mut stack = LayerStack::new(4, 4);
        stack.active_mut().pixels.put_pixel(1, 1, RED);
        stack.create_layer("other");
        assert!(stack.resize_all(8, 2));
        for layer in stack.layers() {
            assert_eq!(layer.pixels.dimensions(), (8, 2));
        }
        assert_eq!(*stack.layer(0).unwrap().pixels.get_pixel(1, 1), RED);
        assert_eq!(stack.layer(0).unwrap().pixels.get_pixel(6, 1)[3], 0);
        assert!(!stack.resize_all(0, 3));
    }

    #[test]
    fn test_composite_skips_invisible_and_zero_opacity() {
        let mut stack = LayerStack::new(2, 2);
        filled(&mut stack, 0, RED);
        stack.create_layer("blue");
        filled(&mut stack, 1, BLUE);
        stack.layer_mut(1).unwrap().opacity = 0.0;
        assert_eq!(*stack.composite().get_pixel(0, 0), RED);
        stack.layer_mut(1).unwrap().opacity = 1.0;
        stack.layer_mut(1).unwrap().visible = false;
        assert_eq!(*stack.composite().get_pixel(0, 0), RED);
        stack.layer_mut(1).unwrap().visible = true;
        assert_eq!(*stack.composite().get_pixel(0, 0), BLUE);
    }

    #[test]
    fn test_blend_modes() {
        let grey = Rgba([128, 128, 128, 255]);
        let white = Rgba([255, 255, 255, 255]);
        let black = Rgba([0, 0, 0, 255]);
        assert_eq!(blend_pixel(grey, white, BlendMode::Multiply, 1.0), grey);
        assert_eq!(blend_pixel(grey, black, BlendMode::Screen, 1.0), grey);
        assert_eq!(blend_pixel(white, white, BlendMode::Difference, 1.0), black);
        assert_eq!(blend_pixel(grey, white, BlendMode::Darken, 1.0), grey);
        assert_eq!(blend_pixel(grey, white, BlendMode::Lighten, 1.0), white);
        assert_eq!(blend_pixel(black, white, BlendMode::Exclusion, 1.0), white);
        // transparent top never changes the base
        assert_eq!(blend_pixel(grey, TRANSPARENT, BlendMode::Overlay, 1.0), grey);
    }

    #[test]
    fn test_blend_onto_transparent_takes_source_color() {
        let out = blend_pixel(TRANSPARENT, Rgba([200, 10, 10, 255]), BlendMode::Multiply, 1.0);
        assert_eq!(out, Rgba([200, 10, 10, 255]));
    }

    fn assert_serde<T: Serialize + DeserializeOwned>() {}

    #[test]
    fn test_shell_facing_types_are_serde() {
        assert_serde::<LayerInfo>();
        assert_serde::<BlendMode>();
        assert_serde::<crate::config::EditorConfig>();
        assert_serde::<crate::components::brush::BrushKind>();
        assert_serde::<crate::components::tools::ToolKind>();
        assert_serde::<crate::components::tools::GradientStyle>();
        assert_serde::<crate::components::selection::SelectionKind>();
        assert_serde::<crate::ops::effects::LayerEffects>();
        assert_serde::<crate::ops::shapes::ShapeKind>();
        assert_serde::<crate::ops::text::TextAlignment>();
    }
}
