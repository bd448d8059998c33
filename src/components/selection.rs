// ============================================================================
// SELECTION ENGINE - marquee / ellipse / lasso with floating transforms
// ============================================================================
//
// The engine never owns layer pixels.  Every call that may touch pixels takes
// the active layer's surface by `&mut`, and content lifted off the layer is
// held as an independent copy (`content`) until it is committed back.
//
// Commit is lazy: releasing the pointer after a move, resize or rotate leaves
// the content floating.  It is only drawn back when a new selection starts,
// the selection is applied or replaced, or the caller switches layers.

use egui::{Pos2, Rect, Vec2, pos2};
use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::canvas::TRANSPARENT;
use crate::ops::transform::{draw_transformed, extract_region, fill_rect};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SelectionKind {
    #[default]
    Rectangle,
    Ellipse,
    Lasso,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SelectionState {
    #[default]
    Idle,
    Selecting,
    Moving,
    /// Dragging resize handle 0..8 (NW, N, NE, E, SE, S, SW, W).
    Resizing(usize),
    Rotating,
}

/// Geometry used to clip painting and test containment.
#[derive(Clone, Debug, PartialEq)]
pub enum SelectionClip {
    Rect(Rect),
    Ellipse(Rect),
    Polygon(Vec<Pos2>),
}

impl SelectionClip {
    pub fn contains(&self, p: Pos2) -> bool {
        match self {
            SelectionClip::Rect(r) => rect_contains(r, p),
            SelectionClip::Ellipse(r) => {
                let rx = r.width() * 0.5;
                let ry = r.height() * 0.5;
                if rx <= 0.0 || ry <= 0.0 {
                    return false;
                }
                let c = r.center();
                let dx = (p.x - c.x) / rx;
                let dy = (p.y - c.y) / ry;
                dx * dx + dy * dy <= 1.0
            }
            SelectionClip::Polygon(points) => point_in_polygon(points, p),
        }
    }

    /// Pixel-centre containment for integer pixel coordinates.
    #[inline]
    pub fn contains_pixel(&self, x: u32, y: u32) -> bool {
        self.contains(pos2(x as f32 + 0.5, y as f32 + 0.5))
    }

    pub fn bounds(&self) -> Rect {
        match self {
            SelectionClip::Rect(r) | SelectionClip::Ellipse(r) => *r,
            SelectionClip::Polygon(points) => Rect::from_points(points),
        }
    }
}

/// Half-open containment: `min <= p < max`.
fn rect_contains(r: &Rect, p: Pos2) -> bool {
    p.x >= r.min.x && p.x < r.max.x && p.y >= r.min.y && p.y < r.max.y
}

/// Even-odd ray casting.
fn point_in_polygon(points: &[Pos2], p: Pos2) -> bool {
    if points.len() < 3 {
        return false;
    }
    let mut inside = false;
    let n = points.len();
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        if (a.y > p.y) != (b.y > p.y) {
            let t = (p.y - a.y) / (b.y - a.y);
            if p.x < a.x + t * (b.x - a.x) {
                inside = !inside;
            }
        }
    }
    inside
}

/// Floor both coordinates; selections snap to whole pixels.
fn floor_pos(p: Pos2) -> Pos2 {
    pos2(p.x.floor(), p.y.floor())
}

fn normalized(a: Pos2, b: Pos2) -> Rect {
    Rect::from_min_max(
        pos2(a.x.min(b.x).floor(), a.y.min(b.y).floor()),
        pos2(a.x.max(b.x).ceil(), a.y.max(b.y).ceil()),
    )
}

pub struct SelectionEngine {
    kind: SelectionKind,
    state: SelectionState,
    bounds: Option<Rect>,
    lasso: Vec<Pos2>,
    /// Floating pixels lifted off the layer.
    content: Option<RgbaImage>,
    /// Degrees, applied about the bounds centre at commit time.
    rotation: f32,
    select_start: Pos2,
    drag_start: Pos2,
    clipboard: Option<RgbaImage>,
    /// Surface as it was right before the engine last modified it.
    pre_edit: Option<RgbaImage>,
    min_size: f32,
    handle_radius: f32,
}

impl Default for SelectionEngine {
    fn default() -> Self {
        Self::new(5.0, 12.0)
    }
}

impl SelectionEngine {
    pub fn new(min_size: f32, handle_radius: f32) -> Self {
        Self {
            kind: SelectionKind::Rectangle,
            state: SelectionState::Idle,
            bounds: None,
            lasso: Vec::new(),
            content: None,
            rotation: 0.0,
            select_start: Pos2::ZERO,
            drag_start: Pos2::ZERO,
            clipboard: None,
            pre_edit: None,
            min_size,
            handle_radius,
        }
    }

    // --- queries ----------------------------------------------------------

    pub fn kind(&self) -> SelectionKind {
        self.kind
    }

    pub fn state(&self) -> SelectionState {
        self.state
    }

    pub fn bounds(&self) -> Option<Rect> {
        self.bounds
    }

    pub fn has_selection(&self) -> bool {
        self.bounds.is_some()
    }

    pub fn is_floating(&self) -> bool {
        self.content.is_some()
    }

    pub fn floating_content(&self) -> Option<&RgbaImage> {
        self.content.as_ref()
    }

    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    pub fn lasso_points(&self) -> &[Pos2] {
        &self.lasso
    }

    pub fn has_clipboard(&self) -> bool {
        self.clipboard.is_some()
    }

    pub fn clipboard(&self) -> Option<&RgbaImage> {
        self.clipboard.as_ref()
    }

    pub fn set_kind(&mut self, kind: SelectionKind) {
        if self.state == SelectionState::Idle {
            self.kind = kind;
        }
    }

    /// Clip geometry of the current selection, if any.
    pub fn clip(&self) -> Option<SelectionClip> {
        let bounds = self.bounds?;
        Some(match self.kind {
            SelectionKind::Rectangle => SelectionClip::Rect(bounds),
            SelectionKind::Ellipse => SelectionClip::Ellipse(bounds),
            SelectionKind::Lasso if self.lasso.len() > 2 => SelectionClip::Polygon(self.lasso.clone()),
            SelectionKind::Lasso => SelectionClip::Rect(bounds),
        })
    }

    /// True when nothing is selected, otherwise the per-kind containment test.
    pub fn is_point_in_selection(&self, p: Pos2) -> bool {
        match self.clip() {
            None => true,
            Some(clip) => clip.contains(p),
        }
    }

    /// Take the "before" image recorded the last time the engine changed the
    /// surface on its own (capturing content lifts pixels off the layer).
    pub fn take_pre_edit(&mut self) -> Option<RgbaImage> {
        self.pre_edit.take()
    }

    /// Resize handle under `p`, checked last to first.
    pub fn handle_at(&self, p: Pos2, zoom: f32) -> Option<usize> {
        let b = self.bounds?;
        let radius = self.handle_radius / zoom.max(0.1);
        let c = b.center();
        let handles = [
            pos2(b.min.x, b.min.y),
            pos2(c.x, b.min.y),
            pos2(b.max.x, b.min.y),
            pos2(b.max.x, c.y),
            pos2(b.max.x, b.max.y),
            pos2(c.x, b.max.y),
            pos2(b.min.x, b.max.y),
            pos2(b.min.x, c.y),
        ];
        (0..handles.len()).rev().find(|&i| handles[i].distance(p) < radius)
    }

    // --- pointer state machine --------------------------------------------

    /// Returns `true` when bounds or pixels changed.
    pub fn pointer_down(&mut self, p: Pos2, secondary: bool, zoom: f32, surface: &mut RgbaImage) -> bool {
        let inside = self.bounds.is_some_and(|b| rect_contains(&b, p));

        if secondary && inside {
            self.capture(surface);
            self.state = SelectionState::Rotating;
            self.drag_start = p;
            return true;
        }

        if let Some(handle) = self.handle_at(p, zoom) {
            self.state = SelectionState::Resizing(handle);
            self.drag_start = p;
            return false;
        }

        if inside {
            self.state = SelectionState::Moving;
            self.drag_start = p;
            return false;
        }

        // Outside: flush whatever is floating, then start over.
        let had_selection = self.bounds.is_some();
        self.apply(surface);
        self.bounds = None;
        self.lasso.clear();

        let start = floor_pos(p);
        self.state = SelectionState::Selecting;
        self.select_start = start;
        if self.kind == SelectionKind::Lasso {
            self.lasso.push(start);
        }
        had_selection
    }

    pub fn pointer_move(&mut self, p: Pos2, surface: &mut RgbaImage) -> bool {
        match self.state {
            SelectionState::Idle => false,
            SelectionState::Rotating => {
                let Some(b) = self.bounds else { return false };
                let c = b.center();
                let a0 = (self.drag_start - c).angle();
                let a1 = (p - c).angle();
                self.rotation += (a1 - a0).to_degrees();
                self.drag_start = p;
                true
            }
            SelectionState::Resizing(handle) => {
                self.capture(surface);
                self.resize_to(handle, p);
                true
            }
            SelectionState::Moving => {
                self.capture(surface);
                let delta = p - self.drag_start;
                self.translate(delta);
                self.drag_start = p;
                true
            }
            SelectionState::Selecting => {
                let end = floor_pos(p);
                if self.kind == SelectionKind::Lasso {
                    self.lasso.push(end);
                    if self.lasso.len() > 1 {
                        let r = Rect::from_points(&self.lasso);
                        self.bounds = Some(normalized(r.min, r.max));
                    }
                } else {
                    self.bounds = Some(normalized(self.select_start, end));
                }
                true
            }
        }
    }

    pub fn pointer_up(&mut self, p: Pos2) -> bool {
        let was = self.state;
        self.state = SelectionState::Idle;
        if was != SelectionState::Selecting {
            return false;
        }

        if self.kind == SelectionKind::Lasso {
            let end = floor_pos(p);
            if self.lasso.last() != Some(&end) {
                self.lasso.push(end);
            }
            let r = Rect::from_points(&self.lasso);
            let b = normalized(r.min, r.max);
            self.bounds = (b.width() > 0.0 && b.height() > 0.0).then_some(b);
            if self.bounds.is_none() {
                self.lasso.clear();
            }
        } else {
            let b = normalized(self.select_start, floor_pos(p));
            self.bounds = (b.width() >= self.min_size && b.height() >= self.min_size).then_some(b);
        }
        true
    }

    fn translate(&mut self, delta: Vec2) {
        if let Some(b) = self.bounds.as_mut() {
            *b = b.translate(delta);
        }
        for pt in &mut self.lasso {
            *pt += delta;
        }
    }

    fn resize_to(&mut self, handle: usize, p: Pos2) {
        let Some(old) = self.bounds else { return };
        let (mut left, mut top, mut right, mut bottom) = (old.min.x, old.min.y, old.max.x, old.max.y);
        match handle {
            0 => {
                left = p.x;
                top = p.y;
            }
            1 => top = p.y,
            2 => {
                right = p.x;
                top = p.y;
            }
            3 => right = p.x,
            4 => {
                right = p.x;
                bottom = p.y;
            }
            5 => bottom = p.y,
            6 => {
                left = p.x;
                bottom = p.y;
            }
            7 => left = p.x,
            _ => return,
        }
        let new = Rect::from_min_max(
            pos2(left.min(right), top.min(bottom)),
            pos2(left.max(right), top.max(bottom)),
        );
        // Lasso outline follows the bounds.
        if old.width() > 0.0 && old.height() > 0.0 {
            let sx = new.width() / old.width();
            let sy = new.height() / old.height();
            for pt in &mut self.lasso {
                *pt = pos2(
                    new.min.x + (pt.x - old.min.x) * sx,
                    new.min.y + (pt.y - old.min.y) * sy,
                );
            }
        }
        self.bounds = Some(new);
    }

    // --- content capture / commit -----------------------------------------

    /// Lift the pixels under the bounds off `surface` (first call only).
    fn capture(&mut self, surface: &mut RgbaImage) {
        if self.content.is_some() {
            return;
        }
        let Some(b) = self.bounds else { return };
        let Some(content) = extract_region(surface, b) else { return };
        self.pre_edit = Some(surface.clone());
        fill_rect(surface, b, TRANSPARENT);
        self.content = Some(content);
    }

    /// Commit floating content at the current bounds and rotation.  The
    /// selection outline itself stays.
    pub fn apply(&mut self, surface: &mut RgbaImage) -> bool {
        let Some(content) = self.content.take() else {
            self.rotation = 0.0;
            return false;
        };
        if let Some(b) = self.bounds {
            draw_transformed(surface, &content, b, self.rotation);
        }
        self.rotation = 0.0;
        true
    }

    /// Commit and drop the selection.
    pub fn apply_and_clear(&mut self, surface: &mut RgbaImage) -> bool {
        let committed = self.apply(surface);
        self.reset_selection();
        committed
    }

    /// Drop the selection and discard floating content without committing.
    pub fn clear(&mut self) {
        self.content = None;
        self.reset_selection();
    }

    fn reset_selection(&mut self) {
        self.bounds = None;
        self.lasso.clear();
        self.state = SelectionState::Idle;
        self.rotation = 0.0;
    }

    /// Replace the selection with a rectangle (magic wand, select-all).
    pub fn set_selection(&mut self, rect: Rect, surface: &mut RgbaImage) {
        self.apply(surface);
        self.kind = SelectionKind::Rectangle;
        self.lasso.clear();
        self.state = SelectionState::Idle;
        self.bounds = (rect.width() > 0.0 && rect.height() > 0.0).then_some(rect);
    }

    // --- clipboard ----------------------------------------------------------

    /// Copy the bounds region.  Floating content is copied as it stands.
    pub fn copy(&mut self, surface: &RgbaImage) -> bool {
        let Some(b) = self.bounds else { return false };
        let copied = match &self.content {
            Some(content) if self.rotation == 0.0 => Some(content.clone()),
            _ => extract_region(surface, b),
        };
        match copied {
            Some(img) => {
                self.clipboard = Some(img);
                true
            }
            None => false,
        }
    }

    pub fn cut(&mut self, surface: &mut RgbaImage) -> bool {
        if !self.copy(surface) {
            return false;
        }
        self.delete(surface)
    }

    /// Clear the bounds region to transparent and drop the selection.
    pub fn delete(&mut self, surface: &mut RgbaImage) -> bool {
        let Some(b) = self.bounds else { return false };
        // Floating pixels were already lifted off the layer: dropping them is
        // the whole delete, whatever now lies under the bounds stays.
        if self.content.take().is_none() {
            fill_rect(surface, b, TRANSPARENT);
        }
        self.reset_selection();
        true
    }

    /// Insert the clipboard centred on the canvas as a new floating selection.
    pub fn paste(&mut self, surface: &mut RgbaImage) -> bool {
        let Some(clip) = self.clipboard.clone() else { return false };
        self.apply(surface);
        let (cw, ch) = clip.dimensions();
        let x = (surface.width() / 2) as f32 - (cw / 2) as f32;
        let y = (surface.height() / 2) as f32 - (ch / 2) as f32;
        self.kind = SelectionKind::Rectangle;
        self.lasso.clear();
        self.state = SelectionState::Idle;
        self.rotation = 0.0;
        self.bounds = Some(Rect::from_min_size(pos2(x, y), egui::vec2(cw as f32, ch as f32)));
        self.content = Some(clip);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);

    fn select(engine: &mut SelectionEngine, surface: &mut RgbaImage, a: Pos2, b: Pos2) {
        engine.pointer_down(a, false, 1.0, surface);
        engine.pointer_move(b, surface);
        engine.pointer_up(b);
    }

    #[test]
    fn test_ellipse_point_in_selection() {
        let mut e = SelectionEngine::default();
        let mut s = RgbaImage::new(200, 200);
        e.set_kind(SelectionKind::Ellipse);
        select(&mut e, &mut s, pos2(0.0, 0.0), pos2(100.0, 50.0));
        assert_eq!(e.bounds(), Some(Rect::from_min_max(pos2(0.0, 0.0), pos2(100.0, 50.0))));
        assert!(e.is_point_in_selection(pos2(50.0, 25.0)));
        assert!(!e.is_point_in_selection(pos2(0.0, 0.0)));
    }

    #[test]
    fn test_no_selection_contains_everything() {
        let e = SelectionEngine::default();
        assert!(e.is_point_in_selection(pos2(-100.0, 5000.0)));
    }

    #[test]
    fn test_tiny_selection_is_discarded() {
        let mut e = SelectionEngine::default();
        let mut s = RgbaImage::new(100, 100);
        select(&mut e, &mut s, pos2(10.0, 10.0), pos2(13.0, 40.0));
        assert!(!e.has_selection());
        assert_eq!(e.state(), SelectionState::Idle);
    }

    #[test]
    fn test_tiny_lasso_is_kept() {
        let mut e = SelectionEngine::default();
        let mut s = RgbaImage::new(100, 100);
        e.set_kind(SelectionKind::Lasso);
        e.pointer_down(pos2(10.0, 10.0), false, 1.0, &mut s);
        e.pointer_move(pos2(12.0, 10.0), &mut s);
        e.pointer_move(pos2(12.0, 12.0), &mut s);
        e.pointer_up(pos2(10.0, 12.0));
        assert!(e.has_selection());
        assert!(e.is_point_in_selection(pos2(11.0, 11.0)));
        assert!(!e.is_point_in_selection(pos2(30.0, 30.0)));
    }

    #[test]
    fn test_lasso_ray_casting() {
        let tri = SelectionClip::Polygon(vec![pos2(0.0, 0.0), pos2(100.0, 0.0), pos2(0.0, 100.0)]);
        assert!(tri.contains(pos2(10.0, 10.0)));
        assert!(!tri.contains(pos2(80.0, 80.0)));
    }

    #[test]
    fn test_move_captures_lazily_and_commits_on_new_selection() {
        let mut e = SelectionEngine::default();
        let mut s = RgbaImage::from_pixel(100, 100, RED);
        select(&mut e, &mut s, pos2(10.0, 10.0), pos2(60.0, 60.0));

        e.pointer_down(pos2(20.0, 20.0), false, 1.0, &mut s);
        assert!(!e.is_floating());
        e.pointer_move(pos2(40.0, 40.0), &mut s);
        assert!(e.is_floating());
        assert!(e.take_pre_edit().is_some());
        e.pointer_up(pos2(40.0, 40.0));

        // Still floating after release; the hole is visible.
        assert!(e.is_floating());
        assert_eq!(s.get_pixel(35, 35)[3], 0);
        assert_eq!(e.bounds(), Some(Rect::from_min_max(pos2(30.0, 30.0), pos2(80.0, 80.0))));

        // Starting a new selection elsewhere commits.
        e.pointer_down(pos2(90.0, 5.0), false, 1.0, &mut s);
        assert!(!e.is_floating());
        assert_eq!(*s.get_pixel(35, 35), RED);
        assert_eq!(s.get_pixel(15, 15)[3], 0);
    }

    #[test]
    fn test_resize_handles_normalize() {
        let mut e = SelectionEngine::default();
        let mut s = RgbaImage::new(200, 200);
        select(&mut e, &mut s, pos2(10.0, 10.0), pos2(60.0, 60.0));
        assert_eq!(e.handle_at(pos2(61.0, 61.0), 1.0), Some(4));
        assert_eq!(e.handle_at(pos2(35.0, 9.0), 1.0), Some(1));

        // Drag SE past NW: edges swap.
        e.pointer_down(pos2(60.0, 60.0), false, 1.0, &mut s);
        e.pointer_move(pos2(0.0, 0.0), &mut s);
        e.pointer_up(pos2(0.0, 0.0));
        assert_eq!(e.bounds(), Some(Rect::from_min_max(pos2(0.0, 0.0), pos2(10.0, 10.0))));
        assert!(e.is_floating());
    }

    #[test]
    fn test_rotation_accumulates_degrees() {
        let mut e = SelectionEngine::default();
        let mut s = RgbaImage::new(200, 200);
        select(&mut e, &mut s, pos2(50.0, 50.0), pos2(150.0, 150.0));
        e.pointer_down(pos2(140.0, 100.0), true, 1.0, &mut s);
        assert_eq!(e.state(), SelectionState::Rotating);
        assert!(e.is_floating());
        e.pointer_move(pos2(100.0, 140.0), &mut s);
        assert!((e.rotation() - 90.0).abs() < 1e-3);
        e.pointer_up(pos2(100.0, 140.0));
        e.apply(&mut s);
        assert_eq!(e.rotation(), 0.0);
    }

    #[test]
    fn test_copy_paste_floats_centered() {
        let mut e = SelectionEngine::default();
        let mut s = RgbaImage::new(100, 100);
        fill_rect(&mut s, Rect::from_min_max(pos2(0.0, 0.0), pos2(10.0, 10.0)), RED);
        select(&mut e, &mut s, pos2(0.0, 0.0), pos2(10.0, 10.0));
        assert!(e.copy(&s));
        assert!(e.paste(&mut s));
        assert_eq!(e.bounds(), Some(Rect::from_min_max(pos2(45.0, 45.0), pos2(55.0, 55.0))));
        assert!(e.is_floating());
        assert_eq!(s.get_pixel(50, 50)[3], 0);
        e.apply_and_clear(&mut s);
        assert_eq!(*s.get_pixel(50, 50), RED);
        assert!(!e.has_selection());
    }

    #[test]
    fn test_cut_after_move_keeps_pixels_under_new_bounds() {
        let mut e = SelectionEngine::default();
        let mut s = RgbaImage::from_pixel(100, 100, RED);
        select(&mut e, &mut s, pos2(10.0, 10.0), pos2(60.0, 60.0));
        e.pointer_down(pos2(20.0, 20.0), false, 1.0, &mut s);
        e.pointer_move(pos2(40.0, 40.0), &mut s);
        e.pointer_up(pos2(40.0, 40.0));
        assert!(e.is_floating());

        assert!(e.cut(&mut s));
        assert!(!e.is_floating());
        assert_eq!(e.clipboard().map(|c| c.dimensions()), Some((50, 50)));
        // Never selected: untouched.
        assert_eq!(*s.get_pixel(70, 70), RED);
        // The lifted area stays empty.
        assert_eq!(s.get_pixel(15, 15)[3], 0);
    }

    #[test]
    fn test_cut_clears_region_and_selection() {
        let mut e = SelectionEngine::default();
        let mut s = RgbaImage::from_pixel(50, 50, RED);
        select(&mut e, &mut s, pos2(5.0, 5.0), pos2(20.0, 20.0));
        assert!(e.cut(&mut s));
        assert!(!e.has_selection());
        assert!(e.has_clipboard());
        assert_eq!(s.get_pixel(10, 10)[3], 0);
        assert_eq!(*s.get_pixel(25, 25), RED);
    }

    #[test]
    fn test_ops_without_selection_are_noops() {
        let mut e = SelectionEngine::default();
        let mut s = RgbaImage::from_pixel(10, 10, RED);
        assert!(!e.copy(&s));
        assert!(!e.cut(&mut s));
        assert!(!e.delete(&mut s));
        assert!(!e.paste(&mut s));
        assert!(!e.apply(&mut s));
        assert!(s.pixels().all(|p| *p == RED));
    }

    #[test]
    fn test_clear_discards_floating() {
        let mut e = SelectionEngine::default();
        let mut s = RgbaImage::from_pixel(100, 100, RED);
        select(&mut e, &mut s, pos2(10.0, 10.0), pos2(30.0, 30.0));
        e.pointer_down(pos2(15.0, 15.0), false, 1.0, &mut s);
        e.pointer_move(pos2(50.0, 50.0), &mut s);
        e.pointer_up(pos2(50.0, 50.0));
        e.clear();
        assert!(!e.is_floating());
        assert_eq!(s.get_pixel(50, 50).0, RED.0);
        assert_eq!(s.get_pixel(15, 15)[3], 0);
    }
}
