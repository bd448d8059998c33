use egui::{Pos2, Vec2};

use crate::config::EditorConfig;

// ============================================================================
// VIEWPORT - screen <-> canvas mapping under zoom and pan
// ============================================================================

/// `screen = canvas * zoom + offset`.  Owns no pixels.
///
/// Every mutator returns `true` when the mapping actually changed so the
/// owner can raise a "viewport changed" notification.
#[derive(Clone, Debug, PartialEq)]
pub struct Viewport {
    zoom: f32,
    offset: Vec2,
    zoom_step: f32,
    min_zoom: f32,
    max_zoom: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::from_config(&EditorConfig::default())
    }
}

impl Viewport {
    pub fn from_config(config: &EditorConfig) -> Self {
        Self {
            zoom: 1.0,
            offset: Vec2::ZERO,
            zoom_step: config.zoom_step,
            min_zoom: config.min_zoom,
            max_zoom: config.max_zoom,
        }
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn offset(&self) -> Vec2 {
        self.offset
    }

    pub fn screen_to_canvas(&self, screen: Pos2) -> Pos2 {
        ((screen - self.offset).to_vec2() / self.zoom).to_pos2()
    }

    pub fn canvas_to_screen(&self, canvas: Pos2) -> Pos2 {
        (canvas.to_vec2() * self.zoom + self.offset).to_pos2()
    }

    pub fn zoom_in(&mut self, center: Pos2) -> bool {
        self.zoom_around(self.zoom * self.zoom_step, center)
    }

    pub fn zoom_out(&mut self, center: Pos2) -> bool {
        self.zoom_around(self.zoom / self.zoom_step, center)
    }

    /// Set the zoom level keeping the canvas point under `anchor` fixed on screen.
    pub fn zoom_around(&mut self, target: f32, anchor: Pos2) -> bool {
        let new_zoom = target.clamp(self.min_zoom, self.max_zoom);
        if (new_zoom - self.zoom).abs() <= f32::EPSILON {
            return false;
        }
        let under_cursor = self.screen_to_canvas(anchor);
        self.zoom = new_zoom;
        self.offset = anchor.to_vec2() - under_cursor.to_vec2() * new_zoom;
        true
    }

    pub fn pan(&mut self, delta: Vec2) -> bool {
        if delta == Vec2::ZERO {
            return false;
        }
        self.offset += delta;
        true
    }

    pub fn reset(&mut self) -> bool {
        let changed = self.zoom != 1.0 || self.offset != Vec2::ZERO;
        self.zoom = 1.0;
        self.offset = Vec2::ZERO;
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Pos2, b: Pos2) -> bool {
        (a.x - b.x).abs() < 1e-3 && (a.y - b.y).abs() < 1e-3
    }

    #[test]
    fn test_round_trip_across_states() {
        let mut v = Viewport::default();
        let points = [Pos2::new(0.0, 0.0), Pos2::new(123.5, 77.25), Pos2::new(-40.0, 900.0)];
        for step in 0..6 {
            if step % 2 == 0 {
                v.zoom_in(Pos2::new(300.0, 200.0));
            } else {
                v.pan(Vec2::new(-17.5, 42.0));
            }
            for p in points {
                assert!(close(v.screen_to_canvas(v.canvas_to_screen(p)), p));
            }
        }
    }

    #[test]
    fn test_zoom_to_cursor_keeps_point_fixed() {
        let mut v = Viewport::default();
        v.pan(Vec2::new(50.0, -20.0));
        let cursor = Pos2::new(412.0, 233.0);
        let before = v.screen_to_canvas(cursor);
        assert!(v.zoom_in(cursor));
        assert!(close(v.canvas_to_screen(before), cursor));
        assert!(close(v.canvas_to_screen(v.screen_to_canvas(cursor)), cursor));
        assert!(v.zoom_out(cursor));
        assert!(close(v.canvas_to_screen(before), cursor));
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut v = Viewport::default();
        for _ in 0..100 {
            v.zoom_in(Pos2::ZERO);
        }
        assert!((v.zoom() - 15.5).abs() < 1e-4);
        assert!(!v.zoom_in(Pos2::ZERO));
        for _ in 0..100 {
            v.zoom_out(Pos2::ZERO);
        }
        assert!((v.zoom() - 0.1).abs() < 1e-4);
    }

    #[test]
    fn test_reset() {
        let mut v = Viewport::default();
        v.zoom_in(Pos2::new(10.0, 10.0));
        v.pan(Vec2::new(5.0, 5.0));
        assert!(v.reset());
        assert_eq!(v.zoom(), 1.0);
        assert_eq!(v.offset(), Vec2::ZERO);
        assert!(!v.reset());
    }
}
