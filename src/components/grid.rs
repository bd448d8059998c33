use egui::{Pos2, pos2};

// ============================================================================
// GRID & GUIDES
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
pub struct Grid {
    pub visible: bool,
    pub snap: bool,
    size: f32,
    vertical_guides: Vec<f32>,
    horizontal_guides: Vec<f32>,
}

impl Default for Grid {
    fn default() -> Self {
        Self::new(20.0)
    }
}

impl Grid {
    pub fn new(size: f32) -> Self {
        Self {
            visible: false,
            snap: false,
            size: size.clamp(1.0, 100.0),
            vertical_guides: Vec::new(),
            horizontal_guides: Vec::new(),
        }
    }

    pub fn size(&self) -> f32 {
        self.size
    }

    pub fn set_size(&mut self, size: f32) {
        self.size = size.clamp(1.0, 100.0);
    }

    /// Nearest grid intersection, or `p` unchanged when snapping is off.
    pub fn snap(&self, p: Pos2) -> Pos2 {
        if !self.snap {
            return p;
        }
        pos2((p.x / self.size).round() * self.size, (p.y / self.size).round() * self.size)
    }

    pub fn vertical_guides(&self) -> &[f32] {
        &self.vertical_guides
    }

    pub fn horizontal_guides(&self) -> &[f32] {
        &self.horizontal_guides
    }

    pub fn add_vertical_guide(&mut self, x: f32) {
        if !self.vertical_guides.contains(&x) {
            self.vertical_guides.push(x);
        }
    }

    pub fn add_horizontal_guide(&mut self, y: f32) {
        if !self.horizontal_guides.contains(&y) {
            self.horizontal_guides.push(y);
        }
    }

    pub fn remove_vertical_guide(&mut self, x: f32) {
        self.vertical_guides.retain(|g| *g != x);
    }

    pub fn remove_horizontal_guide(&mut self, y: f32) {
        self.horizontal_guides.retain(|g| *g != y);
    }

    pub fn clear_guides(&mut self) {
        self.vertical_guides.clear();
        self.horizontal_guides.clear();
    }
}
