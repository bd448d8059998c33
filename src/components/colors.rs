use std::collections::VecDeque;

use image::Rgba;

// ============================================================================
// RECENT COLORS - bounded most-recently-used history
// ============================================================================

/// Front is the most recent pick.  Re-adding a color moves it to the front
/// instead of duplicating it.
#[derive(Clone, Debug)]
pub struct RecentColors {
    colors: VecDeque<Rgba<u8>>,
    capacity: usize,
}

impl Default for RecentColors {
    fn default() -> Self {
        Self::new(12)
    }
}

impl RecentColors {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { colors: VecDeque::with_capacity(capacity), capacity }
    }

    pub fn push(&mut self, color: Rgba<u8>) {
        if let Some(pos) = self.colors.iter().position(|c| *c == color) {
            self.colors.remove(pos);
        }
        self.colors.push_front(color);
        self.colors.truncate(self.capacity);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rgba<u8>> {
        self.colors.iter()
    }

    pub fn most_recent(&self) -> Option<Rgba<u8>> {
        self.colors.front().copied()
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.colors.clear();
    }
}
