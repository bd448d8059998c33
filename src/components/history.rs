use std::collections::VecDeque;

use image::RgbaImage;
use uuid::Uuid;

use crate::config::MAX_UNDO_CEILING;

// ============================================================================
// SNAPSHOT - one owned copy of a layer surface
// ============================================================================

/// A full, independently owned copy of one layer's pixels.
#[derive(Clone, Debug)]
pub struct Snapshot {
    /// What the user did right after this snapshot was taken ("Brush Stroke", "Fill", ...).
    pub label: String,
    /// Layer the pixels came from.  `None` restores into whatever layer is active.
    pub layer: Option<Uuid>,
    pub pixels: RgbaImage,
}

impl Snapshot {
    fn memory_size(&self) -> usize {
        self.pixels.as_raw().len()
    }
}

// ============================================================================
// UNDO MANAGER - bounded linear history of whole-layer snapshots
// ============================================================================

/// Linear undo/redo over whole-surface snapshots.
///
/// `save_state` must run *before* a mutation starts.  Starting a new action
/// drops the redo stack; the undo stack keeps at most `max_steps` entries,
/// evicting the oldest first.
pub struct UndoManager {
    undo_stack: VecDeque<Snapshot>,
    redo_stack: VecDeque<Snapshot>,
    max_steps: usize,
    /// Running byte total across both stacks.
    total_memory: usize,
}

impl Default for UndoManager {
    fn default() -> Self {
        Self::new(MAX_UNDO_CEILING)
    }
}

impl UndoManager {
    pub fn new(max_steps: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            max_steps: max_steps.clamp(1, MAX_UNDO_CEILING),
            total_memory: 0,
        }
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    /// Change the ceiling; excess history is evicted immediately.
    pub fn set_max_steps(&mut self, max_steps: usize) {
        self.max_steps = max_steps.clamp(1, MAX_UNDO_CEILING);
        self.prune();
    }

    /// Snapshot `pixels` before an unlabeled edit to the active layer.
    pub fn save_state(&mut self, pixels: &RgbaImage) {
        self.push(Snapshot { label: String::new(), layer: None, pixels: pixels.clone() });
    }

    /// Snapshot a specific layer before the named action.
    pub fn save_layer_state(&mut self, layer: Uuid, pixels: &RgbaImage, label: &str) {
        self.push(Snapshot {
            label: label.to_string(),
            layer: Some(layer),
            pixels: pixels.clone(),
        });
    }

    fn push(&mut self, snapshot: Snapshot) {
        for dropped in self.redo_stack.drain(..) {
            self.total_memory = self.total_memory.saturating_sub(dropped.memory_size());
        }
        self.total_memory += snapshot.memory_size();
        self.undo_stack.push_back(snapshot);
        self.prune();
    }

    /// Step back.  `current` is the live surface of the layer the top snapshot
    /// belongs to; it moves to the redo stack.  Returns the surface to restore.
    pub fn undo(&mut self, current: &RgbaImage) -> Option<Snapshot> {
        let snapshot = self.undo_stack.pop_back()?;
        let redo = Snapshot {
            label: snapshot.label.clone(),
            layer: snapshot.layer,
            pixels: current.clone(),
        };
        self.total_memory += redo.memory_size();
        self.total_memory = self.total_memory.saturating_sub(snapshot.memory_size());
        self.redo_stack.push_back(redo);
        Some(snapshot)
    }

    /// Step forward; mirror image of `undo`.
    pub fn redo(&mut self, current: &RgbaImage) -> Option<Snapshot> {
        let snapshot = self.redo_stack.pop_back()?;
        let undo = Snapshot {
            label: snapshot.label.clone(),
            layer: snapshot.layer,
            pixels: current.clone(),
        };
        self.total_memory += undo.memory_size();
        self.total_memory = self.total_memory.saturating_sub(snapshot.memory_size());
        self.undo_stack.push_back(undo);
        self.prune();
        Some(snapshot)
    }

    /// Top of the undo stack without popping it.
    pub fn peek_undo(&self) -> Option<&Snapshot> {
        self.undo_stack.back()
    }

    pub fn peek_redo(&self) -> Option<&Snapshot> {
        self.redo_stack.back()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    /// Labels on the undo stack, most recent first.
    pub fn undo_history(&self) -> Vec<String> {
        self.undo_stack.iter().rev().map(|s| s.label.clone()).collect()
    }

    pub fn memory_usage(&self) -> usize {
        self.total_memory
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.total_memory = 0;
    }

    fn prune(&mut self) {
        while self.undo_stack.len() > self.max_steps {
            if let Some(removed) = self.undo_stack.pop_front() {
                self.total_memory = self.total_memory.saturating_sub(removed.memory_size());
            }
        }
    }
}
