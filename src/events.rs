// ============================================================================
// COORDINATOR EVENTS - semantic notifications for external panels
// ============================================================================
//
// The core never formats user-facing text.  Everything leaving the
// coordinator is one of these values; panels subscribe either with a
// callback or by holding the receiving end of a channel.

use std::sync::mpsc;

use egui::{Pos2, Rect, Vec2};

use crate::canvas::LayerInfo;
use crate::components::tools::ToolKind;

/// Outcome notifications for the status bar.
#[derive(Clone, Debug, PartialEq)]
pub enum StatusKind {
    Ready,
    LayerLocked,
    OutOfBounds,
    ColorPicked { r: u8, g: u8, b: u8 },
    Undone(String),
    Redone(String),
    NothingToUndo,
    NothingToRedo,
    NothingSelected,
    ClipboardEmpty,
    Copied,
    Cut,
    Pasted,
    Deleted,
    CanvasResized { width: u32, height: u32 },
    ImageLoaded { width: u32, height: u32 },
    LoadFailed(String),
    TextFailed(String),
}

#[derive(Clone, Debug, PartialEq)]
pub enum CoordinatorEvent {
    Status(StatusKind),
    /// Canvas-space pointer position.
    Coordinates { x: f32, y: f32, zoom: f32, snapped: bool },
    ToolChanged(ToolKind),
    SelectionChanged(Option<Rect>),
    LayersChanged(Vec<LayerInfo>),
    ActiveLayerChanged(usize),
    TextAreaRequested { origin: Pos2, width: f32, height: f32 },
    BrushSizeIndicator { size: f32, visible: bool },
    ViewportChanged { zoom: f32, offset: Vec2 },
}

pub type Observer = Box<dyn FnMut(&CoordinatorEvent)>;

/// Observer list plus any number of channel subscribers.
#[derive(Default)]
pub struct EventHub {
    observers: Vec<Observer>,
    senders: Vec<mpsc::Sender<CoordinatorEvent>>,
}

impl EventHub {
    pub fn subscribe(&mut self, observer: Observer) {
        self.observers.push(observer);
    }

    pub fn channel(&mut self) -> mpsc::Receiver<CoordinatorEvent> {
        let (tx, rx) = mpsc::channel();
        self.senders.push(tx);
        rx
    }

    pub fn emit(&mut self, event: CoordinatorEvent) {
        for observer in &mut self.observers {
            observer(&event);
        }
        // Receivers that were dropped unsubscribe themselves.
        self.senders.retain(|tx| tx.send(event.clone()).is_ok());
    }
}
